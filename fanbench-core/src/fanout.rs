//! Fan-out orchestrator
//!
//! Dispatches one prompt to every selected agent at once, bounds each call by
//! its own deadline, waits for all of them, and turns every outcome into a
//! [`FanOutRecord`] in input order.
//!
//! Each agent call runs in its own spawned task wrapping
//! [`tokio::time::timeout`]. On expiry the call future is dropped inside that
//! task; siblings keep running and the round still completes. A task that
//! blocks its thread and so never reaches its own timer is abandoned shortly
//! after the deadline and also reported as a timeout. A panicking agent is
//! reported as a [`AgentError::Panicked`] failure for its own record.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use tokio::task::JoinHandle;

use crate::agent::{CallTicket, RegisteredAgent};
use crate::config::FanbenchConfig;
use crate::error::{AgentError, AgentResult, FanbenchError, Result};
use crate::prompts::Prompt;
use crate::record::{assemble, AgentSnapshot, FanOutRecord, RoundInfo};
use crate::validation::ValidationPipeline;

/// Default per-call deadline
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(20);

/// Extra wait past the per-call deadline before a task that never yields is abandoned
const ABANDON_GRACE: Duration = Duration::from_millis(50);

/// Raw results of one joined round, in input order
#[derive(Debug)]
pub struct RoundOutcome {
    pub results: Vec<AgentResult<String>>,
    pub span: Duration,
}

/// Fan-out orchestrator
pub struct FanOut {
    call_timeout: Duration,
    pipeline: ValidationPipeline,
}

impl std::fmt::Debug for FanOut {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FanOut")
            .field("call_timeout", &self.call_timeout)
            .field("pipeline", &self.pipeline)
            .finish()
    }
}

impl FanOut {
    /// Create a new fan-out builder
    pub fn builder() -> FanOutBuilder {
        FanOutBuilder::new()
    }

    /// Orchestrator using the harness timeout and validator thresholds from `config`
    pub fn from_config(config: &FanbenchConfig) -> Self {
        Self {
            call_timeout: config.harness.call_timeout,
            pipeline: ValidationPipeline::from_config(&config.validation),
        }
    }

    pub fn call_timeout(&self) -> Duration {
        self.call_timeout
    }

    pub fn pipeline(&self) -> &ValidationPipeline {
        &self.pipeline
    }

    /// Run one round and assemble one record per agent, in input order.
    ///
    /// # Errors
    ///
    /// Fails only for a malformed agent list (empty, or the same key or agent
    /// instance listed twice). Agent failures and timeouts never surface here.
    pub async fn run(&self, prompt: &Prompt, agents: &[RegisteredAgent]) -> Result<Vec<FanOutRecord>> {
        let outcome = dispatch(&prompt.prompt, agents, self.call_timeout).await?;
        let round = RoundInfo::new(outcome.span.as_secs_f64());

        let records: Vec<FanOutRecord> = agents
            .iter()
            .zip(outcome.results)
            .map(|(entry, result)| {
                let agent = &entry.agent;
                let response = agent.error_log().set_from_result(&result);
                let error_meta = agent
                    .error_log()
                    .get_meta()
                    .unwrap_or_else(crate::outcome::ErrorMeta::ok);

                let context = self.pipeline.context(
                    &prompt.prompt,
                    Some(response.clone()),
                    entry.display_name(),
                );
                let validation = self.pipeline.run(&context);

                // A call cut short never logged a sample for this round.
                let completed = !matches!(
                    result,
                    Err(AgentError::Timeout(_)) | Err(AgentError::Panicked(_))
                );
                let latency_sec = if completed {
                    agent.monitor().last_latency()
                } else {
                    None
                };

                assemble(
                    prompt,
                    &entry.identity,
                    &round,
                    AgentSnapshot {
                        response,
                        validation,
                        latency_sec,
                        latency_metrics: agent.monitor().get_latency_metrics(),
                        error_meta,
                    },
                )
            })
            .collect();

        tracing::info!(
            prompt_id = %prompt.id,
            agents = records.len(),
            failed = records.iter().filter(|r| !r.is_ok()).count(),
            fan_out_latency_sec = round.fan_out_latency_sec,
            "fan-out round complete"
        );

        Ok(records)
    }
}

impl Default for FanOut {
    fn default() -> Self {
        FanOutBuilder::new().build()
    }
}

/// Run one round with the default validators.
pub async fn run_fan_out(
    prompt: &Prompt,
    agents: &[RegisteredAgent],
    per_call_timeout: Duration,
) -> Result<Vec<FanOutRecord>> {
    FanOut::builder()
        .call_timeout(per_call_timeout)
        .build()
        .run(prompt, agents)
        .await
}

fn check_agents(agents: &[RegisteredAgent]) -> Result<()> {
    if agents.is_empty() {
        return Err(FanbenchError::NoAgents);
    }

    let mut keys = HashSet::new();
    let mut instances = HashSet::new();
    for entry in agents {
        if !keys.insert(entry.key()) {
            return Err(FanbenchError::Configuration(format!(
                "agent '{}' listed more than once in one round",
                entry.key()
            )));
        }
        if !instances.insert(Arc::as_ptr(&entry.agent) as *const () as usize) {
            return Err(FanbenchError::Configuration(format!(
                "agent '{}' shares an instance with another entry",
                entry.key()
            )));
        }
    }
    Ok(())
}

/// Call every agent concurrently and join all of them.
///
/// Results come back in input order regardless of completion order. The span
/// covers dispatch through the final join.
pub async fn dispatch(
    prompt: &str,
    agents: &[RegisteredAgent],
    per_call_timeout: Duration,
) -> Result<RoundOutcome> {
    check_agents(agents)?;

    let start = Instant::now();

    let calls: Vec<_> = agents
        .iter()
        .map(|entry| {
            let agent = Arc::clone(&entry.agent);
            let prompt = prompt.to_string();
            let ticket = CallTicket::new();
            let task_ticket = ticket.clone();

            let handle = tokio::spawn(async move {
                match tokio::time::timeout(per_call_timeout, agent.call_ticketed(&prompt, &task_ticket))
                    .await
                {
                    Ok(result) => result,
                    Err(_) => Err(AgentError::Timeout(per_call_timeout)),
                }
            });
            (handle, ticket)
        })
        .collect();

    let results = join_all(
        calls
            .into_iter()
            .zip(agents)
            .map(|((handle, ticket), entry)| settle_call(entry.key(), handle, ticket, per_call_timeout)),
    )
    .await;

    Ok(RoundOutcome {
        results,
        span: start.elapsed(),
    })
}

/// Wait for one agent task, abandoning it if it never yields back in time.
///
/// The task's own timeout covers agents that await; this outer deadline covers
/// agents that block their worker thread, where the inner timer cannot fire.
async fn settle_call(
    key: &str,
    mut handle: JoinHandle<AgentResult<String>>,
    ticket: CallTicket,
    per_call_timeout: Duration,
) -> AgentResult<String> {
    let deadline = per_call_timeout.saturating_add(ABANDON_GRACE);
    let joined = match tokio::time::timeout(deadline, &mut handle).await {
        Ok(joined) => joined,
        Err(_) if ticket.settle() => {
            handle.abort();
            tracing::warn!(
                agent = %key,
                timeout = ?per_call_timeout,
                "agent call did not return in time, abandoned"
            );
            return Err(AgentError::Timeout(per_call_timeout));
        }
        // The call settled first and is already returning.
        Err(_) => handle.await,
    };

    let result = joined.unwrap_or_else(|e| {
        tracing::error!(agent = %key, error = %e, "agent task panicked");
        Err(AgentError::Panicked(e.to_string()))
    });

    match &result {
        Ok(text) => tracing::debug!(agent = %key, chars = text.len(), "agent call succeeded"),
        Err(e) => tracing::warn!(agent = %key, kind = e.kind(), error = %e, "agent call failed"),
    }
    result
}

/// Builder for [`FanOut`]
pub struct FanOutBuilder {
    call_timeout: Duration,
    pipeline: Option<ValidationPipeline>,
}

impl FanOutBuilder {
    pub fn new() -> Self {
        Self {
            call_timeout: DEFAULT_CALL_TIMEOUT,
            pipeline: None,
        }
    }

    /// Set the per-call deadline
    pub fn call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Set the validation pipeline
    pub fn pipeline(mut self, pipeline: ValidationPipeline) -> Self {
        self.pipeline = Some(pipeline);
        self
    }

    pub fn build(self) -> FanOut {
        FanOut {
            call_timeout: self.call_timeout,
            pipeline: self.pipeline.unwrap_or_default(),
        }
    }
}

impl Default for FanOutBuilder {
    fn default() -> Self {
        Self::new()
    }
}
