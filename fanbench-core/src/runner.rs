//! Benchmark loop: one fan-out round per prompt

use std::sync::Arc;

use crate::agent::RegisteredAgent;
use crate::error::Result;
use crate::fanout::FanOut;
use crate::prompts::Prompt;
use crate::record::FanOutRecord;
use crate::storage::RecordSink;

/// Drives the orchestrator over an ordered prompt list.
///
/// Rounds run strictly one after another, so an agent instance is never
/// called twice at the same time.
pub struct BenchmarkRunner {
    fan_out: FanOut,
    sink: Option<Arc<dyn RecordSink>>,
}

impl BenchmarkRunner {
    pub fn new(fan_out: FanOut) -> Self {
        Self {
            fan_out,
            sink: None,
        }
    }

    /// Append each round's records to `sink` as soon as the round is joined
    pub fn with_sink(mut self, sink: Arc<dyn RecordSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn fan_out(&self) -> &FanOut {
        &self.fan_out
    }

    /// Run every prompt against `agents` and return all records in order.
    ///
    /// # Errors
    ///
    /// Propagates orchestrator errors (malformed agent list) and sink failures.
    pub async fn run(&self, prompts: &[Prompt], agents: &[RegisteredAgent]) -> Result<Vec<FanOutRecord>> {
        let total = prompts.len();
        let mut all_records = Vec::with_capacity(total * agents.len());

        tracing::info!(prompts = total, agents = agents.len(), "starting benchmark");

        for (i, prompt) in prompts.iter().enumerate() {
            tracing::info!("[{:2}/{}] {:<28} \"{}\"", i + 1, total, prompt.id, prompt.preview());

            let records = self.fan_out.run(prompt, agents).await?;

            if let Some(sink) = &self.sink {
                sink.append(&records).await?;
            }
            all_records.extend(records);
        }

        Ok(all_records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{AgentIdentity, StubAgent};
    use crate::storage::InMemorySink;

    #[tokio::test]
    async fn test_runs_every_prompt_in_order() {
        let agents = vec![
            RegisteredAgent::new(AgentIdentity::new("a", "A"), Arc::new(StubAgent::new())),
            RegisteredAgent::new(AgentIdentity::new("b", "B"), Arc::new(StubAgent::new())),
        ];
        let prompts = vec![
            Prompt::new("greeting", "Hi Open AI"),
            Prompt::new("bye", "Ok Bye Open A.I."),
        ];
        let sink = Arc::new(InMemorySink::new());

        let runner = BenchmarkRunner::new(FanOut::default()).with_sink(sink.clone());
        let records = runner.run(&prompts, &agents).await.unwrap();

        let pairs: Vec<_> = records
            .iter()
            .map(|r| (r.prompt_id.as_str(), r.agent_key.as_str()))
            .collect();
        assert_eq!(
            pairs,
            vec![("greeting", "a"), ("greeting", "b"), ("bye", "a"), ("bye", "b")]
        );
        assert_eq!(sink.len().await, 4);

        // Two rounds, two distinct round ids.
        assert_ne!(records[0].round_id, records[2].round_id);
        assert_eq!(records[0].round_id, records[1].round_id);
    }
}
