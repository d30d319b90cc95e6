//! Agent contract
//!
//! An agent turns a prompt into a response. Implementors provide
//! [`Agent::generate`]; the harness calls [`Agent::call`], which times the
//! generation and logs the duration into the agent's own [`LatencyTracker`].
//!
//! Latency is logged after `generate` resolves, success or failure. When the
//! harness deadline fires first the call future is dropped, so a timed-out
//! round leaves `last_latency` untouched. A call that blocks its thread past
//! the deadline is abandoned through its [`CallTicket`] and logs nothing when
//! it finally returns.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use crate::error::AgentResult;
use crate::latency::LatencyTracker;
use crate::outcome::OutcomeLog;

pub mod providers;
pub mod registry;
pub mod stub;

pub use registry::{AgentKey, AgentRegistry};
pub use stub::StubAgent;

/// Stable key plus human-readable name of a registered agent
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgentIdentity {
    pub key: String,
    pub display_name: String,
}

impl AgentIdentity {
    pub fn new(key: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            display_name: display_name.into(),
        }
    }
}

impl fmt::Display for AgentIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.display_name, self.key)
    }
}

/// Model information
#[derive(Debug, Clone)]
pub struct ModelInfo {
    pub provider: String,
    pub model_name: String,
}

/// Trait for response-generating agents.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Produce a response for `prompt`.
    ///
    /// A successful but absent body must be returned as an empty string; the
    /// empty-output check belongs to validation, not to the agent.
    ///
    /// Implementations should yield to the runtime while waiting. Blocking
    /// work belongs in `tokio::task::spawn_blocking`; a call that blocks its
    /// worker anyway is abandoned at the harness deadline and reported as a
    /// timeout, but it keeps its thread until it returns.
    async fn generate(&self, prompt: &str) -> AgentResult<String>;

    /// Latency window owned by this agent
    fn monitor(&self) -> &LatencyTracker;

    /// Outcome normalizer owned by this agent
    fn error_log(&self) -> &OutcomeLog;

    /// Get model information
    fn model_info(&self) -> ModelInfo {
        ModelInfo {
            provider: "unknown".to_string(),
            model_name: "unknown".to_string(),
        }
    }

    /// Timed entry point.
    async fn call(&self, prompt: &str) -> AgentResult<String> {
        self.call_ticketed(prompt, &CallTicket::new()).await
    }

    /// Timed entry point used by the harness.
    ///
    /// The latency sample is logged only if this call settles `ticket` before
    /// the harness abandons it.
    async fn call_ticketed(&self, prompt: &str, ticket: &CallTicket) -> AgentResult<String> {
        let start = Instant::now();
        let result = self.generate(prompt).await;
        if ticket.settle() {
            self.monitor().log_latency(start.elapsed().as_secs_f64());
        }
        result
    }
}

/// Settles one agent call exactly once.
///
/// The call settles it when `generate` returns; the harness settles it when it
/// gives up on the call. Whichever side gets there first wins.
#[derive(Debug, Clone, Default)]
pub struct CallTicket {
    settled: Arc<AtomicBool>,
}

impl CallTicket {
    pub fn new() -> Self {
        Self::default()
    }

    /// Settle the ticket; `true` only for the first caller.
    pub fn settle(&self) -> bool {
        !self.settled.swap(true, Ordering::AcqRel)
    }

    pub fn is_settled(&self) -> bool {
        self.settled.load(Ordering::Acquire)
    }
}

/// An agent instance together with its identity
#[derive(Clone)]
pub struct RegisteredAgent {
    pub identity: AgentIdentity,
    pub agent: Arc<dyn Agent>,
}

impl RegisteredAgent {
    pub fn new(identity: AgentIdentity, agent: Arc<dyn Agent>) -> Self {
        Self { identity, agent }
    }

    pub fn key(&self) -> &str {
        &self.identity.key
    }

    pub fn display_name(&self) -> &str {
        &self.identity.display_name
    }
}

impl fmt::Debug for RegisteredAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let info = self.agent.model_info();
        f.debug_struct("RegisteredAgent")
            .field("identity", &self.identity)
            .field("provider", &info.provider)
            .field("model", &info.model_name)
            .finish()
    }
}
