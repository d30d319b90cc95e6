//! # Fanbench - Concurrent Fan-Out Evaluation for Agents
//!
//! Fanbench sends the same prompt to several interchangeable agents at once
//! and records, for every (prompt, agent) pair:
//! - the response, or a normalized `ERROR: ...` text when the call failed
//! - a validation report from a pipeline of independent checks
//! - the agent's call latency and rolling p50/p95/p99 window
//! - the wall-clock span of the whole fan-out round
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use fanbench_core::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = FanbenchConfig::load()?;
//!     let registry = AgentRegistry::build(&config);
//!     let agents = registry.select(&["stub", "gemini"])?;
//!
//!     let fan_out = FanOut::from_config(&config);
//!     let records = fan_out.run(&Prompt::adhoc("Hi Open AI"), &agents).await?;
//!
//!     JsonlSink::new(&config.storage.results_path).append(&records).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - **Agents** own a [`latency::LatencyTracker`] and an [`outcome::OutcomeLog`]
//! - **Fan-out** spawns one task per agent, each bounded by its own deadline,
//!   and joins all of them before assembling records in input order
//! - **Validation** runs every validator, never short-circuiting
//! - **Storage** is a separate collaborator; the orchestrator persists nothing
//!
//! ## Feature Flags
//!
//! - `agent-gemini`: Gemini-backed agent (default)
//! - `agent-openrouter`: OpenRouter-backed agent (default)

pub mod agent;
pub mod config;
pub mod error;
pub mod fanout;
pub mod latency;
pub mod outcome;
pub mod prompts;
pub mod record;
pub mod runner;
pub mod storage;
pub mod summary;
pub mod validation;

/// Current library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Re-export commonly used types
pub mod prelude {
    pub use crate::agent::{
        Agent, AgentIdentity, AgentKey, AgentRegistry, CallTicket, ModelInfo, RegisteredAgent,
        StubAgent,
    };
    pub use crate::config::{
        AgentsConfig, FanbenchConfig, GeminiConfig, HarnessConfig, OpenRouterConfig,
        StorageConfig, StubConfig, ValidationConfig,
    };
    pub use crate::error::{AgentError, AgentResult, FanbenchError, Result};
    pub use crate::fanout::{dispatch, run_fan_out, FanOut, FanOutBuilder, RoundOutcome};
    pub use crate::latency::{LatencyMetrics, LatencyTracker};
    pub use crate::outcome::{ErrorMeta, Outcome, OutcomeLog};
    pub use crate::prompts::{load_prompts, parse_prompts, Prompt};
    pub use crate::record::FanOutRecord;
    pub use crate::runner::BenchmarkRunner;
    pub use crate::storage::{ChatLog, ChatLogEntry, InMemorySink, JsonlSink, RecordSink};
    pub use crate::summary::{AgentSummary, BenchmarkSummary};
    pub use crate::validation::{
        run_validators, EmptyOutputValidator, LongOutputValidator, ShortOutputValidator,
        ValidationContext, ValidationPipeline, ValidationReport, ValidationResult, Validator,
    };
}
