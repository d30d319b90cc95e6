//! Error types for fanbench operations
//!
//! Two layers of errors exist. [`FanbenchError`] covers conditions outside any
//! agent's control (bad configuration, empty agent selection, unreadable
//! prompt files, storage failures) and is the only error type that escapes the
//! orchestrator. [`AgentError`] is the typed failure a single agent call
//! produces; it never crosses the fan-out boundary as an error and is instead
//! folded into that agent's record.

use std::time::Duration;

/// Result type for fanbench operations
pub type Result<T> = std::result::Result<T, FanbenchError>;

/// Result type for a single agent call
pub type AgentResult<T> = std::result::Result<T, AgentError>;

/// Error types for the fanbench harness
#[derive(Debug, thiserror::Error)]
pub enum FanbenchError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A fan-out round was requested with no agents
    #[error("No agents selected")]
    NoAgents,

    /// Agent key not recognised
    #[error("Unknown agent: {0}")]
    UnknownAgent(String),

    /// Prompt source could not be loaded
    #[error("Prompt error: {0}")]
    Prompts(String),

    /// Persistence failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<String> for FanbenchError {
    fn from(s: String) -> Self {
        FanbenchError::Other(s)
    }
}

impl From<&str> for FanbenchError {
    fn from(s: &str) -> Self {
        FanbenchError::Other(s.to_string())
    }
}

/// Failure of one agent call.
///
/// Carried across the task boundary as a value; [`AgentError::kind`] gives the
/// classification name that ends up in persisted records.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AgentError {
    /// The call did not finish before its deadline
    #[error("agent call exceeded its {0:?} deadline")]
    Timeout(Duration),

    /// Credentials required by the backing service are missing
    #[error("{0}")]
    MissingCredentials(String),

    /// The backing service answered with an error status
    #[error("upstream error ({status}): {message}")]
    Upstream { status: u16, message: String },

    /// The request could not be sent or the response could not be read
    #[error("transport error: {0}")]
    Transport(String),

    /// The response body did not have the expected shape
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The task running the call panicked
    #[error("agent task panicked: {0}")]
    Panicked(String),
}

impl AgentError {
    /// Stable classification name for this failure.
    pub fn kind(&self) -> &'static str {
        match self {
            AgentError::Timeout(_) => "Timeout",
            AgentError::MissingCredentials(_) => "MissingCredentials",
            AgentError::Upstream { .. } => "UpstreamError",
            AgentError::Transport(_) => "TransportError",
            AgentError::InvalidResponse(_) => "InvalidResponse",
            AgentError::Panicked(_) => "Panic",
        }
    }

    /// Whether this failure came from the harness deadline rather than the agent.
    pub fn is_timeout(&self) -> bool {
        matches!(self, AgentError::Timeout(_))
    }
}

impl From<reqwest::Error> for AgentError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            AgentError::InvalidResponse(err.to_string())
        } else {
            AgentError::Transport(err.to_string())
        }
    }
}
