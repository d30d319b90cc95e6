//! Outcome normalization
//!
//! Agents fail through very different channels (deadline, HTTP status,
//! missing credentials). [`OutcomeLog::set_from_result`] flattens every one of
//! them into the same display text and [`ErrorMeta`] shape.

use serde::{Deserialize, Serialize};
use std::sync::Mutex;

use crate::error::{AgentError, AgentResult};

/// Prefix of the display text synthesized for failed calls
pub const ERROR_PREFIX: &str = "ERROR: ";

/// Normalized result of one completed call attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    /// The agent produced text (possibly empty)
    Success { text: String },
    /// The call failed; no response body is kept
    Failure { kind: String, message: String },
}

impl Outcome {
    pub fn from_result(raw: &AgentResult<String>) -> Self {
        match raw {
            Ok(text) => Outcome::Success { text: text.clone() },
            Err(err) => Outcome::Failure {
                kind: err.kind().to_string(),
                message: err.to_string(),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }

    /// Text handed to validators and persisted as the response
    pub fn display_text(&self) -> String {
        match self {
            Outcome::Success { text } => text.clone(),
            Outcome::Failure { message, .. } => format!("{}{}", ERROR_PREFIX, message),
        }
    }

    /// Failure metadata for this outcome
    pub fn meta(&self) -> ErrorMeta {
        match self {
            Outcome::Success { .. } => ErrorMeta::ok(),
            Outcome::Failure { kind, message } => ErrorMeta::failed(kind.clone(), message.clone()),
        }
    }
}

/// Structured failure metadata persisted with every record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorMeta {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl ErrorMeta {
    pub fn ok() -> Self {
        Self {
            ok: true,
            error_kind: None,
            error_message: None,
        }
    }

    pub fn failed(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            ok: false,
            error_kind: Some(kind.into()),
            error_message: Some(message.into()),
        }
    }
}

/// Per-agent normalizer remembering the metadata of the last call
#[derive(Debug, Default)]
pub struct OutcomeLog {
    meta: Mutex<Option<ErrorMeta>>,
}

impl OutcomeLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalize a raw call result, record its metadata and return display text.
    ///
    /// A failure yields `"ERROR: <message>"`. A success yields its text
    /// unchanged, so an empty response stays `""` with `ok == true`.
    pub fn set_from_result(&self, raw: &AgentResult<String>) -> String {
        let outcome = Outcome::from_result(raw);
        let text = outcome.display_text();
        *self.meta.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(outcome.meta());
        text
    }

    /// Metadata from the last `set_from_result`, `None` before the first one
    pub fn get_meta(&self) -> Option<ErrorMeta> {
        self.meta
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl From<AgentError> for Outcome {
    fn from(err: AgentError) -> Self {
        Outcome::from_result(&Err(err))
    }
}
