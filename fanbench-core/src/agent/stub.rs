//! Offline stub agent
//!
//! Deterministic responses, no API key required. Useful for smoke runs and
//! for exercising the harness without network access.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::time::Duration;

use super::{Agent, ModelInfo};
use crate::error::AgentResult;
use crate::latency::LatencyTracker;
use crate::outcome::OutcomeLog;

/// Display name the stub registers under
pub const STUB_DISPLAY_NAME: &str = "Open-A.I.-0.01";

/// Response for prompts missing from the table
pub const STUB_FALLBACK: &str = "I am not sure";

static STUB_RESPONSES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("Hi Open AI", "Hi! How can I assist you today?"),
        (
            "What is the most trending language in the market?",
            "According to the internet it seems python for now",
        ),
        ("Can you give me the distance for the moon?", " "),
        ("Ok Bye Open A.I.", "Bye :D"),
    ])
});

/// Agent answering from a fixed table
pub struct StubAgent {
    delay: Option<Duration>,
    monitor: LatencyTracker,
    error_log: OutcomeLog,
}

impl StubAgent {
    pub fn new() -> Self {
        Self::with_window_size(crate::latency::DEFAULT_WINDOW_SIZE)
    }

    pub fn with_window_size(window_size: usize) -> Self {
        Self {
            delay: None,
            monitor: LatencyTracker::with_window_size(window_size),
            error_log: OutcomeLog::new(),
        }
    }

    /// Add a simulated delay before every response
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Canned response for `prompt`
    pub fn response_for(prompt: &str) -> &'static str {
        STUB_RESPONSES.get(prompt).copied().unwrap_or(STUB_FALLBACK)
    }
}

impl Default for StubAgent {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Agent for StubAgent {
    async fn generate(&self, prompt: &str) -> AgentResult<String> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(Self::response_for(prompt).to_string())
    }

    fn monitor(&self) -> &LatencyTracker {
        &self.monitor
    }

    fn error_log(&self) -> &OutcomeLog {
        &self.error_log
    }

    fn model_info(&self) -> ModelInfo {
        ModelInfo {
            provider: "stub".to_string(),
            model_name: STUB_DISPLAY_NAME.to_string(),
        }
    }
}
