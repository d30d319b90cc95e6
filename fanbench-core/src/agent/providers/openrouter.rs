//! OpenRouter agent (OpenAI-compatible chat completions)

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::agent::{Agent, ModelInfo};
use crate::config::OpenRouterConfig;
use crate::error::{AgentError, AgentResult};
use crate::latency::LatencyTracker;
use crate::outcome::OutcomeLog;

/// Env var holding the OpenRouter API key
pub const OPENROUTER_API_KEY_ENV: &str = "OPENROUTER_API_KEY";

/// Agent backed by an OpenAI-compatible `/chat/completions` endpoint.
pub struct OpenRouterAgent {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    monitor: LatencyTracker,
    error_log: OutcomeLog,
}

impl OpenRouterAgent {
    /// Create a new agent.
    ///
    /// # Arguments
    ///
    /// * `api_key` - OpenRouter API key
    /// * `model` - Model name (e.g., "meta-llama/llama-3.1-8b-instruct:free")
    /// * `base_url` - API base URL
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            monitor: LatencyTracker::new(),
            error_log: OutcomeLog::new(),
        }
    }

    /// Create from configuration, falling back to `OPENROUTER_API_KEY`.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::MissingCredentials`] when no non-empty key is found.
    pub fn from_config(config: &OpenRouterConfig, latency_window: usize) -> AgentResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .or_else(|| std::env::var(OPENROUTER_API_KEY_ENV).ok())
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                AgentError::MissingCredentials(format!(
                    "Missing or invalid {}",
                    OPENROUTER_API_KEY_ENV
                ))
            })?;

        let mut agent = Self::new(api_key, config.model.clone(), config.base_url.clone());
        agent.monitor = LatencyTracker::with_window_size(latency_window);
        Ok(agent)
    }

    /// Get the model name.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: Option<ChatMessageResponse>,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Extract the first choice's content; `null` content is an empty success.
fn first_content(response: ChatResponse) -> AgentResult<String> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| AgentError::InvalidResponse("API returned no choices".to_string()))?;

    Ok(choice.message.and_then(|m| m.content).unwrap_or_default())
}

#[async_trait]
impl Agent for OpenRouterAgent {
    async fn generate(&self, prompt: &str) -> AgentResult<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let url = format!("{}/chat/completions", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = super::error_body(response).await;
            let message = serde_json::from_str::<ApiError>(&text)
                .map(|e| e.error.message)
                .unwrap_or(text);
            return Err(AgentError::Upstream {
                status: status.as_u16(),
                message,
            });
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| AgentError::InvalidResponse(e.to_string()))?;

        first_content(body)
    }

    fn monitor(&self) -> &LatencyTracker {
        &self.monitor
    }

    fn error_log(&self) -> &OutcomeLog {
        &self.error_log
    }

    fn model_info(&self) -> ModelInfo {
        ModelInfo {
            provider: "openrouter".to_string(),
            model_name: self.model.clone(),
        }
    }
}
