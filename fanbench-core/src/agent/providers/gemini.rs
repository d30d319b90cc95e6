//! Gemini agent (Google Generative Language API)

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::agent::{Agent, ModelInfo};
use crate::config::GeminiConfig;
use crate::error::{AgentError, AgentResult};
use crate::latency::LatencyTracker;
use crate::outcome::OutcomeLog;

/// Env var holding the Gemini API key
pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Display name the Gemini agent registers under
pub const GEMINI_DISPLAY_NAME: &str = "Gemini-Flash-2.5";

/// Agent backed by `models/{model}:generateContent`.
pub struct GeminiAgent {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    monitor: LatencyTracker,
    error_log: OutcomeLog,
}

impl GeminiAgent {
    /// Create a new agent.
    ///
    /// # Arguments
    ///
    /// * `api_key` - Gemini API key
    /// * `model` - Model name (e.g., "gemini-2.5-flash")
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

    /// Create from configuration, falling back to `GEMINI_API_KEY`.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::MissingCredentials`] when no non-empty key is found.
    pub fn from_config(config: &GeminiConfig, latency_window: usize) -> AgentResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .or_else(|| std::env::var(GEMINI_API_KEY_ENV).ok())
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                AgentError::MissingCredentials(format!("Missing or invalid {}", GEMINI_API_KEY_ENV))
            })?;

        let mut agent = Self::new(api_key, config.model.clone(), config.base_url.clone());
        agent.monitor = LatencyTracker::with_window_size(latency_window);
        Ok(agent)
    }

    /// Get the model name.
    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Concatenate every text part of the first candidate.
fn collect_text(response: GenerateResponse) -> String {
    response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<String>()
        })
        .unwrap_or_default()
}

#[async_trait]
impl Agent for GeminiAgent {
    async fn generate(&self, prompt: &str) -> AgentResult<String> {
        let request = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: prompt }],
            }],
        };

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
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

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| AgentError::InvalidResponse(e.to_string()))?;

        Ok(collect_text(body))
    }

    fn monitor(&self) -> &LatencyTracker {
        &self.monitor
    }

    fn error_log(&self) -> &OutcomeLog {
        &self.error_log
    }

    fn model_info(&self) -> ModelInfo {
        ModelInfo {
            provider: "gemini".to_string(),
            model_name: self.model.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint() {
        let agent = GeminiAgent::new("key", "gemini-2.5-flash", "https://example.test/v1beta/");
        assert_eq!(
            agent.endpoint(),
            "https://example.test/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }

    #[test]
    fn test_collect_text_joins_parts() {
        let body: GenerateResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"Hello, "},{"text":"world"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(collect_text(body), "Hello, world");
    }

    #[test]
    fn test_no_candidates_is_empty_success() {
        let body: GenerateResponse = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(collect_text(body), "");
    }

    #[test]
    fn test_blank_key_is_missing_credentials() {
        figment::Jail::expect_with(|jail| {
            jail.set_env(GEMINI_API_KEY_ENV, "");
            let config = GeminiConfig {
                api_key: Some(String::new()),
                ..Default::default()
            };
            let err = GeminiAgent::from_config(&config, 10).err().unwrap();
            assert_eq!(err.kind(), "MissingCredentials");
            assert_eq!(err.to_string(), "Missing or invalid GEMINI_API_KEY");
            Ok(())
        });
    }

    #[test]
    fn test_key_from_env() {
        figment::Jail::expect_with(|jail| {
            jail.set_env(GEMINI_API_KEY_ENV, "env-key");
            let agent = GeminiAgent::from_config(&GeminiConfig::default(), 5).unwrap();
            assert_eq!(agent.api_key, "env-key");
            assert_eq!(agent.model(), "gemini-2.5-flash");
            assert_eq!(agent.monitor().window_size(), 5);
            Ok(())
        });
    }

    #[test]
    fn test_blank_config_key_falls_back_to_env() {
        figment::Jail::expect_with(|jail| {
            jail.set_env(GEMINI_API_KEY_ENV, "env-key");
            let config = GeminiConfig {
                api_key: Some("   ".to_string()),
                ..Default::default()
            };
            let agent = GeminiAgent::from_config(&config, 10).unwrap();
            assert_eq!(agent.api_key, "env-key");
            Ok(())
        });
    }
}
