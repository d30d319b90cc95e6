//! Configuration types for the fanbench harness

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{FanbenchError, Result};

/// Main configuration, built once at startup and passed down by reference
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FanbenchConfig {
    /// Fan-out harness configuration
    pub harness: HarnessConfig,

    /// Validator thresholds
    pub validation: ValidationConfig,

    /// Per-agent backend configuration
    pub agents: AgentsConfig,

    /// Output locations
    pub storage: StorageConfig,

    /// JSON file with the benchmark prompts
    pub prompts_path: PathBuf,
}

impl Default for FanbenchConfig {
    fn default() -> Self {
        Self {
            harness: HarnessConfig::default(),
            validation: ValidationConfig::default(),
            agents: AgentsConfig::default(),
            storage: StorageConfig::default(),
            prompts_path: PathBuf::from("benchmarks/prompts.json"),
        }
    }
}

/// Fan-out harness configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Deadline for each individual agent call
    #[serde(with = "humantime_serde")]
    pub call_timeout: Duration,

    /// Number of latency samples retained per agent
    pub latency_window: usize,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(20),
            latency_window: crate::latency::DEFAULT_WINDOW_SIZE,
        }
    }
}

/// Validator thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Responses shorter than this (trimmed, in chars) fail the short-output check
    pub min_output_chars: usize,

    /// Responses longer than this (trimmed, in chars) fail the long-output check
    pub max_output_chars: usize,

    /// Token budget carried in the validation context
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<usize>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            min_output_chars: crate::validation::DEFAULT_MIN_OUTPUT_CHARS,
            max_output_chars: crate::validation::DEFAULT_MAX_OUTPUT_CHARS,
            max_output_tokens: None,
        }
    }
}

/// Per-agent backend configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentsConfig {
    pub gemini: GeminiConfig,
    pub openrouter: OpenRouterConfig,
    pub stub: StubConfig,
}

/// Gemini backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    /// Model name
    pub model: String,

    /// API base URL
    pub base_url: String,

    /// API key (prefer the `GEMINI_API_KEY` env var)
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.5-flash".to_string(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            api_key: None,
        }
    }
}

/// OpenRouter (OpenAI-compatible) backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenRouterConfig {
    /// Model name, also used as the agent's display name
    pub model: String,

    /// API base URL
    pub base_url: String,

    /// API key (prefer the `OPENROUTER_API_KEY` env var)
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
}

impl Default for OpenRouterConfig {
    fn default() -> Self {
        Self {
            model: "meta-llama/llama-3.1-8b-instruct:free".to_string(),
            base_url: "https://openrouter.ai/api/v1".to_string(),
            api_key: None,
        }
    }
}

/// Stub agent configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StubConfig {
    pub display_name: String,

    /// Simulated delay per call
    #[serde(with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub delay: Option<Duration>,
}

impl Default for StubConfig {
    fn default() -> Self {
        Self {
            display_name: crate::agent::stub::STUB_DISPLAY_NAME.to_string(),
            delay: None,
        }
    }
}

/// Output locations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// JSON-lines file receiving benchmark records
    pub results_path: PathBuf,

    /// JSON-lines file receiving interactive chat entries
    pub chat_log_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            results_path: PathBuf::from("data/benchmark_results.jsonl"),
            chat_log_path: PathBuf::from("data/runs.jsonl"),
        }
    }
}

impl FanbenchConfig {
    /// Load configuration from file and environment variables.
    ///
    /// Loads in this order:
    /// 1. Default configuration
    /// 2. `fanbench.toml` in the working directory
    /// 3. The file named by `FANBENCH_CONFIG_PATH`
    /// 4. `FANBENCH_` environment variables, nested with `__`
    ///    (e.g. `FANBENCH_HARNESS__CALL_TIMEOUT=30s`)
    ///
    /// # Errors
    ///
    /// Returns an error if a configuration file is invalid or validation fails.
    pub fn load() -> Result<Self> {
        use figment::{
            Figment,
            providers::{Env, Format, Serialized, Toml},
        };

        let mut figment = Figment::from(Serialized::defaults(FanbenchConfig::default()))
            .merge(Toml::file("fanbench.toml"));

        if let Ok(path) = std::env::var("FANBENCH_CONFIG_PATH") {
            figment = figment.merge(Toml::file(path));
        }

        let config: FanbenchConfig = figment
            .merge(Env::prefixed("FANBENCH_").split("__"))
            .extract()
            .map_err(|e| {
                FanbenchError::Configuration(format!("Failed to load configuration: {}", e))
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        use figment::{
            Figment,
            providers::{Format, Serialized, Toml},
        };

        let config: FanbenchConfig = Figment::from(Serialized::defaults(FanbenchConfig::default()))
            .merge(Toml::file(path))
            .extract()
            .map_err(|e| {
                FanbenchError::Configuration(format!("Failed to load configuration file: {}", e))
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<()> {
        if self.harness.call_timeout.is_zero() {
            return Err(FanbenchError::Configuration(
                "harness.call_timeout must be greater than zero".to_string(),
            ));
        }
        if self.harness.latency_window == 0 {
            return Err(FanbenchError::Configuration(
                "harness.latency_window must be at least 1".to_string(),
            ));
        }
        if self.validation.min_output_chars > self.validation.max_output_chars {
            return Err(FanbenchError::Configuration(format!(
                "validation.min_output_chars ({}) exceeds validation.max_output_chars ({})",
                self.validation.min_output_chars, self.validation.max_output_chars
            )));
        }
        Ok(())
    }
}
