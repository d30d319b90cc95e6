//! Response validation
//!
//! Validators are stateless checks over one (prompt, response) pair. The
//! pipeline runs every validator in order, never short-circuits, and folds the
//! individual verdicts into a [`ValidationReport`].
//!
//! A failing validator is a content-quality signal, not an execution error:
//! the record it belongs to is still a successful call.

use serde::{Deserialize, Serialize};

mod basic;

pub use basic::{
    EmptyOutputValidator, LongOutputValidator, ShortOutputValidator, DEFAULT_MAX_OUTPUT_CHARS,
    DEFAULT_MIN_OUTPUT_CHARS,
};

use crate::config::ValidationConfig;

/// Everything a validator may look at
#[derive(Debug, Clone, Default)]
pub struct ValidationContext {
    pub user_prompt: String,
    pub model_response: Option<String>,
    pub model_name: String,
    pub max_output_chars: Option<usize>,
    pub max_output_tokens: Option<usize>,
}

impl ValidationContext {
    pub fn new(
        user_prompt: impl Into<String>,
        model_response: Option<String>,
        model_name: impl Into<String>,
    ) -> Self {
        Self {
            user_prompt: user_prompt.into(),
            model_response,
            model_name: model_name.into(),
            max_output_chars: None,
            max_output_tokens: None,
        }
    }

    pub fn with_max_output_chars(mut self, limit: usize) -> Self {
        self.max_output_chars = Some(limit);
        self
    }

    pub fn with_max_output_tokens(mut self, limit: usize) -> Self {
        self.max_output_tokens = Some(limit);
        self
    }

    /// Response with surrounding whitespace removed; absent counts as empty
    pub fn trimmed_response(&self) -> &str {
        self.model_response.as_deref().unwrap_or("").trim()
    }

    /// Build a result for this context
    pub fn result(&self, validator: &str, passed: bool) -> ValidationResult {
        ValidationResult {
            validator: validator.to_string(),
            user_prompt: self.user_prompt.clone(),
            model_response: self.model_response.clone().unwrap_or_default(),
            model_name: self.model_name.clone(),
            passed,
            error: None,
            meta: None,
        }
    }
}

/// Verdict of one validator on one response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub validator: String,
    pub user_prompt: String,
    pub model_response: String,
    pub model_name: String,
    pub passed: bool,
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<serde_json::Value>,
}

impl ValidationResult {
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn with_meta(mut self, meta: serde_json::Value) -> Self {
        self.meta = Some(meta);
        self
    }
}

/// Aggregated verdict over all validators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// AND of every result's `passed`
    #[serde(rename = "passed")]
    pub overall_passed: bool,
    /// Results in invocation order
    pub results: Vec<ValidationResult>,
}

impl ValidationReport {
    /// Errors of the failing results, in order
    pub fn failures(&self) -> impl Iterator<Item = &ValidationResult> {
        self.results.iter().filter(|r| !r.passed)
    }
}

/// A single stateless check
pub trait Validator: Send + Sync {
    /// Short identifier stored on each result
    fn name(&self) -> &'static str;

    /// Check one response
    fn validate(&self, context: &ValidationContext) -> ValidationResult;
}

/// Run every validator in order and aggregate the verdicts.
pub fn run_validators(
    context: &ValidationContext,
    validators: &[Box<dyn Validator>],
) -> ValidationReport {
    let results: Vec<ValidationResult> = validators
        .iter()
        .map(|validator| validator.validate(context))
        .collect();

    ValidationReport {
        overall_passed: results.iter().all(|r| r.passed),
        results,
    }
}

/// Ordered validator list with the thresholds it was built from
pub struct ValidationPipeline {
    validators: Vec<Box<dyn Validator>>,
    max_output_chars: Option<usize>,
    max_output_tokens: Option<usize>,
}

impl std::fmt::Debug for ValidationPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidationPipeline")
            .field("validators", &self.names())
            .field("max_output_chars", &self.max_output_chars)
            .finish()
    }
}

impl ValidationPipeline {
    /// Pipeline with no validators
    pub fn empty() -> Self {
        Self {
            validators: Vec::new(),
            max_output_chars: None,
            max_output_tokens: None,
        }
    }

    /// Empty, short and long output checks, in that order
    pub fn from_config(config: &ValidationConfig) -> Self {
        Self {
            validators: vec![
                Box::new(EmptyOutputValidator),
                Box::new(ShortOutputValidator::new(config.min_output_chars)),
                Box::new(LongOutputValidator::new(config.max_output_chars)),
            ],
            max_output_chars: Some(config.max_output_chars),
            max_output_tokens: config.max_output_tokens,
        }
    }

    /// Append a validator
    pub fn with_validator<V: Validator + 'static>(mut self, validator: V) -> Self {
        self.validators.push(Box::new(validator));
        self
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.validators.iter().map(|v| v.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    /// Context for one response carrying this pipeline's limits
    pub fn context(
        &self,
        user_prompt: &str,
        model_response: Option<String>,
        model_name: &str,
    ) -> ValidationContext {
        ValidationContext {
            user_prompt: user_prompt.to_string(),
            model_response,
            model_name: model_name.to_string(),
            max_output_chars: self.max_output_chars,
            max_output_tokens: self.max_output_tokens,
        }
    }

    /// Run every validator against `context`
    pub fn run(&self, context: &ValidationContext) -> ValidationReport {
        run_validators(context, &self.validators)
    }
}

impl Default for ValidationPipeline {
    fn default() -> Self {
        Self::from_config(&ValidationConfig::default())
    }
}
