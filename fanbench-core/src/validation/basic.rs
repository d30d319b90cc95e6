//! Length-based response checks

use serde_json::json;

use super::{ValidationContext, ValidationResult, Validator};

/// Default minimum trimmed length, in characters
pub const DEFAULT_MIN_OUTPUT_CHARS: usize = 10;

/// Default maximum trimmed length, in characters
pub const DEFAULT_MAX_OUTPUT_CHARS: usize = 300;

/// Fails when the trimmed response is empty (absent counts as empty).
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyOutputValidator;

impl Validator for EmptyOutputValidator {
    fn name(&self) -> &'static str {
        "empty_output"
    }

    fn validate(&self, context: &ValidationContext) -> ValidationResult {
        let is_empty = context.trimmed_response().is_empty();
        let result = context.result(self.name(), !is_empty);
        if is_empty {
            result.with_error("model_response is empty or whitespace")
        } else {
            result
        }
    }
}

/// Fails when the trimmed response is shorter than `min_chars`.
#[derive(Debug, Clone, Copy)]
pub struct ShortOutputValidator {
    min_chars: usize,
}

impl ShortOutputValidator {
    pub fn new(min_chars: usize) -> Self {
        Self { min_chars }
    }

    pub fn min_chars(&self) -> usize {
        self.min_chars
    }
}

impl Default for ShortOutputValidator {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_OUTPUT_CHARS)
    }
}

impl Validator for ShortOutputValidator {
    fn name(&self) -> &'static str {
        "short_output"
    }

    fn validate(&self, context: &ValidationContext) -> ValidationResult {
        let length = context.trimmed_response().chars().count();
        let too_short = length < self.min_chars;
        let result = context.result(self.name(), !too_short);
        if too_short {
            result
                .with_error("model_response is too short")
                .with_meta(json!({ "length": length, "min": self.min_chars }))
        } else {
            result
        }
    }
}

/// Fails when the trimmed response exceeds the context's `max_output_chars`,
/// or this validator's own limit when the context carries none.
#[derive(Debug, Clone, Copy)]
pub struct LongOutputValidator {
    default_limit: usize,
}

impl LongOutputValidator {
    pub fn new(default_limit: usize) -> Self {
        Self { default_limit }
    }
}

impl Default for LongOutputValidator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_OUTPUT_CHARS)
    }
}

impl Validator for LongOutputValidator {
    fn name(&self) -> &'static str {
        "long_output"
    }

    fn validate(&self, context: &ValidationContext) -> ValidationResult {
        let limit = context.max_output_chars.unwrap_or(self.default_limit);
        let length = context.trimmed_response().chars().count();
        let too_long = length > limit;
        let result = context.result(self.name(), !too_long);
        if too_long {
            result
                .with_error("model_response exceeds the length limit")
                .with_meta(json!({ "length": length, "limit": limit }))
        } else {
            result
        }
    }
}
