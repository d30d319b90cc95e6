//! Prompt source

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use crate::error::{FanbenchError, Result};

/// Identifier given to prompts typed on the command line
pub const ADHOC_PROMPT_ID: &str = "adhoc";

/// One benchmark prompt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prompt {
    pub id: String,
    pub prompt: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Prompt {
    pub fn new(id: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            prompt: prompt.into(),
            tags: Vec::new(),
        }
    }

    /// A single untagged prompt with the ad-hoc id
    pub fn adhoc(prompt: impl Into<String>) -> Self {
        Self::new(ADHOC_PROMPT_ID, prompt)
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// First 55 characters, with `...` appended when truncated
    pub fn preview(&self) -> String {
        const PREVIEW_CHARS: usize = 55;
        if self.prompt.chars().count() > PREVIEW_CHARS {
            let head: String = self.prompt.chars().take(PREVIEW_CHARS).collect();
            format!("{}...", head)
        } else {
            self.prompt.clone()
        }
    }
}

/// Parse a JSON array of prompts.
///
/// # Errors
///
/// Returns [`FanbenchError::Prompts`] for malformed JSON, an empty list or
/// duplicate ids.
pub fn parse_prompts(json: &str) -> Result<Vec<Prompt>> {
    let prompts: Vec<Prompt> = serde_json::from_str(json)
        .map_err(|e| FanbenchError::Prompts(format!("invalid prompt file: {}", e)))?;

    if prompts.is_empty() {
        return Err(FanbenchError::Prompts("prompt file contains no prompts".to_string()));
    }

    let mut seen = HashSet::new();
    for prompt in &prompts {
        if !seen.insert(prompt.id.as_str()) {
            return Err(FanbenchError::Prompts(format!(
                "duplicate prompt id '{}'",
                prompt.id
            )));
        }
    }

    Ok(prompts)
}

/// Load prompts from a JSON file.
pub async fn load_prompts(path: impl AsRef<Path>) -> Result<Vec<Prompt>> {
    let path = path.as_ref();
    let json = tokio::fs::read_to_string(path).await.map_err(|e| {
        FanbenchError::Prompts(format!("failed to read {}: {}", path.display(), e))
    })?;
    parse_prompts(&json)
}
