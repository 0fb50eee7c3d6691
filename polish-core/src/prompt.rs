//! Prompt validation and template rendering.

use crate::config::INPUT_PLACEHOLDER;
use crate::error::GenerateError;

/// A validated, trimmed, non-empty user prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt(String);

impl Prompt {
    /// Trim `input` and reject it if nothing is left.
    pub fn parse(input: &str) -> Result<Self, GenerateError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(GenerateError::Validation {
                message: "prompt is empty".to_string(),
            });
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Substitute the prompt into `template`.
    ///
    /// Every `{input}` is replaced. A template without the placeholder gets the
    /// text appended after a space.
    pub fn render(&self, template: &str) -> String {
        if template.contains(INPUT_PLACEHOLDER) {
            template.replace(INPUT_PLACEHOLDER, &self.0)
        } else if template.trim().is_empty() {
            self.0.clone()
        } else {
            format!("{} {}", template.trim_end(), self.0)
        }
    }
}

impl std::fmt::Display for Prompt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
