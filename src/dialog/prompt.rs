//! Prompt requests and input validation
//!
//! A step that needs a value from outside the process returns a
//! [`PromptRequest`]. On the following turn the raw reply is checked
//! against the request before the step sees it.

use super::state::StepValue;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Kind of value a prompt expects back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptKind {
    Text,
    Number,
}

impl PromptKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PromptKind::Text => "text",
            PromptKind::Number => "number",
        }
    }
}

/// An outbound request for exactly one value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptRequest {
    pub kind: PromptKind,
    pub text: String,
    /// Blank text is rejected when set. Ignored for numbers.
    #[serde(default)]
    pub required: bool,
}

impl PromptRequest {
    /// Mandatory free-text answer
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            kind: PromptKind::Text,
            text: text.into(),
            required: true,
        }
    }

    /// Free-text answer that may be left blank
    pub fn optional_text(text: impl Into<String>) -> Self {
        Self {
            kind: PromptKind::Text,
            text: text.into(),
            required: false,
        }
    }

    pub fn number(text: impl Into<String>) -> Self {
        Self {
            kind: PromptKind::Number,
            text: text.into(),
            required: true,
        }
    }

    /// Check a raw reply against this request.
    ///
    /// An absent reply is treated as an empty string. Text is handed back
    /// verbatim; numbers are parsed after trimming surrounding whitespace.
    pub fn validate(&self, raw: Option<&str>) -> Result<StepValue, ValidationError> {
        let raw = raw.unwrap_or_default();
        match self.kind {
            PromptKind::Text => {
                if self.required && raw.trim().is_empty() {
                    Err(ValidationError::MissingText)
                } else {
                    Ok(StepValue::Text(raw.to_string()))
                }
            }
            PromptKind::Number => raw
                .trim()
                .parse::<i32>()
                .map(StepValue::Number)
                .map_err(|_| ValidationError::NotANumber(raw.to_string())),
        }
    }
}

/// Recoverable, user-facing rejection of a reply
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("A non-empty answer is required")]
    MissingText,
    #[error("Not a whole number: {0:?}")]
    NotANumber(String),
}
