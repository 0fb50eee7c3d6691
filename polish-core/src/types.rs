//! Wire types for the generation endpoint and session-level state.

use serde::{Deserialize, Serialize};

/// Body of a streaming generation request.
///
/// Field order is part of the wire format seen by the server:
/// `{"model": ..., "prompt": ..., "stream": true}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub model: String,
    pub prompt: String,
    pub stream: bool,
}

impl GenerationRequest {
    /// Create a streaming request. `stream` is always `true`.
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            stream: true,
        }
    }
}

/// One JSON object of the streamed response body.
///
/// Only `response` drives the output. The remaining fields are what Ollama
/// sends alongside it and are kept for logging.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StreamChunk {
    #[serde(default)]
    pub response: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub done_reason: Option<String>,
    #[serde(default)]
    pub total_duration: Option<u64>,
    #[serde(default)]
    pub prompt_eval_count: Option<u64>,
    #[serde(default)]
    pub eval_count: Option<u64>,
    /// Set by the server instead of `response` when generation fails.
    #[serde(default)]
    pub error: Option<String>,
}

/// Lifecycle of a prompt session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleState {
    #[default]
    Idle,
    Loading,
}

impl LifecycleState {
    pub fn is_loading(&self) -> bool {
        matches!(self, LifecycleState::Loading)
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LifecycleState::Idle => write!(f, "idle"),
            LifecycleState::Loading => write!(f, "loading"),
        }
    }
}

/// How a submitted generation ended, when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    /// The stream ended normally; `text` is the final displayed result.
    Completed { text: String },
    /// The user cancelled; the displayed result was cleared.
    Cancelled,
}

impl GenerationOutcome {
    /// The final text, if the generation completed.
    pub fn text(&self) -> Option<&str> {
        match self {
            GenerationOutcome::Completed { text } => Some(text),
            GenerationOutcome::Cancelled => None,
        }
    }
}
