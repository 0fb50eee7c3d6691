//! # Polish Core
//!
//! Core library for Polish, a streaming text-rewriting client for a local
//! Ollama server. Provides the generation backend, the byte-to-word response
//! pipeline, the prompt session with cancellation, and configuration.

pub mod assembler;
pub mod backend;
pub mod config;
pub mod decoder;
pub mod error;
pub mod frames;
pub mod prompt;
pub mod session;
pub mod types;
pub mod words;

// Re-export commonly used types at the crate root.
pub use assembler::ResponseAssembler;
pub use backend::{ByteStream, GenerateBackend, MockBackend, MockFailure, OllamaBackend};
pub use config::{
    GenerationConfig, PolishConfig, ServerConfig, UiConfig, config_exists, load_config,
};
pub use error::{
    ConfigError, EMPTY_PROMPT_NOTICE, GENERIC_FAILURE_NOTICE, GenerateError, PolishError, Result,
};
pub use prompt::Prompt;
pub use session::{
    CancelHandle, GenerationCallback, NoOpCallback, PromptSession, RecordingCallback,
};
pub use types::{GenerationOutcome, GenerationRequest, LifecycleState, StreamChunk};
pub use words::{DisplayedResult, WordBuffer};
