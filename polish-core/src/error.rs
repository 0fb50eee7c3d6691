//! Error types for the Polish core library.
//!
//! Uses `thiserror` for public API error types. Generation failures are split
//! by where they happen: before the request (validation), at the protocol
//! boundary, while decoding the body, or in the transport itself.

use std::path::PathBuf;

/// Generic notice shown to the user for any failed generation.
pub const GENERIC_FAILURE_NOTICE: &str = "An error occurred while generating the text.";

/// Notice shown when the submitted prompt is blank.
pub const EMPTY_PROMPT_NOTICE: &str = "Please enter a prompt.";

/// Top-level error type for the Polish core library.
#[derive(Debug, thiserror::Error)]
pub enum PolishError {
    #[error("Generation error: {0}")]
    Generate(#[from] GenerateError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors from a single streaming generation.
#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("Invalid prompt: {message}")]
    Validation { message: String },

    #[error("Streaming protocol error: {message}")]
    Protocol { message: String },

    #[error("Malformed stream payload: {message}")]
    Decode { message: String },

    #[error("Request to {endpoint} failed: {message}")]
    Network { endpoint: String, message: String },

    #[error("Generation was cancelled")]
    Cancelled,
}

impl GenerateError {
    /// Cancellation is a normal termination path, never reported to the user.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, GenerateError::Cancelled)
    }

    /// Short machine-readable label, used as a structured log field.
    pub fn kind(&self) -> &'static str {
        match self {
            GenerateError::Validation { .. } => "validation",
            GenerateError::Protocol { .. } => "protocol",
            GenerateError::Decode { .. } => "decode",
            GenerateError::Network { .. } => "network",
            GenerateError::Cancelled => "cancelled",
        }
    }

    /// The text of the blocking notice shown for this error.
    ///
    /// Failures are not distinguished in the UI beyond the generic message.
    pub fn user_message(&self) -> &'static str {
        match self {
            GenerateError::Validation { .. } => EMPTY_PROMPT_NOTICE,
            _ => GENERIC_FAILURE_NOTICE,
        }
    }
}

/// Errors from the configuration system.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Configuration parse error: {message}")]
    ParseError { message: String },
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        ConfigError::ParseError {
            message: err.to_string(),
        }
    }
}

/// A type alias for results using the top-level `PolishError`.
pub type Result<T> = std::result::Result<T, PolishError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_generate() {
        let err = PolishError::Generate(GenerateError::Network {
            endpoint: "http://localhost:11434/api/generate".into(),
            message: "connection refused".into(),
        });
        assert_eq!(
            err.to_string(),
            "Generation error: Request to http://localhost:11434/api/generate failed: connection refused"
        );
    }

    #[test]
    fn test_error_display_config() {
        let err = PolishError::Config(ConfigError::FileNotFound {
            path: PathBuf::from("/nope/config.toml"),
        });
        assert_eq!(
            err.to_string(),
            "Configuration error: Configuration file not found: /nope/config.toml"
        );
    }

    #[test]
    fn test_cancellation_is_not_an_error_kind() {
        assert!(GenerateError::Cancelled.is_cancellation());
        assert!(
            !GenerateError::Decode {
                message: "x".into()
            }
            .is_cancellation()
        );
    }

    #[test]
    fn test_kind_labels() {
        let cases = [
            (
                GenerateError::Validation {
                    message: String::new(),
                },
                "validation",
            ),
            (
                GenerateError::Protocol {
                    message: String::new(),
                },
                "protocol",
            ),
            (
                GenerateError::Decode {
                    message: String::new(),
                },
                "decode",
            ),
            (
                GenerateError::Network {
                    endpoint: String::new(),
                    message: String::new(),
                },
                "network",
            ),
            (GenerateError::Cancelled, "cancelled"),
        ];
        for (err, kind) in cases {
            assert_eq!(err.kind(), kind);
        }
    }

    #[test]
    fn test_user_message_is_generic() {
        let validation = GenerateError::Validation {
            message: "prompt is empty".into(),
        };
        assert_eq!(validation.user_message(), "Please enter a prompt.");

        let protocol = GenerateError::Protocol {
            message: "no body".into(),
        };
        let decode = GenerateError::Decode {
            message: "bad json".into(),
        };
        assert_eq!(protocol.user_message(), GENERIC_FAILURE_NOTICE);
        assert_eq!(decode.user_message(), protocol.user_message());
    }

    #[test]
    fn test_from_generate_error() {
        let err: PolishError = GenerateError::Cancelled.into();
        assert!(matches!(err, PolishError::Generate(GenerateError::Cancelled)));
    }
}
