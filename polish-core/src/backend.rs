//! Transport seam for streaming generation.
//!
//! Defines the `GenerateBackend` trait, the reqwest implementation talking to
//! an Ollama-compatible `/api/generate` endpoint, and a scripted
//! `MockBackend` for tests and offline use.

use crate::config::ServerConfig;
use crate::error::GenerateError;
use crate::types::GenerationRequest;
use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use reqwest::Client;
use std::pin::Pin;
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;

/// Longest slice of an HTTP error body carried into the error message.
const ERROR_BODY_PREVIEW: usize = 200;

/// The raw response body: chunks exactly as the transport delivers them.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, GenerateError>> + Send>>;

/// Something that can start a streaming generation.
#[async_trait]
pub trait GenerateBackend: Send + Sync {
    /// Send the request and return the response body as a byte stream.
    ///
    /// Implementations fail with `Protocol` when the response cannot be
    /// streamed and with `Network` when the transport fails.
    async fn open_stream(&self, request: &GenerationRequest) -> Result<ByteStream, GenerateError>;

    /// Human-readable target of the requests, used in logs.
    fn endpoint(&self) -> &str;
}

/// Backend for a local Ollama server (or anything speaking its generate API).
pub struct OllamaBackend {
    client: Client,
    endpoint: String,
}

impl OllamaBackend {
    /// Create a backend for the configured server.
    ///
    /// No request timeout is set: a generation runs until the server closes
    /// the stream or the user cancels.
    pub fn new(config: &ServerConfig) -> Result<Self, GenerateError> {
        let endpoint = config.endpoint();
        let client = Client::builder()
            .user_agent(concat!("polish/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| GenerateError::Network {
                endpoint: endpoint.clone(),
                message: format!("Failed to build HTTP client: {}", e),
            })?;
        Ok(Self { client, endpoint })
    }

    fn map_http_error(status: reqwest::StatusCode, body_text: &str) -> GenerateError {
        let body = body_text.trim();
        let body = match body.char_indices().nth(ERROR_BODY_PREVIEW) {
            Some((idx, _)) => &body[..idx],
            None => body,
        };
        match status.as_u16() {
            404 => GenerateError::Protocol {
                message: format!("HTTP 404 from server (unknown endpoint or model): {}", body),
            },
            _ => GenerateError::Protocol {
                message: format!("HTTP {} from server: {}", status, body),
            },
        }
    }
}

#[async_trait]
impl GenerateBackend for OllamaBackend {
    async fn open_stream(&self, request: &GenerationRequest) -> Result<ByteStream, GenerateError> {
        debug!(
            endpoint = self.endpoint.as_str(),
            model = request.model.as_str(),
            prompt_chars = request.prompt.chars().count(),
            "Sending streaming generation request"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| GenerateError::Network {
                endpoint: self.endpoint.clone(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(Self::map_http_error(status, &body_text));
        }

        if response.content_length() == Some(0) {
            return Err(GenerateError::Protocol {
                message: "Streaming not supported or no response body".to_string(),
            });
        }

        let endpoint = self.endpoint.clone();
        let body = response.bytes_stream().map(move |chunk| {
            chunk.map_err(|e| GenerateError::Network {
                endpoint: endpoint.clone(),
                message: format!("Failed to read streaming chunk: {}", e),
            })
        });
        Ok(Box::pin(body))
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// Failure modes the mock backend can simulate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFailure {
    /// `open_stream` fails as if the server were unreachable.
    Unreachable,
    /// The response has no body to stream.
    NoBody,
    /// The body breaks off with a transport error after the scripted chunks.
    BrokenStream,
}

/// A scripted backend that replays fixed body chunks.
pub struct MockBackend {
    chunks: Vec<Bytes>,
    delay: Option<Duration>,
    hang_after_chunks: bool,
    failure: Option<MockFailure>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            chunks: Vec::new(),
            delay: None,
            hang_after_chunks: false,
            failure: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Replay these raw chunks as the response body.
    pub fn with_chunks<I, B>(chunks: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        let mut backend = Self::new();
        backend.chunks = chunks.into_iter().map(Into::into).collect();
        backend
    }

    /// Replay one newline-terminated `{"response": ...}` frame per chunk.
    pub fn with_responses(responses: &[&str]) -> Self {
        Self::with_chunks(responses.iter().map(|text| Self::frame(text)))
    }

    /// Serialize a single response frame the way the server does.
    pub fn frame(text: &str) -> Bytes {
        let mut line = serde_json::json!({ "response": text, "done": false }).to_string();
        line.push('\n');
        Bytes::from(line)
    }

    /// Wait this long before yielding each chunk.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Keep the stream open forever after the last chunk.
    pub fn hang_after_chunks(mut self) -> Self {
        self.hang_after_chunks = true;
        self
    }

    pub fn failing_with(mut self, failure: MockFailure) -> Self {
        self.failure = Some(failure);
        self
    }

    /// Every request received so far, in order.
    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GenerateBackend for MockBackend {
    async fn open_stream(&self, request: &GenerationRequest) -> Result<ByteStream, GenerateError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }

        match self.failure {
            Some(MockFailure::Unreachable) => {
                return Err(GenerateError::Network {
                    endpoint: self.endpoint().to_string(),
                    message: "connection refused".to_string(),
                });
            }
            Some(MockFailure::NoBody) => {
                return Err(GenerateError::Protocol {
                    message: "Streaming not supported or no response body".to_string(),
                });
            }
            _ => {}
        }

        let delay = self.delay;
        let body = futures::stream::iter(self.chunks.clone()).then(move |chunk| async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            Ok::<_, GenerateError>(chunk)
        });

        let stream: ByteStream = if self.failure == Some(MockFailure::BrokenStream) {
            let endpoint = self.endpoint().to_string();
            Box::pin(body.chain(futures::stream::once(async move {
                Err(GenerateError::Network {
                    endpoint,
                    message: "connection reset by peer".to_string(),
                })
            })))
        } else if self.hang_after_chunks {
            Box::pin(body.chain(futures::stream::pending()))
        } else {
            Box::pin(body)
        };
        Ok(stream)
    }

    fn endpoint(&self) -> &str {
        "mock://generate"
    }
}
