//! The prompt session: submits a prompt, consumes the streamed response, and
//! publishes whole words as they are confirmed.
//!
//! All mutable state lives in the session object. Cancellation goes through a
//! cloneable [`CancelHandle`] that always targets the request currently in
//! flight; every request gets a fresh token.

use crate::assembler::ResponseAssembler;
use crate::backend::GenerateBackend;
use crate::config::GenerationConfig;
use crate::error::GenerateError;
use crate::prompt::Prompt;
use crate::types::{GenerationOutcome, GenerationRequest, LifecycleState};
use crate::words::DisplayedResult;
use futures::StreamExt;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, warn};

/// Receives progress from a session. Implemented by the front-end.
#[async_trait::async_trait]
pub trait GenerationCallback: Send + Sync {
    /// The lifecycle state changed.
    async fn on_state_change(&self, state: LifecycleState);

    /// Words were confirmed. `delta` is what was appended to the rendered
    /// result (with a leading space when needed); `text` is the full result.
    async fn on_progress(&self, delta: &str, text: &str);

    /// The stream ended normally.
    async fn on_complete(&self, text: &str);

    /// A generation failed. The front-end shows a blocking notice.
    async fn on_error(&self, error: &GenerateError);

    /// The user cancelled. The displayed result is already cleared; the
    /// front-end clears its input.
    async fn on_cancelled(&self) {}
}

/// Callback that ignores every event.
pub struct NoOpCallback;

#[async_trait::async_trait]
impl GenerationCallback for NoOpCallback {
    async fn on_state_change(&self, _state: LifecycleState) {}
    async fn on_progress(&self, _delta: &str, _text: &str) {}
    async fn on_complete(&self, _text: &str) {}
    async fn on_error(&self, _error: &GenerateError) {}
}

/// A callback that records all events for test assertions.
pub struct RecordingCallback {
    states: tokio::sync::Mutex<Vec<LifecycleState>>,
    deltas: tokio::sync::Mutex<Vec<String>>,
    completed: tokio::sync::Mutex<Vec<String>>,
    errors: tokio::sync::Mutex<Vec<String>>,
    cancellations: tokio::sync::Mutex<usize>,
}

impl RecordingCallback {
    pub fn new() -> Self {
        Self {
            states: tokio::sync::Mutex::new(Vec::new()),
            deltas: tokio::sync::Mutex::new(Vec::new()),
            completed: tokio::sync::Mutex::new(Vec::new()),
            errors: tokio::sync::Mutex::new(Vec::new()),
            cancellations: tokio::sync::Mutex::new(0),
        }
    }

    pub async fn states(&self) -> Vec<LifecycleState> {
        self.states.lock().await.clone()
    }

    pub async fn deltas(&self) -> Vec<String> {
        self.deltas.lock().await.clone()
    }

    pub async fn completed(&self) -> Vec<String> {
        self.completed.lock().await.clone()
    }

    /// Error kinds (see [`GenerateError::kind`]) in the order reported.
    pub async fn errors(&self) -> Vec<String> {
        self.errors.lock().await.clone()
    }

    pub async fn cancellations(&self) -> usize {
        *self.cancellations.lock().await
    }
}

impl Default for RecordingCallback {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl GenerationCallback for RecordingCallback {
    async fn on_state_change(&self, state: LifecycleState) {
        self.states.lock().await.push(state);
    }
    async fn on_progress(&self, delta: &str, _text: &str) {
        self.deltas.lock().await.push(delta.to_string());
    }
    async fn on_complete(&self, text: &str) {
        self.completed.lock().await.push(text.to_string());
    }
    async fn on_error(&self, error: &GenerateError) {
        self.errors.lock().await.push(error.kind().to_string());
    }
    async fn on_cancelled(&self) {
        *self.cancellations.lock().await += 1;
    }
}

/// Cancels whichever request of a session is currently in flight.
#[derive(Clone, Default)]
pub struct CancelHandle {
    active: Arc<Mutex<Option<CancellationToken>>>,
}

impl CancelHandle {
    /// Signal the active request. Returns `false` if nothing was in flight.
    pub fn cancel(&self) -> bool {
        let Ok(active) = self.active.lock() else {
            return false;
        };
        match active.as_ref() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Whether a request is currently registered.
    pub fn is_active(&self) -> bool {
        self.active.lock().map(|a| a.is_some()).unwrap_or(false)
    }

    /// Install a fresh token for a new request.
    fn arm(&self) -> CancellationToken {
        let token = CancellationToken::new();
        if let Ok(mut active) = self.active.lock() {
            *active = Some(token.clone());
        }
        token
    }

    fn disarm(&self) {
        if let Ok(mut active) = self.active.lock() {
            *active = None;
        }
    }
}

/// One streaming prompt client: submit, progressive display, cancellation.
pub struct PromptSession {
    backend: Arc<dyn GenerateBackend>,
    config: GenerationConfig,
    callback: Arc<dyn GenerationCallback>,
    state: LifecycleState,
    displayed: DisplayedResult,
    cancel: CancelHandle,
}

impl PromptSession {
    pub fn new(
        backend: Arc<dyn GenerateBackend>,
        config: GenerationConfig,
        callback: Arc<dyn GenerationCallback>,
    ) -> Self {
        Self {
            backend,
            config,
            callback,
            state: LifecycleState::Idle,
            displayed: DisplayedResult::new(),
            cancel: CancelHandle::default(),
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn displayed(&self) -> &DisplayedResult {
        &self.displayed
    }

    /// The rendered result text.
    pub fn result_text(&self) -> String {
        self.displayed.text()
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    /// Switch the model used by later requests.
    pub fn set_model(&mut self, model: impl Into<String>) {
        self.config.model = model.into();
    }

    /// A handle that cancels whatever request this session has in flight.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Clear the displayed result while idle.
    pub fn reset(&mut self) {
        self.displayed.clear();
    }

    /// Submit a prompt and stream the response until it ends, fails, or is
    /// cancelled.
    ///
    /// A blank prompt fails with `Validation` before any request is made.
    /// Cancellation is not an error: it returns `Ok(GenerationOutcome::Cancelled)`.
    /// The session is `Idle` again when this returns, whatever the outcome.
    pub async fn submit(&mut self, input: &str) -> Result<GenerationOutcome, GenerateError> {
        let prompt = match Prompt::parse(input) {
            Ok(prompt) => prompt,
            Err(err) => {
                warn!(error = %err, "Rejected blank prompt");
                self.callback.on_error(&err).await;
                return Err(err);
            }
        };

        let request = GenerationRequest::new(
            self.config.model.clone(),
            prompt.render(&self.config.prompt_template),
        );

        self.displayed.clear();
        self.set_state(LifecycleState::Loading).await;
        let token = self.cancel.arm();

        let span = info_span!(
            "generation",
            id = %uuid::Uuid::new_v4(),
            model = request.model.as_str()
        );
        let result = self.stream_response(&request, &token).instrument(span).await;

        // Runs on every path out of the stream loop.
        self.cancel.disarm();
        let outcome = match result {
            Ok(()) => {
                let text = self.displayed.text();
                info!(words = self.displayed.len(), "Generation complete");
                self.callback.on_complete(&text).await;
                Ok(GenerationOutcome::Completed { text })
            }
            Err(err) if err.is_cancellation() => {
                info!("Generation cancelled");
                self.displayed.clear();
                self.callback.on_cancelled().await;
                Ok(GenerationOutcome::Cancelled)
            }
            Err(err) => {
                error!(
                    kind = err.kind(),
                    error = %err,
                    kept_words = self.displayed.len(),
                    "Generation failed"
                );
                self.callback.on_error(&err).await;
                Err(err)
            }
        };
        self.set_state(LifecycleState::Idle).await;
        outcome
    }

    /// The read loop. Owns the body stream; it is released when this returns.
    async fn stream_response(
        &mut self,
        request: &GenerationRequest,
        token: &CancellationToken,
    ) -> Result<(), GenerateError> {
        info!(endpoint = self.backend.endpoint(), "Starting generation");

        let mut body = tokio::select! {
            biased;
            _ = token.cancelled() => return Err(GenerateError::Cancelled),
            opened = self.backend.open_stream(request) => opened?,
        };

        let mut assembler = ResponseAssembler::new();
        loop {
            let next = tokio::select! {
                biased;
                _ = token.cancelled() => return Err(GenerateError::Cancelled),
                next = body.next() => next,
            };
            let Some(chunk) = next else {
                break;
            };
            let chunk = chunk?;
            debug!(bytes = chunk.len(), "Received chunk");
            let words = assembler.feed(&chunk)?;
            self.publish(&words, token).await?;
            if let Some(err) = assembler.take_failure() {
                return Err(err);
            }
        }

        debug!(frames = assembler.frame_count(), "Stream completed");
        let last = assembler.finish()?;
        self.publish(&last, token).await
    }

    async fn publish(
        &mut self,
        words: &[String],
        token: &CancellationToken,
    ) -> Result<(), GenerateError> {
        if words.is_empty() {
            return Ok(());
        }
        if token.is_cancelled() {
            return Err(GenerateError::Cancelled);
        }
        let delta = self.displayed.append(words);
        if !delta.is_empty() {
            self.callback
                .on_progress(&delta, &self.displayed.text())
                .await;
        }
        Ok(())
    }

    async fn set_state(&mut self, state: LifecycleState) {
        if self.state != state {
            self.state = state;
            self.callback.on_state_change(state).await;
        }
    }
}
