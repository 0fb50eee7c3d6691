//! The byte-to-word pipeline for one response body.
//!
//! Bytes go through the UTF-8 decoder, the frame parser and the word buffer.
//! The assembler has no I/O so the whole pipeline can be driven from tests
//! with arbitrary chunk boundaries.

use tracing::{debug, info};

use crate::decoder::Utf8StreamDecoder;
use crate::error::GenerateError;
use crate::frames::FrameParser;
use crate::types::StreamChunk;
use crate::words::WordBuffer;

/// Per-request pipeline state. Create a new one for every request.
#[derive(Debug, Default)]
pub struct ResponseAssembler {
    decoder: Utf8StreamDecoder,
    frames: FrameParser,
    words: WordBuffer,
    frame_count: usize,
    finished: bool,
    /// Error raised after words were confirmed in the same call.
    failed: Option<GenerateError>,
}

impl ResponseAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one transport chunk; returns the words it confirmed.
    ///
    /// When a chunk confirms words and then hits an error, the words are
    /// returned and the error is held. Callers publish the words and then
    /// check [`take_failure`](Self::take_failure) before reading on.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<Vec<String>, GenerateError> {
        if let Some(err) = self.failed.take() {
            return Err(err);
        }
        let text = self.decoder.decode(chunk);
        self.absorb_text(&text)
    }

    /// Drain the pipeline at end of stream and return the remaining words.
    ///
    /// Fails if the body ended inside a JSON frame. Calling it again returns
    /// no words.
    pub fn finish(&mut self) -> Result<Vec<String>, GenerateError> {
        if let Some(err) = self.failed.take() {
            self.finished = true;
            return Err(err);
        }
        if self.finished {
            return Ok(Vec::new());
        }
        self.finished = true;

        let tail = self.decoder.finish();
        let mut words = self.absorb_text(&tail)?;
        self.frames.finish()?;

        // A replacement char from a dangling byte can complete words too.
        if let Some(last) = self.words.flush() {
            words.push(last);
        }
        debug!(frames = self.frame_count, "Response body drained");
        Ok(words)
    }

    /// The error held back by the last `feed`, if any.
    pub fn take_failure(&mut self) -> Option<GenerateError> {
        self.failed.take()
    }

    /// Number of JSON frames parsed so far.
    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    fn absorb_text(&mut self, text: &str) -> Result<Vec<String>, GenerateError> {
        if text.is_empty() {
            return Ok(Vec::new());
        }
        let mut confirmed = Vec::new();
        for frame in self.frames.push(text)? {
            self.frame_count += 1;
            match self.absorb_frame(frame) {
                Ok(words) => confirmed.extend(words),
                Err(err) if confirmed.is_empty() => return Err(err),
                Err(err) => {
                    self.failed = Some(err);
                    break;
                }
            }
        }
        if self.failed.is_none() {
            self.failed = self.frames.take_failure();
        }
        Ok(confirmed)
    }

    fn absorb_frame(&mut self, frame: StreamChunk) -> Result<Vec<String>, GenerateError> {
        if let Some(message) = frame.error {
            return Err(GenerateError::Protocol {
                message: format!("server reported an error: {}", message),
            });
        }
        if frame.done {
            info!(
                model = frame.model.as_deref().unwrap_or("unknown"),
                done_reason = frame.done_reason.as_deref().unwrap_or(""),
                eval_count = frame.eval_count.unwrap_or(0),
                prompt_eval_count = frame.prompt_eval_count.unwrap_or(0),
                total_duration_ms = frame.total_duration.unwrap_or(0) / 1_000_000,
                "Server marked generation done"
            );
        }
        Ok(self.words.push(&frame.response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn run(chunks: &[&[u8]]) -> Result<String, GenerateError> {
        let mut assembler = ResponseAssembler::new();
        let mut words = Vec::new();
        for chunk in chunks {
            words.extend(assembler.feed(chunk)?);
        }
        words.extend(assembler.finish()?);
        Ok(words.join(" "))
    }

    #[test]
    fn test_ollama_style_ndjson() {
        let text = run(&[
            b"{\"response\":\"Hi \",\"done\":false}\n",
            b"{\"response\":\"there!\",\"done\":false}\n",
            b"{\"response\":\"\",\"done\":true,\"eval_count\":2}\n",
        ])
        .unwrap();
        assert_eq!(text, "Hi there!");
    }

    #[test]
    fn test_multibyte_char_split_inside_frame() {
        let body = "{\"response\":\"Gr\u{fc}\u{df}e \"}{\"response\":\"aus K\u{f6}ln\"}";
        let bytes = body.as_bytes();
        // Split right after the first byte of "ü".
        let split = body.find('\u{fc}').unwrap() + 1;
        let text = run(&[&bytes[..split], &bytes[split..]]).unwrap();
        assert_eq!(text, "Grüße aus Köln");
    }

    #[test]
    fn test_server_error_frame_is_protocol_error() {
        let err = run(&[b"{\"error\":\"model 'llama9' not found\"}"]).unwrap_err();
        assert!(matches!(err, GenerateError::Protocol { .. }));
        assert!(err.to_string().contains("llama9"));
    }

    #[test]
    fn test_words_confirmed_before_malformed_frame() {
        let mut assembler = ResponseAssembler::new();
        assert_eq!(
            assembler.feed(b"{\"response\":\"One two \"}").unwrap(),
            vec!["One", "two"]
        );
        let err = assembler.feed(b"{not json}").unwrap_err();
        assert!(matches!(err, GenerateError::Decode { .. }));
        assert_eq!(assembler.frame_count(), 1);
    }

    #[test]
    fn test_words_in_same_chunk_as_error_frame_survive() {
        let mut assembler = ResponseAssembler::new();
        let words = assembler
            .feed(b"{\"response\":\"Kept words \"}\n{\"error\":\"boom\"}\n")
            .unwrap();
        assert_eq!(words, vec!["Kept", "words"]);
        let err = assembler.finish().unwrap_err();
        assert!(matches!(err, GenerateError::Protocol { .. }));
    }

    #[test]
    fn test_failure_is_available_right_after_its_chunk() {
        let mut assembler = ResponseAssembler::new();
        let words = assembler
            .feed(b"{\"response\":\"Good morning \"}\n{\"response\": nope}\n")
            .unwrap();
        assert_eq!(words, vec!["Good", "morning"]);
        assert!(matches!(
            assembler.take_failure(),
            Some(GenerateError::Decode { .. })
        ));
        assert!(assembler.take_failure().is_none());

        let mut assembler = ResponseAssembler::new();
        assembler
            .feed(b"{\"response\":\"Hi \"}\n{\"error\":\"boom\"}\n")
            .unwrap();
        assert!(matches!(
            assembler.take_failure(),
            Some(GenerateError::Protocol { .. })
        ));
    }

    #[test]
    fn test_truncated_body_fails_on_finish() {
        let mut assembler = ResponseAssembler::new();
        assembler.feed(b"{\"response\":\"Hi\"}{\"resp").unwrap();
        assert!(assembler.finish().is_err());
    }

    #[test]
    fn test_finish_twice_returns_nothing_new() {
        let mut assembler = ResponseAssembler::new();
        assembler.feed(b"{\"response\":\"last\"}").unwrap();
        assert_eq!(assembler.finish().unwrap(), vec!["last"]);
        assert!(assembler.finish().unwrap().is_empty());
    }

    #[test]
    fn test_empty_body() {
        assert_eq!(run(&[]).unwrap(), "");
    }
}
