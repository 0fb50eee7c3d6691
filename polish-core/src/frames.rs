//! JSON frame parsing for the decoded response body.
//!
//! The server writes one JSON object per line, but the transport is free to
//! deliver several objects in one chunk or split an object over several. The
//! parser yields every complete object and holds back an unfinished one.

use serde_json::Deserializer;
use tracing::debug;

use crate::error::GenerateError;
use crate::types::StreamChunk;

/// Longest slice of offending text quoted in a decode error.
const PREVIEW_LEN: usize = 120;

/// Incremental parser from body text to [`StreamChunk`]s.
#[derive(Debug, Default)]
pub struct FrameParser {
    pending: String,
    /// A decode error found after good frames in the same push. Reported by
    /// the next call so those frames are delivered first.
    failed: Option<GenerateError>,
}

impl FrameParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append decoded text and return every frame it completes.
    ///
    /// A syntax or type error anywhere in the buffered text is fatal. Frames
    /// that precede the error are returned first and the error is held for
    /// [`take_failure`](Self::take_failure), or raised by the next `push` or
    /// `finish`.
    pub fn push(&mut self, text: &str) -> Result<Vec<StreamChunk>, GenerateError> {
        if let Some(err) = self.failed.take() {
            return Err(err);
        }
        self.pending.push_str(text);

        let mut frames = Vec::new();
        let consumed = {
            let mut stream = Deserializer::from_str(&self.pending).into_iter::<StreamChunk>();
            loop {
                match stream.next() {
                    Some(Ok(frame)) => frames.push(frame),
                    Some(Err(err)) if err.is_eof() => break,
                    Some(Err(err)) => {
                        let err = GenerateError::Decode {
                            message: format!("{} in {:?}", err, preview(&self.pending)),
                        };
                        if frames.is_empty() {
                            return Err(err);
                        }
                        self.failed = Some(err);
                        return Ok(frames);
                    }
                    None => break,
                }
            }
            stream.byte_offset()
        };
        self.pending.drain(..consumed);

        if !self.pending.trim().is_empty() {
            debug!(
                buffered = self.pending.len(),
                "Holding incomplete frame until more data arrives"
            );
        }
        Ok(frames)
    }

    /// The error held back by the last `push`, if any.
    pub fn take_failure(&mut self) -> Option<GenerateError> {
        self.failed.take()
    }

    /// Signal end of input. Leftover non-whitespace text is a truncated frame.
    pub fn finish(&mut self) -> Result<(), GenerateError> {
        if let Some(err) = self.failed.take() {
            return Err(err);
        }
        let leftover = std::mem::take(&mut self.pending);
        if leftover.trim().is_empty() {
            Ok(())
        } else {
            Err(GenerateError::Decode {
                message: format!(
                    "stream ended inside a JSON frame: {:?}",
                    preview(&leftover)
                ),
            })
        }
    }
}

fn preview(text: &str) -> &str {
    let text = text.trim();
    match text.char_indices().nth(PREVIEW_LEN) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn responses(frames: &[StreamChunk]) -> Vec<&str> {
        frames.iter().map(|f| f.response.as_str()).collect()
    }

    #[test]
    fn test_one_frame_per_chunk() {
        let mut parser = FrameParser::new();
        let frames = parser.push(r#"{"response":"Hi "}"#).unwrap();
        assert_eq!(responses(&frames), vec!["Hi "]);
        let frames = parser.push("\n{\"response\":\"there!\"}\n").unwrap();
        assert_eq!(responses(&frames), vec!["there!"]);
        parser.finish().unwrap();
    }

    #[test]
    fn test_several_frames_in_one_chunk() {
        let mut parser = FrameParser::new();
        let frames = parser
            .push("{\"response\":\"a\"}\n{\"response\":\"b\"}{\"response\":\"c\"}\n")
            .unwrap();
        assert_eq!(responses(&frames), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_frame_split_across_chunks() {
        let mut parser = FrameParser::new();
        assert!(parser.push("{\"respo").unwrap().is_empty());
        assert!(parser.push("nse\":\"Hel").unwrap().is_empty());
        let frames = parser.push("lo\"}\n{\"response\"").unwrap();
        assert_eq!(responses(&frames), vec!["Hello"]);
        let frames = parser.push(":\" world\"}").unwrap();
        assert_eq!(responses(&frames), vec![" world"]);
        parser.finish().unwrap();
    }

    #[test]
    fn test_syntax_error_is_fatal() {
        let mut parser = FrameParser::new();
        let err = parser.push("{\"response\": oops}").unwrap_err();
        assert!(matches!(err, GenerateError::Decode { .. }));
    }

    #[test]
    fn test_frames_before_error_are_delivered_first() {
        let mut parser = FrameParser::new();
        let frames = parser
            .push("{\"response\":\"ok \"}\n{\"response\": nope}\n")
            .unwrap();
        assert_eq!(responses(&frames), vec!["ok "]);
        let err = parser.push("{\"response\":\"late\"}").unwrap_err();
        assert!(matches!(err, GenerateError::Decode { .. }));

        let mut parser = FrameParser::new();
        parser
            .push("{\"response\":\"ok \"}\n{\"response\": nope}\n")
            .unwrap();
        assert!(matches!(
            parser.take_failure(),
            Some(GenerateError::Decode { .. })
        ));
        assert!(parser.take_failure().is_none());

        let mut parser = FrameParser::new();
        parser.push("{\"response\":\"ok\"}{]").unwrap();
        assert!(matches!(
            parser.finish(),
            Err(GenerateError::Decode { .. })
        ));
    }

    #[test]
    fn test_wrong_type_is_fatal() {
        let mut parser = FrameParser::new();
        let err = parser.push("{\"response\": 42}").unwrap_err();
        assert!(matches!(err, GenerateError::Decode { .. }));
    }

    #[test]
    fn test_plain_text_body_is_fatal() {
        let mut parser = FrameParser::new();
        let err = parser.push("404 page not found").unwrap_err();
        assert!(matches!(err, GenerateError::Decode { .. }));
    }

    #[test]
    fn test_truncated_frame_at_end_is_an_error() {
        let mut parser = FrameParser::new();
        assert!(parser.push("{\"response\":\"cut").unwrap().is_empty());
        let err = parser.finish().unwrap_err();
        assert!(err.to_string().contains("stream ended inside a JSON frame"));
    }

    #[test]
    fn test_trailing_whitespace_is_fine() {
        let mut parser = FrameParser::new();
        parser.push("{\"response\":\"x\"}\n\n  ").unwrap();
        parser.finish().unwrap();
    }

    #[test]
    fn test_preview_is_char_bounded() {
        let long = "é".repeat(PREVIEW_LEN * 2);
        assert_eq!(preview(&long).chars().count(), PREVIEW_LEN);
    }
}
