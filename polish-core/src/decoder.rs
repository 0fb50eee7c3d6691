//! Incremental UTF-8 decoding of a chunked byte stream.
//!
//! Chunk boundaries fall anywhere, including inside a multi-byte character.
//! The decoder keeps the incomplete tail of one chunk and completes it with
//! the head of the next.

use std::char::REPLACEMENT_CHARACTER;

/// Stateful UTF-8 decoder. One instance per response body.
#[derive(Debug, Default)]
pub struct Utf8StreamDecoder {
    /// Bytes of a character that has started but not finished (at most 3).
    pending: Vec<u8>,
}

impl Utf8StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode the next chunk.
    ///
    /// Invalid sequences are replaced with U+FFFD; a truncated sequence at the
    /// end of `input` is held back until the next call.
    pub fn decode(&mut self, input: &[u8]) -> String {
        let mut bytes = std::mem::take(&mut self.pending);
        bytes.extend_from_slice(input);

        let mut out = String::with_capacity(bytes.len());
        let mut rest = bytes.as_slice();
        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    out.push_str(valid);
                    break;
                }
                Err(err) => {
                    let (valid, after) = rest.split_at(err.valid_up_to());
                    out.push_str(&String::from_utf8_lossy(valid));
                    match err.error_len() {
                        Some(len) => {
                            out.push(REPLACEMENT_CHARACTER);
                            rest = &after[len..];
                        }
                        None => {
                            self.pending = after.to_vec();
                            break;
                        }
                    }
                }
            }
        }
        out
    }

    /// Signal end of input. A dangling partial character becomes one U+FFFD.
    pub fn finish(&mut self) -> String {
        if self.pending.is_empty() {
            String::new()
        } else {
            self.pending.clear();
            REPLACEMENT_CHARACTER.to_string()
        }
    }

    /// Whether part of a character is waiting for more bytes.
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}
