//! Property-based tests for the response pipeline using proptest.

use proptest::prelude::*;

use polish_core::decoder::Utf8StreamDecoder;
use polish_core::words::{DisplayedResult, WordBuffer};
use polish_core::{MockBackend, PromptSession, ResponseAssembler};
use polish_core::{GenerationConfig, NoOpCallback};
use std::sync::Arc;

fn ndjson_body(fragments: &[String]) -> Vec<u8> {
    let mut body = String::new();
    for fragment in fragments {
        body.push_str(&serde_json::json!({ "response": fragment, "done": false }).to_string());
        body.push('\n');
    }
    body.push_str("{\"response\":\"\",\"done\":true}\n");
    body.into_bytes()
}

/// Cut `bytes` at the given (sorted, deduplicated, in-range) offsets.
fn split_at_offsets(bytes: &[u8], mut cuts: Vec<usize>) -> Vec<Vec<u8>> {
    cuts.retain(|&c| c > 0 && c < bytes.len());
    cuts.sort_unstable();
    cuts.dedup();
    let mut chunks = Vec::new();
    let mut start = 0;
    for cut in cuts {
        chunks.push(bytes[start..cut].to_vec());
        start = cut;
    }
    chunks.push(bytes[start..].to_vec());
    chunks
}

fn assemble(chunks: &[Vec<u8>]) -> String {
    let mut assembler = ResponseAssembler::new();
    let mut result = DisplayedResult::new();
    for chunk in chunks {
        result.append(&assembler.feed(chunk).unwrap());
    }
    result.append(&assembler.finish().unwrap());
    result.text()
}

fn expected_text(fragments: &[String]) -> String {
    fragments
        .concat()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn fragment_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[a-zA-Z,.!?äöüß€😀 \n\t]{0,12}", 0..12)
}

// --- Chunking independence ---

proptest! {
    #[test]
    fn output_is_independent_of_chunk_boundaries(
        fragments in fragment_strategy(),
        cuts in prop::collection::vec(0usize..400, 0..20),
    ) {
        let body = ndjson_body(&fragments);
        let whole = assemble(&[body.clone()]);
        let chunked = assemble(&split_at_offsets(&body, cuts));
        prop_assert_eq!(&whole, &chunked);
        prop_assert_eq!(whole, expected_text(&fragments));
    }

    #[test]
    fn byte_at_a_time_matches_whole_body(fragments in fragment_strategy()) {
        let body = ndjson_body(&fragments);
        let bytes: Vec<Vec<u8>> = body.iter().map(|b| vec![*b]).collect();
        prop_assert_eq!(assemble(&bytes), expected_text(&fragments));
    }
}

// --- UTF-8 decoding ---

proptest! {
    #[test]
    fn decoder_reproduces_valid_utf8(
        text in "\\PC{0,64}",
        cuts in prop::collection::vec(0usize..256, 0..10),
    ) {
        let mut decoder = Utf8StreamDecoder::new();
        let mut out = String::new();
        for chunk in split_at_offsets(text.as_bytes(), cuts) {
            out.push_str(&decoder.decode(&chunk));
        }
        out.push_str(&decoder.finish());
        prop_assert_eq!(out, text);
    }

    #[test]
    fn decoder_never_panics_on_arbitrary_bytes(
        bytes in prop::collection::vec(any::<u8>(), 0..128),
        cuts in prop::collection::vec(0usize..128, 0..10),
    ) {
        let mut decoder = Utf8StreamDecoder::new();
        for chunk in split_at_offsets(&bytes, cuts) {
            decoder.decode(&chunk);
        }
        decoder.finish();
        prop_assert!(!decoder.has_pending());
    }
}

// --- Word buffer ---

proptest! {
    #[test]
    fn confirmed_words_never_contain_whitespace(fragments in fragment_strategy()) {
        let mut buffer = WordBuffer::new();
        for fragment in &fragments {
            for word in buffer.push(fragment) {
                prop_assert!(!word.is_empty());
                prop_assert!(!word.chars().any(char::is_whitespace));
            }
        }
    }
}

// --- Session over a scripted backend ---

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn session_result_matches_fragments(fragments in fragment_strategy()) {
        let refs: Vec<&str> = fragments.iter().map(String::as_str).collect();
        let backend = Arc::new(MockBackend::with_responses(&refs));
        let mut session =
            PromptSession::new(backend, GenerationConfig::default(), Arc::new(NoOpCallback));
        let outcome = tokio_test::block_on(session.submit("rewrite me")).unwrap();
        let expected = expected_text(&fragments);
        prop_assert_eq!(outcome.text(), Some(expected.as_str()));
    }
}
