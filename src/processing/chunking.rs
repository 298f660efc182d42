//! Sentence-aligned chunking for long documents.
//!
//! Chunks are the unit of the map phase: every chunk holds whole sentences only, at most
//! `max_sentences` of them, so each summarization call sees a bounded, coherent slice of the
//! document. Sentence boundaries come from the UAX #29 segmentation in
//! `unicode-segmentation`; an individual sentence longer than any inference window is still
//! emitted as one chunk rather than sub-split.

use unicode_segmentation::UnicodeSegmentation;

/// Sentences accumulated per chunk when no override is configured.
pub const DEFAULT_MAX_SENTENCES: usize = 10;

/// Split text into trimmed, non-empty sentences in document order.
pub fn split_sentences(text: &str) -> Vec<&str> {
    text.unicode_sentences()
        .map(str::trim)
        .filter(|sentence| !sentence.is_empty())
        .collect()
}

/// Group the sentences of `text` into chunks of at most `max_sentences` sentences each.
///
/// Sentences are accumulated greedily and joined with a single space; the trailing partial
/// group becomes the final chunk. Empty or whitespace-only input produces no chunks. A
/// `max_sentences` below 1 is treated as 1.
pub fn chunk_by_sentences(text: &str, max_sentences: usize) -> Vec<String> {
    let max_sentences = max_sentences.max(1);
    let mut chunks = Vec::new();
    let mut current: Vec<&str> = Vec::with_capacity(max_sentences);

    for sentence in split_sentences(text) {
        current.push(sentence);
        if current.len() >= max_sentences {
            chunks.push(current.join(" "));
            current.clear();
        }
    }

    if !current.is_empty() {
        chunks.push(current.join(" "));
    }

    chunks
}
