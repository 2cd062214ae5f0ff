//! Splits text into code-point addressed chunks.

use crate::data::TruncateStrategy;

/// Maximum number of code points kept in a chunk preview.
pub const SNIPPET_LEN: usize = 200;

/// A contiguous slice of an input text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    pub chunk_id: String,
    pub text: String,
    /// Inclusive start, in code points.
    pub start: usize,
    /// Exclusive end, in code points.
    pub end: usize,
}

/// Chunks `text` into pieces of at most `chunk_size` code points.
///
/// `Truncate` yields a single chunk over the prefix. `Split` covers the whole
/// text with consecutive, non-overlapping chunks. `chunk_size` must be positive.
pub fn chunk_text(
    input_id: &str,
    text: &str,
    chunk_size: usize,
    strategy: TruncateStrategy,
) -> Vec<TextChunk> {
    let chunk_size = chunk_size.max(1);

    // Byte offset of every code point, plus the end of the string.
    let mut boundaries: Vec<usize> = text.char_indices().map(|(offset, _)| offset).collect();
    boundaries.push(text.len());
    let len = boundaries.len() - 1;

    let slice = |start: usize, end: usize| &text[boundaries[start]..boundaries[end]];

    match strategy {
        TruncateStrategy::Truncate => {
            let end = len.min(chunk_size);
            vec![TextChunk {
                chunk_id: format!("{}_0", input_id),
                text: slice(0, end).to_string(),
                start: 0,
                end,
            }]
        }
        TruncateStrategy::Split => {
            let mut chunks = Vec::with_capacity((len + chunk_size - 1) / chunk_size);
            let mut start = 0;
            while start < len {
                let end = (start + chunk_size).min(len);
                chunks.push(TextChunk {
                    chunk_id: format!("{}_{}", input_id, chunks.len()),
                    text: slice(start, end).to_string(),
                    start,
                    end,
                });
                start = end;
            }
            chunks
        }
    }
}

/// Preview of a chunk: unchanged when short, else the first 200 code points and `...`.
pub fn truncate_snippet(text: &str) -> String {
    match text.char_indices().nth(SNIPPET_LEN) {
        Some((offset, _)) => format!("{}...", &text[..offset]),
        None => text.to_string(),
    }
}
