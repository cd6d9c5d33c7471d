//! Context windows - a chunk together with the chunks that precede it.

use crate::Chunk;

/// Join the content of `chunks[index - include_previous ..= index]` with blank lines.
///
/// Indices past the end of the list are skipped, so an out-of-range `index`
/// still yields whatever preceding chunks exist in range.
pub fn context_window(chunks: &[Chunk], index: usize, include_previous: usize) -> String {
    let start = index.saturating_sub(include_previous);
    let end = index.saturating_add(1).min(chunks.len());
    if start >= end {
        return String::new();
    }

    chunks[start..end]
        .iter()
        .map(|chunk| chunk.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}
