//! Chunk definitions - the bounded units a source text is cut into.

use serde::{Deserialize, Serialize};

/// A contiguous span of source text treated as one processing unit.
///
/// Chunks are created once by the [`Segmenter`](crate::Segmenter) and never
/// mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Nominal chapter number. Not guaranteed to be contiguous or unique.
    pub chapter_number: u32,

    /// Heading detected near the chunk start, if any.
    pub title: Option<String>,

    /// Span text with surrounding whitespace trimmed.
    pub content: String,

    /// Byte offset of the span start in the source.
    pub start: usize,

    /// Byte offset one past the span end in the source.
    pub end: usize,

    /// Length of `content` in characters.
    pub length: usize,
}

impl Chunk {
    /// Create a chunk covering `start..end` of the source.
    pub fn new(chapter_number: u32, content: impl Into<String>, start: usize, end: usize) -> Self {
        let content = content.into();
        let length = content.chars().count();
        Self {
            chapter_number,
            title: None,
            content,
            start,
            end,
            length,
        }
    }

    /// Set the chunk title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the chunk title from an optional value.
    pub fn with_optional_title(mut self, title: Option<String>) -> Self {
        self.title = title;
        self
    }

    /// Size of the source span in bytes (may exceed `content` because of trimming).
    pub fn span_len(&self) -> usize {
        self.end - self.start
    }

    /// Title for display, falling back to the chapter number.
    pub fn display_title(&self) -> String {
        self.title
            .clone()
            .unwrap_or_else(|| format!("Chapter {}", self.chapter_number))
    }
}
