//! Segmenter - splits a full text into ordered chunks.
//!
//! Segmentation works in two modes:
//! 1. **Boundaries**: chapter/episode/book markers are detected and each chunk
//!    runs from its marker to the next one (or to the end of the text)
//! 2. **Fixed size**: when no marker survives, the text is cut into windows of
//!    at most `max_chunk_size` characters, preferring a sentence end followed by
//!    a line break, with `overlap_size` characters repeated between windows
//!
//! Absent markers are never an error; every text with non-whitespace content
//! yields at least one chunk.

mod ordinal;
mod patterns;

pub use ordinal::*;
pub use patterns::*;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{Chunk, Result, TextError};

/// Sentence terminators followed by a line break, accepted as fixed-size cut points.
const SENTENCE_BREAKS: [&str; 7] = ["。\n\n", "。\n", "！\n", "？\n", "!\n", "?\n", ".\n"];

/// Configuration for segmentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmenterConfig {
    /// Maximum characters per fixed-size window.
    pub max_chunk_size: usize,

    /// Characters repeated between consecutive fixed-size windows.
    pub overlap_size: usize,

    /// Marker hits this many characters or fewer after the last kept marker
    /// are treated as the same boundary.
    pub boundary_dedup_distance: usize,

    /// A sentence cut is only accepted past this fraction of the window.
    pub min_split_ratio: f32,

    /// Characters after a marker scanned for a title line.
    pub title_scan_chars: usize,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: 8000,
            overlap_size: 500,
            boundary_dedup_distance: 50,
            min_split_ratio: 0.5,
            title_scan_chars: 200,
        }
    }
}

impl SegmenterConfig {
    /// Reject settings that would stall or loop the fixed-size split.
    pub fn validate(&self) -> Result<()> {
        if self.max_chunk_size == 0 {
            return Err(TextError::InvalidConfig(
                "max_chunk_size must be greater than zero".into(),
            ));
        }
        if self.overlap_size >= self.max_chunk_size {
            return Err(TextError::InvalidConfig(format!(
                "overlap_size ({}) must be smaller than max_chunk_size ({})",
                self.overlap_size, self.max_chunk_size
            )));
        }
        if !(0.0..1.0).contains(&self.min_split_ratio) {
            return Err(TextError::InvalidConfig(format!(
                "min_split_ratio ({}) must be in [0, 1)",
                self.min_split_ratio
            )));
        }
        Ok(())
    }
}

/// Splits source text into chunks.
#[derive(Debug, Clone, Default)]
pub struct Segmenter {
    config: SegmenterConfig,
}

impl Segmenter {
    /// Create a segmenter, validating the configuration.
    pub fn new(config: SegmenterConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Create a segmenter with default configuration.
    pub fn with_defaults() -> Self {
        Self::default()
    }

    pub fn config(&self) -> &SegmenterConfig {
        &self.config
    }

    /// Split a text into ordered chunks.
    pub fn split(&self, text: &str) -> Vec<Chunk> {
        let boundaries = self.dedup_boundaries(text, find_boundaries(text));

        let chunks = if boundaries.is_empty() {
            self.split_by_size(text)
        } else {
            self.split_by_boundaries(text, &boundaries)
        };

        info!(
            chunks = chunks.len(),
            boundaries = boundaries.len(),
            strategy = if boundaries.is_empty() { "fixed_size" } else { "boundaries" },
            "segmented text"
        );
        chunks
    }

    /// Drop hits that sit within `boundary_dedup_distance` characters of the
    /// previously kept hit. Input must be sorted by position.
    fn dedup_boundaries(&self, text: &str, matches: Vec<BoundaryMatch>) -> Vec<BoundaryMatch> {
        let mut kept: Vec<BoundaryMatch> = Vec::with_capacity(matches.len());

        for hit in matches {
            if let Some(last) = kept.last() {
                let distance = text[last.position..hit.position].chars().count();
                if distance <= self.config.boundary_dedup_distance {
                    debug!(position = hit.position, marker = %hit.marker, "skipping nearby boundary");
                    continue;
                }
            }
            kept.push(hit);
        }

        kept
    }

    fn split_by_boundaries(&self, text: &str, boundaries: &[BoundaryMatch]) -> Vec<Chunk> {
        if let Some(first) = boundaries.first() {
            if !text[..first.position].trim().is_empty() {
                debug!(bytes = first.position, "text before the first boundary is not chunked");
            }
        }

        boundaries
            .iter()
            .enumerate()
            .map(|(i, boundary)| {
                let start = boundary.position;
                let end = boundaries
                    .get(i + 1)
                    .map(|next| next.position)
                    .unwrap_or(text.len());

                let chapter_number = boundary
                    .ordinal
                    .as_deref()
                    .and_then(parse_ordinal)
                    .unwrap_or(i as u32 + 1);

                Chunk::new(chapter_number, text[start..end].trim(), start, end)
                    .with_optional_title(self.find_title(text, start))
            })
            .collect()
    }

    fn split_by_size(&self, text: &str) -> Vec<Chunk> {
        // Byte offset of every character, plus the end of the text.
        let offsets: Vec<usize> = text
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(text.len()))
            .collect();
        let total = offsets.len() - 1;
        let max = self.config.max_chunk_size.max(1);

        let mut chunks = Vec::new();
        let mut start = 0;

        while start < total {
            let mut end = (start + max).min(total);
            if end < total {
                if let Some(cut) = self.sentence_cut(&text[offsets[start]..offsets[end]]) {
                    end = start + cut;
                }
            }

            let (from, to) = (offsets[start], offsets[end]);
            let content = text[from..to].trim();
            // Blank windows are dropped; numbering stays contiguous.
            if !content.is_empty() {
                let number = chunks.len() as u32 + 1;
                chunks.push(Chunk::new(number, content, from, to).with_title(format!("Part {number}")));
            }

            if end >= total {
                break;
            }
            start = end.saturating_sub(self.config.overlap_size).max(start + 1);
        }

        chunks
    }

    /// Find the latest sentence break in a window that lies past the split
    /// threshold. Returns the window length in characters up to and including
    /// the break.
    fn sentence_cut(&self, window: &str) -> Option<usize> {
        let threshold = (self.config.max_chunk_size as f32 * self.config.min_split_ratio) as usize;

        SENTENCE_BREAKS
            .iter()
            .filter_map(|sep| window.rfind(sep).map(|at| (at, *sep)))
            .max_by_key(|(at, sep)| at + sep.len())
            .and_then(|(at, sep)| {
                let before = window[..at].chars().count();
                (before > threshold).then(|| before + sep.chars().count())
            })
    }

    /// Pick the first line after a marker that is not itself a marker and has
    /// between 3 and 99 characters.
    pub fn find_title(&self, text: &str, start: usize) -> Option<String> {
        let scan_end = text[start..]
            .char_indices()
            .nth(self.config.title_scan_chars)
            .map(|(i, _)| start + i)
            .unwrap_or(text.len());

        text[start..scan_end]
            .split('\n')
            .map(str::trim)
            .filter(|line| !line.is_empty() && !is_boundary_line(line))
            .find(|line| (3..100).contains(&line.chars().count()))
            .map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marker_text() -> String {
        // Markers at byte 0 and 500 in a 1000-byte text.
        let mut text = String::from("Chapter 1\n");
        text.push_str(&"a".repeat(490));
        text.push_str("Chapter 2\n");
        text.push_str(&"b".repeat(490));
        text
    }

    #[test]
    fn test_split_two_marked_chapters() {
        let text = marker_text();
        assert_eq!(text.len(), 1000);

        let chunks = Segmenter::with_defaults().split(&text);

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].start, 0);
        assert_eq!(chunks[0].end, 500);
        assert_eq!(chunks[1].start, 500);
        assert_eq!(chunks[1].end, 1000);
        assert_eq!(chunks[0].chapter_number, 1);
        assert_eq!(chunks[1].chapter_number, 2);
    }

    #[test]
    fn test_split_chinese_chapters() {
        let text = format!(
            "第一章：开始\n\n{}\n\n第二章：魔法学校\n\n{}\n\n第十章：结局\n\n{}",
            "哈利是一个年轻的巫师。".repeat(10),
            "哈利收到了录取通知书。".repeat(10),
            "故事结束了。".repeat(10),
        );

        let chunks = Segmenter::with_defaults().split(&text);

        let numbers: Vec<_> = chunks.iter().map(|c| c.chapter_number).collect();
        assert_eq!(numbers, vec![1, 2, 10]);
        assert!(chunks[0].content.starts_with("第一章"));
        assert!(chunks[1].content.contains("录取通知书"));
        for pair in chunks.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
        assert_eq!(chunks[2].end, text.len());
    }

    #[test]
    fn test_nearby_markers_collapse() {
        // "第一章" and "Chapter 1" on the same heading line.
        let text = format!("第一章 Chapter 1\n{}", "内容。".repeat(40));
        let chunks = Segmenter::with_defaults().split(&text);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].start, 0);
    }

    #[test]
    fn test_distinct_markers_beyond_distance_are_kept() {
        let config = SegmenterConfig {
            boundary_dedup_distance: 5,
            ..SegmenterConfig::default()
        };
        let text = "Chapter 1\nshort\nChapter 2\nshort";
        let chunks = Segmenter::new(config).unwrap().split(text);
        assert_eq!(chunks.len(), 2);
    }

    #[test]
    fn test_unparseable_ordinal_falls_back_to_sequence() {
        let text = format!(
            "Chapter 99999999999\n{}\nChapter 7\n{}",
            "x".repeat(80),
            "y".repeat(80)
        );
        let chunks = Segmenter::with_defaults().split(&text);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].chapter_number, 1);
        assert_eq!(chunks[1].chapter_number, 7);
    }

    #[test]
    fn test_zero_ordinal_is_raised_to_one() {
        let text = format!("卷〇\n{}", "x".repeat(80));
        let chunks = Segmenter::with_defaults().split(&text);
        assert_eq!(chunks[0].chapter_number, 1);
    }

    #[test]
    fn test_fixed_size_fallback() {
        let text = "这是第一段。".repeat(500) + &"这是第二段。".repeat(500);
        let config = SegmenterConfig {
            max_chunk_size: 1000,
            overlap_size: 100,
            ..SegmenterConfig::default()
        };

        let chunks = Segmenter::new(config).unwrap().split(&text);

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.length <= 1000);
        }
        assert_eq!(chunks.last().unwrap().end, text.len());
        assert_eq!(chunks[0].title.as_deref(), Some("Part 1"));
    }

    #[test]
    fn test_fixed_size_overlap() {
        let text = "abcdefghij".repeat(30);
        let config = SegmenterConfig {
            max_chunk_size: 100,
            overlap_size: 20,
            ..SegmenterConfig::default()
        };

        let chunks = Segmenter::new(config).unwrap().split(&text);

        assert_eq!(chunks[0].start, 0);
        assert_eq!(chunks[0].end, 100);
        assert_eq!(chunks[1].start, 80);
        assert_eq!(chunks.last().unwrap().end, 300);
    }

    #[test]
    fn test_fixed_size_prefers_sentence_break() {
        let text = format!("{}。\n{}", "甲".repeat(70), "乙".repeat(100));
        let config = SegmenterConfig {
            max_chunk_size: 100,
            overlap_size: 0,
            ..SegmenterConfig::default()
        };

        let chunks = Segmenter::new(config).unwrap().split(&text);

        // Cut lands right after "。\n" (72 characters), not at 100.
        assert_eq!(chunks[0].length, 71);
        assert_eq!(chunks[1].start, chunks[0].end);
        assert!(chunks[1].content.starts_with('乙'));
    }

    #[test]
    fn test_sentence_break_before_midpoint_is_ignored() {
        let text = format!("{}。\n{}", "甲".repeat(10), "乙".repeat(200));
        let config = SegmenterConfig {
            max_chunk_size: 100,
            overlap_size: 0,
            ..SegmenterConfig::default()
        };

        let chunks = Segmenter::new(config).unwrap().split(&text);
        assert_eq!(text[chunks[0].start..chunks[0].end].chars().count(), 100);
    }

    #[test]
    fn test_short_text_without_markers() {
        let chunks = Segmenter::with_defaults().split("Just one short paragraph.");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "Just one short paragraph.");
        assert_eq!(chunks[0].chapter_number, 1);
    }

    #[test]
    fn test_empty_text() {
        assert!(Segmenter::with_defaults().split("").is_empty());
    }

    #[test]
    fn test_blank_windows_are_skipped() {
        let text = format!("abcdefghij{}klmnopqrst", " ".repeat(10));
        let config = SegmenterConfig {
            max_chunk_size: 10,
            overlap_size: 0,
            ..SegmenterConfig::default()
        };
        let chunks = Segmenter::new(config).unwrap().split(&text);

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].content, "abcdefghij");
        assert_eq!(chunks[1].content, "klmnopqrst");
        assert_eq!(chunks[1].chapter_number, 2);
        assert_eq!(chunks[1].title.as_deref(), Some("Part 2"));
    }

    #[test]
    fn test_find_title_skips_marker_lines() {
        let text = "Chapter 1: The Beginning\n\nHarry is a young wizard.\n";
        let title = Segmenter::with_defaults().find_title(text, 0);
        assert_eq!(title.as_deref(), Some("Harry is a young wizard."));
    }

    #[test]
    fn test_find_title_length_bounds() {
        let text = format!("第一章\nab\n{}\n正确的标题\n", "长".repeat(120));
        let segmenter = Segmenter::new(SegmenterConfig {
            title_scan_chars: 400,
            ..SegmenterConfig::default()
        })
        .unwrap();
        assert_eq!(segmenter.find_title(&text, 0).as_deref(), Some("正确的标题"));
    }

    #[test]
    fn test_config_validation() {
        assert!(Segmenter::new(SegmenterConfig {
            max_chunk_size: 0,
            ..SegmenterConfig::default()
        })
        .is_err());
        assert!(Segmenter::new(SegmenterConfig {
            max_chunk_size: 100,
            overlap_size: 100,
            ..SegmenterConfig::default()
        })
        .is_err());
        assert!(Segmenter::new(SegmenterConfig {
            min_split_ratio: 1.5,
            ..SegmenterConfig::default()
        })
        .is_err());
    }
}
