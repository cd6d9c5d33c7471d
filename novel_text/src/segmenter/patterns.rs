//! Chapter boundary patterns.

use once_cell::sync::Lazy;
use regex::Regex;

/// Native ordinal numerals accepted inside a marker, plus ASCII digits.
const NUMERALS: &str = "零〇一二两三四五六七八九十百千万0-9";

/// Kinds of boundary marker recognised in a text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoundaryKind {
    /// `第N章` or `Chapter N`.
    Chapter,
    /// `第N回` or `Episode N`.
    Episode,
    /// `卷N` or `Book N`.
    Book,
}

impl BoundaryKind {
    pub const ALL: [BoundaryKind; 3] = [Self::Chapter, Self::Episode, Self::Book];

    fn pattern(self) -> String {
        match self {
            Self::Chapter => format!(r"第\s*([{NUMERALS}]+)\s*章|chapter\s+([0-9]+)"),
            Self::Episode => format!(r"第\s*([{NUMERALS}]+)\s*回|episode\s+([0-9]+)"),
            Self::Book => format!(r"卷\s*([{NUMERALS}]+)|book\s+([0-9]+)"),
        }
    }
}

struct CompiledPattern {
    kind: BoundaryKind,
    anywhere: Regex,
    line_start: Regex,
}

static PATTERNS: Lazy<Vec<CompiledPattern>> = Lazy::new(|| {
    BoundaryKind::ALL
        .iter()
        .map(|&kind| {
            let pattern = kind.pattern();
            CompiledPattern {
                kind,
                anywhere: Regex::new(&format!("(?i){pattern}"))
                    .expect("boundary pattern is a valid regex"),
                line_start: Regex::new(&format!("(?i)^(?:{pattern})"))
                    .expect("boundary pattern is a valid regex"),
            }
        })
        .collect()
});

/// A single marker hit in the text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundaryMatch {
    /// Byte offset of the marker.
    pub position: usize,
    pub kind: BoundaryKind,
    /// Captured ordinal, e.g. `"十二"` or `"12"`.
    pub ordinal: Option<String>,
    /// Full marker text as it appears in the source.
    pub marker: String,
}

/// Collect every marker hit from every pattern, sorted by position.
///
/// Hits at the same position keep pattern order (chapter, episode, book).
pub fn find_boundaries(text: &str) -> Vec<BoundaryMatch> {
    let mut matches = Vec::new();

    for compiled in PATTERNS.iter() {
        for captures in compiled.anywhere.captures_iter(text) {
            let Some(whole) = captures.get(0) else {
                continue;
            };
            let ordinal = captures
                .iter()
                .skip(1)
                .flatten()
                .map(|m| m.as_str())
                .find(|s| !s.is_empty())
                .map(str::to_string);

            matches.push(BoundaryMatch {
                position: whole.start(),
                kind: compiled.kind,
                ordinal,
                marker: whole.as_str().to_string(),
            });
        }
    }

    matches.sort_by_key(|m| m.position);
    matches
}

/// Check whether a line starts with a boundary marker.
pub fn is_boundary_line(line: &str) -> bool {
    PATTERNS.iter().any(|p| p.line_start.is_match(line))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_chinese_chapter() {
        let hits = find_boundaries("序\n第十二章 风起\n正文");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].kind, BoundaryKind::Chapter);
        assert_eq!(hits[0].ordinal.as_deref(), Some("十二"));
        assert_eq!(hits[0].position, "序\n".len());
    }

    #[test]
    fn test_find_english_markers_case_insensitive() {
        let hits = find_boundaries("CHAPTER 3\ntext\nchapter 4\nEpisode 9\nBook 2");
        let kinds: Vec<_> = hits.iter().map(|h| h.kind).collect();
        assert_eq!(
            kinds,
            vec![
                BoundaryKind::Chapter,
                BoundaryKind::Chapter,
                BoundaryKind::Episode,
                BoundaryKind::Book
            ]
        );
        assert_eq!(hits[0].ordinal.as_deref(), Some("3"));
        assert_eq!(hits[3].ordinal.as_deref(), Some("2"));
    }

    #[test]
    fn test_spaced_chinese_marker() {
        let hits = find_boundaries("第 1 章：开始");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].ordinal.as_deref(), Some("1"));
    }

    #[test]
    fn test_episode_marker() {
        let hits = find_boundaries("第三回 宝玉");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].kind, BoundaryKind::Episode);
    }

    #[test]
    fn test_is_boundary_line() {
        assert!(is_boundary_line("Chapter 1: The Beginning"));
        assert!(is_boundary_line("第一章：开始"));
        assert!(!is_boundary_line("The chapter 1 story"));
        assert!(!is_boundary_line("哈利是一个年轻的巫师。"));
    }

    #[test]
    fn test_no_markers() {
        assert!(find_boundaries("Just a plain paragraph of prose.").is_empty());
    }
}
