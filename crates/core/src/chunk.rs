use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::normalization::clean_text;

static HEADING_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z][A-Z0-9 .\-:]{4,}$").unwrap());

const SECTION_HINT_CHARS: usize = 120;

/// Position of a chunk in the corpus snapshot.
pub type ChunkId = usize;

/// One retrievable span of a source document. Immutable once ingested; the
/// chunk id is its position in the corpus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub source: String,
    pub page_start: u32,
    pub page_end: u32,
    #[serde(default)]
    pub section_hint: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkConfig {
    pub chunk_size: usize,
    pub overlap: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1200,
            overlap: 200,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Chunker {
    config: ChunkConfig,
}

impl Chunker {
    pub fn new(config: ChunkConfig) -> Result<Self> {
        if config.chunk_size == 0 {
            return Err(CoreError::InvalidConfig("chunk_size must be positive"));
        }
        if config.overlap >= config.chunk_size {
            return Err(CoreError::InvalidConfig(
                "overlap must be smaller than chunk_size",
            ));
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> ChunkConfig {
        self.config
    }

    /// Splits one page on heading lines, then windows every section by
    /// characters. Page numbers are 1-based.
    pub fn chunk_page(&self, source: &str, page_number: u32, raw: &str) -> Vec<Chunk> {
        let text = clean_text(raw);
        if text.is_empty() {
            return Vec::new();
        }
        let mut chunks = Vec::new();
        for piece in split_on_headings(&text) {
            let piece = piece.trim();
            if piece.is_empty() {
                continue;
            }
            let section_hint = piece
                .chars()
                .take(SECTION_HINT_CHARS)
                .collect::<String>()
                .replace('\n', " ");
            for window in self.windows(piece) {
                chunks.push(Chunk {
                    text: window.to_string(),
                    source: source.to_string(),
                    page_start: page_number,
                    page_end: page_number,
                    section_hint: section_hint.clone(),
                });
            }
        }
        chunks
    }

    fn windows<'a>(&self, piece: &'a str) -> Vec<&'a str> {
        let bounds: Vec<usize> = piece
            .char_indices()
            .map(|(idx, _)| idx)
            .chain(std::iter::once(piece.len()))
            .collect();
        let total = bounds.len() - 1;
        let mut out = Vec::new();
        let mut start = 0usize;
        while start < total {
            let end = (start + self.config.chunk_size).min(total);
            out.push(&piece[bounds[start]..bounds[end]]);
            if end == total {
                break;
            }
            start = end - self.config.overlap;
        }
        out
    }
}

/// Breaks text before every all-caps heading line that is itself followed by
/// a newline. The separating newline is dropped.
fn split_on_headings(text: &str) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut piece_start = 0usize;
    let mut cursor = 0usize;
    while let Some(rel) = text[cursor..].find('\n') {
        let newline = cursor + rel;
        let line_start = newline + 1;
        if let Some(line_len) = text[line_start..].find('\n') {
            let line = &text[line_start..line_start + line_len];
            if HEADING_LINE.is_match(line) {
                pieces.push(&text[piece_start..newline]);
                piece_start = line_start;
            }
        }
        cursor = line_start;
    }
    pieces.push(&text[piece_start..]);
    pieces
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunker(size: usize, overlap: usize) -> Chunker {
        Chunker::new(ChunkConfig {
            chunk_size: size,
            overlap,
        })
        .unwrap()
    }

    #[test]
    fn rejects_overlap_not_smaller_than_window() {
        assert!(Chunker::new(ChunkConfig {
            chunk_size: 10,
            overlap: 10
        })
        .is_err());
        assert!(Chunker::new(ChunkConfig {
            chunk_size: 0,
            overlap: 0
        })
        .is_err());
    }

    #[test]
    fn accepted_config_is_kept() {
        let config = ChunkConfig {
            chunk_size: 64,
            overlap: 8,
        };
        assert_eq!(Chunker::new(config).unwrap().config(), config);
    }

    #[test]
    fn splits_on_heading_lines() {
        let text = "Intro paragraph\nBID SECURITY\nThe bid security is $50,000.\nPAYMENT TERMS\nNet 30.";
        let pieces = split_on_headings(text);
        assert_eq!(
            pieces,
            vec![
                "Intro paragraph",
                "BID SECURITY\nThe bid security is $50,000.",
                "PAYMENT TERMS\nNet 30."
            ]
        );
    }

    #[test]
    fn trailing_heading_without_newline_does_not_split() {
        let pieces = split_on_headings("body text\nAPPENDIX A");
        assert_eq!(pieces, vec!["body text\nAPPENDIX A"]);
    }

    #[test]
    fn windows_overlap_by_configured_chars() {
        let chunks = chunker(10, 4).chunk_page("a.pdf", 2, "abcdefghijklmnopqrstuvwxyz");
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["abcdefghij", "ghijklmnop", "mnopqrstuv", "stuvwxyz"]);
        assert!(chunks.iter().all(|c| c.page_start == 2 && c.page_end == 2));
        assert!(chunks.iter().all(|c| c.source == "a.pdf"));
    }

    #[test]
    fn windows_count_characters_not_bytes() {
        let chunks = chunker(3, 1).chunk_page("a.pdf", 1, "ééééé");
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["ééé", "ééé"]);
    }

    #[test]
    fn section_hint_is_piece_prefix_without_newlines() {
        let text = format!("SCOPE OF WORK\n{}", "x".repeat(200));
        let chunks = chunker(1200, 200).chunk_page("rfp.pdf", 1, &text);
        assert_eq!(chunks.len(), 1);
        let hint = &chunks[0].section_hint;
        assert!(hint.starts_with("SCOPE OF WORK x"));
        assert_eq!(hint.chars().count(), SECTION_HINT_CHARS);
        assert!(!hint.contains('\n'));
    }

    #[test]
    fn blank_page_yields_nothing() {
        assert!(chunker(100, 10).chunk_page("a.pdf", 1, " \n\t ").is_empty());
    }
}
