//! Recursive, overlap-aware text chunker.
//!
//! Splits extracted document text into [`TextChunk`]s of at most
//! `chunk_size` characters, with consecutive chunks sharing up to
//! `chunk_overlap` characters of context.
//!
//! # Algorithm
//!
//! 1. Pick the coarsest separator present in the text, in the order
//!    paragraph break (`\n\n`), line break (`\n`), sentence end (`. `),
//!    space, then single characters.
//! 2. Split on it, keeping each separator attached to the start of the
//!    piece that follows it.
//! 3. Greedily merge pieces shorter than `chunk_size` into a window. When
//!    the next piece would overflow, emit the window (trimmed) and drop
//!    pieces from its front until at most `chunk_overlap` characters
//!    remain; those seed the next chunk.
//! 4. Pieces that are themselves too long recurse with the next-finer
//!    separators.
//! 5. Keep the first `max_chunks` chunks and report whether any were cut.
//!
//! Lengths are counted in `char`s, so multi-byte text never splits inside
//! a code point.
//!
//! # Example
//!
//! ```rust
//! use docqa_core::chunk::chunk_text;
//!
//! let out = chunk_text("Hello world.\n\nSecond paragraph.", 900, 150, 10);
//! assert_eq!(out.chunks.len(), 1);
//! assert_eq!(out.chunks[0].chunk_id, 0);
//! assert!(!out.truncated);
//! ```

use std::collections::VecDeque;

use crate::models::TextChunk;

/// Separator preference, coarsest first. `""` means "split into chars".
const SEPARATORS: [&str; 5] = ["\n\n", "\n", ". ", " ", ""];

/// Output of [`chunk_text`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Chunked {
    /// Retained chunks, `chunk_id` = position.
    pub chunks: Vec<TextChunk>,
    /// Number of chunks produced before the `max_chunks` cap.
    pub produced: usize,
    /// `true` iff `produced > max_chunks`.
    pub truncated: bool,
}

impl Chunked {
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

/// Split `text` into overlapping chunks.
///
/// Empty or whitespace-only text yields an empty [`Chunked`]; callers treat
/// that as "nothing to process". `chunk_size` of zero is clamped to one.
pub fn chunk_text(
    text: &str,
    chunk_size: usize,
    chunk_overlap: usize,
    max_chunks: usize,
) -> Chunked {
    if text.trim().is_empty() {
        return Chunked::default();
    }

    let splitter = Splitter {
        chunk_size: chunk_size.max(1),
        chunk_overlap,
    };
    let pieces = splitter.split(text, &SEPARATORS);
    let produced = pieces.len();

    let chunks = pieces
        .into_iter()
        .take(max_chunks)
        .enumerate()
        .map(|(i, content)| TextChunk::new(i, content))
        .collect();

    Chunked {
        chunks,
        produced,
        truncated: produced > max_chunks,
    }
}

struct Splitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Splitter {
    fn split(&self, text: &str, separators: &[&str]) -> Vec<String> {
        let mut separator = "";
        let mut finer: &[&str] = &[];
        for (i, sep) in separators.iter().enumerate() {
            if sep.is_empty() {
                break;
            }
            if text.contains(sep) {
                separator = sep;
                finer = &separators[i + 1..];
                break;
            }
        }

        let mut out = Vec::new();
        let mut fitting: Vec<(&str, usize)> = Vec::new();

        for piece in split_keep_separator(text, separator) {
            let len = char_len(piece);
            if len < self.chunk_size {
                fitting.push((piece, len));
                continue;
            }

            if !fitting.is_empty() {
                out.extend(self.merge(&fitting));
                fitting.clear();
            }
            if finer.is_empty() {
                let trimmed = piece.trim();
                if !trimmed.is_empty() {
                    out.push(trimmed.to_string());
                }
            } else {
                out.extend(self.split(piece, finer));
            }
        }

        if !fitting.is_empty() {
            out.extend(self.merge(&fitting));
        }
        out
    }

    /// Merge small pieces into windows of at most `chunk_size` chars.
    fn merge(&self, pieces: &[(&str, usize)]) -> Vec<String> {
        let mut docs = Vec::new();
        let mut window: VecDeque<(&str, usize)> = VecDeque::new();
        let mut total = 0usize;

        for &(piece, len) in pieces {
            if total + len > self.chunk_size && !window.is_empty() {
                if let Some(doc) = join_window(&window) {
                    docs.push(doc);
                }
                while total > self.chunk_overlap
                    || (total + len > self.chunk_size && total > 0)
                {
                    match window.pop_front() {
                        Some((_, dropped)) => total -= dropped,
                        None => break,
                    }
                }
            }
            window.push_back((piece, len));
            total += len;
        }

        if let Some(doc) = join_window(&window) {
            docs.push(doc);
        }
        docs
    }
}

/// Split on `separator`, attaching each separator to the following piece.
/// Empty pieces are dropped. An empty separator splits into chars.
fn split_keep_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    if separator.is_empty() {
        return text
            .char_indices()
            .map(|(i, c)| &text[i..i + c.len_utf8()])
            .collect();
    }

    let mut pieces = Vec::new();
    let mut start = 0;
    for (idx, _) in text.match_indices(separator) {
        if idx > start {
            pieces.push(&text[start..idx]);
        }
        start = idx;
    }
    if start < text.len() {
        pieces.push(&text[start..]);
    }
    pieces
}

fn join_window(window: &VecDeque<(&str, usize)>) -> Option<String> {
    let joined: String = window.iter().map(|(p, _)| *p).collect();
    let trimmed = joined.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_text_yields_nothing() {
        let out = chunk_text("", 900, 150, 10);
        assert!(out.is_empty());
        assert_eq!(out.produced, 0);
        assert!(!out.truncated);

        let out = chunk_text("   \n\n  ", 900, 150, 10);
        assert!(out.is_empty());
    }

    #[test]
    fn test_small_text_single_chunk() {
        let out = chunk_text("  Hello, world!  ", 900, 150, 10);
        assert_eq!(out.chunks.len(), 1);
        assert_eq!(out.chunks[0].chunk_id, 0);
        assert_eq!(out.chunks[0].content, "Hello, world!");
    }

    #[test]
    fn test_prefers_paragraph_breaks() {
        let out = chunk_text("para one.\n\npara two.", 12, 0, 10);
        let texts: Vec<&str> = out.chunks.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(texts, vec!["para one.", "para two."]);
    }

    #[test]
    fn test_character_split_overlap_is_exact() {
        let text = "abcdefghijklmnopqrstuvwxyz";
        let out = chunk_text(text, 10, 3, 100);
        let texts: Vec<&str> = out.chunks.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(texts, vec!["abcdefghij", "hijklmnopq", "opqrstuvwx", "vwxyz"]);

        for pair in texts.windows(2) {
            let prev: Vec<char> = pair[0].chars().collect();
            let tail: String = prev[prev.len() - 3..].iter().collect();
            assert!(pair[1].starts_with(&tail));
        }

        let mut rebuilt = texts[0].to_string();
        for t in &texts[1..] {
            rebuilt.push_str(&t[3..]);
        }
        assert_eq!(rebuilt, text);
    }

    #[test]
    fn test_thirty_thousand_chars_make_six_chunks() {
        let text: String = (0..300).map(|_| format!("{}. ", "a".repeat(98))).collect();
        assert_eq!(text.chars().count(), 30_000);

        let out = chunk_text(&text, 6000, 400, 12);
        assert_eq!(out.chunks.len(), 6);
        assert_eq!(out.produced, 6);
        assert!(!out.truncated);
    }

    #[test]
    fn test_truncation_is_reported() {
        let text: String = (0..50).map(|i| format!("Sentence number {}. ", i)).collect();
        let full = chunk_text(&text, 40, 0, 10_000);
        assert!(full.produced > 3);

        let out = chunk_text(&text, 40, 0, 3);
        assert_eq!(out.chunks.len(), 3);
        assert_eq!(out.produced, full.produced);
        assert!(out.truncated);
        for (i, c) in out.chunks.iter().enumerate() {
            assert_eq!(c.chunk_id, i);
            assert_eq!(c.content, full.chunks[i].content);
        }

        let exact = chunk_text(&text, 40, 0, full.produced);
        assert!(!exact.truncated);
    }

    #[test]
    fn test_chunks_respect_size_and_come_from_text() {
        let text = "Introduction\n\nThe quarterly report covers revenue. It also covers costs. \
                    Hiring slowed in March.\nA new office opened in Lisbon.\n\n\
                    Appendix: tables and figures follow here with a very long trailing line of words";
        let out = chunk_text(text, 50, 10, 100);
        assert!(out.chunks.len() > 1);
        for (i, c) in out.chunks.iter().enumerate() {
            assert_eq!(c.chunk_id, i);
            assert!(c.content.chars().count() <= 50, "chunk {} too long", i);
            assert!(text.contains(&c.content), "chunk {} not a substring", i);
            assert_eq!(c.content, c.content.trim());
        }
    }

    #[test]
    fn test_mixed_separators_cover_whole_text_in_order() {
        let text = "Quarterly Report\n\n\
                    Revenue rose to 4.2 million. Costs fell by nine percent. \
                    Margins improved in every region.\n\
                    Hiring paused in March; two offices merged.\n\n\
                    Outlook: management expects steady demand through autumn, \
                    with supplier contracts renewed before December and a new \
                    warehouse opening near Porto.\n\
                    Appendix\nTable one lists regional totals.";
        for (size, overlap) in [(40, 10), (64, 0), (25, 5)] {
            let out = chunk_text(text, size, overlap, 1000);
            assert!(!out.truncated);

            let mut covered = vec![false; text.len()];
            let mut from = 0;
            for chunk in &out.chunks {
                let start = from
                    + text[from..]
                        .find(&chunk.content)
                        .unwrap_or_else(|| panic!("chunk {} out of order", chunk.chunk_id));
                covered[start..start + chunk.content.len()]
                    .iter_mut()
                    .for_each(|c| *c = true);
                from = start;
            }

            for (i, ch) in text.char_indices() {
                if !ch.is_whitespace() {
                    assert!(covered[i], "char {:?} at {} lost (size {})", ch, i, size);
                }
            }
        }
    }

    #[test]
    fn test_overlap_never_exceeds_limit() {
        let text: String = (0..40).map(|i| format!("word{} ", i)).collect();
        let out = chunk_text(&text, 30, 8, 100);
        for pair in out.chunks.windows(2) {
            let prev = &pair[0].content;
            let next = &pair[1].content;
            let shared = (1..=prev.len().min(next.len()))
                .rev()
                .find(|&n| prev.is_char_boundary(prev.len() - n) && next.starts_with(&prev[prev.len() - n..]))
                .unwrap_or(0);
            assert!(shared <= 8, "overlap {} exceeds 8", shared);
        }
    }

    #[test]
    fn test_multibyte_utf8_chars() {
        let text = "┌──────────────────┐\n│ Hello world      │\n└──────────────────┘";
        let out = chunk_text(text, 7, 2, 100);
        assert!(!out.is_empty());
        for c in &out.chunks {
            assert!(c.content.chars().count() <= 7);
            assert!(!c.content.is_empty());
        }
    }

    #[test]
    fn test_deterministic() {
        let text = "Alpha\n\nBeta\n\nGamma\n\nDelta";
        assert_eq!(chunk_text(text, 8, 2, 10), chunk_text(text, 8, 2, 10));
    }
}
