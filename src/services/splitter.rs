//! Recursive text splitting with overlap.
//!
//! Providers hand their extracted text through this splitter to produce the
//! final chunk boundaries. Separators are tried in priority order; pieces are
//! merged up to the chunk size with a configurable overlap carried between
//! adjacent chunks.

use std::collections::VecDeque;

use crate::models::Chunk;

/// Default separator ladder: paragraph, line, word, character.
const DEFAULT_SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

#[derive(Debug, Clone)]
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl TextSplitter {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self::with_separators(chunk_size, chunk_overlap, &DEFAULT_SEPARATORS)
    }

    pub fn with_separators(chunk_size: usize, chunk_overlap: usize, separators: &[&str]) -> Self {
        Self {
            chunk_size,
            chunk_overlap,
            separators: separators.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Split raw text into size-bounded pieces.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, &self.separators)
            .into_iter()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect()
    }

    /// Split each chunk's content, carrying its metadata onto every derived
    /// chunk.
    pub fn split_chunks(&self, chunks: &[Chunk]) -> Vec<Chunk> {
        chunks
            .iter()
            .flat_map(|chunk| {
                self.split_text(&chunk.content)
                    .into_iter()
                    .map(|content| Chunk::with_metadata(content, chunk.metadata.clone()))
            })
            .collect()
    }

    /// Split raw texts into chunks with empty metadata.
    pub fn create_chunks(&self, texts: &[&str]) -> Vec<Chunk> {
        texts
            .iter()
            .flat_map(|text| self.split_text(text).into_iter().map(Chunk::new))
            .collect()
    }

    fn split_recursive(&self, text: &str, separators: &[String]) -> Vec<String> {
        if text.is_empty() {
            return Vec::new();
        }
        if text.chars().count() <= self.chunk_size {
            return vec![text.to_string()];
        }

        // First separator actually present in the text wins; the empty
        // separator always matches and falls back to character windows.
        let mut separator = "";
        let mut remaining: &[String] = &[];
        for (i, sep) in separators.iter().enumerate() {
            if sep.is_empty() || text.contains(sep.as_str()) {
                separator = sep.as_str();
                remaining = &separators[i + 1..];
                break;
            }
        }

        if separator.is_empty() {
            return self.split_by_chars(text);
        }

        let mut finals = Vec::new();
        let mut good = Vec::new();
        for piece in split_keep_separator(text, separator) {
            if piece.chars().count() <= self.chunk_size {
                good.push(piece);
            } else {
                if !good.is_empty() {
                    finals.extend(self.merge_splits(std::mem::take(&mut good)));
                }
                if remaining.is_empty() {
                    finals.extend(self.split_by_chars(&piece));
                } else {
                    finals.extend(self.split_recursive(&piece, remaining));
                }
            }
        }
        if !good.is_empty() {
            finals.extend(self.merge_splits(good));
        }
        finals
    }

    /// Greedily combine pieces into chunks of at most `chunk_size`,
    /// seeding each new chunk with up to `chunk_overlap` trailing characters
    /// worth of pieces from the previous one.
    fn merge_splits(&self, splits: Vec<String>) -> Vec<String> {
        let mut docs = Vec::new();
        let mut current: VecDeque<(String, usize)> = VecDeque::new();
        let mut total = 0usize;

        for piece in splits {
            let len = piece.chars().count();
            if total + len > self.chunk_size && !current.is_empty() {
                docs.push(join_pieces(&current));
                while total > self.chunk_overlap
                    || (total + len > self.chunk_size && total > 0)
                {
                    match current.pop_front() {
                        Some((_, dropped)) => total -= dropped,
                        None => break,
                    }
                }
            }
            total += len;
            current.push_back((piece, len));
        }

        if !current.is_empty() {
            docs.push(join_pieces(&current));
        }
        docs
    }

    /// Fixed character windows, stepping by `chunk_size - chunk_overlap`.
    fn split_by_chars(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        let total = chars.len();
        if total == 0 {
            return Vec::new();
        }

        let step = if self.chunk_size > self.chunk_overlap {
            self.chunk_size - self.chunk_overlap
        } else {
            self.chunk_size
        };

        let mut out = Vec::new();
        let mut start = 0;
        while start < total {
            let end = (start + self.chunk_size).min(total);
            out.push(chars[start..end].iter().collect());
            if end >= total {
                break;
            }
            start += step;
        }
        out
    }
}

fn join_pieces(pieces: &VecDeque<(String, usize)>) -> String {
    pieces.iter().map(|(s, _)| s.as_str()).collect()
}

/// Split on a separator, attaching each separator occurrence to the start of
/// the piece that follows it, so joining pieces reproduces the input.
fn split_keep_separator(text: &str, separator: &str) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut start = 0usize;
    for (idx, _) in text.match_indices(separator) {
        if idx > start {
            pieces.push(text[start..idx].to_string());
            start = idx;
        }
    }
    pieces.push(text[start..].to_string());
    pieces
}
