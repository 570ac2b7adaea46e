//! Size-bounded recursive chunk splitting with overlap.
//!
//! Highlights:
//!
//! - Separator hierarchy: text is split on the coarsest separator present (paragraph break,
//!   line feed, period, space) and only pieces that are still too long descend to the next,
//!   finer separator. The empty separator is a hard per-character split.
//! - Separators stay attached to the end of the piece they terminate, so sentences keep their
//!   period and concatenating pieces reproduces the input exactly.
//! - Merging: consecutive pieces shorter than `chunk_size` are packed into chunks of at most
//!   `chunk_size` characters; each new chunk starts with whole trailing pieces of the previous
//!   one totalling at most `chunk_overlap` characters.
//! - Lengths are counted in characters. Chunks are trimmed and empty chunks are dropped.
//! - Best effort: when the separator list has no empty separator, a piece without any usable
//!   boundary is emitted even if it exceeds `chunk_size`.

use std::collections::VecDeque;

use super::types::{Chunk, CleanedUnit, PipelineError};

/// Separators tried in order: paragraphs, lines, sentences, words, characters.
pub const DEFAULT_SEPARATORS: [&str; 5] = ["\n\n", "\n", ".", " ", ""];

/// Splits [`CleanedUnit`]s into overlapping [`Chunk`]s of bounded size.
#[derive(Debug, Clone)]
pub struct ChunkSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl ChunkSplitter {
    /// Build a splitter with the default separator hierarchy.
    ///
    /// Fails when `chunk_size` is zero or `chunk_overlap >= chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self, PipelineError> {
        if chunk_size == 0 {
            return Err(PipelineError::InvalidChunkSize);
        }
        if chunk_overlap >= chunk_size {
            return Err(PipelineError::OverlapTooLarge {
                overlap: chunk_overlap,
                chunk_size,
            });
        }

        Ok(Self {
            chunk_size,
            chunk_overlap,
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        })
    }

    /// Replace the separator hierarchy. An empty list falls back to per-character splitting.
    pub fn with_separators<I, S>(mut self, separators: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let separators: Vec<String> = separators.into_iter().map(Into::into).collect();
        self.separators = if separators.is_empty() {
            vec![String::new()]
        } else {
            separators
        };
        self
    }

    /// Maximum characters per chunk.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Maximum characters shared by consecutive chunks.
    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Split every unit, preserving unit order and document order within each unit.
    pub fn split_units(&self, units: &[CleanedUnit]) -> Vec<Chunk> {
        units
            .iter()
            .flat_map(|unit| {
                self.split_text(&unit.content)
                    .into_iter()
                    .map(move |content| Chunk {
                        content,
                        source: unit.source.clone(),
                        page_start: unit.page_start,
                        page_end: unit.page_end,
                    })
            })
            .collect()
    }

    /// Split raw text into chunk strings.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        if char_len(text) <= self.chunk_size {
            let trimmed = text.trim();
            return if trimmed.is_empty() {
                Vec::new()
            } else {
                vec![trimmed.to_string()]
            };
        }
        self.split_recursive(text, &self.separators)
    }

    fn split_recursive(&self, text: &str, separators: &[String]) -> Vec<String> {
        let (separator, finer) = select_separator(text, separators);
        let mut chunks = Vec::new();
        let mut good: Vec<(&str, usize)> = Vec::new();

        for piece in split_keeping_separator(text, separator) {
            let len = char_len(piece);
            if len < self.chunk_size {
                good.push((piece, len));
                continue;
            }

            if !good.is_empty() {
                chunks.extend(self.merge_pieces(&good));
                good.clear();
            }

            if finer.is_empty() {
                tracing::debug!(
                    length = len,
                    chunk_size = self.chunk_size,
                    "No separator left to split oversized piece"
                );
                if let Some(chunk) = trimmed_non_empty(piece) {
                    chunks.push(chunk);
                }
            } else {
                chunks.extend(self.split_recursive(piece, finer));
            }
        }

        if !good.is_empty() {
            chunks.extend(self.merge_pieces(&good));
        }

        chunks
    }

    /// Pack pieces (each shorter than `chunk_size`) into overlapping chunks.
    fn merge_pieces(&self, pieces: &[(&str, usize)]) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut window: VecDeque<(&str, usize)> = VecDeque::new();
        let mut total = 0;

        for &(piece, len) in pieces {
            if total + len > self.chunk_size && !window.is_empty() {
                if let Some(chunk) = join_window(&window) {
                    chunks.push(chunk);
                }
                // Keep at most `chunk_overlap` characters, and enough room for the next piece.
                while total > self.chunk_overlap || (total > 0 && total + len > self.chunk_size) {
                    match window.pop_front() {
                        Some((_, dropped)) => total -= dropped,
                        None => break,
                    }
                }
            }
            window.push_back((piece, len));
            total += len;
        }

        if let Some(chunk) = join_window(&window) {
            chunks.push(chunk);
        }

        chunks
    }
}

/// Pick the first separator present in `text`, returning it with the finer separators after it.
fn select_separator<'s>(text: &str, separators: &'s [String]) -> (&'s str, &'s [String]) {
    for (index, separator) in separators.iter().enumerate() {
        if separator.is_empty() {
            return (separator, &[]);
        }
        if text.contains(separator.as_str()) {
            return (separator, &separators[index + 1..]);
        }
    }
    (separators.last().map(String::as_str).unwrap_or(""), &[])
}

fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    if separator.is_empty() {
        return text
            .char_indices()
            .map(|(index, ch)| &text[index..index + ch.len_utf8()])
            .collect();
    }

    let mut pieces = Vec::new();
    let mut start = 0;
    for (index, matched) in text.match_indices(separator) {
        let end = index + matched.len();
        pieces.push(&text[start..end]);
        start = end;
    }
    if start < text.len() {
        pieces.push(&text[start..]);
    }
    pieces
}

fn join_window(window: &VecDeque<(&str, usize)>) -> Option<String> {
    let joined: String = window.iter().map(|(piece, _)| *piece).collect();
    trimmed_non_empty(&joined)
}

fn trimmed_non_empty(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}
