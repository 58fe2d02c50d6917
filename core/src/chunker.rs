use std::collections::VecDeque;

use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::document::{Document, Passage};

/// Passage length in characters, sized for a legal paragraph.
pub const DEFAULT_CHUNK_SIZE: usize = 800;
pub const DEFAULT_CHUNK_OVERLAP: usize = 100;
pub const DEFAULT_SOURCE_TAG: &str = "persian_law";

/// Paragraph, line, sentence (Latin and Persian punctuation), word, character.
pub const DEFAULT_SEPARATORS: &[&str] = &[
    "\n\n", "\n", ". ", "? ", "! ", "۔ ", "؟ ", " ", "",
];

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChunkError {
    #[error("Input text is empty")]
    EmptyInput,
    #[error("Invalid chunking parameters: chunk_size={chunk_size}, overlap={overlap}")]
    InvalidConfig { chunk_size: usize, overlap: usize },
}

/// Splits raw corpus text into overlapping passages.
///
/// Text is cut at the first separator (in priority order) that occurs in it.
/// Pieces that are still too long are cut again with the remaining separators,
/// down to single characters. Short pieces are then merged back together up to
/// `chunk_size` characters, carrying at most `overlap` characters of the
/// previous passage into the next one.
#[derive(Debug, Clone)]
pub struct Chunker {
    chunk_size: usize,
    overlap: usize,
    separators: Vec<String>,
}

impl Default for Chunker {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_CHUNK_OVERLAP,
            separators: DEFAULT_SEPARATORS.iter().map(ToString::to_string).collect(),
        }
    }
}

impl Chunker {
    /// # Errors
    /// `InvalidConfig` when `chunk_size` is zero or `overlap` is not smaller than it.
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self, ChunkError> {
        if chunk_size == 0 || overlap >= chunk_size {
            return Err(ChunkError::InvalidConfig {
                chunk_size,
                overlap,
            });
        }
        Ok(Self {
            chunk_size,
            overlap,
            ..Self::default()
        })
    }

    /// Replaces the separator priority list. The character-level fallback is
    /// always kept last so no passage can outgrow `chunk_size`.
    #[must_use]
    pub fn with_separators(mut self, separators: Vec<String>) -> Self {
        let mut separators: Vec<String> =
            separators.into_iter().filter(|s| !s.is_empty()).collect();
        separators.push(String::new());
        self.separators = separators;
        self
    }

    #[must_use]
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    #[must_use]
    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Cuts `raw_text` into passages numbered from zero.
    ///
    /// # Errors
    /// `EmptyInput` when the text is empty or whitespace only.
    pub fn chunk(&self, raw_text: &str, source_tag: &str) -> Result<Vec<Passage>, ChunkError> {
        let mut passages = Vec::new();
        self.chunk_into(raw_text, source_tag, &mut passages)?;
        Ok(passages)
    }

    /// Cuts several documents, numbering passages continuously across them.
    /// Blank documents are skipped.
    ///
    /// # Errors
    /// `EmptyInput` when no document has any text.
    #[instrument(skip_all, fields(documents = documents.len()))]
    pub fn chunk_documents(&self, documents: &[Document]) -> Result<Vec<Passage>, ChunkError> {
        let mut passages = Vec::new();
        for document in documents {
            if document.is_blank() {
                warn!(source = %document.id, "Skipping blank document");
                continue;
            }
            self.chunk_into(&document.data, &document.id, &mut passages)?;
        }
        if passages.is_empty() {
            return Err(ChunkError::EmptyInput);
        }
        debug!(passages = passages.len(), "Chunked documents");
        Ok(passages)
    }

    fn chunk_into(
        &self,
        raw_text: &str,
        source_tag: &str,
        passages: &mut Vec<Passage>,
    ) -> Result<(), ChunkError> {
        if raw_text.trim().is_empty() {
            return Err(ChunkError::EmptyInput);
        }
        for text in self.split_text(raw_text) {
            passages.push(Passage {
                id: passages.len(),
                text,
                source_tag: source_tag.to_string(),
            });
        }
        Ok(())
    }

    /// Returns the trimmed, non-empty passage texts for `text` in order.
    #[must_use]
    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, &self.separators)
    }

    fn split_recursive(&self, text: &str, separators: &[String]) -> Vec<String> {
        let mut chunks = Vec::new();
        let (separator, remaining) = pick_separator(text, separators);

        let mut fitting: Vec<String> = Vec::new();
        for piece in split_keeping_separator(text, separator) {
            if char_len(&piece) < self.chunk_size {
                fitting.push(piece);
                continue;
            }
            if !fitting.is_empty() {
                chunks.extend(self.merge(&fitting));
                fitting.clear();
            }
            if remaining.is_empty() {
                let piece = piece.trim();
                if !piece.is_empty() {
                    chunks.push(piece.to_string());
                }
            } else {
                chunks.extend(self.split_recursive(&piece, remaining));
            }
        }
        if !fitting.is_empty() {
            chunks.extend(self.merge(&fitting));
        }
        chunks
    }

    /// Greedily packs pieces into passages of at most `chunk_size` characters.
    /// After each passage the window drops pieces from the front until at most
    /// `overlap` characters (and room for the next piece) remain.
    fn merge(&self, pieces: &[String]) -> Vec<String> {
        let mut merged = Vec::new();
        let mut window: VecDeque<(usize, &str)> = VecDeque::new();
        let mut total = 0;

        for piece in pieces {
            let len = char_len(piece);
            if total + len > self.chunk_size && !window.is_empty() {
                push_joined(&mut merged, &window);
                while total > self.overlap || (total + len > self.chunk_size && total > 0) {
                    match window.pop_front() {
                        Some((dropped, _)) => total -= dropped,
                        None => break,
                    }
                }
            }
            window.push_back((len, piece.as_str()));
            total += len;
        }
        push_joined(&mut merged, &window);
        merged
    }
}

/// Chunks `raw_text` with the default separators and source tag.
///
/// # Errors
/// `EmptyInput` for blank text, `InvalidConfig` for unusable sizes.
pub fn chunk(raw_text: &str, chunk_size: usize, overlap: usize) -> Result<Vec<Passage>, ChunkError> {
    Chunker::new(chunk_size, overlap)?.chunk(raw_text, DEFAULT_SOURCE_TAG)
}

fn pick_separator<'s>(text: &str, separators: &'s [String]) -> (&'s str, &'s [String]) {
    for (i, separator) in separators.iter().enumerate() {
        if separator.is_empty() {
            return ("", &[]);
        }
        if text.contains(separator.as_str()) {
            return (separator, &separators[i + 1..]);
        }
    }
    ("", &[])
}

/// Splits on `separator`, attaching it to the start of the following piece.
fn split_keeping_separator(text: &str, separator: &str) -> Vec<String> {
    if separator.is_empty() {
        return text.chars().map(String::from).collect();
    }
    let mut parts = text.split(separator);
    let mut pieces = Vec::new();
    if let Some(first) = parts.next().filter(|p| !p.is_empty()) {
        pieces.push(first.to_string());
    }
    pieces.extend(parts.map(|part| format!("{separator}{part}")));
    pieces
}

fn push_joined(merged: &mut Vec<String>, window: &VecDeque<(usize, &str)>) {
    let joined: String = window.iter().map(|(_, piece)| *piece).collect();
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        merged.push(trimmed.to_string());
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}
