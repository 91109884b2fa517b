//! Overlapping fixed-size chunker.
//!
//! Splits a normalized narrative into chunks of `chunk_size` characters,
//! each overlapping the previous one by `chunk_overlap` characters. The
//! sequence is produced lazily by an iterator and can be restarted by
//! calling [`Chunker::chunks`] again.

use crate::core::config::settings::ChunkingSettings;
use crate::core::errors::ApiError;

/// A single span of a narrative. Offsets are character indices into the
/// normalized text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkSpan<'a> {
    pub index: usize,
    pub start: usize,
    pub end: usize,
    pub text: &'a str,
}

#[derive(Debug, Clone)]
pub struct Chunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Chunker {
    pub fn new(settings: &ChunkingSettings) -> Result<Self, ApiError> {
        if settings.chunk_size == 0 {
            return Err(ApiError::Config(
                "chunking.chunk_size must be at least 1".to_string(),
            ));
        }
        if settings.chunk_overlap >= settings.chunk_size {
            return Err(ApiError::Config(format!(
                "chunking.chunk_overlap ({}) must be smaller than chunk_size ({})",
                settings.chunk_overlap, settings.chunk_size
            )));
        }

        Ok(Self {
            chunk_size: settings.chunk_size,
            chunk_overlap: settings.chunk_overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Returns a lazy iterator over the chunks of `text`.
    pub fn chunks<'a>(&self, text: &'a str) -> Chunks<'a> {
        Chunks::new(text, self.chunk_size, self.chunk_size - self.chunk_overlap)
    }
}

/// Lazy chunk iterator. Char-boundary safe: slicing is done through a
/// precomputed boundary table, never by raw byte arithmetic.
pub struct Chunks<'a> {
    text: &'a str,
    boundaries: Vec<usize>,
    chunk_size: usize,
    step: usize,
    next_start: usize,
    next_index: usize,
    done: bool,
}

impl<'a> Chunks<'a> {
    fn new(text: &'a str, chunk_size: usize, step: usize) -> Self {
        let mut boundaries: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
        boundaries.push(text.len());

        Self {
            text,
            boundaries,
            chunk_size,
            step,
            next_start: 0,
            next_index: 0,
            done: false,
        }
    }

    fn char_count(&self) -> usize {
        self.boundaries.len() - 1
    }
}

impl<'a> Iterator for Chunks<'a> {
    type Item = ChunkSpan<'a>;

    fn next(&mut self) -> Option<ChunkSpan<'a>> {
        if self.done || self.next_start >= self.char_count() {
            return None;
        }

        let start = self.next_start;
        let end = (start + self.chunk_size).min(self.char_count());
        let span = ChunkSpan {
            index: self.next_index,
            start,
            end,
            text: &self.text[self.boundaries[start]..self.boundaries[end]],
        };

        if end == self.char_count() {
            // The input is covered; a further step would only re-emit a
            // suffix of this chunk.
            self.done = true;
        } else {
            self.next_start = start + self.step;
            self.next_index += 1;
        }

        Some(span)
    }
}
