//! Fixed-size character windows with overlap.
//!
//! Windows are `[start, start + size)` in character positions, clipped to the
//! text length, with `start` advancing by `size - overlap`. Empty text yields
//! no windows.

use serde::{Deserialize, Serialize};
use std::ops::Range;

use crate::error::{Error, Result};

pub const DEFAULT_CHUNK_SIZE: usize = 1000;
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkingConfig {
    pub size: usize,
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { size: DEFAULT_CHUNK_SIZE, overlap: DEFAULT_CHUNK_OVERLAP }
    }
}

impl ChunkingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.size == 0 {
            return Err(Error::InvalidConfig("chunk size must be greater than 0".into()));
        }
        if self.overlap >= self.size {
            return Err(Error::InvalidConfig(format!(
                "chunk overlap ({}) must be smaller than chunk size ({})",
                self.overlap, self.size
            )));
        }
        Ok(())
    }

    pub fn chunk(&self, text: &str) -> Result<Vec<String>> {
        chunk_text(text, self.size, self.overlap)
    }
}

/// Character ranges covering a text of `len` characters.
pub fn chunk_spans(len: usize, chunk_size: usize, overlap: usize) -> Result<Vec<Range<usize>>> {
    ChunkingConfig { size: chunk_size, overlap }.validate()?;
    let step = chunk_size - overlap;
    let mut spans = Vec::with_capacity(len.div_ceil(step));
    let mut start = 0;
    while start < len {
        spans.push(start..(start + chunk_size).min(len));
        start += step;
    }
    Ok(spans)
}

pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Result<Vec<String>> {
    // Byte offset of every char boundary, including the end of the text.
    let bounds: Vec<usize> = text.char_indices().map(|(i, _)| i).chain(std::iter::once(text.len())).collect();
    let spans = chunk_spans(bounds.len() - 1, chunk_size, overlap)?;
    Ok(spans.into_iter().map(|r| text[bounds[r.start]..bounds[r.end]].to_string()).collect())
}
