//! Recursive character splitter.
//!
//! Windows hold at most `chunk_size` characters and neighbours share exactly
//! `overlap` characters, so dropping the first `overlap` characters of every
//! chunk after the first and concatenating reconstructs the document. Inside a
//! window the cut is moved back to the last paragraph break, then line break,
//! then space; a raw cut at `chunk_size` is used only when none of these allows
//! the window to advance.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{Document, DocumentChunk, SourceMeta};

pub const SEPARATORS: [&str; 3] = ["\n\n", "\n", " "];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { chunk_size: 500, overlap: 50 }
    }
}

impl ChunkingConfig {
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        let config = Self { chunk_size, overlap };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::InvalidConfig("chunk_size must be greater than 0".into()));
        }
        if self.overlap >= self.chunk_size {
            return Err(Error::InvalidConfig(format!(
                "overlap ({}) must be smaller than chunk_size ({})",
                self.overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}

/// Split every document into chunks that inherit its metadata.
pub fn split(documents: &[Document], config: &ChunkingConfig) -> Result<Vec<DocumentChunk>> {
    config.validate()?;
    let mut chunks = Vec::new();
    for doc in documents {
        let windows = split_text(&doc.text, config.chunk_size, config.overlap);
        let total_chunks = windows.len();
        for (chunk_index, content) in windows.into_iter().enumerate() {
            chunks.push(DocumentChunk {
                id: chunk_id(&doc.meta, chunk_index),
                content,
                meta: doc.meta.clone(),
                chunk_index,
                total_chunks,
            });
        }
    }
    Ok(chunks)
}

/// Windows over `text` measured in chars. Callers must uphold
/// `0 <= overlap < chunk_size`; `split` checks it.
pub fn split_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    // Byte offset of every char, plus the end of the string.
    let bounds: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let n = bounds.len() - 1;

    let mut windows = Vec::new();
    let mut start = 0usize;
    while start < n {
        let limit = (start + chunk_size).min(n);
        let end = if limit == n { n } else { cut_point(text, &bounds, start, limit, overlap) };
        windows.push(text[bounds[start]..bounds[end]].to_string());
        if end == n {
            break;
        }
        start = end - overlap;
    }
    windows
}

/// End (char index, exclusive) for the window `[start, limit)`. Always greater
/// than `start + overlap` so the next window moves forward.
fn cut_point(text: &str, bounds: &[usize], start: usize, limit: usize, overlap: usize) -> usize {
    let window = &text[bounds[start]..bounds[limit]];
    for sep in SEPARATORS {
        // The last occurrence gives the largest end; if it can't advance, none can.
        if let Some(pos) = window.rfind(sep) {
            let end = start + window[..pos + sep.len()].chars().count();
            if end > start + overlap {
                return end;
            }
        }
    }
    limit
}

fn chunk_id(meta: &SourceMeta, chunk_index: usize) -> String {
    match meta.page {
        Some(page) => format!("{}#p{}:{}", meta.doc_id, page, chunk_index),
        None => format!("{}:{}", meta.doc_id, chunk_index),
    }
}
