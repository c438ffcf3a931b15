//! Exact nearest-neighbour index: a linear cosine scan over every entry.

use std::path::Path;

use tracing::{debug, info};

use healthchat_core::traits::VectorSearch;
use healthchat_core::types::{IndexEntry, SearchHit};
use healthchat_core::{Error, Result};

use crate::bundle;
use crate::similarity::{cosine_similarity, magnitude};

#[derive(Debug, Clone)]
pub struct FlatIndex {
    model_id: String,
    dim: usize,
    entries: Vec<IndexEntry>,
    norms: Vec<f32>,
}

impl FlatIndex {
    /// Build from embedded chunks. All vectors must share one non-zero length.
    pub fn build(model_id: impl Into<String>, entries: Vec<IndexEntry>) -> Result<Self> {
        let model_id = model_id.into();
        let Some(first) = entries.first() else {
            return Err(Error::EmptyCorpus("cannot build an index with no entries".into()));
        };
        let dim = first.vector.len();
        if dim == 0 {
            return Err(Error::DimensionMismatch { expected: 1, actual: 0 });
        }
        if let Some(bad) = entries.iter().find(|e| e.vector.len() != dim) {
            return Err(Error::DimensionMismatch { expected: dim, actual: bad.vector.len() });
        }
        let norms = entries.iter().map(|e| magnitude(&e.vector)).collect();
        info!(model_id = %model_id, dim, entries = entries.len(), "built flat index");
        Ok(Self { model_id, dim, entries, norms })
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    /// Top `k` hits by cosine similarity, best first. Equal scores keep
    /// insertion order; `k` larger than the index returns every entry.
    pub fn query(&self, query_vec: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        if query_vec.len() != self.dim {
            return Err(Error::DimensionMismatch { expected: self.dim, actual: query_vec.len() });
        }
        if k == 0 {
            return Ok(Vec::new());
        }
        let query_norm = magnitude(query_vec);
        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .zip(&self.norms)
            .enumerate()
            .map(|(i, (entry, norm))| {
                let score = cosine_similarity(query_vec, &entry.vector, Some(query_norm), Some(*norm));
                (i, if score.is_nan() { f32::NEG_INFINITY } else { score })
            })
            .collect();
        // Stable sort keeps insertion order among ties.
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(k);
        debug!(k, returned = scored.len(), "flat index query");
        Ok(scored
            .into_iter()
            .map(|(i, score)| {
                let chunk = &self.entries[i].chunk;
                SearchHit { id: chunk.id.clone(), content: chunk.content.clone(), meta: chunk.meta.clone(), score }
            })
            .collect())
    }

    /// Reject an index built with a different embedder.
    pub fn ensure_model(&self, model_id: &str, dim: usize) -> Result<()> {
        if self.model_id != model_id {
            return Err(Error::ModelMismatch { index: self.model_id.clone(), embedder: model_id.to_string() });
        }
        if self.dim != dim {
            return Err(Error::DimensionMismatch { expected: self.dim, actual: dim });
        }
        Ok(())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        bundle::save(path, &self.model_id, self.dim, &self.entries)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let loaded = bundle::load(path)?;
        Self::build(loaded.model_id, loaded.entries)
    }
}

impl VectorSearch for FlatIndex {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn search_vec(&self, query_vec: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        self.query(query_vec, k)
    }
}
