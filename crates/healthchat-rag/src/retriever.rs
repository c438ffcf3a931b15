//! Query-time retrieval over a swappable index.
//!
//! The retriever owns the query embedder and the current index. The index can
//! be replaced at runtime (`swap_index`) or marked unavailable; in-flight
//! queries keep the snapshot they started with.

use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use healthchat_core::traits::{Embedder, VectorSearch};
use healthchat_core::types::RetrievalResult;
use healthchat_core::{Error, Result};
use healthchat_vector::FlatIndex;

enum IndexState {
    Ready(Arc<dyn VectorSearch>),
    Unavailable(String),
}

pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    state: RwLock<IndexState>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrieverStatus {
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub model_id: String,
    pub dim: usize,
    pub entries: usize,
}

impl Retriever {
    /// A retriever with no index yet; `retrieve` fails until one is installed.
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self { embedder, state: RwLock::new(IndexState::Unavailable("no index loaded".into())) }
    }

    pub fn with_index(embedder: Arc<dyn Embedder>, index: Arc<dyn VectorSearch>) -> Result<Self> {
        let retriever = Self::new(embedder);
        retriever.swap_index(index)?;
        Ok(retriever)
    }

    /// Load the bundle at `index_path`. Failures leave the retriever
    /// unavailable with the reason recorded instead of returning an error.
    pub fn load(embedder: Arc<dyn Embedder>, index_path: &Path) -> Self {
        let retriever = Self::new(embedder);
        match FlatIndex::load(index_path) {
            Ok(index) => {
                if let Err(e) = retriever.swap_index(Arc::new(index)) {
                    warn!("Index at {} not usable: {}", index_path.display(), e);
                    retriever.mark_unavailable(e.to_string());
                }
            }
            Err(e) => {
                warn!("Retriever unavailable: {}", e);
                retriever.mark_unavailable(e.to_string());
            }
        }
        retriever
    }

    /// Install `index` if it was built with this retriever's embedder.
    pub fn swap_index(&self, index: Arc<dyn VectorSearch>) -> Result<()> {
        if index.model_id() != self.embedder.model_id() {
            return Err(Error::ModelMismatch {
                index: index.model_id().to_string(),
                embedder: self.embedder.model_id().to_string(),
            });
        }
        if index.dim() != self.embedder.dim() {
            return Err(Error::DimensionMismatch { expected: index.dim(), actual: self.embedder.dim() });
        }
        info!(model_id = index.model_id(), entries = index.len(), "Retriever ready");
        *self.state.write() = IndexState::Ready(index);
        Ok(())
    }

    pub fn mark_unavailable(&self, reason: impl Into<String>) {
        *self.state.write() = IndexState::Unavailable(reason.into());
    }

    pub fn is_available(&self) -> bool {
        matches!(*self.state.read(), IndexState::Ready(_))
    }

    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }

    pub fn status(&self) -> RetrieverStatus {
        let state = self.state.read();
        let (available, reason, entries) = match &*state {
            IndexState::Ready(index) => (true, None, index.len()),
            IndexState::Unavailable(reason) => (false, Some(reason.clone()), 0),
        };
        RetrieverStatus {
            available,
            reason,
            model_id: self.embedder.model_id().to_string(),
            dim: self.embedder.dim(),
            entries,
        }
    }

    /// Up to `k` most similar chunks for `query`, best first. A blank query
    /// matches nothing.
    pub fn retrieve(&self, query: &str, k: usize) -> Result<RetrievalResult> {
        let index = self.snapshot()?;
        if query.trim().is_empty() || k == 0 {
            return Ok(RetrievalResult::default());
        }
        let query_vec = self.embedder.embed(query).map_err(Error::Embedding)?;
        let hits = index.search_vec(&query_vec, k)?;
        debug!(k, hits = hits.len(), "retrieved");
        Ok(RetrievalResult::new(hits))
    }

    fn snapshot(&self) -> Result<Arc<dyn VectorSearch>> {
        match &*self.state.read() {
            IndexState::Ready(index) => Ok(Arc::clone(index)),
            IndexState::Unavailable(reason) => Err(Error::RetrieverUnavailable(reason.clone())),
        }
    }
}
