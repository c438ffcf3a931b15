use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Empty corpus: {0}")]
    EmptyCorpus(String),

    #[error("Vector index not found at {}", .0.display())]
    IndexNotFound(PathBuf),

    #[error("Vector index at {} is corrupt: {reason}", path.display())]
    IndexCorrupt { path: PathBuf, reason: String },

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Embedding model mismatch: index was built with '{index}', embedder is '{embedder}'")]
    ModelMismatch { index: String, embedder: String },

    #[error("Retriever unavailable: {0}")]
    RetrieverUnavailable(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Embedding failed: {0}")]
    Embedding(#[source] anyhow::Error),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }

    pub fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::IndexCorrupt { path: path.into(), reason: reason.into() }
    }

    /// True for conditions a caller may retry once the service recovers.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ServiceUnavailable(_) | Self::RetrieverUnavailable(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
