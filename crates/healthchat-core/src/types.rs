//! Domain types shared by the ingestion, vector and chat layers.

use serde::{Deserialize, Serialize};

pub type ChunkId = String;

/// Provenance carried from a source file down to every chunk and search hit.
///
/// - `source`: path of the file the text came from, as shown to users
/// - `doc_id`: stable document identity (corpus-relative path without extension)
/// - `page`: 1-based page number for paginated inputs such as PDF
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceMeta {
    pub source: String,
    pub doc_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<usize>,
}

impl SourceMeta {
    pub fn new(source: impl Into<String>, doc_id: impl Into<String>) -> Self {
        Self { source: source.into(), doc_id: doc_id.into(), page: None }
    }

    #[must_use]
    pub fn with_page(mut self, page: usize) -> Self {
        self.page = Some(page);
        self
    }
}

/// Raw text of one loaded source unit (a text file or a single PDF page).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub text: String,
    pub meta: SourceMeta,
}

impl Document {
    pub fn new(text: impl Into<String>, meta: SourceMeta) -> Self {
        Self { text: text.into(), meta }
    }
}

/// A window of a source document that is embedded and indexed on its own.
///
/// `chunk_index`/`total_chunks` give the position within the parent document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub id: ChunkId,
    pub content: String,
    pub meta: SourceMeta,
    pub chunk_index: usize,
    pub total_chunks: usize,
}

/// Vector plus the chunk it was computed from. Owned by the vector index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub vector: Vec<f32>,
    pub chunk: DocumentChunk,
}

impl IndexEntry {
    pub fn new(vector: Vec<f32>, chunk: DocumentChunk) -> Self {
        Self { vector, chunk }
    }
}

/// One ranked passage. `score` is cosine similarity, higher is better.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: ChunkId,
    pub content: String,
    pub meta: SourceMeta,
    pub score: f32,
}

/// Ranked passages for one query, best first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub hits: Vec<SearchHit>,
}

impl RetrievalResult {
    pub fn new(hits: Vec<SearchHit>) -> Self {
        Self { hits }
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// Source of every hit in rank order. Repeats are kept: each one counts as evidence.
    pub fn sources(&self) -> Vec<String> {
        self.hits.iter().map(|h| h.meta.source.clone()).collect()
    }

    /// Hit texts joined with `separator`, in rank order.
    pub fn context(&self, separator: &str) -> String {
        self.hits.iter().map(|h| h.content.as_str()).collect::<Vec<_>>().join(separator)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub id: u32,
    pub name: String,
    pub reason: String,
}

impl Recommendation {
    pub fn new(id: u32, name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self { id, name: name.into(), reason: reason.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    /// Prior turns. Accepted for context, not consulted by retrieval.
    #[serde(default)]
    pub history: Vec<ChatTurn>,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into(), history: Vec::new() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub answer: String,
    pub sources: Vec<String>,
    pub recommendations: Vec<Recommendation>,
}
