use crate::types::SearchHit;

/// Text-to-vector capability. Ingestion and querying must use the same
/// `model_id`; vectors from different models are not comparable.
pub trait Embedder: Send + Sync {
    /// Stable identifier for the model and its output shape (e.g. `local:<name>:d768`).
    fn model_id(&self) -> &str;
    fn dim(&self) -> usize;
    fn max_len(&self) -> usize;
    /// `output[i]` is the embedding of `texts[i]`.
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;

    fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])?
            .pop()
            .ok_or_else(|| anyhow::anyhow!("embedder returned no vector"))
    }
}

/// Read-only nearest-neighbour search over a built index.
pub trait VectorSearch: Send + Sync {
    fn model_id(&self) -> &str;
    fn dim(&self) -> usize;
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Up to `k` hits, best first.
    fn search_vec(&self, query_vec: &[f32], k: usize) -> crate::Result<Vec<SearchHit>>;
}
