//! Offline ingestion: corpus directory to persisted vector index.

use std::path::Path;

use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use tracing::info;

use healthchat_core::chunker::ChunkingConfig;
use healthchat_core::data_processor::DataProcessor;
use healthchat_core::traits::Embedder;
use healthchat_core::types::{DocumentChunk, IndexEntry};
use healthchat_core::{Error, Result};
use healthchat_vector::FlatIndex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestionReport {
    pub documents_loaded: usize,
    pub chunks_created: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct IngestOptions {
    pub chunking: ChunkingConfig,
    pub batch_size: usize,
    pub show_progress: bool,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self { chunking: ChunkingConfig::default(), batch_size: 32, show_progress: false }
    }
}

pub fn ingest(corpus: &Path, chunking: &ChunkingConfig, embedder: &dyn Embedder, index_path: &Path) -> Result<IngestionReport> {
    let options = IngestOptions { chunking: *chunking, ..IngestOptions::default() };
    ingest_with(corpus, &options, embedder, index_path)
}

/// Load, chunk, embed and persist. Nothing is written unless every step
/// succeeds, so a failed run leaves any previous index untouched.
pub fn ingest_with(
    corpus: &Path,
    options: &IngestOptions,
    embedder: &dyn Embedder,
    index_path: &Path,
) -> Result<IngestionReport> {
    options.chunking.validate()?;
    if options.batch_size == 0 {
        return Err(Error::InvalidConfig("batch_size must be greater than 0".into()));
    }
    info!("Ingesting from {}", corpus.display());
    let processor = DataProcessor::with_chunking(options.chunking);
    let (documents, chunks) = processor.process_directory(corpus)?;
    if chunks.is_empty() {
        return Err(Error::EmptyCorpus(format!("no text could be chunked under {}", corpus.display())));
    }

    let index = build_index(chunks, embedder, options.batch_size, options.show_progress)?;
    index.save(index_path)?;

    let report = IngestionReport { documents_loaded: documents.len(), chunks_created: index.entries().len() };
    info!(
        documents = report.documents_loaded,
        chunks = report.chunks_created,
        index = %index_path.display(),
        "Ingest complete"
    );
    Ok(report)
}

/// Embed `chunks` in batches and build an in-memory index in chunk order.
pub fn build_index(chunks: Vec<DocumentChunk>, embedder: &dyn Embedder, batch_size: usize, show_progress: bool) -> Result<FlatIndex> {
    let pb = progress_bar(chunks.len(), show_progress);
    let dim = embedder.dim();
    let mut entries = Vec::with_capacity(chunks.len());
    for batch in chunks.chunks(batch_size.max(1)) {
        let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();
        let vectors = embedder.embed_batch(&texts).map_err(Error::Embedding)?;
        if vectors.len() != batch.len() {
            return Err(Error::Embedding(anyhow::anyhow!(
                "embedder returned {} vectors for {} chunks",
                vectors.len(),
                batch.len()
            )));
        }
        for (chunk, vector) in batch.iter().zip(vectors) {
            if vector.len() != dim {
                return Err(Error::DimensionMismatch { expected: dim, actual: vector.len() });
            }
            entries.push(IndexEntry::new(vector, chunk.clone()));
        }
        pb.inc(batch.len() as u64);
    }
    pb.finish_and_clear();
    FlatIndex::build(embedder.model_id(), entries)
}

fn progress_bar(len: usize, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(len as u64);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({percent}%)")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");
    pb.set_style(style);
    pb
}
