mod common;

use std::fs;
use std::sync::Arc;

use parking_lot::Mutex;

use healthchat_core::chunker::ChunkingConfig;
use healthchat_core::traits::{Embedder, VectorSearch};
use healthchat_core::Error;
use healthchat_rag::{ingest, ingest_with, IngestOptions, IngestionReport, Retriever};
use healthchat_vector::FlatIndex;

use common::{write_corpus, FailingEmbedder, VocabEmbedder};

fn small_chunks() -> ChunkingConfig {
    ChunkingConfig::new(20, 5).unwrap()
}

#[test]
fn headache_query_ranks_the_paracetamol_guide_first() {
    let tmp = tempfile::tempdir().unwrap();
    let corpus = write_corpus(tmp.path());
    let index_path = tmp.path().join("indexes").join("vector");

    let report = ingest(&corpus, &small_chunks(), &VocabEmbedder, &index_path).unwrap();
    assert_eq!(report, IngestionReport { documents_loaded: 2, chunks_created: 5 });

    let retriever = Retriever::load(Arc::new(VocabEmbedder), &index_path);
    assert!(retriever.is_available());
    let result = retriever.retrieve("I have a headache", 3).unwrap();
    assert_eq!(result.len(), 3);
    let top = &result.hits[0];
    assert_eq!(top.meta.doc_id, "a");
    assert!(top.content.contains("headache"));
    assert!(top.meta.source.ends_with("a.txt"));
    assert!(result.hits.windows(2).all(|w| w[0].score >= w[1].score));
}

#[test]
fn chunks_are_stored_in_corpus_order() {
    let tmp = tempfile::tempdir().unwrap();
    let corpus = write_corpus(tmp.path());
    let index_path = tmp.path().join("vector");
    ingest(&corpus, &small_chunks(), &VocabEmbedder, &index_path).unwrap();

    let index = FlatIndex::load(&index_path).unwrap();
    let contents: Vec<&str> = index.entries().iter().map(|e| e.chunk.content.as_str()).collect();
    assert_eq!(
        contents,
        vec!["Paracetamol ", "amol relieves ", "eves headache pain.", "Ginger tea soothes ", "thes stomach upset."]
    );
    assert_eq!(index.model_id(), "test:vocab:d9");
}

#[test]
fn empty_corpus_fails_without_writing_an_index() {
    let tmp = tempfile::tempdir().unwrap();
    let corpus = tmp.path().join("corpus");
    fs::create_dir_all(&corpus).unwrap();
    fs::write(corpus.join("notes.md"), "not a supported format").unwrap();
    let index_path = tmp.path().join("vector");

    let err = ingest(&corpus, &small_chunks(), &VocabEmbedder, &index_path).unwrap_err();
    assert!(matches!(err, Error::EmptyCorpus(_)), "{err}");
    assert!(!index_path.exists());
}

#[test]
fn invalid_chunking_is_rejected_before_loading() {
    let tmp = tempfile::tempdir().unwrap();
    let corpus = write_corpus(tmp.path());
    let bad = ChunkingConfig { chunk_size: 10, overlap: 10 };
    let err = ingest(&corpus, &bad, &VocabEmbedder, &tmp.path().join("vector")).unwrap_err();
    assert!(matches!(err, Error::InvalidConfig(_)));
}

#[test]
fn reingest_replaces_the_previous_index() {
    let tmp = tempfile::tempdir().unwrap();
    let corpus = write_corpus(tmp.path());
    let index_path = tmp.path().join("vector");
    ingest(&corpus, &small_chunks(), &VocabEmbedder, &index_path).unwrap();

    fs::remove_file(corpus.join("b.txt")).unwrap();
    let report = ingest(&corpus, &small_chunks(), &VocabEmbedder, &index_path).unwrap();
    assert_eq!(report, IngestionReport { documents_loaded: 1, chunks_created: 3 });
    assert_eq!(FlatIndex::load(&index_path).unwrap().len(), 3);
}

#[test]
fn failed_embedding_keeps_the_previous_index() {
    let tmp = tempfile::tempdir().unwrap();
    let corpus = write_corpus(tmp.path());
    let index_path = tmp.path().join("vector");
    ingest(&corpus, &small_chunks(), &VocabEmbedder, &index_path).unwrap();

    fs::write(corpus.join("c.txt"), "Another guide that will never be embedded.").unwrap();
    let err = ingest(&corpus, &small_chunks(), &FailingEmbedder, &index_path).unwrap_err();
    assert!(matches!(err, Error::Embedding(_)), "{err}");
    assert_eq!(FlatIndex::load(&index_path).unwrap().len(), 5);
}

struct RecordingEmbedder {
    batches: Mutex<Vec<usize>>,
}

impl Embedder for RecordingEmbedder {
    fn model_id(&self) -> &str {
        VocabEmbedder.model_id()
    }

    fn dim(&self) -> usize {
        VocabEmbedder.dim()
    }

    fn max_len(&self) -> usize {
        VocabEmbedder.max_len()
    }

    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        self.batches.lock().push(texts.len());
        VocabEmbedder.embed_batch(texts)
    }
}

#[test]
fn chunks_are_embedded_in_batches() {
    let tmp = tempfile::tempdir().unwrap();
    let corpus = write_corpus(tmp.path());
    let embedder = RecordingEmbedder { batches: Mutex::new(Vec::new()) };
    let options = IngestOptions { chunking: small_chunks(), batch_size: 2, show_progress: false };

    let report = ingest_with(&corpus, &options, &embedder, &tmp.path().join("vector")).unwrap();
    assert_eq!(report.chunks_created, 5);
    assert_eq!(*embedder.batches.lock(), vec![2, 2, 1]);

    let zero = IngestOptions { batch_size: 0, ..options };
    assert!(matches!(
        ingest_with(&corpus, &zero, &embedder, &tmp.path().join("other")),
        Err(Error::InvalidConfig(_))
    ));
}

#[test]
fn sample_corpus_ingests_with_the_hashing_embedder() {
    let root = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR")).ancestors().nth(2).unwrap().to_path_buf();
    let corpus = root.join("test_data").join("corpus");
    let tmp = tempfile::tempdir().unwrap();
    let index_path = tmp.path().join("vector");
    let embedder = healthchat_embed::FakeEmbedder::new(256);

    let report = ingest(&corpus, &ChunkingConfig::new(200, 20).unwrap(), &embedder, &index_path).unwrap();
    assert_eq!(report.documents_loaded, 5);
    assert!(report.chunks_created >= 5);

    let index = FlatIndex::load(&index_path).unwrap();
    let doc_ids: std::collections::BTreeSet<&str> =
        index.entries().iter().map(|e| e.chunk.meta.doc_id.as_str()).collect();
    assert!(doc_ids.contains("guides/stomach"));
    assert!(doc_ids.contains("headache"));

    let retriever = Retriever::load(Arc::new(embedder), &index_path);
    let result = retriever.retrieve("ginger tea for stomach upset", 3).unwrap();
    assert_eq!(result.len(), 3);
}
