use std::fs;

use healthchat_core::traits::{Embedder, VectorSearch};
use healthchat_core::types::{DocumentChunk, IndexEntry, SourceMeta};
use healthchat_core::Error;
use healthchat_embed::FakeEmbedder;
use healthchat_vector::bundle::{self, ENTRIES_FILE, MANIFEST_FILE};
use healthchat_vector::FlatIndex;

fn entry(id: &str, vector: Vec<f32>) -> IndexEntry {
    IndexEntry::new(
        vector,
        DocumentChunk {
            id: id.to_string(),
            content: format!("content of {id}"),
            meta: SourceMeta::new(format!("data/{id}.txt"), id),
            chunk_index: 0,
            total_chunks: 1,
        },
    )
}

fn sample_index() -> FlatIndex {
    FlatIndex::build(
        "test:d3",
        vec![
            entry("x", vec![1.0, 0.0, 0.0]),
            entry("y", vec![0.0, 1.0, 0.0]),
            entry("xy", vec![1.0, 1.0, 0.0]),
            entry("z", vec![0.0, 0.0, 2.0]),
        ],
    )
    .unwrap()
}

fn ids(hits: &[healthchat_core::types::SearchHit]) -> Vec<&str> {
    hits.iter().map(|h| h.id.as_str()).collect()
}

#[test]
fn build_rejects_empty_and_ragged_input() {
    assert!(matches!(FlatIndex::build("m", vec![]), Err(Error::EmptyCorpus(_))));
    let ragged = vec![entry("a", vec![1.0, 0.0]), entry("b", vec![1.0])];
    assert!(matches!(
        FlatIndex::build("m", ragged),
        Err(Error::DimensionMismatch { expected: 2, actual: 1 })
    ));
}

#[test]
fn query_ranks_by_cosine_similarity() {
    let index = sample_index();
    let hits = index.query(&[1.0, 0.2, 0.0], 4).unwrap();
    assert_eq!(ids(&hits), vec!["x", "xy", "y", "z"]);
    assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));
    assert!((hits[0].score - 1.0 / 1.04f32.sqrt()).abs() < 1e-5);
    assert_eq!(hits[0].meta.source, "data/x.txt");
}

#[test]
fn ties_keep_insertion_order() {
    let index = FlatIndex::build(
        "m",
        vec![entry("first", vec![0.0, 1.0]), entry("second", vec![0.0, 3.0]), entry("third", vec![0.0, 2.0])],
    )
    .unwrap();
    for _ in 0..5 {
        let hits = index.query(&[0.0, 1.0], 3).unwrap();
        assert_eq!(ids(&hits), vec!["first", "second", "third"]);
    }
}

#[test]
fn k_is_clamped_and_zero_returns_nothing() {
    let index = sample_index();
    assert_eq!(index.query(&[1.0, 0.0, 0.0], 100).unwrap().len(), 4);
    assert_eq!(index.query(&[1.0, 0.0, 0.0], 2).unwrap().len(), 2);
    assert!(index.query(&[1.0, 0.0, 0.0], 0).unwrap().is_empty());
}

#[test]
fn query_dimension_is_checked() {
    let index = sample_index();
    assert!(matches!(
        index.query(&[1.0, 0.0], 1),
        Err(Error::DimensionMismatch { expected: 3, actual: 2 })
    ));
}

#[test]
fn zero_query_scores_zero_everywhere() {
    let index = sample_index();
    let hits = index.query(&[0.0, 0.0, 0.0], 4).unwrap();
    assert!(hits.iter().all(|h| h.score == 0.0));
    assert_eq!(ids(&hits), vec!["x", "y", "xy", "z"]);
}

#[test]
fn save_and_load_preserves_ranking() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("indexes").join("vector");
    let index = sample_index();
    index.save(&path).unwrap();

    assert!(path.join(MANIFEST_FILE).is_file());
    assert!(path.join(ENTRIES_FILE).is_file());

    let loaded = FlatIndex::load(&path).unwrap();
    assert_eq!(loaded.model_id(), "test:d3");
    assert_eq!(loaded.dim(), 3);
    assert_eq!(loaded.len(), 4);
    // [1, 1, 0] ties "x" with "y"; the zero vector ties everything.
    let queries: [[f32; 3]; 5] =
        [[0.3, 0.9, 0.1], [0.0, 0.0, 0.0], [1.0, 1.0, 0.0], [-1.0, 0.5, 2.0], [0.0, 0.0, -3.0]];
    for q in &queries {
        for k in [1, 3, 4] {
            assert_eq!(index.query(q, k).unwrap(), loaded.query(q, k).unwrap(), "query {q:?} k={k}");
        }
    }

    let manifest = bundle::load(&path).unwrap().manifest;
    assert_eq!(manifest.count, 4);
    assert_eq!(manifest.format_version, bundle::FORMAT_VERSION);
}

#[test]
fn missing_index_is_not_found() {
    let tmp = tempfile::tempdir().unwrap();
    let err = FlatIndex::load(&tmp.path().join("nope")).unwrap_err();
    assert!(matches!(err, Error::IndexNotFound(_)));
    // A directory without a manifest is not an index either.
    let err = FlatIndex::load(tmp.path()).unwrap_err();
    assert!(matches!(err, Error::IndexNotFound(_)));
}

#[test]
fn corrupt_bundles_are_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("vector");
    sample_index().save(&path).unwrap();

    // Truncated entries file fails the checksum.
    let entries_path = path.join(ENTRIES_FILE);
    let body = fs::read_to_string(&entries_path).unwrap();
    let first_line = body.lines().next().unwrap();
    fs::write(&entries_path, format!("{first_line}\n")).unwrap();
    assert!(matches!(FlatIndex::load(&path), Err(Error::IndexCorrupt { .. })));

    // Garbage manifest.
    sample_index().save(&path).unwrap();
    fs::write(path.join(MANIFEST_FILE), "{ not json").unwrap();
    assert!(matches!(FlatIndex::load(&path), Err(Error::IndexCorrupt { .. })));
}

#[test]
fn manifest_dimension_must_match_entries() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("vector");
    sample_index().save(&path).unwrap();

    let manifest_path = path.join(MANIFEST_FILE);
    let mut manifest: serde_json::Value = serde_json::from_str(&fs::read_to_string(&manifest_path).unwrap()).unwrap();
    manifest["dim"] = serde_json::json!(5);
    fs::write(&manifest_path, serde_json::to_string(&manifest).unwrap()).unwrap();

    let err = FlatIndex::load(&path).unwrap_err();
    assert!(err.to_string().contains("dimensions"), "{err}");
}

#[test]
fn oversized_manifest_count_is_corrupt() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("vector");
    sample_index().save(&path).unwrap();

    let manifest_path = path.join(MANIFEST_FILE);
    let mut manifest: serde_json::Value = serde_json::from_str(&fs::read_to_string(&manifest_path).unwrap()).unwrap();
    manifest["count"] = serde_json::json!(u64::MAX);
    fs::write(&manifest_path, serde_json::to_string(&manifest).unwrap()).unwrap();

    let err = FlatIndex::load(&path).unwrap_err();
    assert!(matches!(err, Error::IndexCorrupt { .. }), "{err}");
    assert!(err.to_string().contains("expected"), "{err}");
}

#[test]
fn saving_again_replaces_the_previous_bundle() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("vector");
    sample_index().save(&path).unwrap();

    let smaller = FlatIndex::build("test:d3", vec![entry("only", vec![1.0, 1.0, 1.0])]).unwrap();
    smaller.save(&path).unwrap();

    let loaded = FlatIndex::load(&path).unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded.entries()[0].chunk.id, "only");

    let leftovers: Vec<_> = fs::read_dir(tmp.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().to_string())
        .collect();
    assert_eq!(leftovers, vec!["vector".to_string()]);
}

#[test]
fn ensure_model_rejects_other_embedders() {
    let embedder = FakeEmbedder::new(256);
    let texts = vec!["paracetamol relieves headache".to_string(), "ginger tea soothes stomach".to_string()];
    let vectors = embedder.embed_batch(&texts).unwrap();
    let entries = vectors.into_iter().zip(["a", "b"]).map(|(v, id)| entry(id, v)).collect();
    let index = FlatIndex::build(embedder.model_id(), entries).unwrap();

    assert!(index.ensure_model(embedder.model_id(), 256).is_ok());
    assert!(matches!(index.ensure_model("fake:xxh64:d512", 512), Err(Error::ModelMismatch { .. })));
    assert!(matches!(index.ensure_model(embedder.model_id(), 8), Err(Error::DimensionMismatch { .. })));

    let query = embedder.embed("headache").unwrap();
    let hits = index.search_vec(&query, 1).unwrap();
    assert_eq!(hits[0].id, "a");
}
