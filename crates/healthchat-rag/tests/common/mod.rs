#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use healthchat_core::traits::Embedder;

const VOCAB: [&str; 9] = ["headache", "pain", "paracetamol", "relieves", "ginger", "tea", "soothes", "stomach", "upset"];

/// One dimension per vocabulary word, counting whole-word occurrences.
pub struct VocabEmbedder;

impl Embedder for VocabEmbedder {
    fn model_id(&self) -> &str {
        "test:vocab:d9"
    }

    fn dim(&self) -> usize {
        VOCAB.len()
    }

    fn max_len(&self) -> usize {
        512
    }

    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|text| {
                let mut v = vec![0f32; VOCAB.len()];
                for token in text.split(|c: char| !c.is_alphanumeric()).map(str::to_lowercase) {
                    if let Some(i) = VOCAB.iter().position(|w| *w == token) {
                        v[i] += 1.0;
                    }
                }
                v
            })
            .collect())
    }
}

/// Shares `VocabEmbedder`'s identity but always fails.
pub struct FailingEmbedder;

impl Embedder for FailingEmbedder {
    fn model_id(&self) -> &str {
        "test:vocab:d9"
    }

    fn dim(&self) -> usize {
        VOCAB.len()
    }

    fn max_len(&self) -> usize {
        512
    }

    fn embed_batch(&self, _texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        anyhow::bail!("model crashed")
    }
}

pub const DOC_A: &str = "Paracetamol relieves headache pain.";
pub const DOC_B: &str = "Ginger tea soothes stomach upset.";

/// `<root>/corpus/{a,b}.txt` holding the two sample guides.
pub fn write_corpus(root: &Path) -> PathBuf {
    let corpus = root.join("corpus");
    fs::create_dir_all(&corpus).unwrap();
    fs::write(corpus.join("a.txt"), DOC_A).unwrap();
    fs::write(corpus.join("b.txt"), DOC_B).unwrap();
    corpus
}

pub fn repo_keyword_map_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).ancestors().nth(2).unwrap().join("config").join("keywords.toml")
}
