//! Sentence embedders: a local XLM-RoBERTa encoder run through candle, and a
//! hashing fake for tests and offline runs.

use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::time::Instant;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::xlm_roberta::{Config as XLMRobertaConfig, XLMRobertaModel};
use tokenizers::Tokenizer;
use tracing::{debug, info, warn};
use twox_hash::XxHash64;

use healthchat_core::config::EmbedderSettings;
use healthchat_core::traits::Embedder;

pub mod device;
pub mod pool;
pub mod tokenize;

pub use pool::masked_mean_l2;

pub struct EmbeddingModel {
    model: XLMRobertaModel,
    tokenizer: Tokenizer,
    device: Device,
    model_id: String,
    dim: usize,
    max_len: usize,
    pad_id: u32,
}

impl EmbeddingModel {
    pub fn new(settings: &EmbedderSettings) -> Result<Self> {
        let model_dir = resolve_model_dir(settings)?;
        Self::from_dir(&model_dir, &settings.model_name, settings.max_len)
    }

    /// Load from a directory holding `config.json`, `tokenizer.json` and either
    /// `model.safetensors` or `pytorch_model.bin`.
    pub fn from_dir(model_dir: &Path, model_name: &str, max_len: usize) -> Result<Self> {
        let device = device::select_device();
        info!("Loading embedding model {} from {}", model_name, model_dir.display());

        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e))?;

        let config_path = model_dir.join("config.json");
        let raw_config = std::fs::read_to_string(&config_path)
            .map_err(|e| anyhow!("Failed to read {}: {}", config_path.display(), e))?;
        let config: XLMRobertaConfig = serde_json::from_str(&raw_config)?;
        let raw: serde_json::Value = serde_json::from_str(&raw_config)?;
        let dim = raw
            .get("hidden_size")
            .and_then(serde_json::Value::as_u64)
            .ok_or_else(|| anyhow!("{} has no hidden_size", config_path.display()))? as usize;
        let pad_id = raw.get("pad_token_id").and_then(serde_json::Value::as_u64).unwrap_or(1) as u32;

        let weights = load_weights(model_dir, &device)?;
        let prefixed = weights.keys().any(|k| k.starts_with("roberta."));
        let vb = VarBuilder::from_tensors(weights, DType::F32, &device);
        let vb = if prefixed { vb.pp("roberta") } else { vb };
        let model = XLMRobertaModel::new(&config, vb)?;

        let model_id = format!("local:{}:d{}", model_name, dim);
        info!(model_id = %model_id, max_len, "Embedding model loaded");
        Ok(Self { model, tokenizer, device, model_id, dim, max_len, pad_id })
    }

    fn forward_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let start = Instant::now();
        let (input_ids, attention_mask) =
            tokenize::tokenize_batch(&self.tokenizer, texts, self.max_len, self.pad_id, &self.device)?;
        let token_type_ids = input_ids.zeros_like()?;
        let hidden = self.model.forward(&input_ids, &attention_mask, &token_type_ids, None, None, None)?;
        let pooled = pool::masked_mean_l2(&hidden, &attention_mask)?;
        let vectors: Vec<Vec<f32>> = pooled.to_device(&Device::Cpu)?.to_vec2()?;
        let elapsed = start.elapsed().as_millis();
        if elapsed > 100 * texts.len() as u128 {
            warn!("Slow embedding: {} texts in {} ms", texts.len(), elapsed);
        } else {
            debug!("Embedded {} texts in {} ms", texts.len(), elapsed);
        }
        Ok(vectors)
    }
}

impl Embedder for EmbeddingModel {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn max_len(&self) -> usize {
        self.max_len
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let vectors = self.forward_batch(texts)?;
        if vectors.len() != texts.len() {
            return Err(anyhow!("model returned {} vectors for {} texts", vectors.len(), texts.len()));
        }
        Ok(vectors)
    }
}

fn load_weights(model_dir: &Path, device: &Device) -> Result<HashMap<String, Tensor>> {
    let safetensors = model_dir.join("model.safetensors");
    if safetensors.exists() {
        debug!("Loading weights from {}", safetensors.display());
        return Ok(candle_core::safetensors::load(safetensors, device)?);
    }
    let pickle = model_dir.join("pytorch_model.bin");
    if pickle.exists() {
        debug!("Loading weights from {}", pickle.display());
        let weights = candle_core::pickle::read_all(pickle)?;
        return Ok(weights.into_iter().collect());
    }
    Err(anyhow!("No model.safetensors or pytorch_model.bin in {}", model_dir.display()))
}

/// Hash-based bag-of-words vectors. Deterministic and dependency-free at
/// runtime, so tests and offline runs get stable rankings without weights.
#[derive(Debug, Clone)]
pub struct FakeEmbedder {
    dim: usize,
    model_id: String,
}

impl FakeEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim, model_id: format!("fake:xxh64:d{}", dim) }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dim];
        let tokens = text
            .split_whitespace()
            .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
            .filter(|t| !t.is_empty());
        for (i, token) in tokens.enumerate() {
            let mut hasher = XxHash64::with_seed(0);
            token.hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h as usize) % self.dim;
            let val = ((h >> 32) as u32) as f32 / u32::MAX as f32;
            v[idx] += val + (i % 3) as f32 * 0.01;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt().max(1e-6);
        for x in &mut v {
            *x /= norm;
        }
        v
    }
}

impl Embedder for FakeEmbedder {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn max_len(&self) -> usize {
        usize::MAX
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}

/// The fake embedder when `use_fake` is set (or `APP_USE_FAKE_EMBEDDINGS` is
/// `1`/`true`), otherwise the local model.
pub fn get_default_embedder(settings: &EmbedderSettings) -> Result<Box<dyn Embedder>> {
    let env_fake = std::env::var("APP_USE_FAKE_EMBEDDINGS")
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    if settings.use_fake || env_fake {
        if settings.fake_dim == 0 {
            return Err(anyhow!("embedder.fake_dim must be greater than 0"));
        }
        info!("Using FakeEmbedder (dim {})", settings.fake_dim);
        return Ok(Box::new(FakeEmbedder::new(settings.fake_dim)));
    }
    Ok(Box::new(EmbeddingModel::new(settings)?))
}

fn resolve_model_dir(settings: &EmbedderSettings) -> Result<PathBuf> {
    let mut candidates: Vec<(&str, PathBuf)> = Vec::new();
    if let Some(dir) = &settings.model_dir {
        candidates.push(("embedder.model_dir", healthchat_core::config::expand_path(dir)));
    }
    if let Ok(dir) = std::env::var("APP_MODEL_DIR") {
        candidates.push(("APP_MODEL_DIR", PathBuf::from(dir)));
    }
    if let Ok(dir) = std::env::var("MODEL_DIR") {
        candidates.push(("MODEL_DIR", PathBuf::from(dir)));
    }
    candidates.push(("default", Path::new("models").join(&settings.model_name)));

    for (origin, path) in candidates {
        if path.exists() {
            info!("Using model dir from {}: {}", origin, path.display());
            return Ok(path);
        }
        debug!("Model dir from {} not found: {}", origin, path.display());
    }
    Err(anyhow!(
        "Could not locate model directory for {}; set embedder.model_dir or APP_MODEL_DIR",
        settings.model_name
    ))
}
