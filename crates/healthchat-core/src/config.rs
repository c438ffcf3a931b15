//! Layered configuration and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars
//! (nested keys separated by `__`, e.g. `APP_RETRIEVAL__TOP_K=5`). `Settings`
//! is the typed view used by the binaries; every section has defaults so an
//! empty configuration is valid.

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::chunker::ChunkingConfig;
use crate::error::{Error, Result};

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
        Self::load_from(Path::new("."), &env_name)
    }

    /// Same layering as `load`, with config files looked up under `dir`.
    pub fn load_from(dir: &Path, env_name: &str) -> anyhow::Result<Self> {
        let mut figment = Figment::new().merge(Toml::file(dir.join("config.toml")));
        match env_name {
            "dev" | "development" => figment = figment.merge(Toml::file(dir.join("config.dev.toml"))),
            "prod" | "production" => figment = figment.merge(Toml::file(dir.join("config.prod.toml"))),
            "test" | "testing" => figment = figment.merge(Toml::file(dir.join("config.test.toml"))),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));
        Ok(Self { figment })
    }

    pub fn from_figment(figment: Figment) -> Self {
        Self { figment }
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    pub fn settings(&self) -> anyhow::Result<Settings> {
        let settings: Settings = self
            .figment
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to read settings: {}", e))?;
        settings.validate()?;
        Ok(settings)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub data: DataSettings,
    pub chunking: ChunkingConfig,
    pub retrieval: RetrievalSettings,
    pub embedder: EmbedderSettings,
    pub answer: AnswerSettings,
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        self.chunking.validate()?;
        if self.retrieval.top_k == 0 {
            return Err(Error::InvalidConfig("retrieval.top_k must be greater than 0".into()));
        }
        if self.embedder.batch_size == 0 {
            return Err(Error::InvalidConfig("embedder.batch_size must be greater than 0".into()));
        }
        if self.embedder.fake_dim == 0 {
            return Err(Error::InvalidConfig("embedder.fake_dim must be greater than 0".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    pub corpus_dir: String,
    pub index_dir: String,
    pub keyword_map: String,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            corpus_dir: "data".to_string(),
            index_dir: "indexes/vector".to_string(),
            keyword_map: "config/keywords.toml".to_string(),
        }
    }
}

impl DataSettings {
    pub fn corpus_path(&self) -> PathBuf {
        expand_path(&self.corpus_dir)
    }

    pub fn index_path(&self) -> PathBuf {
        expand_path(&self.index_dir)
    }

    pub fn keyword_map_path(&self) -> PathBuf {
        expand_path(&self.keyword_map)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub top_k: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self { top_k: 3 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbedderSettings {
    /// Directory holding `config.json`, `tokenizer.json` and the weights.
    pub model_dir: Option<String>,
    pub model_name: String,
    pub max_len: usize,
    pub batch_size: usize,
    pub use_fake: bool,
    pub fake_dim: usize,
}

impl Default for EmbedderSettings {
    fn default() -> Self {
        Self {
            model_dir: None,
            model_name: "dangvantuan/vietnamese-embedding".to_string(),
            max_len: 256,
            batch_size: 32,
            use_fake: false,
            fake_dim: 768,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnswerSettings {
    pub preview_chars: usize,
}

impl Default for AnswerSettings {
    fn default() -> Self {
        Self { preview_chars: 500 }
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    // Expand env vars first
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}
