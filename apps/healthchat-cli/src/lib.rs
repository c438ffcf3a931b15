//! Shared wiring for the `healthchat` binaries.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use healthchat_core::chunker::ChunkingConfig;
use healthchat_core::config::{Config, Settings};
use healthchat_core::traits::Embedder;
use healthchat_core::Error;
use healthchat_embed::get_default_embedder;
use healthchat_rag::{ingest_with, IngestOptions, IngestionReport};

/// `EX_TEMPFAIL`: the request may succeed once the index is available.
pub const EXIT_UNAVAILABLE: u8 = 75;

/// Logs go to stderr so stdout carries only command output.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
}

pub fn load_settings(config_dir: &Path, env_name: &str) -> anyhow::Result<Settings> {
    Config::load_from(config_dir, env_name)?.settings()
}

pub fn build_embedder(settings: &Settings) -> anyhow::Result<Arc<dyn Embedder>> {
    Ok(Arc::from(get_default_embedder(&settings.embedder)?))
}

/// Optional command-line overrides for an ingest run.
#[derive(Debug, Default, Clone)]
pub struct IngestOverrides {
    pub corpus: Option<PathBuf>,
    pub index: Option<PathBuf>,
    pub chunk_size: Option<usize>,
    pub overlap: Option<usize>,
    pub show_progress: bool,
}

pub fn run_ingest(settings: &Settings, overrides: &IngestOverrides) -> anyhow::Result<IngestionReport> {
    let corpus = overrides.corpus.clone().unwrap_or_else(|| settings.data.corpus_path());
    let index = overrides.index.clone().unwrap_or_else(|| settings.data.index_path());
    let chunking = ChunkingConfig::new(
        overrides.chunk_size.unwrap_or(settings.chunking.chunk_size),
        overrides.overlap.unwrap_or(settings.chunking.overlap),
    )?;
    info!("Corpus: {}  Index: {}", corpus.display(), index.display());

    let embedder = build_embedder(settings)?;
    let options = IngestOptions { chunking, batch_size: settings.embedder.batch_size, show_progress: overrides.show_progress };
    Ok(ingest_with(&corpus, &options, embedder.as_ref(), &index)?)
}

/// Map a command failure to a process exit code, logging it once.
pub fn exit_code_for(err: &anyhow::Error) -> ExitCode {
    error!("{:#}", err);
    match err.downcast_ref::<Error>() {
        Some(e) if e.is_retryable() => ExitCode::from(EXIT_UNAVAILABLE),
        _ => ExitCode::FAILURE,
    }
}
