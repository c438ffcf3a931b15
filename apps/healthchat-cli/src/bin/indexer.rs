use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::info;

use healthchat_cli::{exit_code_for, init_tracing, load_settings, run_ingest, IngestOverrides};

/// Batch job: chunk, embed and persist the corpus index.
#[derive(Parser)]
#[command(name = "healthchat-indexer")]
struct Args {
    /// Corpus directory (defaults to data.corpus_dir)
    data_dir: Option<PathBuf>,
    /// Index directory (defaults to data.index_dir)
    #[arg(long)]
    index: Option<PathBuf>,
    #[arg(long, default_value = ".")]
    config_dir: PathBuf,
    #[arg(long, env = "RUST_ENV", default_value = "dev")]
    env: String,
    /// Use the hashing embedder instead of the local model
    #[arg(long)]
    fake: bool,
    /// Hide the progress bar
    #[arg(long)]
    quiet: bool,
}

fn main() -> ExitCode {
    init_tracing();
    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => exit_code_for(&e),
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let mut settings = load_settings(&args.config_dir, &args.env)?;
    if args.fake {
        settings.embedder.use_fake = true;
    }
    let overrides = IngestOverrides {
        corpus: args.data_dir,
        index: args.index,
        show_progress: !args.quiet,
        ..IngestOverrides::default()
    };
    let report = run_ingest(&settings, &overrides)?;
    info!(
        "Indexing completed: {} documents, {} chunks",
        report.documents_loaded, report.chunks_created
    );
    Ok(())
}
