use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use healthchat_cli::{build_embedder, exit_code_for, init_tracing, load_settings, run_ingest, IngestOverrides};
use healthchat_core::config::Settings;
use healthchat_core::types::ChatRequest;
use healthchat_rag::AppContext;
use healthchat_recommend::{match_recommendations, KeywordMap};

#[derive(Parser)]
#[command(name = "healthchat", about = "Health guideline chat over a local document index")]
struct Cli {
    /// Directory holding config.toml and config.<env>.toml
    #[arg(long, default_value = ".")]
    config_dir: PathBuf,

    /// Configuration environment (dev, prod, test)
    #[arg(long, env = "RUST_ENV", default_value = "dev")]
    env: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the vector index from a corpus directory
    Ingest {
        /// Corpus directory (defaults to data.corpus_dir)
        corpus: Option<PathBuf>,
        /// Index directory (defaults to data.index_dir)
        #[arg(long)]
        index: Option<PathBuf>,
        #[arg(long)]
        chunk_size: Option<usize>,
        #[arg(long)]
        overlap: Option<usize>,
    },
    /// Print the passages retrieved for a query
    Query {
        text: String,
        /// Number of passages (defaults to retrieval.top_k)
        #[arg(short, long)]
        k: Option<usize>,
    },
    /// Answer a message and print the chat response as JSON
    Chat { message: String },
    /// Print product recommendations for a message as JSON
    Recommend { text: String },
    /// Print retriever health as JSON
    Status,
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => exit_code_for(&e),
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let settings = load_settings(&cli.config_dir, &cli.env)?;
    match cli.command {
        Commands::Ingest { corpus, index, chunk_size, overlap } => {
            let overrides = IngestOverrides { corpus, index, chunk_size, overlap, show_progress: true };
            let report = run_ingest(&settings, &overrides)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Query { text, k } => {
            let ctx = context(settings)?;
            let k = k.unwrap_or(ctx.settings().retrieval.top_k);
            let result = ctx.retriever().retrieve(&text, k)?;
            for (rank, hit) in result.hits.iter().enumerate() {
                println!("{}. [{:.4}] {} ({})", rank + 1, hit.score, hit.meta.source, hit.id);
                println!("   {}", hit.content.replace('\n', " "));
            }
            if result.is_empty() {
                println!("No passages found.");
            }
        }
        Commands::Chat { message } => {
            let ctx = context(settings)?;
            let response = ctx.chat().handle_chat(&ChatRequest::new(message))?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Commands::Recommend { text } => {
            let keywords = KeywordMap::load(&settings.data.keyword_map_path())?;
            let recommendations = match_recommendations(&text, &keywords);
            println!("{}", serde_json::to_string_pretty(&recommendations)?);
        }
        Commands::Status => {
            let ctx = context(settings)?;
            println!("{}", serde_json::to_string_pretty(&ctx.health())?);
        }
    }
    Ok(())
}

fn context(settings: Settings) -> anyhow::Result<AppContext> {
    let embedder = build_embedder(&settings)?;
    Ok(AppContext::bootstrap(settings, embedder)?)
}
