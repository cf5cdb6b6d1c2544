//! Command-line interface for the drug search retrieval engine.
//!
//! Thin wrapper over `drugsearch_core::SearchService`: parses arguments with
//! clap, builds the configured providers, and prints the response as JSON.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::error;
use tracing_subscriber::EnvFilter;

use drugsearch_core::embeddings::HttpEmbeddingClient;
use drugsearch_core::llm::HttpLlmClient;
use drugsearch_core::store::SqliteIndexStore;
use drugsearch_core::{Config, QueryFilters, SearchService};

#[derive(Parser)]
#[command(name = "drugsearch")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Hybrid retrieval and ranking over an NDC drug corpus")]
struct Cli {
    /// Path to the SQLite index store.
    #[arg(long, default_value = "drugsearch.db")]
    db: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Free-text drug search.
    Search {
        query: String,
        #[arg(long)]
        max_results: Option<usize>,
        #[arg(long)]
        is_generic: Option<bool>,
        #[arg(long)]
        dosage_form: Option<String>,
    },
    /// Look up a single document by NDC.
    Drug { ndc: String },
    /// Therapeutic equivalents and class alternatives for an NDC.
    Alternatives { ndc: String },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();

    let store = match SqliteIndexStore::open(cli.db.clone(), config.embedding.dim) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("{} failed to open index store at {}: {e}", "error:".red().bold(), cli.db.display());
            return ExitCode::FAILURE;
        }
    };
    let llm = HttpLlmClient::new(config.llm.clone());
    let embeddings = HttpEmbeddingClient::new(config.embedding.clone());
    let service = SearchService::new(&llm, &embeddings, &store, config);

    let result = match cli.command {
        Commands::Search {
            query,
            max_results,
            is_generic,
            dosage_form,
        } => {
            let filters = QueryFilters {
                is_generic,
                dosage_form,
                ..Default::default()
            };
            let filters = if filters.is_empty() { None } else { Some(filters) };
            service
                .search(&query, max_results, filters)
                .await
                .and_then(|r| serde_json::to_string_pretty(&r).map_err(|e| drugsearch_core::Error::internal(e.to_string())))
        }
        Commands::Drug { ndc } => service
            .drug(&ndc)
            .and_then(|r| serde_json::to_string_pretty(&r).map_err(|e| drugsearch_core::Error::internal(e.to_string()))),
        Commands::Alternatives { ndc } => service
            .alternatives(&ndc)
            .and_then(|r| serde_json::to_string_pretty(&r).map_err(|e| drugsearch_core::Error::internal(e.to_string()))),
    };

    match result {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(code = e.code(), "{e}");
            eprintln!("{} [{}] {e}", "error:".red().bold(), e.code());
            ExitCode::FAILURE
        }
    }
}
