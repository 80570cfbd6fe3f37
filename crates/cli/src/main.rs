use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use clauselens_core::ChunkConfig;
use clauselens_index::{load_snapshot, IndexLayout};
use clauselens_rag::{
    answer, AskResponse, ClauseLensConfig, EmbeddingClient, RawAskRequest, ServingContext,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod indexing;

#[derive(Parser, Debug)]
#[command(name = "clauselens", version, about = "Hybrid retrieval and extractive answers over clause documents")]
struct Cli {
    #[arg(long, global = true, env = "CLAUSELENS_CONFIG")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Chunk, embed and index every document in a directory.
    Ingest {
        #[arg(long = "data-dir", default_value = "data")]
        data_dir: PathBuf,
        #[arg(long = "out-dir")]
        out_dir: Option<PathBuf>,
        #[arg(long = "chunk-size")]
        chunk_size: Option<usize>,
        #[arg(long)]
        overlap: Option<usize>,
    },
    /// Answer a question against the configured index.
    Ask {
        query: String,
        #[arg(long)]
        mode: Option<String>,
        #[arg(long = "top-k")]
        top_k: Option<i64>,
        #[arg(long = "index-dir")]
        index_dir: Option<PathBuf>,
        #[arg(long, action = ArgAction::SetTrue)]
        json: bool,
    },
    /// Print the manifest and check artifact consistency.
    Inspect {
        #[arg(long = "index-dir")]
        index_dir: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = ClauseLensConfig::load(cli.config.as_deref()).context("failed to load config")?;

    match cli.command {
        Commands::Ingest {
            data_dir,
            out_dir,
            chunk_size,
            overlap,
        } => {
            let layout = IndexLayout::new(out_dir.unwrap_or_else(|| config.index.dir.clone()));
            let chunk_config = ChunkConfig {
                chunk_size: chunk_size.unwrap_or(config.index.chunk_size),
                overlap: overlap.unwrap_or(config.index.overlap),
            };
            let embedder = EmbeddingClient::from_config(
                &config.models.embedder,
                Duration::from_secs(config.models.timeout_secs),
            )?;
            let manifest = indexing::build_index(&data_dir, &layout, chunk_config, &embedder)?;
            info!(dir = %layout.dir().display(), "ingest complete");
            println!(
                "Indexed {} chunks from {} into {} (embedder {}, {} dims, fingerprint {})",
                manifest.chunk_count,
                data_dir.display(),
                layout.dir().display(),
                manifest.embedder,
                manifest.dimensions,
                &manifest.fingerprint[..12.min(manifest.fingerprint.len())]
            );
        }
        Commands::Ask {
            query,
            mode,
            top_k,
            index_dir,
            json,
        } => {
            let mut config = config;
            if let Some(dir) = index_dir {
                config.index.dir = dir;
            }
            let ctx = ServingContext::from_config(&config)?;
            let response = answer(&ctx, RawAskRequest { query, mode, top_k })?;
            if json {
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                print_response(&response);
            }
        }
        Commands::Inspect { index_dir } => {
            let layout = IndexLayout::new(index_dir.unwrap_or_else(|| config.index.dir.clone()));
            let manifest = layout.read_manifest()?;
            println!("{}", serde_json::to_string_pretty(&manifest)?);
            match load_snapshot(&layout) {
                Ok(snapshot) => println!(
                    "Artifacts consistent: {} chunks, {} dense rows, {} lexical documents",
                    snapshot.corpus.len(),
                    snapshot.dense.len(),
                    snapshot.lexical.len()
                ),
                Err(err) => println!("Artifacts inconsistent: {err}"),
            }
        }
    }
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn print_response(response: &AskResponse) {
    match response {
        AskResponse::Extractive { quotes, .. } => {
            for (idx, quote) in quotes.iter().enumerate() {
                println!("{}. \"{}\" (score {:.2})", idx + 1, quote.answer, quote.score);
                println!("   {}", quote.citation);
            }
        }
        AskResponse::Abstain {
            message,
            top_citations,
            ..
        } => {
            println!("{message}");
            if !top_citations.is_empty() {
                println!("\nClosest passages:");
                for citation in top_citations {
                    println!("  - {citation}");
                }
            }
        }
        AskResponse::Abstractive {
            note,
            top_citations,
            context_preview,
            ..
        } => {
            println!("{note}\n");
            println!("{context_preview}\n");
            println!("Sources:");
            for citation in top_citations {
                println!("  - {citation}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn ask_accepts_mode_and_top_k() {
        let cli = Cli::try_parse_from([
            "clauselens",
            "ask",
            "What is the bid security?",
            "--mode",
            "abstractive",
            "--top-k",
            "3",
            "--json",
        ])
        .unwrap();
        match cli.command {
            Commands::Ask {
                query,
                mode,
                top_k,
                json,
                ..
            } => {
                assert_eq!(query, "What is the bid security?");
                assert_eq!(mode.as_deref(), Some("abstractive"));
                assert_eq!(top_k, Some(3));
                assert!(json);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
