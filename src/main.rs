//! # docqa CLI
//!
//! ```bash
//! docqa --config ./config/docqa.toml <command>
//! ```
//!
//! | Command | Description |
//! |---------|-------------|
//! | `docqa serve` | Start the HTTP API |
//! | `docqa upload <file>` | Store a PDF and print its document id |
//! | `docqa extract <id>` | Extract text from the stored PDF |
//! | `docqa summarize <id>` | Summarize the extracted text |
//! | `docqa index <id>` | Build the vector index |
//! | `docqa ask <id> "<question>"` | Answer a question from the index |
//! | `docqa status <id>` | Show which artifacts exist |

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use docqa::config;
use docqa::logging;
use docqa::server;
use docqa::service::DocService;
use docqa_core::models::{DocumentId, RagConfig};

/// Ask questions about PDF documents.
#[derive(Parser)]
#[command(
    name = "docqa",
    about = "docqa: PDF question answering with retrieval-augmented generation",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/docqa.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server on `[server].bind`.
    Serve,

    /// Store a PDF and print its new document id.
    Upload {
        file: PathBuf,
    },

    /// Extract text from an uploaded PDF.
    Extract {
        id: String,
        /// Pages to read from the start (1-200). Defaults to `[extract].default_max_pages`.
        #[arg(long)]
        max_pages: Option<usize>,
    },

    /// Map-reduce summary of the extracted text.
    Summarize {
        id: String,
    },

    /// Chunk, embed and index the extracted text. Replaces any previous index.
    Index {
        id: String,
        #[arg(long)]
        chunk_size: Option<usize>,
        #[arg(long)]
        chunk_overlap: Option<usize>,
        #[arg(long)]
        max_chunks: Option<usize>,
    },

    /// Answer a question from the document's index.
    Ask {
        id: String,
        question: String,
        /// Passages to retrieve (1-10).
        #[arg(long)]
        top_k: Option<usize>,
    },

    /// Show which artifacts exist for a document.
    Status {
        id: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cfg = config::load_config(&cli.config)?;
    logging::init_with_config(&cfg.logging);

    if let Commands::Serve = cli.command {
        return server::run_server(&cfg).await;
    }

    let service = DocService::from_config(&cfg)?;

    match cli.command {
        Commands::Serve => {}
        Commands::Upload { file } => {
            let bytes = tokio::fs::read(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let filename = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned());
            let outcome = service.upload(filename, &bytes).await?;
            println!("{}", outcome.document_id);
        }
        Commands::Extract { id, max_pages } => {
            let id = DocumentId::parse(&id)?;
            let max_pages = max_pages.unwrap_or_else(|| service.default_max_pages());
            let outcome = service.extract(&id, max_pages).await?;
            println!(
                "Extracted {} chars from {} page(s).",
                outcome.text_length, outcome.pages_processed
            );
            if let Some(message) = outcome.message {
                println!("{}", message);
            } else {
                println!("\n{}", outcome.preview);
            }
        }
        Commands::Summarize { id } => {
            let id = DocumentId::parse(&id)?;
            let outcome = service.summarize(&id).await?;
            println!("{}", outcome.summary);
            println!(
                "\n({} chunk(s) of up to {} chars{})",
                outcome.chunks_used,
                outcome.chunk_size,
                if outcome.truncated { ", truncated" } else { "" }
            );
        }
        Commands::Index {
            id,
            chunk_size,
            chunk_overlap,
            max_chunks,
        } => {
            let id = DocumentId::parse(&id)?;
            let defaults = service.default_rag_config();
            let rag = RagConfig {
                chunk_size: chunk_size.unwrap_or(defaults.chunk_size),
                chunk_overlap: chunk_overlap.unwrap_or(defaults.chunk_overlap),
                max_chunks: max_chunks.unwrap_or(defaults.max_chunks),
            };
            let outcome = service.build_index(&id, Some(rag)).await?;
            println!(
                "Indexed {} chunk(s) with {} ({} dims){}.",
                outcome.chunks_indexed,
                outcome.embedding_model,
                outcome.dims,
                if outcome.truncated {
                    "; text was truncated at max_chunks"
                } else {
                    ""
                }
            );
        }
        Commands::Ask {
            id,
            question,
            top_k,
        } => {
            let id = DocumentId::parse(&id)?;
            let top_k = top_k.unwrap_or_else(|| service.default_top_k());
            let outcome = service.ask(&id, &question, top_k).await?;
            println!("{}", outcome.answer);
            if !outcome.sources.is_empty() {
                println!("\nSources:");
                for source in &outcome.sources {
                    println!(
                        "  [chunk {}] distance={:.4}  {}",
                        source.chunk_id,
                        source.distance_score,
                        source.preview.replace('\n', " ")
                    );
                }
            }
        }
        Commands::Status { id } => {
            let id = DocumentId::parse(&id)?;
            let status = service.status(&id).await?;
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
    }

    Ok(())
}
