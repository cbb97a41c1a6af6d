//! # docqa CLI
//!
//! ```bash
//! docqa --config ./config/docqa.toml <command>
//! ```
//!
//! | Command | Description |
//! |---------|-------------|
//! | `docqa init` | Create the SQLite database and schema |
//! | `docqa chunk <file>` | Extract and chunk a file, print the chunks |
//! | `docqa ingest <path>` | Ingest a PDF/text file or a directory of them |
//! | `docqa ask "<question>"` | Answer a question from ingested documents |
//! | `docqa run <file> "<question>"` | Ingest if needed, then answer from that file |
//! | `docqa stats` | Document, chunk, and vector counts |
//! | `docqa serve` | Start the HTTP server |

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use docqa::credentials::Credentials;
use docqa::logging::{init_tracing, LogConfig};
use docqa::{ask, config, ingest, migrate, server, stats};

/// Ask questions about your PDFs.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/docqa.example.toml` for a full example.
#[derive(Parser)]
#[command(name = "docqa", version, about = "Ask questions about your PDFs")]
struct Cli {
    /// Path to configuration file.
    #[arg(long, default_value = "./config/docqa.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database (creates the file and tables; idempotent).
    Init,

    /// Extract a file and print its chunks without storing anything.
    Chunk {
        /// A `.pdf` or `.txt` file.
        file: PathBuf,

        /// Override `[chunking].target_size`.
        #[arg(long)]
        target_size: Option<usize>,

        /// Override `[chunking].overlap_size`.
        #[arg(long)]
        overlap_size: Option<usize>,
    },

    /// Ingest a file, or every `.pdf`/`.txt` file under a directory.
    ///
    /// Files whose name is already stored are skipped unless `--force`.
    Ingest {
        path: PathBuf,

        /// Re-ingest documents that were already processed.
        #[arg(long)]
        force: bool,

        /// Report chunk counts without embedding or writing.
        #[arg(long)]
        dry_run: bool,

        /// Override `[embedding].batch_size`.
        #[arg(long)]
        batch_size: Option<usize>,
    },

    /// Answer a question from the ingested documents.
    Ask {
        question: String,

        /// Number of chunks to retrieve.
        #[arg(long)]
        top_k: Option<usize>,

        /// Only retrieve from this document (its file name).
        #[arg(long)]
        source: Option<String>,
    },

    /// Ingest a file if it hasn't been processed, then answer a question
    /// from it.
    Run {
        file: PathBuf,
        question: String,
    },

    /// Show what's indexed.
    Stats,

    /// Start the HTTP server on `[server].bind`.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(LogConfig::default());

    let cfg = config::load_config(&cli.config)?;
    let creds = Credentials::from_env();

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Chunk {
            file,
            target_size,
            overlap_size,
        } => {
            ingest::run_chunk(&cfg, &creds, &file, target_size, overlap_size).await?;
        }
        Commands::Ingest {
            path,
            force,
            dry_run,
            batch_size,
        } => {
            ingest::run_ingest(&cfg, &creds, &path, force, dry_run, batch_size).await?;
        }
        Commands::Ask {
            question,
            top_k,
            source,
        } => {
            ask::run_ask(&cfg, &creds, &question, top_k, source).await?;
        }
        Commands::Run { file, question } => {
            ask::run_workflow(&cfg, &creds, &file, &question).await?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg, &creds).await?;
        }
    }

    Ok(())
}
