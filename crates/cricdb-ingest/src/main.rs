//! CricDB Ingest - scoresheet ingestion tool

use anyhow::Result;
use clap::Parser;
use cricdb_common::logging::{init_logging, LogConfig, LogLevel};
use cricdb_ingest::config::{IngestConfig, StoreBackend};
use cricdb_ingest::store::{MemoryStore, PostgresStore};
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "cricdb-ingest")]
#[command(author, version, about = "Cricket scoresheet ingestion tool")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Parser, Debug)]
enum Command {
    /// Ingest a directory of per-match scoresheet files
    Ingest {
        /// Source directory
        #[arg(short, long)]
        data_dir: Option<PathBuf>,

        /// Storage backend (postgres or memory)
        #[arg(short, long)]
        backend: Option<StoreBackendArg>,
    },

    /// Create the database schema if it does not exist
    InitSchema,
}

#[derive(Debug, Clone, Copy)]
struct StoreBackendArg(StoreBackend);

impl std::str::FromStr for StoreBackendArg {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        s.parse::<StoreBackend>()
            .map(StoreBackendArg)
            .map_err(|e| e.to_string())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let mut log_config = LogConfig::from_env().unwrap_or_default();
    if cli.verbose {
        log_config.level = LogLevel::Debug;
    }
    log_config.log_file_prefix = "cricdb-ingest".to_string();
    init_logging(&log_config)?;

    let mut config = IngestConfig::from_env()?;

    match cli.command {
        Command::Ingest { data_dir, backend } => {
            if let Some(dir) = data_dir {
                config.data_dir = dir;
            }
            if let Some(StoreBackendArg(backend)) = backend {
                config.backend = backend;
            }

            info!(data_dir = %config.data_dir.display(), backend = ?config.backend, "starting ingestion");

            let report = match config.backend {
                StoreBackend::Postgres => {
                    let store = PostgresStore::connect(config.require_database_url()?).await?;
                    store.ensure_schema().await?;
                    cricdb_ingest::ingest_directory(&store, &config.data_dir).await?
                },
                StoreBackend::Memory => {
                    let store = MemoryStore::new();
                    let report = cricdb_ingest::ingest_directory(&store, &config.data_dir).await?;
                    warn!("memory backend: ingested rows are discarded at exit");
                    report
                },
            };

            info!(report = %serde_json::to_string_pretty(&report)?, "run report");
            if !report.is_clean() {
                warn!(failures = report.failures.len(), "run completed with failures");
            }
        },
        Command::InitSchema => {
            let store = PostgresStore::connect(config.require_database_url()?).await?;
            store.ensure_schema().await?;
            info!("schema created");
        },
    }

    Ok(())
}
