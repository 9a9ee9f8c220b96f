//! Configuration for the ingest binary
//!
//! Backend selection happens here: the pipeline core only ever sees the
//! `Store` trait, so swapping Postgres for the in-memory backend is a
//! configuration change, not a code path.

use cricdb_common::{IngestError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default source directory when nothing is configured.
pub const DEFAULT_DATA_DIR: &str = "data";

/// Storage backend selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Postgres,
    /// Ephemeral in-memory store, for tests and dry runs
    Memory,
}

impl std::str::FromStr for StoreBackend {
    type Err = IngestError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            "memory" | "mem" => Ok(StoreBackend::Memory),
            other => Err(IngestError::config(format!("unknown backend: {}", other))),
        }
    }
}

/// Ingest configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Which storage backend to write to
    pub backend: StoreBackend,

    /// Postgres connection string; required for the postgres backend
    pub database_url: Option<String>,

    /// Directory of per-match source files
    pub data_dir: PathBuf,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Postgres,
            database_url: None,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
        }
    }
}

impl IngestConfig {
    /// Load configuration from environment variables
    ///
    /// - `CRICDB_BACKEND`: postgres (default) or memory
    /// - `DATABASE_URL`: Postgres connection string
    /// - `CRICDB_DATA_DIR`: source directory
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(backend) = std::env::var("CRICDB_BACKEND") {
            config.backend = backend.parse()?;
        }

        if let Ok(url) = std::env::var("DATABASE_URL") {
            config.database_url = Some(url);
        }

        if let Ok(dir) = std::env::var("CRICDB_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }

        Ok(config)
    }

    /// The connection string, or a config error for the postgres backend
    pub fn require_database_url(&self) -> Result<&str> {
        self.database_url
            .as_deref()
            .ok_or_else(|| IngestError::config("DATABASE_URL is not set"))
    }
}
