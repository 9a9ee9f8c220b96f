//! CricDB Ingest Library
//!
//! Pipeline for ingesting per-match cricket scoresheet files into a
//! relational store with deduplicated lookup entities.
//!
//! Data flows reader → normalizer (via the entity resolver) → persister:
//! the reader turns each source file into a flat sequence of typed raw
//! records, the normalizer rewrites name references to canonical ids, and
//! the persister commits three dependency-ordered passes (matches, innings,
//! deliveries) with per-record failure isolation.
//!
//! # Example
//!
//! ```no_run
//! use cricdb_ingest::store::MemoryStore;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = MemoryStore::new();
//!     let report = cricdb_ingest::ingest_directory(&store, "data".as_ref()).await?;
//!     assert!(report.is_clean());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod normalize;
pub mod persist;
pub mod reader;
pub mod records;
pub mod report;
pub mod resolver;
pub mod store;

use std::path::Path;

use cricdb_common::Result;

use crate::persist::Persister;
use crate::report::IngestReport;
use crate::store::Store;

/// Run one full ingestion over a directory of source files
///
/// Fails only if the directory itself cannot be enumerated; everything else
/// is reported per file or per record in the returned [`IngestReport`].
pub async fn ingest_directory(store: &dyn Store, dir: &Path) -> Result<IngestReport> {
    let (records, failures) = reader::read_directory(dir)?;
    Ok(Persister::new(store).persist(records, failures).await)
}

/// Ingest a single source file
pub async fn ingest_file(store: &dyn Store, path: &Path) -> Result<IngestReport> {
    let records = reader::read_file(path)?;
    Ok(Persister::new(store).persist(records, Vec::new()).await)
}
