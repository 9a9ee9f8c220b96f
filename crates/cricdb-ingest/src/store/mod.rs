//! Storage backend interface
//!
//! The pipeline talks to its datastore exclusively through the [`Store`]
//! trait. Every operation owns its transaction scope internally: a call
//! either commits or rolls back before returning, and no session handle is
//! held across unrelated operations. Backends are selected by configuration
//! (`postgres` for production, `memory` for tests and dry runs).

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

use async_trait::async_trait;
use cricdb_common::IngestError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The four deduplicated lookup-entity kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Team,
    Competition,
    Player,
    Umpire,
}

impl EntityKind {
    /// Backing table name
    pub fn table(&self) -> &'static str {
        match self {
            EntityKind::Team => "teams",
            EntityKind::Competition => "competitions",
            EntityKind::Player => "players",
            EntityKind::Umpire => "umpires",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Team => "team",
            EntityKind::Competition => "competition",
            EntityKind::Player => "player",
            EntityKind::Umpire => "umpire",
        }
    }
}

/// Storage-level error
///
/// `UniqueViolation` is split out because the resolver treats it as a
/// retryable race (another writer inserted the same name first) while the
/// persister treats it as a per-record failure.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("foreign key violated: {0}")]
    ForeignKeyViolation(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<StoreError> for IngestError {
    fn from(err: StoreError) -> Self {
        IngestError::Store(err.to_string())
    }
}

/// Normalized match row, ready for the `matches` table
///
/// Reference fields hold resolved ids; `id` is the source match id parsed
/// from the filename stem.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MatchRow {
    pub id: i64,
    pub gender: String,
    pub match_type: String,
    pub competition: Option<i64>,
    pub max_overs: Option<i64>,
    pub venue: Option<String>,
    pub city: Option<String>,
    pub start_date: String,
    pub end_date: String,
    pub team_home: i64,
    pub team_away: i64,
    pub result: String,
    pub method: Option<String>,
    pub winner: Option<i64>,
    pub won_by_type: Option<String>,
    pub won_by_value: Option<i64>,
    pub player_of_match: Option<i64>,
    pub toss_won_by: Option<i64>,
    pub toss_decision: Option<String>,
    pub umpire_first: Option<i64>,
    pub umpire_second: Option<i64>,
    pub umpire_third: Option<i64>,
    pub umpire_fourth: Option<i64>,
}

/// Scoresheet row, primary-keyed by its match
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ScoresheetRow {
    pub match_id: i64,
    pub data_version: Option<String>,
    pub date_created: Option<String>,
    pub revision: Option<i64>,
}

/// Normalized innings row; `id` is assigned by the store on insert
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct InningsRow {
    pub match_id: i64,
    pub innings_number: String,
    pub batting_team: i64,
    pub penalty_runs_pre: Option<i64>,
    pub penalty_runs_post: Option<i64>,
    pub was_declared: bool,
}

/// Normalized delivery row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DeliveryRow {
    pub match_id: i64,
    pub innings_id: i64,
    pub over_number: i64,
    pub ball_number: i64,
    pub batsman: i64,
    pub bowler: i64,
    pub non_striker: i64,
    pub runs_batsman: i64,
    pub runs_extras: i64,
    pub extras_type: Option<String>,
    pub runs_total: i64,
    pub was_boundary: bool,
    pub has_wicket: bool,
}

/// Wicket row; player fields are raw names by design
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct WicketRow {
    pub match_id: i64,
    pub innings_number: String,
    pub over_number: i64,
    pub ball_number: i64,
    pub kind: String,
    pub player_out_name: String,
    pub fielder_name: Option<String>,
}

/// Transactional row store for the ingestion pipeline
///
/// Bulk inserts (`insert_matches`, `insert_innings`) run as one transaction
/// per call. `insert_delivery` is one transaction per delivery, carrying the
/// delivery's wickets so that a rollback removes both.
#[async_trait]
pub trait Store: Send + Sync {
    /// Look up a lookup-entity row by exact name
    async fn find_entity(&self, kind: EntityKind, name: &str) -> Result<Option<i64>, StoreError>;

    /// Insert a new lookup-entity row, returning its assigned id
    ///
    /// Returns [`StoreError::UniqueViolation`] if the name already exists;
    /// callers resolve the race by re-reading.
    async fn insert_entity(&self, kind: EntityKind, name: &str) -> Result<i64, StoreError>;

    /// Bulk-insert matches and their scoresheets in one transaction
    async fn insert_matches(
        &self,
        matches: &[MatchRow],
        scoresheets: &[ScoresheetRow],
    ) -> Result<(), StoreError>;

    /// Whether a match row with this id has been committed
    async fn match_exists(&self, match_id: i64) -> Result<bool, StoreError>;

    /// Bulk-insert innings in one transaction
    async fn insert_innings(&self, rows: &[InningsRow]) -> Result<(), StoreError>;

    /// Look up an innings id by its `(match, innings_number)` unique key
    async fn find_innings(
        &self,
        match_id: i64,
        innings_number: &str,
    ) -> Result<Option<i64>, StoreError>;

    /// Insert one delivery and its wickets in a single dedicated transaction
    async fn insert_delivery(
        &self,
        delivery: &DeliveryRow,
        wickets: &[WicketRow],
    ) -> Result<(), StoreError>;
}
