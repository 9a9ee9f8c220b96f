//! Postgres storage backend
//!
//! Runtime-bound sqlx queries against a connection pool. Each trait method
//! opens and commits its own transaction; dropping an uncommitted
//! transaction on an error path rolls it back.

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

use super::{
    DeliveryRow, EntityKind, InningsRow, MatchRow, ScoresheetRow, Store, StoreError, WicketRow,
};

/// Idempotent schema DDL, applied by `ensure_schema`
///
/// `wickets` intentionally carries no foreign key on its player name columns:
/// a fielder may never appear as a resolved player row.
const SCHEMA_DDL: &str = r#"
CREATE TABLE IF NOT EXISTS teams (
    id BIGSERIAL PRIMARY KEY,
    name TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS competitions (
    id BIGSERIAL PRIMARY KEY,
    name TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS players (
    id BIGSERIAL PRIMARY KEY,
    name TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS umpires (
    id BIGSERIAL PRIMARY KEY,
    name TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS matches (
    id BIGINT PRIMARY KEY,
    gender TEXT NOT NULL,
    match_type TEXT NOT NULL,
    competition BIGINT REFERENCES competitions(id),
    max_overs BIGINT,
    venue TEXT,
    city TEXT,
    start_date TEXT NOT NULL,
    end_date TEXT NOT NULL,
    team_home BIGINT NOT NULL REFERENCES teams(id),
    team_away BIGINT NOT NULL REFERENCES teams(id),
    result TEXT NOT NULL,
    method TEXT,
    winner BIGINT REFERENCES teams(id),
    won_by_type TEXT,
    won_by_value BIGINT,
    player_of_match BIGINT REFERENCES players(id),
    toss_won_by BIGINT REFERENCES teams(id),
    toss_decision TEXT,
    umpire_first BIGINT REFERENCES umpires(id),
    umpire_second BIGINT REFERENCES umpires(id),
    umpire_third BIGINT REFERENCES umpires(id),
    umpire_fourth BIGINT REFERENCES umpires(id)
);

CREATE TABLE IF NOT EXISTS scoresheets (
    match_id BIGINT PRIMARY KEY REFERENCES matches(id),
    data_version TEXT,
    date_created TEXT,
    revision BIGINT
);

CREATE TABLE IF NOT EXISTS innings (
    id BIGSERIAL PRIMARY KEY,
    match_id BIGINT NOT NULL REFERENCES matches(id),
    innings_number TEXT NOT NULL,
    batting_team BIGINT NOT NULL REFERENCES teams(id),
    penalty_runs_pre BIGINT,
    penalty_runs_post BIGINT,
    was_declared BOOLEAN NOT NULL DEFAULT FALSE,
    UNIQUE (match_id, innings_number)
);

CREATE TABLE IF NOT EXISTS deliveries (
    id BIGSERIAL PRIMARY KEY,
    match_id BIGINT NOT NULL REFERENCES matches(id),
    innings_id BIGINT NOT NULL REFERENCES innings(id),
    over_number BIGINT NOT NULL,
    ball_number BIGINT NOT NULL,
    batsman BIGINT NOT NULL REFERENCES players(id),
    bowler BIGINT NOT NULL REFERENCES players(id),
    non_striker BIGINT NOT NULL REFERENCES players(id),
    runs_batsman BIGINT NOT NULL,
    runs_extras BIGINT NOT NULL,
    extras_type TEXT,
    runs_total BIGINT NOT NULL,
    was_boundary BOOLEAN NOT NULL DEFAULT FALSE,
    has_wicket BOOLEAN NOT NULL DEFAULT FALSE,
    UNIQUE (match_id, innings_id, over_number, ball_number)
);

CREATE TABLE IF NOT EXISTS wickets (
    id BIGSERIAL PRIMARY KEY,
    match_id BIGINT NOT NULL,
    innings_number TEXT NOT NULL,
    over_number BIGINT NOT NULL,
    ball_number BIGINT NOT NULL,
    kind TEXT NOT NULL,
    player_out_name TEXT NOT NULL,
    fielder_name TEXT
);
"#;

/// Postgres-backed [`Store`]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Connect to the database at `database_url`
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create all tables if they do not exist yet
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        for statement in SCHEMA_DDL.split(';').filter(|s| !s.trim().is_empty()) {
            sqlx::query(statement).execute(&mut *tx).await?;
        }
        tx.commit().await?;
        info!("schema ensured");
        Ok(())
    }
}

/// Map Postgres constraint SQLSTATEs (23505, 23503) onto their own variants
fn map_sqlx_err(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(ref db) = err {
        match db.code().as_deref() {
            Some("23505") => return StoreError::UniqueViolation(db.message().to_string()),
            Some("23503") => return StoreError::ForeignKeyViolation(db.message().to_string()),
            _ => {},
        }
    }
    StoreError::Database(err)
}

#[async_trait]
impl Store for PostgresStore {
    async fn find_entity(&self, kind: EntityKind, name: &str) -> Result<Option<i64>, StoreError> {
        let sql = format!("SELECT id FROM {} WHERE name = $1", kind.table());
        let id = sqlx::query_scalar::<_, i64>(&sql)
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(id)
    }

    async fn insert_entity(&self, kind: EntityKind, name: &str) -> Result<i64, StoreError> {
        let sql = format!("INSERT INTO {} (name) VALUES ($1) RETURNING id", kind.table());
        let id = sqlx::query_scalar::<_, i64>(&sql)
            .bind(name)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_err)?;
        Ok(id)
    }

    async fn insert_matches(
        &self,
        matches: &[MatchRow],
        scoresheets: &[ScoresheetRow],
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        for m in matches {
            sqlx::query(
                r#"
                INSERT INTO matches (
                    id, gender, match_type, competition, max_overs, venue, city,
                    start_date, end_date, team_home, team_away, result, method,
                    winner, won_by_type, won_by_value, player_of_match,
                    toss_won_by, toss_decision,
                    umpire_first, umpire_second, umpire_third, umpire_fourth
                ) VALUES (
                    $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13,
                    $14, $15, $16, $17, $18, $19, $20, $21, $22, $23
                )
                "#,
            )
            .bind(m.id)
            .bind(&m.gender)
            .bind(&m.match_type)
            .bind(m.competition)
            .bind(m.max_overs)
            .bind(&m.venue)
            .bind(&m.city)
            .bind(&m.start_date)
            .bind(&m.end_date)
            .bind(m.team_home)
            .bind(m.team_away)
            .bind(&m.result)
            .bind(&m.method)
            .bind(m.winner)
            .bind(&m.won_by_type)
            .bind(m.won_by_value)
            .bind(m.player_of_match)
            .bind(m.toss_won_by)
            .bind(&m.toss_decision)
            .bind(m.umpire_first)
            .bind(m.umpire_second)
            .bind(m.umpire_third)
            .bind(m.umpire_fourth)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_err)?;
        }

        for s in scoresheets {
            sqlx::query(
                r#"
                INSERT INTO scoresheets (match_id, data_version, date_created, revision)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(s.match_id)
            .bind(&s.data_version)
            .bind(&s.date_created)
            .bind(s.revision)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_err)?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn match_exists(&self, match_id: i64) -> Result<bool, StoreError> {
        let found = sqlx::query_scalar::<_, i64>("SELECT id FROM matches WHERE id = $1")
            .bind(match_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(found.is_some())
    }

    async fn insert_innings(&self, rows: &[InningsRow]) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        for row in rows {
            sqlx::query(
                r#"
                INSERT INTO innings (
                    match_id, innings_number, batting_team,
                    penalty_runs_pre, penalty_runs_post, was_declared
                ) VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(row.match_id)
            .bind(&row.innings_number)
            .bind(row.batting_team)
            .bind(row.penalty_runs_pre)
            .bind(row.penalty_runs_post)
            .bind(row.was_declared)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_err)?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn find_innings(
        &self,
        match_id: i64,
        innings_number: &str,
    ) -> Result<Option<i64>, StoreError> {
        let id = sqlx::query_scalar::<_, i64>(
            "SELECT id FROM innings WHERE match_id = $1 AND innings_number = $2",
        )
        .bind(match_id)
        .bind(innings_number)
        .fetch_optional(&self.pool)
        .await?;
        Ok(id)
    }

    async fn insert_delivery(
        &self,
        delivery: &DeliveryRow,
        wickets: &[WicketRow],
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO deliveries (
                match_id, innings_id, over_number, ball_number,
                batsman, bowler, non_striker,
                runs_batsman, runs_extras, extras_type, runs_total,
                was_boundary, has_wicket
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(delivery.match_id)
        .bind(delivery.innings_id)
        .bind(delivery.over_number)
        .bind(delivery.ball_number)
        .bind(delivery.batsman)
        .bind(delivery.bowler)
        .bind(delivery.non_striker)
        .bind(delivery.runs_batsman)
        .bind(delivery.runs_extras)
        .bind(&delivery.extras_type)
        .bind(delivery.runs_total)
        .bind(delivery.was_boundary)
        .bind(delivery.has_wicket)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_err)?;

        for w in wickets {
            sqlx::query(
                r#"
                INSERT INTO wickets (
                    match_id, innings_number, over_number, ball_number,
                    kind, player_out_name, fielder_name
                ) VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(w.match_id)
            .bind(&w.innings_number)
            .bind(w.over_number)
            .bind(w.ball_number)
            .bind(&w.kind)
            .bind(&w.player_out_name)
            .bind(&w.fielder_name)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_err)?;
        }

        tx.commit().await?;
        Ok(())
    }
}
