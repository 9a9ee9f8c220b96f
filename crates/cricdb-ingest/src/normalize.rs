//! Normalizer
//!
//! Rewrites every name-valued reference field on a raw record to a resolved
//! canonical id, strictly before the record reaches the store. Dependent
//! lookups (innings → match, delivery → innings) are strict existence
//! checks: the pass ordering guarantees the target row is already
//! committed, so a miss signals a data or ordering defect and fails that
//! one record hard, never creating a placeholder.

use cricdb_common::{IngestError, Result};

use crate::records::{RawDelivery, RawInnings, RawMatch, RawWicket};
use crate::resolver::EntityResolver;
use crate::store::{DeliveryRow, EntityKind, InningsRow, MatchRow, Store, WicketRow};

/// Resolve all reference names on a match record
///
/// Lazily creates any newly seen team, competition, player and umpire rows
/// as a side effect of resolution. Absent optional references stay unset.
pub async fn normalize_match(
    resolver: &mut EntityResolver<'_>,
    raw: &RawMatch,
) -> Result<MatchRow> {
    let record = format!("match {}", raw.match_id);

    let team_home = resolver
        .resolve_required(EntityKind::Team, &raw.team_home, &record)
        .await?;
    let team_away = resolver
        .resolve_required(EntityKind::Team, &raw.team_away, &record)
        .await?;

    Ok(MatchRow {
        id: raw.match_id,
        gender: raw.gender.clone(),
        match_type: raw.match_type.clone(),
        competition: resolver
            .resolve_opt(EntityKind::Competition, raw.competition.as_deref())
            .await?,
        max_overs: raw.max_overs,
        venue: raw.venue.clone(),
        city: raw.city.clone(),
        start_date: raw.start_date.clone(),
        end_date: raw.end_date.clone(),
        team_home,
        team_away,
        result: raw.result.clone(),
        method: raw.method.clone(),
        winner: resolver
            .resolve_opt(EntityKind::Team, raw.winner.as_deref())
            .await?,
        won_by_type: raw.won_by_type.clone(),
        won_by_value: raw.won_by_value,
        player_of_match: resolver
            .resolve_opt(EntityKind::Player, raw.player_of_match.as_deref())
            .await?,
        toss_won_by: resolver
            .resolve_opt(EntityKind::Team, raw.toss_won_by.as_deref())
            .await?,
        toss_decision: raw.toss_decision.clone(),
        umpire_first: resolver
            .resolve_opt(EntityKind::Umpire, raw.umpire_first.as_deref())
            .await?,
        umpire_second: resolver
            .resolve_opt(EntityKind::Umpire, raw.umpire_second.as_deref())
            .await?,
        umpire_third: resolver
            .resolve_opt(EntityKind::Umpire, raw.umpire_third.as_deref())
            .await?,
        umpire_fourth: resolver
            .resolve_opt(EntityKind::Umpire, raw.umpire_fourth.as_deref())
            .await?,
    })
}

/// Resolve an innings record against its committed match
///
/// Requires pass 1 to have committed the owning match; a missing match row
/// is a hard referential failure for this innings.
pub async fn normalize_innings(
    store: &dyn Store,
    resolver: &mut EntityResolver<'_>,
    raw: &RawInnings,
) -> Result<InningsRow> {
    let record = format!("innings {}/{}", raw.match_id, raw.innings_number);

    if !store.match_exists(raw.match_id).await.map_err(IngestError::from)? {
        return Err(IngestError::ReferentialLookup {
            target: "match",
            record,
        });
    }

    let batting_team = resolver
        .resolve_required(EntityKind::Team, &raw.batting_team, &record)
        .await?;

    Ok(InningsRow {
        match_id: raw.match_id,
        innings_number: raw.innings_number.clone(),
        batting_team,
        penalty_runs_pre: raw.penalty_runs_pre,
        penalty_runs_post: raw.penalty_runs_post,
        was_declared: raw.was_declared,
    })
}

/// Resolve a delivery record against its committed innings
///
/// Requires pass 2 to have committed all innings; a missing innings row
/// fails this single delivery, not the run.
pub async fn normalize_delivery(
    store: &dyn Store,
    resolver: &mut EntityResolver<'_>,
    raw: &RawDelivery,
) -> Result<DeliveryRow> {
    let record = raw.describe();

    let innings_id = store
        .find_innings(raw.match_id, &raw.innings_number)
        .await
        .map_err(IngestError::from)?
        .ok_or(IngestError::ReferentialLookup {
            target: "innings",
            record: record.clone(),
        })?;

    Ok(DeliveryRow {
        match_id: raw.match_id,
        innings_id,
        over_number: raw.over_number,
        ball_number: raw.ball_number,
        batsman: resolver
            .resolve_required(EntityKind::Player, &raw.batsman, &record)
            .await?,
        bowler: resolver
            .resolve_required(EntityKind::Player, &raw.bowler, &record)
            .await?,
        non_striker: resolver
            .resolve_required(EntityKind::Player, &raw.non_striker, &record)
            .await?,
        runs_batsman: raw.runs_batsman,
        runs_extras: raw.runs_extras,
        extras_type: raw.extras_type.clone(),
        runs_total: raw.runs_total,
        was_boundary: raw.was_boundary,
        has_wicket: raw.has_wicket,
    })
}

/// Map a wicket record to its row form
///
/// Wickets keep their player names as raw strings; nothing is resolved.
pub fn wicket_row(raw: &RawWicket) -> WicketRow {
    WicketRow {
        match_id: raw.match_id,
        innings_number: raw.innings_number.clone(),
        over_number: raw.over_number,
        ball_number: raw.ball_number,
        kind: raw.kind.clone(),
        player_out_name: raw.player_out_name.clone(),
        fielder_name: raw.fielder_name.clone(),
    }
}
