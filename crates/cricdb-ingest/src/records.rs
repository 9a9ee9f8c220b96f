//! Raw record types produced by the source reader
//!
//! One source file yields an ordered sequence of `RawRecord` values: one
//! match, one scoresheet, then innings, deliveries and wickets in document
//! order. Reference fields still hold the source's name strings at this
//! stage; the normalizer rewrites them to resolved ids before persistence.

use serde::{Deserialize, Serialize};

/// Tagged union over the five record kinds emitted by the reader
///
/// The persister's three passes filter this collection by variant, so
/// dependency ordering is a property of the pass loop, not of the reader.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RawRecord {
    Match(RawMatch),
    Scoresheet(RawScoresheet),
    Innings(RawInnings),
    Delivery(RawDelivery),
    Wicket(RawWicket),
}

impl RawRecord {
    /// Record kind name for logs and failure reports
    pub fn kind(&self) -> RecordKind {
        match self {
            RawRecord::Match(_) => RecordKind::Match,
            RawRecord::Scoresheet(_) => RecordKind::Scoresheet,
            RawRecord::Innings(_) => RecordKind::Innings,
            RawRecord::Delivery(_) => RecordKind::Delivery,
            RawRecord::Wicket(_) => RecordKind::Wicket,
        }
    }
}

/// Record kind tag used in the run report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    SourceFile,
    Match,
    Scoresheet,
    Innings,
    Delivery,
    Wicket,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::SourceFile => "source_file",
            RecordKind::Match => "match",
            RecordKind::Scoresheet => "scoresheet",
            RecordKind::Innings => "innings",
            RecordKind::Delivery => "delivery",
            RecordKind::Wicket => "wicket",
        }
    }
}

/// One match parsed from a file's `info` block
///
/// `match_id` comes from the filename stem and becomes the `matches.id`
/// primary key. Team/player/umpire/competition fields are source names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawMatch {
    pub match_id: i64,
    pub gender: String,
    pub match_type: String,
    pub competition: Option<String>,
    pub max_overs: Option<i64>,
    pub venue: Option<String>,
    pub city: Option<String>,
    pub start_date: String,
    pub end_date: String,
    pub team_home: String,
    pub team_away: String,
    pub result: String,
    pub method: Option<String>,
    pub winner: Option<String>,
    pub won_by_type: Option<String>,
    pub won_by_value: Option<i64>,
    pub player_of_match: Option<String>,
    pub toss_won_by: Option<String>,
    pub toss_decision: Option<String>,
    pub umpire_first: Option<String>,
    pub umpire_second: Option<String>,
    pub umpire_third: Option<String>,
    pub umpire_fourth: Option<String>,
}

/// Provenance metadata from a file's `meta` block, one-to-one with the match
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawScoresheet {
    pub match_id: i64,
    pub data_version: Option<String>,
    pub date_created: Option<String>,
    pub revision: Option<i64>,
}

/// One innings block, tagged with its match-scoped label
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawInnings {
    pub match_id: i64,
    pub innings_number: String,
    pub batting_team: String,
    pub penalty_runs_pre: Option<i64>,
    pub penalty_runs_post: Option<i64>,
    pub was_declared: bool,
}

/// One delivery, keyed by `(over_number, ball_number)` within its innings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawDelivery {
    pub match_id: i64,
    pub innings_number: String,
    pub over_number: i64,
    pub ball_number: i64,
    pub batsman: String,
    pub bowler: String,
    pub non_striker: String,
    pub runs_batsman: i64,
    pub runs_extras: i64,
    pub extras_type: Option<String>,
    pub runs_total: i64,
    pub was_boundary: bool,
    pub has_wicket: bool,
}

impl RawDelivery {
    /// Short identity string for logs and failure reports
    pub fn describe(&self) -> String {
        format!(
            "delivery {}/{}/{}.{}",
            self.match_id, self.innings_number, self.over_number, self.ball_number
        )
    }
}

/// One wicket event attached to a delivery
///
/// Player fields stay as name strings end to end; wickets are anchored by
/// `(match_id, innings_number, over_number, ball_number)` rather than by
/// resolved ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawWicket {
    pub match_id: i64,
    pub innings_number: String,
    pub over_number: i64,
    pub ball_number: i64,
    pub kind: String,
    pub player_out_name: String,
    pub fielder_name: Option<String>,
}
