//! Field parsers
//!
//! Pure functions mapping one raw nested block of a decoded scoresheet to a
//! flat raw record. Parsers never touch the filesystem or the store; any
//! structural problem surfaces as an error that the reader converts into a
//! per-file decode failure.
//!
//! Missing optional fields become `None`. Required fields that are absent
//! are an error, never a sentinel value.

use anyhow::{anyhow, bail, Result};
use serde_yaml::Value;

use crate::records::{RawDelivery, RawInnings, RawMatch, RawScoresheet, RawWicket};

/// Normalize a singleton-or-sequence value into a slice of items
///
/// Source files encode one innings (or one delivery, or one wicket) either
/// as a bare mapping or as a sequence of mappings; downstream code always
/// sees a sequence.
pub fn ensure_seq(value: &Value) -> Vec<&Value> {
    match value {
        Value::Sequence(items) => items.iter().collect(),
        other => vec![other],
    }
}

/// First `(key, value)` entry of a single-key mapping
pub fn first_entry(value: &Value) -> Option<(&Value, &Value)> {
    value.as_mapping().and_then(|m| m.iter().next())
}

/// Render a scalar as its source text (numbers and booleans included)
///
/// YAML scalars that look numeric (delivery keys like `0.1`, data versions
/// like `0.9`) decode as numbers; their textual form is what the schema
/// stores.
fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn opt_string(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(scalar_string)
}

fn req_string(value: &Value, key: &str) -> Result<String> {
    opt_string(value, key).ok_or_else(|| anyhow!("missing required field `{}`", key))
}

fn opt_i64(value: &Value, key: &str) -> Option<i64> {
    value.get(key).and_then(Value::as_i64)
}

fn req_i64(value: &Value, key: &str) -> Result<i64> {
    opt_i64(value, key).ok_or_else(|| anyhow!("missing required field `{}`", key))
}

/// Interpret a YAML flag that may be a bool or a yes/no string
fn flag(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => matches!(s.to_lowercase().as_str(), "yes" | "true"),
        _ => false,
    }
}

/// Split a dotted delivery label `"<over>.<ball>"` into its two counters
pub fn split_delivery_key(key: &Value) -> Result<(i64, i64)> {
    let text = scalar_string(key).ok_or_else(|| anyhow!("delivery key is not a scalar"))?;
    let (over, ball) = text
        .split_once('.')
        .ok_or_else(|| anyhow!("delivery key `{}` has no `.` separator", text))?;
    let over: i64 = over
        .parse()
        .map_err(|_| anyhow!("delivery key `{}` has a non-numeric over", text))?;
    let ball: i64 = ball
        .parse()
        .map_err(|_| anyhow!("delivery key `{}` has a non-numeric ball", text))?;
    if over < 0 || ball < 0 {
        bail!("delivery key `{}` is negative", text);
    }
    Ok((over, ball))
}

/// Parse a file's `info` block into one raw match
pub fn parse_match_info(match_id: i64, info: &Value) -> Result<RawMatch> {
    let teams = info
        .get("teams")
        .and_then(Value::as_sequence)
        .ok_or_else(|| anyhow!("missing required field `teams`"))?;
    if teams.len() < 2 {
        bail!("`teams` lists {} team(s), expected 2", teams.len());
    }
    let team_home = scalar_string(&teams[0]).ok_or_else(|| anyhow!("home team is not a name"))?;
    let team_away = scalar_string(&teams[1]).ok_or_else(|| anyhow!("away team is not a name"))?;

    let dates = info
        .get("dates")
        .and_then(Value::as_sequence)
        .filter(|d| !d.is_empty())
        .ok_or_else(|| anyhow!("missing required field `dates`"))?;
    let start_date =
        scalar_string(&dates[0]).ok_or_else(|| anyhow!("start date is not a scalar"))?;
    let end_date = scalar_string(&dates[dates.len() - 1])
        .ok_or_else(|| anyhow!("end date is not a scalar"))?;

    let outcome = info
        .get("outcome")
        .ok_or_else(|| anyhow!("missing required field `outcome`"))?;
    let winner = opt_string(outcome, "winner");
    let (won_by_type, won_by_value) = match outcome.get("by").and_then(first_entry) {
        Some((kind, value)) => (scalar_string(kind), value.as_i64()),
        None => (None, None),
    };
    // Files carry either an explicit result (draw, tie, no result) or a
    // winner; a winner alone means the match was won outright.
    let result = match opt_string(outcome, "result") {
        Some(r) => r,
        None if winner.is_some() => "win".to_string(),
        None => bail!("`outcome` has neither `result` nor `winner`"),
    };

    let toss = info.get("toss");
    let toss_won_by = toss.and_then(|t| opt_string(t, "winner"));
    let toss_decision = toss.and_then(|t| opt_string(t, "decision"));

    let umpires: Vec<String> = info
        .get("umpires")
        .and_then(Value::as_sequence)
        .map(|seq| seq.iter().filter_map(scalar_string).collect())
        .unwrap_or_default();
    let umpire = |slot: usize| umpires.get(slot).cloned();

    let player_of_match = info
        .get("player_of_match")
        .and_then(Value::as_sequence)
        .and_then(|seq| seq.first())
        .and_then(scalar_string);

    Ok(RawMatch {
        match_id,
        gender: req_string(info, "gender")?,
        match_type: req_string(info, "match_type")?,
        competition: opt_string(info, "competition"),
        max_overs: opt_i64(info, "overs"),
        venue: opt_string(info, "venue"),
        city: opt_string(info, "city"),
        start_date,
        end_date,
        team_home,
        team_away,
        result,
        method: opt_string(outcome, "method"),
        winner,
        won_by_type,
        won_by_value,
        player_of_match,
        toss_won_by,
        toss_decision,
        umpire_first: umpire(0),
        umpire_second: umpire(1),
        umpire_third: umpire(2),
        umpire_fourth: umpire(3),
    })
}

/// Parse a file's `meta` block into the match's scoresheet record
pub fn parse_scoresheet_meta(match_id: i64, meta: &Value) -> Result<RawScoresheet> {
    Ok(RawScoresheet {
        match_id,
        data_version: opt_string(meta, "data_version"),
        date_created: opt_string(meta, "created"),
        revision: opt_i64(meta, "revision"),
    })
}

/// Parse one innings block (the value under its label key)
pub fn parse_innings_block(match_id: i64, innings_number: &str, body: &Value) -> Result<RawInnings> {
    let penalty = body.get("penalty_runs");
    Ok(RawInnings {
        match_id,
        innings_number: innings_number.to_string(),
        batting_team: req_string(body, "team")?,
        penalty_runs_pre: penalty.and_then(|p| opt_i64(p, "pre")),
        penalty_runs_post: penalty.and_then(|p| opt_i64(p, "post")),
        was_declared: flag(body.get("declared")),
    })
}

/// Parse one delivery block (the value under its dotted label key)
pub fn parse_delivery_block(
    match_id: i64,
    innings_number: &str,
    over_number: i64,
    ball_number: i64,
    body: &Value,
) -> Result<RawDelivery> {
    let runs = body
        .get("runs")
        .ok_or_else(|| anyhow!("missing required field `runs`"))?;
    let runs_batsman = req_i64(runs, "batsman")?;

    let extras_type = body
        .get("extras")
        .and_then(first_entry)
        .and_then(|(kind, _)| scalar_string(kind));

    Ok(RawDelivery {
        match_id,
        innings_number: innings_number.to_string(),
        over_number,
        ball_number,
        batsman: req_string(body, "batsman")?,
        bowler: req_string(body, "bowler")?,
        non_striker: req_string(body, "non_striker")?,
        runs_batsman,
        runs_extras: req_i64(runs, "extras")?,
        extras_type,
        runs_total: req_i64(runs, "total")?,
        was_boundary: runs_batsman == 4 || runs_batsman == 6,
        has_wicket: body.get("wicket").is_some(),
    })
}

/// Parse one wicket entry attached to a delivery
pub fn parse_wicket_block(
    match_id: i64,
    innings_number: &str,
    over_number: i64,
    ball_number: i64,
    body: &Value,
) -> Result<RawWicket> {
    let fielder_name = body
        .get("fielders")
        .and_then(Value::as_sequence)
        .and_then(|seq| seq.first())
        .and_then(scalar_string);

    Ok(RawWicket {
        match_id,
        innings_number: innings_number.to_string(),
        over_number,
        ball_number,
        kind: req_string(body, "kind")?,
        player_out_name: req_string(body, "player_out")?,
        fielder_name,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(text: &str) -> Value {
        serde_yaml::from_str(text).unwrap()
    }

    #[test]
    fn test_split_delivery_key_string() {
        let (over, ball) = split_delivery_key(&Value::String("14.3".into())).unwrap();
        assert_eq!((over, ball), (14, 3));
    }

    #[test]
    fn test_split_delivery_key_yaml_number() {
        // Unquoted delivery labels decode as YAML floats
        let key: Value = serde_yaml::from_str("0.1").unwrap();
        assert!(key.is_number());
        let (over, ball) = split_delivery_key(&key).unwrap();
        assert_eq!((over, ball), (0, 1));
    }

    #[test]
    fn test_split_delivery_key_rejects_garbage() {
        assert!(split_delivery_key(&Value::String("14".into())).is_err());
        assert!(split_delivery_key(&Value::String("a.b".into())).is_err());
    }

    #[test]
    fn test_ensure_seq_wraps_singletons() {
        let single = yaml("team: India");
        assert_eq!(ensure_seq(&single).len(), 1);
        let many = yaml("- team: India\n- team: Kenya");
        assert_eq!(ensure_seq(&many).len(), 2);
    }

    #[test]
    fn test_parse_match_info_full() {
        let info = yaml(
            r#"
            gender: male
            match_type: ODI
            competition: World Cup
            overs: 50
            venue: Eden Gardens
            city: Kolkata
            dates: [2011-02-19, 2011-02-20]
            teams: [India, Kenya]
            outcome:
              winner: India
              by:
                runs: 98
            toss:
              winner: Kenya
              decision: field
            umpires: [A Sharp, B Blunt, C Flat]
            player_of_match: [V Kohli]
            "#,
        );
        let m = parse_match_info(64814, &info).unwrap();
        assert_eq!(m.match_id, 64814);
        assert_eq!(m.team_home, "India");
        assert_eq!(m.team_away, "Kenya");
        assert_eq!(m.result, "win");
        assert_eq!(m.won_by_type.as_deref(), Some("runs"));
        assert_eq!(m.won_by_value, Some(98));
        assert_eq!(m.start_date, "2011-02-19");
        assert_eq!(m.end_date, "2011-02-20");
        assert_eq!(m.umpire_third.as_deref(), Some("C Flat"));
        assert_eq!(m.umpire_fourth, None);
        assert_eq!(m.player_of_match.as_deref(), Some("V Kohli"));
        assert_eq!(m.max_overs, Some(50));
    }

    #[test]
    fn test_parse_match_info_draw_has_no_winner() {
        let info = yaml(
            r#"
            gender: male
            match_type: Test
            dates: [2010-07-01]
            teams: [England, Australia]
            outcome:
              result: draw
            "#,
        );
        let m = parse_match_info(1, &info).unwrap();
        assert_eq!(m.result, "draw");
        assert_eq!(m.winner, None);
        assert_eq!(m.won_by_type, None);
        assert_eq!(m.toss_won_by, None);
    }

    #[test]
    fn test_parse_match_info_rejects_missing_outcome() {
        let info = yaml("gender: male\nmatch_type: ODI\ndates: [2011-01-01]\nteams: [A, B]");
        assert!(parse_match_info(1, &info).is_err());
    }

    #[test]
    fn test_parse_scoresheet_meta_preserves_version_text() {
        let meta = yaml("data_version: 0.9\ncreated: 2013-02-24\nrevision: 1");
        let s = parse_scoresheet_meta(7, &meta).unwrap();
        assert_eq!(s.data_version.as_deref(), Some("0.9"));
        assert_eq!(s.date_created.as_deref(), Some("2013-02-24"));
        assert_eq!(s.revision, Some(1));
    }

    #[test]
    fn test_parse_innings_block() {
        let body = yaml(
            r#"
            team: India
            penalty_runs:
              pre: 5
            declared: yes
            deliveries: []
            "#,
        );
        let innings = parse_innings_block(7, "1st innings", &body).unwrap();
        assert_eq!(innings.batting_team, "India");
        assert_eq!(innings.penalty_runs_pre, Some(5));
        assert_eq!(innings.penalty_runs_post, None);
        assert!(innings.was_declared);
    }

    #[test]
    fn test_parse_delivery_block_extras_and_boundary() {
        let body = yaml(
            r#"
            batsman: V Sehwag
            bowler: TM Odoyo
            non_striker: SR Tendulkar
            runs:
              batsman: 4
              extras: 1
              total: 5
            extras:
              wides: 1
            "#,
        );
        let d = parse_delivery_block(7, "1st innings", 3, 2, &body).unwrap();
        assert_eq!(d.runs_batsman, 4);
        assert!(d.was_boundary);
        assert_eq!(d.extras_type.as_deref(), Some("wides"));
        assert!(!d.has_wicket);
    }

    #[test]
    fn test_parse_wicket_block_first_fielder() {
        let body = yaml("kind: caught\nplayer_out: V Sehwag\nfielders: [JK Kamande, X Other]");
        let w = parse_wicket_block(7, "1st innings", 3, 2, &body).unwrap();
        assert_eq!(w.kind, "caught");
        assert_eq!(w.player_out_name, "V Sehwag");
        assert_eq!(w.fielder_name.as_deref(), Some("JK Kamande"));
    }
}
