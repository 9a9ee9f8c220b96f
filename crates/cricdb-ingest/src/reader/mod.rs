//! Source reader
//!
//! Walks a directory of per-match scoresheet files, decodes each into a
//! generic YAML value, and drives the field parsers to emit an ordered
//! collection of raw records tagged with the owning match id.
//!
//! Reading fails soft per file: an undecodable or structurally malformed
//! file yields a [`SourceFailure`] and no records, and the walk continues
//! with the remaining files.

pub mod parsers;

use cricdb_common::{IngestError, Result};
use serde_yaml::Value;
use std::path::Path;
use tracing::{info, warn};

use crate::records::RawRecord;
use parsers::{
    ensure_seq, first_entry, parse_delivery_block, parse_innings_block, parse_match_info,
    parse_scoresheet_meta, parse_wicket_block, split_delivery_key,
};

/// One source file that could not be turned into records
#[derive(Debug, Clone)]
pub struct SourceFailure {
    pub file: String,
    pub reason: String,
}

/// Read every data file in `dir`, in filename order
///
/// Returns the ordered union of per-file record sequences plus the list of
/// files that were skipped. Only enumeration of the directory itself is a
/// hard error.
pub fn read_directory(dir: &Path) -> Result<(Vec<RawRecord>, Vec<SourceFailure>)> {
    let mut paths: Vec<_> = std::fs::read_dir(dir)?
        .collect::<std::io::Result<Vec<_>>>()?
        .into_iter()
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .collect();
    paths.sort();

    let mut records = Vec::new();
    let mut failures = Vec::new();

    for path in &paths {
        match read_file(path) {
            Ok(file_records) => records.extend(file_records),
            Err(err) => {
                warn!(file = %path.display(), error = %err, "skipping source file");
                failures.push(SourceFailure {
                    file: path.display().to_string(),
                    reason: err.to_string(),
                });
            },
        }
    }

    info!(
        files = paths.len(),
        records = records.len(),
        skipped = failures.len(),
        "source directory read"
    );
    Ok((records, failures))
}

/// Read one source file into its ordered record sequence
///
/// Hidden files (name starting with `.`) yield an empty sequence. Any decode
/// or field-parse problem is an error for the whole file; no partial record
/// sequence is ever returned.
pub fn read_file(path: &Path) -> Result<Vec<RawRecord>> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    if file_name.starts_with('.') {
        return Ok(Vec::new());
    }

    let display_path = path.display().to_string();
    // Match identifier is the filename stem up to the first `.`
    let match_id: i64 = file_name
        .split('.')
        .next()
        .unwrap_or("")
        .parse()
        .map_err(|_| {
            IngestError::decode(&display_path, "filename stem is not a numeric match id")
        })?;

    info!(file = %display_path, match_id, "processing source file");

    let text = std::fs::read_to_string(path)?;
    let doc: Value = serde_yaml::from_str(&text).map_err(|err| {
        let reason = match err.location() {
            Some(loc) => format!("{} (line {}, column {})", err, loc.line(), loc.column()),
            None => err.to_string(),
        };
        IngestError::decode(&display_path, reason)
    })?;

    extract_records(match_id, &doc).map_err(|err| IngestError::decode(&display_path, err.to_string()))
}

/// Emit the record sequence for one decoded document
///
/// Order: match, scoresheet, then per innings the innings record followed by
/// its deliveries, each delivery followed by its wickets.
fn extract_records(match_id: i64, doc: &Value) -> anyhow::Result<Vec<RawRecord>> {
    let mut records = Vec::new();

    let info = doc
        .get("info")
        .ok_or_else(|| anyhow::anyhow!("missing `info` block"))?;
    records.push(RawRecord::Match(parse_match_info(match_id, info)?));

    let meta = doc
        .get("meta")
        .ok_or_else(|| anyhow::anyhow!("missing `meta` block"))?;
    records.push(RawRecord::Scoresheet(parse_scoresheet_meta(match_id, meta)?));

    let innings_blocks = doc
        .get("innings")
        .ok_or_else(|| anyhow::anyhow!("missing `innings` block"))?;

    for innings_entry in ensure_seq(innings_blocks) {
        let (label, body) = first_entry(innings_entry)
            .ok_or_else(|| anyhow::anyhow!("innings entry is not a single-key mapping"))?;
        let innings_number = label
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("innings label is not a string"))?;

        records.push(RawRecord::Innings(parse_innings_block(
            match_id,
            innings_number,
            body,
        )?));

        let deliveries = body
            .get("deliveries")
            .ok_or_else(|| anyhow::anyhow!("innings `{}` has no `deliveries`", innings_number))?;

        for delivery_entry in ensure_seq(deliveries) {
            let (key, delivery_body) = first_entry(delivery_entry)
                .ok_or_else(|| anyhow::anyhow!("delivery entry is not a single-key mapping"))?;
            let (over_number, ball_number) = split_delivery_key(key)?;

            records.push(RawRecord::Delivery(parse_delivery_block(
                match_id,
                innings_number,
                over_number,
                ball_number,
                delivery_body,
            )?));

            if let Some(wickets) = delivery_body.get("wicket") {
                for wicket_entry in ensure_seq(wickets) {
                    records.push(RawRecord::Wicket(parse_wicket_block(
                        match_id,
                        innings_number,
                        over_number,
                        ball_number,
                        wicket_entry,
                    )?));
                }
            }
        }
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::RecordKind;
    use std::io::Write;

    const MINIMAL_MATCH: &str = r#"
meta:
  data_version: 0.9
  created: 2013-02-24
  revision: 1
info:
  gender: male
  match_type: ODI
  dates: [2011-02-19]
  teams: [India, Kenya]
  outcome:
    winner: India
    by:
      runs: 98
innings:
  1st innings:
    team: India
    deliveries:
      0.1:
        batsman: V Sehwag
        bowler: TM Odoyo
        non_striker: SR Tendulkar
        runs:
          batsman: 0
          extras: 0
          total: 0
        wicket:
          kind: bowled
          player_out: V Sehwag
"#;

    fn write_fixture(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_read_file_emission_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture(dir.path(), "64814.yaml", MINIMAL_MATCH);

        let records = read_file(&path).unwrap();
        let kinds: Vec<RecordKind> = records.iter().map(RawRecord::kind).collect();
        assert_eq!(
            kinds,
            vec![
                RecordKind::Match,
                RecordKind::Scoresheet,
                RecordKind::Innings,
                RecordKind::Delivery,
                RecordKind::Wicket,
            ]
        );

        match &records[3] {
            RawRecord::Delivery(d) => {
                assert_eq!(d.match_id, 64814);
                assert_eq!((d.over_number, d.ball_number), (0, 1));
                assert!(d.has_wicket);
            },
            other => panic!("expected delivery, got {:?}", other.kind()),
        }
    }

    #[test]
    fn test_hidden_files_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture(dir.path(), ".64814.yaml", MINIMAL_MATCH);
        assert!(read_file(&path).unwrap().is_empty());
    }

    #[test]
    fn test_single_innings_mapping_equals_sequence_form() {
        let dir = tempfile::tempdir().unwrap();
        let as_mapping = write_fixture(dir.path(), "1.yaml", MINIMAL_MATCH);

        let as_sequence = MINIMAL_MATCH.replace(
            "innings:\n  1st innings:",
            "innings:\n- 1st innings:",
        );
        let seq_path = write_fixture(dir.path(), "2.yaml", &as_sequence);

        let a = read_file(&as_mapping).unwrap();
        let b = read_file(&seq_path).unwrap();
        assert_eq!(a.len(), b.len());

        let innings_of = |records: &[RawRecord]| {
            records
                .iter()
                .filter(|r| r.kind() == RecordKind::Innings)
                .count()
        };
        assert_eq!(innings_of(&a), 1);
        assert_eq!(innings_of(&b), 1);
    }

    #[test]
    fn test_undecodable_file_fails_soft_in_directory_walk() {
        let dir = tempfile::tempdir().unwrap();
        write_fixture(dir.path(), "1.yaml", MINIMAL_MATCH);
        write_fixture(dir.path(), "2.yaml", "meta: [unclosed");

        let (records, failures) = read_directory(dir.path()).unwrap();
        assert_eq!(failures.len(), 1);
        assert!(failures[0].file.ends_with("2.yaml"));
        // The well-formed sibling still contributes its full sequence
        assert_eq!(records.len(), 5);
    }

    #[test]
    fn test_non_numeric_stem_is_a_decode_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture(dir.path(), "notes.yaml", MINIMAL_MATCH);
        let err = read_file(&path).unwrap_err();
        assert!(err.to_string().contains("match id"));
    }
}
