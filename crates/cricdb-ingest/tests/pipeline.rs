//! End-to-end pipeline tests against the in-memory store
//!
//! Fixtures are written to a temp directory and ingested through the full
//! reader → normalizer → persister path.

use std::io::Write;
use std::path::Path;

use cricdb_ingest::persist::Persister;
use cricdb_ingest::records::{RawDelivery, RawRecord};
use cricdb_ingest::store::{EntityKind, MemoryStore};

const MATCH_A: &str = r#"
meta:
  data_version: 0.9
  created: 2013-02-24
  revision: 1
info:
  gender: male
  match_type: ODI
  competition: World Cup
  overs: 50
  venue: Chennai
  city: Chennai
  dates: [2011-02-20]
  teams: [India, Kenya]
  outcome:
    winner: India
    by:
      runs: 98
  toss:
    winner: Kenya
    decision: field
  umpires: [A Sharp, B Blunt]
  player_of_match: [V Sehwag]
innings:
- 1st innings:
    team: India
    deliveries:
    - 0.1:
        batsman: V Sehwag
        bowler: TM Odoyo
        non_striker: SR Tendulkar
        runs:
          batsman: 4
          extras: 0
          total: 4
    - 0.2:
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
- 2nd innings:
    team: Kenya
    deliveries:
    - 0.1:
        batsman: MA Ouma
        bowler: Z Khan
        non_striker: SO Tikolo
        runs:
          batsman: 1
          extras: 0
          total: 1
"#;

const MATCH_B: &str = r#"
meta:
  data_version: 0.9
  created: 2013-02-25
  revision: 1
info:
  gender: male
  match_type: ODI
  dates: [2011-02-24]
  teams: [England, India]
  outcome:
    result: tie
  toss:
    winner: India
    decision: bat
  umpires: [B Blunt, C Flat]
innings:
  1st innings:
    team: India
    deliveries:
      0.1:
        batsman: SR Tendulkar
        bowler: JM Anderson
        non_striker: V Sehwag
        runs:
          batsman: 0
          extras: 1
          total: 1
        extras:
          wides: 1
"#;

fn write_fixture(dir: &Path, name: &str, content: &str) {
    let mut file = std::fs::File::create(dir.join(name)).unwrap();
    file.write_all(content.as_bytes()).unwrap();
}

#[tokio::test]
async fn test_minimal_match_row_counts() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path(), "64814.yaml", MATCH_A);

    let store = MemoryStore::new();
    let report = cricdb_ingest::ingest_directory(&store, dir.path()).await.unwrap();

    assert!(report.is_clean(), "failures: {:?}", report.failures);
    assert_eq!(report.files_processed, 1);
    assert_eq!(report.matches_persisted, 1);
    assert_eq!(report.scoresheets_persisted, 1);
    assert_eq!(report.innings_persisted, 2);
    assert_eq!(report.deliveries_persisted, 3);
    assert_eq!(report.wickets_persisted, 1);

    // Distinct names collapse to one row each
    assert_eq!(store.entity_count(EntityKind::Team), 2);
    assert_eq!(store.entity_count(EntityKind::Competition), 1);
    assert_eq!(store.entity_count(EntityKind::Umpire), 2);
    // V Sehwag, SR Tendulkar, TM Odoyo, MA Ouma, Z Khan, SO Tikolo
    assert_eq!(store.entity_count(EntityKind::Player), 6);
}

#[tokio::test]
async fn test_shared_team_resolves_to_one_row() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path(), "64814.yaml", MATCH_A);
    write_fixture(dir.path(), "64815.yaml", MATCH_B);

    let store = MemoryStore::new();
    let report = cricdb_ingest::ingest_directory(&store, dir.path()).await.unwrap();
    assert!(report.is_clean(), "failures: {:?}", report.failures);
    assert_eq!(report.matches_persisted, 2);

    // File A names India as home, file B as away; both reference one row
    let india = store.entity_id(EntityKind::Team, "India").unwrap();
    let matches = store.match_rows();
    let a = matches.iter().find(|m| m.id == 64814).unwrap();
    let b = matches.iter().find(|m| m.id == 64815).unwrap();
    assert_eq!(a.team_home, india);
    assert_eq!(b.team_away, india);
    assert_eq!(store.entity_count(EntityKind::Team), 3);

    // B Blunt umpires both matches through one row
    let blunt = store.entity_id(EntityKind::Umpire, "B Blunt").unwrap();
    assert_eq!(a.umpire_second, Some(blunt));
    assert_eq!(b.umpire_first, Some(blunt));
}

#[tokio::test]
async fn test_referential_completeness() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path(), "64814.yaml", MATCH_A);

    let store = MemoryStore::new();
    let report = cricdb_ingest::ingest_directory(&store, dir.path()).await.unwrap();
    assert!(report.is_clean());

    let match_ids: Vec<i64> = store.match_rows().iter().map(|m| m.id).collect();
    for innings in store.innings_rows() {
        assert!(match_ids.contains(&innings.match_id));
        assert!(store.entity_id(EntityKind::Team, "India").is_some());
    }
    for delivery in store.delivery_rows() {
        assert!(match_ids.contains(&delivery.match_id));
        assert!(delivery.batsman > 0 && delivery.bowler > 0 && delivery.non_striker > 0);
    }

    // No two innings share (match, innings_number); no two deliveries share
    // the full dotted key
    let innings = store.innings_rows();
    let mut innings_keys: Vec<_> = innings
        .iter()
        .map(|i| (i.match_id, i.innings_number.clone()))
        .collect();
    innings_keys.sort();
    innings_keys.dedup();
    assert_eq!(innings_keys.len(), innings.len());

    let deliveries = store.delivery_rows();
    let mut delivery_keys: Vec<_> = deliveries
        .iter()
        .map(|d| (d.match_id, d.innings_id, d.over_number, d.ball_number))
        .collect();
    delivery_keys.sort();
    delivery_keys.dedup();
    assert_eq!(delivery_keys.len(), deliveries.len());
}

#[tokio::test]
async fn test_wicket_rides_with_its_delivery() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path(), "64814.yaml", MATCH_A);

    let store = MemoryStore::new();
    cricdb_ingest::ingest_directory(&store, dir.path()).await.unwrap();

    let wickets = store.wicket_rows();
    assert_eq!(wickets.len(), 1);
    assert_eq!(wickets[0].kind, "bowled");
    assert_eq!(wickets[0].player_out_name, "V Sehwag");
    assert_eq!((wickets[0].over_number, wickets[0].ball_number), (0, 2));

    let flagged: Vec<_> = store
        .delivery_rows()
        .into_iter()
        .filter(|d| d.has_wicket)
        .collect();
    assert_eq!(flagged.len(), 1);
    assert_eq!((flagged[0].over_number, flagged[0].ball_number), (0, 2));
}

#[tokio::test]
async fn test_undecodable_file_does_not_block_siblings() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path(), "64814.yaml", MATCH_A);
    write_fixture(dir.path(), "64815.yaml", "info: [broken");

    let store = MemoryStore::new();
    let report = cricdb_ingest::ingest_directory(&store, dir.path()).await.unwrap();

    assert_eq!(report.files_processed, 1);
    assert_eq!(report.files_skipped, 1);
    assert_eq!(report.matches_persisted, 1);
    assert_eq!(report.deliveries_persisted, 3);
    assert_eq!(report.failures.len(), 1);
}

#[tokio::test]
async fn test_bad_delivery_does_not_block_siblings() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path(), "64814.yaml", MATCH_A);

    let store = MemoryStore::new();
    let (mut records, failures) = cricdb_ingest::reader::read_directory(dir.path()).unwrap();

    // A delivery pointing at an innings label that was never committed
    records.push(RawRecord::Delivery(RawDelivery {
        match_id: 64814,
        innings_number: "3rd innings".into(),
        over_number: 0,
        ball_number: 1,
        batsman: "V Sehwag".into(),
        bowler: "TM Odoyo".into(),
        non_striker: "SR Tendulkar".into(),
        runs_batsman: 0,
        runs_extras: 0,
        extras_type: None,
        runs_total: 0,
        was_boundary: false,
        has_wicket: false,
    }));

    let report = Persister::new(&store).persist(records, failures).await;

    // Sibling deliveries and everything else still landed
    assert_eq!(report.matches_persisted, 1);
    assert_eq!(report.innings_persisted, 2);
    assert_eq!(report.deliveries_persisted, 3);
    assert_eq!(report.deliveries_failed, 1);
    assert_eq!(report.failures.len(), 1);
    assert!(report.failures[0].reason.contains("innings"));
}

#[tokio::test]
async fn test_hidden_files_yield_no_records() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path(), ".hidden.yaml", MATCH_A);
    write_fixture(dir.path(), "64814.yaml", MATCH_A);

    let store = MemoryStore::new();
    let report = cricdb_ingest::ingest_directory(&store, dir.path()).await.unwrap();

    assert_eq!(report.files_processed, 1);
    assert_eq!(report.files_skipped, 0);
    assert_eq!(report.matches_persisted, 1);
}
