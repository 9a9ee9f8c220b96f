//! Persister
//!
//! Drives the three dependency-ordered write passes over one run's record
//! collection: matches (with scoresheets), then innings, then deliveries
//! (with their wickets). The pass boundaries are global barriers — every
//! match across every file is committed before any innings is normalized,
//! and every innings before any delivery — because the dependent lookups in
//! passes 2 and 3 read committed rows.
//!
//! Failure isolation: bulk passes fail per batch, the delivery pass fails
//! per single delivery. A failed record never blocks unrelated records, and
//! the run always completes with a structured [`IngestReport`].

use std::collections::{HashMap, HashSet};

use tracing::{info, warn};

use crate::normalize::{normalize_delivery, normalize_innings, normalize_match, wicket_row};
use crate::reader::SourceFailure;
use crate::records::{RawRecord, RecordKind};
use crate::report::IngestReport;
use crate::resolver::EntityResolver;
use crate::store::{InningsRow, MatchRow, ScoresheetRow, Store, WicketRow};

/// Three-pass persister for one ingestion run
pub struct Persister<'a> {
    store: &'a dyn Store,
    resolver: EntityResolver<'a>,
    report: IngestReport,
}

impl<'a> Persister<'a> {
    pub fn new(store: &'a dyn Store) -> Self {
        Self {
            store,
            resolver: EntityResolver::new(store),
            report: IngestReport::default(),
        }
    }

    /// Persist one run's records, consuming the persister
    pub async fn persist(
        mut self,
        records: Vec<RawRecord>,
        source_failures: Vec<SourceFailure>,
    ) -> IngestReport {
        self.report.files_skipped = source_failures.len();
        // One match record per readable file
        self.report.files_processed = records
            .iter()
            .filter(|r| r.kind() == RecordKind::Match)
            .count();
        for failure in source_failures {
            self.report
                .record_failure(RecordKind::SourceFile, failure.file, failure.reason);
        }

        self.pass_matches(&records).await;
        self.pass_innings(&records).await;
        self.pass_deliveries(&records).await;

        info!(
            matches = self.report.matches_persisted,
            innings = self.report.innings_persisted,
            deliveries = self.report.deliveries_persisted,
            wickets = self.report.wickets_persisted,
            failures = self.report.failures.len(),
            "ingestion run complete"
        );
        self.report
    }

    /// Pass 1: normalize and bulk-commit matches with their scoresheets
    async fn pass_matches(&mut self, records: &[RawRecord]) {
        let mut match_rows: Vec<MatchRow> = Vec::new();

        for record in records {
            let RawRecord::Match(raw) = record else { continue };
            match normalize_match(&mut self.resolver, raw).await {
                Ok(row) => match_rows.push(row),
                Err(err) => {
                    warn!(match_id = raw.match_id, error = %err, "match normalization failed");
                    self.report.matches_failed += 1;
                    self.report.record_failure(
                        RecordKind::Match,
                        format!("match {}", raw.match_id),
                        err.to_string(),
                    );
                },
            }
        }

        // A scoresheet rides with its match; one whose match failed
        // normalization would only fail the batch on its foreign key.
        let committed_ids: HashSet<i64> = match_rows.iter().map(|m| m.id).collect();
        let scoresheet_rows: Vec<ScoresheetRow> = records
            .iter()
            .filter_map(|record| match record {
                RawRecord::Scoresheet(raw) if committed_ids.contains(&raw.match_id) => {
                    Some(ScoresheetRow {
                        match_id: raw.match_id,
                        data_version: raw.data_version.clone(),
                        date_created: raw.date_created.clone(),
                        revision: raw.revision,
                    })
                },
                _ => None,
            })
            .collect();

        if match_rows.is_empty() {
            return;
        }

        match self.store.insert_matches(&match_rows, &scoresheet_rows).await {
            Ok(()) => {
                self.report.matches_persisted = match_rows.len();
                self.report.scoresheets_persisted = scoresheet_rows.len();
            },
            Err(err) => {
                warn!(error = %err, batch = match_rows.len(), "match batch rolled back");
                self.report.matches_failed += match_rows.len();
                self.report.record_failure(
                    RecordKind::Match,
                    format!("match batch ({} rows)", match_rows.len()),
                    err.to_string(),
                );
            },
        }
    }

    /// Pass 2: normalize and bulk-commit innings
    async fn pass_innings(&mut self, records: &[RawRecord]) {
        let mut rows: Vec<InningsRow> = Vec::new();

        for record in records {
            let RawRecord::Innings(raw) = record else { continue };
            match normalize_innings(self.store, &mut self.resolver, raw).await {
                Ok(row) => rows.push(row),
                Err(err) => {
                    warn!(
                        match_id = raw.match_id,
                        innings = %raw.innings_number,
                        error = %err,
                        "innings normalization failed"
                    );
                    self.report.innings_failed += 1;
                    self.report.record_failure(
                        RecordKind::Innings,
                        format!("innings {}/{}", raw.match_id, raw.innings_number),
                        err.to_string(),
                    );
                },
            }
        }

        if rows.is_empty() {
            return;
        }

        match self.store.insert_innings(&rows).await {
            Ok(()) => self.report.innings_persisted = rows.len(),
            Err(err) => {
                warn!(error = %err, batch = rows.len(), "innings batch rolled back");
                self.report.innings_failed += rows.len();
                self.report.record_failure(
                    RecordKind::Innings,
                    format!("innings batch ({} rows)", rows.len()),
                    err.to_string(),
                );
            },
        }
    }

    /// Pass 3: one transaction per delivery, wickets riding along
    async fn pass_deliveries(&mut self, records: &[RawRecord]) {
        // Wickets are anchored to their delivery by the full dotted key
        let mut wickets_by_delivery: HashMap<(i64, String, i64, i64), Vec<WicketRow>> =
            HashMap::new();
        for record in records {
            let RawRecord::Wicket(raw) = record else { continue };
            wickets_by_delivery
                .entry((
                    raw.match_id,
                    raw.innings_number.clone(),
                    raw.over_number,
                    raw.ball_number,
                ))
                .or_default()
                .push(wicket_row(raw));
        }

        for record in records {
            let RawRecord::Delivery(raw) = record else { continue };
            let wickets = wickets_by_delivery
                .remove(&(
                    raw.match_id,
                    raw.innings_number.clone(),
                    raw.over_number,
                    raw.ball_number,
                ))
                .unwrap_or_default();

            let row = match normalize_delivery(self.store, &mut self.resolver, raw).await {
                Ok(row) => row,
                Err(err) => {
                    warn!(record = %raw.describe(), error = %err, "delivery normalization failed");
                    self.report.deliveries_failed += 1;
                    self.report
                        .record_failure(RecordKind::Delivery, raw.describe(), err.to_string());
                    continue;
                },
            };

            match self.store.insert_delivery(&row, &wickets).await {
                Ok(()) => {
                    self.report.deliveries_persisted += 1;
                    self.report.wickets_persisted += wickets.len();
                },
                Err(err) => {
                    // Only this delivery's transaction rolls back; its
                    // wickets go with it and the run moves on.
                    warn!(record = %raw.describe(), error = %err, "delivery rolled back");
                    self.report.deliveries_failed += 1;
                    self.report
                        .record_failure(RecordKind::Delivery, raw.describe(), err.to_string());
                },
            }
        }
    }
}
