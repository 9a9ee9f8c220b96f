//! Structured run report
//!
//! An ingestion run always completes; this report carries what succeeded,
//! what was skipped, and a dead-letter list of every failed input for
//! operator follow-up.

use serde::{Deserialize, Serialize};

use crate::records::RecordKind;

/// One failed source file or record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordFailure {
    pub kind: RecordKind,
    /// Identity of the failed input (file path or record description)
    pub record: String,
    pub reason: String,
}

/// Aggregate outcome of one ingestion run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestReport {
    pub files_processed: usize,
    pub files_skipped: usize,
    pub matches_persisted: usize,
    pub matches_failed: usize,
    pub scoresheets_persisted: usize,
    pub innings_persisted: usize,
    pub innings_failed: usize,
    pub deliveries_persisted: usize,
    pub deliveries_failed: usize,
    pub wickets_persisted: usize,
    /// Dead-letter list: one entry per skipped file and failed record
    pub failures: Vec<RecordFailure>,
}

impl IngestReport {
    /// Whether every record of every readable file was persisted
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn record_failure(
        &mut self,
        kind: RecordKind,
        record: impl Into<String>,
        reason: impl Into<String>,
    ) {
        self.failures.push(RecordFailure {
            kind,
            record: record.into(),
            reason: reason.into(),
        });
    }
}
