//! Error types for CricDB

use thiserror::Error;

/// Result type alias for CricDB operations
pub type Result<T> = std::result::Result<T, IngestError>;

/// Main error type for the ingestion pipeline
///
/// Variants map onto the pipeline's failure taxonomy: decode failures are
/// scoped to one source file, resolution and referential-lookup failures to
/// one record, and storage failures to one transaction.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to decode {file}: {reason}")]
    Decode { file: String, reason: String },

    #[error("cannot resolve {kind} reference for {record}: {reason}")]
    Resolution {
        kind: &'static str,
        record: String,
        reason: String,
    },

    #[error("no {target} row found for {record}")]
    ReferentialLookup {
        target: &'static str,
        record: String,
    },

    #[error("storage error: {0}")]
    Store(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl IngestError {
    /// Shorthand for a configuration error from any displayable cause
    pub fn config(msg: impl Into<String>) -> Self {
        IngestError::Config(msg.into())
    }

    /// Shorthand for a decode failure scoped to one source file
    pub fn decode(file: impl Into<String>, reason: impl Into<String>) -> Self {
        IngestError::Decode {
            file: file.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_error_display() {
        let err = IngestError::decode("data/123.yaml", "bad indentation");
        assert_eq!(
            err.to_string(),
            "failed to decode data/123.yaml: bad indentation"
        );
    }

    #[test]
    fn test_referential_lookup_display() {
        let err = IngestError::ReferentialLookup {
            target: "innings",
            record: "delivery 64814/1st innings/0.1".to_string(),
        };
        assert!(err.to_string().contains("innings"));
        assert!(err.to_string().contains("64814"));
    }
}
