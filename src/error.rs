use std::path::PathBuf;

use thiserror::Error;

/// Failures of the risk scorer. None of these ever fall back to a guessed label.
#[derive(Debug, Error)]
pub enum ScoringError {
    /// Model or scaler artifact missing, unreadable, or internally inconsistent.
    #[error(
        "assessment unavailable: {artifact} artifact at {} could not be loaded: {reason}",
        path.display()
    )]
    ModelUnavailable {
        artifact: &'static str,
        path: PathBuf,
        reason: String,
    },

    #[error("feature vector has {actual} values, model expects {expected}")]
    FeatureShape { expected: usize, actual: usize },

    #[error("feature {index} is not a finite number ({value})")]
    InvalidFeatureValue { index: usize, value: f64 },
}

/// A record that breaks one of its field invariants.
#[derive(Debug, Error, PartialEq)]
pub enum RecordError {
    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: &'static str,
        min: i64,
        max: i64,
        value: i64,
    },

    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    #[error("confidence distribution is invalid: {0}")]
    Confidence(String),
}

/// Append failed. Recoverable: the caller may resubmit the same record.
#[derive(Debug, Error)]
pub enum StorageWriteError {
    #[error("record rejected: {0}")]
    InvalidRecord(#[from] RecordError),

    #[error("existing file {} is not a readable record array, refusing to overwrite it", path.display())]
    UnreadableExisting { path: PathBuf },

    #[error("failed to serialize records: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
