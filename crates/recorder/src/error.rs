//! Recorder error types

use std::path::PathBuf;

use thiserror::Error;

/// Time-Series Recorder error
#[derive(Debug, Error)]
pub enum RecorderError {
    /// Appended row does not match the declared datasets
    #[error("schema mismatch for '{field}': {message}")]
    SchemaMismatch { field: String, message: String },

    /// Backing store could not be created or opened
    #[error("recording store unavailable at {}: {message}", path.display())]
    StoreUnavailable { path: PathBuf, message: String },

    /// Operation on a closed recorder
    #[error("recorder session is closed")]
    SessionClosed,

    /// Requested row is past the rows written
    #[error("row {row} out of range ({rows} rows recorded)")]
    RowOutOfRange { row: usize, rows: usize },

    /// Unknown dataset name
    #[error("no dataset named '{0}'")]
    UnknownDataset(String),

    /// Image encoding error on export
    #[error("image export error: {0}")]
    Image(#[from] image::ImageError),

    /// IO error after open
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl RecorderError {
    /// Create schema mismatch error
    pub fn schema_mismatch(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SchemaMismatch {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create store unavailable error
    pub fn store_unavailable(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::StoreUnavailable {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result alias
pub type Result<T> = std::result::Result<T, RecorderError>;
