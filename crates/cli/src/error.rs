//! Error types for the drive loop.

use std::path::PathBuf;

use contracts::{ContractError, FrameId};
use recorder::RecorderError;
use sync_engine::SyncError;
use thiserror::Error;

/// Drive loop error
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {}", path.display())]
    ConfigNotFound { path: PathBuf },

    /// Configuration could not be loaded or is invalid
    #[error("Configuration error: {0}")]
    Config(#[from] ContractError),

    /// Producers kept missing their deadline
    #[error("{consecutive} consecutive tick timeouts, last at frame {frame_id} (missing: {missing:?})")]
    TooManyTimeouts {
        consecutive: u32,
        frame_id: FrameId,
        missing: Vec<String>,
    },

    /// Frame synchronizer error
    #[error("Synchronizer error: {0}")]
    Sync(#[from] SyncError),

    /// Recorder error
    #[error("Recorder error: {0}")]
    Recorder(#[from] RecorderError),
}

impl CliError {
    pub fn config_not_found(path: impl Into<PathBuf>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }
}

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
