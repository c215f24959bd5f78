//! Sync Engine error types

use contracts::{ContractError, FrameId};
use thiserror::Error;

/// Frame Synchronizer error
#[derive(Debug, Error)]
pub enum SyncError {
    /// Not every producer delivered the current frame before the deadline
    #[error("frame {frame_id}: timed out after {waited_ms} ms, missing producers {missing:?}")]
    Timeout {
        frame_id: FrameId,
        waited_ms: u64,
        missing: Vec<String>,
    },

    /// World refused the synchronous, fixed-step settings
    #[error("world mode error: {message}")]
    WorldMode {
        message: String,
        #[source]
        source: Option<ContractError>,
    },

    /// Operation on a closed synchronizer
    #[error("synchronizer session is closed")]
    SessionClosed,

    /// Invalid open parameters
    #[error("invalid synchronizer configuration: {message}")]
    Config { message: String },

    /// World collaborator failure (tick, callback registration, restore)
    #[error(transparent)]
    World(#[from] ContractError),
}

impl SyncError {
    /// Create world mode error from the rejected settings call
    pub fn world_mode(message: impl Into<String>, source: ContractError) -> Self {
        Self::WorldMode {
            message: message.into(),
            source: Some(source),
        }
    }

    /// Create configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Whether the error only concerns one step (caller may retry `advance`)
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Result alias
pub type Result<T> = std::result::Result<T, SyncError>;
