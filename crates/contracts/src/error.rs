//! Layered error definitions
//!
//! Categorized by source: config files, the simulated world, and IO

use thiserror::Error;

/// Unified boundary error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== World Errors =====
    /// World rejected the requested settings
    #[error("world settings error: {message}")]
    WorldSettings { message: String },

    /// World failed to compute a step
    #[error("world tick error: {message}")]
    WorldTick { message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create world settings error
    pub fn world_settings(message: impl Into<String>) -> Self {
        Self::WorldSettings {
            message: message.into(),
        }
    }

    /// Create world tick error
    pub fn world_tick(message: impl Into<String>) -> Self {
        Self::WorldTick {
            message: message.into(),
        }
    }
}
