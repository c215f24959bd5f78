//! # Config Loader
//!
//! Reads drive session files into a validated [`SessionBlueprint`].
//!
//! A session file has three parts, all optional:
//! - `[world]`: fixed-step rate (`fps`), per-step deadline (`tick_timeout_ms`)
//!   and the simulator endpoint
//! - `[[cameras]]`: one entry per camera; `channel` names its image dataset.
//!   An empty list falls back to the three-camera rig
//! - `[recorder]`: output directory, naming (`style`, `save_name`), initial
//!   dataset capacity and whether recording starts enabled
//!
//! TOML is the primary format; `.json` files with the same structure are
//! accepted too.
//!
//! # Example
//!
//! ```
//! use config_loader::{ConfigFormat, ConfigLoader};
//!
//! let session = r#"
//! [world]
//! fps = 20.0
//!
//! [[cameras]]
//! id = "front"
//! channel = "CameraMiddle"
//! width = 320
//! height = 240
//!
//! [recorder]
//! save_name = "highway"
//! "#;
//!
//! let blueprint = ConfigLoader::load_from_str(session, ConfigFormat::Toml).unwrap();
//! assert_eq!(blueprint.sensor_size(), (320, 240));
//! assert_eq!(blueprint.recorder.recording_stem(), "aggressive_highway");
//! ```

mod parser;
mod validator;

pub use contracts::SessionBlueprint;
pub use parser::ConfigFormat;

use contracts::ContractError;
use std::path::Path;

/// Entry point for session files; parsing is always followed by validation
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load a session file, picking the format from its extension
    ///
    /// # Errors
    /// `ConfigParse` for an unknown extension or malformed content, `Io` if
    /// the file cannot be read, `ConfigValidation` for the first rule broken.
    pub fn load_from_path(path: &Path) -> Result<SessionBlueprint, ContractError> {
        let format = Self::detect_format(path)?;
        let content = Self::read_file(path)?;
        Self::load_from_str(&content, format)
    }

    /// Parse and validate session content already in memory
    pub fn load_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<SessionBlueprint, ContractError> {
        let blueprint = parser::parse(content, format)?;
        Self::validate(&blueprint)?;
        Ok(blueprint)
    }

    /// Validate a blueprint built in code (e.g. after CLI overrides)
    pub fn validate(blueprint: &SessionBlueprint) -> Result<(), ContractError> {
        validator::validate(blueprint)
    }

    /// Write a blueprint back out as a session file
    pub fn to_toml(blueprint: &SessionBlueprint) -> Result<String, ContractError> {
        toml::to_string_pretty(blueprint)
            .map_err(|e| ContractError::config_parse(format!("TOML serialize error: {e}")))
    }

    pub fn to_json(blueprint: &SessionBlueprint) -> Result<String, ContractError> {
        serde_json::to_string_pretty(blueprint)
            .map_err(|e| ContractError::config_parse(format!("JSON serialize error: {e}")))
    }
}

impl ConfigLoader {
    fn detect_format(path: &Path) -> Result<ConfigFormat, ContractError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            ContractError::config_parse("cannot determine file format from extension")
        })?;

        ConfigFormat::from_extension(ext).ok_or_else(|| {
            ContractError::config_parse(format!("unsupported config format: .{ext}"))
        })
    }

    fn read_file(path: &Path) -> Result<String, ContractError> {
        Ok(std::fs::read_to_string(path)?)
    }
}
