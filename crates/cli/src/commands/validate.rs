//! `validate` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use config_loader::SessionBlueprint;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    fps: f64,
    tick_timeout_ms: u64,
    camera_count: usize,
    channels: Vec<String>,
    sensor_width: u32,
    sensor_height: u32,
    recording_stem: String,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(blueprint) => {
            let warnings = collect_warnings(&blueprint);
            let cameras = blueprint.effective_cameras();
            let (sensor_width, sensor_height) = blueprint.sensor_size();

            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    version: format!("{:?}", blueprint.version),
                    fps: blueprint.world.fps,
                    tick_timeout_ms: blueprint.world.tick_timeout_ms,
                    camera_count: cameras.len(),
                    channels: cameras.into_iter().map(|c| c.channel).collect(),
                    sensor_width,
                    sensor_height,
                    recording_stem: blueprint.recorder.recording_stem(),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(blueprint: &SessionBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();

    if blueprint.cameras.is_empty() {
        warnings.push("No cameras configured - using the default three-camera rig".to_string());
    }

    let step_ms = blueprint.delta_seconds() * 1000.0;
    if (blueprint.world.tick_timeout_ms as f64) < step_ms {
        warnings.push(format!(
            "world.tick_timeout_ms ({}) is shorter than one fixed step ({:.1} ms)",
            blueprint.world.tick_timeout_ms, step_ms
        ));
    }

    if blueprint.recorder.initial_capacity == 1 {
        warnings.push("recorder.initial_capacity is 1 - datasets grow on every row".to_string());
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Fixed step: {} Hz", summary.fps);
            println!("  Tick timeout: {} ms", summary.tick_timeout_ms);
            println!(
                "  Cameras: {} ({})",
                summary.camera_count,
                summary.channels.join(", ")
            );
            println!(
                "  Image size: {}x{}",
                summary.sensor_width, summary.sensor_height
            );
            println!("  Recording prefix: {}", summary.recording_stem);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
