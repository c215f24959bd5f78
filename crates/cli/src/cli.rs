//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use contracts::DrivingStyle;

/// Drive Recorder - frame-synchronized multi-camera driving data recorder
#[derive(Parser, Debug)]
#[command(
    name = "drive-recorder",
    author,
    version,
    about = "Frame-synchronized multi-camera drive recorder",
    long_about = "Steps a simulated world in synchronous mode, gathers every camera's \n\
                  payload for each frame, and records images and vehicle telemetry \n\
                  as fixed-shape time series."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "DRIVE_RECORDER_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "DRIVE_RECORDER_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Drive the simulated world and record synchronized frames
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Show the contents of a finished recording
    Inspect(InspectArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON); defaults are used when omitted
    #[arg(short, long, env = "DRIVE_RECORDER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Number of synchronized frames to drive (0 = until Ctrl+C)
    #[arg(long, default_value = "0", env = "DRIVE_RECORDER_FRAMES")]
    pub frames: u64,

    /// Start recording immediately
    #[arg(long)]
    pub record: bool,

    /// Toggle recording on/off every N synchronized frames (0 = never)
    #[arg(long, default_value = "0")]
    pub record_every: u64,

    /// Override the recording output directory
    #[arg(long, env = "DRIVE_RECORDER_OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Name appended to the driving style in recording names
    #[arg(long)]
    pub save_name: Option<String>,

    /// Driving style (recording name prefix and vehicle behaviour)
    #[arg(long, value_enum)]
    pub style: Option<StyleArg>,

    /// Override the fixed-step rate (Hz)
    #[arg(long)]
    pub fps: Option<f64>,

    /// Abort after this many consecutive tick timeouts
    #[arg(long, default_value = "3")]
    pub max_timeouts: u32,

    /// Maximum random camera delivery delay in milliseconds
    #[arg(long, default_value = "0")]
    pub jitter_ms: u64,

    /// Probability that a camera frame is never delivered
    #[arg(long, default_value = "0.0")]
    pub drop_rate: f64,

    /// Seed for camera jitter and drops
    #[arg(long)]
    pub seed: Option<u64>,

    /// Validate configuration and exit without driving
    #[arg(long)]
    pub dry_run: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "DRIVE_RECORDER_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `inspect` command
#[derive(Parser, Debug)]
pub struct InspectArgs {
    /// Recording directory
    pub recording: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Export the camera images of this row as PNG
    #[arg(long, value_name = "ROW")]
    pub export_frame: Option<usize>,

    /// Export directory (defaults to `<recording>/frames`)
    #[arg(long, value_name = "DIR", requires = "export_frame")]
    pub out: Option<PathBuf>,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => observability::LogFormat::Json,
            LogFormat::Pretty => observability::LogFormat::Pretty,
            LogFormat::Compact => observability::LogFormat::Compact,
        }
    }
}

/// Driving style
#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum StyleArg {
    Aggressive,
    Cautious,
}

impl From<StyleArg> for DrivingStyle {
    fn from(style: StyleArg) -> Self {
        match style {
            StyleArg::Aggressive => DrivingStyle::Aggressive,
            StyleArg::Cautious => DrivingStyle::Cautious,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run() {
        let cli = Cli::try_parse_from([
            "drive-recorder",
            "-v",
            "run",
            "--frames",
            "20",
            "--record",
            "--record-every",
            "5",
            "--style",
            "cautious",
            "--save-name",
            "town03",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 1);
        let Commands::Run(args) = cli.command else {
            panic!("expected run command");
        };
        assert_eq!(args.frames, 20);
        assert!(args.record);
        assert_eq!(args.record_every, 5);
        assert!(matches!(args.style, Some(StyleArg::Cautious)));
        assert_eq!(args.save_name.as_deref(), Some("town03"));
        assert_eq!(args.max_timeouts, 3);
    }

    #[test]
    fn test_inspect_out_requires_export_frame() {
        let result = Cli::try_parse_from(["drive-recorder", "inspect", "rec", "--out", "frames"]);
        assert!(result.is_err());

        let cli = Cli::try_parse_from([
            "drive-recorder",
            "inspect",
            "rec",
            "--export-frame",
            "3",
            "--out",
            "frames",
        ])
        .unwrap();
        let Commands::Inspect(args) = cli.command else {
            panic!("expected inspect command");
        };
        assert_eq!(args.export_frame, Some(3));
    }
}
