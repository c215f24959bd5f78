//! # Drive Recorder CLI
//!
//! 命令行接口入口点。
//!
//! 提供：
//! - 配置加载与验证
//! - 同步驾驶循环与录制开关
//! - 录制文件查看与 PNG 导出

mod cli;
mod commands;
mod error;
mod session;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use cli::{Cli, Commands};
use commands::{run_drive, run_inspect, run_validate};
use observability::ObservabilityConfig;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    init_logging(&cli)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Drive Recorder CLI starting"
    );

    let result = match &cli.command {
        Commands::Run(args) => run_drive(args).await,
        Commands::Validate(args) => run_validate(args),
        Commands::Inspect(args) => run_inspect(args),
    };

    if let Err(ref e) = result {
        tracing::error!(error = %e, "Command failed");
    }

    result
}

/// Initialize logging (and the metrics endpoint for `run`) from CLI options
fn init_logging(cli: &Cli) -> Result<()> {
    let default_log_level = if cli.quiet {
        "warn"
    } else {
        match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let metrics_port = match &cli.command {
        Commands::Run(args) if args.metrics_port != 0 => Some(args.metrics_port),
        _ => None,
    };

    observability::init_with_config(ObservabilityConfig {
        log_format: cli.log_format.into(),
        metrics_port,
        default_log_level: default_log_level.to_string(),
    })
}
