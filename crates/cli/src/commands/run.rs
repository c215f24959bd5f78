//! `run` command implementation.

use anyhow::{Context, Result};
use std::sync::atomic::Ordering;
use std::time::Duration;
use tracing::{info, warn};

use config_loader::{ConfigLoader, SessionBlueprint};
use sim_world::CameraOptions;

use crate::cli::RunArgs;
use crate::error::CliError;
use crate::session::{DriveConfig, DriveSession};

/// Execute the `run` command
pub async fn run_drive(args: &RunArgs) -> Result<()> {
    let blueprint = load_blueprint(args)?;

    info!(
        fps = blueprint.world.fps,
        cameras = blueprint.effective_cameras().len(),
        recording = blueprint.recorder.enabled,
        output_dir = %blueprint.recorder.output_dir.display(),
        "Configuration loaded"
    );

    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&blueprint);
        return Ok(());
    }

    let config = DriveConfig {
        blueprint,
        max_frames: (args.frames > 0).then_some(args.frames),
        record_every: (args.record_every > 0).then_some(args.record_every),
        max_consecutive_timeouts: args.max_timeouts.max(1),
        camera_options: CameraOptions {
            max_jitter: Duration::from_millis(args.jitter_ms),
            drop_probability: args.drop_rate.clamp(0.0, 1.0),
            seed: args.seed,
        },
    };

    let session = DriveSession::new(config);
    let stop = session.stop_handle();
    let mut handle = tokio::task::spawn_blocking(move || session.run());

    info!("Starting drive loop...");

    let finished = tokio::select! {
        joined = &mut handle => Some(joined),
        _ = shutdown_signal() => None,
    };
    let outcome = match finished {
        Some(joined) => joined,
        None => {
            warn!("Received shutdown signal, stopping drive loop...");
            stop.store(true, Ordering::SeqCst);
            handle.await
        }
    };

    let stats = outcome
        .context("Drive loop task failed")?
        .context("Drive loop failed")?;

    info!(
        frames_synced = stats.frames_synced,
        timeouts = stats.session.timeouts,
        duration_secs = stats.duration.as_secs_f64(),
        fps = format!("{:.2}", stats.fps()),
        "Drive loop completed"
    );
    stats.print_summary();

    info!("Drive Recorder finished");
    Ok(())
}

/// Load the blueprint (or defaults) and apply CLI overrides
fn load_blueprint(args: &RunArgs) -> Result<SessionBlueprint> {
    let mut blueprint = match &args.config {
        Some(path) => {
            info!(config = %path.display(), "Loading configuration");
            if !path.exists() {
                return Err(CliError::config_not_found(path).into());
            }
            ConfigLoader::load_from_path(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?
        }
        None => {
            info!("No configuration file given, using defaults");
            SessionBlueprint::default()
        }
    };

    if args.record {
        blueprint.recorder.enabled = true;
    }
    if let Some(ref dir) = args.output_dir {
        blueprint.recorder.output_dir = dir.clone();
    }
    if let Some(ref name) = args.save_name {
        blueprint.recorder.save_name = Some(name.clone());
    }
    if let Some(style) = args.style {
        blueprint.recorder.style = style.into();
    }
    if let Some(fps) = args.fps {
        info!(fps, "Overriding fixed-step rate from CLI");
        blueprint.world.fps = fps;
    }

    ConfigLoader::validate(&blueprint).context("Invalid configuration after CLI overrides")?;
    Ok(blueprint)
}

/// Resolve on Ctrl+C or SIGTERM
///
/// A handler that cannot be installed never resolves, leaving the other one
/// (and the frame limit) to end the loop.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(blueprint: &SessionBlueprint) {
    println!("\n=== Configuration Summary ===\n");
    println!("World:");
    println!("  Server: {}:{}", blueprint.world.host, blueprint.world.port);
    println!(
        "  Fixed step: {:.4}s ({} Hz)",
        blueprint.delta_seconds(),
        blueprint.world.fps
    );
    println!("  Tick timeout: {} ms", blueprint.world.tick_timeout_ms);

    let cameras = blueprint.effective_cameras();
    println!("\nCameras ({}):", cameras.len());
    for cam in &cameras {
        println!(
            "  - {} -> {} ({}x{}, fov {})",
            cam.id, cam.channel, cam.width, cam.height, cam.fov
        );
    }

    println!("\nRecorder:");
    println!("  Enabled at start: {}", blueprint.recorder.enabled);
    println!("  Output dir: {}", blueprint.recorder.output_dir.display());
    println!("  Name prefix: {}", blueprint.recorder.recording_stem());
    println!("  Initial capacity: {}", blueprint.recorder.initial_capacity);

    println!();
}
