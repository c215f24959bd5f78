//! Synchronous drive loop.
//!
//! Blocking by nature (every `advance` waits on the world), so the `run`
//! command executes it on a blocking thread and stops it through a shared flag.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use contracts::{SensorSource, SessionBlueprint, WORLD_PRODUCER_ID};
use recorder::{ImageSet, RecorderError, RecorderOptions, TimeSeriesRecorder};
use sim_world::{CameraOptions, MockCamera, MockVehicle, MockWorld, MockWorldConfig};
use sync_engine::{FrameSynchronizer, SyncError};
use tracing::{debug, info, instrument, warn};

use super::DriveStats;
use crate::error::{CliError, Result};

/// Drive session configuration
#[derive(Debug, Clone)]
pub struct DriveConfig {
    /// Validated session blueprint
    pub blueprint: SessionBlueprint,
    /// Stop after this many synchronized frames
    pub max_frames: Option<u64>,
    /// Toggle recording every N synchronized frames
    pub record_every: Option<u64>,
    /// Consecutive timeouts tolerated before giving up
    pub max_consecutive_timeouts: u32,
    /// Simulated camera delivery behaviour
    pub camera_options: CameraOptions,
}

/// One drive session over a simulated world
pub struct DriveSession {
    config: DriveConfig,
    stop: Arc<AtomicBool>,
}

impl DriveSession {
    pub fn new(config: DriveConfig) -> Self {
        Self {
            config,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag that ends the loop after the current frame
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }

    /// Run until the frame limit, the stop flag, or a fatal error
    ///
    /// The recorder is closed and the world settings restored on every exit
    /// path, including errors (both do so on drop).
    #[instrument(name = "drive_session", skip(self))]
    pub fn run(self) -> Result<DriveStats> {
        let start = Instant::now();
        let blueprint = &self.config.blueprint;

        let world = MockWorld::with_config(MockWorldConfig {
            initial_frame: blueprint.world.initial_frame,
            ..Default::default()
        });

        let cameras = blueprint.effective_cameras();
        let channels: HashMap<String, String> = cameras
            .iter()
            .map(|cam| (cam.id.clone(), cam.channel.clone()))
            .collect();
        let recorder_options = {
            let (width, height) = blueprint.sensor_size();
            RecorderOptions::new(width, height)
                .with_fps(blueprint.world.fps)
                .with_initial_capacity(blueprint.recorder.initial_capacity)
                .with_image_channels(cameras.iter().map(|cam| cam.channel.clone()))
        };
        let sensors: Vec<Arc<dyn SensorSource>> = cameras
            .into_iter()
            .map(|cam| {
                Arc::new(MockCamera::new(&world, cam, self.config.camera_options.clone()))
                    as Arc<dyn SensorSource>
            })
            .collect();

        let mut synchronizer = FrameSynchronizer::open(world, sensors, blueprint.delta_seconds())?;
        let mut vehicle = MockVehicle::new(blueprint.recorder.style);
        let timeout = blueprint.tick_timeout();

        let mut stats = DriveStats::default();
        let mut recording = blueprint.recorder.enabled;
        let mut recorder: Option<TimeSeriesRecorder> = None;
        let mut consecutive_timeouts = 0u32;

        info!(
            producers = ?synchronizer.producer_ids(),
            recording,
            "Drive loop started"
        );

        while !self.stop.load(Ordering::SeqCst) {
            if self
                .config
                .max_frames
                .is_some_and(|max| stats.frames_synced >= max)
            {
                break;
            }

            let tick = match synchronizer.advance(timeout) {
                Ok(tick) => tick,
                Err(SyncError::Timeout {
                    frame_id, missing, ..
                }) => {
                    stats.session.record_timeout(&missing);
                    consecutive_timeouts += 1;
                    if consecutive_timeouts >= self.config.max_consecutive_timeouts {
                        return Err(CliError::TooManyTimeouts {
                            consecutive: consecutive_timeouts,
                            frame_id,
                            missing,
                        });
                    }
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            consecutive_timeouts = 0;

            if self
                .config
                .record_every
                .is_some_and(|every| toggle_due(stats.frames_synced, every))
            {
                recording = !recording;
                info!(frame_id = tick.frame_id, recording, "Recording toggled");
            }
            stats.frames_synced += 1;
            stats.session.update(&tick.meta);

            match (recording, recorder.take()) {
                (true, None) => {
                    let opened = TimeSeriesRecorder::open_timestamped(
                        &blueprint.recorder,
                        recorder_options.clone(),
                    )?;
                    info!(path = %opened.path().display(), "Recording started");
                    stats.session.record_recording_opened();
                    stats.recordings.push(opened.path().to_path_buf());
                    recorder = Some(opened);
                }
                (false, Some(mut active)) => {
                    active.close()?;
                    info!(
                        path = %active.path().display(),
                        rows = active.write_index(),
                        "Recording stopped"
                    );
                }
                (_, active) => recorder = active,
            }

            let Some(snapshot) = tick.payload(WORLD_PRODUCER_ID).and_then(|p| p.snapshot())
            else {
                warn!(frame_id = tick.frame_id, "Tick without world snapshot, skipped");
                continue;
            };
            let telemetry = vehicle.sample(snapshot);

            let Some(active) = recorder.as_mut() else {
                continue;
            };

            let images: ImageSet = tick
                .sensor_payloads()
                .iter()
                .filter_map(|packet| {
                    let channel = channels.get(&packet.producer_id)?;
                    Some((channel.clone(), packet.image()?.clone()))
                })
                .collect();

            match active.append(&images, &telemetry.to_record()) {
                Ok(outcome) => {
                    debug!(row = outcome.row, frame_id = tick.frame_id, "Row recorded");
                    stats.session.record_row(outcome.capacity_grew);
                }
                Err(e @ RecorderError::SchemaMismatch { .. }) => {
                    warn!(frame_id = tick.frame_id, error = %e, "Row rejected");
                    stats.rows_rejected += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }

        if let Some(mut active) = recorder.take() {
            active.close()?;
            info!(
                path = %active.path().display(),
                rows = active.write_index(),
                "Recording closed"
            );
        }

        stats.final_frame = synchronizer.current_frame();
        synchronizer.close()?;
        stats.duration = start.elapsed();

        info!(
            frames_synced = stats.frames_synced,
            timeouts = stats.session.timeouts,
            "Drive loop finished"
        );
        Ok(stats)
    }
}

/// Whether recording flips before the frame with zero-based index `frame_index`
fn toggle_due(frame_index: u64, every: u64) -> bool {
    every > 0 && frame_index > 0 && frame_index % every == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{default_camera_rig, SessionBlueprint};
    use recorder::RecordingReader;
    use tempfile::tempdir;

    fn config(output_dir: &std::path::Path, max_frames: u64) -> DriveConfig {
        let mut blueprint = SessionBlueprint::default();
        blueprint.world.fps = 20.0;
        blueprint.cameras = default_camera_rig(8, 6);
        blueprint.recorder.output_dir = output_dir.to_path_buf();
        blueprint.recorder.initial_capacity = 2;
        DriveConfig {
            blueprint,
            max_frames: Some(max_frames),
            record_every: None,
            max_consecutive_timeouts: 3,
            camera_options: CameraOptions::default(),
        }
    }

    #[test]
    fn test_toggle_due() {
        assert!(!toggle_due(0, 2));
        assert!(!toggle_due(1, 2));
        assert!(toggle_due(2, 2));
        assert!(toggle_due(4, 2));
        assert!(!toggle_due(3, 0));
    }

    #[test]
    fn test_drive_without_recording() {
        let dir = tempdir().unwrap();
        let stats = DriveSession::new(config(dir.path(), 5)).run().unwrap();

        assert_eq!(stats.frames_synced, 5);
        assert_eq!(stats.session.total_ticks, 5);
        assert_eq!(stats.session.timeouts, 0);
        assert!(stats.recordings.is_empty());
        // apply_settings steps once, then one step per tick
        assert_eq!(stats.final_frame, 6);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_drive_records_rows() {
        let dir = tempdir().unwrap();
        let mut config = config(dir.path(), 4);
        config.blueprint.recorder.enabled = true;
        config.blueprint.recorder.save_name = Some("unit".into());

        let stats = DriveSession::new(config).run().unwrap();
        assert_eq!(stats.recordings.len(), 1);
        assert_eq!(stats.session.rows_written, 4);
        assert_eq!(stats.session.capacity_growths, 2);

        let path = &stats.recordings[0];
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("aggressive_unit_"));

        let mut reader = RecordingReader::open(path).unwrap();
        assert_eq!(reader.rows(), 4);
        assert_eq!(
            reader.image_channels(),
            vec!["CameraMiddle", "CameraRight", "CameraLeft"]
        );
        assert_eq!(reader.metadata().sensor_width, 8);
        assert_eq!(reader.metadata().fps, 20.0);
        assert_eq!(reader.image_row("CameraLeft", 3).unwrap().len(), 8 * 6 * 3);
        assert_eq!(reader.scalar_column("speed").unwrap().len(), 4);
    }

    #[test]
    fn test_record_toggling_opens_fresh_recordings() {
        let dir = tempdir().unwrap();
        let mut config = config(dir.path(), 6);
        config.blueprint.recorder.enabled = true;
        config.record_every = Some(2);

        // on for frames 0-1, off for 2-3, on again for 4-5
        let stats = DriveSession::new(config).run().unwrap();
        assert_eq!(stats.recordings.len(), 2);
        assert_eq!(stats.session.recordings, 2);
        assert_eq!(stats.session.rows_written, 4);
        assert_ne!(stats.recordings[0], stats.recordings[1]);

        for path in &stats.recordings {
            let reader = RecordingReader::open(path).unwrap();
            assert_eq!(reader.rows(), 2);
            assert!(reader.manifest().closed);
        }
    }

    #[test]
    fn test_stop_flag_ends_loop() {
        let dir = tempdir().unwrap();
        let session = DriveSession::new(config(dir.path(), 100));
        session.stop_handle().store(true, Ordering::SeqCst);

        let stats = session.run().unwrap();
        assert_eq!(stats.frames_synced, 0);
    }

    #[test]
    fn test_dropped_frames_abort_after_consecutive_timeouts() {
        let dir = tempdir().unwrap();
        let mut config = config(dir.path(), 10);
        config.blueprint.world.tick_timeout_ms = 50;
        config.max_consecutive_timeouts = 2;
        config.camera_options.drop_probability = 1.0;

        let err = DriveSession::new(config).run().unwrap_err();
        match err {
            CliError::TooManyTimeouts {
                consecutive,
                missing,
                ..
            } => {
                assert_eq!(consecutive, 2);
                assert_eq!(missing, vec!["rgb", "rgb_right", "rgb_left"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
