//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约一致性测试
//! - 模拟 e2e 测试：配置 → 世界/相机 → 帧同步 → 录制 → 读取

#[cfg(test)]
mod contract_tests {
    use contracts::{VehicleTelemetry, TELEMETRY_FIELDS};
    use recorder::{DatasetKind, RecorderOptions};

    #[test]
    fn test_recorder_declares_every_telemetry_field() {
        let datasets = RecorderOptions::new(64, 48).datasets();
        let telemetry: Vec<_> = datasets
            .iter()
            .filter(|d| d.kind == DatasetKind::Telemetry)
            .map(|d| (d.name.as_str(), d.row_len()))
            .collect();
        let expected: Vec<_> = TELEMETRY_FIELDS.iter().map(|f| (f.name, f.width)).collect();
        assert_eq!(telemetry, expected);
    }

    #[test]
    fn test_telemetry_record_matches_fields() {
        let record = VehicleTelemetry::default().to_record();
        for field in TELEMETRY_FIELDS {
            let value = record.get(field.name).unwrap();
            assert_eq!(value.width(), field.width, "field {}", field.name);
        }
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::io::Write;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use config_loader::ConfigLoader;
    use contracts::{
        FramePayload, ImageData, ImageFormat, SensorSource, TelemetryRecord, WorldSettings,
        WORLD_PRODUCER_ID,
    };
    use observability::SessionStatsAggregator;
    use recorder::{ImageSet, RecorderOptions, RecordingReader, TimeSeriesRecorder};
    use sim_world::{
        CameraOptions, MockCamera, MockVehicle, MockWorld, MockWorldConfig, ScriptedSource,
    };
    use sync_engine::{FrameSynchronizer, SyncError};

    type BoxError = Box<dyn std::error::Error + Send + Sync>;

    const SESSION_TOML: &str = r#"
[world]
fps = 20.0
tick_timeout_ms = 2000
initial_frame = 100

[[cameras]]
id = "rgb"
channel = "CameraMiddle"
width = 16
height = 12

[[cameras]]
id = "rgb_right"
channel = "CameraRight"
width = 16
height = 12

[[cameras]]
id = "rgb_left"
channel = "CameraLeft"
width = 16
height = 12

[recorder]
save_name = "e2e"
style = "cautious"
initial_capacity = 4
"#;

    fn rgb_image(width: u32, height: u32, fill: u8) -> ImageData {
        ImageData {
            width,
            height,
            format: ImageFormat::Rgb8,
            data: vec![fill; (width * height * 3) as usize].into(),
        }
    }

    /// End-to-end: config file -> MockWorld + jittered cameras -> FrameSynchronizer
    /// -> TimeSeriesRecorder -> RecordingReader
    ///
    /// 验证：
    /// 1. 每个 tick 的所有载荷来自同一帧，帧号连续
    /// 2. 录制的图像即该帧渲染结果 (BGRA -> RGB)
    /// 3. 关闭后恢复世界设置
    #[test]
    fn test_e2e_synchronized_recording() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("session.toml");
        std::fs::File::create(&config_path)
            .unwrap()
            .write_all(SESSION_TOML.as_bytes())
            .unwrap();

        let mut blueprint = ConfigLoader::load_from_path(&config_path).unwrap();
        blueprint.recorder.output_dir = dir.path().join("out");

        let world = MockWorld::with_config(MockWorldConfig {
            initial_frame: blueprint.world.initial_frame,
            ..Default::default()
        });
        let cameras = blueprint.effective_cameras();
        let sensors: Vec<Arc<dyn SensorSource>> = cameras
            .iter()
            .enumerate()
            .map(|(i, cam)| {
                let options = CameraOptions {
                    max_jitter: Duration::from_millis(3),
                    drop_probability: 0.0,
                    seed: Some(i as u64),
                };
                Arc::new(MockCamera::new(&world, cam.clone(), options)) as Arc<dyn SensorSource>
            })
            .collect();

        let mut sync =
            FrameSynchronizer::open(world.clone(), sensors, blueprint.delta_seconds()).unwrap();
        assert_eq!(sync.current_frame(), 101);

        let (width, height) = blueprint.sensor_size();
        let options = RecorderOptions::new(width, height)
            .with_fps(blueprint.world.fps)
            .with_initial_capacity(blueprint.recorder.initial_capacity)
            .with_image_channels(cameras.iter().map(|c| c.channel.clone()));
        let mut recorder =
            TimeSeriesRecorder::open_timestamped(&blueprint.recorder, options).unwrap();
        let mut vehicle = MockVehicle::new(blueprint.recorder.style);
        let mut stats = SessionStatsAggregator::new();

        let mut frames = Vec::new();
        for _ in 0..10 {
            let tick = sync.advance(blueprint.tick_timeout()).unwrap();
            assert!(tick.payloads.iter().all(|p| p.frame_id == tick.frame_id));
            stats.update(&tick.meta);

            let snapshot = tick.payload(WORLD_PRODUCER_ID).unwrap().snapshot().unwrap();
            let telemetry = vehicle.sample(snapshot);

            let images: ImageSet = cameras
                .iter()
                .map(|cam| {
                    let image = tick.payload(&cam.id).unwrap().image().unwrap();
                    (cam.channel.clone(), image.clone())
                })
                .collect();
            let outcome = recorder.append(&images, &telemetry.to_record()).unwrap();
            stats.record_row(outcome.capacity_grew);
            frames.push(tick.frame_id);
        }

        assert_eq!(frames, (102..112).collect::<Vec<_>>());
        recorder.close().unwrap();
        sync.close().unwrap();

        assert_eq!(
            world.settings_history(),
            vec![WorldSettings::synchronous(0.05), WorldSettings::default()]
        );
        assert_eq!(stats.total_ticks, 10);
        assert_eq!(stats.rows_written, 10);
        assert_eq!(stats.capacity_growths, 6);

        let name = recorder
            .path()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .into_owned();
        assert!(name.starts_with("cautious_e2e_"));

        let mut reader = RecordingReader::open(recorder.path()).unwrap();
        assert_eq!(reader.rows(), 10);
        assert_eq!(reader.metadata().sensor_width, 16);
        assert_eq!(reader.metadata().simulation_synchronization_type, "syncd");

        let expected = MockCamera::render(16, 12, frames[3]).to_rgb8().unwrap();
        assert_eq!(reader.image_row("CameraRight", 3).unwrap(), expected);

        let speeds = reader.scalar_column("speed").unwrap();
        assert_eq!(speeds.len(), 10);
        assert!(speeds.windows(2).all(|w| w[1] >= w[0]));
    }

    /// Scripted producer: timeout names it, then stale + duplicate payloads are
    /// discarded and only matching rows are recorded
    #[test]
    fn test_e2e_late_producer_recovers() {
        let dir = tempfile::tempdir().unwrap();
        let world = MockWorld::new();
        let camera = Arc::new(ScriptedSource::new("cam"));

        let mut sync = FrameSynchronizer::open(
            world.clone(),
            vec![camera.clone() as Arc<dyn SensorSource>],
            0.1,
        )
        .unwrap();
        let mut recorder = TimeSeriesRecorder::open_with(
            dir.path().join("rec"),
            RecorderOptions::new(2, 2).with_image_channels(["CameraMiddle"]),
        )
        .unwrap();
        let timeout = Duration::from_millis(100);

        let record = |tick: &contracts::SyncedTick, recorder: &mut TimeSeriesRecorder| {
            let image = tick.payload("cam").unwrap().image().unwrap().clone();
            let mut images = ImageSet::new();
            images.insert("CameraMiddle".into(), image);
            recorder.append(&images, &full_telemetry()).unwrap();
        };

        // frame 2: delivered
        assert!(camera.push_image(2, rgb_image(2, 2, 2)));
        let tick = sync.advance(timeout).unwrap();
        assert_eq!(tick.frame_id, 2);
        record(&tick, &mut recorder);

        // frame 3: never delivered
        let err = sync.advance(timeout).unwrap_err();
        match err {
            SyncError::Timeout {
                frame_id, missing, ..
            } => {
                assert_eq!(frame_id, 3);
                assert_eq!(missing, vec!["cam"]);
            }
            other => panic!("unexpected error: {other}"),
        }

        // frame 4: late frame-3 payload and a duplicate arrive alongside
        camera.push_image(3, rgb_image(2, 2, 3));
        camera.push_image(4, rgb_image(2, 2, 4));
        camera.push_image(4, rgb_image(2, 2, 40));
        let tick = sync.advance(timeout).unwrap();
        assert_eq!(tick.frame_id, 4);
        assert_eq!(tick.meta.stale, vec![("cam".to_string(), 1)]);
        assert_eq!(tick.meta.duplicates, 1);
        assert_eq!(tick.payload("cam").unwrap().image().unwrap().data[0], 4);
        record(&tick, &mut recorder);

        recorder.close().unwrap();
        drop(sync);
        assert_eq!(world.settings_history().last(), Some(&WorldSettings::default()));

        let mut reader = RecordingReader::open(dir.path().join("rec")).unwrap();
        assert_eq!(reader.rows(), 2);
        assert_eq!(reader.image_row("CameraMiddle", 0).unwrap(), vec![2; 12]);
        assert_eq!(reader.image_row("CameraMiddle", 1).unwrap(), vec![4; 12]);
    }

    #[test]
    fn test_e2e_rejected_sync_mode_leaves_world_untouched() {
        let world = MockWorld::with_config(MockWorldConfig {
            reject_synchronous: true,
            ..Default::default()
        });
        let camera = Arc::new(ScriptedSource::new("cam"));

        let result = FrameSynchronizer::open(
            world.clone(),
            vec![camera.clone() as Arc<dyn SensorSource>],
            0.1,
        );
        assert!(matches!(result, Err(SyncError::WorldMode { .. })));
        assert_eq!(world.subscriber_count(), 0);
        assert!(!camera.push(1, FramePayload::Image(rgb_image(1, 1, 0))));
    }

    /// Blocking drive loop on a tokio blocking thread, stopped from async code
    /// the way the CLI handles Ctrl+C
    #[tokio::test]
    async fn test_e2e_stop_flag_from_async_context() {
        let dir = tempfile::tempdir().unwrap();
        let rec_path = dir.path().join("rec");
        let stop = Arc::new(AtomicBool::new(false));
        let world = MockWorld::new();

        let loop_stop = stop.clone();
        let loop_world = world.clone();
        let loop_path = rec_path.clone();
        let handle = tokio::task::spawn_blocking(move || {
            let camera = MockCamera::new(
                &loop_world,
                camera_config("rgb", "CameraMiddle"),
                CameraOptions::default(),
            );
            let mut sync = FrameSynchronizer::open(
                loop_world,
                vec![Arc::new(camera) as Arc<dyn SensorSource>],
                0.05,
            )?;
            let mut recorder = TimeSeriesRecorder::open_with(
                &loop_path,
                RecorderOptions::new(4, 4).with_image_channels(["CameraMiddle"]),
            )?;

            let mut ticks = 0u64;
            while !loop_stop.load(Ordering::SeqCst) {
                let tick = sync.advance(Duration::from_secs(1))?;
                let mut images = ImageSet::new();
                if let Some(image) = tick.payload("rgb").and_then(|p| p.image()) {
                    images.insert("CameraMiddle".into(), image.clone());
                }
                recorder.append(&images, &full_telemetry())?;
                ticks += 1;
                std::thread::sleep(Duration::from_millis(2));
            }
            recorder.close()?;
            sync.close()?;
            Ok::<_, BoxError>(ticks)
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        stop.store(true, Ordering::SeqCst);
        let ticks = handle.await.unwrap().unwrap();

        assert!(ticks > 0);
        assert_eq!(world.settings_history().last(), Some(&WorldSettings::default()));
        let reader = RecordingReader::open(&rec_path).unwrap();
        assert_eq!(reader.rows() as u64, ticks);
        assert!(reader.manifest().closed);
    }

    fn camera_config(id: &str, channel: &str) -> contracts::CameraConfig {
        contracts::CameraConfig {
            id: id.to_string(),
            channel: channel.to_string(),
            width: 4,
            height: 4,
            fov: 90.0,
        }
    }

    fn full_telemetry() -> TelemetryRecord {
        contracts::VehicleTelemetry::default().to_record()
    }
}
