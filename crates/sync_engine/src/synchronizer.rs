//! Frame Synchronizer
//!
//! Drives a simulated world one step at a time and returns, per step, the
//! payload of every producer tagged with that step's frame identifier.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use contracts::{
    FrameId, SensorSource, SimWorld, SyncedTick, TickCallbackId, TickMeta, WorldSettings,
    WORLD_PRODUCER_ID,
};
use tracing::{debug, info, instrument, warn};

use crate::error::{Result, SyncError};
use crate::queue::{PopCounters, ProducerQueue};

/// Cumulative counters over the session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub ticks: u64,
    pub timeouts: u64,
    pub stale: u64,
    pub duplicates: u64,
}

/// Frame Synchronizer session
///
/// Owns the world handle and the registered sensors from `open` to `close`.
/// While open the world runs in synchronous, fixed-step mode; the settings
/// captured at open are restored on `close` or drop.
pub struct FrameSynchronizer<W: SimWorld> {
    world: W,
    sensors: Vec<Arc<dyn SensorSource>>,
    /// Index 0 is the world tick stream, then one per sensor
    queues: Vec<ProducerQueue>,
    original_settings: WorldSettings,
    delta_seconds: f64,
    tick_callback: Option<TickCallbackId>,
    current_frame: FrameId,
    stats: SyncStats,
    closed: bool,
}

impl<W: SimWorld> FrameSynchronizer<W> {
    /// Switch the world to synchronous mode and start listening to every producer
    ///
    /// # Errors
    /// - `Config`: non-positive step or duplicate sensor ids
    /// - `WorldMode`: the world refused the settings (original settings restored)
    /// - `World`: the tick callback could not be registered
    #[instrument(
        name = "frame_sync_open",
        skip(world, sensors),
        fields(sensors = sensors.len())
    )]
    pub fn open(world: W, sensors: Vec<Arc<dyn SensorSource>>, delta_seconds: f64) -> Result<Self> {
        if !(delta_seconds.is_finite() && delta_seconds > 0.0) {
            return Err(SyncError::config(format!(
                "delta_seconds must be a finite value > 0, got {delta_seconds}"
            )));
        }

        let mut seen = HashSet::from([WORLD_PRODUCER_ID]);
        for sensor in &sensors {
            if !seen.insert(sensor.sensor_id()) {
                return Err(SyncError::config(format!(
                    "duplicate producer id '{}'",
                    sensor.sensor_id()
                )));
            }
        }

        let original_settings = world
            .settings()
            .map_err(|e| SyncError::world_mode("failed to read world settings", e))?;

        let current_frame = match world.apply_settings(&WorldSettings::synchronous(delta_seconds)) {
            Ok(frame) => frame,
            Err(e) => {
                restore_best_effort(&world, &original_settings);
                return Err(SyncError::world_mode(
                    "world rejected synchronous fixed-step settings",
                    e,
                ));
            }
        };

        let world_queue = ProducerQueue::new(WORLD_PRODUCER_ID);
        let tick_callback = match world.on_tick(world_queue.callback()) {
            Ok(id) => id,
            Err(e) => {
                restore_best_effort(&world, &original_settings);
                return Err(e.into());
            }
        };

        let mut queues = Vec::with_capacity(sensors.len() + 1);
        queues.push(world_queue);
        for sensor in &sensors {
            let queue = ProducerQueue::new(sensor.sensor_id());
            sensor.listen(queue.callback());
            queues.push(queue);
        }

        info!(
            frame_id = current_frame,
            producers = queues.len(),
            "frame synchronizer opened"
        );

        Ok(Self {
            world,
            sensors,
            queues,
            original_settings,
            delta_seconds,
            tick_callback: Some(tick_callback),
            current_frame,
            stats: SyncStats::default(),
            closed: false,
        })
    }

    /// Compute one step and collect every producer's payload for it
    ///
    /// One deadline covers the whole step. On timeout the payloads already
    /// matched for this step are dropped; the next call starts from a new
    /// step.
    #[instrument(name = "frame_sync_advance", skip(self), fields(frame_id))]
    pub fn advance(&mut self, timeout: Duration) -> Result<SyncedTick> {
        if self.closed {
            return Err(SyncError::SessionClosed);
        }

        let frame_id = self.world.tick()?;
        self.current_frame = frame_id;
        tracing::Span::current().record("frame_id", frame_id);

        let started = Instant::now();
        let deadline = started + timeout;

        let mut payloads = Vec::with_capacity(self.queues.len());
        let mut missing = Vec::new();
        let mut meta = TickMeta::default();

        for queue in &mut self.queues {
            let mut counters = PopCounters::default();
            let popped = queue.pop_frame(frame_id, deadline, &mut counters);

            if counters.stale > 0 {
                meta.stale.push((queue.producer_id().to_string(), counters.stale));
            }
            meta.duplicates += counters.duplicates;
            meta.held_back += counters.held_back;

            match popped {
                Some(packet) => payloads.push(packet),
                None => missing.push(queue.producer_id().to_string()),
            }
        }

        self.stats.stale += meta.stale_total() as u64;
        self.stats.duplicates += meta.duplicates as u64;

        if !missing.is_empty() {
            self.stats.timeouts += 1;
            for (producer, count) in &meta.stale {
                observability::record_stale_payloads(producer, *count as u64);
            }
            observability::record_sync_timeout(&missing);

            let waited_ms = started.elapsed().as_millis() as u64;
            warn!(frame_id, waited_ms, missing = ?missing, "frame synchronization timed out");
            return Err(SyncError::Timeout {
                frame_id,
                waited_ms,
                missing,
            });
        }

        meta.latency_ms = started.elapsed().as_secs_f64() * 1000.0;
        self.stats.ticks += 1;
        observability::record_tick_metrics(&meta, frame_id);

        debug!(
            frame_id,
            latency_ms = meta.latency_ms,
            stale = meta.stale_total(),
            duplicates = meta.duplicates,
            "frame synchronized"
        );

        Ok(SyncedTick {
            frame_id,
            payloads,
            meta,
        })
    }

    /// Restore the original world settings and stop all producers
    ///
    /// Idempotent: only the first call touches the world.
    #[instrument(name = "frame_sync_close", skip(self), fields(frame_id = self.current_frame))]
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        if let Some(id) = self.tick_callback.take() {
            self.world.remove_on_tick(id);
        }
        for sensor in &self.sensors {
            sensor.stop();
        }

        self.world.apply_settings(&self.original_settings)?;

        info!(
            ticks = self.stats.ticks,
            timeouts = self.stats.timeouts,
            "frame synchronizer closed, world settings restored"
        );
        Ok(())
    }

    /// Identifier of the last computed step (the frame returned by the world
    /// when settings were applied, before the first `advance`)
    pub fn current_frame(&self) -> FrameId {
        self.current_frame
    }

    /// Fixed step applied to the world (seconds)
    pub fn delta_seconds(&self) -> f64 {
        self.delta_seconds
    }

    /// Producer ids, index-aligned with `SyncedTick::payloads`
    pub fn producer_ids(&self) -> Vec<&str> {
        self.queues.iter().map(ProducerQueue::producer_id).collect()
    }

    /// Payloads currently queued or held back, per producer
    pub fn queue_depths(&self) -> Vec<(&str, usize)> {
        self.queues
            .iter()
            .map(|q| (q.producer_id(), q.depth()))
            .collect()
    }

    pub fn stats(&self) -> SyncStats {
        self.stats
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl<W: SimWorld> Drop for FrameSynchronizer<W> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(error = %e, "failed to restore world settings on drop");
        }
    }
}

fn restore_best_effort<W: SimWorld>(world: &W, settings: &WorldSettings) {
    if let Err(e) = world.apply_settings(settings) {
        warn!(error = %e, "failed to restore original world settings");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{default_camera_rig, ContractError, FramePayload, PacketCallback};
    use sim_world::{CameraOptions, MockCamera, MockWorld, MockWorldConfig, ScriptedSource};

    const TIMEOUT: Duration = Duration::from_secs(2);

    fn world_at(initial_frame: FrameId) -> MockWorld {
        MockWorld::with_config(MockWorldConfig {
            initial_frame,
            ..Default::default()
        })
    }

    fn camera_rig(world: &MockWorld) -> Vec<Arc<dyn SensorSource>> {
        default_camera_rig(16, 12)
            .into_iter()
            .map(|config| {
                Arc::new(MockCamera::new(world, config, CameraOptions::default()))
                    as Arc<dyn SensorSource>
            })
            .collect()
    }

    #[test]
    fn test_n_advances_follow_world_frames() {
        let world = world_at(100);
        let sensors = camera_rig(&world);
        let mut sync = FrameSynchronizer::open(world.clone(), sensors, 0.1).unwrap();
        assert_eq!(sync.current_frame(), 101);

        for n in 1..=5u64 {
            let tick = sync.advance(TIMEOUT).unwrap();
            assert_eq!(tick.frame_id, 101 + n);
            assert_eq!(sync.current_frame(), world.frame());
            assert_eq!(tick.payloads.len(), 4);
            assert!(tick.payloads[0].snapshot().is_some());
            assert!(tick.payloads.iter().all(|p| p.frame_id == tick.frame_id));
            assert_eq!(tick.sensor_payloads().len(), 3);
        }

        assert_eq!(
            sync.producer_ids(),
            vec![WORLD_PRODUCER_ID, "rgb", "rgb_right", "rgb_left"]
        );
        assert_eq!(sync.stats().ticks, 5);
    }

    #[test]
    fn test_stale_payload_skipped_and_duplicate_drained() {
        // apply_settings -> 6, first tick -> 7
        let world = world_at(5);
        let source = Arc::new(ScriptedSource::new("cam"));
        let mut sync =
            FrameSynchronizer::open(world.clone(), vec![source.clone() as Arc<dyn SensorSource>], 0.1)
                .unwrap();

        let image = MockCamera::render(4, 4, 0);
        for frame in [5, 7, 7] {
            source.push_image(frame, image.clone());
        }

        let tick = sync.advance(TIMEOUT).unwrap();
        assert_eq!(tick.frame_id, 7);
        assert_eq!(tick.payloads[1].frame_id, 7);
        assert_eq!(tick.meta.stale, vec![("cam".to_string(), 1)]);
        assert_eq!(tick.meta.duplicates, 1);

        // Nothing left behind for the next step
        source.push_image(8, image);
        let tick = sync.advance(TIMEOUT).unwrap();
        assert_eq!(tick.frame_id, 8);
        assert_eq!(tick.meta.stale_total(), 0);
        assert_eq!(tick.meta.duplicates, 0);
    }

    #[test]
    fn test_future_payload_held_back() {
        let world = world_at(0);
        let source = Arc::new(ScriptedSource::new("cam"));
        let mut sync =
            FrameSynchronizer::open(world, vec![source.clone() as Arc<dyn SensorSource>], 0.1)
                .unwrap();

        // Frames 2 and 3 arrive early and out of order
        let image = MockCamera::render(4, 4, 0);
        source.push_image(3, image.clone());
        source.push_image(2, image);

        let tick = sync.advance(TIMEOUT).unwrap();
        assert_eq!(tick.frame_id, 2);
        assert_eq!(tick.meta.held_back, 1);

        let tick = sync.advance(TIMEOUT).unwrap();
        assert_eq!(tick.frame_id, 3);
        assert_eq!(tick.payloads[1].frame_id, 3);
    }

    #[test]
    fn test_timeout_names_missing_producer() {
        let world = world_at(0);
        let silent = Arc::new(ScriptedSource::new("silent"));
        let mut sync =
            FrameSynchronizer::open(world, vec![silent as Arc<dyn SensorSource>], 0.1).unwrap();

        let err = sync.advance(Duration::from_millis(30)).unwrap_err();
        match err {
            SyncError::Timeout {
                frame_id, missing, ..
            } => {
                assert_eq!(frame_id, 2);
                assert_eq!(missing, vec!["silent".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(sync.stats().timeouts, 1);

        // The session stays usable; the next step is a new frame
        let err = sync.advance(Duration::from_millis(10)).unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(sync.current_frame(), 3);
    }

    #[test]
    fn test_close_restores_settings_once() {
        let original = WorldSettings {
            synchronous_mode: false,
            fixed_delta_seconds: None,
            no_rendering_mode: true,
        };
        let world = MockWorld::with_config(MockWorldConfig {
            initial_settings: original,
            ..Default::default()
        });
        let sensors = camera_rig(&world);
        let mut sync = FrameSynchronizer::open(world.clone(), sensors.clone(), 0.05).unwrap();
        assert_eq!(world.settings().unwrap(), WorldSettings::synchronous(0.05));

        sync.advance(TIMEOUT).unwrap();
        sync.close().unwrap();
        sync.close().unwrap();

        assert_eq!(world.settings().unwrap(), original);
        assert_eq!(
            world.settings_history(),
            vec![WorldSettings::synchronous(0.05), original]
        );
        assert!(sensors.iter().all(|s| !s.is_listening()));
        assert_eq!(world.subscriber_count(), 0);
        assert!(matches!(
            sync.advance(TIMEOUT),
            Err(SyncError::SessionClosed)
        ));

        drop(sync);
        assert_eq!(world.settings_history().len(), 2);
    }

    #[test]
    fn test_drop_restores_settings() {
        let world = world_at(0);
        {
            let _sync = FrameSynchronizer::open(world.clone(), Vec::new(), 0.1).unwrap();
            assert!(world.settings().unwrap().synchronous_mode);
        }
        assert_eq!(world.settings().unwrap(), WorldSettings::default());
    }

    #[test]
    fn test_rejected_settings() {
        let world = MockWorld::with_config(MockWorldConfig {
            reject_synchronous: true,
            ..Default::default()
        });
        let err = FrameSynchronizer::open(world.clone(), Vec::new(), 0.1)
            .err()
            .unwrap();
        assert!(matches!(err, SyncError::WorldMode { .. }));
        // Best-effort restore re-applied the original settings
        assert_eq!(world.settings_history(), vec![WorldSettings::default()]);
        assert_eq!(world.subscriber_count(), 0);
    }

    #[test]
    fn test_invalid_open_parameters() {
        let world = world_at(0);
        assert!(matches!(
            FrameSynchronizer::open(world.clone(), Vec::new(), 0.0).err(),
            Some(SyncError::Config { .. })
        ));

        let sensors: Vec<Arc<dyn SensorSource>> = vec![
            Arc::new(ScriptedSource::new("cam")),
            Arc::new(ScriptedSource::new("cam")),
        ];
        assert!(matches!(
            FrameSynchronizer::open(world.clone(), sensors, 0.1).err(),
            Some(SyncError::Config { .. })
        ));
        assert!(world.settings_history().is_empty());
    }

    /// World whose tick always fails
    struct BrokenWorld;

    impl SimWorld for BrokenWorld {
        fn settings(&self) -> std::result::Result<WorldSettings, ContractError> {
            Ok(WorldSettings::default())
        }
        fn apply_settings(
            &self,
            _settings: &WorldSettings,
        ) -> std::result::Result<FrameId, ContractError> {
            Ok(0)
        }
        fn tick(&self) -> std::result::Result<FrameId, ContractError> {
            Err(ContractError::world_tick("server gone"))
        }
        fn on_tick(
            &self,
            _callback: PacketCallback,
        ) -> std::result::Result<TickCallbackId, ContractError> {
            Ok(1)
        }
        fn remove_on_tick(&self, _id: TickCallbackId) {}
    }

    #[test]
    fn test_tick_failure_surfaces_world_error() {
        let mut sync = FrameSynchronizer::open(BrokenWorld, Vec::new(), 0.1).unwrap();
        let err = sync.advance(TIMEOUT).unwrap_err();
        assert!(matches!(err, SyncError::World(ContractError::WorldTick { .. })));
        assert!(sync.close().is_ok());
    }

    #[test]
    fn test_world_payload_is_tick() {
        let world = world_at(0);
        let mut sync = FrameSynchronizer::open(world, Vec::new(), 0.1).unwrap();
        let tick = sync.advance(TIMEOUT).unwrap();
        assert_eq!(tick.payloads.len(), 1);
        assert!(matches!(tick.payloads[0].payload, FramePayload::Tick(_)));
        assert_eq!(tick.payload(WORLD_PRODUCER_ID).unwrap().frame_id, 2);
    }
}
