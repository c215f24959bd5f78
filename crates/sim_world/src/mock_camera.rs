//! Mock camera
//!
//! Implements `SensorSource` for an RGB camera attached to a `MockWorld`.
//! One BGRA image is delivered per world step from a background thread,
//! optionally delayed by a random jitter or dropped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use bytes::Bytes;
use contracts::{
    CameraConfig, FramePacket, FramePayload, ImageData, ImageFormat, PacketCallback,
    SensorSource, WorldSnapshot,
};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, trace, warn};

use crate::MockWorld;

/// Delivery behaviour of a mock camera
#[derive(Debug, Clone, Default)]
pub struct CameraOptions {
    /// Upper bound of the random delay added before each delivery
    pub max_jitter: Duration,
    /// Probability in [0, 1] that a frame is never delivered
    pub drop_probability: f64,
    /// RNG seed; `None` seeds from the OS
    pub seed: Option<u64>,
}

/// Mock RGB camera
pub struct MockCamera {
    config: CameraConfig,
    options: CameraOptions,
    world: MockWorld,
    listening: Arc<AtomicBool>,
    subscription: Mutex<Option<u64>>,
}

impl MockCamera {
    /// Attach a camera to the world. Nothing is delivered until `listen`.
    pub fn new(world: &MockWorld, config: CameraConfig, options: CameraOptions) -> Self {
        Self {
            config,
            options,
            world: world.clone(),
            listening: Arc::new(AtomicBool::new(false)),
            subscription: Mutex::new(None),
        }
    }

    /// Camera configuration
    pub fn config(&self) -> &CameraConfig {
        &self.config
    }

    /// Render the synthetic BGRA frame for a world step
    ///
    /// Gradient shifted by the frame id so consecutive frames differ.
    pub fn render(width: u32, height: u32, frame_id: u64) -> ImageData {
        let shift = frame_id as u32;
        let mut data = Vec::with_capacity((width * height * 4) as usize);
        for y in 0..height {
            for x in 0..width {
                data.push(x.wrapping_add(shift) as u8); // B
                data.push(y.wrapping_add(shift) as u8); // G
                data.push(shift as u8); // R
                data.push(255); // A
            }
        }
        ImageData {
            width,
            height,
            format: ImageFormat::Bgra8,
            data: Bytes::from(data),
        }
    }

    fn make_packet(config: &CameraConfig, snapshot: &WorldSnapshot) -> FramePacket {
        FramePacket {
            producer_id: config.id.clone(),
            frame_id: snapshot.frame_id,
            timestamp: snapshot.elapsed_seconds,
            payload: FramePayload::Image(Self::render(
                config.width,
                config.height,
                snapshot.frame_id,
            )),
        }
    }
}

impl SensorSource for MockCamera {
    fn sensor_id(&self) -> &str {
        &self.config.id
    }

    fn listen(&self, callback: PacketCallback) {
        // Idempotent: if already listening, don't start again
        if self.listening.swap(true, Ordering::SeqCst) {
            return;
        }

        let (subscription, rx) = self.world.subscribe();
        *self.subscription.lock() = Some(subscription);

        let config = self.config.clone();
        let options = self.options.clone();
        let listening = self.listening.clone();
        let drop_probability = options.drop_probability.clamp(0.0, 1.0);

        let spawned = thread::Builder::new()
            .name(format!("mock-camera-{}", config.id))
            .spawn(move || {
                let mut rng = match options.seed {
                    Some(seed) => StdRng::seed_from_u64(seed),
                    None => StdRng::from_os_rng(),
                };

                debug!(
                    sensor_id = %config.id,
                    width = config.width,
                    height = config.height,
                    "mock camera started"
                );

                for snapshot in rx.iter() {
                    if !listening.load(Ordering::Relaxed) {
                        break;
                    }

                    if drop_probability > 0.0 && rng.random_bool(drop_probability) {
                        trace!(sensor_id = %config.id, frame_id = snapshot.frame_id, "frame dropped");
                        continue;
                    }

                    if !options.max_jitter.is_zero() {
                        let jitter_us = rng.random_range(0..=options.max_jitter.as_micros() as u64);
                        thread::sleep(Duration::from_micros(jitter_us));
                    }

                    callback(Self::make_packet(&config, &snapshot));
                }

                debug!(sensor_id = %config.id, "mock camera stopped");
            });

        if let Err(e) = spawned {
            warn!(sensor_id = %self.config.id, error = %e, "failed to start mock camera");
            self.stop();
        }
    }

    fn stop(&self) {
        self.listening.store(false, Ordering::SeqCst);
        if let Some(subscription) = self.subscription.lock().take() {
            self.world.unsubscribe(subscription);
        }
    }

    fn is_listening(&self) -> bool {
        self.listening.load(Ordering::Relaxed)
    }
}

impl Drop for MockCamera {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{default_camera_rig, SimWorld};
    use std::sync::atomic::AtomicU64;
    use std::sync::mpsc;

    fn camera_config() -> CameraConfig {
        default_camera_rig(8, 4).remove(0)
    }

    #[test]
    fn test_render_bgra() {
        let image = MockCamera::render(8, 4, 3);
        assert_eq!(image.data.len(), image.expected_len());
        // pixel (1, 0): B = 1 + 3, G = 0 + 3, R = 3
        assert_eq!(&image.data[4..8], &[4, 3, 3, 255]);
    }

    #[test]
    fn test_one_image_per_step() {
        let world = MockWorld::new();
        let camera = MockCamera::new(&world, camera_config(), CameraOptions::default());

        let (tx, rx) = mpsc::channel();
        camera.listen(Arc::new(move |packet| {
            let _ = tx.send(packet);
        }));

        let frames: Vec<_> = (0..3).map(|_| world.tick().unwrap()).collect();
        for expected in frames {
            let packet = rx.recv_timeout(Duration::from_secs(1)).unwrap();
            assert_eq!(packet.producer_id, "rgb");
            assert_eq!(packet.frame_id, expected);
            let image = packet.image().unwrap();
            assert_eq!((image.width, image.height), (8, 4));
        }

        camera.stop();
        assert!(!camera.is_listening());
        assert_eq!(world.subscriber_count(), 0);
    }

    #[test]
    fn test_idempotent_listen() {
        let world = MockWorld::new();
        let camera = MockCamera::new(&world, camera_config(), CameraOptions::default());

        let count = Arc::new(AtomicU64::new(0));
        let count1 = count.clone();
        let count2 = count.clone();

        camera.listen(Arc::new(move |_| {
            count1.fetch_add(1, Ordering::SeqCst);
        }));
        // Second call should be ignored
        camera.listen(Arc::new(move |_| {
            count2.fetch_add(100, Ordering::SeqCst);
        }));
        assert_eq!(world.subscriber_count(), 1);

        world.tick().unwrap();
        thread::sleep(Duration::from_millis(50));
        camera.stop();

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_always_drop() {
        let world = MockWorld::new();
        let camera = MockCamera::new(
            &world,
            camera_config(),
            CameraOptions {
                drop_probability: 1.0,
                seed: Some(7),
                ..Default::default()
            },
        );

        let (tx, rx) = mpsc::channel();
        camera.listen(Arc::new(move |packet| {
            let _ = tx.send(packet);
        }));
        world.tick().unwrap();
        world.tick().unwrap();

        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
    }
}
