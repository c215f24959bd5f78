//! SensorSource trait - Sensor data source abstraction
//!
//! Unified interface for producers that push frame-tagged payloads from their
//! own delivery threads. Real simulator sensors and the in-process simulated
//! cameras implement the same API.

use std::sync::Arc;

use crate::FramePacket;

/// Producer callback type
///
/// Invoked on the producer's delivery thread, once per payload.
pub type PacketCallback = Arc<dyn Fn(FramePacket) + Send + Sync>;

/// Sensor data source trait
///
/// # Example
///
/// ```ignore
/// let sensor: Box<dyn SensorSource> = world.spawn_camera(config);
/// sensor.listen(Arc::new(|packet| {
///     println!("frame {} from {}", packet.frame_id, packet.producer_id);
/// }));
/// // ... use sensor ...
/// sensor.stop();
/// ```
pub trait SensorSource: Send + Sync {
    /// Get sensor ID
    fn sensor_id(&self) -> &str;

    /// Register data callback
    ///
    /// If already listening, repeated calls are ignored (no second callback).
    fn listen(&self, callback: PacketCallback);

    /// Stop listening
    fn stop(&self);

    /// Check if currently listening
    fn is_listening(&self) -> bool;
}
