//! FramePacket - producer output
//!
//! Every asynchronous producer (the world clock or an attached sensor) emits
//! `FramePacket`s tagged with the frame identifier of the step that produced them.

use serde::{Deserialize, Serialize};

use crate::ImageData;

/// Monotonically increasing simulation step identifier
pub type FrameId = u64;

/// Producer id used for the world's own tick stream
pub const WORLD_PRODUCER_ID: &str = "world";

/// Frame-tagged payload delivered by a producer callback
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FramePacket {
    /// Producer ID (`"world"` for the world clock, otherwise the sensor id)
    pub producer_id: String,

    /// Frame during which the payload was produced
    pub frame_id: FrameId,

    /// Simulation time (seconds) - diagnostics only
    pub timestamp: f64,

    /// Data payload
    pub payload: FramePayload,
}

impl FramePacket {
    /// Image payload, if this packet carries one
    pub fn image(&self) -> Option<&ImageData> {
        match &self.payload {
            FramePayload::Image(image) => Some(image),
            _ => None,
        }
    }

    /// World snapshot, if this packet is a world tick
    pub fn snapshot(&self) -> Option<&WorldSnapshot> {
        match &self.payload {
            FramePayload::Tick(snapshot) => Some(snapshot),
            _ => None,
        }
    }
}

/// Payload variants
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FramePayload {
    /// World tick notification
    Tick(WorldSnapshot),

    /// Camera image
    Image(ImageData),
}

/// World state reported once per step
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    /// Step identifier
    pub frame_id: FrameId,

    /// Simulated seconds since the episode started
    pub elapsed_seconds: f64,

    /// Simulated seconds covered by this step
    pub delta_seconds: f64,

    /// Wall-clock time of the step on the simulator host (seconds)
    pub platform_timestamp: f64,
}
