//! SyncedTick - Frame Synchronizer output

use serde::{Deserialize, Serialize};

use crate::{FrameId, FramePacket};

/// Payloads of every producer for one simulation step
///
/// `payloads[0]` is the world tick, `payloads[i]` is the payload of the i-th
/// registered sensor. Every payload carries `frame_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncedTick {
    /// Step identifier returned by the world
    pub frame_id: FrameId,

    /// Producer payloads, index-aligned with registration order
    pub payloads: Vec<FramePacket>,

    /// Diagnostics for this step
    pub meta: TickMeta,
}

impl SyncedTick {
    /// Payload of the given producer
    pub fn payload(&self, producer_id: &str) -> Option<&FramePacket> {
        self.payloads.iter().find(|p| p.producer_id == producer_id)
    }

    /// Sensor payloads (everything after the world tick)
    pub fn sensor_payloads(&self) -> &[FramePacket] {
        self.payloads.get(1..).unwrap_or_default()
    }
}

/// Per-step synchronization diagnostics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TickMeta {
    /// Wall-clock time from `tick` to the last matched payload (ms)
    pub latency_ms: f64,

    /// Stale payloads discarded, per producer (only producers with > 0)
    pub stale: Vec<(String, u32)>,

    /// Duplicates of this frame drained after the match
    pub duplicates: u32,

    /// Payloads for later frames held back for the next step
    pub held_back: u32,
}

impl TickMeta {
    /// Total stale payloads discarded this step
    pub fn stale_total(&self) -> u32 {
        self.stale.iter().map(|(_, n)| n).sum()
    }
}
