//! SimWorld trait - the simulated world as seen by the client
//!
//! Only the operations the frame synchronizer needs: settings exchange,
//! single-step advance and tick notifications.

use serde::{Deserialize, Serialize};

use crate::{ContractError, FrameId, PacketCallback};

/// Handle returned by `on_tick`, used to unregister the callback
pub type TickCallbackId = u64;

/// World stepping settings
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldSettings {
    /// Server waits for a client `tick` before computing the next step
    pub synchronous_mode: bool,

    /// Fixed simulated step (seconds); `None` = variable step
    pub fixed_delta_seconds: Option<f64>,

    /// Skip rendering on the server
    pub no_rendering_mode: bool,
}

impl WorldSettings {
    /// Fixed-step, client-driven settings with rendering enabled
    pub fn synchronous(delta_seconds: f64) -> Self {
        Self {
            synchronous_mode: true,
            fixed_delta_seconds: Some(delta_seconds),
            no_rendering_mode: false,
        }
    }
}

/// Simulated world handle
///
/// Methods take `&self`; implementations use interior mutability so a
/// handle can be cloned into the synchronizer and the host loop.
pub trait SimWorld: Send + Sync {
    /// Current settings
    fn settings(&self) -> Result<WorldSettings, ContractError>;

    /// Apply settings, returning the frame identifier current after the change
    fn apply_settings(&self, settings: &WorldSettings) -> Result<FrameId, ContractError>;

    /// Compute exactly one step, returning its frame identifier
    fn tick(&self) -> Result<FrameId, ContractError>;

    /// Register a callback invoked once per step with a `FramePayload::Tick`
    fn on_tick(&self, callback: PacketCallback) -> Result<TickCallbackId, ContractError>;

    /// Unregister a tick callback. Unknown ids are ignored.
    fn remove_on_tick(&self, id: TickCallbackId);
}
