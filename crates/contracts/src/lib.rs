//! # Contracts
//!
//! Frozen interface contracts shared by the synchronizer, the recorder and the
//! host loop. Business crates depend only on this crate, never on each other.
//!
//! ## Time Model
//! - The simulator's frame identifier (`FrameId`) is the primary clock
//! - Every payload is tagged with the frame during which it was produced
//! - Simulation time (seconds, f64) is carried for diagnostics only

mod blueprint;
mod error;
mod frame;
mod sensor;
mod sensor_source;
mod sync;
mod telemetry;
mod world;

pub use blueprint::*;
pub use error::*;
pub use frame::*;
pub use sensor::*;
pub use sensor_source::{PacketCallback, SensorSource};
pub use sync::*;
pub use telemetry::*;
pub use world::*;
