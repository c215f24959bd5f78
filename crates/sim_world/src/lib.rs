//! # Sim World
//!
//! In-process simulated world for development and tests without a simulator
//! server.
//!
//! Provides:
//! - `MockWorld`: a `SimWorld` whose steps are computed on `tick`
//! - `MockCamera`: an RGB camera attached to a `MockWorld`
//! - `ScriptedSource`: a producer whose payloads are pushed by the caller
//! - `MockVehicle`: deterministic ego-vehicle telemetry

mod mock_camera;
mod mock_vehicle;
mod mock_world;
mod scripted;

pub use mock_camera::{CameraOptions, MockCamera};
pub use mock_vehicle::MockVehicle;
pub use mock_world::{MockWorld, MockWorldConfig};
pub use scripted::ScriptedSource;
