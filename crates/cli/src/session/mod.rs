//! Drive session: synchronizer + vehicle + recorder loop.

mod drive;
mod stats;

pub use drive::{DriveConfig, DriveSession};
pub use stats::DriveStats;
