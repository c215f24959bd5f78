//! # Sync Engine
//!
//! Frame Synchronizer: steps a synchronous-mode world and collects, for every
//! step, the payload each producer tagged with that step's frame identifier.
//!
//! ## Usage
//!
//! ```ignore
//! use sync_engine::FrameSynchronizer;
//!
//! let mut sync = FrameSynchronizer::open(world, sensors, 0.1)?;
//! loop {
//!     let tick = sync.advance(Duration::from_secs(1))?;
//!     // tick.payloads[0] is the world tick, then one payload per sensor
//! }
//! sync.close()?;
//! ```

mod error;
mod queue;
mod synchronizer;

pub use error::{Result, SyncError};
pub use synchronizer::{FrameSynchronizer, SyncStats};

// Re-export contracts types
pub use contracts::{SyncedTick, TickMeta};
