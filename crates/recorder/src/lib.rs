//! # Recorder
//!
//! Time-Series Recorder: one row per recorded frame, appended to resizable
//! per-dataset files of a recording directory, plus a reader for closed
//! recordings.
//!
//! ## Usage
//!
//! ```ignore
//! use recorder::{ImageSet, TimeSeriesRecorder};
//!
//! let mut recorder = TimeSeriesRecorder::open(640, 480, "./_out/aggressive")?;
//! recorder.append(&images, &telemetry.to_record())?;
//! recorder.close()?;
//! ```

mod error;
mod reader;
mod recorder;
mod schema;
mod store;

pub use error::{RecorderError, Result};
pub use reader::RecordingReader;
pub use recorder::{AppendOutcome, ImageSet, TimeSeriesRecorder};
pub use schema::{
    DType, DatasetKind, DatasetSpec, Manifest, RecorderOptions, RecordingMetadata,
    CHANNEL_LAYOUT, DEFAULT_FPS, DEFAULT_IMAGE_CHANNELS, DEFAULT_INITIAL_CAPACITY,
    SYNCHRONIZATION_LABEL,
};
pub use store::MANIFEST_FILE;
