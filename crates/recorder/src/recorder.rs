//! Time-Series Recorder
//!
//! Appends one row per recorded frame to every declared dataset of a
//! recording directory.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use contracts::{ImageData, RecorderSettings, TelemetryRecord};
use tracing::{debug, info, instrument, warn};

use crate::error::{RecorderError, Result};
use crate::schema::{DatasetKind, Manifest, RecorderOptions, RecordingMetadata, MANIFEST_VERSION};
use crate::store::{self, DatasetFile};

/// Channel name -> image for one row
pub type ImageSet = BTreeMap<String, ImageData>;

/// Result of a successful append
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppendOutcome {
    /// Row written
    pub row: usize,
    /// Datasets grew by one row before the write
    pub capacity_grew: bool,
}

/// Recorder session over one recording directory
pub struct TimeSeriesRecorder {
    path: PathBuf,
    manifest: Manifest,
    datasets: Vec<DatasetFile>,
    write_index: usize,
    capacity: usize,
    closed: bool,
}

impl TimeSeriesRecorder {
    /// Create a recording with the default three-camera layout
    pub fn open(width: u32, height: u32, path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path, RecorderOptions::new(width, height))
    }

    /// Create a recording at `path`
    ///
    /// # Errors
    /// `SchemaMismatch` if two datasets would share a name. `StoreUnavailable`
    /// if the directory exists already or cannot be populated; a directory
    /// created by this call is removed again on failure.
    #[instrument(
        name = "recorder_open",
        skip(path, options),
        fields(path = %path.as_ref().display(), width = options.width, height = options.height)
    )]
    pub fn open_with(path: impl AsRef<Path>, options: RecorderOptions) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if options.width == 0 || options.height == 0 {
            return Err(RecorderError::store_unavailable(
                &path,
                format!("invalid image size {}x{}", options.width, options.height),
            ));
        }
        if options.initial_capacity == 0 {
            return Err(RecorderError::store_unavailable(
                &path,
                "initial capacity must be >= 1",
            ));
        }

        options.check_dataset_names()?;

        store::create_dir(&path)?;

        let capacity = options.initial_capacity;
        let (datasets, manifest) = match Self::create_layout(&path, &options, capacity) {
            Ok(layout) => layout,
            Err(e) => {
                if let Err(cleanup) = std::fs::remove_dir_all(&path) {
                    warn!(path = %path.display(), error = %cleanup, "failed to remove partial recording");
                }
                return Err(RecorderError::store_unavailable(&path, e.to_string()));
            }
        };

        info!(
            path = %path.display(),
            datasets = datasets.len(),
            capacity,
            "recording opened"
        );

        Ok(Self {
            path,
            manifest,
            datasets,
            write_index: 0,
            capacity,
            closed: false,
        })
    }

    /// Dataset files and the initial manifest inside a fresh directory
    fn create_layout(
        path: &Path,
        options: &RecorderOptions,
        capacity: usize,
    ) -> Result<(Vec<DatasetFile>, Manifest)> {
        let specs = options.datasets();
        let datasets = specs
            .iter()
            .cloned()
            .map(|spec| DatasetFile::create(path, spec, capacity))
            .collect::<Result<Vec<_>>>()?;

        let manifest = Manifest {
            version: MANIFEST_VERSION,
            created_at: chrono::Local::now().to_rfc3339(),
            metadata: options.metadata(),
            datasets: specs,
            capacity,
            rows: 0,
            closed: false,
        };
        store::write_manifest(path, &manifest)?;
        Ok((datasets, manifest))
    }

    /// Create a recording named `{style}[_{save_name}]_{YYYY_mm_dd_HH_MM_SS}`
    /// under the configured output directory
    ///
    /// A numeric suffix is appended if that name is already taken.
    pub fn open_timestamped(
        settings: &RecorderSettings,
        options: RecorderOptions,
    ) -> Result<Self> {
        let stamp = chrono::Local::now().format("%Y_%m_%d_%H_%M_%S");
        let base = settings
            .output_dir
            .join(format!("{}_{}", settings.recording_stem(), stamp));
        Self::open_with(store::unique_path(base), options)
    }

    /// Write one row to every dataset
    ///
    /// Every declared image channel and telemetry field must be present with
    /// the declared shape; extra telemetry fields are ignored. On
    /// `SchemaMismatch` nothing is written and `write_index` is unchanged.
    #[instrument(name = "recorder_append", skip_all, fields(row = self.write_index))]
    pub fn append(
        &mut self,
        images: &ImageSet,
        telemetry: &TelemetryRecord,
    ) -> Result<AppendOutcome> {
        if self.closed {
            return Err(RecorderError::SessionClosed);
        }

        let rows = self.encode_row(images, telemetry)?;

        let capacity_grew = self.write_index == self.capacity;
        if capacity_grew {
            let grown = self.capacity + 1;
            for dataset in &mut self.datasets {
                dataset.resize(grown)?;
            }
            self.capacity = grown;
            debug!(capacity = grown, "datasets grown by one row");
        }

        let row = self.write_index;
        for (dataset, bytes) in self.datasets.iter_mut().zip(&rows) {
            dataset.write_row(row, bytes)?;
        }
        self.write_index += 1;

        observability::record_row_written(capacity_grew);

        Ok(AppendOutcome { row, capacity_grew })
    }

    /// Validate the inputs and encode one row per dataset, in dataset order
    fn encode_row(&self, images: &ImageSet, telemetry: &TelemetryRecord) -> Result<Vec<Vec<u8>>> {
        let (width, height) = (
            self.manifest.metadata.sensor_width,
            self.manifest.metadata.sensor_height,
        );

        self.datasets
            .iter()
            .map(|dataset| {
                let spec = dataset.spec();
                match spec.kind {
                    DatasetKind::Image => {
                        let image = images.get(&spec.name).ok_or_else(|| {
                            RecorderError::schema_mismatch(&spec.name, "missing image channel")
                        })?;
                        if (image.width, image.height) != (width, height) {
                            return Err(RecorderError::schema_mismatch(
                                &spec.name,
                                format!(
                                    "expected {width}x{height} image, got {}x{}",
                                    image.width, image.height
                                ),
                            ));
                        }
                        image.to_rgb8().ok_or_else(|| {
                            RecorderError::schema_mismatch(
                                &spec.name,
                                format!(
                                    "image buffer holds {} bytes, expected {}",
                                    image.data.len(),
                                    image.expected_len()
                                ),
                            )
                        })
                    }
                    DatasetKind::Telemetry => {
                        let value = telemetry.get(&spec.name).ok_or_else(|| {
                            RecorderError::schema_mismatch(&spec.name, "missing telemetry field")
                        })?;
                        let expected = spec.row_len();
                        if value.width() != expected {
                            return Err(RecorderError::schema_mismatch(
                                &spec.name,
                                format!("expected {expected} value(s), got {}", value.width()),
                            ));
                        }
                        let values: Vec<f32> =
                            value.as_slice().iter().map(|v| *v as f32).collect();
                        Ok(store::encode_f32(&values))
                    }
                }
            })
            .collect()
    }

    /// Record the rows written and release the files
    ///
    /// Idempotent once it has succeeded. A failed close leaves the session
    /// open, so a later call (or `Drop`) tries again and reports again.
    #[instrument(name = "recorder_close", skip(self), fields(rows = self.write_index))]
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }

        for dataset in &self.datasets {
            dataset.sync()?;
        }

        let mut manifest = self.manifest.clone();
        manifest.capacity = self.capacity;
        manifest.rows = self.write_index;
        manifest.closed = true;
        store::write_manifest(&self.path, &manifest)?;

        self.manifest = manifest;
        self.datasets.clear();
        self.closed = true;

        info!(
            path = %self.path.display(),
            rows = self.write_index,
            capacity = self.capacity,
            "recording closed"
        );
        Ok(())
    }

    /// Rows written so far (index of the next row)
    pub fn write_index(&self) -> usize {
        self.write_index
    }

    /// Rows allocated in every dataset
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn metadata(&self) -> &RecordingMetadata {
        &self.manifest.metadata
    }

    /// Declared image channels, in dataset order
    pub fn image_channels(&self) -> impl Iterator<Item = &str> {
        self.manifest
            .datasets
            .iter()
            .filter(|d| d.kind == DatasetKind::Image)
            .map(|d| d.name.as_str())
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Drop for TimeSeriesRecorder {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(path = %self.path.display(), error = %e, "failed to close recording on drop");
        }
    }
}
