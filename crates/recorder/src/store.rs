//! Recording directory store
//!
//! ```text
//! <recording>/
//!   manifest.json
//!   CameraMiddle.bin     rows x height x width x 3, u8
//!   steer.bin            rows x 1, f32 little-endian
//!   ...
//! ```
//!
//! Every dataset file is pre-allocated to `capacity` rows and resized in place.

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::error::{RecorderError, Result};
use crate::schema::{DatasetSpec, Manifest};

pub const MANIFEST_FILE: &str = "manifest.json";

/// One resizable dataset file
pub(crate) struct DatasetFile {
    spec: DatasetSpec,
    file: File,
    row_bytes: u64,
}

impl DatasetFile {
    /// Create the file with `capacity` zeroed rows
    pub fn create(dir: &Path, spec: DatasetSpec, capacity: usize) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(dir.join(spec.file_name()))?;
        let row_bytes = spec.row_bytes() as u64;
        file.set_len(row_bytes * capacity as u64)?;
        Ok(Self {
            spec,
            file,
            row_bytes,
        })
    }

    /// Open an existing file read-only, checking it holds at least `rows` rows
    pub fn open_read(dir: &Path, spec: DatasetSpec, rows: usize) -> Result<Self> {
        let path = dir.join(spec.file_name());
        let file = File::open(&path)
            .map_err(|e| RecorderError::store_unavailable(&path, e.to_string()))?;
        let row_bytes = spec.row_bytes() as u64;
        let len = file.metadata()?.len();
        if len < row_bytes * rows as u64 {
            return Err(RecorderError::store_unavailable(
                &path,
                format!("holds {len} bytes, expected at least {}", row_bytes * rows as u64),
            ));
        }
        Ok(Self {
            spec,
            file,
            row_bytes,
        })
    }

    pub fn spec(&self) -> &DatasetSpec {
        &self.spec
    }

    /// Resize to `rows` rows
    pub fn resize(&mut self, rows: usize) -> Result<()> {
        self.file.set_len(self.row_bytes * rows as u64)?;
        Ok(())
    }

    pub fn write_row(&mut self, row: usize, bytes: &[u8]) -> Result<()> {
        debug_assert_eq!(bytes.len() as u64, self.row_bytes);
        self.file.seek(SeekFrom::Start(self.row_bytes * row as u64))?;
        self.file.write_all(bytes)?;
        Ok(())
    }

    pub fn read_row(&mut self, row: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; self.row_bytes as usize];
        self.file.seek(SeekFrom::Start(self.row_bytes * row as u64))?;
        self.file.read_exact(&mut buf)?;
        Ok(buf)
    }

    pub fn sync(&self) -> Result<()> {
        self.file.sync_all()?;
        Ok(())
    }
}

/// Create the recording directory; fails if it already exists
pub(crate) fn create_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| RecorderError::store_unavailable(path, e.to_string()))?;
    }
    fs::create_dir(path).map_err(|e| RecorderError::store_unavailable(path, e.to_string()))
}

/// Write `manifest.json`, replacing it atomically
pub(crate) fn write_manifest(dir: &Path, manifest: &Manifest) -> Result<()> {
    let tmp = dir.join(format!("{MANIFEST_FILE}.tmp"));
    let json = serde_json::to_vec_pretty(manifest)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    {
        let mut file = File::create(&tmp)?;
        file.write_all(&json)?;
        file.sync_all()?;
    }
    fs::rename(&tmp, dir.join(MANIFEST_FILE))?;
    Ok(())
}

/// Read `manifest.json`
pub(crate) fn read_manifest(dir: &Path) -> Result<Manifest> {
    let path = dir.join(MANIFEST_FILE);
    let content = fs::read(&path)
        .map_err(|e| RecorderError::store_unavailable(&path, e.to_string()))?;
    serde_json::from_slice(&content)
        .map_err(|e| RecorderError::store_unavailable(&path, format!("invalid manifest: {e}")))
}

/// First free path among `base`, `base_1`, `base_2`, ...
pub(crate) fn unique_path(base: PathBuf) -> PathBuf {
    if !base.exists() {
        return base;
    }
    let name = base
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    (1..)
        .map(|n| base.with_file_name(format!("{name}_{n}")))
        .find(|candidate| !candidate.exists())
        .unwrap_or(base)
}

/// Encode f32 values as little-endian bytes
///
/// Recordings are little-endian on disk whatever the host byte order.
pub(crate) fn encode_f32(values: &[f32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Decode little-endian bytes into f32 values
pub(crate) fn decode_f32(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}
