//! 录制读取
//!
//! 打开已关闭的录制目录，按行读取图像与遥测，导出 PNG。

use std::path::{Path, PathBuf};

use tracing::{debug, instrument};

use crate::error::{RecorderError, Result};
use crate::schema::{DatasetKind, DatasetSpec, Manifest, RecordingMetadata};
use crate::store::{self, DatasetFile};

/// 录制读取器
pub struct RecordingReader {
    path: PathBuf,
    manifest: Manifest,
    datasets: Vec<DatasetFile>,
}

impl RecordingReader {
    /// 打开录制目录
    ///
    /// 只读取 manifest 中 `rows` 范围内的数据，预分配的尾部忽略。
    #[instrument(name = "recording_reader_open", skip(path), fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let manifest = store::read_manifest(&path)?;

        let datasets = manifest
            .datasets
            .iter()
            .cloned()
            .map(|spec| DatasetFile::open_read(&path, spec, manifest.rows))
            .collect::<Result<Vec<_>>>()?;

        debug!(rows = manifest.rows, datasets = datasets.len(), "recording loaded");

        Ok(Self {
            path,
            manifest,
            datasets,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn metadata(&self) -> &RecordingMetadata {
        &self.manifest.metadata
    }

    /// 已写入的行数
    pub fn rows(&self) -> usize {
        self.manifest.rows
    }

    /// 数据集声明
    pub fn datasets(&self) -> &[DatasetSpec] {
        &self.manifest.datasets
    }

    /// 图像通道名称
    pub fn image_channels(&self) -> Vec<&str> {
        self.datasets()
            .iter()
            .filter(|d| d.kind == DatasetKind::Image)
            .map(|d| d.name.as_str())
            .collect()
    }

    /// 读取一行打包 RGB 图像
    pub fn image_row(&mut self, channel: &str, row: usize) -> Result<Vec<u8>> {
        let dataset = self.dataset(channel, DatasetKind::Image, row)?;
        dataset.read_row(row)
    }

    /// 读取一行遥测值
    pub fn telemetry_row(&mut self, field: &str, row: usize) -> Result<Vec<f32>> {
        let dataset = self.dataset(field, DatasetKind::Telemetry, row)?;
        Ok(store::decode_f32(&dataset.read_row(row)?))
    }

    /// 读取一列遥测 (每行一组值)
    pub fn telemetry_column(&mut self, field: &str) -> Result<Vec<Vec<f32>>> {
        (0..self.rows())
            .map(|row| self.telemetry_row(field, row))
            .collect()
    }

    /// 读取标量遥测列
    pub fn scalar_column(&mut self, field: &str) -> Result<Vec<f32>> {
        let column = self.telemetry_column(field)?;
        column
            .into_iter()
            .map(|values| match values.as_slice() {
                [value] => Ok(*value),
                _ => Err(RecorderError::schema_mismatch(
                    field,
                    format!("not a scalar field ({} values per row)", values.len()),
                )),
            })
            .collect()
    }

    /// 将某一行的所有图像导出为 PNG：`{out_dir}/{channel}_{row}.png`
    #[instrument(name = "recording_export_frame", skip(self, out_dir))]
    pub fn export_frame_png(&mut self, row: usize, out_dir: &Path) -> Result<Vec<PathBuf>> {
        std::fs::create_dir_all(out_dir)?;
        let (width, height) = (
            self.manifest.metadata.sensor_width,
            self.manifest.metadata.sensor_height,
        );

        let channels: Vec<String> = self
            .image_channels()
            .into_iter()
            .map(str::to_string)
            .collect();

        let mut written = Vec::with_capacity(channels.len());
        for channel in channels {
            let rgb = self.image_row(&channel, row)?;
            let path = out_dir.join(format!("{channel}_{row}.png"));
            image::save_buffer(&path, &rgb, width, height, image::ColorType::Rgb8)?;
            written.push(path);
        }

        debug!(files = written.len(), "frame exported");
        Ok(written)
    }

    fn dataset(&mut self, name: &str, kind: DatasetKind, row: usize) -> Result<&mut DatasetFile> {
        let rows = self.manifest.rows;
        if row >= rows {
            return Err(RecorderError::RowOutOfRange { row, rows });
        }
        self.datasets
            .iter_mut()
            .find(|d| d.spec().name == name && d.spec().kind == kind)
            .ok_or_else(|| RecorderError::UnknownDataset(name.to_string()))
    }
}
