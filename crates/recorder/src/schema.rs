//! 录制数据集声明与元数据
//!
//! 每个数据集是一个按行增长的定长记录数组：
//! - 图像：`(rows, height, width, 3)`，u8
//! - 遥测：`(rows, 3)` 或 `(rows, 1)`，f32

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use contracts::TELEMETRY_FIELDS;

use crate::error::{RecorderError, Result};

/// 同步模式标签
pub const SYNCHRONIZATION_LABEL: &str = "syncd";

/// 图像通道布局标签
pub const CHANNEL_LAYOUT: &str = "RGB";

/// 默认录制帧率
pub const DEFAULT_FPS: f64 = 10.0;

/// 默认初始行数
pub const DEFAULT_INITIAL_CAPACITY: usize = 10;

/// 默认图像数据集 (中、右、左)
pub const DEFAULT_IMAGE_CHANNELS: [&str; 3] = ["CameraMiddle", "CameraRight", "CameraLeft"];

/// Manifest 格式版本
pub const MANIFEST_VERSION: u32 = 1;

/// 元素类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    U8,
    F32,
}

impl DType {
    /// 单个元素字节数
    pub fn size(self) -> usize {
        match self {
            DType::U8 => 1,
            DType::F32 => 4,
        }
    }
}

/// 数据集种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetKind {
    Image,
    Telemetry,
}

/// 单个数据集声明
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetSpec {
    /// 数据集名称，同时是文件名主干
    pub name: String,
    pub kind: DatasetKind,
    pub dtype: DType,
    /// 每行形状 (不含行维度)
    pub row_shape: Vec<usize>,
}

impl DatasetSpec {
    pub fn image(name: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            name: name.into(),
            kind: DatasetKind::Image,
            dtype: DType::U8,
            row_shape: vec![height as usize, width as usize, 3],
        }
    }

    pub fn telemetry(name: impl Into<String>, width: usize) -> Self {
        Self {
            name: name.into(),
            kind: DatasetKind::Telemetry,
            dtype: DType::F32,
            row_shape: vec![width],
        }
    }

    /// 每行元素数
    pub fn row_len(&self) -> usize {
        self.row_shape.iter().product()
    }

    /// 每行字节数
    pub fn row_bytes(&self) -> usize {
        self.row_len() * self.dtype.size()
    }

    /// 数据文件名
    pub fn file_name(&self) -> String {
        format!("{}.bin", self.name)
    }

    /// 带行维度的完整形状
    pub fn shape(&self, rows: usize) -> Vec<usize> {
        let mut shape = Vec::with_capacity(self.row_shape.len() + 1);
        shape.push(rows);
        shape.extend_from_slice(&self.row_shape);
        shape
    }
}

/// 会话元数据 (打开时写入一次)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingMetadata {
    pub sensor_width: u32,
    pub sensor_height: u32,
    pub simulation_synchronization_type: String,
    pub channels: String,
    pub fps: f64,
}

/// 录制目录中的 `manifest.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub version: u32,
    /// RFC 3339 创建时间
    pub created_at: String,
    pub metadata: RecordingMetadata,
    pub datasets: Vec<DatasetSpec>,
    /// 文件中已分配的行数
    pub capacity: usize,
    /// 实际写入的行数 (关闭时写入)
    pub rows: usize,
    /// 是否已正常关闭
    pub closed: bool,
}

/// 录制器打开参数
#[derive(Debug, Clone)]
pub struct RecorderOptions {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub initial_capacity: usize,
    /// 图像数据集名称
    pub image_channels: Vec<String>,
}

impl RecorderOptions {
    /// 默认三相机布局
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            fps: DEFAULT_FPS,
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
            image_channels: DEFAULT_IMAGE_CHANNELS.iter().map(|c| c.to_string()).collect(),
        }
    }

    pub fn with_fps(mut self, fps: f64) -> Self {
        self.fps = fps;
        self
    }

    pub fn with_initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }

    pub fn with_image_channels<I, S>(mut self, channels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.image_channels = channels.into_iter().map(Into::into).collect();
        self
    }

    /// 会话元数据
    pub fn metadata(&self) -> RecordingMetadata {
        RecordingMetadata {
            sensor_width: self.width,
            sensor_height: self.height,
            simulation_synchronization_type: SYNCHRONIZATION_LABEL.to_string(),
            channels: CHANNEL_LAYOUT.to_string(),
            fps: self.fps,
        }
    }

    /// 检查数据集命名：图像通道不能为空、不能重复，也不能占用遥测数据集名
    pub fn check_dataset_names(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for spec in self.datasets() {
            if spec.name.is_empty() {
                return Err(RecorderError::schema_mismatch(
                    "image_channels",
                    "empty dataset name",
                ));
            }
            if !seen.insert(spec.name.clone()) {
                return Err(RecorderError::schema_mismatch(
                    spec.name,
                    "duplicate dataset name",
                ));
            }
        }
        Ok(())
    }

    /// 所有数据集声明：图像在前，遥测按固定顺序在后
    pub fn datasets(&self) -> Vec<DatasetSpec> {
        self.image_channels
            .iter()
            .map(|channel| DatasetSpec::image(channel.clone(), self.width, self.height))
            .chain(
                TELEMETRY_FIELDS
                    .iter()
                    .map(|field| DatasetSpec::telemetry(field.name, field.width)),
            )
            .collect()
    }
}
