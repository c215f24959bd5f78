//! SessionBlueprint - Config Loader 输出
//!
//! 描述一次驾驶会话：仿真器连接与步长、相机布局、录制设置。

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// 配置版本
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// 完整的会话配置蓝图
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionBlueprint {
    /// 配置版本
    #[serde(default)]
    pub version: ConfigVersion,

    /// 世界设置
    #[serde(default)]
    pub world: WorldConfig,

    /// 录制相机列表 (为空时使用默认三相机布局)
    #[serde(default)]
    pub cameras: Vec<CameraConfig>,

    /// 录制设置
    #[serde(default)]
    pub recorder: RecorderSettings,
}

/// 世界配置：服务器地址、帧率、超时
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldConfig {
    /// 仿真服务器地址
    #[serde(default = "default_host")]
    pub host: String,

    /// 仿真服务器端口
    #[serde(default = "default_port")]
    pub port: u16,

    /// 固定步长帧率 (Hz)，必须 > 0
    #[serde(default = "default_fps")]
    pub fps: f64,

    /// 单次 tick 等待所有传感器的超时 (毫秒)
    #[serde(default = "default_tick_timeout_ms")]
    pub tick_timeout_ms: u64,

    /// 模拟世界的起始帧号
    #[serde(default)]
    pub initial_frame: u64,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            fps: default_fps(),
            tick_timeout_ms: default_tick_timeout_ms(),
            initial_frame: 0,
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    2000
}

fn default_fps() -> f64 {
    10.0
}

fn default_tick_timeout_ms() -> u64 {
    1000
}

/// RGB 相机配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraConfig {
    /// 唯一标识符
    pub id: String,

    /// 录制数据集名称 (e.g., "CameraMiddle")
    pub channel: String,

    /// 图像宽度 (像素)
    #[serde(default = "default_cam_width")]
    pub width: u32,

    /// 图像高度 (像素)
    #[serde(default = "default_cam_height")]
    pub height: u32,

    /// 视场角 (度)
    #[serde(default = "default_fov")]
    pub fov: f64,
}

fn default_cam_width() -> u32 {
    640
}

fn default_cam_height() -> u32 {
    480
}

fn default_fov() -> f64 {
    90.0
}

/// 驾驶风格，作为录制文件名前缀
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrivingStyle {
    #[default]
    Aggressive,
    Cautious,
}

impl DrivingStyle {
    pub fn as_str(self) -> &'static str {
        match self {
            DrivingStyle::Aggressive => "aggressive",
            DrivingStyle::Cautious => "cautious",
        }
    }
}

/// 录制设置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecorderSettings {
    /// 启动时是否开始录制
    #[serde(default)]
    pub enabled: bool,

    /// 输出目录
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// 文件名 (可选)，拼接在驾驶风格之后
    #[serde(default)]
    pub save_name: Option<String>,

    /// 驾驶风格
    #[serde(default)]
    pub style: DrivingStyle,

    /// 数据集初始行数
    #[serde(default = "default_initial_capacity")]
    pub initial_capacity: usize,
}

impl Default for RecorderSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            output_dir: default_output_dir(),
            save_name: None,
            style: DrivingStyle::default(),
            initial_capacity: default_initial_capacity(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./_out")
}

fn default_initial_capacity() -> usize {
    10
}

impl RecorderSettings {
    /// 录制文件名主干：`{style}` 或 `{style}_{save_name}`
    pub fn recording_stem(&self) -> String {
        match &self.save_name {
            Some(name) if !name.is_empty() => format!("{}_{}", self.style.as_str(), name),
            _ => self.style.as_str().to_string(),
        }
    }
}

/// 默认三相机布局 (中、右、左)
pub fn default_camera_rig(width: u32, height: u32) -> Vec<CameraConfig> {
    [
        ("rgb", "CameraMiddle"),
        ("rgb_right", "CameraRight"),
        ("rgb_left", "CameraLeft"),
    ]
    .into_iter()
    .map(|(id, channel)| CameraConfig {
        id: id.to_string(),
        channel: channel.to_string(),
        width,
        height,
        fov: default_fov(),
    })
    .collect()
}

impl SessionBlueprint {
    /// 固定步长 (秒)
    pub fn delta_seconds(&self) -> f64 {
        1.0 / self.world.fps
    }

    /// 单次 tick 超时
    pub fn tick_timeout(&self) -> Duration {
        Duration::from_millis(self.world.tick_timeout_ms)
    }

    /// 实际生效的相机列表
    pub fn effective_cameras(&self) -> Vec<CameraConfig> {
        if self.cameras.is_empty() {
            default_camera_rig(default_cam_width(), default_cam_height())
        } else {
            self.cameras.clone()
        }
    }

    /// 录制图像尺寸 (取第一个相机)
    pub fn sensor_size(&self) -> (u32, u32) {
        self.effective_cameras()
            .first()
            .map(|cam| (cam.width, cam.height))
            .unwrap_or((default_cam_width(), default_cam_height()))
    }
}

impl Default for SessionBlueprint {
    fn default() -> Self {
        Self {
            version: ConfigVersion::V1,
            world: WorldConfig::default(),
            cameras: Vec::new(),
            recorder: RecorderSettings::default(),
        }
    }
}
