//! 图像与几何数据
//!
//! 相机传感器回调的原始载荷，以及遥测使用的三维量。

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// 图像数据
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageData {
    /// 图像宽度
    pub width: u32,

    /// 图像高度
    pub height: u32,

    /// 像素格式
    pub format: ImageFormat,

    /// 原始像素数据
    pub data: Bytes,
}

/// 图像格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageFormat {
    Rgb8,
    Rgba8,
    Bgra8,
}

impl ImageFormat {
    /// 每像素字节数
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            ImageFormat::Rgb8 => 3,
            ImageFormat::Rgba8 | ImageFormat::Bgra8 => 4,
        }
    }
}

impl ImageData {
    /// 期望的缓冲区长度 (width * height * bpp)
    pub fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * self.format.bytes_per_pixel()
    }

    /// 转换为紧凑 RGB (去掉 alpha, BGRA 交换 B/R)
    ///
    /// 缓冲区长度与声明尺寸不符时返回 None。
    pub fn to_rgb8(&self) -> Option<Vec<u8>> {
        if self.data.len() != self.expected_len() {
            return None;
        }

        let rgb = match self.format {
            ImageFormat::Rgb8 => self.data.to_vec(),
            ImageFormat::Rgba8 => self
                .data
                .chunks_exact(4)
                .flat_map(|px| [px[0], px[1], px[2]])
                .collect(),
            ImageFormat::Bgra8 => self
                .data
                .chunks_exact(4)
                .flat_map(|px| [px[2], px[1], px[0]])
                .collect(),
        };
        Some(rgb)
    }
}

/// 3D 向量
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// 欧氏长度
    pub fn length(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn to_array(self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }
}

/// 旋转 (pitch, yaw, roll) 单位：度
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rotation {
    pub pitch: f64,
    pub yaw: f64,
    pub roll: f64,
}

impl Rotation {
    pub fn to_array(self) -> [f64; 3] {
        [self.pitch, self.yaw, self.roll]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bgra_to_rgb() {
        let image = ImageData {
            width: 2,
            height: 1,
            format: ImageFormat::Bgra8,
            data: Bytes::from(vec![1, 2, 3, 255, 4, 5, 6, 255]),
        };
        assert_eq!(image.to_rgb8().unwrap(), vec![3, 2, 1, 6, 5, 4]);
    }

    #[test]
    fn test_rgba_drops_alpha() {
        let image = ImageData {
            width: 1,
            height: 1,
            format: ImageFormat::Rgba8,
            data: Bytes::from(vec![10, 20, 30, 40]),
        };
        assert_eq!(image.to_rgb8().unwrap(), vec![10, 20, 30]);
    }

    #[test]
    fn test_short_buffer_rejected() {
        let image = ImageData {
            width: 4,
            height: 4,
            format: ImageFormat::Rgb8,
            data: Bytes::from(vec![0u8; 10]),
        };
        assert!(image.to_rgb8().is_none());
    }

    #[test]
    fn test_vector_length() {
        assert!((Vector3::new(3.0, 4.0, 0.0).length() - 5.0).abs() < 1e-12);
    }
}
