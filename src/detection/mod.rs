// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

/// 检测系统 (Detection System)
///
/// 检测器对流水线是外部组件: 一帧图像 → 一组带标签的检测结果。
/// - `Detector`:        统一检测接口
/// - `FnDetector`:      闭包适配器, 接入任意外部检测实现
/// - `Yolov8Detector`:  ONNX Runtime 后端 (需要 `onnx` 功能)
pub mod types;
#[cfg(feature = "onnx")]
pub mod yolov8;

pub use types::{non_max_suppression, Bbox, Detection};
#[cfg(feature = "onnx")]
pub use yolov8::Yolov8Detector;

use anyhow::Result;
use image::RgbImage;

/// 统一的检测器接口
///
/// 输入图像为分析分辨率下的画面, 返回的检测框位于同一坐标系,
/// 由流水线负责换算回原始分辨率。
pub trait Detector: Send {
    fn detect(&mut self, image: &RgbImage) -> Result<Vec<Detection>>;

    /// 检测器名称 (日志用)
    fn name(&self) -> &str {
        "detector"
    }
}

impl Detector for Box<dyn Detector> {
    fn detect(&mut self, image: &RgbImage) -> Result<Vec<Detection>> {
        (**self).detect(image)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// 闭包检测器
pub struct FnDetector<F> {
    name: String,
    f: F,
}

impl<F> FnDetector<F>
where
    F: FnMut(&RgbImage) -> Result<Vec<Detection>> + Send,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<F> Detector for FnDetector<F>
where
    F: FnMut(&RgbImage) -> Result<Vec<Detection>> + Send,
{
    fn detect(&mut self, image: &RgbImage) -> Result<Vec<Detection>> {
        (self.f)(image)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
