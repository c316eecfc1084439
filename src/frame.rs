// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 视频帧 (Frame)
//!
//! 一帧 = 独占的 RGB 图像缓冲 + 单调递增的序号。
//! 所有权依次转移: FrameSource → FrameChannel → 分析线程, 不做复制。

use image::RgbImage;

/// 解码后的视频帧
#[derive(Debug)]
pub struct Frame {
    seq: u64,
    image: RgbImage,
}

impl Frame {
    pub fn new(seq: u64, image: RgbImage) -> Self {
        Self { seq, image }
    }

    /// 帧序号 (从1开始, 严格递增)
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn into_image(self) -> RgbImage {
        self.image
    }
}
