// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 跳帧采样 (FrameSampler)
//!
//! 计数器只对 FrameChannel 实际投递的帧递增, 通道丢弃的帧不计数。
//! 第 n 帧在 `n % skip_factor == 0` 时被分析。

/// 按固定比例跳帧
#[derive(Debug, Clone)]
pub struct FrameSampler {
    skip_factor: u64,
    counter: u64,
}

impl FrameSampler {
    /// `skip_factor` 为 0 时按 1 处理 (分析每一帧)
    pub fn new(skip_factor: u32) -> Self {
        Self {
            skip_factor: u64::from(skip_factor.max(1)),
            counter: 0,
        }
    }

    /// 接收一帧, 返回该帧是否需要分析
    pub fn admit(&mut self) -> bool {
        self.counter += 1;
        self.counter % self.skip_factor == 0
    }

    /// 已接收的帧数
    pub fn received(&self) -> u64 {
        self.counter
    }

    pub fn skip_factor(&self) -> u64 {
        self.skip_factor
    }
}
