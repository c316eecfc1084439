// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

/// 视频输入系统 (Video Input System)
///
/// 采集线程独占采集句柄, 逐帧拉取并编号:
/// - ImageSequence: 图片目录 (录制片段)
/// - AnimatedGif:   GIF 动图
/// - FfmpegCapture: 本地摄像头 / 任意视频文件 (需要 `ffmpeg` 功能)
pub mod gif;
pub mod sequence;

#[cfg(feature = "ffmpeg")]
pub mod decode_filter;
#[cfg(feature = "ffmpeg")]
pub mod ffmpeg;

pub use gif::AnimatedGif;
pub use sequence::ImageSequence;

#[cfg(feature = "ffmpeg")]
pub use ffmpeg::FfmpegCapture;

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use image::RgbImage;
use tracing::{debug, info};

use crate::channel::Packet;
use crate::error::AcquisitionError;
use crate::frame::Frame;

/// 输入源: 摄像头索引或文件路径
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    Camera(usize),
    File(PathBuf),
}

impl FromStr for InputSource {
    type Err = std::convert::Infallible;

    /// 纯数字 → 摄像头索引, 其余 → 文件路径
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(index) = s.parse() {
                return Ok(InputSource::Camera(index));
            }
        }
        Ok(InputSource::File(PathBuf::from(s)))
    }
}

impl fmt::Display for InputSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputSource::Camera(index) => write!(f, "camera:{}", index),
            InputSource::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// 采集后端: 按原生节奏拉取解码后的画面
///
/// 返回 `None` 表示流已结束 (文件读完或设备断开)。
pub trait Capture {
    fn grab(&mut self) -> Option<RgbImage>;

    fn name(&self) -> &str;
}

/// 帧源: 独占采集句柄, 为每一帧分配序号
pub struct FrameSource {
    capture: Box<dyn Capture>,
    next_seq: u64,
    ended: bool,
}

impl FrameSource {
    /// 打开输入源, 句柄无法打开时返回 `AcquisitionError`
    pub fn open(source: &InputSource) -> Result<Self, AcquisitionError> {
        let capture: Box<dyn Capture> = match source {
            InputSource::Camera(index) => open_camera(*index)?,
            InputSource::File(path) => {
                if !path.exists() {
                    return Err(AcquisitionError::open(
                        source.to_string(),
                        "no such file or directory",
                    ));
                }
                if path.is_dir() {
                    Box::new(ImageSequence::open(path)?)
                } else if has_extension(path, &["gif"]) {
                    Box::new(AnimatedGif::open(path)?)
                } else {
                    open_video_file(path)?
                }
            }
        };
        info!("📹 输入源已打开: {} ({})", source, capture.name());
        Ok(Self::from_capture(capture))
    }

    /// 使用自定义采集后端
    pub fn from_capture(capture: Box<dyn Capture>) -> Self {
        Self {
            capture,
            next_seq: 1,
            ended: false,
        }
    }

    /// 拉取下一帧; 读取失败视为流结束, 之后总是返回 `EndOfStream`
    pub fn next(&mut self) -> Packet {
        if self.ended {
            return Packet::EndOfStream;
        }
        match self.capture.grab() {
            Some(image) => {
                let frame = Frame::new(self.next_seq, image);
                self.next_seq += 1;
                Packet::Frame(frame)
            }
            None => {
                debug!("📺 {} 流结束, 共 {} 帧", self.capture.name(), self.produced());
                self.ended = true;
                Packet::EndOfStream
            }
        }
    }

    /// 已产生的帧数
    pub fn produced(&self) -> u64 {
        self.next_seq - 1
    }

    pub fn name(&self) -> &str {
        self.capture.name()
    }
}

pub(crate) fn has_extension(path: &std::path::Path, exts: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| exts.iter().any(|x| e.eq_ignore_ascii_case(x)))
        .unwrap_or(false)
}

#[cfg(feature = "ffmpeg")]
fn open_camera(index: usize) -> Result<Box<dyn Capture>, AcquisitionError> {
    Ok(Box::new(FfmpegCapture::camera(index)?))
}

#[cfg(not(feature = "ffmpeg"))]
fn open_camera(index: usize) -> Result<Box<dyn Capture>, AcquisitionError> {
    Err(AcquisitionError::Unsupported(format!(
        "camera:{index} (built without the `ffmpeg` feature)"
    )))
}

#[cfg(feature = "ffmpeg")]
fn open_video_file(path: &std::path::Path) -> Result<Box<dyn Capture>, AcquisitionError> {
    Ok(Box::new(FfmpegCapture::file(path)?))
}

#[cfg(not(feature = "ffmpeg"))]
fn open_video_file(path: &std::path::Path) -> Result<Box<dyn Capture>, AcquisitionError> {
    Err(AcquisitionError::Unsupported(format!(
        "{} (video files other than GIF need the `ffmpeg` feature)",
        path.display()
    )))
}
