// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! FFmpeg 采集 - 本地摄像头 (DirectShow / AVFoundation / V4L2) 与视频文件

use std::path::Path;
use std::thread;

use crossbeam_channel::{bounded, Receiver};
use ez_ffmpeg::core::context::null_output::create_null_output;
use ez_ffmpeg::filter::frame_pipeline_builder::FramePipelineBuilder;
use ez_ffmpeg::{AVMediaType, FfmpegContext, Input};
use image::RgbImage;
use tracing::{error, info};

use super::decode_filter::DecodeFilter;
use super::Capture;
use crate::error::AcquisitionError;

#[cfg(target_os = "windows")]
const CAMERA_FORMAT: &str = "dshow";
#[cfg(target_os = "macos")]
const CAMERA_FORMAT: &str = "avfoundation";
#[cfg(target_os = "linux")]
const CAMERA_FORMAT: &str = "v4l2";
#[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "linux")))]
const CAMERA_FORMAT: &str = "video4linux2";

/// 解码线程推送帧, `grab` 阻塞拉取
pub struct FfmpegCapture {
    name: String,
    frames: Receiver<RgbImage>,
}

impl FfmpegCapture {
    /// 打开本地摄像头
    pub fn camera(index: usize) -> Result<Self, AcquisitionError> {
        let name = format!("camera:{index}");
        let url = camera_url(index)?;
        info!("🔍 使用格式: {}, 输入: {}", CAMERA_FORMAT, url);
        Self::spawn(name, move || Input::new(url).set_format(CAMERA_FORMAT))
    }

    /// 打开视频文件
    pub fn file(path: &Path) -> Result<Self, AcquisitionError> {
        let name = path.display().to_string();
        let url = name.clone();
        Self::spawn(name, move || Input::new(url))
    }

    fn spawn<F>(name: String, input: F) -> Result<Self, AcquisitionError>
    where
        F: FnOnce() -> Input + Send + 'static,
    {
        // 解码器领先一帧, 丢帧策略由帧通道负责
        let (tx, rx) = bounded::<RgbImage>(1);
        let (ready_tx, ready_rx) = bounded::<Result<(), String>>(1);
        let filter = DecodeFilter::new(name.clone(), tx);

        thread::Builder::new()
            .name(format!("ffmpeg-{name}"))
            .spawn(move || {
                let pipe: FramePipelineBuilder = AVMediaType::AVMEDIA_TYPE_VIDEO.into();
                let pipe = pipe.filter("decode", Box::new(filter));
                let out = create_null_output().add_frame_pipeline(pipe);

                let ctx = match FfmpegContext::builder()
                    .input(input())
                    .filter_descs(["format=yuv420p"].into())
                    .output(out)
                    .build()
                {
                    Ok(ctx) => ctx,
                    Err(e) => {
                        let _ = ready_tx.send(Err(format!("build: {e}")));
                        return;
                    }
                };
                let sch = match ctx.start() {
                    Ok(sch) => sch,
                    Err(e) => {
                        let _ = ready_tx.send(Err(format!("start: {e}")));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(()));
                let _ = sch.wait();
            })
            .map_err(|e| AcquisitionError::open(&name, e))?;

        match ready_rx.recv() {
            Ok(Ok(())) => {
                info!("✅ FFmpeg 输入已连接: {}", name);
                Ok(Self { name, frames: rx })
            }
            Ok(Err(reason)) => {
                error!("❌ FFmpeg 打开失败 {}: {}", name, reason);
                Err(AcquisitionError::open(name, reason))
            }
            Err(_) => Err(AcquisitionError::open(name, "decoder thread exited")),
        }
    }
}

impl Capture for FfmpegCapture {
    fn grab(&mut self) -> Option<RgbImage> {
        // 解码线程结束时发送端随之关闭
        self.frames.recv().ok()
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(target_os = "windows")]
fn camera_url(index: usize) -> Result<String, AcquisitionError> {
    let devices = ez_ffmpeg::device::get_input_video_devices()
        .map_err(|e| AcquisitionError::open(format!("camera:{index}"), e))?;
    devices
        .into_iter()
        .nth(index)
        .map(|device| format!("video={device}"))
        .ok_or_else(|| AcquisitionError::open(format!("camera:{index}"), "no such device"))
}

#[cfg(target_os = "linux")]
fn camera_url(index: usize) -> Result<String, AcquisitionError> {
    Ok(format!("/dev/video{index}"))
}

#[cfg(not(any(target_os = "windows", target_os = "linux")))]
fn camera_url(index: usize) -> Result<String, AcquisitionError> {
    Ok(format!("{index}"))
}
