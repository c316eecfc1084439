// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

/// FFmpeg解码过滤器: YUV420P帧 → RgbImage, 交给采集句柄
use std::time::Instant;

use crossbeam_channel::Sender;
use ez_ffmpeg::filter::frame_filter::FrameFilter;
use ez_ffmpeg::filter::frame_filter_context::FrameFilterContext;
use ez_ffmpeg::{AVMediaType, Frame};
use image::RgbImage;
use tracing::{debug, info, warn};

const MAX_DIMENSION: u32 = 8192;

#[derive(Clone)]
pub struct DecodeFilter {
    name: String,
    frames: Sender<RgbImage>,
    decoded: usize,
    dropped: usize,
    last: Instant,
}

impl DecodeFilter {
    pub fn new(name: impl Into<String>, frames: Sender<RgbImage>) -> Self {
        Self {
            name: name.into(),
            frames,
            decoded: 0,
            dropped: 0,
            last: Instant::now(),
        }
    }

    fn drop_frame(&mut self, why: &str) -> Result<Option<Frame>, String> {
        self.dropped += 1;
        if self.dropped <= 10 {
            warn!("⚠️ {} 丢弃帧: {}", self.name, why);
        }
        Ok(None)
    }
}

impl FrameFilter for DecodeFilter {
    fn media_type(&self) -> AVMediaType {
        AVMediaType::AVMEDIA_TYPE_VIDEO
    }

    fn init(&mut self, _ctx: &FrameFilterContext) -> Result<(), String> {
        info!("✅ 解码线程启动: {}", self.name);
        Ok(())
    }

    fn filter_frame(
        &mut self,
        frame: Frame,
        _ctx: &FrameFilterContext,
    ) -> Result<Option<Frame>, String> {
        let image = unsafe {
            if frame.as_ptr().is_null() || frame.is_empty() || frame.is_corrupt() {
                return self.drop_frame("空帧/损坏帧");
            }
            let raw = &*frame.as_ptr();
            let (w, h) = (raw.width as u32, raw.height as u32);
            if w == 0 || h == 0 || w > MAX_DIMENSION || h > MAX_DIMENSION {
                return self.drop_frame("非法分辨率");
            }

            let (y_plane, u_plane, v_plane) = (raw.data[0], raw.data[1], raw.data[2]);
            let y_stride = raw.linesize[0] as usize;
            let uv_stride = raw.linesize[1] as usize;
            if y_plane.is_null() || u_plane.is_null() || v_plane.is_null() {
                return self.drop_frame("YUV指针为空");
            }
            if y_stride < w as usize || uv_stride < (w as usize).div_ceil(2) {
                return self.drop_frame("步长异常");
            }

            let mut buffer = vec![0u8; (w * h * 3) as usize];
            yuv420p_to_rgb(
                y_plane,
                u_plane,
                v_plane,
                y_stride,
                uv_stride,
                &mut buffer,
                w as usize,
                h as usize,
            );
            match RgbImage::from_raw(w, h, buffer) {
                Some(img) => img,
                None => return self.drop_frame("缓冲区大小不符"),
            }
        };

        self.decoded += 1;
        if self.last.elapsed().as_secs_f64() >= 1.0 {
            debug!(
                "📺 解码统计: {} | {:.1}fps | 丢弃{}",
                self.name,
                self.decoded as f64 / self.last.elapsed().as_secs_f64(),
                self.dropped
            );
            self.decoded = 0;
            self.last = Instant::now();
        }

        // 采集句柄已关闭 → 终止解码
        self.frames
            .send(image)
            .map_err(|_| "capture closed".to_string())?;
        Ok(Some(frame))
    }

    fn uninit(&mut self, _ctx: &FrameFilterContext) {
        info!("✅ 解码线程退出: {}", self.name);
    }
}

/// YUV420P → 紧凑 RGB24 (BT.601 整数近似)
#[allow(clippy::too_many_arguments)]
unsafe fn yuv420p_to_rgb(
    y_plane: *const u8,
    u_plane: *const u8,
    v_plane: *const u8,
    y_stride: usize,
    uv_stride: usize,
    buffer: &mut [u8],
    width: usize,
    height: usize,
) {
    let mut out = 0;
    for row in 0..height {
        let y_row = row * y_stride;
        let uv_row = (row >> 1) * uv_stride;
        for x in 0..width {
            let y = *y_plane.add(y_row + x) as i32;
            let u = *u_plane.add(uv_row + (x >> 1)) as i32 - 128;
            let v = *v_plane.add(uv_row + (x >> 1)) as i32 - 128;

            buffer[out] = (y + ((v * 179) >> 7)).clamp(0, 255) as u8;
            buffer[out + 1] = (y - ((u * 44) >> 7) - ((v * 91) >> 7)).clamp(0, 255) as u8;
            buffer[out + 2] = (y + ((u * 227) >> 7)).clamp(0, 255) as u8;
            out += 3;
        }
    }
}
