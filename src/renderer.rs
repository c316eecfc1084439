// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 叠加层渲染 (Renderer)
//!
//! 在帧的副本上绘制车辆数与信号灯时长, 原帧不变。

use std::path::Path;

use ab_glyph::{FontArc, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use tracing::{debug, warn};

use crate::config::PipelineConfig;
use crate::detection::Detection;
use crate::frame::Frame;
use crate::signal::SignalDuration;

const TEXT_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const PANEL_COLOR: Rgb<u8> = Rgb([0, 0, 0]);
const BOX_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const TEXT_SCALE: f32 = 24.0;
const MARGIN: i32 = 10;
const LINE_GAP: i32 = 6;
/// 字体解析失败时的面板尺寸
const FALLBACK_PANEL: (u32, u32) = (240, 64);

/// 内置字体 (DejaVu Sans), 未配置字体或配置字体无法加载时使用
const BUNDLED_FONT: &[u8] = include_bytes!("../assets/font/DejaVuSans.ttf");

pub struct Renderer {
    font: Option<FontArc>,
    draw_detections: bool,
}

impl Renderer {
    /// `font` 为 None 时使用内置字体
    pub fn new(font: Option<FontArc>) -> Self {
        Self {
            font: font.or_else(bundled_font),
            draw_detections: true,
        }
    }

    /// 按配置加载字体, 失败时回退到内置字体
    pub fn from_config(config: &PipelineConfig) -> Self {
        let font = config
            .font_path
            .as_deref()
            .and_then(load_font)
            .or_else(bundled_font);
        Self {
            font,
            draw_detections: config.draw_detections,
        }
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    /// 返回带叠加层的新帧 (序号不变)
    pub fn render(&self, frame: &Frame, count: usize, duration: SignalDuration) -> Frame {
        self.render_with_detections(frame, count, duration, &[])
    }

    /// 同 `render`, 并框出计入的车辆
    pub fn render_with_detections(
        &self,
        frame: &Frame,
        count: usize,
        duration: SignalDuration,
        vehicles: &[&Detection],
    ) -> Frame {
        let mut canvas = frame.image().clone();

        if self.draw_detections {
            for det in vehicles {
                let b = det.bbox;
                let (w, h) = (b.width().round() as u32, b.height().round() as u32);
                if w == 0 || h == 0 {
                    continue;
                }
                let rect = Rect::at(b.xmin().round() as i32, b.ymin().round() as i32).of_size(w, h);
                draw_hollow_rect_mut(&mut canvas, rect, BOX_COLOR);
            }
        }

        let lines = overlay_lines(count, duration);
        self.draw_panel(&mut canvas, &lines);
        Frame::new(frame.seq(), canvas)
    }

    fn draw_panel(&self, canvas: &mut RgbImage, lines: &[String; 2]) {
        let scale = PxScale::from(TEXT_SCALE);
        let Some(font) = &self.font else {
            let (w, h) = FALLBACK_PANEL;
            draw_filled_rect_mut(canvas, Rect::at(0, 0).of_size(w, h), PANEL_COLOR);
            return;
        };

        let sizes: Vec<(u32, u32)> = lines.iter().map(|l| text_size(scale, font, l)).collect();
        let text_w = sizes.iter().map(|s| s.0).max().unwrap_or(0);
        let line_h = sizes.iter().map(|s| s.1).max().unwrap_or(0).max(1) as i32;
        let panel_w = text_w + 2 * MARGIN as u32;
        let panel_h = (2 * line_h + LINE_GAP + 2 * MARGIN) as u32;
        draw_filled_rect_mut(canvas, Rect::at(0, 0).of_size(panel_w, panel_h), PANEL_COLOR);

        for (i, line) in lines.iter().enumerate() {
            let y = MARGIN + i as i32 * (line_h + LINE_GAP);
            draw_text_mut(canvas, TEXT_COLOR, MARGIN, y, scale, font, line);
        }
    }
}

/// 叠加层文字
pub fn overlay_lines(count: usize, duration: SignalDuration) -> [String; 2] {
    [
        format!("Vehicles: {count}"),
        format!("Signal Time: {duration}"),
    ]
}

fn bundled_font() -> Option<FontArc> {
    match FontArc::try_from_slice(BUNDLED_FONT) {
        Ok(font) => Some(font),
        Err(e) => {
            warn!("⚠️ 内置字体无效: {}, 叠加层将不显示文字", e);
            None
        }
    }
}

fn load_font(path: &Path) -> Option<FontArc> {
    let bytes = match std::fs::read(path) {
        Ok(b) => b,
        Err(e) => {
            warn!("⚠️ 读取字体失败 {}: {}, 使用内置字体", path.display(), e);
            return None;
        }
    };
    match FontArc::try_from_vec(bytes) {
        Ok(font) => {
            debug!("🔤 字体已加载: {}", path.display());
            Some(font)
        }
        Err(e) => {
            warn!("⚠️ 字体无效 {}: {}, 使用内置字体", path.display(), e);
            None
        }
    }
}
