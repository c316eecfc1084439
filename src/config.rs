// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 流水线配置 - 命令行参数 + JSON文件

use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::ConfigError;

/// 默认车辆类别
pub const DEFAULT_VEHICLE_CLASSES: [&str; 5] = ["car", "truck", "bus", "bicycle", "motorcycle"];

/// 默认模型输入尺寸
pub const DEFAULT_IMGSZ: u32 = 640;

/// COCO 80类标签 (YOLOv8 默认词表)
pub const COCO_LABELS: [&str; 80] = [
    "person", "bicycle", "car", "motorcycle", "airplane", "bus", "train", "truck", "boat",
    "traffic light", "fire hydrant", "stop sign", "parking meter", "bench", "bird", "cat", "dog",
    "horse", "sheep", "cow", "elephant", "bear", "zebra", "giraffe", "backpack", "umbrella",
    "handbag", "tie", "suitcase", "frisbee", "skis", "snowboard", "sports ball", "kite",
    "baseball bat", "baseball glove", "skateboard", "surfboard", "tennis racket", "bottle",
    "wine glass", "cup", "fork", "knife", "spoon", "bowl", "banana", "apple", "sandwich", "orange",
    "broccoli", "carrot", "hot dog", "pizza", "donut", "cake", "chair", "couch", "potted plant",
    "bed", "dining table", "toilet", "tv", "laptop", "mouse", "remote", "keyboard", "cell phone",
    "microwave", "oven", "toaster", "sink", "refrigerator", "book", "clock", "vase", "scissors",
    "teddy bear", "hair drier", "toothbrush",
];

/// 流水线参数配置
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    // === 采样参数 ===
    pub skip_factor: u32, // 每 N 帧分析一帧

    // === 分辨率 ===
    pub analysis_resolution: Option<(u32, u32)>, // 检测输入尺寸, None = 原始分辨率
    pub display_size: Option<(u32, u32)>,        // 输出画面尺寸, None = 原始分辨率

    // === 回放 ===
    pub playback_fps: Option<f64>, // 录制源的回放帧率, None = 按解码速度读取

    // === 类别 ===
    pub vehicle_classes: Vec<String>, // 计入车辆的类别
    pub labels: Vec<String>,          // 检测器标签词表 (class id → label)

    // === 检测参数 ===
    pub confidence_threshold: f32,
    pub iou_threshold: f32,

    // === 渲染参数 ===
    pub font_path: Option<PathBuf>,
    pub draw_detections: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            skip_factor: 2,
            analysis_resolution: None,
            display_size: None,
            playback_fps: None,
            vehicle_classes: DEFAULT_VEHICLE_CLASSES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            labels: COCO_LABELS.iter().map(|s| s.to_string()).collect(),
            confidence_threshold: 0.25,
            iou_threshold: 0.45,
            font_path: None,
            draw_detections: true,
        }
    }
}

impl PipelineConfig {
    /// 从JSON文件加载配置, 文件不存在时使用默认值
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = match fs::read_to_string(path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("📝 配置文件 {} 不存在, 使用默认配置", path.display());
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let config: Self = serde_json::from_str(&json).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        info!("✅ 配置已从 {} 加载", path.display());
        Ok(config)
    }

    /// 保存配置到JSON文件
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, json).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        info!("💾 配置已保存到 {}", path.display());
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.skip_factor == 0 {
            return Err(ConfigError::Invalid("skip_factor must be >= 1".into()));
        }
        for (name, size) in [
            ("analysis_resolution", self.analysis_resolution),
            ("display_size", self.display_size),
        ] {
            if let Some((w, h)) = size {
                if w == 0 || h == 0 {
                    return Err(ConfigError::Invalid(format!(
                        "{name} must be non-zero, got {w}x{h}"
                    )));
                }
            }
        }
        if let Some(fps) = self.playback_fps {
            if !(fps.is_finite() && fps > 0.0) {
                return Err(ConfigError::Invalid(format!(
                    "playback_fps must be positive, got {fps}"
                )));
            }
        }
        if self.vehicle_classes.is_empty() {
            return Err(ConfigError::Invalid("vehicle_classes is empty".into()));
        }
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(ConfigError::Invalid(format!(
                "confidence_threshold out of range: {}",
                self.confidence_threshold
            )));
        }
        Ok(())
    }

    /// 命令行参数覆盖文件配置
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(skip) = args.skip {
            self.skip_factor = skip;
        }
        if let Some(size) = args.analysis {
            self.analysis_resolution = Some(size);
        }
        if let Some(display) = args.display {
            self.display_size = Some(display);
        }
        if let Some(fps) = args.fps {
            self.playback_fps = Some(fps);
        }
        if let Some(font) = &args.font {
            self.font_path = Some(font.clone());
        }
        if let Some(conf) = args.conf {
            self.confidence_threshold = conf;
        }
    }

    /// 打印当前配置
    pub fn log_summary(&self) {
        info!("🎛️  当前流水线配置:");
        info!("  跳帧因子: {}", self.skip_factor);
        match self.analysis_resolution {
            Some((w, h)) => info!("  分析分辨率: {}x{}", w, h),
            None => info!("  分析分辨率: 原始"),
        }
        match self.display_size {
            Some((w, h)) => info!("  输出尺寸: {}x{}", w, h),
            None => info!("  输出尺寸: 原始"),
        }
        if let Some(fps) = self.playback_fps {
            info!("  回放帧率: {:.1}", fps);
        }
        info!("  车辆类别: {}", self.vehicle_classes.join(", "));
        info!("  检测置信度: {:.2}", self.confidence_threshold);
    }
}

/// 解析 `WxH` 形式的尺寸
pub fn parse_size(s: &str) -> Result<(u32, u32), String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WxH, got {s:?}"))?;
    let w: u32 = w.trim().parse().map_err(|e| format!("bad width: {e}"))?;
    let h: u32 = h.trim().parse().map_err(|e| format!("bad height: {e}"))?;
    if w == 0 || h == 0 {
        return Err(format!("size must be non-zero, got {s:?}"));
    }
    Ok((w, h))
}

impl Args {
    /// 检测模型输入尺寸, 与分析分辨率无关
    pub fn model_input_size(&self) -> (u32, u32) {
        let size = self.imgsz.unwrap_or(DEFAULT_IMGSZ);
        (size, size)
    }
}

/// 交通信号灯时长计算参数
#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "基于车流量的自适应交通信号灯时长", long_about = None)]
pub struct Args {
    /// 输入源: 摄像头索引 (0) 或视频文件/图片目录路径
    #[arg(short, long, default_value = "0")]
    pub source: String,

    /// 流水线配置文件 (JSON)
    #[arg(short, long, default_value = "traffic_signal.json")]
    pub config: PathBuf,

    /// ONNX检测模型路径
    #[arg(short, long, default_value = "models/yolov8n.onnx")]
    pub model: PathBuf,

    /// 每 N 帧分析一帧
    #[arg(long)]
    pub skip: Option<u32>,

    /// 模型输入尺寸 (正方形), 默认 640
    #[arg(long)]
    pub imgsz: Option<u32>,

    /// 分析分辨率, 例如 640x360 (帧在检测前缩放到该尺寸)
    #[arg(long, value_parser = parse_size)]
    pub analysis: Option<(u32, u32)>,

    /// 输出画面尺寸, 例如 800x600
    #[arg(long, value_parser = parse_size)]
    pub display: Option<(u32, u32)>,

    /// 录制源回放帧率 (图片目录 / GIF / 视频文件)
    #[arg(long)]
    pub fps: Option<f64>,

    /// 叠加文字字体 (TTF/OTF)
    #[arg(long)]
    pub font: Option<PathBuf>,

    /// 检测置信度阈值
    #[arg(long)]
    pub conf: Option<f32>,

    /// 将标注后的画面保存到该目录
    #[arg(long)]
    pub snapshots: Option<PathBuf>,

    /// 交互模式: 从标准输入读取命令 (camera 0 / file clip.gif / stop / status / quit)
    #[arg(short, long)]
    pub interactive: bool,

    /// JSON格式日志
    #[arg(long)]
    pub log_json: bool,
}
