// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 交通信号灯时长计算 (Adaptive Traffic Signal Timing)
//!
//! 视频帧 → 车辆检测 → 车辆计数 → 信号灯时长 + 拥堵等级 → 叠加层 → 展示
pub mod channel; // 容量为 1 的丢帧通道
pub mod config; // 流水线配置 + 命令行参数
pub mod congestion; // 拥堵等级
pub mod controller; // 命令分发
pub mod counter; // 车辆计数
pub mod detection; // 检测接口与实现
pub mod error;
pub mod frame;
pub mod input; // 视频输入系统
pub mod pipeline; // 采集/分析双线程流水线
pub mod presenter; // 展示层接口
pub mod renderer; // 叠加层渲染
pub mod sampler; // 跳帧采样
pub mod signal; // 信号灯时长
pub mod utils;

pub use crate::config::{Args, PipelineConfig};
pub use crate::congestion::CongestionLevel;
pub use crate::controller::{Command, Controller, Reply};
pub use crate::counter::VehicleCounter;
pub use crate::detection::{Bbox, Detection, Detector, FnDetector};
pub use crate::error::{AcquisitionError, CommandError, ConfigError};
pub use crate::frame::Frame;
pub use crate::input::{FrameSource, InputSource};
pub use crate::pipeline::{start, PipelineHandle, PipelineState, PipelineSummary};
pub use crate::presenter::{FrameReport, Presenter};
pub use crate::renderer::Renderer;
pub use crate::signal::{signal_duration, SignalDuration};
