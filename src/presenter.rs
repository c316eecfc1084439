// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

/// 展示层接口 (Presenter)
///
/// 每个被分析的帧调用一次 `show`, 附带说明文字 (车辆数 + 拥堵等级)。
/// 窗口 / 网页等真实界面在本库之外, 这里只提供无界面适配器:
/// - LogPresenter:      日志输出
/// - SnapshotPresenter: 逐帧写入 JPEG
/// - ChannelPresenter:  转发给外部界面线程
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use crossbeam_channel::Sender;
use serde::Serialize;
use tracing::info;

use crate::congestion::CongestionLevel;
use crate::frame::Frame;
use crate::signal::SignalDuration;
use crate::utils::gen_time_string;

/// 一帧的分析结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameReport {
    pub seq: u64,
    pub vehicle_count: usize,
    pub duration: SignalDuration,
    pub level: CongestionLevel,
}

impl FrameReport {
    pub fn new(seq: u64, vehicle_count: usize, duration: SignalDuration) -> Self {
        Self {
            seq,
            vehicle_count,
            duration,
            level: CongestionLevel::from_count(vehicle_count),
        }
    }

    /// "Vehicles: N, Congestion: level"
    pub fn caption(&self) -> String {
        format!("Vehicles: {}, Congestion: {}", self.vehicle_count, self.level)
    }
}

pub trait Presenter: Send {
    fn show(&mut self, frame: Frame, report: &FrameReport) -> Result<()>;

    /// 释放显示资源, 每条退出路径上都会调用
    fn close(&mut self) {}
}

impl Presenter for Box<dyn Presenter> {
    fn show(&mut self, frame: Frame, report: &FrameReport) -> Result<()> {
        (**self).show(frame, report)
    }

    fn close(&mut self) {
        (**self).close()
    }
}

#[derive(Default)]
pub struct LogPresenter {
    shown: u64,
}

impl LogPresenter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Presenter for LogPresenter {
    fn show(&mut self, frame: Frame, report: &FrameReport) -> Result<()> {
        self.shown += 1;
        info!(
            "🚦 #{} {} | Signal Time: {} | {}x{}",
            report.seq,
            report.caption(),
            report.duration,
            frame.width(),
            frame.height()
        );
        Ok(())
    }

    fn close(&mut self) {
        info!("📋 日志展示结束, 共 {} 帧", self.shown);
    }
}

/// 每帧写入 `<run_dir>/<seq>.jpg`
pub struct SnapshotPresenter {
    run_dir: PathBuf,
    written: u64,
}

impl SnapshotPresenter {
    /// 在 `root` 下创建以时间戳命名的运行目录
    pub fn create(root: &Path) -> Result<Self> {
        let run_dir = root.join(gen_time_string("-"));
        std::fs::create_dir_all(&run_dir)
            .with_context(|| format!("创建快照目录失败: {}", run_dir.display()))?;
        info!("📁 快照目录: {}", run_dir.display());
        Ok(Self {
            run_dir,
            written: 0,
        })
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }
}

impl Presenter for SnapshotPresenter {
    fn show(&mut self, frame: Frame, report: &FrameReport) -> Result<()> {
        let path = self.run_dir.join(format!("{}.jpg", report.seq));
        frame
            .image()
            .save(&path)
            .with_context(|| format!("写入快照失败: {}", path.display()))?;
        self.written += 1;
        Ok(())
    }

    fn close(&mut self) {
        info!(
            "📁 快照完成: {} 帧 → {}",
            self.written,
            self.run_dir.display()
        );
    }
}

/// 转发给外部界面; 接收端关闭视为展示失败
pub struct ChannelPresenter {
    tx: Sender<(Frame, FrameReport)>,
}

impl ChannelPresenter {
    pub fn new(tx: Sender<(Frame, FrameReport)>) -> Self {
        Self { tx }
    }
}

impl Presenter for ChannelPresenter {
    fn show(&mut self, frame: Frame, report: &FrameReport) -> Result<()> {
        if self.tx.send((frame, report.clone())).is_err() {
            bail!("展示端已关闭");
        }
        Ok(())
    }
}
