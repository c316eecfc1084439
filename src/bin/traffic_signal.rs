// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

/// 交通信号灯时长计算 (Adaptive Traffic Signal Timing)
///
/// 系统架构:
/// 1. 采集线程: 摄像头 / 视频文件解码 (独立工作线程)
/// 2. 分析线程: 跳帧 → YOLOv8 检测 → 车辆计数 → 信号灯时长 → 叠加层
/// 3. 主线程:   命令处理 (单次运行或交互模式)
use std::io::BufRead;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use crossbeam_channel::{unbounded, RecvTimeoutError};
use mimalloc::MiMalloc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use traffic_signal_rs::controller::{DetectorFactory, PresenterFactory};
use traffic_signal_rs::detection::Yolov8Detector;
use traffic_signal_rs::presenter::{LogPresenter, SnapshotPresenter};
use traffic_signal_rs::{
    Args, Command, Controller, Detector, InputSource, PipelineConfig, Presenter, Reply,
};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,ort=warn"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.with_target(false).init();
    }
}

fn detector_factory(args: &Args, config: &PipelineConfig) -> DetectorFactory {
    let model = args.model.clone();
    let input_size = args.model_input_size();
    let labels = config.labels.clone();
    let (conf, iou) = (config.confidence_threshold, config.iou_threshold);
    Box::new(move || {
        let detector = Yolov8Detector::new(&model, input_size, labels.clone(), conf, iou)
            .with_context(|| format!("加载检测模型失败: {}", model.display()))?;
        Ok(Box::new(detector) as Box<dyn Detector>)
    })
}

fn presenter_factory(args: &Args) -> PresenterFactory {
    let snapshots = args.snapshots.clone();
    Box::new(move || {
        Ok(match &snapshots {
            Some(root) => Box::new(SnapshotPresenter::create(root)?) as Box<dyn Presenter>,
            None => Box::new(LogPresenter::new()) as Box<dyn Presenter>,
        })
    })
}

fn start_command(selector: &str) -> Command {
    match selector.parse::<InputSource>() {
        Ok(InputSource::Camera(index)) => Command::StartCamera(index),
        Ok(InputSource::File(path)) => Command::StartFile(path),
        Err(never) => match never {},
    }
}

/// 单次运行: 直到输入结束或 Ctrl-C
fn run_once(ctl: &mut Controller, source: &str, quit: &AtomicBool) -> Result<()> {
    let reply = ctl.dispatch(start_command(source))?;
    info!("✅ {}", reply);

    while ctl.is_running() && !quit.load(Ordering::SeqCst) {
        std::thread::sleep(POLL_INTERVAL);
    }
    let reply = ctl.dispatch(Command::Stop)?;
    info!("🏁 {}", reply);
    Ok(())
}

/// 交互模式: 从标准输入读取命令
fn run_interactive(ctl: &mut Controller, quit: &AtomicBool) -> Result<()> {
    let (tx, rx) = unbounded::<String>();
    std::thread::Builder::new()
        .name("stdin-commands".into())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        })?;

    info!("⌨️  命令: camera <index> | file <path> | stop | status | quit");
    loop {
        if quit.load(Ordering::SeqCst) {
            let reply = ctl.dispatch(Command::Quit)?;
            info!("👋 {}", reply);
            return Ok(());
        }
        let line = match rx.recv_timeout(POLL_INTERVAL) {
            Ok(line) => line,
            Err(RecvTimeoutError::Timeout) => continue,
            // 标准输入关闭
            Err(RecvTimeoutError::Disconnected) => {
                quit.store(true, Ordering::SeqCst);
                continue;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(e) => {
                warn!("⚠️ {}", e);
                continue;
            }
        };
        match ctl.dispatch(command) {
            Ok(Reply::Quit(summary)) => {
                if let Some(s) = summary {
                    info!("🏁 最后一次运行: {:?}, 分析 {} 帧", s.state, s.analyzed);
                }
                info!("👋 bye");
                return Ok(());
            }
            Ok(reply) => info!("✅ {}", reply),
            Err(e) => error!("❌ {:#}", e),
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.log_json);

    let mut config = PipelineConfig::load(&args.config)?;
    config.apply_args(&args);
    config.validate()?;
    config.log_summary();
    info!("📦 检测模型: {}", args.model.display());

    let quit = Arc::new(AtomicBool::new(false));
    {
        let quit = Arc::clone(&quit);
        ctrlc::set_handler(move || {
            info!("🛑 Ctrl+C, 正在停止...");
            quit.store(true, Ordering::SeqCst);
        })?;
    }

    let detectors = detector_factory(&args, &config);
    let presenters = presenter_factory(&args);
    let mut ctl = Controller::new(config, detectors, presenters);

    if args.interactive {
        run_interactive(&mut ctl, &quit)
    } else {
        run_once(&mut ctl, &args.source, &quit)
    }
}
