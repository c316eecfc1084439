// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

/// 视频处理流水线 (Video Processing Pipeline)
///
/// 两线程架构, 只通过 FrameChannel 通信:
/// - 采集线程: FrameSource → FrameChannel (按源的原生节奏, 从不等待检测)
/// - 分析线程: FrameChannel → FrameSampler → Detector → VehicleCounter
///             → SignalTimer / CongestionClassifier → Renderer → Presenter
///
/// `start` 返回 `PipelineHandle`, `stop` 为协作式取消: 分析线程每轮检查一次。
use std::borrow::Cow;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use crossbeam_channel::bounded;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::channel::{frame_channel, FrameReceiver, FrameSender, Packet, PushOutcome};
use crate::config::PipelineConfig;
use crate::counter::VehicleCounter;
use crate::detection::{Detection, Detector};
use crate::error::AcquisitionError;
use crate::frame::Frame;
use crate::input::{FrameSource, InputSource};
use crate::presenter::{FrameReport, Presenter};
use crate::renderer::Renderer;
use crate::sampler::FrameSampler;
use crate::signal::duration_for;
use crate::utils::resize_rgb;

/// 流水线运行状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineState {
    Running,
    /// 收到停止请求
    Stopped,
    /// 输入流正常结束
    Ended,
    Errored,
}

impl PipelineState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => PipelineState::Running,
            1 => PipelineState::Stopped,
            2 => PipelineState::Ended,
            _ => PipelineState::Errored,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            PipelineState::Running => 0,
            PipelineState::Stopped => 1,
            PipelineState::Ended => 2,
            PipelineState::Errored => 3,
        }
    }

    pub fn is_running(&self) -> bool {
        *self == PipelineState::Running
    }
}

/// 一次运行的统计
#[derive(Debug, Clone, Serialize)]
pub struct PipelineSummary {
    pub state: PipelineState,
    /// 采集线程产生的帧
    pub produced: u64,
    /// 通道已满被丢弃的帧
    pub dropped: u64,
    /// 投递给分析线程的帧
    pub delivered: u64,
    pub analyzed: u64,
    /// 被采样器跳过的帧
    pub skipped: u64,
    pub detector_failures: u64,
    pub last_report: Option<FrameReport>,
}

#[derive(Debug, Default)]
struct ProducerStats {
    produced: u64,
    dropped: u64,
}

#[derive(Debug, Default)]
struct ConsumerStats {
    delivered: u64,
    analyzed: u64,
    skipped: u64,
    detector_failures: u64,
    last_report: Option<FrameReport>,
}

/// 分析线程独占的上下文, 每次运行构造一次
pub struct PipelineContext {
    detector: Box<dyn Detector>,
    counter: VehicleCounter,
    renderer: Renderer,
    sampler: FrameSampler,
    config: PipelineConfig,
}

impl PipelineContext {
    pub fn new(config: PipelineConfig, detector: Box<dyn Detector>) -> Self {
        let renderer = Renderer::from_config(&config);
        Self::with_renderer(config, detector, renderer)
    }

    pub fn with_renderer(
        config: PipelineConfig,
        detector: Box<dyn Detector>,
        renderer: Renderer,
    ) -> Self {
        Self {
            counter: VehicleCounter::new(config.vehicle_classes.iter().cloned()),
            sampler: FrameSampler::new(config.skip_factor),
            detector,
            renderer,
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// 分析一帧: 检测 → 计数 → 时长/拥堵等级 → 叠加层 → 输出尺寸
    ///
    /// 检测失败时返回 `Ok(None)`, 该帧被跳过。
    pub fn analyze(&mut self, frame: Frame) -> Result<Option<(Frame, FrameReport)>> {
        let (fw, fh) = (frame.width(), frame.height());
        let input: Cow<'_, image::RgbImage> = match self.config.analysis_resolution {
            Some((w, h)) if (w, h) != (fw, fh) => Cow::Owned(resize_rgb(frame.image(), w, h)?),
            _ => Cow::Borrowed(frame.image()),
        };
        let (iw, ih) = input.dimensions();

        let mut detections = match self.detector.detect(&input) {
            Ok(d) => d,
            Err(e) => {
                warn!(
                    "⚠️ 检测失败 {} (帧 #{}): {:#}, 跳过该帧",
                    self.detector.name(),
                    frame.seq(),
                    e
                );
                return Ok(None);
            }
        };
        drop(input);

        // 检测框换算回原始分辨率
        if (iw, ih) != (fw, fh) {
            let (sx, sy) = (fw as f32 / iw as f32, fh as f32 / ih as f32);
            for det in detections.iter_mut() {
                det.bbox = det.bbox.scale(sx, sy).clip(fw as f32, fh as f32);
            }
        }

        let vehicles: Vec<&Detection> = self.counter.vehicles(&detections);
        let count = vehicles.len();
        let duration = duration_for(count);
        let report = FrameReport::new(frame.seq(), count, duration);

        let rendered = self
            .renderer
            .render_with_detections(&frame, count, duration, &vehicles);
        let shown = match self.config.display_size {
            Some((w, h)) if (w, h) != (fw, fh) => {
                Frame::new(rendered.seq(), resize_rgb(rendered.image(), w, h)?)
            }
            _ => rendered,
        };
        Ok(Some((shown, report)))
    }
}

/// 运行中流水线的句柄
pub struct PipelineHandle {
    source_name: String,
    stop: Arc<AtomicBool>,
    state: Arc<AtomicU8>,
    producer: Option<JoinHandle<ProducerStats>>,
    consumer: Option<JoinHandle<(ConsumerStats, Result<()>)>>,
}

impl PipelineHandle {
    /// 请求停止; 正在进行的检测不会被打断
    pub fn stop(&self) {
        if !self.stop.swap(true, Ordering::SeqCst) {
            info!("🛑 停止请求: {}", self.source_name);
        }
    }

    pub fn state(&self) -> PipelineState {
        PipelineState::from_u8(self.state.load(Ordering::SeqCst))
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    /// 线程均已退出
    pub fn is_finished(&self) -> bool {
        self.producer.as_ref().map_or(true, |h| h.is_finished())
            && self.consumer.as_ref().map_or(true, |h| h.is_finished())
    }

    /// 等待两个线程退出, 返回统计; 展示失败时返回该错误
    pub fn join(mut self) -> Result<PipelineSummary> {
        let consumer = self.consumer.take().map(|h| h.join());
        let producer = self.producer.take().map(|h| h.join());

        let (cstats, outcome) = match consumer {
            Some(Ok(v)) => v,
            Some(Err(_)) => {
                self.set_state(PipelineState::Errored);
                (ConsumerStats::default(), Err(anyhow!("分析线程 panic")))
            }
            None => (ConsumerStats::default(), Ok(())),
        };
        let pstats = match producer {
            Some(Ok(v)) => v,
            Some(Err(_)) => {
                error!("❌ 采集线程 panic: {}", self.source_name);
                self.set_state(PipelineState::Errored);
                ProducerStats::default()
            }
            None => ProducerStats::default(),
        };
        outcome?;

        let summary = PipelineSummary {
            state: self.state(),
            produced: pstats.produced,
            dropped: pstats.dropped,
            delivered: cstats.delivered,
            analyzed: cstats.analyzed,
            skipped: cstats.skipped,
            detector_failures: cstats.detector_failures,
            last_report: cstats.last_report,
        };
        info!(
            "📊 {} 结束 ({:?}): 采集{} 丢弃{} 投递{} 分析{} 跳过{} 检测失败{}",
            self.source_name,
            summary.state,
            summary.produced,
            summary.dropped,
            summary.delivered,
            summary.analyzed,
            summary.skipped,
            summary.detector_failures
        );
        Ok(summary)
    }

    fn set_state(&self, state: PipelineState) {
        self.state.store(state.as_u8(), Ordering::SeqCst);
    }
}

impl Drop for PipelineHandle {
    fn drop(&mut self) {
        // 未 join 的句柄被丢弃时让线程自行退出
        if self.consumer.is_some() {
            self.stop.store(true, Ordering::SeqCst);
        }
    }
}

/// 打开输入源并启动流水线
///
/// 输入源无法打开时返回 `AcquisitionError`, 分析线程不会启动。
pub fn start(
    config: PipelineConfig,
    source: InputSource,
    detector: Box<dyn Detector>,
    presenter: Box<dyn Presenter>,
) -> Result<PipelineHandle, AcquisitionError> {
    let name = source.to_string();
    start_with(config, name, move || FrameSource::open(&source), detector, presenter)
}

/// 同 `start`, 由调用方提供打开输入源的方式
///
/// `open` 在采集线程内执行, 采集句柄在其整个生命周期内都只属于采集线程。
pub fn start_with<F>(
    config: PipelineConfig,
    source_name: impl Into<String>,
    open: F,
    detector: Box<dyn Detector>,
    presenter: Box<dyn Presenter>,
) -> Result<PipelineHandle, AcquisitionError>
where
    F: FnOnce() -> Result<FrameSource, AcquisitionError> + Send + 'static,
{
    let source_name = source_name.into();
    let ctx = PipelineContext::new(config, detector);
    start_context(ctx, source_name, open, presenter)
}

/// 使用已构造的上下文启动
pub fn start_context<F>(
    ctx: PipelineContext,
    source_name: String,
    open: F,
    presenter: Box<dyn Presenter>,
) -> Result<PipelineHandle, AcquisitionError>
where
    F: FnOnce() -> Result<FrameSource, AcquisitionError> + Send + 'static,
{
    let mut presenter = presenter;
    let (tx, rx) = frame_channel();
    let (ready_tx, ready_rx) = bounded::<Result<(), AcquisitionError>>(1);
    let pace = ctx
        .config
        .playback_fps
        .map(|fps| Duration::from_secs_f64(1.0 / fps));

    info!("🚀 启动流水线: {} (跳帧因子 {})", source_name, ctx.sampler.skip_factor());

    let producer = thread::Builder::new()
        .name("frame-producer".into())
        .spawn(move || match open() {
            Ok(source) => {
                let _ = ready_tx.send(Ok(()));
                run_producer(source, tx, pace)
            }
            Err(e) => {
                let _ = ready_tx.send(Err(e));
                ProducerStats::default()
            }
        })
        .map_err(|e| AcquisitionError::open(&source_name, e))?;

    let opened = ready_rx
        .recv()
        .unwrap_or_else(|_| Err(AcquisitionError::open(&source_name, "capture thread exited")));
    if let Err(e) = opened {
        error!("❌ 输入源打开失败: {}", e);
        let _ = producer.join();
        presenter.close();
        return Err(e);
    }

    let stop = Arc::new(AtomicBool::new(false));
    let state = Arc::new(AtomicU8::new(PipelineState::Running.as_u8()));
    let consumer = {
        let stop = Arc::clone(&stop);
        let state = Arc::clone(&state);
        thread::Builder::new()
            .name("frame-analyzer".into())
            .spawn(move || {
                let (stats, final_state, outcome) = run_consumer(ctx, rx, presenter, &stop);
                state.store(final_state.as_u8(), Ordering::SeqCst);
                (stats, outcome)
            })
    };
    let consumer = match consumer {
        Ok(h) => h,
        Err(e) => {
            // 接收端随闭包一起释放, 采集线程随后退出
            let _ = producer.join();
            return Err(AcquisitionError::open(&source_name, e));
        }
    };

    Ok(PipelineHandle {
        source_name,
        stop,
        state,
        producer: Some(producer),
        consumer: Some(consumer),
    })
}

/// 采集循环: 产帧即投递, 通道满则丢弃; 流结束时发送一次结束标记
fn run_producer(mut source: FrameSource, tx: FrameSender, pace: Option<Duration>) -> ProducerStats {
    let mut stats = ProducerStats::default();
    let mut window_start = Instant::now();
    let mut window_frames = 0u64;
    let mut window_dropped = 0u64;

    loop {
        let tick = Instant::now();
        match source.next() {
            Packet::Frame(frame) => {
                stats.produced += 1;
                window_frames += 1;
                match tx.push(frame) {
                    PushOutcome::Delivered => {}
                    PushOutcome::Dropped => {
                        stats.dropped += 1;
                        window_dropped += 1;
                    }
                    PushOutcome::Disconnected => {
                        debug!("📹 分析线程已退出, 关闭输入: {}", source.name());
                        return stats;
                    }
                }
            }
            Packet::EndOfStream => {
                info!("📹 输入结束: {} ({} 帧)", source.name(), stats.produced);
                tx.finish();
                return stats;
            }
        }

        let elapsed = window_start.elapsed().as_secs_f64();
        if elapsed >= 1.0 {
            debug!(
                "📺 采集统计: {:.1}fps | 总帧{} | 丢弃{} ({:.1}%)",
                window_frames as f64 / elapsed,
                stats.produced,
                window_dropped,
                window_dropped as f64 / window_frames.max(1) as f64 * 100.0
            );
            window_start = Instant::now();
            window_frames = 0;
            window_dropped = 0;
        }

        if let Some(interval) = pace {
            thread::sleep(interval.saturating_sub(tick.elapsed()));
        }
    }
}

/// 退出时关闭展示端
struct PresenterGuard(Box<dyn Presenter>);

impl Drop for PresenterGuard {
    fn drop(&mut self) {
        self.0.close();
    }
}

/// 分析循环: 每轮检查一次停止请求, 只在 `pop` 上阻塞
fn run_consumer(
    mut ctx: PipelineContext,
    mut rx: FrameReceiver,
    presenter: Box<dyn Presenter>,
    stop: &AtomicBool,
) -> (ConsumerStats, PipelineState, Result<()>) {
    let mut presenter = PresenterGuard(presenter);
    let mut stats = ConsumerStats::default();
    let mut window_start = Instant::now();
    let mut window_analyzed = 0u64;

    let (state, outcome) = loop {
        if stop.load(Ordering::SeqCst) {
            break (PipelineState::Stopped, Ok(()));
        }
        let frame = match rx.pop() {
            Packet::Frame(frame) => frame,
            Packet::EndOfStream => break (PipelineState::Ended, Ok(())),
        };
        stats.delivered += 1;

        if !ctx.sampler.admit() {
            stats.skipped += 1;
            continue;
        }

        match ctx.analyze(frame) {
            Ok(Some((shown, report))) => {
                if let Err(e) = presenter.0.show(shown, &report) {
                    error!("❌ 展示失败 (帧 #{}): {:#}", report.seq, e);
                    break (PipelineState::Errored, Err(e));
                }
                stats.analyzed += 1;
                window_analyzed += 1;
                stats.last_report = Some(report);
            }
            Ok(None) => stats.detector_failures += 1,
            Err(e) => {
                error!("❌ 分析失败: {:#}", e);
                break (PipelineState::Errored, Err(e));
            }
        }

        let elapsed = window_start.elapsed().as_secs_f64();
        if elapsed >= 1.0 {
            if let Some(report) = &stats.last_report {
                debug!(
                    "🔍 分析统计: {:.1}fps | 跳过{} | {} | Signal Time: {}",
                    window_analyzed as f64 / elapsed,
                    stats.skipped,
                    report.caption(),
                    report.duration
                );
            }
            window_start = Instant::now();
            window_analyzed = 0;
        }
    };

    // 先释放接收端, 让阻塞在结束标记上的采集线程退出
    drop(rx);
    (stats, state, outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::congestion::CongestionLevel;
    use crate::detection::{Bbox, FnDetector};
    use crate::input::Capture;
    use crate::presenter::ChannelPresenter;
    use crossbeam_channel::{unbounded, Receiver, Sender};
    use image::{Rgb, RgbImage};
    use std::path::PathBuf;

    /// 帧的 R 通道记录该帧应检测到的车辆数
    fn scripted_image(vehicles: u8) -> RgbImage {
        RgbImage::from_pixel(64, 48, Rgb([vehicles, 0, 0]))
    }

    fn alternating(n: usize) -> Vec<u8> {
        (0..n).map(|i| if i % 2 == 0 { 3 } else { 30 }).collect()
    }

    /// 每帧返回 R 通道数量的 car, 外加一个不计数的 person
    fn scripted_detector(seen: Option<Sender<(u32, u32)>>) -> Box<dyn Detector> {
        Box::new(FnDetector::new("scripted", move |img: &RgbImage| {
            if let Some(tx) = &seen {
                let _ = tx.send(img.dimensions());
            }
            let n = img.get_pixel(0, 0)[0] as usize;
            let mut dets: Vec<Detection> = (0..n)
                .map(|i| Detection::new("car", 0.9, Bbox::new(i as f32, 1.0, 4.0, 4.0)))
                .collect();
            dets.push(Detection::new("person", 0.9, Bbox::new(0.0, 0.0, 2.0, 2.0)));
            Ok(dets)
        }))
    }

    fn test_config(skip_factor: u32) -> PipelineConfig {
        PipelineConfig {
            skip_factor,
            ..Default::default()
        }
    }

    fn test_context(config: PipelineConfig, detector: Box<dyn Detector>) -> PipelineContext {
        PipelineContext::with_renderer(config, detector, Renderer::new(None))
    }

    /// 下一帧要等上一帧被检测后才产生, 保证不丢帧
    struct GatedCapture {
        frames: std::vec::IntoIter<u8>,
        gate: Receiver<()>,
        first: bool,
    }

    impl Capture for GatedCapture {
        fn grab(&mut self) -> Option<RgbImage> {
            if !self.first {
                self.gate.recv().ok()?;
            }
            self.first = false;
            self.frames.next().map(scripted_image)
        }

        fn name(&self) -> &str {
            "gated"
        }
    }

    /// 无限产帧
    struct EndlessCapture;

    impl Capture for EndlessCapture {
        fn grab(&mut self) -> Option<RgbImage> {
            thread::sleep(Duration::from_millis(2));
            Some(scripted_image(7))
        }

        fn name(&self) -> &str {
            "endless"
        }
    }

    /// 不限速地连续产帧, 用于制造通道丢帧
    struct BurstCapture(u32);

    impl Capture for BurstCapture {
        fn grab(&mut self) -> Option<RgbImage> {
            if self.0 == 0 {
                return None;
            }
            self.0 -= 1;
            Some(scripted_image(5))
        }

        fn name(&self) -> &str {
            "burst"
        }
    }

    /// 逐帧投递, 每次等待上一帧被取走; 返回分析线程的结果
    fn feed_consumer(
        ctx: PipelineContext,
        frames: &[u8],
    ) -> (ConsumerStats, PipelineState, Result<()>, Vec<FrameReport>) {
        let (tx, rx) = frame_channel();
        let (ptx, prx) = unbounded();
        let stop = Arc::new(AtomicBool::new(false));
        let worker = {
            let stop = Arc::clone(&stop);
            thread::spawn(move || {
                run_consumer(ctx, rx, Box::new(ChannelPresenter::new(ptx)), &stop)
            })
        };
        for (i, &n) in frames.iter().enumerate() {
            assert_eq!(
                tx.push(Frame::new(i as u64 + 1, scripted_image(n))),
                PushOutcome::Delivered
            );
            while !tx.is_empty() {
                thread::sleep(Duration::from_millis(1));
            }
        }
        tx.finish();
        let (stats, state, outcome) = worker.join().unwrap();
        let reports = prx.try_iter().map(|(_, r)| r).collect();
        (stats, state, outcome, reports)
    }

    #[test]
    fn test_end_to_end_alternating_traffic() {
        let (gate_tx, gate_rx) = unbounded();
        let mut inner = scripted_detector(None);
        let detector = Box::new(FnDetector::new("gated", move |img: &RgbImage| {
            let out = inner.detect(img);
            let _ = gate_tx.send(());
            out
        }));
        let (ptx, prx) = unbounded();
        let ctx = test_context(test_config(1), detector);

        let handle = start_context(
            ctx,
            "gated".into(),
            move || {
                Ok(FrameSource::from_capture(Box::new(GatedCapture {
                    frames: alternating(10).into_iter(),
                    gate: gate_rx,
                    first: true,
                })))
            },
            Box::new(ChannelPresenter::new(ptx)),
        )
        .unwrap();
        let summary = handle.join().unwrap();

        let reports: Vec<FrameReport> = prx.try_iter().map(|(_, r)| r).collect();
        assert_eq!(reports.len(), 10);
        for (i, r) in reports.iter().enumerate() {
            assert_eq!(r.seq, i as u64 + 1);
            if i % 2 == 0 {
                assert_eq!(r.vehicle_count, 3);
                assert_eq!(r.duration.as_secs_f64(), 10.0);
                assert_eq!(r.level, CongestionLevel::Low);
            } else {
                assert_eq!(r.vehicle_count, 30);
                assert!((r.duration.as_secs_f64() - 54.0).abs() < 1e-9);
                assert_eq!(r.level, CongestionLevel::High);
            }
        }
        assert_eq!(summary.state, PipelineState::Ended);
        assert_eq!(summary.produced, 10);
        assert_eq!(summary.dropped, 0);
        assert_eq!(summary.analyzed, 10);
        assert_eq!(summary.last_report.map(|r| r.seq), Some(10));
    }

    #[test]
    fn test_skip_factor_two_analyzes_even_frames() {
        let ctx = test_context(test_config(2), scripted_detector(None));
        let (stats, state, outcome, reports) = feed_consumer(ctx, &alternating(10));

        assert!(outcome.is_ok());
        assert_eq!(state, PipelineState::Ended);
        let seqs: Vec<u64> = reports.iter().map(|r| r.seq).collect();
        assert_eq!(seqs, vec![2, 4, 6, 8, 10]);
        // 偶数帧都是 30 辆
        assert!(reports.iter().all(|r| r.vehicle_count == 30));
        assert_eq!(stats.delivered, 10);
        assert_eq!(stats.skipped, 5);
    }

    #[test]
    fn test_detector_failure_skips_frame() {
        let mut calls = 0u32;
        let detector = Box::new(FnDetector::new("flaky", move |_img: &RgbImage| {
            calls += 1;
            if calls % 3 == 0 {
                anyhow::bail!("inference timeout");
            }
            Ok(vec![Detection::new("bus", 0.8, Bbox::new(0.0, 0.0, 8.0, 8.0))])
        }));
        let ctx = test_context(test_config(1), detector);
        let (stats, state, outcome, reports) = feed_consumer(ctx, &[1; 6]);

        assert!(outcome.is_ok());
        assert_eq!(state, PipelineState::Ended);
        assert_eq!(stats.detector_failures, 2);
        assert_eq!(stats.analyzed, 4);
        let seqs: Vec<u64> = reports.iter().map(|r| r.seq).collect();
        assert_eq!(seqs, vec![1, 2, 4, 5]);
        assert!(reports.iter().all(|r| r.vehicle_count == 1));
    }

    #[test]
    fn test_invalid_source_fails_before_running() {
        let (ptx, prx) = unbounded();
        let result = start(
            test_config(1),
            InputSource::File(PathBuf::from("/no/such/clip.gif")),
            scripted_detector(None),
            Box::new(ChannelPresenter::new(ptx)),
        );
        assert!(matches!(result, Err(AcquisitionError::Open { .. })));
        assert!(prx.try_recv().is_err());
    }

    #[test]
    fn test_stop_running_pipeline() {
        let (ptx, prx) = unbounded();
        let handle = start_with(
            test_config(1),
            "endless",
            || Ok(FrameSource::from_capture(Box::new(EndlessCapture))),
            scripted_detector(None),
            Box::new(ChannelPresenter::new(ptx)),
        )
        .unwrap();

        // 至少分析一帧后停止
        let (_, first) = prx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(first.vehicle_count, 7);
        assert_eq!(handle.state(), PipelineState::Running);

        handle.stop();
        let summary = handle.join().unwrap();
        assert_eq!(summary.state, PipelineState::Stopped);
        assert!(summary.analyzed >= 1);
        assert!(summary.produced >= summary.delivered);
    }

    #[test]
    fn test_presenter_failure_errors_run() {
        let (ptx, prx) = unbounded();
        drop(prx);
        let handle = start_with(
            test_config(1),
            "endless",
            || Ok(FrameSource::from_capture(Box::new(EndlessCapture))),
            scripted_detector(None),
            Box::new(ChannelPresenter::new(ptx)),
        )
        .unwrap();

        let started = Instant::now();
        while handle.state().is_running() && started.elapsed() < Duration::from_secs(5) {
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(handle.state(), PipelineState::Errored);
        assert!(handle.join().is_err());
    }

    #[test]
    fn test_analysis_and_display_resolution() {
        let (seen_tx, seen_rx) = unbounded();
        let config = PipelineConfig {
            skip_factor: 1,
            analysis_resolution: Some((32, 32)),
            display_size: Some((80, 60)),
            ..Default::default()
        };
        let mut ctx = test_context(config, scripted_detector(Some(seen_tx)));

        let (shown, report) = ctx
            .analyze(Frame::new(5, scripted_image(4)))
            .unwrap()
            .unwrap();
        assert_eq!(seen_rx.recv().unwrap(), (32, 32));
        assert_eq!(shown.seq(), 5);
        assert_eq!(shown.image().dimensions(), (80, 60));
        assert_eq!(report.vehicle_count, 4);
        assert_eq!(report.caption(), "Vehicles: 4, Congestion: low");
    }

    #[test]
    fn test_drops_do_not_advance_sampler() {
        let mut inner = scripted_detector(None);
        let detector = Box::new(FnDetector::new("slow", move |img: &RgbImage| {
            thread::sleep(Duration::from_millis(3));
            inner.detect(img)
        }));
        let (ptx, prx) = unbounded();
        let handle = start_with(
            test_config(2),
            "burst",
            || Ok(FrameSource::from_capture(Box::new(BurstCapture(200)))),
            detector,
            Box::new(ChannelPresenter::new(ptx)),
        )
        .unwrap();
        let summary = handle.join().unwrap();

        assert_eq!(summary.state, PipelineState::Ended);
        assert_eq!(summary.produced, 200);
        assert!(summary.dropped > 0);
        assert_eq!(summary.produced, summary.delivered + summary.dropped);
        assert_eq!(
            summary.skipped + summary.analyzed + summary.detector_failures,
            summary.delivered
        );
        // 采样器只按实际送达的帧计数
        assert_eq!(summary.analyzed, summary.delivered / 2);

        let seqs: Vec<u64> = prx.try_iter().map(|(_, r)| r.seq).collect();
        assert_eq!(seqs.len() as u64, summary.analyzed);
        assert!(seqs.windows(2).all(|w| w[1] >= w[0] + 2));
        assert!(seqs.windows(2).any(|w| w[1] > w[0] + 2));
    }
}
