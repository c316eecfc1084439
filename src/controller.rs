// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 控制层 (Controller)
//!
//! 用户操作 → 命令对象 → 分发表 → 流水线 start / stop。
//! 同一时刻最多只有一个运行中的流水线。

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::Result;
use tracing::{info, warn};

use crate::config::PipelineConfig;
use crate::detection::Detector;
use crate::error::CommandError;
use crate::input::InputSource;
use crate::pipeline::{self, PipelineHandle, PipelineState, PipelineSummary};
use crate::presenter::Presenter;

/// 控制命令
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    StartCamera(usize),
    StartFile(PathBuf),
    Stop,
    Status,
    Quit,
}

impl Command {
    fn kind(&self) -> CommandKind {
        match self {
            Command::StartCamera(_) | Command::StartFile(_) => CommandKind::Start,
            Command::Stop => CommandKind::Stop,
            Command::Status => CommandKind::Status,
            Command::Quit => CommandKind::Quit,
        }
    }
}

impl FromStr for Command {
    type Err = CommandError;

    /// `camera 0` / `file clip.gif` / `start <selector>` / `stop` / `status` / `quit`
    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (verb, rest) = match line.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (line, ""),
        };
        match verb.to_ascii_lowercase().as_str() {
            "" => Err(CommandError::Empty),
            "camera" | "cam" => {
                if rest.is_empty() {
                    return Ok(Command::StartCamera(0));
                }
                rest.parse()
                    .map(Command::StartCamera)
                    .map_err(|_| CommandError::InvalidIndex(rest.to_string()))
            }
            "file" | "open" => {
                if rest.is_empty() {
                    return Err(CommandError::MissingArgument("file"));
                }
                Ok(Command::StartFile(PathBuf::from(rest)))
            }
            "start" => match rest.parse::<InputSource>() {
                _ if rest.is_empty() => Err(CommandError::MissingArgument("start")),
                Ok(InputSource::Camera(index)) => Ok(Command::StartCamera(index)),
                Ok(InputSource::File(path)) => Ok(Command::StartFile(path)),
                Err(never) => match never {},
            },
            "stop" => Ok(Command::Stop),
            "status" => Ok(Command::Status),
            "quit" | "exit" | "q" => Ok(Command::Quit),
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CommandKind {
    Start,
    Stop,
    Status,
    Quit,
}

/// 命令执行结果
#[derive(Debug)]
pub enum Reply {
    Started(String),
    /// 停止了一次运行 (没有运行时为 None)
    Stopped(Option<PipelineSummary>),
    Status {
        source: String,
        state: PipelineState,
    },
    Idle,
    Quit(Option<PipelineSummary>),
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Started(source) => write!(f, "started {source}"),
            Reply::Stopped(None) => write!(f, "nothing running"),
            Reply::Stopped(Some(s)) => write!(
                f,
                "stopped ({:?}): analyzed {} of {} frames",
                s.state, s.analyzed, s.produced
            ),
            Reply::Status { source, state } => write!(f, "{source}: {state:?}"),
            Reply::Idle => write!(f, "idle"),
            Reply::Quit(_) => write!(f, "bye"),
        }
    }
}

/// 每次运行构造新的检测器与展示端
pub type DetectorFactory = Box<dyn FnMut() -> Result<Box<dyn Detector>> + Send>;
pub type PresenterFactory = Box<dyn FnMut() -> Result<Box<dyn Presenter>> + Send>;

type Handler = fn(&mut Controller, Command) -> Result<Reply>;

/// 分发表
const DISPATCH: &[(CommandKind, Handler)] = &[
    (CommandKind::Start, Controller::on_start),
    (CommandKind::Stop, Controller::on_stop),
    (CommandKind::Status, Controller::on_status),
    (CommandKind::Quit, Controller::on_quit),
];

pub struct Controller {
    config: PipelineConfig,
    detectors: DetectorFactory,
    presenters: PresenterFactory,
    current: Option<PipelineHandle>,
}

impl Controller {
    pub fn new(
        config: PipelineConfig,
        detectors: DetectorFactory,
        presenters: PresenterFactory,
    ) -> Self {
        Self {
            config,
            detectors,
            presenters,
            current: None,
        }
    }

    pub fn dispatch(&mut self, command: Command) -> Result<Reply> {
        let kind = command.kind();
        let handler = DISPATCH
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, h)| *h)
            .ok_or_else(|| anyhow::anyhow!("no handler for {kind:?}"))?;
        handler(self, command)
    }

    /// 当前运行状态 (没有运行时为 None)
    pub fn state(&self) -> Option<PipelineState> {
        self.current.as_ref().map(|h| h.state())
    }

    pub fn is_running(&self) -> bool {
        self.state().is_some_and(|s| s.is_running())
    }

    fn on_start(&mut self, command: Command) -> Result<Reply> {
        let source = match command {
            Command::StartCamera(index) => InputSource::Camera(index),
            Command::StartFile(path) => InputSource::File(path),
            _ => anyhow::bail!("not a start command: {command:?}"),
        };
        // 上一次运行以错误结束时, 错误已在 stop_current 中记录, 不影响新的运行
        if let Ok(Some(summary)) = self.stop_current() {
            info!("🔁 切换输入源, 上一次运行: {:?}", summary.state);
        }

        let detector = (self.detectors)()?;
        let presenter = (self.presenters)()?;
        let name = source.to_string();
        let handle = pipeline::start(self.config.clone(), source, detector, presenter)?;
        self.current = Some(handle);
        Ok(Reply::Started(name))
    }

    fn on_stop(&mut self, _command: Command) -> Result<Reply> {
        Ok(Reply::Stopped(self.stop_current()?))
    }

    fn on_status(&mut self, _command: Command) -> Result<Reply> {
        Ok(match &self.current {
            Some(handle) => Reply::Status {
                source: handle.source_name().to_string(),
                state: handle.state(),
            },
            None => Reply::Idle,
        })
    }

    fn on_quit(&mut self, _command: Command) -> Result<Reply> {
        Ok(Reply::Quit(self.stop_current()?))
    }

    fn stop_current(&mut self) -> Result<Option<PipelineSummary>> {
        let Some(handle) = self.current.take() else {
            return Ok(None);
        };
        handle.stop();
        match handle.join() {
            Ok(summary) => Ok(Some(summary)),
            Err(e) => {
                warn!("⚠️ 上一次运行以错误结束: {:#}", e);
                Err(e)
            }
        }
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        let _ = self.stop_current();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::{Bbox, Detection, FnDetector};
    use crate::error::AcquisitionError;
    use crate::presenter::{ChannelPresenter, LogPresenter};
    use image::RgbImage;
    use std::time::{Duration, Instant};

    #[test]
    fn test_parse_commands() {
        assert_eq!("camera 0".parse::<Command>(), Ok(Command::StartCamera(0)));
        assert_eq!("cam".parse::<Command>(), Ok(Command::StartCamera(0)));
        assert_eq!(
            "file my clip.gif".parse::<Command>(),
            Ok(Command::StartFile(PathBuf::from("my clip.gif")))
        );
        assert_eq!("start 2".parse::<Command>(), Ok(Command::StartCamera(2)));
        assert_eq!(
            "start clip.mp4".parse::<Command>(),
            Ok(Command::StartFile(PathBuf::from("clip.mp4")))
        );
        assert_eq!(" STOP ".parse::<Command>(), Ok(Command::Stop));
        assert_eq!("status".parse::<Command>(), Ok(Command::Status));
        assert_eq!("q".parse::<Command>(), Ok(Command::Quit));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!("".parse::<Command>(), Err(CommandError::Empty));
        assert_eq!(
            "camera front".parse::<Command>(),
            Err(CommandError::InvalidIndex("front".into()))
        );
        assert_eq!(
            "file".parse::<Command>(),
            Err(CommandError::MissingArgument("file"))
        );
        assert_eq!(
            "dance".parse::<Command>(),
            Err(CommandError::Unknown("dance".into()))
        );
    }

    fn one_car_detectors() -> DetectorFactory {
        Box::new(|| {
            Ok(Box::new(FnDetector::new("one-car", |_img: &RgbImage| {
                Ok(vec![Detection::new("car", 0.9, Bbox::new(0.0, 0.0, 4.0, 4.0))])
            })) as Box<dyn Detector>)
        })
    }

    fn controller(config: PipelineConfig) -> Controller {
        Controller::new(
            config,
            one_car_detectors(),
            Box::new(|| Ok(Box::new(LogPresenter::new()) as Box<dyn Presenter>)),
        )
    }

    fn wait_while_running(ctl: &Controller) {
        let started = Instant::now();
        while ctl.is_running() && started.elapsed() < Duration::from_secs(5) {
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    fn image_dir(frames: usize) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..frames {
            RgbImage::new(16, 16)
                .save(dir.path().join(format!("{i:04}.png")))
                .unwrap();
        }
        dir
    }

    #[test]
    fn test_idle_controller() {
        let mut ctl = controller(PipelineConfig::default());
        assert!(matches!(ctl.dispatch(Command::Status).unwrap(), Reply::Idle));
        assert!(matches!(
            ctl.dispatch(Command::Stop).unwrap(),
            Reply::Stopped(None)
        ));
        assert!(ctl.state().is_none());
    }

    #[test]
    fn test_start_invalid_source_keeps_idle() {
        let mut ctl = controller(PipelineConfig::default());
        let err = ctl
            .dispatch(Command::StartFile(PathBuf::from("/no/such/dir/clip.gif")))
            .unwrap_err();
        assert!(err.downcast_ref::<AcquisitionError>().is_some());
        assert!(ctl.state().is_none());
    }

    #[test]
    fn test_file_run_ends() {
        let dir = image_dir(4);
        let mut ctl = controller(PipelineConfig {
            skip_factor: 1,
            ..Default::default()
        });
        let reply = ctl
            .dispatch(Command::StartFile(dir.path().to_path_buf()))
            .unwrap();
        assert!(matches!(reply, Reply::Started(_)));

        wait_while_running(&ctl);
        assert_eq!(ctl.state(), Some(PipelineState::Ended));

        match ctl.dispatch(Command::Quit).unwrap() {
            Reply::Quit(Some(summary)) => {
                assert_eq!(summary.state, PipelineState::Ended);
                assert_eq!(summary.produced, 4);
                assert!(summary.analyzed >= 1);
            }
            other => panic!("unexpected reply: {other:?}"),
        }
        assert!(ctl.state().is_none());
    }

    #[test]
    fn test_restart_stops_previous_run() {
        let dir = image_dir(200);
        let mut ctl = controller(PipelineConfig {
            skip_factor: 1,
            playback_fps: Some(50.0),
            ..Default::default()
        });
        ctl.dispatch(Command::StartFile(dir.path().to_path_buf()))
            .unwrap();
        assert!(ctl.is_running());

        ctl.dispatch(Command::StartFile(dir.path().to_path_buf()))
            .unwrap();
        assert!(ctl.is_running());

        match ctl.dispatch(Command::Stop).unwrap() {
            Reply::Stopped(Some(summary)) => assert_eq!(summary.state, PipelineState::Stopped),
            other => panic!("unexpected reply: {other:?}"),
        }
    }

    #[test]
    fn test_start_after_errored_run() {
        let dir = image_dir(4);
        let mut calls = 0u32;
        let presenters: PresenterFactory = Box::new(move || {
            calls += 1;
            if calls == 1 {
                // 接收端已关闭, 第一次展示即失败
                let (tx, rx) = crossbeam_channel::unbounded();
                drop(rx);
                return Ok(Box::new(ChannelPresenter::new(tx)) as Box<dyn Presenter>);
            }
            Ok(Box::new(LogPresenter::new()) as Box<dyn Presenter>)
        });
        let mut ctl = Controller::new(
            PipelineConfig {
                skip_factor: 1,
                ..Default::default()
            },
            one_car_detectors(),
            presenters,
        );

        ctl.dispatch(Command::StartFile(dir.path().to_path_buf()))
            .unwrap();
        wait_while_running(&ctl);
        assert_eq!(ctl.state(), Some(PipelineState::Errored));

        let reply = ctl
            .dispatch(Command::StartFile(dir.path().to_path_buf()))
            .unwrap();
        assert!(matches!(reply, Reply::Started(_)));
        wait_while_running(&ctl);
        assert_eq!(ctl.state(), Some(PipelineState::Ended));
    }
}
