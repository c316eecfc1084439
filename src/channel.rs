// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 帧通道 (FrameChannel)
//!
//! 采集线程 → 分析线程, 容量固定为 1:
//! - `push` 从不阻塞, 通道内已有未消费帧时直接丢弃新帧 (保留最新已投递的帧, 不排队)
//! - `finish` 发送流结束标记, 只发送一次
//! - `pop` 阻塞等待帧或流结束标记; 收到流结束后再调用立即返回 `EndOfStream`

use crossbeam_channel::{Receiver, Sender, TrySendError};

use crate::frame::Frame;

/// 通道容量
pub const CAPACITY: usize = 1;

/// 通道中传递的消息
#[derive(Debug)]
pub enum Packet {
    Frame(Frame),
    EndOfStream,
}

/// `push` 的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// 帧已放入通道
    Delivered,
    /// 通道已满, 新帧被丢弃
    Dropped,
    /// 分析线程已退出
    Disconnected,
}

/// 创建一对通道端点
pub fn frame_channel() -> (FrameSender, FrameReceiver) {
    let (tx, rx) = crossbeam_channel::bounded(CAPACITY);
    (FrameSender { tx }, FrameReceiver { rx, ended: false })
}

/// 生产端 (采集线程独占)
pub struct FrameSender {
    tx: Sender<Packet>,
}

impl FrameSender {
    /// 非阻塞投递, 通道已满时丢弃该帧
    pub fn push(&self, frame: Frame) -> PushOutcome {
        match self.tx.try_send(Packet::Frame(frame)) {
            Ok(()) => PushOutcome::Delivered,
            Err(TrySendError::Full(_)) => PushOutcome::Dropped,
            Err(TrySendError::Disconnected(_)) => PushOutcome::Disconnected,
        }
    }

    /// 通道中是否没有未消费的帧
    pub fn is_empty(&self) -> bool {
        self.tx.is_empty()
    }

    /// 发送流结束标记并关闭生产端
    ///
    /// 标记不能丢, 因此这里是阻塞发送: 等待分析线程取走最后一帧。
    /// 分析线程已退出时直接返回。
    pub fn finish(self) {
        let _ = self.tx.send(Packet::EndOfStream);
    }
}

/// 消费端 (分析线程独占)
pub struct FrameReceiver {
    rx: Receiver<Packet>,
    ended: bool,
}

impl FrameReceiver {
    /// 阻塞等待下一帧
    ///
    /// 生产端未发送标记就被丢弃 (例如采集线程 panic) 时同样视为流结束。
    pub fn pop(&mut self) -> Packet {
        if self.ended {
            return Packet::EndOfStream;
        }
        match self.rx.recv() {
            Ok(Packet::Frame(frame)) => Packet::Frame(frame),
            Ok(Packet::EndOfStream) | Err(_) => {
                self.ended = true;
                Packet::EndOfStream
            }
        }
    }

    /// 通道中未消费的消息数 (0 或 1)
    pub fn pending(&self) -> usize {
        self.rx.len()
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }
}
