// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 错误类型 (Error taxonomy)
//!
//! - `AcquisitionError`: 采集句柄无法打开, 流水线不会启动
//! - `ConfigError`:      配置文件读取/解析/校验失败
//! - `CommandError`:     控制命令无法解析
//!
//! 流结束 (end-of-stream) 不是错误, 它作为数据经 FrameChannel 传递。

use std::path::PathBuf;

use thiserror::Error;

/// 采集错误: 在任何帧产生之前返回给调用方
#[derive(Error, Debug)]
pub enum AcquisitionError {
    #[error("Failed to open video source {source_name}: {reason}")]
    Open { source_name: String, reason: String },

    #[error("Unsupported video source: {0}")]
    Unsupported(String),

    #[error("Video source contains no frames: {0}")]
    Empty(String),
}

impl AcquisitionError {
    pub fn open(source_name: impl Into<String>, reason: impl ToString) -> Self {
        Self::Open {
            source_name: source_name.into(),
            reason: reason.to_string(),
        }
    }
}

/// 配置错误
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// 控制命令解析错误
#[derive(Error, Debug, PartialEq, Eq)]
pub enum CommandError {
    #[error("empty command")]
    Empty,

    #[error("unknown command: {0}")]
    Unknown(String),

    #[error("missing argument for `{0}`")]
    MissingArgument(&'static str),

    #[error("invalid camera index: {0}")]
    InvalidIndex(String),
}
