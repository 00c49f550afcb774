//! 数据接入：传输抽象、握手与轮询状态机、MAVLink 实现。

mod capture;
mod endpoint;
mod runner;
mod shape;
mod source;

use async_trait::async_trait;
use domain::RawMessage;
use std::time::Duration;

pub use capture::{CaptureError, CapturedMessage, capture_fields, capture_value};
pub use endpoint::{Dialect, MavlinkEndpoint};
pub use runner::{IngestConfig, IngestLoop, IngestState};
pub use source::{HEARTBEAT_MESSAGE_ID, MavlinkTransport};

/// 接入错误。
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("connect error: {0}")]
    Connect(String),
    #[error("source disconnected: {0}")]
    Disconnected(String),
    #[error("handler error: {0}")]
    Handler(String),
    #[error("config error: {0}")]
    Config(String),
}

/// 已解码消息处理器（翻译 + 广播）。
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, message: Box<dyn RawMessage>) -> Result<(), IngestError>;
}

/// 消息来源抽象。
///
/// `poll_message` 不得阻塞：没有可读消息时立即返回 `Ok(None)`。
#[async_trait]
pub trait Transport: Send {
    async fn connect(&mut self) -> Result<(), IngestError>;

    /// 等待对端心跳；超时返回 `Ok(false)`。
    async fn wait_heartbeat(&mut self, timeout: Duration) -> Result<bool, IngestError>;

    async fn poll_message(&mut self) -> Result<Option<Box<dyn RawMessage>>, IngestError>;

    /// 日志中展示的来源描述。
    fn describe(&self) -> String;
}
