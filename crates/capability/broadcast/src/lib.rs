//! 订阅者注册表与一次编码、多路分发的广播器。

mod dispatcher;
mod registry;
mod sink;

pub use dispatcher::{BroadcastReport, Broadcaster, JsonEncoder, RecordEncoder};
pub use registry::{SubscriberHandle, SubscriberId, SubscriberRegistry};
pub use sink::{ChannelSink, Payload, SendError, SubscriberSink};

/// 广播错误。
#[derive(Debug, thiserror::Error)]
pub enum BroadcastError {
    #[error("encode error: {0}")]
    Encode(String),
}
