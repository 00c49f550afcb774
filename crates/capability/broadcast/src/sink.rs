use std::sync::Arc;
use tokio::sync::mpsc;

/// 编码后的共享载荷：每次广播只分配一次。
pub type Payload = Arc<str>;

/// 单个订阅者的发送失败原因。
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SendError {
    #[error("subscriber closed")]
    Closed,
    #[error("subscriber queue full")]
    Full,
}

/// 订阅者出站队列；`try_send` 不得阻塞。
pub trait SubscriberSink: Send + Sync {
    fn try_send(&self, payload: Payload) -> Result<(), SendError>;
}

/// 基于有界 mpsc 的出站队列。
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<Payload>,
}

impl ChannelSink {
    /// 创建容量为 `capacity` 的队列；接收端交给会话写出。
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Payload>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

impl SubscriberSink for ChannelSink {
    fn try_send(&self, payload: Payload) -> Result<(), SendError> {
        self.tx.try_send(payload).map_err(|err| match err {
            mpsc::error::TrySendError::Full(_) => SendError::Full,
            mpsc::error::TrySendError::Closed(_) => SendError::Closed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_sink_reports_full_and_closed() {
        let (sink, mut rx) = ChannelSink::channel(1);
        let payload: Payload = Arc::from("a");
        assert_eq!(sink.try_send(payload.clone()), Ok(()));
        assert_eq!(sink.try_send(payload.clone()), Err(SendError::Full));
        assert_eq!(rx.try_recv().ok().as_deref(), Some("a"));
        drop(rx);
        assert_eq!(sink.try_send(payload), Err(SendError::Closed));
    }

    #[test]
    fn zero_capacity_is_raised_to_one() {
        let (sink, _rx) = ChannelSink::channel(0);
        assert_eq!(sink.try_send(Arc::from("x")), Ok(()));
    }
}
