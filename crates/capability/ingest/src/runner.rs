use crate::{IngestError, MessageHandler, Transport};
use mavbridge_telemetry::{
    record_handshake_timeout, record_source_connect, record_source_disconnect,
};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// 接入状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestState {
    Connecting,
    AwaitingHandshake,
    Streaming,
    Stopped,
}

impl IngestState {
    pub fn as_str(&self) -> &'static str {
        match self {
            IngestState::Connecting => "connecting",
            IngestState::AwaitingHandshake => "awaiting_handshake",
            IngestState::Streaming => "streaming",
            IngestState::Stopped => "stopped",
        }
    }
}

impl fmt::Display for IngestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 接入循环参数。
#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub handshake_timeout: Duration,
    pub poll_interval: Duration,
    pub reconnect_min: Duration,
    pub reconnect_max: Duration,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            handshake_timeout: Duration::from_secs(5),
            poll_interval: Duration::from_micros(500),
            reconnect_min: Duration::from_millis(200),
            reconnect_max: Duration::from_secs(5),
        }
    }
}

impl IngestConfig {
    fn sanitized(mut self) -> Self {
        if self.poll_interval.is_zero() {
            self.poll_interval = Duration::from_micros(1);
        }
        if self.reconnect_min.is_zero() {
            self.reconnect_min = Duration::from_millis(1);
        }
        if self.reconnect_max < self.reconnect_min {
            self.reconnect_max = self.reconnect_min;
        }
        self
    }
}

enum StreamEnd {
    Shutdown,
    Failed { error: IngestError, delivered: u64 },
}

/// 连接 → 握手 → 流式轮询 的状态机。
///
/// 传输失败后回到连接状态并按指数退避重试；处理器错误只记录，不中断循环。
pub struct IngestLoop<T: Transport> {
    transport: T,
    config: IngestConfig,
    state: watch::Sender<IngestState>,
}

impl<T: Transport> IngestLoop<T> {
    pub fn new(transport: T, config: IngestConfig) -> Self {
        let (state, _) = watch::channel(IngestState::Connecting);
        Self {
            transport,
            config: config.sanitized(),
            state,
        }
    }

    pub fn subscribe_state(&self) -> watch::Receiver<IngestState> {
        self.state.subscribe()
    }

    /// 运行直到 `shutdown` 变为 `true`（或其发送端被丢弃）。
    pub async fn run(mut self, handler: Arc<dyn MessageHandler>, mut shutdown: watch::Receiver<bool>) {
        let source = self.transport.describe();
        let mut backoff = self.config.reconnect_min;

        loop {
            if *shutdown.borrow() {
                break;
            }

            self.set_state(IngestState::Connecting);
            let connected = tokio::select! {
                result = self.transport.connect() => result,
                _ = wait_for_shutdown(&mut shutdown) => break,
            };
            if let Err(err) = connected {
                warn!(
                    target: "mavbridge.ingest",
                    source = %source,
                    error = %err,
                    retry_in_ms = backoff.as_millis() as u64,
                    "source_connect_failed"
                );
                if !sleep_or_shutdown(backoff, &mut shutdown).await {
                    break;
                }
                backoff = self.next_backoff(backoff);
                continue;
            }
            record_source_connect();
            info!(target: "mavbridge.ingest", source = %source, "source_connected");

            self.set_state(IngestState::AwaitingHandshake);
            let handshake = tokio::select! {
                result = self.transport.wait_heartbeat(self.config.handshake_timeout) => result,
                _ = wait_for_shutdown(&mut shutdown) => break,
            };
            match handshake {
                Ok(true) => {
                    info!(target: "mavbridge.ingest", source = %source, "heartbeat_received");
                }
                Ok(false) => {
                    record_handshake_timeout();
                    warn!(
                        target: "mavbridge.ingest",
                        source = %source,
                        timeout_ms = self.config.handshake_timeout.as_millis() as u64,
                        "heartbeat_timeout"
                    );
                }
                Err(err) => {
                    record_source_disconnect();
                    warn!(
                        target: "mavbridge.ingest",
                        source = %source,
                        error = %err,
                        "handshake_failed"
                    );
                    if !sleep_or_shutdown(backoff, &mut shutdown).await {
                        break;
                    }
                    backoff = self.next_backoff(backoff);
                    continue;
                }
            }

            self.set_state(IngestState::Streaming);
            match self.stream(handler.as_ref(), &mut shutdown).await {
                StreamEnd::Shutdown => break,
                StreamEnd::Failed { error, delivered } => {
                    record_source_disconnect();
                    if delivered > 0 {
                        backoff = self.config.reconnect_min;
                    }
                    warn!(
                        target: "mavbridge.ingest",
                        source = %source,
                        error = %error,
                        delivered = delivered,
                        retry_in_ms = backoff.as_millis() as u64,
                        "source_disconnected"
                    );
                    if !sleep_or_shutdown(backoff, &mut shutdown).await {
                        break;
                    }
                    backoff = self.next_backoff(backoff);
                }
            }
        }

        self.set_state(IngestState::Stopped);
        info!(target: "mavbridge.ingest", source = %source, "ingest_stopped");
    }

    async fn stream(
        &mut self,
        handler: &dyn MessageHandler,
        shutdown: &mut watch::Receiver<bool>,
    ) -> StreamEnd {
        let mut delivered = 0u64;
        loop {
            if *shutdown.borrow() {
                return StreamEnd::Shutdown;
            }
            match self.transport.poll_message().await {
                Ok(Some(message)) => {
                    delivered += 1;
                    let msgid = message.message_id();
                    if let Err(err) = handler.handle(message).await {
                        warn!(
                            target: "mavbridge.ingest",
                            msgid = msgid,
                            error = %err,
                            "handler_failed"
                        );
                    }
                }
                Ok(None) => {
                    if !sleep_or_shutdown(self.config.poll_interval, shutdown).await {
                        return StreamEnd::Shutdown;
                    }
                }
                Err(error) => return StreamEnd::Failed { error, delivered },
            }
        }
    }

    fn next_backoff(&self, current: Duration) -> Duration {
        current.saturating_mul(2).min(self.config.reconnect_max)
    }

    fn set_state(&self, next: IngestState) {
        let changed = self.state.send_if_modified(|state| {
            if *state == next {
                return false;
            }
            *state = next;
            true
        });
        if changed {
            debug!(target: "mavbridge.ingest", state = %next, "ingest_state_changed");
        }
    }
}

/// 睡眠 `duration`；期间收到关闭信号时返回 `false`。
async fn sleep_or_shutdown(duration: Duration, shutdown: &mut watch::Receiver<bool>) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(duration) => !*shutdown.borrow(),
        _ = wait_for_shutdown(shutdown) => false,
    }
}

async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}
