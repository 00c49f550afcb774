//! 单个订阅者会话：出站队列 → 文本帧，入站帧仅用于探测关闭与存活。
//!
//! 写出在独立任务上进行；对端不读时发送可能一直挂起，
//! 主循环仍能按存活期限和关闭信号结束会话。

use crate::AppState;
use crate::shutdown::wait_for_shutdown;
use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use mavbridge_broadcast::{ChannelSink, Payload};
use mavbridge_telemetry::{
    new_session_id, record_subscriber_connected, record_subscriber_disconnected,
};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{Instrument, debug, info, info_span};

/// 发送关闭帧、等待写任务收尾的上限。
const CLOSE_GRACE: Duration = Duration::from_secs(1);
/// 存活检查的最小间隔。
const MIN_KEEPALIVE_CHECK: Duration = Duration::from_millis(50);

#[derive(Debug, Clone)]
enum CloseReason {
    ClientClosed,
    /// 广播方因发送失败将其移出注册表。
    Pruned,
    KeepaliveTimeout,
    SendFailed(String),
    ReadFailed(String),
    Shutdown,
}

impl CloseReason {
    fn sends_close_frame(&self) -> bool {
        matches!(
            self,
            CloseReason::Pruned | CloseReason::KeepaliveTimeout | CloseReason::Shutdown
        )
    }
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloseReason::ClientClosed => f.write_str("client_closed"),
            CloseReason::Pruned => f.write_str("pruned"),
            CloseReason::KeepaliveTimeout => f.write_str("keepalive_timeout"),
            CloseReason::SendFailed(err) => write!(f, "send_failed: {err}"),
            CloseReason::ReadFailed(err) => write!(f, "read_failed: {err}"),
            CloseReason::Shutdown => f.write_str("shutdown"),
        }
    }
}

pub async fn run_session(socket: WebSocket, state: AppState, peer: String) {
    let span = info_span!("session", session_id = %new_session_id(), peer = %peer);
    session(socket, state, peer).instrument(span).await
}

async fn session(socket: WebSocket, state: AppState, peer: String) {
    let (sink, outbound) = ChannelSink::channel(state.session.queue_capacity);
    let id = state.registry.register(Arc::new(sink), peer);
    record_subscriber_connected();
    info!(
        target: "mavbridge.session",
        subscriber = %id,
        subscribers = state.registry.len(),
        "subscriber_connected"
    );

    let (writer, mut reader) = socket.split();
    let (stop_tx, stop_rx) = oneshot::channel();
    let mut writer_task = tokio::spawn(
        write_loop(writer, outbound, state.session.ping_interval, stop_rx).in_current_span(),
    );

    let mut shutdown = state.shutdown.clone();
    let keepalive = state.session.ping_interval + state.session.ping_timeout;
    let check_every = state
        .session
        .ping_interval
        .min(state.session.ping_timeout)
        .max(MIN_KEEPALIVE_CHECK);
    let mut check = tokio::time::interval_at(Instant::now() + check_every, check_every);
    check.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last_seen = Instant::now();

    let mut writer_done = false;
    let reason = loop {
        tokio::select! {
            finished = &mut writer_task => {
                writer_done = true;
                break finished.unwrap_or_else(|err| CloseReason::SendFailed(err.to_string()));
            }
            frame = reader.next() => match frame {
                Some(Ok(Message::Close(_))) | None => break CloseReason::ClientClosed,
                Some(Ok(_)) => last_seen = Instant::now(),
                Some(Err(err)) => break CloseReason::ReadFailed(err.to_string()),
            },
            _ = check.tick() => {
                if last_seen.elapsed() > keepalive {
                    break CloseReason::KeepaliveTimeout;
                }
            }
            _ = wait_for_shutdown(&mut shutdown) => break CloseReason::Shutdown,
        }
    };

    if !writer_done {
        let _ = stop_tx.send(reason.clone());
        if tokio::time::timeout(CLOSE_GRACE, &mut writer_task).await.is_err() {
            writer_task.abort();
            debug!(target: "mavbridge.session", subscriber = %id, "writer_aborted");
        }
    }

    state.registry.deregister(id);
    record_subscriber_disconnected();
    info!(
        target: "mavbridge.session",
        subscriber = %id,
        reason = %reason,
        subscribers = state.registry.len(),
        "subscriber_disconnected"
    );
}

/// 出站写循环：转发队列中的帧并定时发送 ping。
///
/// 队列关闭（被移出注册表）或写失败时自行结束；收到停止请求时
/// 按原因决定是否发送关闭帧。
async fn write_loop(
    mut writer: SplitSink<WebSocket, Message>,
    mut outbound: mpsc::Receiver<Payload>,
    ping_interval: Duration,
    mut stop: oneshot::Receiver<CloseReason>,
) -> CloseReason {
    let mut ping = tokio::time::interval_at(Instant::now() + ping_interval, ping_interval);
    ping.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let reason = loop {
        tokio::select! {
            payload = outbound.recv() => match payload {
                Some(payload) => {
                    if let Err(err) = writer.send(Message::Text(payload.to_string())).await {
                        return CloseReason::SendFailed(err.to_string());
                    }
                }
                None => break CloseReason::Pruned,
            },
            _ = ping.tick() => {
                if let Err(err) = writer.send(Message::Ping(Vec::new())).await {
                    return CloseReason::SendFailed(err.to_string());
                }
            }
            requested = &mut stop => break requested.unwrap_or(CloseReason::Shutdown),
        }
    };

    if reason.sends_close_frame() {
        let _ = tokio::time::timeout(CLOSE_GRACE, writer.send(Message::Close(None))).await;
    }
    reason
}
