//! 基于 `mavlink` crate 的传输实现。
//!
//! `mavlink` 的连接是阻塞式的，这里用一个独立读线程接收并捕获字段，
//! 再经有界通道交给异步侧做非阻塞轮询。

use crate::capture::CapturedMessage;
use crate::endpoint::{Dialect, MavlinkEndpoint};
use crate::{IngestError, Transport};
use async_trait::async_trait;
use domain::RawMessage;
use mavbridge_telemetry::record_decode_error;
use mavlink::MavConnection;
use mavlink::error::MessageReadError;
use serde::Serialize;
use std::collections::VecDeque;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::sync::mpsc::error::TryRecvError;
use tracing::{debug, info, warn};

/// 心跳消息 ID（所有方言一致）。
pub const HEARTBEAT_MESSAGE_ID: u32 = 0;

enum ReaderEvent {
    Message(CapturedMessage),
    Failed(String),
}

struct ReaderLink {
    rx: mpsc::Receiver<ReaderEvent>,
    alive: Arc<AtomicBool>,
}

impl Drop for ReaderLink {
    fn drop(&mut self) {
        // 读线程在下一次 recv 返回后退出。
        self.alive.store(false, Ordering::Relaxed);
    }
}

/// MAVLink 数据源。
pub struct MavlinkTransport {
    endpoint: MavlinkEndpoint,
    dialect: Dialect,
    queue_capacity: usize,
    reader: Option<ReaderLink>,
    /// 握手期间收到的消息，随后按到达顺序交出。
    pending: VecDeque<CapturedMessage>,
}

impl MavlinkTransport {
    pub fn new(endpoint: MavlinkEndpoint, dialect: Dialect, queue_capacity: usize) -> Self {
        Self {
            endpoint,
            dialect,
            queue_capacity: queue_capacity.max(1),
            reader: None,
            pending: VecDeque::new(),
        }
    }

    fn disconnect(&mut self, reason: impl Into<String>) -> IngestError {
        self.reader = None;
        IngestError::Disconnected(reason.into())
    }
}

#[async_trait]
impl Transport for MavlinkTransport {
    async fn connect(&mut self) -> Result<(), IngestError> {
        self.reader = None;
        self.pending.clear();

        let address = self.endpoint.connection_string();
        let dialect = self.dialect;
        let (tx, rx) = mpsc::channel(self.queue_capacity);
        let alive = Arc::new(AtomicBool::new(true));
        let reader_alive = Arc::clone(&alive);

        // 打开连接可能长时间阻塞（tcp 出站、串口）；不使用运行时的阻塞线程池。
        let (done_tx, done_rx) = oneshot::channel();
        {
            let address = address.clone();
            std::thread::Builder::new()
                .name("mavlink-connect".to_string())
                .spawn(move || {
                    let _ = done_tx.send(open_reader(dialect, &address, tx, reader_alive));
                })
                .map_err(|err| IngestError::Connect(err.to_string()))?;
        }
        done_rx
            .await
            .map_err(|_| IngestError::Connect(format!("{address}: connect thread exited")))?
            .map_err(|err| IngestError::Connect(format!("{address}: {err}")))?;

        info!(
            target: "mavbridge.ingest",
            address = %address,
            dialect = %dialect,
            "mavlink_reader_started"
        );
        self.reader = Some(ReaderLink { rx, alive });
        Ok(())
    }

    async fn wait_heartbeat(&mut self, timeout: Duration) -> Result<bool, IngestError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let Some(link) = self.reader.as_mut() else {
                return Err(IngestError::Disconnected("not connected".to_string()));
            };
            match tokio::time::timeout_at(deadline, link.rx.recv()).await {
                Err(_) => return Ok(false),
                Ok(None) => return Err(self.disconnect("reader stopped")),
                Ok(Some(ReaderEvent::Failed(reason))) => return Err(self.disconnect(reason)),
                Ok(Some(ReaderEvent::Message(message))) => {
                    let is_heartbeat = message.message_id() == HEARTBEAT_MESSAGE_ID;
                    self.pending.push_back(message);
                    if is_heartbeat {
                        return Ok(true);
                    }
                }
            }
        }
    }

    async fn poll_message(&mut self) -> Result<Option<Box<dyn RawMessage>>, IngestError> {
        if let Some(message) = self.pending.pop_front() {
            return Ok(Some(Box::new(message)));
        }
        let Some(link) = self.reader.as_mut() else {
            return Err(IngestError::Disconnected("not connected".to_string()));
        };
        match link.rx.try_recv() {
            Ok(ReaderEvent::Message(message)) => Ok(Some(Box::new(message))),
            Ok(ReaderEvent::Failed(reason)) => Err(self.disconnect(reason)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(self.disconnect("reader stopped")),
        }
    }

    fn describe(&self) -> String {
        format!("{} ({})", self.endpoint, self.dialect)
    }
}

fn open_reader(
    dialect: Dialect,
    address: &str,
    tx: mpsc::Sender<ReaderEvent>,
    alive: Arc<AtomicBool>,
) -> io::Result<()> {
    match dialect {
        Dialect::Common => start_reader::<mavlink::common::MavMessage>(address, tx, alive),
        Dialect::ArduPilotMega => {
            start_reader::<mavlink::ardupilotmega::MavMessage>(address, tx, alive)
        }
        Dialect::Minimal => start_reader::<mavlink::minimal::MavMessage>(address, tx, alive),
    }
}

fn start_reader<M>(
    address: &str,
    tx: mpsc::Sender<ReaderEvent>,
    alive: Arc<AtomicBool>,
) -> io::Result<()>
where
    M: mavlink::Message + Serialize + Send + Sync + 'static,
{
    let connection = mavlink::connect::<M>(address)?;
    std::thread::Builder::new()
        .name("mavlink-reader".to_string())
        .spawn(move || read_loop(&*connection, &tx, &alive))?;
    Ok(())
}

fn read_loop<M>(
    connection: &(dyn MavConnection<M> + Send + Sync),
    tx: &mpsc::Sender<ReaderEvent>,
    alive: &AtomicBool,
) where
    M: mavlink::Message + Serialize,
{
    while alive.load(Ordering::Relaxed) {
        match connection.recv() {
            Ok((_header, message)) => {
                match CapturedMessage::from_mavlink(&message) {
                    Ok(captured) => {
                        if tx.blocking_send(ReaderEvent::Message(captured)).is_err() {
                            break;
                        }
                    }
                    Err(err) => {
                        record_decode_error();
                        debug!(
                            target: "mavbridge.ingest",
                            msgid = message.message_id(),
                            error = %err,
                            "field_capture_failed"
                        );
                    }
                }
            }
            Err(MessageReadError::Io(err)) => {
                warn!(target: "mavbridge.ingest", error = %err, "mavlink_read_failed");
                let _ = tx.blocking_send(ReaderEvent::Failed(err.to_string()));
                break;
            }
            Err(err) => {
                record_decode_error();
                debug!(target: "mavbridge.ingest", error = %err, "mavlink_parse_failed");
            }
        }
    }
    debug!(target: "mavbridge.ingest", "mavlink_reader_exited");
}
