//! 接入链路装配
//!
//! 数据源 → 翻译器 → 广播器。每条消息在接入任务内同步完成翻译与投递，
//! 投递只做非阻塞入队，不会拖慢轮询。

use async_trait::async_trait;
use domain::RawMessage;
use mavbridge_broadcast::Broadcaster;
use mavbridge_config::{BridgeConfig, ZeroTimeUsec};
use mavbridge_ingest::{
    Dialect, IngestConfig, IngestError, IngestLoop, IngestState, MavlinkEndpoint, MavlinkTransport,
    MessageHandler,
};
use mavbridge_normalize::{TimestampPolicy, Translator};
use mavbridge_telemetry::{record_message_received, record_record_translated};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// 翻译并广播每条消息。
pub struct BridgeHandler {
    translator: Translator,
    broadcaster: Broadcaster,
}

impl BridgeHandler {
    pub fn new(translator: Translator, broadcaster: Broadcaster) -> Self {
        Self {
            translator,
            broadcaster,
        }
    }
}

#[async_trait]
impl MessageHandler for BridgeHandler {
    async fn handle(&self, message: Box<dyn RawMessage>) -> Result<(), IngestError> {
        record_message_received();
        let record = self.translator.translate(message.as_ref());
        record_record_translated();

        match self.broadcaster.broadcast(&record).await {
            Ok(report) => {
                if !report.skipped {
                    debug!(
                        target: "mavbridge.ingest",
                        msgid = record.msgid,
                        name = %record.name,
                        recipients = report.recipients,
                        delivered = report.delivered,
                        pruned = report.pruned,
                        "record_broadcast"
                    );
                }
                Ok(())
            }
            Err(err) => {
                warn!(
                    target: "mavbridge.ingest",
                    msgid = record.msgid,
                    name = %record.name,
                    error = %err,
                    "broadcast_failed"
                );
                Err(IngestError::Handler(err.to_string()))
            }
        }
    }
}

pub fn timestamp_policy(config: &BridgeConfig) -> TimestampPolicy {
    match config.zero_time_usec {
        ZeroTimeUsec::Absent => TimestampPolicy::ZeroAsAbsent,
        ZeroTimeUsec::Valid => TimestampPolicy::ZeroAsValid,
    }
}

pub fn ingest_config(config: &BridgeConfig) -> IngestConfig {
    IngestConfig {
        handshake_timeout: config.heartbeat_timeout(),
        poll_interval: config.poll_interval(),
        reconnect_min: config.reconnect_min(),
        reconnect_max: config.reconnect_max(),
    }
}

/// 启动接入任务，返回任务句柄与状态订阅。
pub fn spawn_ingest(
    config: &BridgeConfig,
    endpoint: MavlinkEndpoint,
    dialect: Dialect,
    broadcaster: Broadcaster,
    shutdown: watch::Receiver<bool>,
) -> (tokio::task::JoinHandle<()>, watch::Receiver<IngestState>) {
    let handler = Arc::new(BridgeHandler::new(
        Translator::new(timestamp_policy(config)),
        broadcaster,
    ));

    info!(
        target: "mavbridge.ingest",
        source = %endpoint,
        dialect = %dialect,
        "ingest_source_configured"
    );
    let transport = MavlinkTransport::new(endpoint, dialect, config.reader_queue);
    let ingest = IngestLoop::new(transport, ingest_config(config));
    let state = ingest.subscribe_state();
    let task = tokio::spawn(ingest.run(handler, shutdown));
    (task, state)
}
