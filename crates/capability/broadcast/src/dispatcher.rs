use crate::BroadcastError;
use crate::registry::{SubscriberId, SubscriberRegistry};
use crate::sink::{Payload, SendError};
use domain::StructuredRecord;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// 记录编码器：每次广播至多调用一次。
pub trait RecordEncoder: Send + Sync {
    fn encode(&self, record: &StructuredRecord) -> Result<Payload, BroadcastError>;
}

/// 默认 JSON 编码器（输出帧契约见 `api_contract::RecordFrame`）。
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonEncoder;

impl RecordEncoder for JsonEncoder {
    fn encode(&self, record: &StructuredRecord) -> Result<Payload, BroadcastError> {
        api_contract::encode_record(record)
            .map(Payload::from)
            .map_err(|err| BroadcastError::Encode(err.to_string()))
    }
}

/// 单次广播结果。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// 快照中的订阅者数。
    pub recipients: usize,
    pub delivered: usize,
    /// 本次被移出注册表的订阅者数。
    pub pruned: usize,
    /// 无订阅者，未编码。
    pub skipped: bool,
}

/// 广播分发器。
#[derive(Clone)]
pub struct Broadcaster {
    registry: Arc<SubscriberRegistry>,
    encoder: Arc<dyn RecordEncoder>,
    sequence: Arc<Mutex<()>>,
}

impl Broadcaster {
    pub fn new(registry: Arc<SubscriberRegistry>) -> Self {
        Self::with_encoder(registry, Arc::new(JsonEncoder))
    }

    pub fn with_encoder(registry: Arc<SubscriberRegistry>, encoder: Arc<dyn RecordEncoder>) -> Self {
        Self {
            registry,
            encoder,
            sequence: Arc::new(Mutex::new(())),
        }
    }

    /// 把一条记录发给当前所有订阅者。
    ///
    /// 单个订阅者发送失败只会使其被移除，不影响其他订阅者，也不会返回错误。
    pub async fn broadcast(&self, record: &StructuredRecord) -> Result<BroadcastReport, BroadcastError> {
        let _order = self.sequence.lock().await;

        let recipients = self.registry.snapshot();
        if recipients.is_empty() {
            mavbridge_telemetry::record_broadcast_skipped();
            return Ok(BroadcastReport {
                skipped: true,
                ..BroadcastReport::default()
            });
        }

        let payload = self.encoder.encode(record)?;
        mavbridge_telemetry::record_payload_encoded();

        let mut delivered = 0usize;
        let mut failed: Vec<(SubscriberId, SendError)> = Vec::new();
        for handle in &recipients {
            match handle.sink.try_send(Arc::clone(&payload)) {
                Ok(()) => delivered += 1,
                Err(err) => {
                    debug!(
                        target: "mavbridge.broadcast",
                        subscriber = %handle.id,
                        peer = %handle.peer,
                        error = %err,
                        "send_failed"
                    );
                    failed.push((handle.id, err));
                }
            }
        }

        let mut pruned = 0usize;
        for (id, reason) in &failed {
            if self.registry.deregister(*id) {
                pruned += 1;
                warn!(
                    target: "mavbridge.broadcast",
                    subscriber = %id,
                    reason = %reason,
                    "subscriber_pruned"
                );
            }
        }

        mavbridge_telemetry::record_deliveries(delivered as u64);
        mavbridge_telemetry::record_delivery_failures(failed.len() as u64);
        mavbridge_telemetry::record_subscribers_pruned(pruned as u64);

        Ok(BroadcastReport {
            recipients: recipients.len(),
            delivered,
            pruned,
            skipped: false,
        })
    }
}
