//! 追踪初始化、会话 ID 与计数指标。

use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::{EnvFilter, fmt};

/// 基础指标快照。
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsSnapshot {
    pub messages_received: u64,
    pub records_translated: u64,
    pub payloads_encoded: u64,
    pub broadcasts_skipped: u64,
    pub deliveries: u64,
    pub delivery_failures: u64,
    pub subscribers_connected: u64,
    pub subscribers_disconnected: u64,
    pub subscribers_pruned: u64,
    pub source_connects: u64,
    pub source_disconnects: u64,
    pub handshake_timeouts: u64,
    pub decode_errors: u64,
}

/// 进程级计数指标。
pub struct TelemetryMetrics {
    messages_received: AtomicU64,
    records_translated: AtomicU64,
    payloads_encoded: AtomicU64,
    broadcasts_skipped: AtomicU64,
    deliveries: AtomicU64,
    delivery_failures: AtomicU64,
    subscribers_connected: AtomicU64,
    subscribers_disconnected: AtomicU64,
    subscribers_pruned: AtomicU64,
    source_connects: AtomicU64,
    source_disconnects: AtomicU64,
    handshake_timeouts: AtomicU64,
    decode_errors: AtomicU64,
}

impl TelemetryMetrics {
    pub fn new() -> Self {
        Self {
            messages_received: AtomicU64::new(0),
            records_translated: AtomicU64::new(0),
            payloads_encoded: AtomicU64::new(0),
            broadcasts_skipped: AtomicU64::new(0),
            deliveries: AtomicU64::new(0),
            delivery_failures: AtomicU64::new(0),
            subscribers_connected: AtomicU64::new(0),
            subscribers_disconnected: AtomicU64::new(0),
            subscribers_pruned: AtomicU64::new(0),
            source_connects: AtomicU64::new(0),
            source_disconnects: AtomicU64::new(0),
            handshake_timeouts: AtomicU64::new(0),
            decode_errors: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            messages_received: self.messages_received.load(Ordering::Relaxed),
            records_translated: self.records_translated.load(Ordering::Relaxed),
            payloads_encoded: self.payloads_encoded.load(Ordering::Relaxed),
            broadcasts_skipped: self.broadcasts_skipped.load(Ordering::Relaxed),
            deliveries: self.deliveries.load(Ordering::Relaxed),
            delivery_failures: self.delivery_failures.load(Ordering::Relaxed),
            subscribers_connected: self.subscribers_connected.load(Ordering::Relaxed),
            subscribers_disconnected: self.subscribers_disconnected.load(Ordering::Relaxed),
            subscribers_pruned: self.subscribers_pruned.load(Ordering::Relaxed),
            source_connects: self.source_connects.load(Ordering::Relaxed),
            source_disconnects: self.source_disconnects.load(Ordering::Relaxed),
            handshake_timeouts: self.handshake_timeouts.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
        }
    }
}

impl Default for TelemetryMetrics {
    fn default() -> Self {
        Self::new()
    }
}

static METRICS: OnceLock<TelemetryMetrics> = OnceLock::new();

/// 获取全局指标实例。
pub fn metrics() -> &'static TelemetryMetrics {
    METRICS.get_or_init(TelemetryMetrics::new)
}

/// 初始化 tracing（默认 info）。
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}

/// 生成订阅者会话 ID（日志关联用）。
pub fn new_session_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// 记录收到的已解码消息。
pub fn record_message_received() {
    metrics().messages_received.fetch_add(1, Ordering::Relaxed);
}

/// 记录翻译完成的记录。
pub fn record_record_translated() {
    metrics().records_translated.fetch_add(1, Ordering::Relaxed);
}

/// 记录一次载荷编码（每次广播至多一次）。
pub fn record_payload_encoded() {
    metrics().payloads_encoded.fetch_add(1, Ordering::Relaxed);
}

/// 记录因无订阅者而跳过的广播。
pub fn record_broadcast_skipped() {
    metrics().broadcasts_skipped.fetch_add(1, Ordering::Relaxed);
}

/// 记录成功投递次数。
pub fn record_deliveries(count: u64) {
    metrics().deliveries.fetch_add(count, Ordering::Relaxed);
}

/// 记录投递失败次数。
pub fn record_delivery_failures(count: u64) {
    metrics()
        .delivery_failures
        .fetch_add(count, Ordering::Relaxed);
}

/// 记录订阅者接入。
pub fn record_subscriber_connected() {
    metrics()
        .subscribers_connected
        .fetch_add(1, Ordering::Relaxed);
}

/// 记录订阅者断开。
pub fn record_subscriber_disconnected() {
    metrics()
        .subscribers_disconnected
        .fetch_add(1, Ordering::Relaxed);
}

/// 记录因发送失败被剔除的订阅者。
pub fn record_subscribers_pruned(count: u64) {
    metrics()
        .subscribers_pruned
        .fetch_add(count, Ordering::Relaxed);
}

/// 记录数据源连接建立。
pub fn record_source_connect() {
    metrics().source_connects.fetch_add(1, Ordering::Relaxed);
}

/// 记录数据源断开（触发重连）。
pub fn record_source_disconnect() {
    metrics().source_disconnects.fetch_add(1, Ordering::Relaxed);
}

/// 记录握手等待超时。
pub fn record_handshake_timeout() {
    metrics().handshake_timeouts.fetch_add(1, Ordering::Relaxed);
}

/// 记录解码失败（报文被跳过）。
pub fn record_decode_error() {
    metrics().decode_errors.fetch_add(1, Ordering::Relaxed);
}
