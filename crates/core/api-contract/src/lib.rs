//! 稳定的输出帧与 HTTP 响应契约。
//!
//! 每条消息对每个订阅者输出一个 JSON 对象，键固定为
//! `msgid`、`name`、`time_us`、`fields`、`types`。

use domain::{NormalizedValue, OrderedMap, StructuredRecord};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

/// 标准 API 响应封装。
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ApiError>,
}

/// 失败响应的错误体。
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ApiError {
                code: code.into(),
                message: message.into(),
            }),
        }
    }
}

/// 输出帧（借用 StructuredRecord，不复制字段）。
#[derive(Debug, Serialize)]
pub struct RecordFrame<'a> {
    pub msgid: u32,
    pub name: &'a str,
    pub time_us: Option<u64>,
    pub fields: MapRef<'a, NormalizedValue>,
    pub types: MapRef<'a, String>,
}

impl<'a> From<&'a StructuredRecord> for RecordFrame<'a> {
    fn from(record: &'a StructuredRecord) -> Self {
        Self {
            msgid: record.msgid,
            name: &record.name,
            time_us: record.time_us,
            fields: MapRef(&record.fields),
            types: MapRef(&record.types),
        }
    }
}

/// 把记录编码为 JSON 文本（UTF-8 原样输出，不做 ASCII 转义）。
pub fn encode_record(record: &StructuredRecord) -> Result<String, serde_json::Error> {
    serde_json::to_string(&RecordFrame::from(record))
}

/// OrderedMap 的序列化视图，按插入顺序输出键。
#[derive(Debug)]
pub struct MapRef<'a, V>(pub &'a OrderedMap<V>);

impl Serialize for MapRef<'_, NormalizedValue> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in self.0.iter() {
            map.serialize_entry(key, &ValueRef(value))?;
        }
        map.end()
    }
}

impl Serialize for MapRef<'_, String> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in self.0.iter() {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// NormalizedValue 的序列化视图。
#[derive(Debug)]
pub struct ValueRef<'a>(pub &'a NormalizedValue);

impl Serialize for ValueRef<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0 {
            NormalizedValue::Null => serializer.serialize_unit(),
            NormalizedValue::Bool(value) => serializer.serialize_bool(*value),
            NormalizedValue::Int(value) => serializer.serialize_i64(*value),
            NormalizedValue::UInt(value) => serializer.serialize_u64(*value),
            NormalizedValue::Float(value) => serializer.serialize_f64(*value),
            NormalizedValue::Str(value) => serializer.serialize_str(value),
            NormalizedValue::Seq(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(&ValueRef(item))?;
                }
                seq.end()
            }
            NormalizedValue::Map(entries) => MapRef(entries).serialize(serializer),
        }
    }
}

/// 健康检查响应体。
#[derive(Debug, Serialize)]
pub struct HealthDto {
    pub ok: bool,
    pub source_state: String,
    pub subscribers: usize,
}

/// 指标快照响应体。
#[derive(Debug, Serialize)]
pub struct MetricsSnapshotDto {
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
