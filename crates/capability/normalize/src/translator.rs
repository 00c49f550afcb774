use crate::value::normalize_value;
use domain::{
    FieldValue, OrderedMap, RawMessage, StructuredRecord, TIME_BOOT_MS_FIELD, TIME_USEC_FIELD,
};
use tracing::debug;

/// `time_usec == 0` 的处理策略。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimestampPolicy {
    /// 视为缺失，回退到 `time_boot_ms`。
    #[default]
    ZeroAsAbsent,
    /// 视为合法时间戳。
    ZeroAsValid,
}

/// 字段提取方式。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldSource {
    /// 解码器直接给出 name → value 映射。
    Direct,
    /// 逐个按声明字段名读取。
    ByName,
}

/// RawMessage → StructuredRecord 翻译器。
#[derive(Debug, Clone, Copy, Default)]
pub struct Translator {
    policy: TimestampPolicy,
}

impl Translator {
    pub fn new(policy: TimestampPolicy) -> Self {
        Self { policy }
    }

    /// 翻译一条消息。单个字段读取失败不会使整条翻译失败。
    pub fn translate<M: RawMessage + ?Sized>(&self, raw: &M) -> StructuredRecord {
        let (entries, source) = extract_fields(raw);
        if source == FieldSource::ByName {
            debug!(
                target: "mavbridge.normalize",
                msgid = raw.message_id(),
                name = raw.type_name(),
                "field_map_unsupported_read_by_name"
            );
        }

        let time_us = self.select_timestamp(&entries);
        let mut fields = OrderedMap::with_capacity(entries.len());
        let mut types = OrderedMap::with_capacity(entries.len());
        for (name, value) in &entries {
            types.insert(name.clone(), value.kind_name().to_string());
            fields.insert(name.clone(), normalize_value(value));
        }

        StructuredRecord {
            msgid: raw.message_id(),
            name: raw.type_name().to_string(),
            time_us,
            fields,
            types,
        }
    }

    /// 优先 `time_usec`，其次 `time_boot_ms`，都没有则为空。
    fn select_timestamp(&self, entries: &[(String, FieldValue)]) -> Option<u64> {
        match lookup(entries, TIME_USEC_FIELD).and_then(as_timestamp) {
            Some(0) if self.policy == TimestampPolicy::ZeroAsAbsent => {}
            Some(value) => return Some(value),
            None => {}
        }
        lookup(entries, TIME_BOOT_MS_FIELD).and_then(as_timestamp)
    }
}

/// 两段式字段提取：先直接映射，不支持时按声明字段名逐个读取。
pub(crate) fn extract_fields<M: RawMessage + ?Sized>(
    raw: &M,
) -> (Vec<(String, FieldValue)>, FieldSource) {
    if let Some(entries) = raw.to_field_map() {
        return (entries, FieldSource::Direct);
    }
    let entries = raw
        .field_names()
        .into_iter()
        .map(|name| {
            let value = raw.field(&name).unwrap_or(FieldValue::Null);
            (name, value)
        })
        .collect();
    (entries, FieldSource::ByName)
}

fn lookup<'a>(entries: &'a [(String, FieldValue)], name: &str) -> Option<&'a FieldValue> {
    entries
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value)
}

fn as_timestamp(value: &FieldValue) -> Option<u64> {
    match value {
        FieldValue::UInt(v) => Some(*v),
        FieldValue::Int(v) => u64::try_from(*v).ok(),
        FieldValue::Float(v) if v.is_finite() && *v >= 0.0 && v.fract() == 0.0 => {
            Some(*v as u64)
        }
        _ => None,
    }
}
