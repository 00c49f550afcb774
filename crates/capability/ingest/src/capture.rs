//! 通过 serde 数据模型捕获消息字段。
//!
//! 解码器生成的消息类型都实现了 `Serialize`；这里用一个只产出
//! `FieldValue` 的 `Serializer` 走一遍，得到保持声明顺序的字段列表。

use crate::shape::shape_fields;
use domain::{FieldValue, RawMessage};
use serde::Serialize;
use serde::ser;
use std::fmt;

/// 字段捕获错误。
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("capture failed: {0}")]
    Custom(String),
    #[error("expected a struct-like message, got {0}")]
    NotAStruct(String),
}

impl ser::Error for CaptureError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        CaptureError::Custom(msg.to_string())
    }
}

/// 把任意可序列化值捕获为 `FieldValue`。
pub fn capture_value<T: Serialize + ?Sized>(value: &T) -> Result<FieldValue, CaptureError> {
    value.serialize(FieldCapture)
}

/// 捕获一条消息的顶层字段。
///
/// 兼容内部标签（首个 `type` 字段等于消息名）与外部标签（单键包裹）两种枚举表示。
pub fn capture_fields<T: Serialize + ?Sized>(
    value: &T,
    message_name: &str,
) -> Result<Vec<(String, FieldValue)>, CaptureError> {
    let mut entries = match capture_value(value)? {
        FieldValue::Map(entries) => entries,
        other => return Err(CaptureError::NotAStruct(other.kind_name().to_string())),
    };

    if entries.len() == 1
        && entries[0].0 == message_name
        && matches!(entries[0].1, FieldValue::Map(_))
    {
        if let Some((_, FieldValue::Map(inner))) = entries.pop() {
            entries = inner;
        }
    }

    let tagged = matches!(
        entries.first(),
        Some((key, FieldValue::Str(tag))) if key == "type" && tag == message_name
    );
    if tagged {
        entries.remove(0);
    }
    Ok(entries)
}

/// 捕获后的消息；直接提供字段映射。
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedMessage {
    id: u32,
    name: String,
    fields: Vec<(String, FieldValue)>,
}

impl CapturedMessage {
    pub fn new(id: u32, name: impl Into<String>, fields: Vec<(String, FieldValue)>) -> Self {
        Self {
            id,
            name: name.into(),
            fields,
        }
    }

    pub fn capture<T: Serialize + ?Sized>(
        id: u32,
        name: &str,
        message: &T,
    ) -> Result<Self, CaptureError> {
        Ok(Self::new(id, name, capture_fields(message, name)?))
    }

    /// 捕获一条 `mavlink` 生成的消息，并还原枚举、位标志与 `char[N]` 字段。
    pub fn from_mavlink<M>(message: &M) -> Result<Self, CaptureError>
    where
        M: mavlink::Message + Serialize,
    {
        let name = message.message_name();
        let fields = shape_fields(name, capture_fields(message, name)?);
        Ok(Self::new(message.message_id(), name, fields))
    }
}

impl RawMessage for CapturedMessage {
    fn message_id(&self) -> u32 {
        self.id
    }

    fn type_name(&self) -> &str {
        &self.name
    }

    fn field_names(&self) -> Vec<String> {
        self.fields.iter().map(|(name, _)| name.clone()).collect()
    }

    fn field(&self, name: &str) -> Option<FieldValue> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.clone())
    }

    fn to_field_map(&self) -> Option<Vec<(String, FieldValue)>> {
        Some(self.fields.clone())
    }
}

#[derive(Clone, Copy)]
struct FieldCapture;

impl ser::Serializer for FieldCapture {
    type Ok = FieldValue;
    type Error = CaptureError;
    type SerializeSeq = SeqCapture;
    type SerializeTuple = SeqCapture;
    type SerializeTupleStruct = SeqCapture;
    type SerializeTupleVariant = SeqCapture;
    type SerializeMap = MapCapture;
    type SerializeStruct = MapCapture;
    type SerializeStructVariant = MapCapture;

    fn serialize_bool(self, v: bool) -> Result<FieldValue, CaptureError> {
        Ok(FieldValue::Bool(v))
    }

    fn serialize_i8(self, v: i8) -> Result<FieldValue, CaptureError> {
        Ok(FieldValue::Int(v.into()))
    }

    fn serialize_i16(self, v: i16) -> Result<FieldValue, CaptureError> {
        Ok(FieldValue::Int(v.into()))
    }

    fn serialize_i32(self, v: i32) -> Result<FieldValue, CaptureError> {
        Ok(FieldValue::Int(v.into()))
    }

    fn serialize_i64(self, v: i64) -> Result<FieldValue, CaptureError> {
        Ok(FieldValue::Int(v))
    }

    fn serialize_i128(self, v: i128) -> Result<FieldValue, CaptureError> {
        Ok(i64::try_from(v)
            .map(FieldValue::Int)
            .unwrap_or_else(|_| FieldValue::Decimal(v.to_string())))
    }

    fn serialize_u8(self, v: u8) -> Result<FieldValue, CaptureError> {
        Ok(FieldValue::UInt(v.into()))
    }

    fn serialize_u16(self, v: u16) -> Result<FieldValue, CaptureError> {
        Ok(FieldValue::UInt(v.into()))
    }

    fn serialize_u32(self, v: u32) -> Result<FieldValue, CaptureError> {
        Ok(FieldValue::UInt(v.into()))
    }

    fn serialize_u64(self, v: u64) -> Result<FieldValue, CaptureError> {
        Ok(FieldValue::UInt(v))
    }

    fn serialize_u128(self, v: u128) -> Result<FieldValue, CaptureError> {
        Ok(u64::try_from(v)
            .map(FieldValue::UInt)
            .unwrap_or_else(|_| FieldValue::Decimal(v.to_string())))
    }

    fn serialize_f32(self, v: f32) -> Result<FieldValue, CaptureError> {
        Ok(FieldValue::Float(v.into()))
    }

    fn serialize_f64(self, v: f64) -> Result<FieldValue, CaptureError> {
        Ok(FieldValue::Float(v))
    }

    fn serialize_char(self, v: char) -> Result<FieldValue, CaptureError> {
        Ok(FieldValue::Char(v))
    }

    fn serialize_str(self, v: &str) -> Result<FieldValue, CaptureError> {
        Ok(FieldValue::Str(v.to_string()))
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<FieldValue, CaptureError> {
        Ok(FieldValue::Bytes(v.to_vec()))
    }

    fn serialize_none(self) -> Result<FieldValue, CaptureError> {
        Ok(FieldValue::Null)
    }

    fn serialize_some<T>(self, value: &T) -> Result<FieldValue, CaptureError>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<FieldValue, CaptureError> {
        Ok(FieldValue::Null)
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<FieldValue, CaptureError> {
        Ok(FieldValue::Null)
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<FieldValue, CaptureError> {
        Ok(FieldValue::Enum {
            name: variant.to_string(),
            value: None,
        })
    }

    fn serialize_newtype_struct<T>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<FieldValue, CaptureError>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T>(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<FieldValue, CaptureError>
    where
        T: ?Sized + Serialize,
    {
        Ok(FieldValue::Map(vec![(
            variant.to_string(),
            value.serialize(self)?,
        )]))
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<SeqCapture, CaptureError> {
        Ok(SeqCapture::new(SeqKind::Array, len.unwrap_or(0), None))
    }

    fn serialize_tuple(self, len: usize) -> Result<SeqCapture, CaptureError> {
        Ok(SeqCapture::new(SeqKind::Tuple, len, None))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<SeqCapture, CaptureError> {
        Ok(SeqCapture::new(SeqKind::Tuple, len, None))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<SeqCapture, CaptureError> {
        Ok(SeqCapture::new(SeqKind::Tuple, len, Some(variant)))
    }

    fn serialize_map(self, len: Option<usize>) -> Result<MapCapture, CaptureError> {
        Ok(MapCapture::new(len.unwrap_or(0), None))
    }

    fn serialize_struct(self, _name: &'static str, len: usize) -> Result<MapCapture, CaptureError> {
        Ok(MapCapture::new(len, None))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<MapCapture, CaptureError> {
        Ok(MapCapture::new(len, Some(variant)))
    }
}

#[derive(Clone, Copy)]
enum SeqKind {
    Array,
    Tuple,
}

struct SeqCapture {
    kind: SeqKind,
    items: Vec<FieldValue>,
    variant: Option<&'static str>,
}

impl SeqCapture {
    fn new(kind: SeqKind, len: usize, variant: Option<&'static str>) -> Self {
        Self {
            kind,
            items: Vec::with_capacity(len),
            variant,
        }
    }

    fn push<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), CaptureError> {
        self.items.push(value.serialize(FieldCapture)?);
        Ok(())
    }

    fn finish(self) -> FieldValue {
        let value = match self.kind {
            SeqKind::Array => FieldValue::Array(self.items),
            SeqKind::Tuple => FieldValue::Tuple(self.items),
        };
        wrap_variant(self.variant, value)
    }
}

impl ser::SerializeSeq for SeqCapture {
    type Ok = FieldValue;
    type Error = CaptureError;

    fn serialize_element<T>(&mut self, value: &T) -> Result<(), CaptureError>
    where
        T: ?Sized + Serialize,
    {
        self.push(value)
    }

    fn end(self) -> Result<FieldValue, CaptureError> {
        Ok(self.finish())
    }
}

impl ser::SerializeTuple for SeqCapture {
    type Ok = FieldValue;
    type Error = CaptureError;

    fn serialize_element<T>(&mut self, value: &T) -> Result<(), CaptureError>
    where
        T: ?Sized + Serialize,
    {
        self.push(value)
    }

    fn end(self) -> Result<FieldValue, CaptureError> {
        Ok(self.finish())
    }
}

impl ser::SerializeTupleStruct for SeqCapture {
    type Ok = FieldValue;
    type Error = CaptureError;

    fn serialize_field<T>(&mut self, value: &T) -> Result<(), CaptureError>
    where
        T: ?Sized + Serialize,
    {
        self.push(value)
    }

    fn end(self) -> Result<FieldValue, CaptureError> {
        Ok(self.finish())
    }
}

impl ser::SerializeTupleVariant for SeqCapture {
    type Ok = FieldValue;
    type Error = CaptureError;

    fn serialize_field<T>(&mut self, value: &T) -> Result<(), CaptureError>
    where
        T: ?Sized + Serialize,
    {
        self.push(value)
    }

    fn end(self) -> Result<FieldValue, CaptureError> {
        Ok(self.finish())
    }
}

struct MapCapture {
    entries: Vec<(String, FieldValue)>,
    pending_key: Option<String>,
    variant: Option<&'static str>,
}

impl MapCapture {
    fn new(len: usize, variant: Option<&'static str>) -> Self {
        Self {
            entries: Vec::with_capacity(len),
            pending_key: None,
            variant,
        }
    }

    fn field<T: ?Sized + Serialize>(&mut self, key: String, value: &T) -> Result<(), CaptureError> {
        let value = value.serialize(FieldCapture)?;
        self.entries.push((key, value));
        Ok(())
    }

    fn finish(self) -> FieldValue {
        wrap_variant(self.variant, FieldValue::Map(self.entries))
    }
}

impl ser::SerializeMap for MapCapture {
    type Ok = FieldValue;
    type Error = CaptureError;

    fn serialize_key<T>(&mut self, key: &T) -> Result<(), CaptureError>
    where
        T: ?Sized + Serialize,
    {
        self.pending_key = Some(key_string(key.serialize(FieldCapture)?));
        Ok(())
    }

    fn serialize_value<T>(&mut self, value: &T) -> Result<(), CaptureError>
    where
        T: ?Sized + Serialize,
    {
        let key = self
            .pending_key
            .take()
            .ok_or_else(|| CaptureError::Custom("map value without key".to_string()))?;
        self.field(key, value)
    }

    fn end(self) -> Result<FieldValue, CaptureError> {
        Ok(self.finish())
    }
}

impl ser::SerializeStruct for MapCapture {
    type Ok = FieldValue;
    type Error = CaptureError;

    fn serialize_field<T>(&mut self, key: &'static str, value: &T) -> Result<(), CaptureError>
    where
        T: ?Sized + Serialize,
    {
        self.field(key.to_string(), value)
    }

    fn end(self) -> Result<FieldValue, CaptureError> {
        Ok(self.finish())
    }
}

impl ser::SerializeStructVariant for MapCapture {
    type Ok = FieldValue;
    type Error = CaptureError;

    fn serialize_field<T>(&mut self, key: &'static str, value: &T) -> Result<(), CaptureError>
    where
        T: ?Sized + Serialize,
    {
        self.field(key.to_string(), value)
    }

    fn end(self) -> Result<FieldValue, CaptureError> {
        Ok(self.finish())
    }
}

fn wrap_variant(variant: Option<&'static str>, value: FieldValue) -> FieldValue {
    match variant {
        Some(variant) => FieldValue::Map(vec![(variant.to_string(), value)]),
        None => value,
    }
}

fn key_string(key: FieldValue) -> String {
    match key {
        FieldValue::Str(text) | FieldValue::Decimal(text) => text,
        FieldValue::Int(v) => v.to_string(),
        FieldValue::UInt(v) => v.to_string(),
        FieldValue::Float(v) => v.to_string(),
        FieldValue::Bool(v) => v.to_string(),
        FieldValue::Char(v) => v.to_string(),
        FieldValue::Enum { name, .. } => name,
        other => format!("{other:?}"),
    }
}

