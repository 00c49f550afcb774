//! 字段值规整与消息翻译。
//!
//! ```text
//! RawMessage ──translate──▶ StructuredRecord
//!     │                         ▲
//!     └── FieldValue ──normalize_value──▶ NormalizedValue
//! ```

mod translator;
mod value;

pub use translator::{FieldSource, TimestampPolicy, Translator};
pub use value::{hex_encode, normalize_value};
