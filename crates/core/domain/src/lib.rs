//! 桥接链路共享的领域模型。

pub mod data;
pub mod message;

pub use data::{NormalizedValue, OrderedMap, StructuredRecord};
pub use message::{FieldValue, RawMessage, TIME_BOOT_MS_FIELD, TIME_USEC_FIELD};
