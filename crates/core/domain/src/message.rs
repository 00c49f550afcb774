/// 微秒级绝对时间戳字段名。
pub const TIME_USEC_FIELD: &str = "time_usec";
/// 开机以来毫秒时间戳字段名。
pub const TIME_BOOT_MS_FIELD: &str = "time_boot_ms";

/// 解码器产出的原始字段值。
///
/// 覆盖协议字段可能携带的全部取值形态；规整化时按固定策略映射到 `NormalizedValue`。
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Char(char),
    Str(String),
    Bytes(Vec<u8>),
    Array(Vec<FieldValue>),
    Tuple(Vec<FieldValue>),
    /// 无序集合，元素顺序不作保证。
    Set(Vec<FieldValue>),
    Map(Vec<(String, FieldValue)>),
    /// 多维数值数组：`shape` 各维长度之积应等于 `data.len()`。
    NumericArray { shape: Vec<usize>, data: Vec<f64> },
    /// 枚举值；`value` 为其数值（解码器能给出时）。
    Enum { name: String, value: Option<i64> },
    /// 十进制等数值包装类型的文本形式。
    Decimal(String),
    /// 无法归类的值：类型名 + 默认字符串表示。
    Opaque { kind: String, repr: String },
}

impl FieldValue {
    /// 运行时类型名（仅用于调试展示）。
    pub fn kind_name(&self) -> &str {
        match self {
            FieldValue::Null => "NoneType",
            FieldValue::Bool(_) => "bool",
            FieldValue::Int(_) | FieldValue::UInt(_) => "int",
            FieldValue::Float(_) => "float",
            FieldValue::Char(_) => "char",
            FieldValue::Str(_) => "str",
            FieldValue::Bytes(_) => "bytes",
            FieldValue::Array(_) => "list",
            FieldValue::Tuple(_) => "tuple",
            FieldValue::Set(_) => "set",
            FieldValue::Map(_) => "dict",
            FieldValue::NumericArray { .. } => "ndarray",
            FieldValue::Enum { .. } => "enum",
            FieldValue::Decimal(_) => "decimal",
            FieldValue::Opaque { kind, .. } => kind.as_str(),
        }
    }
}

/// 解码器协作接口：一条已解码的协议消息。
///
/// 每个数据报产出一条，由翻译器立即消费，不做保留。
pub trait RawMessage: Send {
    /// 消息 ID。
    fn message_id(&self) -> u32;

    /// 消息类型名（如 `ATTITUDE`）。
    fn type_name(&self) -> &str;

    /// 按声明顺序列出字段名。
    fn field_names(&self) -> Vec<String>;

    /// 按名称读取单个字段。
    fn field(&self, name: &str) -> Option<FieldValue>;

    /// 直接导出 name → value 映射；解码器不支持时返回 `None`。
    fn to_field_map(&self) -> Option<Vec<(String, FieldValue)>> {
        None
    }
}
