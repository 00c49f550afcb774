//! 把 `mavlink` 生成类型的 serde 表示还原成协议层面的字段值。
//!
//! 生成代码带来的差异：
//! - 普通枚举是内部标签形式，单元变体序列化为 `{"type": "<VARIANT>"}`；
//! - 位标志（bitflags 1.x）序列化为 `{"bits": n}`；
//! - 字段名 `type` 在 Rust 里被改成 `mavtype`；
//! - `char[N]` 与 `uint8_t[N]` 都生成 `[u8; N]`，只能按消息定义区分。

use domain::FieldValue;

/// 生成代码对 `type` 字段使用的名字。
const RENAMED_TYPE_FIELD: &str = "mavtype";

/// 定义为 `char[N]` 的字段（common / ardupilotmega 及其包含的方言）。
const CHAR_ARRAY_FIELDS: &[(&str, &str)] = &[
    ("ADSB_VEHICLE", "callsign"),
    ("AIS_VESSEL", "callsign"),
    ("AIS_VESSEL", "name"),
    ("AUTH_KEY", "key"),
    ("CAMERA_IMAGE_CAPTURED", "file_url"),
    ("CAMERA_INFORMATION", "cam_definition_uri"),
    ("CELLULAR_CONFIG", "apn"),
    ("CELLULAR_CONFIG", "new_pin"),
    ("CELLULAR_CONFIG", "pin"),
    ("CELLULAR_CONFIG", "puk"),
    ("CHANGE_OPERATOR_CONTROL", "passkey"),
    ("COMPONENT_INFORMATION", "general_metadata_uri"),
    ("COMPONENT_INFORMATION", "peripherals_metadata_uri"),
    ("COMPONENT_METADATA", "uri"),
    ("DEBUG_FLOAT_ARRAY", "name"),
    ("DEBUG_VECT", "name"),
    ("DEVICE_OP_READ", "busname"),
    ("DEVICE_OP_WRITE", "busname"),
    ("GIMBAL_DEVICE_INFORMATION", "custom_name"),
    ("GIMBAL_DEVICE_INFORMATION", "model_name"),
    ("GIMBAL_DEVICE_INFORMATION", "vendor_name"),
    ("HERELINK_VIDEO_STREAM_INFORMATION", "uri"),
    ("NAMED_VALUE_FLOAT", "name"),
    ("NAMED_VALUE_INT", "name"),
    ("OPEN_DRONE_ID_ARM_STATUS", "error"),
    ("OPEN_DRONE_ID_OPERATOR_ID", "operator_id"),
    ("OPEN_DRONE_ID_SELF_ID", "description"),
    ("OSD_PARAM_CONFIG", "param_id"),
    ("OSD_PARAM_SHOW_CONFIG_REPLY", "param_id"),
    ("PARAM_EXT_ACK", "param_id"),
    ("PARAM_EXT_ACK", "param_value"),
    ("PARAM_EXT_REQUEST_READ", "param_id"),
    ("PARAM_EXT_SET", "param_id"),
    ("PARAM_EXT_SET", "param_value"),
    ("PARAM_EXT_VALUE", "param_id"),
    ("PARAM_EXT_VALUE", "param_value"),
    ("PARAM_MAP_RC", "param_id"),
    ("PARAM_REQUEST_READ", "param_id"),
    ("PARAM_SET", "param_id"),
    ("PARAM_VALUE", "param_id"),
    ("PLAY_TUNE", "tune"),
    ("PLAY_TUNE", "tune2"),
    ("PLAY_TUNE_V2", "tune"),
    ("SMART_BATTERY_INFO", "device_name"),
    ("SMART_BATTERY_INFO", "manufacture_date"),
    ("SMART_BATTERY_INFO", "serial_number"),
    ("STATUSTEXT", "text"),
    ("STORAGE_INFORMATION", "name"),
    ("UAVCAN_NODE_INFO", "name"),
    ("UAVIONIX_ADSB_OUT_CFG", "callsign"),
    ("VIDEO_STREAM_INFORMATION", "name"),
    ("VIDEO_STREAM_INFORMATION", "uri"),
    ("WIFI_CONFIG_AP", "password"),
    ("WIFI_CONFIG_AP", "ssid"),
];

/// 整理一条 MAVLink 消息的顶层字段。
pub fn shape_fields(
    message_name: &str,
    entries: Vec<(String, FieldValue)>,
) -> Vec<(String, FieldValue)> {
    entries
        .into_iter()
        .map(|(name, value)| {
            let name = if name == RENAMED_TYPE_FIELD {
                "type".to_string()
            } else {
                name
            };
            let value = if is_char_array(message_name, &name) {
                char_array_text(value)
            } else {
                shape_value(value)
            };
            (name, value)
        })
        .collect()
}

/// 是否为 `char[N]` 字段。
pub fn is_char_array(message_name: &str, field_name: &str) -> bool {
    CHAR_ARRAY_FIELDS
        .iter()
        .any(|(message, field)| *message == message_name && *field == field_name)
}

fn shape_value(value: FieldValue) -> FieldValue {
    match value {
        FieldValue::Map(mut entries) if entries.len() == 1 => match entries.pop() {
            Some((key, FieldValue::Str(variant))) if key == "type" => FieldValue::Enum {
                name: variant,
                value: None,
            },
            Some((key, bits @ (FieldValue::UInt(_) | FieldValue::Int(_)))) if key == "bits" => {
                bits
            }
            Some((key, inner)) => FieldValue::Map(vec![(key, shape_value(inner))]),
            None => FieldValue::Map(Vec::new()),
        },
        FieldValue::Map(entries) => FieldValue::Map(
            entries
                .into_iter()
                .map(|(key, inner)| (key, shape_value(inner)))
                .collect(),
        ),
        FieldValue::Array(items) => FieldValue::Array(items.into_iter().map(shape_value).collect()),
        FieldValue::Tuple(items) => FieldValue::Tuple(items.into_iter().map(shape_value).collect()),
        other => other,
    }
}

/// `char[N]` 截断到第一个 NUL，按 UTF-8（有损）解码。
fn char_array_text(value: FieldValue) -> FieldValue {
    let items = match value {
        FieldValue::Tuple(items) | FieldValue::Array(items) => items,
        FieldValue::Bytes(bytes) => return FieldValue::Str(nul_terminated(&bytes)),
        other => return other,
    };
    let mut bytes = Vec::with_capacity(items.len());
    for item in &items {
        match item {
            FieldValue::UInt(v) => match u8::try_from(*v) {
                Ok(byte) => bytes.push(byte),
                Err(_) => return FieldValue::Tuple(items),
            },
            _ => return FieldValue::Tuple(items),
        }
    }
    FieldValue::Str(nul_terminated(&bytes))
}

fn nul_terminated(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}
