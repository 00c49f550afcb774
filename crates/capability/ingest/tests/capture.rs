use domain::{FieldValue, RawMessage};
use mavbridge_ingest::{CapturedMessage, capture_fields, capture_value};
use serde::Serialize;

#[derive(Serialize)]
#[allow(non_camel_case_types)]
enum MavState {
    MAV_STATE_ACTIVE,
}

struct RawBytes(Vec<u8>);

impl Serialize for RawBytes {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(&self.0)
    }
}

#[derive(Serialize)]
struct AttitudeData {
    time_boot_ms: u32,
    roll: f32,
    yaw: f64,
    raw: RawBytes,
    state: MavState,
    param: [u8; 3],
    offsets: Vec<i16>,
    note: Option<String>,
}

#[derive(Serialize)]
#[serde(tag = "type")]
#[allow(non_camel_case_types)]
enum InternallyTagged {
    ATTITUDE(AttitudeData),
}

#[derive(Serialize)]
#[allow(non_camel_case_types)]
enum ExternallyTagged {
    ATTITUDE(AttitudeData),
}

fn attitude() -> AttitudeData {
    AttitudeData {
        time_boot_ms: 1234,
        roll: 0.5,
        yaw: -1.25,
        raw: RawBytes(vec![0xde, 0xad]),
        state: MavState::MAV_STATE_ACTIVE,
        param: [1, 2, 3],
        offsets: vec![-1, 2],
        note: None,
    }
}

fn expected_fields() -> Vec<(String, FieldValue)> {
    vec![
        ("time_boot_ms".to_string(), FieldValue::UInt(1234)),
        ("roll".to_string(), FieldValue::Float(0.5)),
        ("yaw".to_string(), FieldValue::Float(-1.25)),
        ("raw".to_string(), FieldValue::Bytes(vec![0xde, 0xad])),
        (
            "state".to_string(),
            FieldValue::Enum {
                name: "MAV_STATE_ACTIVE".to_string(),
                value: None,
            },
        ),
        (
            "param".to_string(),
            FieldValue::Tuple(vec![FieldValue::UInt(1), FieldValue::UInt(2), FieldValue::UInt(3)]),
        ),
        (
            "offsets".to_string(),
            FieldValue::Array(vec![FieldValue::Int(-1), FieldValue::Int(2)]),
        ),
        ("note".to_string(), FieldValue::Null),
    ]
}

#[test]
fn struct_fields_keep_declaration_order() {
    let fields = capture_fields(&attitude(), "ATTITUDE").expect("capture");
    assert_eq!(fields, expected_fields());
}

#[test]
fn internal_tag_is_stripped() {
    let message = InternallyTagged::ATTITUDE(attitude());
    let fields = capture_fields(&message, "ATTITUDE").expect("capture");
    assert_eq!(fields, expected_fields());
}

#[test]
fn external_tag_is_unwrapped() {
    let message = ExternallyTagged::ATTITUDE(attitude());
    let fields = capture_fields(&message, "ATTITUDE").expect("capture");
    assert_eq!(fields, expected_fields());
}

#[test]
fn scalar_messages_are_rejected() {
    assert!(capture_fields(&42u8, "NOPE").is_err());
}

#[test]
fn map_keys_are_stringified() {
    let mut map = std::collections::BTreeMap::new();
    map.insert(7u8, "seven");
    let value = capture_value(&map).expect("capture");
    assert_eq!(
        value,
        FieldValue::Map(vec![("7".to_string(), FieldValue::Str("seven".to_string()))])
    );
}

#[test]
fn captured_message_supports_both_lookups() {
    let message = CapturedMessage::capture(30, "ATTITUDE", &attitude()).expect("capture");
    assert_eq!(message.message_id(), 30);
    assert_eq!(message.type_name(), "ATTITUDE");
    assert_eq!(message.field("time_boot_ms"), Some(FieldValue::UInt(1234)));
    assert_eq!(message.field("missing"), None);
    assert_eq!(message.field_names().len(), 8);
    assert_eq!(message.to_field_map(), Some(expected_fields()));
}
