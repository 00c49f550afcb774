use api_contract::encode_record;
use domain::{FieldValue, RawMessage};
use mavbridge_normalize::Translator;

struct Attitude;

impl RawMessage for Attitude {
    fn message_id(&self) -> u32 {
        30
    }

    fn type_name(&self) -> &str {
        "ATTITUDE"
    }

    fn field_names(&self) -> Vec<String> {
        vec!["roll".into(), "time_boot_ms".into(), "raw".into()]
    }

    fn field(&self, name: &str) -> Option<FieldValue> {
        match name {
            "roll" => Some(FieldValue::Float(0.1)),
            "time_boot_ms" => Some(FieldValue::UInt(1234)),
            "raw" => Some(FieldValue::Bytes(vec![0xde, 0xad])),
            _ => None,
        }
    }
}

#[test]
fn attitude_frame_matches_wire_format() {
    let record = Translator::default().translate(&Attitude);
    let json = encode_record(&record).expect("encode");
    assert_eq!(
        json,
        r#"{"msgid":30,"name":"ATTITUDE","time_us":1234,"fields":{"roll":0.1,"time_boot_ms":1234,"raw":"dead"},"types":{"roll":"float","time_boot_ms":"int","raw":"bytes"}}"#
    );
}

#[test]
fn frame_parses_as_json_object() {
    let record = Translator::default().translate(&Attitude);
    let json = encode_record(&record).expect("encode");
    let value: serde_json::Value = serde_json::from_str(&json).expect("valid json");
    assert_eq!(value["time_us"], 1234);
    assert_eq!(value["fields"]["raw"], "dead");
}
