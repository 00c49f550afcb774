use api_contract::encode_record;
use domain::{NormalizedValue, OrderedMap, StructuredRecord};
use serde_json::Value;

fn attitude_record() -> StructuredRecord {
    let mut fields = OrderedMap::new();
    fields.insert("roll", NormalizedValue::Float(0.1));
    fields.insert("time_boot_ms", NormalizedValue::UInt(1234));
    fields.insert("raw", NormalizedValue::Str("dead".to_string()));
    let mut types = OrderedMap::new();
    types.insert("roll", "float".to_string());
    types.insert("time_boot_ms", "int".to_string());
    types.insert("raw", "bytes".to_string());
    StructuredRecord {
        msgid: 30,
        name: "ATTITUDE".to_string(),
        time_us: Some(1234),
        fields,
        types,
    }
}

#[test]
fn record_frame_has_exact_shape() {
    let encoded = encode_record(&attitude_record()).expect("encode");
    assert_eq!(
        encoded,
        r#"{"msgid":30,"name":"ATTITUDE","time_us":1234,"fields":{"roll":0.1,"time_boot_ms":1234,"raw":"dead"},"types":{"roll":"float","time_boot_ms":"int","raw":"bytes"}}"#
    );

    let value: Value = serde_json::from_str(&encoded).expect("parse");
    let object = value.as_object().expect("object");
    assert_eq!(object.len(), 5);
}

#[test]
fn missing_timestamp_encodes_as_null() {
    let mut record = attitude_record();
    record.time_us = None;
    let value: Value = serde_json::from_str(&encode_record(&record).expect("encode")).expect("parse");
    assert!(value.get("time_us").expect("key present").is_null());
}

#[test]
fn non_ascii_text_is_not_escaped() {
    let mut record = attitude_record();
    record
        .fields
        .insert("text", NormalizedValue::Str("高度 ok".to_string()));
    let encoded = encode_record(&record).expect("encode");
    assert!(encoded.contains("高度 ok"));
    assert!(!encoded.contains("\\u"));
}

#[test]
fn nested_values_serialize_recursively() {
    let mut inner = OrderedMap::new();
    inner.insert("type", NormalizedValue::Str("MAV_STATE_ACTIVE".to_string()));
    let mut record = attitude_record();
    record.fields.insert(
        "q",
        NormalizedValue::Seq(vec![
            NormalizedValue::Int(-1),
            NormalizedValue::Null,
            NormalizedValue::Bool(true),
        ]),
    );
    record.fields.insert("state", NormalizedValue::Map(inner));

    let value: Value = serde_json::from_str(&encode_record(&record).expect("encode")).expect("parse");
    assert_eq!(value["fields"]["q"], serde_json::json!([-1, null, true]));
    assert_eq!(value["fields"]["state"]["type"], "MAV_STATE_ACTIVE");
}
