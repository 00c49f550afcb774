use domain::{FieldValue, NormalizedValue};
use std::fmt::Write;

/// 字段值规整：任意 `FieldValue` → `NormalizedValue`，不会失败。
///
/// JSON 可直接表示的值原样透传；其余按顺序套用：
/// 字节 → 十六进制，集合 → 序列，多维数组 → 嵌套序列，
/// 可转 f64 → 浮点，兜底 → 字符串表示。
pub fn normalize_value(value: &FieldValue) -> NormalizedValue {
    match value {
        FieldValue::Null => NormalizedValue::Null,
        FieldValue::Bool(v) => NormalizedValue::Bool(*v),
        FieldValue::Int(v) => NormalizedValue::Int(*v),
        FieldValue::UInt(v) => NormalizedValue::UInt(*v),
        FieldValue::Float(v) => float_or_string(*v),
        FieldValue::Str(v) => NormalizedValue::Str(v.clone()),
        FieldValue::Map(entries) => NormalizedValue::Map(
            entries
                .iter()
                .map(|(key, item)| (key.clone(), normalize_value(item)))
                .collect(),
        ),
        FieldValue::Bytes(bytes) => NormalizedValue::Str(hex_encode(bytes)),
        FieldValue::Array(items) | FieldValue::Tuple(items) | FieldValue::Set(items) => {
            NormalizedValue::Seq(items.iter().map(normalize_value).collect())
        }
        FieldValue::NumericArray { shape, data } => {
            nest(shape, data).unwrap_or_else(|| NormalizedValue::Str(display_string(value)))
        }
        FieldValue::Enum { value: Some(v), .. } => NormalizedValue::Float(*v as f64),
        FieldValue::Decimal(text) => match text.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => NormalizedValue::Float(v),
            _ => NormalizedValue::Str(text.clone()),
        },
        FieldValue::Char(_) | FieldValue::Enum { value: None, .. } | FieldValue::Opaque { .. } => {
            NormalizedValue::Str(display_string(value))
        }
    }
}

/// 小写十六进制编码，每字节两位，无分隔符。
pub fn hex_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(out, "{byte:02x}");
    }
    out
}

fn float_or_string(value: f64) -> NormalizedValue {
    if value.is_finite() {
        NormalizedValue::Float(value)
    } else {
        NormalizedValue::Str(non_finite_repr(value).to_string())
    }
}

fn non_finite_repr(value: f64) -> &'static str {
    if value.is_nan() {
        "NaN"
    } else if value.is_sign_positive() {
        "inf"
    } else {
        "-inf"
    }
}

/// 按 shape 还原嵌套序列；shape 与数据长度不符时返回 `None`。
fn nest(shape: &[usize], data: &[f64]) -> Option<NormalizedValue> {
    let expected = shape
        .iter()
        .try_fold(1usize, |acc, dim| acc.checked_mul(*dim))?;
    if expected != data.len() {
        return None;
    }
    Some(build_nested(shape, data))
}

fn build_nested(shape: &[usize], data: &[f64]) -> NormalizedValue {
    match shape.split_first() {
        None => data
            .first()
            .copied()
            .map(float_or_string)
            .unwrap_or(NormalizedValue::Null),
        Some((&dim, rest)) => {
            if dim == 0 {
                return NormalizedValue::Seq(Vec::new());
            }
            let stride = data.len() / dim;
            NormalizedValue::Seq(
                (0..dim)
                    .map(|i| build_nested(rest, &data[i * stride..(i + 1) * stride]))
                    .collect(),
            )
        }
    }
}

fn display_string(value: &FieldValue) -> String {
    match value {
        FieldValue::Char(c) => c.to_string(),
        FieldValue::Float(v) => non_finite_repr(*v).to_string(),
        FieldValue::Enum { name, .. } => name.clone(),
        FieldValue::Decimal(text) => text.clone(),
        FieldValue::Opaque { repr, .. } => repr.clone(),
        other => format!("{other:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hex_decode(text: &str) -> Vec<u8> {
        (0..text.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&text[i..i + 2], 16).expect("hex digit"))
            .collect()
    }

    #[test]
    fn bytes_become_lowercase_hex() {
        let value = normalize_value(&FieldValue::Bytes(vec![0xde, 0xad, 0x00, 0x0f]));
        assert_eq!(value, NormalizedValue::Str("dead000f".to_string()));
        assert_eq!(
            normalize_value(&FieldValue::Bytes(Vec::new())),
            NormalizedValue::Str(String::new())
        );
    }

    #[test]
    fn hex_round_trips_every_byte() {
        let all: Vec<u8> = (0..=255u8).collect();
        for len in [0usize, 1, 2, 17, 256] {
            let bytes = &all[..len];
            let NormalizedValue::Str(hex) = normalize_value(&FieldValue::Bytes(bytes.to_vec())) else {
                panic!("bytes must normalize to a string");
            };
            assert_eq!(hex.len(), bytes.len() * 2);
            assert!(hex.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
            assert_eq!(hex_decode(&hex), bytes);
        }
    }

    #[test]
    fn every_kind_normalizes() {
        let inputs = vec![
            FieldValue::Null,
            FieldValue::Bool(true),
            FieldValue::Int(-7),
            FieldValue::UInt(u64::MAX),
            FieldValue::Float(1.5),
            FieldValue::Float(f64::NAN),
            FieldValue::Char('x'),
            FieldValue::Str("ok".to_string()),
            FieldValue::Bytes(vec![1, 2]),
            FieldValue::Array(vec![FieldValue::Bytes(vec![0xff]), FieldValue::Int(1)]),
            FieldValue::Tuple(vec![]),
            FieldValue::Set(vec![FieldValue::Str("a".to_string())]),
            FieldValue::Map(vec![("k".to_string(), FieldValue::Bytes(vec![0xab]))]),
            FieldValue::NumericArray {
                shape: vec![3],
                data: vec![1.0, 2.0],
            },
            FieldValue::Enum {
                name: "MAV_MODE_FLAG_SAFETY_ARMED".to_string(),
                value: None,
            },
            FieldValue::Decimal("not-a-number".to_string()),
            FieldValue::Opaque {
                kind: "Widget".to_string(),
                repr: "<Widget>".to_string(),
            },
        ];
        for input in &inputs {
            assert_valid(&normalize_value(input));
        }
    }

    fn assert_valid(value: &NormalizedValue) {
        match value {
            NormalizedValue::Float(v) => assert!(v.is_finite()),
            NormalizedValue::Seq(items) => items.iter().for_each(assert_valid),
            NormalizedValue::Map(entries) => entries.iter().for_each(|(_, v)| assert_valid(v)),
            _ => {}
        }
    }

    #[test]
    fn containers_keep_order_and_recurse() {
        let value = normalize_value(&FieldValue::Tuple(vec![
            FieldValue::UInt(3),
            FieldValue::Bytes(vec![0xbe, 0xef]),
            FieldValue::Int(1),
        ]));
        assert_eq!(
            value,
            NormalizedValue::Seq(vec![
                NormalizedValue::UInt(3),
                NormalizedValue::Str("beef".to_string()),
                NormalizedValue::Int(1),
            ])
        );
    }

    #[test]
    fn numeric_arrays_nest_by_shape() {
        let value = normalize_value(&FieldValue::NumericArray {
            shape: vec![2, 2],
            data: vec![1.0, 2.0, 3.0, 4.0],
        });
        let row = |a: f64, b: f64| {
            NormalizedValue::Seq(vec![NormalizedValue::Float(a), NormalizedValue::Float(b)])
        };
        assert_eq!(value, NormalizedValue::Seq(vec![row(1.0, 2.0), row(3.0, 4.0)]));

        let scalar = normalize_value(&FieldValue::NumericArray {
            shape: vec![],
            data: vec![9.5],
        });
        assert_eq!(scalar, NormalizedValue::Float(9.5));

        let empty = normalize_value(&FieldValue::NumericArray {
            shape: vec![2, 0],
            data: vec![],
        });
        assert_eq!(
            empty,
            NormalizedValue::Seq(vec![NormalizedValue::Seq(vec![]), NormalizedValue::Seq(vec![])])
        );
    }

    #[test]
    fn mismatched_shape_falls_back_to_string() {
        let value = normalize_value(&FieldValue::NumericArray {
            shape: vec![3],
            data: vec![1.0],
        });
        assert!(matches!(value, NormalizedValue::Str(_)));
    }

    #[test]
    fn float_convertible_values_become_floats() {
        assert_eq!(
            normalize_value(&FieldValue::Decimal(" 2.25 ".to_string())),
            NormalizedValue::Float(2.25)
        );
        assert_eq!(
            normalize_value(&FieldValue::Enum {
                name: "MAV_TYPE_QUADROTOR".to_string(),
                value: Some(2),
            }),
            NormalizedValue::Float(2.0)
        );
    }

    #[test]
    fn unconvertible_values_fall_back_to_string() {
        assert_eq!(
            normalize_value(&FieldValue::Char('A')),
            NormalizedValue::Str("A".to_string())
        );
        assert_eq!(
            normalize_value(&FieldValue::Enum {
                name: "MAV_STATE_ACTIVE".to_string(),
                value: None,
            }),
            NormalizedValue::Str("MAV_STATE_ACTIVE".to_string())
        );
        assert_eq!(
            normalize_value(&FieldValue::Opaque {
                kind: "Widget".to_string(),
                repr: "<Widget>".to_string(),
            }),
            NormalizedValue::Str("<Widget>".to_string())
        );
        assert_eq!(
            normalize_value(&FieldValue::Float(f64::NEG_INFINITY)),
            NormalizedValue::Str("-inf".to_string())
        );
    }
}
