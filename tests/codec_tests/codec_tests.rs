//! Tests for value codecs
//!
//! These tests verify:
//! - Text, JSON and structured round trips
//! - Multi-script Unicode survives every codec
//! - JSON rejects what it cannot represent
//! - Structured codec keeps extended types exactly

use archivekv::codec::{decode_key, encode_key, Codec, Value};
use archivekv::ArchiveError;
use chrono::{Duration, TimeZone, Utc};

// =============================================================================
// Helper Functions
// =============================================================================

fn multi_script() -> Vec<&'static str> {
    vec![
        "hello world",
        "بِسْمِ ٱللّٰهِ ٱلرَّحْمـَبنِ ٱلرَّحِيمِ",
        "ஸ்றீனிவாஸ ராமானுஜன் ஐயங்கார்",
        "子曰：「學而時習之，不亦說乎？有朋自遠方來，不亦樂乎？",
        "पशुपतिरपि तान्यहानि कृच्छ्राद् ",
        "Ἰοὺ ἰού· τὰ πάντʼ ἂν ἐξήκοι σαφῆ. ",
        "По оживлённым берегам ",
        "♖ ♘ ♗ ♕ ♔ ♗ ♘ ♖",
        "👋🤚🖐✋🖖👌🤌🤏🤞🤟🤘🤙👈👉👆🖕👇👍👎✊👊🤛🤜👏🙌👐🤲🤝",
        "👋🏽🤚🏽🖐🏽✋🏽🖖🏽👌🏽🤌🏽🤏🏽✌🏽🤞🏽🤟🏽🤘🏽🤙🏽👈🏽👉🏽👆🏽🖕🏽👇🏽",
    ]
}

fn object(fields: &[(&str, Value)]) -> Value {
    Value::Object(
        fields
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect(),
    )
}

fn json_values() -> Vec<Value> {
    let mut values: Vec<Value> = multi_script().into_iter().map(Value::from).collect();
    values.extend([
        Value::Bool(true),
        Value::Bool(false),
        Value::Null,
        Value::from(std::f64::consts::PI),
        Value::from(-0.125),
        Value::from(42),
        object(&[("a", Value::from(1)), ("b", Value::from(2))]),
        Value::Array(vec![
            Value::from(1),
            Value::from(2),
            Value::from(3),
            Value::from("6"),
        ]),
        object(&[(
            "nested",
            Value::Array(vec![object(&[("deep", Value::Null)]), Value::Bool(true)]),
        )]),
    ]);
    values
}

// =============================================================================
// Text Codec
// =============================================================================

#[test]
fn test_text_roundtrip_multi_script() {
    for text in multi_script() {
        let bytes = Codec::Text.encode(&Value::from(text)).unwrap();
        assert_eq!(bytes, text.as_bytes());
        assert_eq!(Codec::Text.decode(&bytes).unwrap(), Value::from(text));
    }
}

#[test]
fn test_text_stringifies_non_strings() {
    let cases = vec![
        (Value::from(42), "42"),
        (Value::from(1.5), "1.5"),
        (Value::Bool(true), "true"),
        (Value::Null, "null"),
        (Value::from(f64::INFINITY), "Infinity"),
        (
            Value::Array(vec![Value::from(1), Value::Null, Value::from("x")]),
            "1,,x",
        ),
        (object(&[("a", Value::from(1))]), "[object Object]"),
    ];

    for (value, expected) in cases {
        let bytes = Codec::Text.encode(&value).unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap(), expected);
    }
}

#[test]
fn test_text_decode_invalid_utf8() {
    let result = Codec::Text.decode(&[0xff, 0xfe, 0x00]);
    assert!(matches!(result, Err(ArchiveError::Codec(_))));
}

#[test]
fn test_key_codec_is_text() {
    let key = "子曰/page.html";
    assert_eq!(encode_key(key), key.as_bytes());
    assert_eq!(decode_key(key.as_bytes()).unwrap(), key);
}

// =============================================================================
// JSON Codec
// =============================================================================

#[test]
fn test_json_roundtrip() {
    for value in json_values() {
        let bytes = Codec::Json.encode(&value).unwrap();
        assert_eq!(Codec::Json.decode(&bytes).unwrap(), value, "{:?} roundtrips", value);
    }
}

#[test]
fn test_json_output_is_plain_json() {
    let value = object(&[("n", Value::from(3)), ("s", Value::from("x"))]);
    let bytes = Codec::Json.encode(&value).unwrap();
    assert_eq!(String::from_utf8(bytes).unwrap(), r#"{"n":3,"s":"x"}"#);
}

#[test]
fn test_json_keeps_field_order() {
    let text = r#"{"zebra":1,"apple":{"y":true,"b":null},"mango":"m"}"#;

    let value = Codec::Json.decode(text.as_bytes()).unwrap();
    let reencoded = Codec::Json.encode(&value).unwrap();
    assert_eq!(String::from_utf8(reencoded).unwrap(), text);

    let structured = Codec::Structured.encode(&value).unwrap();
    let decoded = Codec::Structured.decode(&structured).unwrap();
    assert_eq!(Codec::Json.encode(&decoded).unwrap(), text.as_bytes());
}

#[test]
fn test_text_numbers_match_javascript() {
    let cases = [(1e-7, "1e-7"), (1e21, "1e+21"), (0.000001, "0.000001"), (-0.0, "0")];
    for (n, expected) in cases {
        let bytes = Codec::Text.encode(&Value::from(n)).unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap(), expected);
    }
}

#[test]
fn test_json_rejects_non_finite() {
    for n in [f64::INFINITY, f64::NEG_INFINITY, f64::NAN] {
        let result = Codec::Json.encode(&Value::from(n));
        assert!(matches!(result, Err(ArchiveError::Codec(_))));
    }
}

#[test]
fn test_json_rejects_top_level_undefined() {
    let result = Codec::Json.encode(&Value::Undefined);
    assert!(matches!(result, Err(ArchiveError::Codec(_))));
}

#[test]
fn test_json_drops_undefined_fields() {
    let value = object(&[("keep", Value::from(1)), ("gone", Value::Undefined)]);
    let bytes = Codec::Json.encode(&value).unwrap();
    assert_eq!(
        Codec::Json.decode(&bytes).unwrap(),
        object(&[("keep", Value::from(1))])
    );

    let array = Value::Array(vec![Value::Undefined, Value::from(2)]);
    let bytes = Codec::Json.encode(&array).unwrap();
    assert_eq!(String::from_utf8(bytes).unwrap(), "[null,2]");
}

#[test]
fn test_json_decode_malformed() {
    let result = Codec::Json.decode(b"{\"unterminated\": ");
    assert!(matches!(result, Err(ArchiveError::Codec(_))));
}

// =============================================================================
// Structured Codec
// =============================================================================

#[test]
fn test_structured_roundtrip_extended_types() {
    let date = Utc.with_ymd_and_hms(2021, 3, 14, 15, 9, 26).unwrap() + Duration::milliseconds(535);

    let mut values = json_values();
    values.extend([
        Value::Undefined,
        Value::from(f64::INFINITY),
        Value::from(f64::NEG_INFINITY),
        Value::from(rand::random::<f64>()),
        Value::Date(date),
        Value::Bytes(vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10]),
        object(&[("when", Value::Date(date)), ("missing", Value::Undefined)]),
    ]);

    for value in values {
        let bytes = Codec::Structured.encode(&value).unwrap();
        assert_eq!(
            Codec::Structured.decode(&bytes).unwrap(),
            value,
            "{:?} roundtrips",
            value
        );
    }
}

#[test]
fn test_structured_keeps_nan() {
    let bytes = Codec::Structured.encode(&Value::from(f64::NAN)).unwrap();
    let decoded = Codec::Structured.decode(&bytes).unwrap();
    assert!(decoded.as_f64().unwrap().is_nan());
}

#[test]
fn test_structured_decode_garbage() {
    let result = Codec::Structured.decode(&[0xff, 0xff, 0xff, 0xff]);
    assert!(matches!(result, Err(ArchiveError::Codec(_))));
}

// =============================================================================
// Codec Selection
// =============================================================================

#[test]
fn test_codec_from_str() {
    assert_eq!("json".parse::<Codec>().unwrap(), Codec::Json);
    assert_eq!("utf-8".parse::<Codec>().unwrap(), Codec::Text);
    assert_eq!("Structured".parse::<Codec>().unwrap(), Codec::Structured);
    assert!(matches!("yaml".parse::<Codec>(), Err(ArchiveError::Config(_))));
    assert_eq!(Codec::default(), Codec::Json);
}
