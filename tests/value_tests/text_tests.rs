//! Tests for the text form of values
//!
//! These tests verify:
//! - Literal inference (u32, i32, f32, f64)
//! - Explicit kind suffixes and hex literals
//! - Strings and lists
//! - Display output parses back to the same value

use kvs::value::{List, Scalar, ScalarKind, Value};

fn parse(text: &str) -> Value {
    text.parse().unwrap()
}

// =============================================================================
// Parsing Tests
// =============================================================================

#[test]
fn test_parse_inferred_scalars() {
    assert_eq!(parse("123"), Value::from(123u32));
    assert_eq!(parse("0xFF"), Value::from(255u32));
    assert_eq!(parse("-123"), Value::from(-123i32));
    assert_eq!(parse("23.4f"), Value::from(23.4f32));
    assert_eq!(parse("23.4"), Value::from(23.4f64));
    assert_eq!(parse("null"), Value::Null);
}

#[test]
fn test_parse_suffixed_scalars() {
    assert_eq!(parse("7u8"), Value::from(7u8));
    assert_eq!(parse("-3i64"), Value::from(-3i64));
    assert_eq!(parse("2.5f32"), Value::from(2.5f32));
    assert_eq!(parse("65535u16"), Value::from(u16::MAX));
    assert_eq!(parse("-128i8"), Value::from(i8::MIN));
}

#[test]
fn test_parse_out_of_range() {
    assert!("256u8".parse::<Value>().is_err());
    assert!("-1u32".parse::<Value>().is_err());
    assert!("4294967296".parse::<Value>().is_err());
}

#[test]
fn test_parse_string_is_i8_list() {
    assert_eq!(parse("\"hi\""), Value::from(vec![b'h' as i8, b'i' as i8]));
    assert_eq!(parse("\"\""), Value::List(List::I8(vec![])));
    assert!("\"open".parse::<Value>().is_err());
}

#[test]
fn test_parse_lists() {
    assert_eq!(parse("[1, 2, 3]"), Value::from(vec![1u32, 2, 3]));
    assert_eq!(parse("[1, -2]"), Value::from(vec![1i32, -2]));
    assert_eq!(parse("[1.5, 2.0]"), Value::from(vec![1.5f64, 2.0]));
    assert_eq!(parse("[1, 2]u16"), Value::from(vec![1u16, 2]));
    assert_eq!(parse("[]f64"), Value::List(List::empty(ScalarKind::F64)));
}

#[test]
fn test_parse_list_errors() {
    assert!("[]".parse::<Value>().is_err());
    assert!("[1, 2.5]".parse::<Value>().is_err());
    assert!("[1, 2".parse::<Value>().is_err());
    assert!("[1u8, 2]u16".parse::<Value>().is_err());
    assert!("[1]x32".parse::<Value>().is_err());
}

#[test]
fn test_parse_garbage() {
    assert!("".parse::<Value>().is_err());
    assert!("abc".parse::<Value>().is_err());
    assert!("1.2.3".parse::<Value>().is_err());
}

// =============================================================================
// Display Tests
// =============================================================================

#[test]
fn test_display() {
    assert_eq!(Value::Null.to_string(), "null");
    assert_eq!(Value::from(-5i16).to_string(), "-5");
    assert_eq!(Value::from(1.5f32).to_string(), "1.5f");
    assert_eq!(Value::from(2.0f64).to_string(), "2.0");
    assert_eq!(Value::from(vec![1u8, 2, 3]).to_string(), "[1, 2, 3]");
    assert_eq!(Value::List(List::empty(ScalarKind::U8)).to_string(), "[]");
}

#[test]
fn test_display_parses_back() {
    let values = [
        Value::from(42u32),
        Value::from(-42i32),
        Value::from(0.75f32),
        Value::from(-1.25f64),
        Value::from(vec![3u32, 1, 2]),
        Value::from(vec![0.5f64, 1.5]),
        Value::Scalar(Scalar::F32(10.0)),
    ];
    for value in values {
        assert_eq!(parse(&value.to_string()), value);
    }
}

#[test]
fn test_exponent_and_non_finite_display_parses_back() {
    let values = [
        Value::from(1e20f32),
        Value::from(-3.5e-12f32),
        Value::from(1e300f64),
        Value::from(f64::INFINITY),
        Value::from(f64::NEG_INFINITY),
        Value::from(f32::INFINITY),
    ];
    for value in values {
        assert_eq!(parse(&value.to_string()), value, "text {}", value);
    }
}

#[test]
fn test_nan_parses_as_real() {
    assert!(matches!(parse("NaN"), Value::Scalar(Scalar::F64(v)) if v.is_nan()));
    assert!(matches!(parse("nanf"), Value::Scalar(Scalar::F32(v)) if v.is_nan()));
    assert!(matches!(
        parse(&Value::from(f32::NAN).to_string()),
        Value::Scalar(Scalar::F32(v)) if v.is_nan()
    ));
}

#[test]
fn test_exponent_literals_infer_real_kinds() {
    assert_eq!(parse("2e3"), Value::from(2000.0f64));
    assert_eq!(parse("-1.5E2f"), Value::from(-150.0f32));
    assert_eq!(parse("-inf"), Value::from(f64::NEG_INFINITY));
    assert_eq!(parse("0xE"), Value::from(14u32));
}
