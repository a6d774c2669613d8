//! Text form of values
//!
//! Used by the command-line client to accept and print values.
//!
//! ## Grammar
//! - `null`
//! - integers: `123` and `0xFF` are u32, `-5` and `+5` are i32
//! - reals: `1.5f` is f32, `1.5` is f64; exponents, `inf` and `nan` are reals too
//! - explicit kinds: `7u8`, `-3i64`, `2.5f32`, ...
//! - strings: `"abc"` is a list of i8 bytes
//! - lists: `[1, 2, 3]`, optionally suffixed with a kind: `[1, 2]u16`, `[]f64`

use std::fmt;
use std::str::FromStr;

use crate::error::KvsError;

use super::{List, Scalar, ScalarKind, Value};

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::I8(v) => write!(f, "{}", v),
            Scalar::I16(v) => write!(f, "{}", v),
            Scalar::I32(v) => write!(f, "{}", v),
            Scalar::I64(v) => write!(f, "{}", v),
            Scalar::U8(v) => write!(f, "{}", v),
            Scalar::U16(v) => write!(f, "{}", v),
            Scalar::U32(v) => write!(f, "{}", v),
            Scalar::U64(v) => write!(f, "{}", v),
            Scalar::F32(v) => write!(f, "{:?}f", v),
            Scalar::F64(v) => write!(f, "{:?}", v),
        }
    }
}

impl fmt::Display for List {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, item) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", item)?;
        }
        write!(f, "]")
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Scalar(s) => write!(f, "{}", s),
            Value::List(l) => write!(f, "{}", l),
        }
    }
}

impl FromStr for Value {
    type Err = KvsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();

        if text == "null" {
            return Ok(Value::Null);
        }
        if let Some(body) = text.strip_prefix('"') {
            let body = body
                .strip_suffix('"')
                .ok_or_else(|| parse_error(text, "unterminated string"))?;
            let bytes = body.bytes().map(|b| b as i8).collect::<Vec<_>>();
            return Ok(Value::from(bytes));
        }
        if text.starts_with('[') {
            return parse_list(text).map(Value::List);
        }

        parse_scalar(text).map(Value::Scalar)
    }
}

fn parse_error(text: &str, reason: &str) -> KvsError {
    KvsError::ValueParse(format!("'{}': {}", text, reason))
}

/// Split a trailing kind suffix (`u8`, `f64`, ...) off a decimal literal
fn split_suffix(text: &str) -> (&str, Option<ScalarKind>) {
    if text.starts_with("0x") || text.starts_with("0X") {
        return (text, None);
    }
    for kind in ScalarKind::ALL {
        if let Some(body) = text.strip_suffix(kind.name()) {
            if !body.is_empty() {
                return (body, Some(*kind));
            }
        }
    }
    (text, None)
}

fn parse_int(text: &str) -> Option<i128> {
    let (negative, digits) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    let magnitude = match digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        Some(hex) => i128::from_str_radix(hex, 16).ok()?,
        None => digits.parse::<i128>().ok()?,
    };
    Some(if negative { -magnitude } else { magnitude })
}

/// Parse `text` as a scalar of the given kind
fn parse_as(text: &str, kind: ScalarKind) -> Result<Scalar, KvsError> {
    let out_of_range = || parse_error(text, &format!("not a valid {}", kind.name()));

    macro_rules! int {
        ($variant:ident, $ty:ty) => {{
            let wide = parse_int(text).ok_or_else(out_of_range)?;
            let narrow = <$ty>::try_from(wide).map_err(|_| out_of_range())?;
            Ok(Scalar::$variant(narrow))
        }};
    }

    match kind {
        ScalarKind::I8 => int!(I8, i8),
        ScalarKind::I16 => int!(I16, i16),
        ScalarKind::I32 => int!(I32, i32),
        ScalarKind::I64 => int!(I64, i64),
        ScalarKind::U8 => int!(U8, u8),
        ScalarKind::U16 => int!(U16, u16),
        ScalarKind::U32 => int!(U32, u32),
        ScalarKind::U64 => int!(U64, u64),
        ScalarKind::F32 => text
            .strip_suffix('f')
            .unwrap_or(text)
            .parse::<f32>()
            .map(Scalar::F32)
            .map_err(|_| out_of_range()),
        ScalarKind::F64 => text
            .parse::<f64>()
            .map(Scalar::F64)
            .map_err(|_| out_of_range()),
    }
}

/// Kind of an unsuffixed literal
fn infer_kind(text: &str) -> ScalarKind {
    if let Some(body) = text.strip_suffix('f') {
        if is_real(body) {
            return ScalarKind::F32;
        }
    }
    if is_real(text) {
        ScalarKind::F64
    } else if text.starts_with('-') || text.starts_with('+') {
        ScalarKind::I32
    } else {
        ScalarKind::U32
    }
}

/// Decimal point, exponent, or one of the non-finite spellings
fn is_real(text: &str) -> bool {
    let body = text
        .strip_prefix('-')
        .or_else(|| text.strip_prefix('+'))
        .unwrap_or(text);
    if body.starts_with("0x") || body.starts_with("0X") {
        return false;
    }
    body.contains(['.', 'e', 'E'])
        || ["inf", "infinity", "nan"]
            .iter()
            .any(|word| body.eq_ignore_ascii_case(word))
}

fn parse_scalar(text: &str) -> Result<Scalar, KvsError> {
    if text.is_empty() {
        return Err(parse_error(text, "empty value"));
    }
    match split_suffix(text) {
        (body, Some(kind)) => parse_as(body, kind),
        (body, None) => parse_as(body, infer_kind(body)),
    }
}

fn parse_list(text: &str) -> Result<List, KvsError> {
    let close = text
        .rfind(']')
        .ok_or_else(|| parse_error(text, "unterminated list"))?;
    let inner = text[1..close].trim();
    let suffix = text[close + 1..].trim();

    let explicit = if suffix.is_empty() {
        None
    } else {
        let kind = ScalarKind::ALL
            .iter()
            .copied()
            .find(|k| k.name() == suffix)
            .ok_or_else(|| parse_error(text, "unknown list kind"))?;
        Some(kind)
    };

    let items: Vec<&str> = if inner.is_empty() {
        Vec::new()
    } else {
        inner.split(',').map(str::trim).collect()
    };

    let kind = match explicit {
        Some(kind) => kind,
        None => infer_list_kind(text, &items)?,
    };

    let mut list = List::empty(kind);
    for item in items {
        let (body, item_kind) = split_suffix(item);
        if item_kind.is_some_and(|k| k != kind) {
            return Err(parse_error(item, "element kind differs from list kind"));
        }
        list.push(parse_as(body, kind)?);
    }
    Ok(list)
}

/// All elements must agree; unsigned and signed integers widen to i32.
fn infer_list_kind(text: &str, items: &[&str]) -> Result<ScalarKind, KvsError> {
    let mut kinds = items.iter().map(|item| match split_suffix(item) {
        (_, Some(kind)) => kind,
        (body, None) => infer_kind(body),
    });

    let first = kinds
        .next()
        .ok_or_else(|| parse_error(text, "cannot infer the kind of an empty list"))?;

    kinds.try_fold(first, |acc, kind| match (acc, kind) {
        (a, b) if a == b => Ok(a),
        (ScalarKind::U32, ScalarKind::I32) | (ScalarKind::I32, ScalarKind::U32) => {
            Ok(ScalarKind::I32)
        }
        _ => Err(parse_error(text, "mixed element kinds")),
    })
}
