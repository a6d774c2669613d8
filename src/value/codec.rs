//! Value codec
//!
//! Encoding and decoding of tagged values.
//!
//! Decoding never fails loudly: truncated or unknown input decodes to
//! `Value::Null`. Use [`encoded_len`] where corrupt input must be told apart
//! from a genuine Null.

use crate::buffer::ReadCursor;

use super::{Kind, List, Scalar, Value, NULL_TAG};

/// Size of the kind tag
pub const TAG_SIZE: usize = 2;

/// Size of the list element count
pub const COUNT_SIZE: usize = 8;

/// Tag plus element count
pub const LIST_HEADER_SIZE: usize = TAG_SIZE + COUNT_SIZE;

/// Encoded form of `Value::Null`
pub const NULL_ENCODED: [u8; TAG_SIZE] = NULL_TAG.to_ne_bytes();

/// Number of bytes `encode` produces for `value`
pub fn size_of(value: &Value) -> usize {
    match value {
        Value::Null => TAG_SIZE,
        Value::Scalar(s) => TAG_SIZE + s.kind().width(),
        Value::List(l) => LIST_HEADER_SIZE + l.len() * l.kind().width(),
    }
}

/// Append the encoding of `value` to `dest`
pub fn encode(value: &Value, dest: &mut Vec<u8>) {
    dest.reserve(size_of(value));
    dest.extend_from_slice(&value.kind().tag().to_ne_bytes());

    match value {
        Value::Null => {}
        Value::Scalar(s) => s.extend_ne(dest),
        Value::List(l) => {
            dest.extend_from_slice(&(l.len() as u64).to_ne_bytes());
            l.extend_ne(dest);
        }
    }
}

/// Decode a value, yielding Null on truncated or corrupt input
///
/// Bytes past the encoded value are ignored.
pub fn decode(bytes: &[u8]) -> Value {
    let mut cursor = ReadCursor::new(bytes);
    let Some(tag) = cursor.read_u16() else {
        return Value::Null;
    };

    match Kind::from_tag(tag) {
        Kind::Null => Value::Null,
        Kind::Scalar(kind) => Scalar::read_ne(kind, cursor.rest())
            .map(Value::Scalar)
            .unwrap_or(Value::Null),
        Kind::List(kind) => {
            let list = cursor
                .read_u64()
                .and_then(|count| usize::try_from(count).ok())
                .and_then(|count| List::read_ne(kind, count, cursor.rest()));
            list.map(Value::List).unwrap_or(Value::Null)
        }
    }
}

/// Peek at the kind tag without decoding the payload
pub fn decode_kind(bytes: &[u8]) -> Kind {
    ReadCursor::new(bytes)
        .read_u16()
        .map(Kind::from_tag)
        .unwrap_or(Kind::Null)
}

/// Length of the encoded value at the start of `bytes`, as implied by its
/// tag (and element count for lists)
///
/// Returns `None` for unknown tags or a truncated list header. The result
/// may exceed `bytes.len()`; callers compare.
pub fn encoded_len(bytes: &[u8]) -> Option<usize> {
    let mut cursor = ReadCursor::new(bytes);
    let tag = cursor.read_u16()?;

    match Kind::parse(tag)? {
        Kind::Null => Some(TAG_SIZE),
        Kind::Scalar(kind) => Some(TAG_SIZE + kind.width()),
        Kind::List(kind) => {
            let count = usize::try_from(cursor.read_u64()?).ok()?;
            count
                .checked_mul(kind.width())?
                .checked_add(LIST_HEADER_SIZE)
        }
    }
}
