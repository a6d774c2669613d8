//! List operations
//!
//! PUSH and POP work directly on an entry's encoded bytes so a growing list
//! is extended in place instead of being decoded and re-encoded. Reductions
//! decode the list and fold it in the list's native arithmetic.

use tracing::warn;

use super::codec::{decode, decode_kind, encoded_len, LIST_HEADER_SIZE, TAG_SIZE};
use super::{Kind, Value};

/// Native arithmetic used by reductions
pub(crate) trait Element: Copy + PartialOrd {
    const ZERO: Self;

    /// Integers wrap at their native width; floats add in their own width.
    fn accumulate(self, rhs: Self) -> Self;
}

macro_rules! int_element {
    ($($t:ty),*) => {
        $(
            impl Element for $t {
                const ZERO: Self = 0;

                fn accumulate(self, rhs: Self) -> Self {
                    self.wrapping_add(rhs)
                }
            }
        )*
    };
}

macro_rules! float_element {
    ($($t:ty),*) => {
        $(
            impl Element for $t {
                const ZERO: Self = 0.0;

                fn accumulate(self, rhs: Self) -> Self {
                    self + rhs
                }
            }
        )*
    };
}

int_element!(i8, i16, i32, i64, u8, u16, u32, u64);
float_element!(f32, f64);

pub(crate) fn sum<T: Element>(items: &[T]) -> T {
    items.iter().fold(T::ZERO, |acc, &x| acc.accumulate(x))
}

pub(crate) fn max<T: Element>(items: &[T]) -> Option<T> {
    items
        .iter()
        .copied()
        .reduce(|best, x| if x > best { x } else { best })
}

pub(crate) fn min<T: Element>(items: &[T]) -> Option<T> {
    items
        .iter()
        .copied()
        .reduce(|best, x| if x < best { x } else { best })
}

/// Reduction commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reduction {
    Sum,
    Max,
    Min,
}

/// Result of appending to an encoded entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// The entry held no list; it now holds a fresh one
    Created,
    /// Elements were appended to the existing list
    Extended,
    /// Kinds differ; the entry is untouched
    Mismatch { stored: Kind, pushed: Kind },
    /// The stored bytes or the item are not a complete encoding; the entry
    /// is untouched
    Malformed,
}

/// Whether `bytes` is exactly one complete encoded value
fn is_well_formed(bytes: &[u8]) -> bool {
    encoded_len(bytes) == Some(bytes.len())
}

fn read_count(bytes: &[u8]) -> Option<u64> {
    let raw = bytes.get(TAG_SIZE..LIST_HEADER_SIZE)?;
    let mut count = [0u8; 8];
    count.copy_from_slice(raw);
    Some(u64::from_ne_bytes(count))
}

fn write_count(bytes: &mut [u8], count: u64) {
    bytes[TAG_SIZE..LIST_HEADER_SIZE].copy_from_slice(&count.to_ne_bytes());
}

/// Append the encoded value `item` to the encoded value held in `entry`
///
/// An empty entry or one holding Null is treated as absent: a scalar item
/// becomes a one-element list, a list item is stored as is. An existing list
/// is extended when the element kinds match. Everything else is a mismatch
/// and leaves `entry` unchanged.
///
/// An unwritten entry counts as absent. Any other entry, and `item`, must be
/// exactly one complete encoding (see `encoded_len`), otherwise the push is
/// refused as [`PushOutcome::Malformed`].
pub fn push_encoded(entry: &mut Vec<u8>, item: &[u8]) -> PushOutcome {
    if !is_well_formed(item) || !(entry.is_empty() || is_well_formed(entry)) {
        return PushOutcome::Malformed;
    }

    let stored = decode_kind(entry);
    let pushed = decode_kind(item);

    match (stored, pushed) {
        (Kind::Null, Kind::Scalar(kind)) => {
            entry.clear();
            entry.extend_from_slice(&Kind::List(kind).tag().to_ne_bytes());
            entry.extend_from_slice(&1u64.to_ne_bytes());
            entry.extend_from_slice(&item[TAG_SIZE..TAG_SIZE + kind.width()]);
            PushOutcome::Created
        }
        (Kind::Null, Kind::List(_)) => {
            entry.clear();
            entry.extend_from_slice(item);
            PushOutcome::Created
        }
        (Kind::List(have), Kind::Scalar(add)) if have == add => {
            let Some(count) = read_count(entry) else {
                return PushOutcome::Mismatch { stored, pushed };
            };
            entry.extend_from_slice(&item[TAG_SIZE..TAG_SIZE + add.width()]);
            write_count(entry, count + 1);
            PushOutcome::Extended
        }
        (Kind::List(have), Kind::List(add)) if have == add => {
            let (Some(count), Some(added)) = (read_count(entry), read_count(item)) else {
                return PushOutcome::Mismatch { stored, pushed };
            };
            entry.extend_from_slice(&item[LIST_HEADER_SIZE..]);
            write_count(entry, count + added);
            PushOutcome::Extended
        }
        _ => PushOutcome::Mismatch { stored, pushed },
    }
}

/// Drop the last element of the encoded list in `entry`
///
/// Returns false, leaving `entry` unchanged, for non-lists, empty lists and
/// lists whose payload does not match their count.
pub fn pop_encoded(entry: &mut Vec<u8>) -> bool {
    let Kind::List(kind) = decode_kind(entry) else {
        return false;
    };
    if !is_well_formed(entry) {
        warn!(len = entry.len(), "POP on malformed list entry ignored");
        return false;
    }
    match read_count(entry) {
        Some(count) if count > 0 => {
            entry.truncate(entry.len() - kind.width());
            write_count(entry, count - 1);
            true
        }
        _ => false,
    }
}

/// Reduce the encoded list in `bytes`
///
/// Non-lists reduce to Null. An empty list sums to the zero of its kind and
/// has neither maximum nor minimum (Null).
pub fn reduce_encoded(bytes: &[u8], reduction: Reduction) -> Value {
    let Value::List(list) = decode(bytes) else {
        return Value::Null;
    };

    let result = match reduction {
        Reduction::Sum => Some(list.sum()),
        Reduction::Max => list.max(),
        Reduction::Min => list.min(),
    };
    result.map(Value::Scalar).unwrap_or(Value::Null)
}
