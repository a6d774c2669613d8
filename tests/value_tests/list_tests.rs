//! Tests for list operations
//!
//! These tests verify:
//! - PUSH onto absent, same-kind and mismatched entries
//! - POP on lists, empty lists and non-lists
//! - SUM/MAX/MIN reductions and their empty-list results

use kvs::value::{
    decode, pop_encoded, push_encoded, reduce_encoded, Kind, List, PushOutcome, Reduction, Scalar,
    ScalarKind, Value,
};

// =============================================================================
// Helper Functions
// =============================================================================

fn sample() -> Vec<i32> {
    vec![-1, -2, -3, 0, 12, 5, 7, -9, 11, 6, 6, -1]
}

/// u16 list header claiming `count` elements, followed by `payload`
fn forged_list(count: u64, payload: &[u8]) -> Vec<u8> {
    let mut bytes = Kind::List(ScalarKind::U16).tag().to_ne_bytes().to_vec();
    bytes.extend_from_slice(&count.to_ne_bytes());
    bytes.extend_from_slice(payload);
    bytes
}

fn reduce(value: &Value, reduction: Reduction) -> Value {
    reduce_encoded(&value.to_bytes(), reduction)
}

// =============================================================================
// PUSH Tests
// =============================================================================

#[test]
fn test_push_scalar_onto_absent() {
    let mut entry = Vec::new();
    let outcome = push_encoded(&mut entry, &Value::from(4i16).to_bytes());

    assert_eq!(outcome, PushOutcome::Created);
    assert_eq!(decode(&entry), Value::from(vec![4i16]));
}

#[test]
fn test_push_list_onto_absent() {
    let mut entry = Value::Null.to_bytes();
    let outcome = push_encoded(&mut entry, &Value::from(vec![1u8, 2]).to_bytes());

    assert_eq!(outcome, PushOutcome::Created);
    assert_eq!(decode(&entry), Value::from(vec![1u8, 2]));
}

#[test]
fn test_push_same_kind_scalar() {
    let mut entry = Value::from(vec![1.5f64]).to_bytes();
    let outcome = push_encoded(&mut entry, &Value::from(2.5f64).to_bytes());

    assert_eq!(outcome, PushOutcome::Extended);
    assert_eq!(decode(&entry), Value::from(vec![1.5f64, 2.5]));
}

#[test]
fn test_push_same_kind_list_appends_elements() {
    let mut entry = Value::from(vec![1u64, 2]).to_bytes();
    let outcome = push_encoded(&mut entry, &Value::from(vec![3u64, 4]).to_bytes());

    assert_eq!(outcome, PushOutcome::Extended);
    assert_eq!(decode(&entry), Value::from(vec![1u64, 2, 3, 4]));
}

#[test]
fn test_push_onto_empty_list() {
    let mut entry = Value::List(List::empty(ScalarKind::I8)).to_bytes();
    let outcome = push_encoded(&mut entry, &Value::from(-3i8).to_bytes());

    assert_eq!(outcome, PushOutcome::Extended);
    assert_eq!(decode(&entry), Value::from(vec![-3i8]));
}

#[test]
fn test_push_kind_mismatch_leaves_entry() {
    let original = Value::from(vec![1u32, 2]).to_bytes();
    let mut entry = original.clone();

    let outcome = push_encoded(&mut entry, &Value::from(3i32).to_bytes());

    assert_eq!(
        outcome,
        PushOutcome::Mismatch {
            stored: Kind::List(ScalarKind::U32),
            pushed: Kind::Scalar(ScalarKind::I32),
        }
    );
    assert_eq!(entry, original);
}

#[test]
fn test_push_onto_scalar_is_mismatch() {
    let original = Value::from(7u32).to_bytes();
    let mut entry = original.clone();

    let outcome = push_encoded(&mut entry, &Value::from(8u32).to_bytes());

    assert!(matches!(outcome, PushOutcome::Mismatch { .. }));
    assert_eq!(entry, original);
}

#[test]
fn test_push_null_is_mismatch() {
    let original = Value::from(vec![1u32]).to_bytes();
    let mut entry = original.clone();

    let outcome = push_encoded(&mut entry, &Value::Null.to_bytes());

    assert!(matches!(outcome, PushOutcome::Mismatch { .. }));
    assert_eq!(entry, original);
}

#[test]
fn test_push_onto_malformed_entry_is_refused() {
    let original = forged_list(1, &[]);
    let mut entry = original.clone();

    let outcome = push_encoded(&mut entry, &Value::from(5u16).to_bytes());

    assert_eq!(outcome, PushOutcome::Malformed);
    assert_eq!(entry, original);
}

#[test]
fn test_push_of_truncated_item_is_refused() {
    let mut entry = Value::from(vec![1u16]).to_bytes();
    let before = entry.clone();

    let outcome = push_encoded(&mut entry, &forged_list(3, &2u16.to_ne_bytes()));

    assert_eq!(outcome, PushOutcome::Malformed);
    assert_eq!(entry, before);
}

// =============================================================================
// POP Tests
// =============================================================================

#[test]
fn test_pop_drops_last() {
    let mut entry = Value::from(vec![1i64, 2, 3]).to_bytes();

    assert!(pop_encoded(&mut entry));
    assert_eq!(decode(&entry), Value::from(vec![1i64, 2]));
}

#[test]
fn test_pop_to_empty_then_noop() {
    let mut entry = Value::from(vec![9u16]).to_bytes();

    assert!(pop_encoded(&mut entry));
    assert_eq!(decode(&entry), Value::List(List::U16(vec![])));

    let before = entry.clone();
    assert!(!pop_encoded(&mut entry));
    assert_eq!(entry, before);
}

#[test]
fn test_pop_non_list_is_noop() {
    let mut entry = Value::from(5u8).to_bytes();
    let before = entry.clone();
    assert!(!pop_encoded(&mut entry));
    assert_eq!(entry, before);

    let mut empty = Vec::new();
    assert!(!pop_encoded(&mut empty));
    assert!(empty.is_empty());
}

#[test]
fn test_pop_malformed_entry_is_noop() {
    // Count says one element, payload is empty
    let mut short = forged_list(1, &[]);
    let before = short.clone();
    assert!(!pop_encoded(&mut short));
    assert_eq!(short, before);

    // Payload longer than the count implies
    let mut long = forged_list(1, &[0; 5]);
    let before = long.clone();
    assert!(!pop_encoded(&mut long));
    assert_eq!(long, before);
}

// =============================================================================
// Reduction Tests
// =============================================================================

#[test]
fn test_sum_one_to_seven() {
    let list = Value::from(vec![1i32, 2, 3, 4, 5, 6, 7]);
    assert_eq!(reduce(&list, Reduction::Sum), Value::from(28i32));
}

#[test]
fn test_max_min_of_sample() {
    let list = Value::from(sample());
    assert_eq!(reduce(&list, Reduction::Max), Value::from(12i32));
    assert_eq!(reduce(&list, Reduction::Min), Value::from(-9i32));
}

#[test]
fn test_sum_of_sample() {
    let list = Value::from(sample());
    assert_eq!(reduce(&list, Reduction::Sum), Value::from(31i32));
}

#[test]
fn test_integer_sum_wraps() {
    let list = Value::from(vec![200u8, 100]);
    assert_eq!(reduce(&list, Reduction::Sum), Value::from(44u8));
}

#[test]
fn test_float_sum_stays_in_width() {
    let list = Value::from(vec![0.5f32, 0.25, 0.125]);
    assert_eq!(reduce(&list, Reduction::Sum), Value::from(0.875f32));
}

#[test]
fn test_empty_list_reductions() {
    let empty = Value::List(List::empty(ScalarKind::U64));
    assert_eq!(reduce(&empty, Reduction::Sum), Value::Scalar(Scalar::U64(0)));
    assert_eq!(reduce(&empty, Reduction::Max), Value::Null);
    assert_eq!(reduce(&empty, Reduction::Min), Value::Null);
}

#[test]
fn test_reduce_non_list_is_null() {
    for reduction in [Reduction::Sum, Reduction::Max, Reduction::Min] {
        assert_eq!(reduce(&Value::from(3u32), reduction), Value::Null);
        assert_eq!(reduce(&Value::Null, reduction), Value::Null);
    }
}

#[test]
fn test_list_value_helpers() {
    let list = List::I32(sample());
    assert_eq!(list.len(), 12);
    assert_eq!(list.get(4), Some(Scalar::I32(12)));
    assert_eq!(list.max(), Some(Scalar::I32(12)));
    assert_eq!(list.min(), Some(Scalar::I32(-9)));
    assert_eq!(ScalarKind::I32.zero(), Scalar::I32(0));
}
