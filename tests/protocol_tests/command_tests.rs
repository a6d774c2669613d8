//! Command Tests
//!
//! Tests for command execution against a memory-only store.

use kvs::procedure::ProcedureRegistry;
use kvs::protocol::{Command, Reply};
use kvs::store::Store;
use kvs::value::{Kind, List, ScalarKind, Value};

// =============================================================================
// Helper Functions
// =============================================================================

struct Fixture {
    store: Store,
    procedures: ProcedureRegistry,
}

impl Fixture {
    fn new() -> Self {
        Self {
            store: Store::new(),
            procedures: ProcedureRegistry::with_builtins(),
        }
    }

    fn run(&mut self, command: Command<'_>) -> Option<Value> {
        command
            .execute(&mut self.store, &mut self.procedures)
            .unwrap()
            .map(|reply: Reply<'_>| reply.value())
    }

    fn set(&mut self, key: &[u8], value: Value) {
        let bytes = value.to_bytes();
        assert_eq!(self.run(Command::Set { key, value: &bytes }), None);
    }

    fn push(&mut self, key: &[u8], value: Value) {
        let bytes = value.to_bytes();
        assert_eq!(self.run(Command::Push { key, value: &bytes }), None);
    }

    fn get(&mut self, key: &[u8]) -> Value {
        self.run(Command::Get { key }).unwrap()
    }
}

// =============================================================================
// GET / SET Tests
// =============================================================================

#[test]
fn test_get_absent_is_null() {
    let mut fx = Fixture::new();
    assert_eq!(fx.get(b"missing"), Value::Null);
}

#[test]
fn test_set_then_get() {
    let mut fx = Fixture::new();
    fx.set(b"answer", Value::from(42u64));
    assert_eq!(fx.get(b"answer"), Value::from(42u64));
}

#[test]
fn test_set_overwrites_with_other_kind() {
    let mut fx = Fixture::new();
    fx.set(b"k", Value::from(vec![1u8, 2, 3]));
    fx.set(b"k", Value::from(-1.5f32));
    assert_eq!(fx.get(b"k"), Value::from(-1.5f32));
    assert_eq!(fx.store.len(), 1);
}

#[test]
fn test_get_reply_carries_key() {
    let mut fx = Fixture::new();
    fx.set(b"name", Value::from(1u8));

    let reply = Command::Get { key: b"name" }
        .execute(&mut fx.store, &mut fx.procedures)
        .unwrap()
        .unwrap();
    assert_eq!(reply.key, b"name");
    assert!(matches!(reply.as_command(), Command::Set { key: b"name", .. }));
}

// =============================================================================
// PUSH / POP Tests
// =============================================================================

#[test]
fn test_push_onto_absent_creates_list() {
    let mut fx = Fixture::new();
    fx.push(b"l", Value::from(5i32));
    assert_eq!(fx.get(b"l"), Value::from(vec![5i32]));
}

#[test]
fn test_push_same_kind_extends() {
    let mut fx = Fixture::new();
    for i in 1..=3u16 {
        fx.push(b"l", Value::from(i));
    }
    fx.push(b"l", Value::from(vec![4u16, 5]));
    assert_eq!(fx.get(b"l"), Value::from(vec![1u16, 2, 3, 4, 5]));
}

#[test]
fn test_push_mismatch_is_noop() {
    let mut fx = Fixture::new();
    fx.push(b"l", Value::from(1u32));
    fx.push(b"l", Value::from(2i64));
    fx.push(b"l", Value::from(vec![3.0f64]));
    assert_eq!(fx.get(b"l"), Value::from(vec![1u32]));
}

#[test]
fn test_push_onto_scalar_is_noop() {
    let mut fx = Fixture::new();
    fx.set(b"s", Value::from(1u32));
    fx.push(b"s", Value::from(2u32));
    assert_eq!(fx.get(b"s"), Value::from(1u32));
}

#[test]
fn test_push_null_does_not_create_entry() {
    let mut fx = Fixture::new();
    fx.push(b"l", Value::Null);
    assert!(fx.store.lookup(b"l").is_none());
}

#[test]
fn test_pop_absent_is_noop() {
    let mut fx = Fixture::new();
    assert_eq!(fx.run(Command::Pop { key: b"nothing" }), None);
    assert!(fx.store.is_empty());
}

#[test]
fn test_pop_until_empty() {
    let mut fx = Fixture::new();
    fx.set(b"l", Value::from(vec![1i8, 2]));

    fx.run(Command::Pop { key: b"l" });
    assert_eq!(fx.get(b"l"), Value::from(vec![1i8]));

    fx.run(Command::Pop { key: b"l" });
    fx.run(Command::Pop { key: b"l" });
    assert_eq!(fx.get(b"l"), Value::List(List::empty(ScalarKind::I8)));
}

#[test]
fn test_list_commands_on_corrupt_entry_are_noops() {
    let mut fx = Fixture::new();
    let mut corrupt = Kind::List(ScalarKind::U16).tag().to_ne_bytes().to_vec();
    corrupt.extend_from_slice(&1u64.to_ne_bytes());
    fx.store.upsert(b"k").set(&corrupt);

    assert_eq!(fx.run(Command::Pop { key: b"k" }), None);
    fx.push(b"k", Value::from(7u16));

    assert_eq!(fx.store.lookup(b"k").unwrap().as_bytes(), &corrupt[..]);
    assert_eq!(fx.get(b"k"), Value::Null);
}

// =============================================================================
// Reduction Tests
// =============================================================================

#[test]
fn test_sum_of_pushed_values() {
    let mut fx = Fixture::new();
    for i in 1..=7i32 {
        fx.push(b"n", Value::from(i));
    }
    assert_eq!(fx.run(Command::Sum { key: b"n" }), Some(Value::from(28i32)));
}

#[test]
fn test_max_min() {
    let mut fx = Fixture::new();
    fx.set(b"n", Value::from(vec![-1i32, -2, -3, 0, 12, 5, 7, -9, 11, 6, 6, -1]));
    assert_eq!(fx.run(Command::Max { key: b"n" }), Some(Value::from(12i32)));
    assert_eq!(fx.run(Command::Min { key: b"n" }), Some(Value::from(-9i32)));
}

#[test]
fn test_reductions_on_absent_and_scalar() {
    let mut fx = Fixture::new();
    fx.set(b"s", Value::from(3u8));

    for key in [&b"s"[..], &b"absent"[..]] {
        assert_eq!(fx.run(Command::Sum { key }), Some(Value::Null));
        assert_eq!(fx.run(Command::Max { key }), Some(Value::Null));
        assert_eq!(fx.run(Command::Min { key }), Some(Value::Null));
    }
}

#[test]
fn test_reductions_on_empty_list() {
    let mut fx = Fixture::new();
    fx.set(b"e", Value::List(List::empty(ScalarKind::F32)));
    assert_eq!(fx.run(Command::Sum { key: b"e" }), Some(Value::from(0.0f32)));
    assert_eq!(fx.run(Command::Max { key: b"e" }), Some(Value::Null));
}

// =============================================================================
// Procedure Tests
// =============================================================================

#[test]
fn test_source_and_execute_backup() {
    let mut fx = Fixture::new();
    fx.set(b"a", Value::from(1u8));
    fx.set(b"b", Value::from(vec![2u8]));

    assert_eq!(fx.run(Command::Source { path: "/usr/lib/libbackup.so" }), None);
    assert_eq!(fx.run(Command::Execute { name: "backup" }), None);

    assert_eq!(fx.get(b"backup_a"), Value::from(1u8));
    assert_eq!(fx.get(b"backup_b"), Value::from(vec![2u8]));
    assert_eq!(fx.store.len(), 4);
}

#[test]
fn test_execute_unknown_procedure_is_noop() {
    let mut fx = Fixture::new();
    fx.set(b"a", Value::from(1u8));

    assert_eq!(fx.run(Command::Execute { name: "backup" }), None);
    assert_eq!(fx.run(Command::Source { path: "libnothing.so" }), None);
    assert_eq!(fx.store.len(), 1);
}
