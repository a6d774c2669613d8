//! Store Module
//!
//! Key → entry map with write-through WAL persistence.
//!
//! ## Responsibilities
//! - Own one reusable byte buffer per key
//! - Log mutating commands before they are applied
//! - Replay the WAL on open
//!
//! The store never interprets values; list semantics live in
//! [`crate::value`] and are applied by [`crate::protocol::Command`].

mod table;

pub use table::{Iter, Store};

use crate::value::{decode, decode_kind, Kind, Value};

/// The serialized value held for one key
///
/// Overwrites reuse the existing allocation when the new payload fits.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Entry {
    bytes: Vec<u8>,
}

impl Entry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Encoded value
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// True for an entry created but never written
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.bytes.capacity()
    }

    /// Replace the contents with `bytes`
    pub fn set(&mut self, bytes: &[u8]) {
        self.bytes.clear();
        self.bytes.extend_from_slice(bytes);
    }

    /// Decoded value; an unwritten entry is Null
    pub fn value(&self) -> Value {
        decode(&self.bytes)
    }

    pub fn kind(&self) -> Kind {
        decode_kind(&self.bytes)
    }

    pub(crate) fn bytes_mut(&mut self) -> &mut Vec<u8> {
        &mut self.bytes
    }
}
