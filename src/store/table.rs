//! Store implementation
//!
//! HashMap-backed table plus an optional WAL writer.

use std::collections::hash_map::{self, HashMap};
use std::path::Path;

use tracing::info;

use crate::error::Result;
use crate::protocol::Command;
use crate::wal::{RecoveryResult, WalRecovery, WalWriter};

use super::Entry;

/// In-memory table of entries, optionally backed by a WAL
///
/// Touched only from the reactor thread; no internal locking.
#[derive(Debug, Default)]
pub struct Store {
    entries: HashMap<Vec<u8>, Entry>,

    /// `None` runs memory-only
    wal: Option<WalWriter>,

    /// Statistics from the replay performed by `open`
    recovery: Option<RecoveryResult>,
}

impl Store {
    /// Create an empty memory-only store
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a store
    ///
    /// With a path, the WAL there is opened or created and replayed, and
    /// later mutations are appended to it. Without one the store is
    /// memory-only.
    pub fn open(path: Option<&Path>) -> Result<Self> {
        let mut store = Self::new();

        let Some(path) = path else {
            info!("Store running memory-only");
            return Ok(store);
        };

        let (wal, recovery) = WalRecovery::recover(path, &mut store)?;
        store.wal = Some(wal);
        store.recovery = Some(recovery);
        Ok(store)
    }

    /// Entry for `key`, created empty if absent
    pub fn upsert(&mut self, key: &[u8]) -> &mut Entry {
        // Only a new key pays for the owned copy
        if !self.entries.contains_key(key) {
            return self.entries.entry(key.to_vec()).or_default();
        }
        match self.entries.get_mut(key) {
            Some(entry) => entry,
            None => unreachable!("key checked above"),
        }
    }

    pub fn lookup(&self, key: &[u8]) -> Option<&Entry> {
        self.entries.get(key)
    }

    pub(crate) fn lookup_mut(&mut self, key: &[u8]) -> Option<&mut Entry> {
        self.entries.get_mut(key)
    }

    /// All keys and entries, in no particular order
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            inner: self.entries.iter(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append a mutating command to the WAL, if there is one
    pub(crate) fn log(&mut self, command: &Command<'_>) -> Result<()> {
        match self.wal.as_mut() {
            Some(wal) => wal.append(&command.serialize()).map(|_| ()),
            None => Ok(()),
        }
    }

    pub fn is_persistent(&self) -> bool {
        self.wal.is_some()
    }

    /// Replay statistics; `None` for memory-only stores
    pub fn recovery(&self) -> Option<&RecoveryResult> {
        self.recovery.as_ref()
    }

    /// Offset where the next WAL record will be written
    pub fn wal_offset(&self) -> Option<u64> {
        self.wal.as_ref().map(WalWriter::offset)
    }

    /// Flush the WAL to disk
    pub fn sync(&mut self) -> Result<()> {
        match self.wal.as_mut() {
            Some(wal) => wal.sync(),
            None => Ok(()),
        }
    }
}

/// Iterator over a store's keys and entries
pub struct Iter<'a> {
    inner: hash_map::Iter<'a, Vec<u8>, Entry>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (&'a [u8], &'a Entry);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(key, entry)| (key.as_slice(), entry))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}
