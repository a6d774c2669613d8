//! Engine Module
//!
//! The state owned by the reactor thread: the store and the procedure
//! registry, with command routing between them.
//!
//! ## Responsibilities
//! - Open the store (replaying the WAL) from configuration
//! - Route decoded commands to execution
//! - Tear procedures down and sync the WAL on shutdown

use tracing::info;

use crate::config::Config;
use crate::error::Result;
use crate::procedure::ProcedureRegistry;
use crate::protocol::{Command, Reply};
use crate::store::Store;

/// The storage engine
///
/// ## Concurrency Model
///
/// Single-threaded: the engine is handed to the reactor loop by `&mut` and
/// every command runs to completion before the next one starts, so each
/// command's effect is atomic with respect to every other connection.
pub struct Engine {
    store: Store,
    procedures: ProcedureRegistry,
}

impl Engine {
    /// Open an engine with the given config
    ///
    /// On startup:
    /// 1. Open or create the WAL, unless running memory-only
    /// 2. Replay it into the store
    /// 3. Register the built-in procedure libraries
    pub fn open(config: &Config) -> Result<Self> {
        let store = Store::open(config.wal_path.as_deref())?;

        if let Some(recovery) = store.recovery() {
            info!(
                records = recovery.records_replayed,
                discarded = recovery.bytes_discarded,
                keys = store.len(),
                "Engine recovered"
            );
        }

        Ok(Self::new(store))
    }

    /// Wrap an already opened store
    pub fn new(store: Store) -> Self {
        Self {
            store,
            procedures: ProcedureRegistry::with_builtins(),
        }
    }

    /// Memory-only engine
    pub fn in_memory() -> Self {
        Self::new(Store::new())
    }

    /// Execute a command
    ///
    /// Returns the reply for read-type commands. Errors are fatal
    /// persistence failures.
    pub fn execute<'s, 'a: 's>(&'s mut self, command: &Command<'a>) -> Result<Option<Reply<'s>>> {
        command.execute(&mut self.store, &mut self.procedures)
    }

    /// Unload procedures and flush the WAL
    pub fn shutdown(&mut self) -> Result<()> {
        self.procedures.teardown();
        self.store.sync()?;
        info!(keys = self.store.len(), "Engine shut down");
        Ok(())
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut Store {
        &mut self.store
    }

    pub fn procedures(&self) -> &ProcedureRegistry {
        &self.procedures
    }

    pub fn procedures_mut(&mut self) -> &mut ProcedureRegistry {
        &mut self.procedures
    }
}
