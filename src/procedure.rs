//! Stored Procedures
//!
//! Backing for the SOURCE and EXECUTE commands.
//!
//! ## Model
//! - A *library* is a named [`ProcedureFactory`] in the registry's catalogue
//! - SOURCE derives a short name from a path (`/opt/libbackup.so` →
//!   `backup`), instantiates that library and keeps the procedure loaded
//! - EXECUTE runs a loaded procedure with mutable access to the store
//!
//! Procedures see only the public store surface (`upsert`, `lookup`,
//! `iter`). Their writes are not logged to the WAL.

use std::collections::HashMap;
use std::path::Path;

use tracing::debug;

use crate::error::{KvsError, Result};
use crate::store::Store;

/// Calling-contract version a procedure must report
pub const PROCEDURE_ABI_VERSION: u32 = 1;

/// A loadable procedure
pub trait Procedure: Send {
    /// Contract version this procedure was built against
    fn abi_version(&self) -> u32 {
        PROCEDURE_ABI_VERSION
    }

    fn run(&mut self, store: &mut Store) -> Result<()>;
}

/// Constructor for a procedure library
pub type ProcedureFactory = fn() -> Box<dyn Procedure>;

/// Catalogue of libraries plus the procedures loaded from it
pub struct ProcedureRegistry {
    catalog: HashMap<String, ProcedureFactory>,
    loaded: HashMap<String, Box<dyn Procedure>>,
}

impl ProcedureRegistry {
    /// Empty registry with nothing to load
    pub fn new() -> Self {
        Self {
            catalog: HashMap::new(),
            loaded: HashMap::new(),
        }
    }

    /// Registry whose catalogue holds the built-in libraries
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register_library("backup", BackupProcedure::boxed);
        registry
    }

    /// Make a library available to SOURCE
    pub fn register_library(&mut self, name: &str, factory: ProcedureFactory) {
        self.catalog.insert(name.to_string(), factory);
    }

    /// Load the library named by `path`, returning its short name
    ///
    /// Loading an already loaded library replaces the old instance.
    pub fn source(&mut self, path: &str) -> Result<String> {
        let name = short_name(path)
            .ok_or_else(|| KvsError::Procedure(format!("invalid library path '{}'", path)))?;

        let factory = self
            .catalog
            .get(name)
            .ok_or_else(|| KvsError::Procedure(format!("no library named '{}'", name)))?;

        let procedure = factory();
        let version = procedure.abi_version();
        if version != PROCEDURE_ABI_VERSION {
            return Err(KvsError::Procedure(format!(
                "library '{}' has ABI version {}, expected {}",
                name, version, PROCEDURE_ABI_VERSION
            )));
        }

        self.loaded.insert(name.to_string(), procedure);
        Ok(name.to_string())
    }

    /// Run a loaded procedure
    pub fn execute(&mut self, name: &str, store: &mut Store) -> Result<()> {
        let procedure = self
            .loaded
            .get_mut(name)
            .ok_or_else(|| KvsError::Procedure(format!("procedure '{}' is not loaded", name)))?;
        procedure.run(store)
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.loaded.contains_key(name)
    }

    /// Names of loaded procedures, sorted
    pub fn loaded_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.loaded.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Unload every procedure
    pub fn teardown(&mut self) {
        if !self.loaded.is_empty() {
            debug!(count = self.loaded.len(), "Unloading procedures");
        }
        self.loaded.clear();
    }
}

impl Default for ProcedureRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

/// File stem without a leading `lib`
fn short_name(path: &str) -> Option<&str> {
    let stem = Path::new(path).file_stem()?.to_str()?;
    let name = stem.strip_prefix("lib").filter(|s| !s.is_empty()).unwrap_or(stem);
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

/// Prefix of keys written by [`BackupProcedure`]
pub const BACKUP_PREFIX: &[u8] = b"backup_";

/// Copies every key not starting with `backup_` to `backup_<key>`
#[derive(Debug, Default)]
pub struct BackupProcedure;

impl BackupProcedure {
    pub fn boxed() -> Box<dyn Procedure> {
        Box::new(BackupProcedure)
    }
}

impl Procedure for BackupProcedure {
    fn run(&mut self, store: &mut Store) -> Result<()> {
        let copies: Vec<(Vec<u8>, Vec<u8>)> = store
            .iter()
            .filter(|(key, _)| !key.starts_with(BACKUP_PREFIX))
            .map(|(key, entry)| {
                let mut backup_key = BACKUP_PREFIX.to_vec();
                backup_key.extend_from_slice(key);
                (backup_key, entry.as_bytes().to_vec())
            })
            .collect();

        debug!(keys = copies.len(), "Backing up keys");
        for (key, value) in copies {
            store.upsert(&key).set(&value);
        }
        Ok(())
    }
}
