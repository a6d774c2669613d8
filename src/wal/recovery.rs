//! WAL Recovery
//!
//! Replays the WAL into a store on startup and prepares it for appends.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use tracing::{info, warn};

use crate::error::{KvsError, Result};
use crate::store::Store;

use super::{WalReader, WalWriter};

/// Handles WAL replay after a restart or crash
pub struct WalRecovery;

/// Result of a recovery operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RecoveryResult {
    /// Number of records applied to the store
    pub records_replayed: u64,

    /// Bytes cut from the end of the file
    pub bytes_discarded: u64,

    /// Length of the intact prefix, where appends resume
    pub valid_len: u64,

    /// Whether a torn or corrupt tail was removed
    pub was_truncated: bool,
}

impl WalRecovery {
    /// Replay the WAL at `path` into `store`
    ///
    /// This will:
    /// 1. Open or create the file
    /// 2. Apply every intact record, without logging it again
    /// 3. Truncate the file after the last intact record
    /// 4. Return a writer positioned at the end of the intact prefix
    pub fn recover(path: &Path, store: &mut Store) -> Result<(WalWriter, RecoveryResult)> {
        let wal_error = |source: std::io::Error| KvsError::WalOpen {
            path: path.display().to_string(),
            source,
        };

        // Step 1: Open or create, then read the whole image
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(wal_error)?;

        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes).map_err(wal_error)?;

        // Step 2: Replay
        let mut reader = WalReader::new(&bytes);
        let mut records_replayed = 0u64;
        for (_offset, command) in reader.by_ref() {
            command.apply(store);
            records_replayed += 1;
        }

        let valid_len = reader.valid_len() as u64;
        let bytes_discarded = reader.remaining() as u64;

        // Step 3: Drop the torn tail
        if bytes_discarded > 0 {
            warn!(
                path = %path.display(),
                valid_len,
                bytes_discarded,
                "Truncating WAL after last intact record"
            );
            file.set_len(valid_len).map_err(wal_error)?;
        }

        // Step 4: Position for appends
        file.seek(SeekFrom::Start(valid_len)).map_err(wal_error)?;

        let result = RecoveryResult {
            records_replayed,
            bytes_discarded,
            valid_len,
            was_truncated: bytes_discarded > 0,
        };

        info!(
            path = %path.display(),
            records = records_replayed,
            bytes = valid_len,
            keys = store.len(),
            "WAL replay complete"
        );

        Ok((WalWriter::new(file, path, valid_len), result))
    }

    /// Check a WAL file without modifying it
    pub fn verify(path: &Path) -> Result<RecoveryResult> {
        let mut bytes = Vec::new();
        File::open(path)
            .and_then(|mut file| file.read_to_end(&mut bytes))
            .map_err(|source| KvsError::WalOpen {
                path: path.display().to_string(),
                source,
            })?;

        let mut reader = WalReader::new(&bytes);
        let records_replayed = reader.by_ref().count() as u64;
        let bytes_discarded = reader.remaining() as u64;

        Ok(RecoveryResult {
            records_replayed,
            bytes_discarded,
            valid_len: reader.valid_len() as u64,
            was_truncated: false,
        })
    }
}
