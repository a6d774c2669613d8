//! WAL Writer
//!
//! Handles appending frames to the WAL file.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{error, trace};

use crate::error::{KvsError, Result};
use crate::protocol::Frame;

/// Appends serialized commands to the WAL file
#[derive(Debug)]
pub struct WalWriter {
    file: File,
    path: PathBuf,

    /// Byte offset where the next record starts
    offset: u64,
}

impl WalWriter {
    /// Wrap an open file whose cursor is already positioned at `offset`
    pub(crate) fn new(file: File, path: &Path, offset: u64) -> Self {
        Self {
            file,
            path: path.to_path_buf(),
            offset,
        }
    }

    /// Append one frame with a single vectored write
    ///
    /// A short write leaves a torn record behind and is reported as
    /// [`KvsError::WalWrite`]; the caller must not apply the command.
    pub fn append(&mut self, frame: &Frame<'_>) -> Result<u64> {
        let expected = frame.len();
        let written = self
            .file
            .write_vectored(&frame.io_slices())
            .map_err(|e| KvsError::WalWrite(format!("{}: {}", self.path.display(), e)))?;

        if written != expected {
            error!(
                path = %self.path.display(),
                written,
                expected,
                "Short WAL write"
            );
            return Err(KvsError::WalWrite(format!(
                "{}: short write ({} of {} bytes)",
                self.path.display(),
                written,
                expected
            )));
        }

        let start = self.offset;
        self.offset += written as u64;
        trace!(offset = start, len = written, "WAL append");
        Ok(start)
    }

    /// Force file contents to disk
    pub fn sync(&mut self) -> Result<()> {
        self.file.sync_data()?;
        Ok(())
    }

    /// Offset of the next append
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
