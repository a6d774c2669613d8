//! WAL Reader
//!
//! Iterates over the records of a WAL image held in memory.

use tracing::warn;

use crate::protocol::{complete_frame_len, decode_command, Command};

/// Reads records from WAL bytes
///
/// Iteration stops at the first record that is incomplete, undecodable, or
/// not a mutating command. [`valid_len`](Self::valid_len) then tells where
/// the intact prefix ends.
pub struct WalReader<'a> {
    bytes: &'a [u8],
    offset: usize,
    done: bool,
}

impl<'a> WalReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            offset: 0,
            done: false,
        }
    }

    /// Length of the prefix made of intact records read so far
    pub fn valid_len(&self) -> usize {
        self.offset
    }

    /// Bytes after the intact prefix
    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.offset
    }

    fn next_record(&mut self) -> Option<(usize, Command<'a>)> {
        let rest = &self.bytes[self.offset..];
        if rest.is_empty() {
            return None;
        }

        let len = match complete_frame_len(rest) {
            Ok(Some(len)) => len,
            Ok(None) => {
                warn!(offset = self.offset, "Incomplete WAL record");
                return None;
            }
            Err(e) => {
                warn!(offset = self.offset, error = %e, "Corrupt WAL record header");
                return None;
            }
        };

        let command = match decode_command(&rest[..len]) {
            Ok(command) => command,
            Err(e) => {
                warn!(offset = self.offset, error = %e, "Undecodable WAL record");
                return None;
            }
        };

        if !command.is_mutating() {
            warn!(
                offset = self.offset,
                command = command.tag().name(),
                "Non-mutating command in WAL"
            );
            return None;
        }

        let start = self.offset;
        self.offset += len;
        Some((start, command))
    }
}

impl<'a> Iterator for WalReader<'a> {
    /// Record offset and command
    type Item = (usize, Command<'a>);

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let record = self.next_record();
        if record.is_none() {
            self.done = true;
        }
        record
    }
}
