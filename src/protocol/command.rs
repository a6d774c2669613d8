//! Command definitions
//!
//! Represents decoded commands and their execution against a [`Store`].
//! Keys and values borrow from the frame they were decoded from.

use std::borrow::Cow;

use tracing::{debug, info, trace, warn};

use crate::error::Result;
use crate::procedure::ProcedureRegistry;
use crate::store::Store;
use crate::value::{
    decode, decode_kind, pop_encoded, push_encoded, reduce_encoded, Kind, PushOutcome, Reduction,
    Value, NULL_ENCODED,
};

/// Command tags as carried on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum CommandTag {
    Get = 0,
    Set = 1,
    Push = 2,
    Pop = 3,
    Sum = 4,
    Max = 5,
    Min = 6,
    Source = 7,
    Execute = 8,
}

impl CommandTag {
    pub fn from_u16(tag: u16) -> Option<Self> {
        match tag {
            0 => Some(CommandTag::Get),
            1 => Some(CommandTag::Set),
            2 => Some(CommandTag::Push),
            3 => Some(CommandTag::Pop),
            4 => Some(CommandTag::Sum),
            5 => Some(CommandTag::Max),
            6 => Some(CommandTag::Min),
            7 => Some(CommandTag::Source),
            8 => Some(CommandTag::Execute),
            _ => None,
        }
    }

    /// Commands that change the store and are written to the WAL
    pub fn is_mutating(self) -> bool {
        matches!(self, CommandTag::Set | CommandTag::Push | CommandTag::Pop)
    }

    /// Commands whose frame carries a value after the key
    pub fn carries_value(self) -> bool {
        matches!(self, CommandTag::Set | CommandTag::Push)
    }

    pub fn name(self) -> &'static str {
        match self {
            CommandTag::Get => "GET",
            CommandTag::Set => "SET",
            CommandTag::Push => "PUSH",
            CommandTag::Pop => "POP",
            CommandTag::Sum => "SUM",
            CommandTag::Max => "MAX",
            CommandTag::Min => "MIN",
            CommandTag::Source => "SOURCE",
            CommandTag::Execute => "EXECUTE",
        }
    }
}

/// A parsed command
///
/// `value` fields hold an encoded [`Value`], already validated by the codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command<'a> {
    /// Fetch the value stored under a key
    Get { key: &'a [u8] },

    /// Overwrite the value stored under a key
    Set { key: &'a [u8], value: &'a [u8] },

    /// Append a scalar or list to the list stored under a key
    Push { key: &'a [u8], value: &'a [u8] },

    /// Drop the last element of the list stored under a key
    Pop { key: &'a [u8] },

    Sum { key: &'a [u8] },
    Max { key: &'a [u8] },
    Min { key: &'a [u8] },

    /// Load a procedure library
    Source { path: &'a str },

    /// Run a loaded procedure
    Execute { name: &'a str },
}

/// Reply to a read-type command, always sent as a SET frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply<'a> {
    pub key: &'a [u8],
    pub value: Cow<'a, [u8]>,
}

impl<'a> Reply<'a> {
    fn borrowed(key: &'a [u8], value: &'a [u8]) -> Self {
        Self {
            key,
            value: Cow::Borrowed(value),
        }
    }

    fn owned(key: &'a [u8], value: &Value) -> Self {
        Self {
            key,
            value: Cow::Owned(value.to_bytes()),
        }
    }

    /// The SET command that carries this reply
    pub fn as_command(&self) -> Command<'_> {
        Command::Set {
            key: self.key,
            value: &self.value,
        }
    }

    /// Decoded reply value
    pub fn value(&self) -> Value {
        decode(&self.value)
    }
}

impl<'a> Command<'a> {
    /// Get the command tag
    pub fn tag(&self) -> CommandTag {
        match self {
            Command::Get { .. } => CommandTag::Get,
            Command::Set { .. } => CommandTag::Set,
            Command::Push { .. } => CommandTag::Push,
            Command::Pop { .. } => CommandTag::Pop,
            Command::Sum { .. } => CommandTag::Sum,
            Command::Max { .. } => CommandTag::Max,
            Command::Min { .. } => CommandTag::Min,
            Command::Source { .. } => CommandTag::Source,
            Command::Execute { .. } => CommandTag::Execute,
        }
    }

    /// Bytes in the key position of the frame
    pub fn key(&self) -> &'a [u8] {
        match *self {
            Command::Get { key }
            | Command::Set { key, .. }
            | Command::Push { key, .. }
            | Command::Pop { key }
            | Command::Sum { key }
            | Command::Max { key }
            | Command::Min { key } => key,
            Command::Source { path } => path.as_bytes(),
            Command::Execute { name } => name.as_bytes(),
        }
    }

    /// Encoded value, for SET and PUSH
    pub fn value(&self) -> Option<&'a [u8]> {
        match *self {
            Command::Set { value, .. } | Command::Push { value, .. } => Some(value),
            _ => None,
        }
    }

    pub fn is_mutating(&self) -> bool {
        self.tag().is_mutating()
    }

    /// Execute against the store
    ///
    /// Mutating commands are appended to the WAL before the store changes.
    /// Only persistence failures are returned as errors; type mismatches and
    /// procedure failures are logged and leave the store unchanged.
    pub fn execute<'s>(
        &self,
        store: &'s mut Store,
        procedures: &mut ProcedureRegistry,
    ) -> Result<Option<Reply<'s>>>
    where
        'a: 's,
    {
        trace!(command = self.tag().name(), key_len = self.key().len(), "Executing");

        match *self {
            Command::Get { key } => {
                let value = match store.lookup(key) {
                    Some(entry) if !entry.is_empty() => entry.as_bytes(),
                    _ => &NULL_ENCODED[..],
                };
                Ok(Some(Reply::borrowed(key, value)))
            }
            Command::Set { .. } | Command::Push { .. } | Command::Pop { .. } => {
                store.log(self)?;
                self.apply(store);
                Ok(None)
            }
            Command::Sum { key } => Ok(Some(reduce(store, key, Reduction::Sum))),
            Command::Max { key } => Ok(Some(reduce(store, key, Reduction::Max))),
            Command::Min { key } => Ok(Some(reduce(store, key, Reduction::Min))),
            Command::Source { path } => {
                match procedures.source(path) {
                    Ok(name) => info!(path, name = %name, "Procedure library loaded"),
                    Err(e) => warn!(path, error = %e, "SOURCE failed"),
                }
                Ok(None)
            }
            Command::Execute { name } => match procedures.execute(name, store) {
                Ok(()) => {
                    debug!(name, "Procedure executed");
                    Ok(None)
                }
                Err(e) if e.is_fatal() => Err(e),
                Err(e) => {
                    warn!(name, error = %e, "EXECUTE failed");
                    Ok(None)
                }
            },
        }
    }

    /// Apply a mutating command to the store without logging it
    ///
    /// Shared by live execution (after the WAL append) and WAL replay.
    /// Read-type commands are ignored.
    pub(crate) fn apply(&self, store: &mut Store) {
        match *self {
            Command::Set { key, value } => store.upsert(key).set(value),
            Command::Push { key, value } => {
                if decode_kind(value) == Kind::Null {
                    warn!(key = %String::from_utf8_lossy(key), "PUSH of null ignored");
                    return;
                }
                let entry = store.upsert(key);
                match push_encoded(entry.bytes_mut(), value) {
                    PushOutcome::Created | PushOutcome::Extended => {}
                    PushOutcome::Mismatch { stored, pushed } => warn!(
                        key = %String::from_utf8_lossy(key),
                        ?stored,
                        ?pushed,
                        "PUSH kind mismatch ignored"
                    ),
                    PushOutcome::Malformed => warn!(
                        key = %String::from_utf8_lossy(key),
                        "PUSH onto malformed entry ignored"
                    ),
                }
            }
            Command::Pop { key } => {
                let popped = store
                    .lookup_mut(key)
                    .map(|entry| pop_encoded(entry.bytes_mut()))
                    .unwrap_or(false);
                if !popped {
                    trace!(key = %String::from_utf8_lossy(key), "POP had nothing to remove");
                }
            }
            _ => {}
        }
    }
}

fn reduce<'s>(store: &'s Store, key: &'s [u8], reduction: Reduction) -> Reply<'s> {
    let result = store
        .lookup(key)
        .map(|entry| reduce_encoded(entry.as_bytes(), reduction))
        .unwrap_or(Value::Null);
    Reply::owned(key, &result)
}
