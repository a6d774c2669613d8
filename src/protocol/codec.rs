//! Protocol codec
//!
//! Framing, decoding and serialization for the wire protocol.
//!
//! ## Wire Format
//!
//! ```text
//! ┌───────────┬─────────┬─────────┬─────┬────────────────┬──────────────┐
//! │ Size (8)  │ Tag (2) │   Key   │ NUL │ ValueSize (8)  │    Value     │
//! └───────────┴─────────┴─────────┴─────┴────────────────┴──────────────┘
//! ```
//!
//! - `Size` counts the whole frame including itself
//! - `ValueSize` and `Value` are present for SET and PUSH only
//! - integers use native byte order
//! - SOURCE and EXECUTE carry a UTF-8 path or name in the key position

use std::io::{IoSlice, Write};

use crate::buffer::ReadCursor;
use crate::error::{KvsError, Result};
use crate::value::encoded_len;

use super::{Command, CommandTag};

/// Size field plus tag
pub const HEADER_SIZE: usize = 10;

/// Largest frame accepted (16 MB)
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

const SIZE_FIELD: usize = 8;

static NUL: [u8; 1] = [0];

// =============================================================================
// Framing
// =============================================================================

/// Length of the frame at the start of `buf`, once it is fully buffered
///
/// Returns `Ok(None)` while more bytes are needed and an error when the
/// size field is out of range.
pub fn complete_frame_len(buf: &[u8]) -> Result<Option<usize>> {
    let Some(size) = ReadCursor::new(buf).read_u64() else {
        return Ok(None);
    };

    let size = usize::try_from(size).unwrap_or(usize::MAX);
    if size < HEADER_SIZE || size > MAX_FRAME_SIZE {
        return Err(KvsError::Protocol(format!(
            "Frame size out of range: {} bytes (min {}, max {})",
            size, HEADER_SIZE, MAX_FRAME_SIZE
        )));
    }

    if buf.len() < size {
        Ok(None)
    } else {
        Ok(Some(size))
    }
}

// =============================================================================
// Decoding
// =============================================================================

/// Decode one complete frame
///
/// The returned command borrows its key and value from `frame`.
pub fn decode_command(frame: &[u8]) -> Result<Command<'_>> {
    let mut cursor = ReadCursor::new(frame);

    let size = cursor
        .read_u64()
        .ok_or_else(|| KvsError::Protocol("Incomplete header".to_string()))?;
    if size != frame.len() as u64 {
        return Err(KvsError::Protocol(format!(
            "Frame size mismatch: header says {}, got {}",
            size,
            frame.len()
        )));
    }

    let raw_tag = cursor
        .read_u16()
        .ok_or_else(|| KvsError::Protocol("Incomplete header".to_string()))?;
    let tag = CommandTag::from_u16(raw_tag).ok_or(KvsError::UnknownTag(raw_tag))?;

    let key = cursor.read_until_nul().ok_or_else(|| {
        KvsError::Protocol(format!("{} command: key is not NUL-terminated", tag.name()))
    })?;

    let value = if tag.carries_value() {
        Some(decode_value(&mut cursor, tag)?)
    } else {
        None
    };

    if !cursor.is_empty() {
        return Err(KvsError::Protocol(format!(
            "{} command: {} trailing bytes",
            tag.name(),
            cursor.remaining()
        )));
    }

    let command = match (tag, value) {
        (CommandTag::Get, _) => Command::Get { key },
        (CommandTag::Set, Some(value)) => Command::Set { key, value },
        (CommandTag::Push, Some(value)) => Command::Push { key, value },
        (CommandTag::Pop, _) => Command::Pop { key },
        (CommandTag::Sum, _) => Command::Sum { key },
        (CommandTag::Max, _) => Command::Max { key },
        (CommandTag::Min, _) => Command::Min { key },
        (CommandTag::Source, _) => Command::Source {
            path: decode_name(key, tag)?,
        },
        (CommandTag::Execute, _) => Command::Execute {
            name: decode_name(key, tag)?,
        },
        (CommandTag::Set | CommandTag::Push, None) => {
            return Err(KvsError::Protocol(format!(
                "{} command: missing value",
                tag.name()
            )))
        }
    };

    Ok(command)
}

/// Read the value-size field and the value it announces
fn decode_value<'a>(cursor: &mut ReadCursor<'a>, tag: CommandTag) -> Result<&'a [u8]> {
    let size = cursor.read_u64().ok_or_else(|| {
        KvsError::Protocol(format!("{} command: missing value size", tag.name()))
    })?;

    let value = usize::try_from(size)
        .ok()
        .and_then(|size| cursor.read_bytes(size))
        .ok_or_else(|| {
            KvsError::Protocol(format!(
                "{} command: incomplete value (expected {}, got {})",
                tag.name(),
                size,
                cursor.remaining()
            ))
        })?;

    if encoded_len(value) != Some(value.len()) {
        return Err(KvsError::Protocol(format!(
            "{} command: malformed value encoding",
            tag.name()
        )));
    }

    Ok(value)
}

fn decode_name(raw: &[u8], tag: CommandTag) -> Result<&str> {
    std::str::from_utf8(raw)
        .map_err(|_| KvsError::Protocol(format!("{} command: name is not UTF-8", tag.name())))
}

// =============================================================================
// Serialization
// =============================================================================

/// A serialized command as scatter/gather slices
///
/// Only the fixed-size fields are materialized; key and value stay borrowed.
#[derive(Debug, Clone)]
pub struct Frame<'a> {
    header: [u8; HEADER_SIZE],
    key: &'a [u8],
    value_size: [u8; SIZE_FIELD],
    value: Option<&'a [u8]>,
}

impl<'a> Frame<'a> {
    /// Total frame size in bytes
    pub fn len(&self) -> usize {
        HEADER_SIZE
            + self.key.len()
            + NUL.len()
            + self.value.map(|v| SIZE_FIELD + v.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Slices in wire order, suitable for `write_vectored`
    pub fn io_slices(&self) -> [IoSlice<'_>; 5] {
        let (value_size, value) = match self.value {
            Some(value) => (&self.value_size[..], value),
            None => (&[][..], &[][..]),
        };
        [
            IoSlice::new(&self.header),
            IoSlice::new(self.key),
            IoSlice::new(&NUL),
            IoSlice::new(value_size),
            IoSlice::new(value),
        ]
    }

    /// Copy into one contiguous buffer
    pub fn to_vec(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len());
        for slice in self.io_slices() {
            out.extend_from_slice(&slice);
        }
        out
    }

    /// Write the whole frame to a blocking writer
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&self.to_vec())?;
        Ok(())
    }
}

impl<'a> Command<'a> {
    /// Serialize without copying key or value
    pub fn serialize(&self) -> Frame<'a> {
        let key = self.key();
        let value = self.value();

        let mut frame = Frame {
            header: [0; HEADER_SIZE],
            key,
            value_size: (value.map(<[u8]>::len).unwrap_or(0) as u64).to_ne_bytes(),
            value,
        };

        let total = frame.len() as u64;
        frame.header[..SIZE_FIELD].copy_from_slice(&total.to_ne_bytes());
        frame.header[SIZE_FIELD..].copy_from_slice(&(self.tag() as u16).to_ne_bytes());
        frame
    }
}
