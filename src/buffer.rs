//! Buffers
//!
//! - [`ReadCursor`]: bounded, non-copying reads over a byte slice
//! - [`RecvBuffer`]: growable receive buffer with compaction
//! - [`WriteBacklog`]: bytes waiting for a writable socket

use std::io::{self, Read};

use bytes::{Buf, BytesMut};

/// Cursor over a borrowed byte slice
///
/// Every read is bounds-checked and returns `None` past the end instead of
/// panicking. Returned slices borrow from the underlying buffer.
#[derive(Debug, Clone)]
pub struct ReadCursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ReadCursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes consumed so far
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Unconsumed bytes (does not advance)
    pub fn rest(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }

    pub fn read_bytes(&mut self, len: usize) -> Option<&'a [u8]> {
        let end = self.pos.checked_add(len)?;
        let bytes = self.buf.get(self.pos..end)?;
        self.pos = end;
        Some(bytes)
    }

    pub fn read_u16(&mut self) -> Option<u16> {
        let mut raw = [0u8; 2];
        raw.copy_from_slice(self.read_bytes(2)?);
        Some(u16::from_ne_bytes(raw))
    }

    pub fn read_u64(&mut self) -> Option<u64> {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(self.read_bytes(8)?);
        Some(u64::from_ne_bytes(raw))
    }

    /// Read up to a NUL byte; the NUL is consumed but not returned
    pub fn read_until_nul(&mut self) -> Option<&'a [u8]> {
        let len = self.rest().iter().position(|&b| b == 0)?;
        let bytes = self.read_bytes(len)?;
        self.pos += 1;
        Some(bytes)
    }
}

/// Minimum free space offered to a socket read
const MIN_READ_SPACE: usize = 4096;

/// Growable receive buffer
///
/// Reads append at the back and frames are consumed from the front with
/// [`consume`](Self::consume). [`compact`](Self::compact) lets `BytesMut`
/// reclaim the consumed prefix once a batch of frames has been drained.
#[derive(Debug)]
pub struct RecvBuffer {
    buf: BytesMut,

    /// Capacity restored by `compact`
    target: usize,
}

impl RecvBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        let target = capacity.max(MIN_READ_SPACE);
        Self {
            buf: BytesMut::with_capacity(target),
            target,
        }
    }

    /// Buffered bytes not yet consumed
    pub fn readable(&self) -> &[u8] {
        &self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.buf.capacity()
    }

    /// One `read` from `src` into the free space after the buffered bytes
    ///
    /// At least `MIN_READ_SPACE` bytes are offered. Returns what `read`
    /// returned; on error nothing is appended.
    pub fn read_from<R: Read>(&mut self, src: &mut R) -> io::Result<usize> {
        self.buf.reserve(MIN_READ_SPACE);
        let filled = self.buf.len();
        let spare = self.buf.capacity() - filled;

        self.buf.resize(filled + spare, 0);
        let result = src.read(&mut self.buf[filled..]);
        let n = result.as_ref().map_or(0, |&n| n.min(spare));
        self.buf.truncate(filled + n);
        result
    }

    /// Drop `n` bytes from the front of the readable region
    pub fn consume(&mut self, n: usize) {
        self.buf.advance(n.min(self.buf.len()));
    }

    /// Reclaim the consumed prefix
    pub fn compact(&mut self) {
        let additional = self.target.saturating_sub(self.buf.len());
        self.buf.reserve(additional);
    }
}

/// Bytes that could not be written to a socket yet
#[derive(Debug, Default)]
pub struct WriteBacklog {
    buf: BytesMut,
}

impl WriteBacklog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn extend_from_slice(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Oldest pending bytes
    pub fn chunk(&self) -> &[u8] {
        self.buf.chunk()
    }

    /// Drop `n` written bytes from the front
    pub fn advance(&mut self, n: usize) {
        self.buf.advance(n.min(self.buf.len()));
    }
}
