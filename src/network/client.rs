//! Blocking client
//!
//! Speaks the wire protocol over a `std::net::TcpStream`.

use std::io::{self, Read};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use crate::error::{KvsError, Result};
use crate::protocol::{decode_command, Command, HEADER_SIZE, MAX_FRAME_SIZE};
use crate::value::{decode, Value};

/// Client for a kvs server
///
/// Read-type commands wait for the reply; writes return once sent.
pub struct Client {
    stream: TcpStream,
}

impl Client {
    pub fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;
        Ok(Self { stream })
    }

    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        self.stream.set_read_timeout(timeout)?;
        Ok(())
    }

    pub fn get(&mut self, key: &[u8]) -> Result<Value> {
        self.request(&Command::Get { key })
    }

    pub fn set(&mut self, key: &[u8], value: &Value) -> Result<()> {
        let value = value.to_bytes();
        self.send(&Command::Set { key, value: &value })
    }

    pub fn push(&mut self, key: &[u8], value: &Value) -> Result<()> {
        let value = value.to_bytes();
        self.send(&Command::Push { key, value: &value })
    }

    pub fn pop(&mut self, key: &[u8]) -> Result<()> {
        self.send(&Command::Pop { key })
    }

    pub fn sum(&mut self, key: &[u8]) -> Result<Value> {
        self.request(&Command::Sum { key })
    }

    pub fn max(&mut self, key: &[u8]) -> Result<Value> {
        self.request(&Command::Max { key })
    }

    pub fn min(&mut self, key: &[u8]) -> Result<Value> {
        self.request(&Command::Min { key })
    }

    pub fn source(&mut self, path: &str) -> Result<()> {
        self.send(&Command::Source { path })
    }

    pub fn execute(&mut self, name: &str) -> Result<()> {
        self.send(&Command::Execute { name })
    }

    /// Send a command without waiting for a reply
    pub fn send(&mut self, command: &Command<'_>) -> Result<()> {
        if command.key().contains(&0) {
            return Err(KvsError::Protocol("key contains a NUL byte".to_string()));
        }
        command.serialize().write_to(&mut self.stream)
    }

    /// Send a command and read its reply value
    pub fn request(&mut self, command: &Command<'_>) -> Result<Value> {
        self.send(command)?;
        self.read_reply()
    }

    /// Read one reply frame; replies are always SET frames
    fn read_reply(&mut self) -> Result<Value> {
        let mut size = [0u8; 8];
        self.stream.read_exact(&mut size).map_err(closed_on_eof)?;

        let total = u64::from_ne_bytes(size);
        let total = usize::try_from(total).unwrap_or(usize::MAX);
        if !(HEADER_SIZE..=MAX_FRAME_SIZE).contains(&total) {
            return Err(KvsError::Protocol(format!("reply size {} out of range", total)));
        }

        let mut frame = vec![0u8; total];
        frame[..8].copy_from_slice(&size);
        self.stream.read_exact(&mut frame[8..]).map_err(closed_on_eof)?;

        match decode_command(&frame)? {
            Command::Set { value, .. } => Ok(decode(value)),
            other => Err(KvsError::Protocol(format!(
                "unexpected {} reply",
                other.tag().name()
            ))),
        }
    }
}

fn closed_on_eof(e: io::Error) -> KvsError {
    if e.kind() == io::ErrorKind::UnexpectedEof {
        KvsError::ConnectionClosed
    } else {
        KvsError::Io(e)
    }
}
