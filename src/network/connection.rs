//! Connection Handler
//!
//! Handles one client socket inside the reactor: frame assembly, command
//! dispatch and reply writing.

use std::io::{self, Write};
use std::net::SocketAddr;

use mio::event::Source;
use mio::net::TcpStream;
use mio::Interest;
use tracing::{debug, trace, warn};

use crate::buffer::{RecvBuffer, WriteBacklog};
use crate::engine::Engine;
use crate::error::Result;
use crate::protocol::{complete_frame_len, decode_command, Frame};
use crate::reactor::{Context, Handler};

/// Writes reply frames, stashing whatever the socket does not take
#[derive(Debug, Default)]
pub struct ResponseWriter {
    backlog: WriteBacklog,

    /// Whether WRITABLE interest is currently registered
    write_interest: bool,
}

impl ResponseWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Send a frame, directly when nothing is queued
    ///
    /// Bytes the socket does not accept go to the backlog.
    pub fn send<W: Write>(&mut self, stream: &mut W, frame: &Frame<'_>) -> io::Result<()> {
        let slices = frame.io_slices();

        if !self.backlog.is_empty() {
            for slice in &slices {
                self.backlog.extend_from_slice(slice);
            }
            return Ok(());
        }

        let written = loop {
            match stream.write_vectored(&slices) {
                Ok(n) => break n,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break 0,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        };

        if written < frame.len() {
            debug!(written, len = frame.len(), "Partial write, stashing remainder");
            let mut skip = written;
            for slice in &slices {
                if skip >= slice.len() {
                    skip -= slice.len();
                    continue;
                }
                self.backlog.extend_from_slice(&slice[skip..]);
                skip = 0;
            }
        }
        Ok(())
    }

    /// Write queued bytes until the socket would block
    pub fn flush<W: Write>(&mut self, stream: &mut W) -> io::Result<()> {
        while !self.backlog.is_empty() {
            match stream.write(self.backlog.chunk()) {
                Ok(0) => return Err(io::ErrorKind::WriteZero.into()),
                Ok(n) => self.backlog.advance(n),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Bytes still queued
    pub fn pending(&self) -> usize {
        self.backlog.len()
    }
}

/// Handles a single client connection
pub struct Connection {
    stream: TcpStream,

    /// Peer address for logging
    peer_addr: SocketAddr,

    recv: RecvBuffer,
    writer: ResponseWriter,
}

impl Connection {
    pub fn new(stream: TcpStream, peer_addr: SocketAddr, recv_buffer_size: usize) -> Self {
        Self {
            stream,
            peer_addr,
            recv: RecvBuffer::with_capacity(recv_buffer_size),
            writer: ResponseWriter::new(),
        }
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// Read until the socket would block, processing frames after each read
    ///
    /// Returns `Ok(false)` when the connection must close.
    fn read_and_process(&mut self, engine: &mut Engine) -> Result<bool> {
        loop {
            match self.recv.read_from(&mut self.stream) {
                Ok(0) => {
                    if !self.recv.is_empty() {
                        debug!(
                            peer = %self.peer_addr,
                            discarded = self.recv.len(),
                            "Peer closed mid-frame"
                        );
                    }
                    return Ok(false);
                }
                Ok(_) => {
                    if !self.process_frames(engine)? {
                        return Ok(false);
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(true),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    debug!(peer = %self.peer_addr, error = %e, "Read failed");
                    return Ok(false);
                }
            }
        }
    }

    /// Execute every complete frame in the receive buffer
    fn process_frames(&mut self, engine: &mut Engine) -> Result<bool> {
        loop {
            let len = match complete_frame_len(self.recv.readable()) {
                Ok(Some(len)) => len,
                Ok(None) => break,
                Err(e) => {
                    warn!(peer = %self.peer_addr, error = %e, "Malformed frame, closing");
                    return Ok(false);
                }
            };

            let frame = &self.recv.readable()[..len];
            let command = match decode_command(frame) {
                Ok(command) => command,
                Err(e) => {
                    warn!(peer = %self.peer_addr, error = %e, "Malformed frame, closing");
                    return Ok(false);
                }
            };
            trace!(peer = %self.peer_addr, command = command.tag().name(), len, "Frame");

            if let Some(reply) = engine.execute(&command)? {
                let frame = reply.as_command().serialize();
                if let Err(e) = self.writer.send(&mut self.stream, &frame) {
                    debug!(peer = %self.peer_addr, error = %e, "Write failed");
                    return Ok(false);
                }
            }

            self.recv.consume(len);
        }

        self.recv.compact();
        Ok(true)
    }

    /// Register WRITABLE while replies are queued, READABLE only otherwise
    fn update_interest(&mut self, cx: &Context<'_, Engine>) -> bool {
        let want_write = self.writer.pending() > 0;
        if want_write == self.writer.write_interest {
            return true;
        }

        let interest = if want_write {
            Interest::READABLE | Interest::WRITABLE
        } else {
            Interest::READABLE
        };
        self.writer.write_interest = want_write;
        cx.reregister(&mut self.stream, interest)
    }
}

impl Handler<Engine> for Connection {
    fn source(&mut self) -> &mut dyn Source {
        &mut self.stream
    }

    fn dispatch(&mut self, cx: &mut Context<'_, Engine>) -> Result<bool> {
        let readable = cx.event().is_readable();
        let writable = cx.event().is_writable();

        if writable && self.writer.pending() > 0 {
            if let Err(e) = self.writer.flush(&mut self.stream) {
                debug!(peer = %self.peer_addr, error = %e, "Flush failed");
                return Ok(false);
            }
        }

        if readable && !self.read_and_process(cx.state)? {
            debug!(peer = %self.peer_addr, "Connection closed");
            return Ok(false);
        }

        Ok(self.update_interest(cx))
    }
}
