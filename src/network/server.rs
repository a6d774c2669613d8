//! TCP Server
//!
//! Accepts connections into the reactor and runs the loop.

use std::io;
use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use mio::event::Source;
use mio::net::TcpListener;
use mio::Interest;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::engine::Engine;
use crate::error::{KvsError, Result};
use crate::reactor::{Context, Handler, Reactor, ReactorHandle};

use super::Connection;

/// Accepts connections and registers a [`Connection`] for each
pub struct Listener {
    listener: TcpListener,
    max_connections: usize,
    recv_buffer_size: usize,
}

impl Listener {
    pub fn new(listener: TcpListener, config: &Config) -> Self {
        Self {
            listener,
            max_connections: config.max_connections,
            recv_buffer_size: config.recv_buffer_size,
        }
    }
}

impl Handler<Engine> for Listener {
    fn source(&mut self) -> &mut dyn Source {
        &mut self.listener
    }

    fn dispatch(&mut self, cx: &mut Context<'_, Engine>) -> Result<bool> {
        loop {
            match self.listener.accept() {
                Ok((stream, peer_addr)) => {
                    // The listener itself holds one slot
                    if cx.handler_count() > self.max_connections {
                        warn!(peer = %peer_addr, "Max connections reached, rejecting");
                        continue;
                    }

                    if let Err(e) = stream.set_nodelay(true) {
                        debug!(peer = %peer_addr, error = %e, "set_nodelay failed");
                    }

                    let connection = Connection::new(stream, peer_addr, self.recv_buffer_size);
                    match cx.register(Box::new(connection), Interest::READABLE) {
                        Ok(id) => debug!(peer = %peer_addr, index = id.index(), "Connection accepted"),
                        Err(e) => warn!(peer = %peer_addr, error = %e, "Failed to register connection"),
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(true),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    warn!(error = %e, "Accept failed");
                    return Ok(true);
                }
            }
        }
    }
}

/// TCP server for kvs
pub struct Server {
    config: Config,
    reactor: Reactor<Engine>,
    engine: Engine,
    local_addr: SocketAddr,
}

impl Server {
    /// Bind the listen address and register the listener
    ///
    /// Failing to bind is fatal ([`KvsError::Bind`]).
    pub fn bind(config: Config, engine: Engine) -> Result<Self> {
        let addr = config
            .listen_addr
            .to_socket_addrs()
            .map_err(|e| KvsError::Config(format!("listen_addr '{}': {}", config.listen_addr, e)))?
            .next()
            .ok_or_else(|| {
                KvsError::Config(format!("listen_addr '{}' resolves to nothing", config.listen_addr))
            })?;

        let listener = TcpListener::bind(addr).map_err(|source| KvsError::Bind { addr, source })?;
        let local_addr = listener.local_addr()?;

        let reactor = Reactor::new()?;
        reactor.register(Box::new(Listener::new(listener, &config)), Interest::READABLE)?;

        info!(addr = %local_addr, "Listening");

        Ok(Self {
            config,
            reactor,
            engine,
            local_addr,
        })
    }

    /// Address actually bound (resolves port 0)
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Handle for stopping the server from another thread
    pub fn handle(&self) -> ReactorHandle<Engine> {
        self.reactor.handle()
    }

    /// Flag that stops the loop when set, e.g. from a signal handler
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        self.reactor.stop_flag()
    }

    /// Run until stopped, then shut the engine down
    ///
    /// Returns the fatal error that stopped the loop, if any.
    pub fn run(&mut self) -> Result<()> {
        let result = self
            .reactor
            .run(&mut self.engine, Some(self.config.poll_timeout()));

        if let Err(e) = &result {
            error!(error = %e, "Server loop failed");
        }
        if let Err(e) = self.engine.shutdown() {
            error!(error = %e, "Engine shutdown failed");
        }
        info!("Server stopped");
        result
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn into_engine(self) -> Engine {
        self.engine
    }
}
