//! Network Module
//!
//! TCP server and client handling.
//!
//! ## Architecture
//! - One reactor thread owns the listener and every connection
//! - Sockets are non-blocking; commands run to completion on that thread
//! - Commands routed through Engine
//! - A blocking client for tools and tests

mod client;
mod connection;
mod server;

pub use client::Client;
pub use connection::{Connection, ResponseWriter};
pub use server::{Listener, Server};
