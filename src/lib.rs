//! # kvs
//!
//! An in-process key-value store with:
//! - Typed values: native scalars and homogeneous lists
//! - Write-Ahead Logging (WAL) with replay on startup
//! - Torn-tail truncation after a crash mid-append
//! - A single-threaded, readiness-driven reactor
//! - A compact binary client protocol
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   Reactor (mio Poll)                         │
//! │            Listener + one handler per client                 │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ complete frames
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                  Command protocol                            │
//! │            decode → execute → serialize reply                │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │     WAL     │          │    Store    │
//!   │  (Append)   │          │  (HashMap)  │
//!   └─────────────┘          └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;

pub mod buffer;
pub mod engine;
pub mod network;
pub mod procedure;
pub mod protocol;
pub mod reactor;
pub mod store;
pub mod value;
pub mod wal;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use config::Config;
pub use engine::Engine;
pub use error::{KvsError, Result};
pub use network::{Client, Server};
pub use protocol::Command;
pub use store::Store;
pub use value::Value;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of kvs
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
