//! Error types for kvs
//!
//! Provides a unified error type for all operations.

use std::net::SocketAddr;

use thiserror::Error;

/// Result type alias using KvsError
pub type Result<T> = std::result::Result<T, KvsError>;

/// Unified error type for kvs operations
#[derive(Debug, Error)]
pub enum KvsError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // WAL Errors
    // -------------------------------------------------------------------------
    #[error("WAL open failed for {path}: {source}")]
    WalOpen {
        path: String,
        source: std::io::Error,
    },

    #[error("WAL write failed: {0}")]
    WalWrite(String),

    // -------------------------------------------------------------------------
    // Protocol Errors
    // -------------------------------------------------------------------------
    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Unknown command tag: {0}")]
    UnknownTag(u16),

    // -------------------------------------------------------------------------
    // Value Errors
    // -------------------------------------------------------------------------
    #[error("Cannot parse value: {0}")]
    ValueParse(String),

    // -------------------------------------------------------------------------
    // Procedure Errors
    // -------------------------------------------------------------------------
    #[error("Procedure error: {0}")]
    Procedure(String),

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    #[error("Failed to bind to {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    #[error("Connection closed by peer")]
    ConnectionClosed,

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl KvsError {
    /// Whether the error must stop the process.
    ///
    /// Memory and log may diverge after a failed WAL write, so persistence
    /// errors are never handled locally.
    pub fn is_fatal(&self) -> bool {
        matches!(self, KvsError::WalOpen { .. } | KvsError::WalWrite(_))
    }
}
