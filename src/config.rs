//! Configuration for kvs
//!
//! Centralized configuration with sensible defaults, a builder, and an
//! optional JSON file whose fields override the defaults.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{KvsError, Result};

/// Main configuration for a kvs server instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Write-ahead log file. `None` runs the store memory-only.
    pub wal_path: Option<PathBuf>,

    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address
    pub listen_addr: String,

    /// Max concurrent client connections
    pub max_connections: usize,

    /// Initial size of each connection's receive buffer (bytes)
    pub recv_buffer_size: usize,

    // -------------------------------------------------------------------------
    // Reactor Configuration
    // -------------------------------------------------------------------------
    /// Upper bound on a single poll wait (milliseconds).
    ///
    /// Only bounds how quickly the loop notices the stop flag.
    pub poll_timeout_ms: u64,

    // -------------------------------------------------------------------------
    // Logging Configuration
    // -------------------------------------------------------------------------
    /// Append logs to this file instead of stderr
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            wal_path: Some(PathBuf::from("./kvs_store.db")),
            listen_addr: "127.0.0.1:1337".to_string(),
            max_connections: 1024,
            recv_buffer_size: 64 * 1024, // 64 KB
            poll_timeout_ms: 100,
            log_file: None,
        }
    }
}

/// On-disk form of [`Config`]; every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    wal_path: Option<PathBuf>,
    memory_only: Option<bool>,
    listen_addr: Option<String>,
    max_connections: Option<usize>,
    recv_buffer_size: Option<usize>,
    poll_timeout_ms: Option<u64>,
    log_file: Option<PathBuf>,
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Load a JSON config file on top of the defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            KvsError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json(&content)
            .map_err(|e| KvsError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Parse a JSON document on top of the defaults
    pub fn from_json(content: &str) -> Result<Self> {
        let file: FileConfig = serde_json::from_str(content)
            .map_err(|e| KvsError::Config(e.to_string()))?;

        let mut config = Config::default();
        if let Some(path) = file.wal_path {
            config.wal_path = Some(path);
        }
        if file.memory_only == Some(true) {
            config.wal_path = None;
        }
        if let Some(addr) = file.listen_addr {
            config.listen_addr = addr;
        }
        if let Some(count) = file.max_connections {
            config.max_connections = count;
        }
        if let Some(size) = file.recv_buffer_size {
            config.recv_buffer_size = size;
        }
        if let Some(ms) = file.poll_timeout_ms {
            config.poll_timeout_ms = ms;
        }
        if file.log_file.is_some() {
            config.log_file = file.log_file;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject values the server cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.max_connections == 0 {
            return Err(KvsError::Config("max_connections must be positive".into()));
        }
        if self.recv_buffer_size == 0 {
            return Err(KvsError::Config("recv_buffer_size must be positive".into()));
        }
        if self.poll_timeout_ms == 0 {
            return Err(KvsError::Config("poll_timeout_ms must be positive".into()));
        }
        Ok(())
    }

    /// Poll timeout as a Duration
    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the WAL file path
    pub fn wal_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.wal_path = Some(path.into());
        self
    }

    /// Run without a WAL
    pub fn memory_only(mut self) -> Self {
        self.config.wal_path = None;
        self
    }

    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the maximum number of concurrent connections
    pub fn max_connections(mut self, count: usize) -> Self {
        self.config.max_connections = count;
        self
    }

    /// Set the initial receive buffer size (in bytes)
    pub fn recv_buffer_size(mut self, size: usize) -> Self {
        self.config.recv_buffer_size = size;
        self
    }

    /// Set the poll timeout (in milliseconds)
    pub fn poll_timeout_ms(mut self, ms: u64) -> Self {
        self.config.poll_timeout_ms = ms;
        self
    }

    /// Write logs to a file
    pub fn log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.log_file = Some(path.into());
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
