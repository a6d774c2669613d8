//! kvs Server Binary
//!
//! Starts the reactor-driven TCP server for kvs.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use clap::Parser;
use kvs::network::Server;
use kvs::{Config, Engine};
use signal_hook::consts::{SIGINT, SIGTERM};
use tracing_subscriber::{fmt, EnvFilter};

/// kvs Server
#[derive(Parser, Debug)]
#[command(name = "kvs-server")]
#[command(about = "Single-threaded key-value store with typed values and a write-ahead log")]
#[command(version)]
struct Args {
    /// JSON config file; flags below override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address (host:port)
    #[arg(short, long)]
    listen: Option<String>,

    /// Write-ahead log file
    #[arg(short, long, conflicts_with = "memory_only")]
    wal: Option<PathBuf>,

    /// Keep everything in memory; nothing survives a restart
    #[arg(long)]
    memory_only: bool,

    /// Maximum concurrent connections
    #[arg(short, long)]
    max_connections: Option<usize>,

    /// Upper bound on one poll wait, in milliseconds
    #[arg(long)]
    poll_timeout_ms: Option<u64>,

    /// Append logs to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn main() {
    let args = Args::parse();

    let config = match build_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("kvs-server: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize tracing/logging
    if let Err(e) = init_logging(&config) {
        eprintln!("kvs-server: cannot open log file: {}", e);
        std::process::exit(1);
    }

    tracing::info!("kvs Server v{}", kvs::VERSION);
    match &config.wal_path {
        Some(path) => tracing::info!("WAL: {}", path.display()),
        None => tracing::info!("WAL: none (memory-only)"),
    }
    tracing::info!("Listen address: {}", config.listen_addr);

    // Open engine (replays the WAL)
    let engine = match Engine::open(&config) {
        Ok(engine) => engine,
        Err(e) => {
            tracing::error!("Failed to open engine: {}", e);
            std::process::exit(1);
        }
    };

    let mut server = match Server::bind(config, engine) {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("Failed to start server: {}", e);
            std::process::exit(1);
        }
    };

    // SIGINT/SIGTERM set the reactor's stop flag
    let stop = server.stop_flag();
    for signal in [SIGINT, SIGTERM] {
        if let Err(e) = signal_hook::flag::register(signal, stop.clone()) {
            tracing::warn!("Cannot install handler for signal {}: {}", signal, e);
        }
    }

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

fn build_config(args: &Args) -> kvs::Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    if let Some(listen) = &args.listen {
        config.listen_addr = listen.clone();
    }
    if let Some(wal) = &args.wal {
        config.wal_path = Some(wal.clone());
    }
    if args.memory_only {
        config.wal_path = None;
    }
    if let Some(count) = args.max_connections {
        config.max_connections = count;
    }
    if let Some(ms) = args.poll_timeout_ms {
        config.poll_timeout_ms = ms;
    }
    if let Some(path) = &args.log_file {
        config.log_file = Some(path.clone());
    }

    config.validate()?;
    Ok(config)
}

fn init_logging(config: &Config) -> std::io::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,kvs=debug"));

    let builder = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true);

    match &config.log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => builder.init(),
    }
    Ok(())
}
