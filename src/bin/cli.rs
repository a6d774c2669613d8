//! kvs CLI Client
//!
//! Command-line interface for interacting with a kvs server.
//!
//! Values use the text form: `42`, `-7`, `0xFF`, `1.5f`, `2.5`, `7u8`,
//! `"text"`, `[1, 2, 3]`, `[]f64`, `null`.

use clap::{Parser, Subcommand};
use kvs::{Client, Value};

/// kvs CLI
#[derive(Parser, Debug)]
#[command(name = "kvs-cli")]
#[command(about = "CLI for the kvs key-value store")]
#[command(version)]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:1337")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Get a value by key
    Get {
        /// The key to get
        key: String,
    },

    /// Set a key to a value
    Set {
        /// The key to set
        key: String,

        /// The value, in text form
        #[arg(allow_hyphen_values = true)]
        value: Value,
    },

    /// Append a scalar or list to a list
    Push {
        key: String,

        /// The value, in text form
        #[arg(allow_hyphen_values = true)]
        value: Value,
    },

    /// Drop the last element of a list
    Pop { key: String },

    /// Sum of a list
    Sum { key: String },

    /// Largest element of a list
    Max { key: String },

    /// Smallest element of a list
    Min { key: String },

    /// Load a procedure library
    Source {
        /// Library path, e.g. /opt/kvs/libbackup.so
        path: String,
    },

    /// Run a loaded procedure
    Execute { name: String },
}

fn main() {
    let args = Args::parse();

    if let Err(e) = run(args) {
        eprintln!("kvs-cli: {}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> kvs::Result<()> {
    let mut client = Client::connect(&args.server)?;

    let reply = match &args.command {
        Commands::Get { key } => Some(client.get(key.as_bytes())?),
        Commands::Set { key, value } => {
            client.set(key.as_bytes(), value)?;
            None
        }
        Commands::Push { key, value } => {
            client.push(key.as_bytes(), value)?;
            None
        }
        Commands::Pop { key } => {
            client.pop(key.as_bytes())?;
            None
        }
        Commands::Sum { key } => Some(client.sum(key.as_bytes())?),
        Commands::Max { key } => Some(client.max(key.as_bytes())?),
        Commands::Min { key } => Some(client.min(key.as_bytes())?),
        Commands::Source { path } => {
            client.source(path)?;
            None
        }
        Commands::Execute { name } => {
            client.execute(name)?;
            None
        }
    };

    if let Some(value) = reply {
        println!("{}", value);
    }
    Ok(())
}
