//! WeftDB CLI
//!
//! Command-line tools for WeftDB database directories.
//!
//! # Commands
//!
//! - `inspect` - Display database statistics and per-collection usage
//! - `collections` - List named collections
//! - `get` / `put` / `del` - Point operations on one key
//! - `scan` - List keys in a range
//! - `control` - Send a raw control request

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// WeftDB command-line database tools.
#[derive(Parser)]
#[command(name = "weftdb")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the database directory
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display database statistics and per-collection usage
    Inspect,

    /// List named collections
    Collections,

    /// Read one key
    Get {
        /// Collection name; omit for the main collection
        #[arg(short, long, default_value = "")]
        collection: String,

        /// The key to read
        key: i64,
    },

    /// Write one key
    Put {
        /// Collection name; omit for the main collection
        #[arg(short, long, default_value = "")]
        collection: String,

        /// Create the collection if it doesn't exist
        #[arg(long)]
        create: bool,

        /// The key to write
        key: i64,

        /// The value, taken as UTF-8 bytes
        value: String,
    },

    /// Delete one key
    Del {
        /// Collection name; omit for the main collection
        #[arg(short, long, default_value = "")]
        collection: String,

        /// The key to delete
        key: i64,
    },

    /// List keys in a range
    Scan {
        /// Collection name; omit for the main collection
        #[arg(short, long, default_value = "")]
        collection: String,

        /// Inclusive start key
        #[arg(long, default_value_t = i64::MIN)]
        start: i64,

        /// Exclusive end key
        #[arg(long, default_value_t = i64::MAX)]
        end: i64,

        /// Maximum keys to list
        #[arg(short, long, default_value_t = 100)]
        limit: u32,
    },

    /// Send a raw control request (clear, reset, compact, info, usage)
    Control {
        /// The request string
        request: String,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let path = || cli.path.clone().ok_or("Database path required (-p <dir>)");

    match &cli.command {
        Commands::Inspect => commands::inspect(&path()?)?,
        Commands::Collections => commands::collections(&path()?)?,
        Commands::Get { collection, key } => commands::get(&path()?, collection, *key)?,
        Commands::Put {
            collection,
            create,
            key,
            value,
        } => commands::put(&path()?, collection, *create, *key, value)?,
        Commands::Del { collection, key } => commands::del(&path()?, collection, *key)?,
        Commands::Scan {
            collection,
            start,
            end,
            limit,
        } => commands::scan(&path()?, collection, *start, *end, *limit)?,
        Commands::Control { request } => commands::control(&path()?, request)?,
        Commands::Version => {
            println!("WeftDB CLI v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
