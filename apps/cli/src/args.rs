//! # CLI Argument Definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// The main CLI structure parsing command-line arguments.
#[derive(Debug, Parser)]
#[command(name = "stow")]
#[command(author = env!("CARGO_PKG_AUTHORS"))]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(arg_required_else_help = true)]
#[command(about = "Store untrusted uploads under sanitized, collision-free names")]
pub struct Cli {
    /// TOML configuration file, layered under `STOW__*` environment variables
    #[arg(short, long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Stream a file (or `-` for stdin) into the store and print the stored name
    Save {
        /// Source file, `-` reads stdin
        file: PathBuf,
        /// Upload name to sanitize instead of the source file name
        #[arg(short, long)]
        name: Option<String>,
    },
    /// Print how a file name would be sanitized
    Sanitize {
        name: String,
    },
}
