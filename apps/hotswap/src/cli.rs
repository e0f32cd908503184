//! Command line interface definition

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// hotswap - over-the-air updates for application bundles
#[derive(Parser)]
#[command(name = "hotswap")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Over-the-air update engine for application bundles")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Global arguments available for all commands
#[derive(Parser)]
pub struct GlobalArgs {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable debug logging and keep stale updates on disk
    #[arg(long, global = true)]
    pub debug: bool,

    /// Use alternate config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Application root holding the package store
    #[arg(long, global = true, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// App version of the running binary
    #[arg(long, global = true, env = "HOTSWAP_BINARY_VERSION")]
    pub app_version: Option<String>,

    /// Build marker of the running binary
    #[arg(long, global = true, env = "HOTSWAP_BUILD_MARKER", default_value_t = 0)]
    pub build_marker: u64,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Show the current, previous and pending packages
    Status,

    /// Download and stage the package described by a metadata file
    #[command(alias = "dl")]
    Download {
        /// Path to the package metadata JSON
        metadata: PathBuf,

        /// Entry file the package must contain
        #[arg(long, value_name = "NAME")]
        entry_file: Option<String>,

        /// Install the package once staged
        #[arg(long)]
        install: bool,
    },

    /// Make a staged package current
    Install {
        /// Hash of a downloaded package
        hash: String,
    },

    /// Signal that the running package started successfully
    Confirm,

    /// Roll back to the previous package
    Rollback,

    /// Remove every package and record
    Clear,

    /// List packages recorded as failed
    Failed,

    /// Print which entry file the host should load
    Entry {
        /// Entry file name inside the package
        #[arg(long, value_name = "NAME")]
        entry_file: Option<String>,
    },
}

impl Commands {
    /// Name used in operation events
    pub fn name(&self) -> &'static str {
        match self {
            Commands::Status => "status",
            Commands::Download { .. } => "download",
            Commands::Install { .. } => "install",
            Commands::Confirm => "confirm",
            Commands::Rollback => "rollback",
            Commands::Clear => "clear",
            Commands::Failed => "failed",
            Commands::Entry { .. } => "entry",
        }
    }
}
