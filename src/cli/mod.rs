//! CLI commands for nova-ext.
//!
//! Operator tooling: list installed extensions, validate a manifest.

pub mod list;
pub mod validate;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::RuntimeConfig;
use crate::logging;

#[derive(Parser)]
#[command(name = "nova-ext")]
#[command(about = "Inspect and validate Nova extensions", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List installed extensions and their capabilities
    List {
        /// Extensions directory (default: from config)
        #[arg(long, value_name = "DIR")]
        dir: Option<PathBuf>,
    },

    /// Load and validate one extension's manifest
    Validate {
        /// Path to extension directory
        #[arg(default_value = ".")]
        path: PathBuf,
    },
}

/// Parse arguments and run the selected command.
pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = RuntimeConfig::load();
    logging::init(cli.debug || config.debug);

    match cli.command {
        Commands::List { dir } => list::run_list(&config, dir),
        Commands::Validate { path } => validate::run_validate(&path),
    }
}
