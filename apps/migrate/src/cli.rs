//! Command-line interface.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "docferry", version, about = "Migrate Dropbox folders into Clio matters")]
pub struct Cli {
    /// Configuration file (defaults to the platform config directory).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Migrate every case listed in the mapping file.
    Migrate {
        /// Mapping file overriding `mapping_path` from the config.
        #[arg(long)]
        mapping: Option<PathBuf>,

        /// Start immediately, even during peak hours.
        #[arg(long)]
        ignore_schedule: bool,
    },
    /// Show per-case progress recorded in the checkpoint.
    Status,
}
