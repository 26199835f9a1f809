//! Command-line interface module
//!
//! This module handles argument parsing and output formatting.
//! It contains no business logic - that belongs in the [`crate::core`] module.

pub mod commands;
pub mod output;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};

use crate::core::settings::Settings;
use commands::Commands;

/// Isoforge - unattended Debian installer images
///
/// Turns a stock Debian netinst image into a self-installing hybrid image
/// and optionally writes it to a USB drive.
#[derive(Parser, Debug)]
#[command(name = "isoforge")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output in JSON format for scripting
    #[arg(long, global = true)]
    pub json: bool,

    /// Settings file (defaults to ./isoforge.toml when present)
    #[arg(long, global = true, env = "ISOFORGE_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Execute the CLI command
    pub async fn run(self) -> Result<()> {
        if let Some(cmd) = self.command {
            let current_dir = std::env::current_dir()?;
            let settings = load_settings(&current_dir, self.config.as_deref())?;
            cmd.run(settings).await
        } else {
            // No subcommand provided, show help
            use clap::CommandFactory;
            let mut cmd = Self::command();
            cmd.print_help()?;
            Ok(())
        }
    }
}

/// Resolve settings from an explicit file or the working directory
pub fn load_settings(dir: &Path, explicit: Option<&Path>) -> Result<Settings> {
    match explicit {
        Some(path) => Settings::load_from_path(path)
            .with_context(|| format!("Could not load settings from {}", path.display())),
        None => Settings::load(dir).context("Could not load isoforge.toml"),
    }
}
