//! Output formatting and progress indicators
//!
//! This module provides utilities for displaying progress bars,
//! status messages and errors to the user. The `--quiet` and `--json`
//! flags are applied once in `main` and consulted through [`is_quiet`]
//! and [`is_json`].

use indicatif::{ProgressBar, ProgressStyle};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{PipelineError, ProvisionError, SettingsError};

static QUIET: AtomicBool = AtomicBool::new(false);
static JSON: AtomicBool = AtomicBool::new(false);

/// Output settings chosen on the command line
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputConfig {
    /// Suppress everything but errors
    pub quiet: bool,
    /// Machine-readable output
    pub json: bool,
    /// Verbosity level
    pub verbose: u8,
}

impl OutputConfig {
    /// Create output settings
    pub fn new(quiet: bool, json: bool, verbose: u8) -> Self {
        Self {
            quiet,
            json,
            verbose,
        }
    }

    /// Make these settings visible to every command
    pub fn apply_global(self) {
        QUIET.store(self.quiet, Ordering::Relaxed);
        JSON.store(self.json, Ordering::Relaxed);
    }

    /// Default log level for the verbosity count
    pub fn log_level(self) -> tracing::Level {
        match self.verbose {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            _ => tracing::Level::DEBUG,
        }
    }
}

/// Whether non-error output is suppressed
pub fn is_quiet() -> bool {
    QUIET.load(Ordering::Relaxed)
}

/// Whether results are printed as JSON
pub fn is_json() -> bool {
    JSON.load(Ordering::Relaxed)
}

fn is_silent() -> bool {
    is_quiet() || is_json()
}

/// Print a success line
pub fn print_success(message: &str) {
    if !is_silent() {
        println!("{} {message}", status::SUCCESS);
    }
}

/// Print an informational line
pub fn print_info(message: &str) {
    if !is_silent() {
        println!("{} {message}", status::INFO);
    }
}

/// Print a warning line (stderr)
pub fn print_warning(message: &str) {
    if !is_silent() {
        eprintln!("{} {message}", status::WARNING);
    }
}

/// Print an indented detail line
pub fn print_detail(message: &str) {
    if !is_silent() {
        println!("  {message}");
    }
}

/// Suggested next step for well-known failures
pub fn suggestion_for(error: &anyhow::Error) -> Option<&'static str> {
    for cause in error.chain() {
        if let Some(e) = cause.downcast_ref::<PipelineError>() {
            return match e {
                PipelineError::MissingInput { .. } => {
                    Some("Supply the missing file (or point isoforge.toml at it) and re-run.")
                }
                PipelineError::UnexpectedLayout { .. } => {
                    Some("Check that the source image is a Debian netinst image.")
                }
                PipelineError::MissingTool { .. } => Some("Run 'isoforge doctor' for details."),
                _ => None,
            };
        }
        if let Some(e) = cause.downcast_ref::<ProvisionError>() {
            return match e {
                ProvisionError::NotACandidate { .. } => {
                    Some("Run 'isoforge devices' to list removable disks.")
                }
                ProvisionError::MissingImage { .. } => {
                    Some("Run 'isoforge create' first or pass --image.")
                }
                _ => None,
            };
        }
        if cause.downcast_ref::<SettingsError>().is_some() {
            return Some("Fix isoforge.toml or pass --config with a valid file.");
        }
    }
    None
}

/// Print a fatal error, causes not already part of its message, and a
/// suggestion
pub fn display_error(error: &anyhow::Error) {
    let mut shown = error.to_string();
    eprintln!("{} Error: {shown}", status::ERROR);
    for cause in error.chain().skip(1) {
        let text = cause.to_string();
        if !shown.contains(&text) {
            eprintln!("  Caused by: {text}");
        }
        shown = text;
    }
    if let Some(suggestion) = suggestion_for(error) {
        eprintln!("  Suggestion: {suggestion}");
    }
}

/// Create a spinner for operations with unknown duration
pub fn create_spinner(message: &str) -> ProgressBar {
    if is_silent() {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
            .template("{spinner:.blue} {msg}")
            .expect("Invalid spinner template"),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(80));
    pb
}

/// Create a progress bar for device writes
pub fn create_write_bar(total: u64) -> ProgressBar {
    if is_silent() {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})")
            .expect("Invalid progress bar template")
            .progress_chars("█▓▒░"),
    );
    pb
}

/// Status message prefixes
pub mod status {
    /// Success prefix (green checkmark)
    pub const SUCCESS: &str = "✓";

    /// Error prefix (red X)
    pub const ERROR: &str = "✗";

    /// Warning prefix (yellow triangle)
    pub const WARNING: &str = "⚠";

    /// Info prefix (blue circle)
    pub const INFO: &str = "ℹ";
}
