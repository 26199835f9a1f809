//! Isoforge - unattended Debian installer images
//!
//! This library turns a stock Debian netinst image into a hybrid image that
//! installs itself without interaction, and writes that image to USB media.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`cli`] - Command-line interface parsing and output formatting
//! - [`core`] - Build stages, device provisioning and host checks
//! - [`infra`] - Infrastructure layer (processes, filesystem, prompts)
//! - [`config`] - Constants and workspace layout
//! - [`error`] - Error types and handling

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod infra;

#[cfg(test)]
pub mod test_utils;
