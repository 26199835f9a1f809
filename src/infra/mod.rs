//! Infrastructure layer
//!
//! Handles all side effects: external processes, the filesystem and
//! operator prompts.

pub mod filesystem;
pub mod process;
pub mod prompt;
