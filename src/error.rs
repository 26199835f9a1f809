//! Error types for isoforge
//!
//! Domain-specific error types using thiserror. Every pipeline and
//! provisioning error names the [`Stage`] it came from together with the
//! concrete path or command line involved.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Pipeline and provisioning stages, used to label failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Host tool and template checks
    Prerequisites,
    /// Unpacking the source image into the workspace
    Extract,
    /// Copying the answer file into the workspace
    AnswerFile,
    /// Rendering the post-install script
    PostInstall,
    /// Patching ISOLINUX and GRUB menus
    Bootloader,
    /// Repackaging the workspace into a hybrid image
    Image,
    /// Enumerating removable devices
    Discover,
    /// Unmounting the target device
    Unmount,
    /// Writing the image to the target device
    Write,
    /// Ejecting the target device
    Eject,
}

impl Stage {
    /// Short machine-friendly name
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Prerequisites => "prerequisites",
            Self::Extract => "extract",
            Self::AnswerFile => "answer-file",
            Self::PostInstall => "post-install",
            Self::Bootloader => "bootloader",
            Self::Image => "image",
            Self::Discover => "discover",
            Self::Unmount => "unmount",
            Self::Write => "write",
            Self::Eject => "eject",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Filesystem errors
#[derive(Error, Debug)]
pub enum FilesystemError {
    /// Failed to create directory
    #[error("Failed to create directory '{path}': {error}")]
    CreateDir { path: PathBuf, error: String },

    /// Failed to write file
    #[error("Failed to write file '{path}': {error}")]
    WriteFile { path: PathBuf, error: String },

    /// Failed to read file
    #[error("Failed to read file '{path}': {error}")]
    ReadFile { path: PathBuf, error: String },

    /// Failed to copy file
    #[error("Failed to copy '{from}' to '{to}': {error}")]
    CopyFile {
        from: PathBuf,
        to: PathBuf,
        error: String,
    },

    /// Failed to change permissions
    #[error("Failed to set permissions on '{path}': {error}")]
    Permissions { path: PathBuf, error: String },
}

/// External command errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Program is not installed
    #[error("'{tool}' is not installed or not in PATH")]
    NotFound { tool: String },

    /// Program could not be started
    #[error("Failed to run `{command}`: {error}")]
    Spawn { command: String, error: String },

    /// Program exited unsuccessfully
    #[error("`{command}` exited with {status}: {stderr}")]
    Failed {
        command: String,
        status: String,
        stderr: String,
    },
}

/// Settings file errors
#[derive(Error, Debug)]
pub enum SettingsError {
    /// Explicitly requested settings file does not exist
    #[error("Settings file not found at '{path}'")]
    NotFound { path: PathBuf },

    /// Failed to read settings file
    #[error("Failed to read settings file '{path}': {error}")]
    Read { path: PathBuf, error: String },

    /// Failed to parse settings file
    #[error("Failed to parse settings file '{path}': {error}")]
    Parse { path: PathBuf, error: String },

    /// A setting has an unusable value
    #[error("Invalid setting '{field}': {message}")]
    Invalid { field: String, message: String },
}

/// Image build pipeline errors
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Required host tool is missing
    #[error("[{stage}] Required tool '{tool}' is not installed. {suggestion}")]
    MissingTool {
        stage: Stage,
        tool: String,
        suggestion: String,
    },

    /// Required input file is missing
    #[error("[{stage}] Required input missing: {what} not found at '{path}'")]
    MissingInput {
        stage: Stage,
        what: &'static str,
        path: PathBuf,
    },

    /// Structured input could not be parsed or validated
    #[error("[{stage}] Malformed {what} '{path}': {error}")]
    MalformedInput {
        stage: Stage,
        what: &'static str,
        path: PathBuf,
        error: String,
    },

    /// External tool failed
    #[error("[{stage}] {source}")]
    Command {
        stage: Stage,
        #[source]
        source: CommandError,
    },

    /// Workspace does not look like a Debian netinst tree
    #[error("[{stage}] Unexpected workspace layout: '{path}' not found")]
    UnexpectedLayout { stage: Stage, path: PathBuf },

    /// Filesystem operation failed
    #[error("[{stage}] {source}")]
    Filesystem {
        stage: Stage,
        #[source]
        source: FilesystemError,
    },
}

impl PipelineError {
    /// Stage that failed
    pub fn stage(&self) -> Stage {
        match self {
            Self::MissingTool { stage, .. }
            | Self::MissingInput { stage, .. }
            | Self::MalformedInput { stage, .. }
            | Self::Command { stage, .. }
            | Self::UnexpectedLayout { stage, .. }
            | Self::Filesystem { stage, .. } => *stage,
        }
    }

    pub(crate) fn command(stage: Stage, source: CommandError) -> Self {
        Self::Command { stage, source }
    }

    pub(crate) fn filesystem(stage: Stage, source: FilesystemError) -> Self {
        Self::Filesystem { stage, source }
    }
}

/// Removable media provisioning errors
#[derive(Error, Debug)]
pub enum ProvisionError {
    /// Image to flash does not exist
    #[error("[{stage}] Required input missing: image not found at '{path}'")]
    MissingImage { stage: Stage, path: PathBuf },

    /// Requested device is not a removable whole-disk candidate
    #[error("Device '{device}' is not a removable USB disk. Candidates: {candidates}")]
    NotACandidate { device: String, candidates: String },

    /// Interactive prompt failed
    #[error("Failed to read confirmation: {error}")]
    Prompt { error: String },

    /// External tool failed
    #[error("[{stage}] {source}")]
    Command {
        stage: Stage,
        #[source]
        source: CommandError,
    },

    /// Direct write failed
    #[error("[{stage}] Failed writing to '{device}' after {written} bytes: {error}")]
    Write {
        stage: Stage,
        device: String,
        written: u64,
        error: String,
    },

    /// Direct write was interrupted between chunks
    #[error("[{stage}] Write to '{device}' interrupted after {written} bytes")]
    Interrupted {
        stage: Stage,
        device: String,
        written: u64,
    },

    /// Settings could not be used
    #[error(transparent)]
    Settings(#[from] SettingsError),
}

/// Top-level isoforge error type
#[derive(Error, Debug)]
pub enum IsoforgeError {
    /// Settings error
    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    /// Pipeline error
    #[error("Build failed: {0}")]
    Pipeline(#[from] PipelineError),

    /// Provisioning error
    #[error("Flash failed: {0}")]
    Provision(#[from] ProvisionError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_names() {
        assert_eq!(Stage::AnswerFile.to_string(), "answer-file");
        assert_eq!(Stage::PostInstall.to_string(), "post-install");
        assert_eq!(Stage::Write.as_str(), "write");
    }

    #[test]
    fn test_missing_input_names_stage_and_path() {
        let err = PipelineError::MissingInput {
            stage: Stage::PostInstall,
            what: "post-install config",
            path: PathBuf::from("post_install_config.json"),
        };
        let message = err.to_string();
        assert!(message.contains("[post-install]"));
        assert!(message.contains("Required input missing"));
        assert!(message.contains("post_install_config.json"));
        assert_eq!(err.stage(), Stage::PostInstall);
    }

    #[test]
    fn test_command_error_names_command() {
        let err = PipelineError::command(
            Stage::Image,
            CommandError::Failed {
                command: "xorriso -as mkisofs".to_string(),
                status: "status 5".to_string(),
                stderr: "cannot open isohdpfx.bin".to_string(),
            },
        );
        let message = err.to_string();
        assert!(message.starts_with("[image]"));
        assert!(message.contains("xorriso -as mkisofs"));
        assert!(message.contains("isohdpfx.bin"));
    }
}
