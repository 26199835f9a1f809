//! Workspace extraction
//!
//! Unpacks the source image's filesystem tree into a working directory with
//! xorriso. The workspace is created when absent and never cleared; it is
//! left in place after the build for the operator to inspect or remove.

use std::path::{Path, PathBuf};

use crate::config::layout;
use crate::error::{PipelineError, Stage};
use crate::infra::filesystem;
use crate::infra::process::{run_checked, CommandRunner, CommandSpec};

/// The extracted, mutable image tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Wrap an existing or future workspace directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Workspace root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a workspace-relative path
    pub fn join(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    /// ISOLINUX menu
    pub fn isolinux_cfg(&self) -> PathBuf {
        self.join(layout::ISOLINUX_CFG)
    }

    /// GRUB menu
    pub fn grub_cfg(&self) -> PathBuf {
        self.join(layout::GRUB_CFG)
    }

    /// Injected answer file
    pub fn preseed(&self) -> PathBuf {
        self.join(layout::PRESEED)
    }

    /// Generated post-install script
    pub fn post_install_script(&self) -> PathBuf {
        self.join(layout::POST_INSTALL_SCRIPT)
    }
}

/// Build the xorriso invocation that extracts `image` into `workspace`
pub fn extract_command(image: &Path, workspace: &Workspace) -> CommandSpec {
    CommandSpec::new("xorriso")
        .args(["-osirrox", "on", "-indev"])
        .path_arg(image)
        .args(["-extract", "/"])
        .path_arg(workspace.root())
}

/// Extract the source image into the workspace
///
/// Files come out of the image read-only; the owner-write bit is added to
/// the whole tree afterwards so the following stages can patch them.
pub fn extract_image(
    runner: &dyn CommandRunner,
    image: &Path,
    workspace: &Workspace,
) -> Result<(), PipelineError> {
    if !image.is_file() {
        return Err(PipelineError::MissingInput {
            stage: Stage::Extract,
            what: "source image",
            path: image.to_path_buf(),
        });
    }

    filesystem::create_dir_all(workspace.root())
        .map_err(|e| PipelineError::filesystem(Stage::Extract, e))?;

    tracing::info!(
        "Extracting {} into {}",
        image.display(),
        workspace.root().display()
    );
    run_checked(runner, &extract_command(image, workspace))
        .map_err(|e| PipelineError::command(Stage::Extract, e))?;

    let entries = filesystem::make_tree_writable(workspace.root())
        .map_err(|e| PipelineError::filesystem(Stage::Extract, e))?;
    tracing::debug!("Workspace holds {entries} entries");

    Ok(())
}
