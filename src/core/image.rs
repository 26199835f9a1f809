//! Hybrid image repackaging
//!
//! Rebuilds the patched workspace into a single image that boots via legacy
//! BIOS (isohybrid MBR + El Torito catalog pointing at `isolinux.bin`), via
//! UEFI (alternate El Torito entry for the embedded `efi.img`), and that can
//! be written byte-for-byte to a USB stick (`-isohybrid-gpt-basdat`).

use std::path::Path;

use crate::config::layout;
use crate::core::settings::Settings;
use crate::core::workspace::Workspace;
use crate::error::{PipelineError, Stage};
use crate::infra::process::{run_checked, CommandRunner, CommandSpec};

/// Build the xorriso mkisofs-emulation command line
pub fn build_command(
    workspace: &Workspace,
    output: &Path,
    mbr_template: &Path,
    volume_id: Option<&str>,
) -> CommandSpec {
    let mut cmd = CommandSpec::new("xorriso").args(["-as", "mkisofs"]);
    if let Some(volume_id) = volume_id {
        cmd = cmd.arg("-V").arg(volume_id);
    }
    cmd.arg("-isohybrid-mbr")
        .path_arg(mbr_template)
        .args(["-c", layout::BOOT_CATALOG])
        .args(["-b", layout::ISOLINUX_BIN])
        .args(["-no-emul-boot", "-boot-load-size", "4", "-boot-info-table"])
        .arg("-eltorito-alt-boot")
        .args(["-e", layout::EFI_IMAGE])
        .arg("-no-emul-boot")
        .arg("-isohybrid-gpt-basdat")
        .arg("-o")
        .path_arg(output)
        .path_arg(workspace.root())
}

/// Repackage the workspace into the output image
pub fn build_image(
    runner: &dyn CommandRunner,
    workspace: &Workspace,
    settings: &Settings,
) -> Result<(), PipelineError> {
    let mbr = &settings.paths.isohybrid_mbr;
    if !mbr.is_file() {
        return Err(PipelineError::MissingInput {
            stage: Stage::Image,
            what: "isohybrid MBR template",
            path: mbr.clone(),
        });
    }

    for relative in [layout::ISOLINUX_BIN, layout::EFI_IMAGE] {
        let path = workspace.join(relative);
        if !path.is_file() {
            return Err(PipelineError::UnexpectedLayout {
                stage: Stage::Image,
                path,
            });
        }
    }

    let output = &settings.paths.output;
    tracing::info!("Repackaging {} into {}", workspace.root().display(), output.display());
    let cmd = build_command(workspace, output, mbr, settings.image.volume_id.as_deref());
    run_checked(runner, &cmd).map_err(|e| PipelineError::command(Stage::Image, e))?;

    Ok(())
}
