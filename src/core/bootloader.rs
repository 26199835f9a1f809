//! Bootloader menu patching
//!
//! Makes the image boot straight into an unattended install under both
//! firmware models. For ISOLINUX (legacy BIOS) and GRUB (UEFI) a short
//! timeout and a new default entry are placed *before* the original menu
//! text, which is kept byte-for-byte. Interrupting the timeout still reaches
//! every stock menu entry.

use crate::core::settings::BootSettings;
use crate::core::workspace::Workspace;
use crate::error::{PipelineError, Stage};
use crate::infra::filesystem;

/// ISOLINUX label of the new default entry
pub const ISOLINUX_LABEL: &str = "autoinstall";

/// GRUB title of the new default entry
pub const GRUB_ENTRY_TITLE: &str = "Automated Unattended Install";

/// Kernel command line requesting a quiet, fully automatic install
pub fn kernel_parameters(boot: &BootSettings) -> String {
    format!(
        "--- quiet auto=true priority=critical preseed/file={}",
        boot.preseed_path
    )
}

/// Header prepended to `isolinux.cfg`
pub fn isolinux_stanza(boot: &BootSettings) -> String {
    format!(
        "TIMEOUT {timeout}\n\
         DEFAULT {label}\n\
         LABEL {label}\n    \
         MENU LABEL Automated Install\n    \
         KERNEL {kernel}\n    \
         APPEND initrd={initrd} {params}\n",
        timeout = boot.isolinux_timeout,
        label = ISOLINUX_LABEL,
        kernel = boot.kernel,
        initrd = boot.initrd,
        params = kernel_parameters(boot),
    )
}

/// Header prepended to `grub.cfg`; entry zero is the new one
pub fn grub_stanza(boot: &BootSettings) -> String {
    format!(
        "set timeout={timeout}\n\
         set default=\"0\"\n\
         \n\
         menuentry '{title}' --class auto {{\n    \
         linux    {kernel} {params}\n    \
         initrd   {initrd}\n\
         }}\n\
         \n",
        timeout = boot.grub_timeout,
        title = GRUB_ENTRY_TITLE,
        kernel = boot.kernel,
        initrd = boot.initrd,
        params = kernel_parameters(boot),
    )
}

/// Prepend the autoinstall entry to an ISOLINUX menu
pub fn patch_isolinux(original: &str, boot: &BootSettings) -> String {
    let mut patched = isolinux_stanza(boot);
    patched.push_str(original);
    patched
}

/// Prepend the autoinstall entry to a GRUB menu
pub fn patch_grub(original: &str, boot: &BootSettings) -> String {
    let mut patched = grub_stanza(boot);
    patched.push_str(original);
    patched
}

/// Patch both menus inside the workspace
///
/// Both files are read before either is written, so a missing GRUB menu
/// leaves the ISOLINUX menu untouched.
pub fn patch_bootloaders(workspace: &Workspace, boot: &BootSettings) -> Result<(), PipelineError> {
    let isolinux_path = workspace.isolinux_cfg();
    let grub_path = workspace.grub_cfg();

    for path in [&isolinux_path, &grub_path] {
        if !path.is_file() {
            return Err(PipelineError::UnexpectedLayout {
                stage: Stage::Bootloader,
                path: path.clone(),
            });
        }
    }

    let isolinux = filesystem::read_file(&isolinux_path)
        .map_err(|e| PipelineError::filesystem(Stage::Bootloader, e))?;
    let grub = filesystem::read_file(&grub_path)
        .map_err(|e| PipelineError::filesystem(Stage::Bootloader, e))?;

    filesystem::write_file(&isolinux_path, &patch_isolinux(&isolinux, boot))
        .map_err(|e| PipelineError::filesystem(Stage::Bootloader, e))?;
    filesystem::write_file(&grub_path, &patch_grub(&grub, boot))
        .map_err(|e| PipelineError::filesystem(Stage::Bootloader, e))?;

    tracing::info!("Patched ISOLINUX and GRUB menus for unattended install");
    Ok(())
}
