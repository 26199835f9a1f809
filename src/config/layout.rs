//! Workspace-relative paths of the Debian netinst image layout

/// ISOLINUX menu (legacy BIOS boot)
pub const ISOLINUX_CFG: &str = "isolinux/isolinux.cfg";

/// ISOLINUX boot-sector loader referenced by the El Torito catalog
pub const ISOLINUX_BIN: &str = "isolinux/isolinux.bin";

/// El Torito boot catalog written by the repackaging tool
pub const BOOT_CATALOG: &str = "isolinux/boot.cat";

/// GRUB menu (UEFI boot)
pub const GRUB_CFG: &str = "boot/grub/grub.cfg";

/// Embedded EFI system partition image
pub const EFI_IMAGE: &str = "boot/grub/efi.img";

/// Answer file name at the image root
pub const PRESEED: &str = "preseed.cfg";

/// Generated provisioning script at the image root
pub const POST_INSTALL_SCRIPT: &str = "post_install_setup.sh";
