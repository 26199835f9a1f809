//! Default configuration values

/// Settings file looked up in the working directory
pub const SETTINGS_FILE: &str = "isoforge.toml";

/// Source netinst image
pub const SOURCE_ISO: &str = "debian-13.0.0-amd64-netinst.iso";

/// Directory the source image is extracted into
pub const WORKSPACE_DIR: &str = "iso-extract";

/// Repackaged output image
pub const CUSTOM_ISO: &str = "custom-debian-13.iso";

/// Operator-authored answer file
pub const PRESEED_FILE: &str = "preseed.cfg";

/// Post-install provisioning description
pub const POST_INSTALL_CONFIG: &str = "post_install_config.json";

/// Hybrid MBR template shipped by the isolinux package
pub const ISOHYBRID_MBR: &str = "/usr/lib/ISOLINUX/isohdpfx.bin";

/// Installer kernel, as seen from the booted medium
pub const INSTALLER_KERNEL: &str = "/install.amd/vmlinuz";

/// Installer initrd, as seen from the booted medium
pub const INSTALLER_INITRD: &str = "/install.amd/initrd.gz";

/// Answer file location, as seen by the running installer
pub const INSTALLER_PRESEED: &str = "/cdrom/preseed.cfg";

/// ISOLINUX menu timeout in tenths of a second
pub const ISOLINUX_TIMEOUT: u32 = 10;

/// GRUB menu timeout in seconds
pub const GRUB_TIMEOUT: u32 = 1;

/// Block size used when writing to removable media
pub const FLASH_BLOCK_SIZE: &str = "4M";

/// Default SSH key algorithm for the provisioned user
pub const SSH_KEY_TYPE: &str = "ed25519";

/// Default owner of the generated SSH key
pub const SSH_KEY_USER: &str = "user";
