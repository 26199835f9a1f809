//! Build settings
//!
//! Reads the optional `isoforge.toml` from the working directory. Settings
//! cover input/output paths, installer boot parameters, image metadata and
//! flashing behaviour. The resolved [`Settings`] value is handed to every
//! stage explicitly.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::defaults;
use crate::error::SettingsError;

/// All settings for a build and flash run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Input and output locations
    pub paths: PathSettings,

    /// Installer boot parameters
    pub boot: BootSettings,

    /// Output image metadata
    pub image: ImageSettings,

    /// Removable media writing
    pub flash: FlashSettings,
}

/// Input and output locations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathSettings {
    /// Stock netinst image
    pub source_iso: PathBuf,
    /// Extraction directory
    pub workspace: PathBuf,
    /// Repackaged image
    pub output: PathBuf,
    /// Answer file to inject
    pub preseed: PathBuf,
    /// Post-install provisioning description (JSON)
    pub post_install_config: PathBuf,
    /// Hybrid MBR template
    pub isohybrid_mbr: PathBuf,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            source_iso: PathBuf::from(defaults::SOURCE_ISO),
            workspace: PathBuf::from(defaults::WORKSPACE_DIR),
            output: PathBuf::from(defaults::CUSTOM_ISO),
            preseed: PathBuf::from(defaults::PRESEED_FILE),
            post_install_config: PathBuf::from(defaults::POST_INSTALL_CONFIG),
            isohybrid_mbr: PathBuf::from(defaults::ISOHYBRID_MBR),
        }
    }
}

/// Installer boot parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BootSettings {
    /// Installer kernel path on the medium
    pub kernel: String,
    /// Installer initrd path on the medium
    pub initrd: String,
    /// Answer file path as seen by the installer
    pub preseed_path: String,
    /// ISOLINUX timeout in tenths of a second
    pub isolinux_timeout: u32,
    /// GRUB timeout in seconds
    pub grub_timeout: u32,
}

impl Default for BootSettings {
    fn default() -> Self {
        Self {
            kernel: defaults::INSTALLER_KERNEL.to_string(),
            initrd: defaults::INSTALLER_INITRD.to_string(),
            preseed_path: defaults::INSTALLER_PRESEED.to_string(),
            isolinux_timeout: defaults::ISOLINUX_TIMEOUT,
            grub_timeout: defaults::GRUB_TIMEOUT,
        }
    }
}

/// Output image metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImageSettings {
    /// Volume label of the output image
    pub volume_id: Option<String>,
}

/// How the image reaches the device
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteMethod {
    /// Raw block copy with `dd`
    #[default]
    Dd,
    /// In-process streaming copy
    Direct,
}

/// Removable media writing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FlashSettings {
    /// Copy block size (`512`, `64K`, `4M`, `1G`)
    pub block_size: String,
    /// Prefix privileged commands with sudo
    pub use_sudo: bool,
    /// Write method
    pub method: WriteMethod,
}

impl Default for FlashSettings {
    fn default() -> Self {
        Self {
            block_size: defaults::FLASH_BLOCK_SIZE.to_string(),
            use_sudo: true,
            method: WriteMethod::Dd,
        }
    }
}

impl FlashSettings {
    /// Block size in bytes
    pub fn block_size_bytes(&self) -> Result<usize, SettingsError> {
        parse_block_size(&self.block_size)
    }
}

impl Settings {
    /// Load settings from the default file in `dir`
    ///
    /// A missing file yields the defaults.
    pub fn load(dir: &Path) -> Result<Self, SettingsError> {
        let path = dir.join(defaults::SETTINGS_FILE);
        if !path.exists() {
            tracing::debug!("No {} found, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load_from_path(&path)
    }

    /// Load settings from an explicit file, which must exist
    pub fn load_from_path(path: &Path) -> Result<Self, SettingsError> {
        if !path.exists() {
            return Err(SettingsError::NotFound {
                path: path.to_path_buf(),
            });
        }

        let content = fs::read_to_string(path).map_err(|e| SettingsError::Read {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let settings: Self = toml::from_str(&content).map_err(|e| SettingsError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;
        settings.validate()?;
        Ok(settings)
    }

    /// Check values that deserialize fine but cannot be used
    pub fn validate(&self) -> Result<(), SettingsError> {
        self.flash.block_size_bytes()?;

        if self.boot.isolinux_timeout == 0 {
            return Err(SettingsError::Invalid {
                field: "boot.isolinux_timeout".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        if self.boot.grub_timeout == 0 {
            return Err(SettingsError::Invalid {
                field: "boot.grub_timeout".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        if let Some(volume_id) = &self.image.volume_id {
            if volume_id.is_empty() || volume_id.len() > 32 {
                return Err(SettingsError::Invalid {
                    field: "image.volume_id".to_string(),
                    message: "must be 1 to 32 characters".to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Parse a dd-style block size such as `4M`
pub fn parse_block_size(value: &str) -> Result<usize, SettingsError> {
    let invalid = || SettingsError::Invalid {
        field: "flash.block_size".to_string(),
        message: format!("'{value}' is not a size like 512, 64K, 4M or 1G"),
    };

    let value = value.trim();
    let (digits, multiplier) = match value.char_indices().last() {
        Some((idx, 'K' | 'k')) => (&value[..idx], 1024),
        Some((idx, 'M' | 'm')) => (&value[..idx], 1024 * 1024),
        Some((idx, 'G' | 'g')) => (&value[..idx], 1024 * 1024 * 1024),
        _ => (value, 1),
    };

    let count: usize = digits.parse().map_err(|_| invalid())?;
    match count.checked_mul(multiplier) {
        Some(0) | None => Err(invalid()),
        Some(bytes) => Ok(bytes),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_match_stock_layout() {
        let settings = Settings::default();
        assert_eq!(
            settings.paths.source_iso,
            PathBuf::from("debian-13.0.0-amd64-netinst.iso")
        );
        assert_eq!(settings.paths.workspace, PathBuf::from("iso-extract"));
        assert_eq!(settings.paths.output, PathBuf::from("custom-debian-13.iso"));
        assert_eq!(settings.boot.isolinux_timeout, 10);
        assert_eq!(settings.boot.grub_timeout, 1);
        assert_eq!(settings.flash.method, WriteMethod::Dd);
        assert!(settings.flash.use_sudo);
    }

    #[test]
    fn test_load_missing_file_returns_default() {
        let temp_dir = TempDir::new().unwrap();
        let settings = Settings::load(temp_dir.path()).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_load_from_explicit_missing_path_errors() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("custom.toml");
        let err = Settings::load_from_path(&path).unwrap_err();
        assert!(matches!(err, SettingsError::NotFound { .. }));
    }

    #[test]
    fn test_load_partial_config() {
        let temp_dir = TempDir::new().unwrap();
        let content = r#"
[paths]
source_iso = "debian-12.5.0-amd64-netinst.iso"

[flash]
method = "direct"
use_sudo = false
"#;
        fs::write(temp_dir.path().join("isoforge.toml"), content).unwrap();

        let settings = Settings::load(temp_dir.path()).unwrap();
        assert_eq!(
            settings.paths.source_iso,
            PathBuf::from("debian-12.5.0-amd64-netinst.iso")
        );
        assert_eq!(settings.paths.workspace, PathBuf::from("iso-extract"));
        assert_eq!(settings.flash.method, WriteMethod::Direct);
        assert!(!settings.flash.use_sudo);
        assert_eq!(settings.flash.block_size, "4M");
    }

    #[test]
    fn test_unknown_key_rejected() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join("isoforge.toml"),
            "[paths]\nsource = \"x.iso\"\n",
        )
        .unwrap();
        let err = Settings::load(temp_dir.path()).unwrap_err();
        assert!(matches!(err, SettingsError::Parse { .. }));
    }

    #[test]
    fn test_invalid_toml_returns_error() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("isoforge.toml"), "invalid toml [[[").unwrap();
        assert!(Settings::load(temp_dir.path()).is_err());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut settings = Settings::default();
        settings.boot.grub_timeout = 0;
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("boot.grub_timeout"));
    }

    #[test]
    fn test_parse_block_size() {
        assert_eq!(parse_block_size("512").unwrap(), 512);
        assert_eq!(parse_block_size("64K").unwrap(), 64 * 1024);
        assert_eq!(parse_block_size("4M").unwrap(), 4 * 1024 * 1024);
        assert_eq!(parse_block_size("1g").unwrap(), 1024 * 1024 * 1024);
        assert!(parse_block_size("0").is_err());
        assert!(parse_block_size("M").is_err());
        assert!(parse_block_size("4X").is_err());
        assert!(parse_block_size("").is_err());
    }
}
