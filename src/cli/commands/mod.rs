//! CLI command implementations
//!
//! Each command is implemented in its own submodule.

pub mod create;
pub mod devices;
pub mod doctor;
pub mod flash;

use anyhow::Result;
use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::core::settings::Settings;

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build the custom image, then offer to write it to a USB drive
    Create {
        /// Stop after building the image
        #[arg(long)]
        no_flash: bool,

        #[command(flatten)]
        paths: PathOverrides,
    },

    /// List removable USB disks
    Devices,

    /// Write an existing image to a USB drive
    Flash {
        /// Target device (must be a discovered USB disk)
        #[arg(short, long)]
        device: Option<String>,

        /// Image to write (defaults to the configured output)
        #[arg(short, long)]
        image: Option<PathBuf>,

        /// Skip the final confirmation when the device is the only candidate
        #[arg(short, long)]
        yes: bool,

        /// Stream the image in-process instead of running dd
        #[arg(long)]
        direct: bool,
    },

    /// Check host tools and input files
    Doctor,
}

/// Command-line overrides for `[paths]`
#[derive(Args, Debug, Default)]
pub struct PathOverrides {
    /// Stock netinst image
    #[arg(long, value_name = "ISO")]
    pub source: Option<PathBuf>,

    /// Extraction directory
    #[arg(long, value_name = "DIR")]
    pub workspace: Option<PathBuf>,

    /// Output image
    #[arg(short, long, value_name = "ISO")]
    pub output: Option<PathBuf>,

    /// Answer file to inject
    #[arg(long, value_name = "FILE")]
    pub preseed: Option<PathBuf>,

    /// Post-install provisioning config (JSON)
    #[arg(long, value_name = "FILE")]
    pub post_install: Option<PathBuf>,
}

impl PathOverrides {
    /// Apply the overrides on top of loaded settings
    pub fn apply(self, settings: &mut Settings) {
        let paths = &mut settings.paths;
        if let Some(source) = self.source {
            paths.source_iso = source;
        }
        if let Some(workspace) = self.workspace {
            paths.workspace = workspace;
        }
        if let Some(output) = self.output {
            paths.output = output;
        }
        if let Some(preseed) = self.preseed {
            paths.preseed = preseed;
        }
        if let Some(post_install) = self.post_install {
            paths.post_install_config = post_install;
        }
    }
}

impl Commands {
    /// Execute the command
    pub async fn run(self, mut settings: Settings) -> Result<()> {
        match self {
            Self::Create { no_flash, paths } => {
                paths.apply(&mut settings);
                create::execute(settings, no_flash).await
            }
            Self::Devices => devices::execute().await,
            Self::Flash {
                device,
                image,
                yes,
                direct,
            } => {
                let options = flash::FlashOptions {
                    device,
                    image,
                    yes,
                    direct,
                };
                flash::execute(settings, options).await
            }
            Self::Doctor => doctor::execute(&settings).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_replace_only_given_paths() {
        let mut settings = Settings::default();
        let overrides = PathOverrides {
            output: Some(PathBuf::from("out/auto.iso")),
            post_install: Some(PathBuf::from("provision.json")),
            ..PathOverrides::default()
        };

        overrides.apply(&mut settings);

        assert_eq!(settings.paths.output, PathBuf::from("out/auto.iso"));
        assert_eq!(
            settings.paths.post_install_config,
            PathBuf::from("provision.json")
        );
        assert_eq!(settings.paths.workspace, PathBuf::from("iso-extract"));
    }
}
