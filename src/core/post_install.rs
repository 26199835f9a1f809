//! Post-install script generation
//!
//! Renders `post_install_setup.sh` from `post_install_config.json`:
//!
//! ```json
//! { "packages": ["curl", "vim"], "ssh_key": { "type": "rsa", "user": "admin" } }
//! ```
//!
//! `packages` defaults to an empty list, `ssh_key.type` to `ed25519` and
//! `ssh_key.user` to `user`. A missing or unparseable file is fatal; the
//! defaults are never substituted for a file that could not be read.

use regex::Regex;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use super::workspace::Workspace;
use crate::config::defaults;
use crate::error::{PipelineError, Stage};
use crate::infra::filesystem;

/// Mode of the generated script (rwxr-xr-x)
pub const SCRIPT_MODE: u32 = 0o755;

/// Key types ssh-keygen accepts for `-t`
pub const KEY_TYPES: &[&str] = &["rsa", "dsa", "ecdsa", "ed25519", "ecdsa-sk", "ed25519-sk"];

/// Post-install actions for the provisioned system
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProvisioningConfig {
    /// Packages to install, in order
    pub packages: Vec<String>,
    /// Key pair to generate
    pub ssh_key: SshKeySpec,
}

/// SSH key generation parameters
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SshKeySpec {
    /// Key algorithm
    #[serde(rename = "type")]
    pub algorithm: String,
    /// Owning user
    pub user: String,
}

impl Default for SshKeySpec {
    fn default() -> Self {
        Self {
            algorithm: defaults::SSH_KEY_TYPE.to_string(),
            user: defaults::SSH_KEY_USER.to_string(),
        }
    }
}

fn package_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[a-z0-9][a-z0-9+.-]+(:[a-z0-9-]+)?(=[A-Za-z0-9.+~:-]+)?$")
            .expect("package pattern is valid")
    })
}

fn user_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[a-z_][a-z0-9_-]{0,31}$").expect("user pattern is valid"))
}

impl ProvisioningConfig {
    /// Parse and validate JSON text
    pub fn from_json(content: &str) -> Result<Self, String> {
        let config: Self = serde_json::from_str(content).map_err(|e| e.to_string())?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a file
    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        if !path.is_file() {
            return Err(PipelineError::MissingInput {
                stage: Stage::PostInstall,
                what: "post-install config",
                path: path.to_path_buf(),
            });
        }

        let content = filesystem::read_file(path)
            .map_err(|e| PipelineError::filesystem(Stage::PostInstall, e))?;

        Self::from_json(&content).map_err(|error| PipelineError::MalformedInput {
            stage: Stage::PostInstall,
            what: "post-install config",
            path: path.to_path_buf(),
            error,
        })
    }

    /// Reject values that would not survive being spliced into a shell script
    pub fn validate(&self) -> Result<(), String> {
        if let Some(bad) = self
            .packages
            .iter()
            .find(|p| !package_pattern().is_match(p))
        {
            return Err(format!("invalid package name '{bad}'"));
        }
        if !KEY_TYPES.contains(&self.ssh_key.algorithm.as_str()) {
            return Err(format!(
                "unsupported ssh_key.type '{}' (expected one of {})",
                self.ssh_key.algorithm,
                KEY_TYPES.join(", ")
            ));
        }
        if !user_pattern().is_match(&self.ssh_key.user) {
            return Err(format!("invalid ssh_key.user '{}'", self.ssh_key.user));
        }
        Ok(())
    }
}

/// Render the provisioning script
pub fn render_script(config: &ProvisioningConfig) -> String {
    let user = &config.ssh_key.user;
    let algorithm = &config.ssh_key.algorithm;

    let mut install = String::from("apt-get install -y --no-install-recommends");
    for package in &config.packages {
        install.push(' ');
        install.push_str(package);
    }

    format!(
        r#"#!/bin/bash
set -e

# --- Install packages ---
apt-get update
{install}

# --- Generate SSH key ---
sudo -u {user} mkdir -p -m 700 /home/{user}/.ssh
sudo -u {user} ssh-keygen -t {algorithm} -f /home/{user}/.ssh/id_{algorithm} -N ""

# --- Clean up ---
apt-get clean
rm -rf /var/lib/apt/lists/*

echo "Post-installation setup complete."
"#
    )
}

/// Render the script into the workspace and mark it executable
pub fn write_script(
    config: &ProvisioningConfig,
    workspace: &Workspace,
) -> Result<PathBuf, PipelineError> {
    let path = workspace.post_install_script();
    filesystem::write_file(&path, &render_script(config))
        .map_err(|e| PipelineError::filesystem(Stage::PostInstall, e))?;
    filesystem::set_mode(&path, SCRIPT_MODE)
        .map_err(|e| PipelineError::filesystem(Stage::PostInstall, e))?;
    Ok(path)
}

/// Load the config at `config_path` and write the script into the workspace
pub fn generate_post_install_script(
    config_path: &Path,
    workspace: &Workspace,
) -> Result<PathBuf, PipelineError> {
    let config = ProvisioningConfig::load(config_path)?;
    tracing::info!(
        "Generating post-install script: {} package(s), {} key for '{}'",
        config.packages.len(),
        config.ssh_key.algorithm,
        config.ssh_key.user
    );
    write_script(&config, workspace)
}
