//! Removable device discovery
//!
//! Enumerates block devices with `lsblk` and keeps USB whole disks.
//! Provisioning is optional, so discovery never fails: a missing tool, a
//! nonzero exit or unparseable output all yield an empty list.

use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

use crate::infra::process::{run_checked, CommandRunner, CommandSpec};

/// A removable whole-disk candidate
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockDevice {
    /// Device node, e.g. `/dev/sdb`
    pub path: String,
    /// Size as reported by lsblk, e.g. `14.9G`
    pub size: String,
    /// Vendor model string
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl BlockDevice {
    /// One-line description for prompts
    pub fn describe(&self) -> String {
        match &self.model {
            Some(model) => format!("{} ({}, {model})", self.path, self.size),
            None => format!("{} ({})", self.path, self.size),
        }
    }
}

#[derive(Debug, Deserialize)]
struct LsblkResponse {
    #[serde(default)]
    blockdevices: Vec<LsblkNode>,
}

#[derive(Debug, Deserialize)]
struct LsblkNode {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    size: Option<String>,
    #[serde(rename = "type", default)]
    device_type: Option<String>,
    #[serde(default)]
    tran: Option<String>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    mountpoint: Option<String>,
    #[serde(default)]
    children: Vec<LsblkNode>,
}

impl LsblkNode {
    fn device_path(&self) -> Option<String> {
        self.path
            .clone()
            .or_else(|| self.name.as_ref().map(|name| format!("/dev/{name}")))
    }

    fn is_usb_disk(&self) -> bool {
        self.device_type.as_deref() == Some("disk")
            && self
                .tran
                .as_deref()
                .is_some_and(|tran| tran.eq_ignore_ascii_case("usb"))
    }
}

/// The lsblk invocation used for discovery
pub fn discovery_command() -> CommandSpec {
    CommandSpec::new("lsblk").args(["-J", "-o", "NAME,PATH,SIZE,TYPE,TRAN,MODEL"])
}

/// Filter lsblk JSON output down to USB whole disks
///
/// Returns `None` when the output cannot be parsed.
pub fn parse_lsblk(json: &[u8]) -> Option<Vec<BlockDevice>> {
    let response: LsblkResponse = serde_json::from_slice(json).ok()?;

    let mut found = Vec::new();
    for node in &response.blockdevices {
        collect_usb_disks(node, &mut found);
    }
    found.sort_by(|a, b| a.path.cmp(&b.path));
    found.dedup_by(|a, b| a.path == b.path);
    Some(found)
}

fn collect_usb_disks(node: &LsblkNode, out: &mut Vec<BlockDevice>) {
    if node.is_usb_disk() {
        if let Some(path) = node.device_path() {
            out.push(BlockDevice {
                path,
                size: node.size.clone().unwrap_or_else(|| "unknown size".to_string()),
                model: node
                    .model
                    .as_deref()
                    .map(str::trim)
                    .filter(|m| !m.is_empty())
                    .map(String::from),
            });
        }
    }
    for child in &node.children {
        collect_usb_disks(child, out);
    }
}

/// Enumerate removable USB whole disks
pub fn discover_removable(runner: &dyn CommandRunner) -> Vec<BlockDevice> {
    let output = match run_checked(runner, &discovery_command()) {
        Ok(output) => output,
        Err(e) => {
            tracing::warn!("Device discovery unavailable: {e}");
            return Vec::new();
        }
    };

    parse_lsblk(&output.stdout).unwrap_or_else(|| {
        tracing::warn!("Could not parse lsblk output, assuming no removable devices");
        Vec::new()
    })
}

/// Mounted nodes (the device and its partitions) under `device`
pub fn mounted_nodes(runner: &dyn CommandRunner, device: &str) -> Vec<String> {
    let cmd = CommandSpec::new("lsblk")
        .args(["-J", "-o", "PATH,MOUNTPOINT"])
        .arg(device);
    let Ok(output) = run_checked(runner, &cmd) else {
        return Vec::new();
    };
    let Ok(response) = serde_json::from_slice::<LsblkResponse>(&output.stdout) else {
        return Vec::new();
    };

    let mut mounted = Vec::new();
    for node in &response.blockdevices {
        collect_mounted(node, &mut mounted);
    }
    mounted
}

fn collect_mounted(node: &LsblkNode, out: &mut Vec<String>) {
    if node.mountpoint.as_deref().is_some_and(|m| !m.is_empty()) {
        if let Some(path) = node.device_path() {
            out.push(path);
        }
    }
    for child in &node.children {
        collect_mounted(child, out);
    }
}

/// Numbered list of candidates, one per line
pub fn render_candidates(devices: &[BlockDevice]) -> String {
    let mut list = String::new();
    for (idx, device) in devices.iter().enumerate() {
        let _ = writeln!(list, "  {}: {}", idx + 1, device.describe());
    }
    list
}
