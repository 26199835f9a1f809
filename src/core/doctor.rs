//! Doctor command logic
//!
//! Checks host tools and input files and reports issues with suggestions.
//! `xorriso` and the hybrid MBR template are needed to build; the device
//! tools only matter for media provisioning.

use serde::Serialize;
use std::path::Path;

use crate::core::settings::Settings;
use crate::error::{PipelineError, Stage};
use crate::infra::process::{CommandRunner, CommandSpec};

const APT_HINT: &str = "sudo apt-get install -y";

/// A host tool the workflow shells out to
#[derive(Debug, Clone, Copy)]
pub struct ToolCheck {
    /// Display name
    pub name: &'static str,
    /// Executable looked up in PATH
    pub binary: &'static str,
    /// Argument that prints a version banner
    pub version_flag: &'static str,
    /// Debian package providing the binary
    pub package: &'static str,
    /// Whether a build cannot proceed without it
    pub required: bool,
}

/// Every tool the workflow can invoke
pub const TOOLS: &[ToolCheck] = &[
    ToolCheck {
        name: "xorriso",
        binary: "xorriso",
        version_flag: "-version",
        package: "xorriso",
        required: true,
    },
    ToolCheck {
        name: "lsblk (device discovery)",
        binary: "lsblk",
        version_flag: "--version",
        package: "util-linux",
        required: false,
    },
    ToolCheck {
        name: "dd (device write)",
        binary: "dd",
        version_flag: "--version",
        package: "coreutils",
        required: false,
    },
    ToolCheck {
        name: "umount",
        binary: "umount",
        version_flag: "--version",
        package: "mount",
        required: false,
    },
    ToolCheck {
        name: "eject",
        binary: "eject",
        version_flag: "--version",
        package: "eject",
        required: false,
    },
    ToolCheck {
        name: "sudo",
        binary: "sudo",
        version_flag: "--version",
        package: "sudo",
        required: false,
    },
];

/// Result of a single dependency check
#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
    /// Name of the dependency being checked
    pub name: String,
    /// Whether the check passed
    pub passed: bool,
    /// Version if available
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Error message if check failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Suggestion for fixing the issue
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    /// Whether this is a required or optional dependency
    pub required: bool,
}

impl CheckResult {
    /// Create a passing check result
    pub fn pass(name: &str, version: Option<String>, required: bool) -> Self {
        Self {
            name: name.to_string(),
            passed: true,
            version,
            error: None,
            suggestion: None,
            required,
        }
    }

    /// Create a failing check result
    pub fn fail(name: &str, error: &str, suggestion: Option<&str>, required: bool) -> Self {
        Self {
            name: name.to_string(),
            passed: false,
            version: None,
            error: Some(error.to_string()),
            suggestion: suggestion.map(String::from),
            required,
        }
    }
}

/// Overall doctor report
#[derive(Debug, Default, Serialize)]
pub struct DoctorReport {
    /// Individual check results
    pub checks: Vec<CheckResult>,
    /// Input files that a build would miss
    pub input_issues: Vec<String>,
}

impl DoctorReport {
    /// Create a new empty report
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a check result
    pub fn add_check(&mut self, result: CheckResult) {
        self.checks.push(result);
    }

    /// Add an input issue
    pub fn add_input_issue(&mut self, issue: String) {
        self.input_issues.push(issue);
    }

    /// Check if all required checks passed
    pub fn all_required_passed(&self) -> bool {
        self.checks.iter().filter(|c| c.required).all(|c| c.passed)
    }

    /// Check if all checks passed (including optional)
    pub fn all_passed(&self) -> bool {
        self.checks.iter().all(|c| c.passed) && self.input_issues.is_empty()
    }

    /// Count passed checks
    pub fn passed_count(&self) -> usize {
        self.checks.iter().filter(|c| c.passed).count()
    }

    /// Count failed checks
    pub fn failed_count(&self) -> usize {
        self.checks.iter().filter(|c| !c.passed).count()
    }

    /// Get all failed required checks
    pub fn failed_required(&self) -> Vec<&CheckResult> {
        self.checks
            .iter()
            .filter(|c| c.required && !c.passed)
            .collect()
    }
}

/// Install hint for a Debian package
pub fn install_suggestion(package: &str) -> String {
    format!("Install it with: {APT_HINT} {package}")
}

/// Extract version string from command output
fn extract_version(output: &str) -> Option<String> {
    // Try to find version patterns like "1.2.3" or "v1.2.3"
    let version_regex = regex::Regex::new(r"v?(\d+\.\d+(?:\.\d+)?(?:-\w+)?)").ok()?;
    version_regex
        .captures(output)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

fn probe_version(runner: &dyn CommandRunner, tool: &ToolCheck) -> Option<String> {
    let output = runner
        .run(&CommandSpec::new(tool.binary).arg(tool.version_flag))
        .ok()?;
    let combined = format!(
        "{}{}",
        String::from_utf8_lossy(&output.stdout),
        output.stderr
    );
    extract_version(&combined)
}

/// Check one host tool
///
/// Presence is decided by a PATH lookup; the version banner is best effort.
pub fn check_tool(runner: &dyn CommandRunner, tool: &ToolCheck) -> CheckResult {
    if which::which(tool.binary).is_err() {
        return CheckResult::fail(
            tool.name,
            &format!("{} not found in PATH", tool.binary),
            Some(&install_suggestion(tool.package)),
            tool.required,
        );
    }
    CheckResult::pass(tool.name, probe_version(runner, tool), tool.required)
}

/// Check the hybrid MBR template
pub fn check_mbr_template(path: &Path) -> CheckResult {
    const NAME: &str = "Hybrid MBR template";
    if path.is_file() {
        CheckResult::pass(NAME, None, true)
    } else {
        CheckResult::fail(
            NAME,
            &format!("{} not found", path.display()),
            Some(&install_suggestion("isolinux")),
            true,
        )
    }
}

/// Input files a build reads, with what is missing
pub fn check_inputs(settings: &Settings) -> Vec<String> {
    let paths = &settings.paths;
    [
        ("Source image", &paths.source_iso),
        ("Answer file", &paths.preseed),
        ("Post-install config", &paths.post_install_config),
    ]
    .into_iter()
    .filter(|(_, path)| !path.is_file())
    .map(|(what, path)| format!("{what} not found at '{}'", path.display()))
    .collect()
}

/// Run all doctor checks
pub fn run_doctor(runner: &dyn CommandRunner, settings: &Settings) -> DoctorReport {
    let mut report = DoctorReport::new();

    for tool in TOOLS {
        report.add_check(check_tool(runner, tool));
    }
    report.add_check(check_mbr_template(&settings.paths.isohybrid_mbr));

    for issue in check_inputs(settings) {
        report.add_input_issue(issue);
    }

    report
}

/// Fail fast when a build could not possibly succeed
pub fn verify_build_prerequisites(settings: &Settings) -> Result<(), PipelineError> {
    verify_with(|binary| which::which(binary).is_ok(), settings)
}

fn verify_with(
    is_installed: impl Fn(&str) -> bool,
    settings: &Settings,
) -> Result<(), PipelineError> {
    for tool in TOOLS.iter().filter(|t| t.required) {
        if !is_installed(tool.binary) {
            return Err(PipelineError::MissingTool {
                stage: Stage::Prerequisites,
                tool: tool.binary.to_string(),
                suggestion: install_suggestion(tool.package),
            });
        }
    }

    let mbr = &settings.paths.isohybrid_mbr;
    if !mbr.is_file() {
        return Err(PipelineError::MissingInput {
            stage: Stage::Prerequisites,
            what: "isohybrid MBR template",
            path: mbr.clone(),
        });
    }
    Ok(())
}
