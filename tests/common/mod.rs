//! Common test utilities and helpers
//!
//! This module provides shared utilities for integration tests.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use assert_fs::prelude::*;
use assert_fs::TempDir;
use isoforge::core::settings::Settings;
use isoforge::infra::process::{CommandOutput, CommandRunner, CommandSpec};
use isoforge::infra::prompt::Prompt;

/// Stock ISOLINUX menu shipped on the netinst image
pub const STOCK_ISOLINUX: &str = "# D-I config version 2.0\npath \ninclude menu.cfg\ndefault vesamenu.c32\nprompt 0\ntimeout 0\n";

/// Stock GRUB menu shipped on the netinst image
pub const STOCK_GRUB: &str = "if loadfont $prefix/font.pf2 ; then\n  set gfxmode=800x600\nfi\nmenuentry --hotkey=i 'Install' {\n    set background_color=black\n    linux    /install.amd/vmlinuz vga=788 --- quiet\n    initrd   /install.amd/initrd.gz\n}\n";

/// Provisioning config used across scenarios
pub const SAMPLE_POST_INSTALL: &str =
    r#"{"packages": ["curl","vim"], "ssh_key": {"type":"rsa","user":"admin"}}"#;

/// Test project context
///
/// Creates a temporary directory holding every build input, with
/// [`Settings`] pointing into it.
pub struct TestProject {
    /// Temporary directory for the test project
    pub dir: TempDir,
}

impl TestProject {
    /// Create a new test project in a temporary directory
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Create a project with the source image, answer file, provisioning
    /// config and MBR template in place
    pub fn with_inputs() -> Self {
        let project = Self::new();
        project.create_file("debian-13.0.0-amd64-netinst.iso", "netinst");
        project.create_file("preseed.cfg", "d-i debian-installer/locale string en_US\n");
        project.create_file("post_install_config.json", SAMPLE_POST_INSTALL);
        project.create_file("isohdpfx.bin", &"\0".repeat(432));
        project
    }

    /// Get the path to the test project directory
    pub fn path(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }

    /// Create a file in the test project
    pub fn create_file(&self, name: &str, content: &str) {
        self.dir
            .child(name)
            .write_str(content)
            .expect("Failed to write file");
    }

    /// Check if a file exists in the test project
    pub fn file_exists(&self, name: &str) -> bool {
        self.dir.path().join(name).exists()
    }

    /// Read a file from the test project
    pub fn read_file(&self, name: &str) -> String {
        std::fs::read_to_string(self.dir.path().join(name)).expect("Failed to read file")
    }

    /// Settings with every path inside the project
    pub fn settings(&self) -> Settings {
        let mut settings = Settings::default();
        let root = self.dir.path();
        settings.paths.source_iso = root.join("debian-13.0.0-amd64-netinst.iso");
        settings.paths.workspace = root.join("iso-extract");
        settings.paths.output = root.join("custom-debian-13.iso");
        settings.paths.preseed = root.join("preseed.cfg");
        settings.paths.post_install_config = root.join("post_install_config.json");
        settings.paths.isohybrid_mbr = root.join("isohdpfx.bin");
        settings
    }

    /// Run the isoforge binary inside the project
    pub fn run(&self, args: &[&str]) -> Output {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_isoforge"));
        cmd.current_dir(self.dir.path());
        cmd.env_remove("ISOFORGE_CONFIG");
        cmd.env_remove("RUST_LOG");
        cmd.args(args);
        cmd.output().expect("Failed to execute isoforge")
    }
}

impl Default for TestProject {
    fn default() -> Self {
        Self::new()
    }
}

/// Lay out the parts of a netinst tree the pipeline touches
pub fn populate_netinst_tree(root: &Path) {
    for (relative, content) in [
        ("isolinux/isolinux.cfg", STOCK_ISOLINUX),
        ("isolinux/isolinux.bin", "isolinux"),
        ("boot/grub/grub.cfg", STOCK_GRUB),
        ("boot/grub/efi.img", "efi"),
        ("install.amd/vmlinuz", "kernel"),
    ] {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }
}

/// Stands in for xorriso, lsblk, dd, umount and eject
///
/// Extraction populates a netinst tree, repackaging writes the output
/// file; other tools answer from canned output.
#[derive(Default)]
pub struct FakeHost {
    calls: RefCell<Vec<CommandSpec>>,
    responses: HashMap<String, CommandOutput>,
}

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, tool: &str, output: CommandOutput) -> Self {
        self.responses.insert(tool.to_string(), output);
        self
    }

    pub fn calls_to(&self, tool: &str) -> Vec<CommandSpec> {
        self.calls
            .borrow()
            .iter()
            .filter(|c| c.tool() == tool)
            .cloned()
            .collect()
    }

    pub fn tools(&self) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .map(|c| c.tool().to_string())
            .collect()
    }
}

impl CommandRunner for FakeHost {
    fn run(&self, spec: &CommandSpec) -> io::Result<CommandOutput> {
        self.calls.borrow_mut().push(spec.clone());
        if spec.tool() == "xorriso" {
            if spec.args.first().map(String::as_str) == Some("-osirrox") {
                populate_netinst_tree(Path::new(spec.args.last().unwrap()));
            } else if let Some(idx) = spec.args.iter().position(|a| a == "-o") {
                std::fs::write(&spec.args[idx + 1], b"hybrid image")?;
            }
        }
        Ok(self
            .responses
            .get(spec.tool())
            .cloned()
            .unwrap_or_else(|| CommandOutput::ok("")))
    }
}

/// Answers prompts from a script
pub struct Operator {
    answers: RefCell<VecDeque<String>>,
    pub asked: RefCell<Vec<String>>,
}

impl Operator {
    pub fn answering(answers: &[&str]) -> Self {
        Self {
            answers: RefCell::new(answers.iter().map(|a| (*a).to_string()).collect()),
            asked: RefCell::new(Vec::new()),
        }
    }

    fn next(&self, question: &str) -> String {
        self.asked.borrow_mut().push(question.to_string());
        self.answers
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| panic!("unexpected question: {question}"))
    }
}

impl Prompt for Operator {
    fn notice(&self, _message: &str) {}

    fn confirm(&self, question: &str, _default: bool) -> io::Result<bool> {
        Ok(self.next(question) == "y")
    }

    fn input(&self, question: &str) -> io::Result<String> {
        Ok(self.next(question))
    }
}

/// lsblk JSON describing two USB sticks next to a SATA system disk
pub const TWO_USB_DISKS: &str = r#"{"blockdevices":[
    {"name":"sda","path":"/dev/sda","size":"476.9G","type":"disk","tran":"sata"},
    {"name":"sdb","path":"/dev/sdb","size":"14.9G","type":"disk","tran":"usb","model":"SanDisk"},
    {"name":"sdc","path":"/dev/sdc","size":"28.7G","type":"disk","tran":"usb","model":"Kingston"}
]}"#;
