//! External process execution
//!
//! Every host tool (xorriso, lsblk, umount, dd, eject) is invoked through the
//! [`CommandRunner`] trait so stages can be exercised against a recording
//! runner in tests.

use std::fmt;
use std::io;
use std::path::Path;
use std::process::{Command, Stdio};

use crate::error::CommandError;

/// A fully specified command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Program to execute
    pub program: String,
    /// Arguments, in order
    pub args: Vec<String>,
    /// Let the child write its stderr straight to the terminal
    pub inherit_stderr: bool,
}

impl CommandSpec {
    /// Create a command with no arguments
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            inherit_stderr: false,
        }
    }

    /// Append one argument
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Append a path argument
    #[must_use]
    pub fn path_arg(self, path: &Path) -> Self {
        self.arg(path.to_string_lossy())
    }

    /// Run the command through `sudo` when requested
    #[must_use]
    pub fn privileged(self, use_sudo: bool) -> Self {
        if !use_sudo {
            return self;
        }
        let mut args = Vec::with_capacity(self.args.len() + 1);
        args.push(self.program);
        args.extend(self.args);
        Self {
            program: "sudo".to_string(),
            args,
            inherit_stderr: self.inherit_stderr,
        }
    }

    /// Stream stderr to the terminal instead of capturing it
    #[must_use]
    pub fn inherit_stderr(mut self) -> Self {
        self.inherit_stderr = true;
        self
    }

    /// The tool doing the work, looking through a `sudo` wrapper
    pub fn tool(&self) -> &str {
        if self.program == "sudo" {
            self.args.first().map_or("sudo", String::as_str)
        } else {
            &self.program
        }
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " '{arg}'")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

/// Captured result of a finished command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` when killed by a signal
    pub code: Option<i32>,
    /// Captured stdout
    pub stdout: Vec<u8>,
    /// Captured stderr (empty when inherited)
    pub stderr: String,
}

impl CommandOutput {
    /// Successful output with the given stdout
    pub fn ok(stdout: impl Into<Vec<u8>>) -> Self {
        Self {
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Failed output with the given exit code and stderr
    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            stdout: Vec::new(),
            stderr: stderr.into(),
        }
    }

    /// Whether the command exited with status zero
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    fn status_text(&self) -> String {
        self.code
            .map_or_else(|| "a signal".to_string(), |code| format!("status {code}"))
    }
}

/// Executes external commands
pub trait CommandRunner {
    /// Run a command to completion
    fn run(&self, spec: &CommandSpec) -> io::Result<CommandOutput>;
}

/// Runs commands on the host
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, spec: &CommandSpec) -> io::Result<CommandOutput> {
        tracing::debug!("Running: {spec}");

        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args).stdin(Stdio::null());
        if spec.inherit_stderr {
            cmd.stderr(Stdio::inherit());
        }

        let output = cmd.output()?;
        Ok(CommandOutput {
            code: output.status.code(),
            stdout: output.stdout,
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Run a command and treat any nonzero exit as an error
pub fn run_checked(
    runner: &dyn CommandRunner,
    spec: &CommandSpec,
) -> Result<CommandOutput, CommandError> {
    let output = runner.run(spec).map_err(|e| {
        if e.kind() == io::ErrorKind::NotFound {
            CommandError::NotFound {
                tool: spec.program.clone(),
            }
        } else {
            CommandError::Spawn {
                command: spec.to_string(),
                error: e.to_string(),
            }
        }
    })?;

    if output.success() {
        Ok(output)
    } else {
        let stderr = output.stderr.trim();
        Err(CommandError::Failed {
            command: spec.to_string(),
            status: output.status_text(),
            stderr: if stderr.is_empty() {
                "no diagnostic output".to_string()
            } else {
                stderr.to_string()
            },
        })
    }
}
