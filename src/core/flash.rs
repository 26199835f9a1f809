//! Removable media provisioning
//!
//! Writes the custom image to a USB disk. Each invocation walks the same
//! states:
//!
//! 1. **Unmount** every mounted node of the target (best effort).
//! 2. **Confirm** the destructive write, unless the caller holds a
//!    confirmation or a bypass that the selection makes legal.
//! 3. **Write** the image in fixed-size blocks. Failures are fatal and never
//!    retried.
//! 4. **Eject** the device. Failures are reported but the write stands.
//!
//! The write step is only reachable through [`MediaProvisioner::flash`], and
//! only after [`Confirmation`] resolves to "go".

use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::core::devices::{self, BlockDevice};
use crate::core::settings::{FlashSettings, WriteMethod};
use crate::error::{ProvisionError, Stage};
use crate::infra::process::{run_checked, CommandRunner, CommandSpec};
use crate::infra::prompt::Prompt;

/// Confirmation state handed to [`MediaProvisioner::flash`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    /// The operator has not confirmed yet and must be asked
    Pending,
    /// The operator confirmed the write earlier in this invocation
    Confirmed,
    /// The operator affirmed intent while picking the only candidate.
    /// Honoured only for unambiguous selections, otherwise treated as
    /// [`Confirmation::Pending`].
    BypassEligible,
}

/// A chosen target together with how many candidates it was picked from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceSelection {
    device: BlockDevice,
    candidates: usize,
}

impl DeviceSelection {
    /// Select `device` out of `candidates` discovered devices
    pub fn new(device: BlockDevice, candidates: usize) -> Self {
        Self { device, candidates }
    }

    /// The target device
    pub fn device(&self) -> &BlockDevice {
        &self.device
    }

    /// Whether there was exactly one candidate to pick from
    pub fn is_unambiguous(&self) -> bool {
        self.candidates == 1
    }
}

/// Result of the interactive selection step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionOutcome {
    /// Nothing to select from
    NoDevices,
    /// Operator chose not to flash
    Declined,
    /// Operator's answer did not name a candidate
    Invalid(String),
    /// A device was chosen
    Selected(DeviceSelection, Confirmation),
}

/// Terminal state of a flash invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlashOutcome {
    /// Operator declined the destructive write; nothing was written
    Cancelled,
    /// Image written; `ejected` reports whether safe removal succeeded
    Flashed { device: String, ejected: bool },
}

/// Terminal state of selection plus flashing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisionOutcome {
    /// No removable devices found
    NoDevices,
    /// Operator chose not to flash
    Declined,
    /// Operator's answer did not name a candidate
    InvalidSelection(String),
    /// Operator declined the final confirmation
    Cancelled,
    /// Image written
    Flashed { device: String, ejected: bool },
}

impl From<FlashOutcome> for ProvisionOutcome {
    fn from(outcome: FlashOutcome) -> Self {
        match outcome {
            FlashOutcome::Cancelled => Self::Cancelled,
            FlashOutcome::Flashed { device, ejected } => Self::Flashed { device, ejected },
        }
    }
}

/// Ask the operator which candidate to flash
///
/// A single candidate needs one "flash to X?" answer and yields a
/// bypass-eligible selection. Several candidates are listed by number, and
/// the chosen one still requires the final confirmation.
pub fn select_device(
    candidates: &[BlockDevice],
    prompt: &dyn Prompt,
) -> Result<SelectionOutcome, ProvisionError> {
    let prompt_error = |e: std::io::Error| ProvisionError::Prompt {
        error: e.to_string(),
    };

    match candidates {
        [] => Ok(SelectionOutcome::NoDevices),
        [only] => {
            prompt.notice(&format!("Detected single USB drive: {}", only.describe()));
            let question = format!("Do you want to flash the ISO to {}?", only.path);
            if prompt.confirm(&question, true).map_err(prompt_error)? {
                Ok(SelectionOutcome::Selected(
                    DeviceSelection::new(only.clone(), 1),
                    Confirmation::BypassEligible,
                ))
            } else {
                Ok(SelectionOutcome::Declined)
            }
        }
        many => {
            prompt.notice(&format!(
                "Available USB drives:\n{}",
                devices::render_candidates(many)
            ));
            if !prompt
                .confirm("Do you want to flash the ISO to a USB drive?", false)
                .map_err(prompt_error)?
            {
                return Ok(SelectionOutcome::Declined);
            }

            let answer = prompt
                .input("Enter the number of the drive to flash")
                .map_err(prompt_error)?;
            let Ok(number) = answer.trim().parse::<usize>() else {
                return Ok(SelectionOutcome::Invalid(format!(
                    "'{answer}' is not a number"
                )));
            };
            match number.checked_sub(1).and_then(|idx| many.get(idx)) {
                Some(device) => Ok(SelectionOutcome::Selected(
                    DeviceSelection::new(device.clone(), many.len()),
                    Confirmation::Pending,
                )),
                None => Ok(SelectionOutcome::Invalid(format!(
                    "{number} is not between 1 and {}",
                    many.len()
                ))),
            }
        }
    }
}

/// Select a device the operator named on the command line
///
/// The device must be one of the discovered candidates. The selection is
/// only unambiguous when it was the sole candidate.
pub fn select_named(
    device: &str,
    candidates: &[BlockDevice],
) -> Result<DeviceSelection, ProvisionError> {
    candidates
        .iter()
        .find(|c| c.path == device)
        .map(|c| DeviceSelection::new(c.clone(), candidates.len()))
        .ok_or_else(|| ProvisionError::NotACandidate {
            device: device.to_string(),
            candidates: if candidates.is_empty() {
                "none".to_string()
            } else {
                candidates
                    .iter()
                    .map(|c| c.path.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            },
        })
}

/// The raw block copy command line
pub fn write_command(image: &Path, device: &str, settings: &FlashSettings) -> CommandSpec {
    CommandSpec::new("dd")
        .arg(format!("if={}", image.display()))
        .arg(format!("of={device}"))
        .arg(format!("bs={}", settings.block_size))
        .args(["conv=fsync", "status=progress"])
        .inherit_stderr()
        .privileged(settings.use_sudo)
}

/// Stream `image` onto `device` in `chunk_size` blocks
///
/// `progress` receives `(written, total)` after every block; `cancel` is
/// checked between blocks. Returns the number of bytes written.
pub fn copy_image(
    image: &Path,
    device: &Path,
    chunk_size: usize,
    progress: &dyn Fn(u64, u64),
    cancel: &AtomicBool,
) -> Result<u64, ProvisionError> {
    let device_name = device.display().to_string();
    let mut written: u64 = 0;
    let fail = |written: u64, e: std::io::Error| ProvisionError::Write {
        stage: Stage::Write,
        device: device_name.clone(),
        written,
        error: e.to_string(),
    };

    let mut source = File::open(image).map_err(|e| fail(0, e))?;
    let total = source.metadata().map_err(|e| fail(0, e))?.len();
    let mut target = OpenOptions::new()
        .write(true)
        .open(device)
        .map_err(|e| fail(0, e))?;

    let mut buffer = vec![0u8; chunk_size];
    loop {
        if cancel.load(Ordering::Relaxed) {
            return Err(ProvisionError::Interrupted {
                stage: Stage::Write,
                device: device_name.clone(),
                written,
            });
        }

        let read = source.read(&mut buffer).map_err(|e| fail(written, e))?;
        if read == 0 {
            break;
        }
        target
            .write_all(&buffer[..read])
            .map_err(|e| fail(written, e))?;
        written += read as u64;
        progress(written, total);
    }

    target.sync_all().map_err(|e| fail(written, e))?;
    Ok(written)
}

/// Drives the unmount, confirm, write and eject states
pub struct MediaProvisioner<'a> {
    runner: &'a dyn CommandRunner,
    prompt: &'a dyn Prompt,
    settings: &'a FlashSettings,
    progress: Option<&'a dyn Fn(u64, u64)>,
    before_write: Option<&'a dyn Fn()>,
    cancel: Arc<AtomicBool>,
}

impl<'a> MediaProvisioner<'a> {
    /// Create a provisioner
    pub fn new(
        runner: &'a dyn CommandRunner,
        prompt: &'a dyn Prompt,
        settings: &'a FlashSettings,
    ) -> Self {
        Self {
            runner,
            prompt,
            settings,
            progress: None,
            before_write: None,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Report direct-write progress as `(written, total)` bytes
    #[must_use]
    pub fn with_progress(mut self, progress: &'a dyn Fn(u64, u64)) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Run `hook` once confirmation has passed, right before writing
    #[must_use]
    pub fn with_before_write(mut self, hook: &'a dyn Fn()) -> Self {
        self.before_write = Some(hook);
        self
    }

    /// Abort direct writes between blocks once `cancel` is set
    #[must_use]
    pub fn with_cancel(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    /// Select a target interactively, then flash it
    pub fn provision(
        &self,
        image: &Path,
        candidates: &[BlockDevice],
    ) -> Result<ProvisionOutcome, ProvisionError> {
        match select_device(candidates, self.prompt)? {
            SelectionOutcome::NoDevices => Ok(ProvisionOutcome::NoDevices),
            SelectionOutcome::Declined => Ok(ProvisionOutcome::Declined),
            SelectionOutcome::Invalid(reason) => Ok(ProvisionOutcome::InvalidSelection(reason)),
            SelectionOutcome::Selected(selection, confirmation) => self
                .flash(image, &selection, confirmation)
                .map(ProvisionOutcome::from),
        }
    }

    /// Flash `image` to the selected device
    pub fn flash(
        &self,
        image: &Path,
        selection: &DeviceSelection,
        confirmation: Confirmation,
    ) -> Result<FlashOutcome, ProvisionError> {
        if !image.is_file() {
            return Err(ProvisionError::MissingImage {
                stage: Stage::Write,
                path: image.to_path_buf(),
            });
        }
        let device = selection.device().path.as_str();
        tracing::info!("Preparing to flash {} to {device}", image.display());

        self.unmount(device);

        if !self.confirmed(selection, confirmation)? {
            tracing::info!("Flash to {device} cancelled by operator");
            return Ok(FlashOutcome::Cancelled);
        }

        if let Some(hook) = self.before_write {
            hook();
        }
        self.write(image, device)?;
        tracing::info!("Wrote {} to {device}", image.display());

        let ejected = self.eject(device);
        Ok(FlashOutcome::Flashed {
            device: device.to_string(),
            ejected,
        })
    }

    fn unmount(&self, device: &str) {
        for node in devices::mounted_nodes(self.runner, device) {
            let cmd = CommandSpec::new("umount")
                .arg(&node)
                .privileged(self.settings.use_sudo);
            match run_checked(self.runner, &cmd) {
                Ok(_) => tracing::info!("Unmounted {node}"),
                Err(e) => tracing::warn!("Ignoring unmount failure for {node}: {e}"),
            }
        }
    }

    fn confirmed(
        &self,
        selection: &DeviceSelection,
        confirmation: Confirmation,
    ) -> Result<bool, ProvisionError> {
        match confirmation {
            Confirmation::Confirmed => return Ok(true),
            Confirmation::BypassEligible if selection.is_unambiguous() => return Ok(true),
            Confirmation::BypassEligible => {
                tracing::warn!("Confirmation bypass ignored: selection was not unambiguous");
            }
            Confirmation::Pending => {}
        }

        let device = &selection.device().path;
        self.prompt
            .notice(&format!("WARNING: This will destroy all data on {device}."));
        self.prompt
            .confirm("Are you absolutely sure you want to continue?", false)
            .map_err(|e| ProvisionError::Prompt {
                error: e.to_string(),
            })
    }

    fn write(&self, image: &Path, device: &str) -> Result<(), ProvisionError> {
        match self.settings.method {
            WriteMethod::Dd => {
                let cmd = write_command(image, device, self.settings);
                run_checked(self.runner, &cmd)
                    .map(|_| ())
                    .map_err(|source| ProvisionError::Command {
                        stage: Stage::Write,
                        source,
                    })
            }
            WriteMethod::Direct => {
                let chunk_size = self.settings.block_size_bytes()?;
                let noop = |_: u64, _: u64| {};
                let progress: &dyn Fn(u64, u64) = match self.progress {
                    Some(progress) => progress,
                    None => &noop,
                };
                copy_image(image, Path::new(device), chunk_size, progress, &self.cancel)
                    .map(|_| ())
            }
        }
    }

    fn eject(&self, device: &str) -> bool {
        let cmd = CommandSpec::new("eject")
            .arg(device)
            .privileged(self.settings.use_sudo);
        match run_checked(self.runner, &cmd) {
            Ok(_) => {
                tracing::info!("Ejected {device}");
                true
            }
            Err(e) => {
                tracing::warn!("Could not eject {device}: {e}");
                false
            }
        }
    }
}
