//! CLI command implementation for `isoforge flash`
//!
//! Also hosts the interactive provisioning flow that `create` runs after a
//! successful build.

use anyhow::Result;
use std::cell::OnceCell;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::cli::output::{
    create_spinner, create_write_bar, print_detail, print_info, print_success, print_warning,
};
use crate::core::devices::{self, BlockDevice};
use crate::core::flash::{select_named, Confirmation, MediaProvisioner, ProvisionOutcome};
use crate::core::settings::{Settings, WriteMethod};
use crate::error::{ProvisionError, Stage};
use crate::infra::process::SystemRunner;
use crate::infra::prompt::TerminalPrompt;

/// Options for the flash command
#[derive(Debug, Default)]
pub struct FlashOptions {
    /// Explicit target device
    pub device: Option<String>,
    /// Image to write
    pub image: Option<PathBuf>,
    /// Skip the final confirmation when the device is the only candidate
    pub yes: bool,
    /// Use the in-process writer
    pub direct: bool,
}

/// Execute the flash command
pub async fn execute(mut settings: Settings, options: FlashOptions) -> Result<()> {
    if options.direct {
        settings.flash.method = WriteMethod::Direct;
    }
    let image = options
        .image
        .unwrap_or_else(|| settings.paths.output.clone());
    if !image.is_file() {
        return Err(ProvisionError::MissingImage {
            stage: Stage::Write,
            path: image,
        }
        .into());
    }

    let candidates = discover();
    let outcome = match options.device {
        Some(device) => {
            let selection = select_named(&device, &candidates)?;
            let confirmation = if options.yes {
                Confirmation::BypassEligible
            } else {
                Confirmation::Pending
            };
            with_provisioner(&settings, |provisioner| {
                provisioner
                    .flash(&image, &selection, confirmation)
                    .map(ProvisionOutcome::from)
            })?
        }
        None => {
            if options.yes {
                tracing::info!("--yes only applies together with --device");
            }
            with_provisioner(&settings, |provisioner| {
                provisioner.provision(&image, &candidates)
            })?
        }
    };

    report(&outcome);
    Ok(())
}

/// Offer to write a freshly built image
pub async fn provision_interactively(settings: &Settings, image: &Path) -> Result<()> {
    let candidates = discover();
    let outcome = with_provisioner(settings, |provisioner| {
        provisioner.provision(image, &candidates)
    })?;
    report(&outcome);
    Ok(())
}

fn discover() -> Vec<BlockDevice> {
    let spinner = create_spinner("Looking for USB drives...");
    let candidates = devices::discover_removable(&SystemRunner);
    spinner.finish_and_clear();
    candidates
}

/// Build a provisioner wired to the terminal and run `work` with it
fn with_provisioner<F>(settings: &Settings, work: F) -> Result<ProvisionOutcome>
where
    F: FnOnce(&MediaProvisioner<'_>) -> Result<ProvisionOutcome, ProvisionError>,
{
    let runner = SystemRunner;
    let prompt = TerminalPrompt::new();
    let cancel = Arc::new(AtomicBool::new(false));
    let direct = settings.flash.method == WriteMethod::Direct;
    let arm_interrupt = || {
        if direct {
            watch_interrupt(Arc::clone(&cancel));
        }
    };

    let bar = OnceCell::new();
    let progress = |written: u64, total: u64| {
        bar.get_or_init(|| create_write_bar(total)).set_position(written);
    };

    let provisioner = MediaProvisioner::new(&runner, &prompt, &settings.flash)
        .with_progress(&progress)
        .with_before_write(&arm_interrupt)
        .with_cancel(Arc::clone(&cancel));
    let outcome = work(&provisioner);
    if let Some(bar) = bar.get() {
        bar.finish_and_clear();
    }

    Ok(outcome?)
}

/// Set `cancel` on the first Ctrl-C; a second one exits immediately
///
/// Installed only once the write starts, so Ctrl-C at a prompt still exits.
fn watch_interrupt(cancel: Arc<AtomicBool>) {
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if cancel.swap(true, Ordering::Relaxed) {
                std::process::exit(130);
            }
            eprintln!("Stopping after the current block (Ctrl-C again to abort now)...");
        }
    });
}

fn report(outcome: &ProvisionOutcome) {
    match outcome {
        ProvisionOutcome::NoDevices => print_warning("No USB drives detected. Skipping flash."),
        ProvisionOutcome::Declined => print_info("Skipping USB flash."),
        ProvisionOutcome::InvalidSelection(reason) => {
            print_warning(&format!("Invalid selection: {reason}. Nothing was written."));
        }
        ProvisionOutcome::Cancelled => print_info("Flash cancelled. Nothing was written."),
        ProvisionOutcome::Flashed { device, ejected } => {
            print_success(&format!("Image written to {device}"));
            if *ejected {
                print_detail("Device ejected; it is safe to remove.");
            } else {
                print_warning(&format!(
                    "Could not eject {device}; eject it manually before removing."
                ));
            }
        }
    }
}
