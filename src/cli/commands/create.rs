//! CLI command implementation for `isoforge create`

use anyhow::Result;
use indicatif::ProgressBar;

use super::flash::provision_interactively;
use crate::cli::output::{create_spinner, print_detail, print_success, status};
use crate::core::doctor::verify_build_prerequisites;
use crate::core::pipeline::{describe, run_build, BuildReport, StageEvent};
use crate::core::settings::Settings;
use crate::error::IsoforgeError;
use crate::infra::process::SystemRunner;

/// Execute the create command
pub async fn execute(settings: Settings, no_flash: bool) -> Result<()> {
    let report = build(&settings)?;

    print_success(&format!("Custom ISO created: {}", report.image.display()));
    print_detail(&format!("Workspace kept at {}", report.workspace.display()));

    if no_flash {
        return Ok(());
    }
    provision_interactively(&settings, &report.image).await
}

/// Check prerequisites, then run every stage behind a spinner
fn build(settings: &Settings) -> Result<BuildReport, IsoforgeError> {
    verify_build_prerequisites(settings)?;

    let mut spinner: Option<ProgressBar> = None;
    let result = run_build(&SystemRunner, settings, &mut |event| match event {
        StageEvent::Started(stage) => spinner = Some(create_spinner(describe(stage))),
        StageEvent::Completed(stage) => {
            if let Some(pb) = spinner.take() {
                pb.finish_with_message(format!("{} {}", status::SUCCESS, describe(stage)));
            }
        }
    });
    if let Some(pb) = spinner.take() {
        pb.abandon_with_message(format!("{} {}", status::ERROR, pb.message()));
    }
    Ok(result?)
}
