//! Image build pipeline
//!
//! Runs extraction, answer-file injection, post-install script generation,
//! bootloader patching and repackaging in that order. The first failure
//! aborts the run; later stages never see a half-prepared workspace.

use std::path::PathBuf;

use crate::core::settings::Settings;
use crate::core::workspace::{self, Workspace};
use crate::core::{bootloader, image, post_install, preseed};
use crate::error::{PipelineError, Stage};
use crate::infra::process::CommandRunner;

/// Stages of a build, in execution order
pub const BUILD_STAGES: [Stage; 5] = [
    Stage::Extract,
    Stage::AnswerFile,
    Stage::PostInstall,
    Stage::Bootloader,
    Stage::Image,
];

/// Progress notification emitted by [`run_build`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageEvent {
    /// Stage is about to run
    Started(Stage),
    /// Stage finished successfully
    Completed(Stage),
}

/// Human-readable description of a build stage
pub fn describe(stage: Stage) -> &'static str {
    match stage {
        Stage::Extract => "Extracting source image",
        Stage::AnswerFile => "Injecting answer file",
        Stage::PostInstall => "Generating post-install script",
        Stage::Bootloader => "Patching boot menus",
        Stage::Image => "Building hybrid image",
        Stage::Prerequisites => "Checking prerequisites",
        Stage::Discover => "Discovering devices",
        Stage::Unmount => "Unmounting device",
        Stage::Write => "Writing image",
        Stage::Eject => "Ejecting device",
    }
}

/// Artifacts of a successful build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildReport {
    /// Repackaged image
    pub image: PathBuf,
    /// Workspace left behind for inspection
    pub workspace: PathBuf,
    /// Generated post-install script inside the workspace
    pub script: PathBuf,
}

fn run_stage<T>(
    observer: &mut dyn FnMut(StageEvent),
    stage: Stage,
    work: impl FnOnce() -> Result<T, PipelineError>,
) -> Result<T, PipelineError> {
    observer(StageEvent::Started(stage));
    let value = work()?;
    observer(StageEvent::Completed(stage));
    Ok(value)
}

/// Run every build stage against `settings`
pub fn run_build(
    runner: &dyn CommandRunner,
    settings: &Settings,
    observer: &mut dyn FnMut(StageEvent),
) -> Result<BuildReport, PipelineError> {
    let paths = &settings.paths;
    let ws = Workspace::new(&paths.workspace);

    run_stage(observer, Stage::Extract, || {
        workspace::extract_image(runner, &paths.source_iso, &ws)
    })?;
    run_stage(observer, Stage::AnswerFile, || {
        preseed::inject_answer_file(&paths.preseed, &ws)
    })?;
    let script = run_stage(observer, Stage::PostInstall, || {
        post_install::generate_post_install_script(&paths.post_install_config, &ws)
    })?;
    run_stage(observer, Stage::Bootloader, || {
        bootloader::patch_bootloaders(&ws, &settings.boot)
    })?;
    run_stage(observer, Stage::Image, || image::build_image(runner, &ws, settings))?;

    tracing::info!("Custom image ready at {}", paths.output.display());
    Ok(BuildReport {
        image: paths.output.clone(),
        workspace: paths.workspace.clone(),
        script,
    })
}
