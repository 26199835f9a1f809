//! Integration tests for the image build pipeline
//!
//! Drives `run_build` end to end against a fake host that mimics xorriso.

mod common;

use assert_fs::prelude::*;
use common::{FakeHost, TestProject, STOCK_GRUB, STOCK_ISOLINUX};
use isoforge::core::pipeline::{run_build, StageEvent, BUILD_STAGES};
use isoforge::error::{PipelineError, Stage};
use predicates::prelude::*;
use std::os::unix::fs::PermissionsExt;

#[test]
fn test_build_produces_patched_workspace_and_image() {
    let project = TestProject::with_inputs();
    let settings = project.settings();
    let host = FakeHost::new();

    let report = run_build(&host, &settings, &mut |_| {}).unwrap();

    project
        .dir
        .child("custom-debian-13.iso")
        .assert(predicate::path::is_file());
    let ws = project.dir.child("iso-extract");
    ws.child("preseed.cfg")
        .assert("d-i debian-installer/locale string en_US\n");
    ws.child("isolinux/isolinux.cfg")
        .assert(predicate::str::starts_with("TIMEOUT 10\nDEFAULT autoinstall\n"))
        .assert(predicate::str::ends_with(STOCK_ISOLINUX));
    ws.child("boot/grub/grub.cfg")
        .assert(predicate::str::starts_with("set timeout=1\nset default=\"0\"\n"))
        .assert(predicate::str::ends_with(STOCK_GRUB));
    ws.child("post_install_setup.sh")
        .assert(predicate::str::contains(
            "apt-get install -y --no-install-recommends curl vim\n",
        ))
        .assert(predicate::str::contains(
            "sudo -u admin ssh-keygen -t rsa -f /home/admin/.ssh/id_rsa -N \"\"",
        ));

    let mode = std::fs::metadata(&report.script).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o755);
    assert_eq!(host.tools(), vec!["xorriso", "xorriso"]);
}

#[test]
fn test_stage_events_follow_build_order() {
    let project = TestProject::with_inputs();
    let mut started = Vec::new();

    run_build(&FakeHost::new(), &project.settings(), &mut |event| {
        if let StageEvent::Started(stage) = event {
            started.push(stage);
        }
    })
    .unwrap();

    assert_eq!(started, BUILD_STAGES);
}

#[test]
fn test_missing_post_install_config_stops_before_bootloader() {
    let project = TestProject::with_inputs();
    std::fs::remove_file(project.path().join("post_install_config.json")).unwrap();
    let host = FakeHost::new();

    let err = run_build(&host, &project.settings(), &mut |_| {}).unwrap_err();

    assert!(matches!(
        err,
        PipelineError::MissingInput {
            stage: Stage::PostInstall,
            ..
        }
    ));
    assert!(err.to_string().contains("post_install_config.json"));
    project
        .dir
        .child("iso-extract/isolinux/isolinux.cfg")
        .assert(STOCK_ISOLINUX);
    project
        .dir
        .child("custom-debian-13.iso")
        .assert(predicate::path::missing());
    assert_eq!(host.calls_to("xorriso").len(), 1);
}

#[test]
fn test_malformed_post_install_config_is_rejected() {
    let project = TestProject::with_inputs();
    project.create_file("post_install_config.json", r#"{"packages": ["vim && reboot"]}"#);

    let err = run_build(&FakeHost::new(), &project.settings(), &mut |_| {}).unwrap_err();

    assert!(matches!(err, PipelineError::MalformedInput { .. }));
    assert_eq!(err.stage(), Stage::PostInstall);
}

#[test]
fn test_rerun_prepends_again_without_touching_stock_menu() {
    let project = TestProject::with_inputs();
    let settings = project.settings();

    run_build(&FakeHost::new(), &settings, &mut |_| {}).unwrap();
    let first = project.read_file("iso-extract/isolinux/isolinux.cfg");

    // Re-extraction restores the stock menu before patching
    run_build(&FakeHost::new(), &settings, &mut |_| {}).unwrap();
    let second = project.read_file("iso-extract/isolinux/isolinux.cfg");

    assert_eq!(first, second);
}
