//! Focused CLI argument parsing tests.

#![allow(deprecated)] // Command::cargo_bin is deprecated but replacement requires newer assert_cmd

use assert_cmd::Command;
use predicates::prelude::*;

fn fleetedge() -> Command {
    let mut cmd = Command::cargo_bin("fleetedge").unwrap();
    cmd.arg("--no-color");
    cmd
}

#[test]
fn version_command_succeeds() {
    fleetedge()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("fleetedge"));
}

#[test]
fn version_flag_shows_version() {
    fleetedge()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("fleetedge"));
}

#[test]
fn help_lists_commands() {
    fleetedge()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("authorize"))
        .stdout(predicate::str::contains("scenarios"))
        .stdout(predicate::str::contains("jit"));
}

#[test]
fn authorize_requires_actor() {
    fleetedge()
        .args([
            "authorize",
            "--action",
            "vehicle:read:telemetry",
            "--resource",
            "veh-ev-van-12",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--actor"));
}

#[test]
fn authorize_rejects_unknown_format() {
    fleetedge()
        .args([
            "authorize",
            "--actor",
            "svc-allianz",
            "--action",
            "vehicle:read:telemetry",
            "--resource",
            "veh-ev-van-12",
            "--format",
            "yaml",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}

#[test]
fn jit_simulate_requires_permission() {
    fleetedge()
        .args(["jit", "simulate", "--actor", "usr-dispatch"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--permission"));
}

#[test]
fn jit_simulate_approve_conflicts_with_deny() {
    fleetedge()
        .args([
            "jit",
            "simulate",
            "--actor",
            "usr-dispatch",
            "--permission",
            "vehicle:update:route",
            "--approve",
            "--deny",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}

#[test]
fn policy_diff_requires_two_files() {
    fleetedge()
        .args(["policy", "diff", "old.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("required"));
}
