//! CLI integration tests using assert_cmd.
//!
//! These tests invoke the actual `ttsd` binary and verify its output.

use assert_cmd::Command;
use predicates::prelude::*;

#[allow(deprecated)]
fn ttsd_cmd() -> Command {
    Command::cargo_bin("ttsd").expect("binary should exist")
}

#[test]
fn test_version_flag() {
    ttsd_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("0.1.0"));
}

#[test]
fn test_help_flag() {
    ttsd_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("validate"))
        .stdout(predicate::str::contains("status"));
}

#[test]
fn test_validate_help_shows_options() {
    ttsd_cmd()
        .args(["validate", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--config"));
}

#[test]
fn test_missing_config_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("no-such-file.toml");
    ttsd_cmd()
        .args(["--config", missing.to_str().unwrap(), "validate"])
        .assert()
        .failure();
}

#[test]
fn test_validate_reports_ok_for_well_formed_timers() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("ttsd.toml");
    std::fs::write(
        &config_path,
        r#"
            [[timer]]
            name = "heartbeat"
            schedule = "0 */5 * * * *"
            command = "true"
        "#,
    )
    .unwrap();

    ttsd_cmd()
        .args(["--config", config_path.to_str().unwrap(), "validate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("heartbeat: OK"));
}

#[test]
fn test_validate_reports_error_for_malformed_schedule() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("ttsd.toml");
    std::fs::write(
        &config_path,
        r#"
            [[timer]]
            name = "broken"
            schedule = "not a schedule"
            command = "true"
        "#,
    )
    .unwrap();

    ttsd_cmd()
        .args(["--config", config_path.to_str().unwrap(), "validate"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("broken: ERROR"));
}

#[test]
fn test_status_reports_no_status_before_any_run() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("ttsd.toml");
    let status_path = dir.path().join("status.json");
    std::fs::write(
        &config_path,
        r#"
            [[timer]]
            name = "heartbeat"
            schedule = "0 */5 * * * *"
            command = "true"
        "#,
    )
    .unwrap();

    ttsd_cmd()
        .args([
            "--config",
            config_path.to_str().unwrap(),
            "--status-file",
            status_path.to_str().unwrap(),
            "status",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("heartbeat: no status recorded yet"));
}
