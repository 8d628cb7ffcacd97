use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;

fn fast_config() -> tempfile::NamedTempFile {
    let mut f = tempfile::NamedTempFile::new().expect("temp config");
    writeln!(
        f,
        r#"
[control]
frequency_hz = 500
zero_settle_ms = 0

[calibration]
samples = 5
interval_ms = 1
"#
    )
    .expect("write config");
    f
}

#[test]
fn help_mentions_the_controller() {
    Command::cargo_bin("exoctl")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("admittance"));
}

#[test]
fn self_check_passes_in_sim_mode() {
    let cfg = fast_config();
    Command::cargo_bin("exoctl")
        .unwrap()
        .args(["--config", cfg.path().to_str().unwrap(), "self-check", "--sim"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ok"));
}

#[test]
fn tare_prints_an_offset_in_sim_mode() {
    let cfg = fast_config();
    Command::cargo_bin("exoctl")
        .unwrap()
        .args(["--config", cfg.path().to_str().unwrap(), "tare", "--sim"])
        .assert()
        .success()
        .stdout(predicate::str::contains("offset:"));
}

#[test]
fn short_sim_run_writes_a_record_log() {
    let cfg = fast_config();
    let dir = tempfile::tempdir().expect("temp dir");
    let csv_path = dir.path().join("records.csv");
    Command::cargo_bin("exoctl")
        .unwrap()
        .args([
            "--config",
            cfg.path().to_str().unwrap(),
            "run",
            "--sim",
            "--duration",
            "0.3",
            "--no-console",
            "--log-csv",
            csv_path.to_str().unwrap(),
        ])
        .timeout(std::time::Duration::from_secs(30))
        .assert()
        .success();

    let contents = std::fs::read_to_string(&csv_path).expect("csv written");
    let mut lines = contents.lines();
    assert_eq!(
        lines.next(),
        Some("time_s,theta_rad,omega_rad_s,torque_Nm,desired_velocity_rad_s")
    );
    assert!(lines.next().is_some(), "expected at least one record row");
}

#[test]
fn invalid_config_is_rejected_before_running() {
    let mut f = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        f,
        r#"
[admittance]
mass = 0.0
"#
    )
    .unwrap();
    Command::cargo_bin("exoctl")
        .unwrap()
        .args(["--config", f.path().to_str().unwrap(), "self-check", "--sim"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("mass"));
}
