//! CLI 端到端测试（不需要蓝牙设备）

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;

fn cli() -> Command {
    Command::cargo_bin("disto-cli").unwrap()
}

#[test]
fn help_lists_modes() {
    cli()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("listen"))
        .stdout(predicate::str::contains("shell"))
        .stdout(predicate::str::contains("scan"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn config_set_then_get() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");

    cli()
        .args(["config", "set", "--delay", "2.5", "--separator", ".", "--address", "AA:BB"])
        .arg("--config")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Default delay: 2.5 s"));

    let content = fs::read_to_string(&path).unwrap();
    assert!(content.contains("[default]"));
    assert!(content.contains("delay = 2.5"));

    cli()
        .args(["config", "get", "separator"])
        .arg("--config")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::diff(".\n"));

    cli()
        .args(["config", "get"])
        .arg("--config")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("AA:BB"))
        .stdout(predicate::str::contains("auto_type:    (not set)"));

    cli()
        .args(["config", "check"])
        .arg("--config")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration OK"));
}

#[test]
fn config_set_rejects_negative_delay() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");

    cli()
        .args(["config", "set", "--delay=-1"])
        .arg("--config")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid configuration"));

    assert!(!path.exists());
}

#[test]
fn config_check_reports_bad_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "[default]\nscan_timeout = 0.0\n").unwrap();

    cli()
        .args(["config", "check"])
        .arg("--config")
        .arg(&path)
        .assert()
        .failure()
        .stdout(predicate::str::contains("scan_timeout"));
}

#[test]
fn unknown_config_key_fails() {
    let dir = tempfile::tempdir().unwrap();
    cli()
        .args(["config", "get", "color"])
        .arg("--config")
        .arg(dir.path().join("config.toml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown config key"));
}

#[test]
fn listen_rejects_invalid_delay_before_scanning() {
    let dir = tempfile::tempdir().unwrap();
    cli()
        .args(["listen", "--delay=-2"])
        .arg("--config")
        .arg(dir.path().join("config.toml"))
        .assert()
        .failure()
        .stdout(predicate::str::contains("Scanning").not());
}
