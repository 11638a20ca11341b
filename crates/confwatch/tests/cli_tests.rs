//! CLI integration tests.
//!
//! These tests run the built binary against a temporary host.

use confwatch_test_utils::{assert_file_equals, BuiltTestHost, TestHost};
use std::path::Path;
use std::process::{Command, Output};

fn confwatch(config: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_confwatch"))
        .arg("--config")
        .arg(config)
        .args(args)
        .env_remove("CONFWATCH_CONFIG")
        .env_remove("CONFWATCH_DATA_DIR")
        .env_remove("CONFWATCH_LOG_LEVEL")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute command")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn host() -> (BuiltTestHost, std::path::PathBuf) {
    let host = TestHost::new()
        .with_file("app.env", "A=1\n")
        .with_missing("gone.conf")
        .build();
    let config = host.write_config();
    (host, config)
}

#[test]
fn test_version_command() {
    let output = Command::new(env!("CARGO_BIN_EXE_confwatch"))
        .arg("version")
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    assert!(stdout(&output).contains(&format!("confwatch {}", env!("CARGO_PKG_VERSION"))));
}

#[test]
fn test_help_command() {
    let output = Command::new(env!("CARGO_BIN_EXE_confwatch"))
        .arg("--help")
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let stdout = stdout(&output);
    assert!(stdout.contains("roll back configuration files"));
    assert!(stdout.contains("rollback"));
    assert!(stdout.contains("--config"));
}

#[test]
fn test_list_command() {
    let (host, config) = host();

    let output = confwatch(&config, &["list"]);
    assert!(output.status.success());
    let stdout = stdout(&output);
    assert!(stdout.contains(&host.name("app.env")));
    assert!(stdout.contains("missing"));
}

#[test]
fn test_snapshot_history_rollback() {
    let (host, config) = host();
    let file = host.name("app.env");

    // Every watched file; the missing one is skipped.
    let output = confwatch(&config, &["snapshot", "-m", "first"]);
    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.contains(&format!("created for {}", file)));
    assert!(out.contains(&format!("Skipped {}", host.name("gone.conf"))));

    let output = confwatch(&config, &["snapshot", &file]);
    assert!(stdout(&output).contains(&format!("No changes detected in {}", file)));

    host.write_file("app.env", "A=2\n");
    let output = confwatch(&config, &["diff", &file]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("+A=2"));

    confwatch(&config, &["snapshot", &file]);

    let output = confwatch(&config, &["history", &file]);
    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.contains("first"));
    let first_hash = out
        .lines()
        .find(|l| l.trim_start().starts_with("1 "))
        .and_then(|l| l.split_whitespace().nth(1))
        .expect("history lists seq 1")
        .to_string();

    let output = confwatch(&config, &["rollback", &file, &first_hash]);
    assert!(output.status.success());
    assert!(stdout(&output).contains(&format!(
        "Successfully rolled back {} to snapshot {}",
        file,
        &first_hash[..8]
    )));
    assert_file_equals(&host.file("app.env"), "A=1\n");

    let output = confwatch(&config, &["diff", &file]);
    assert!(stdout(&output).contains("No differences"));
}

#[test]
fn test_tag_then_rollback_by_name() {
    let (host, config) = host();
    let file = host.name("app.env");

    let output = confwatch(&config, &["tag", &file, "stable"]);
    assert!(!output.status.success());

    confwatch(&config, &["snapshot", &file]);
    let output = confwatch(&config, &["tag", &file, "stable"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains(&format!("as 'stable' for {}", file)));

    let output = confwatch(&config, &["tag", &file, "stable"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("already exists"));

    host.write_file("app.env", "A=2\n");
    confwatch(&config, &["snapshot", &file]);

    let output = confwatch(&config, &["history", &file]);
    let out = stdout(&output);
    assert!(out.contains("Tags:"));
    assert!(out.contains("stable"));

    let output = confwatch(&config, &["rollback", &file, "stable"]);
    assert!(output.status.success());
    assert_file_equals(&host.file("app.env"), "A=1\n");
}

#[test]
fn test_unknown_file_fails() {
    let (_host, config) = host();

    let output = confwatch(&config, &["history", "/etc/not-watched.conf"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("not-watched.conf"));
}

#[test]
fn test_missing_config_fails() {
    let dir = tempfile::tempdir().unwrap();

    let output = confwatch(&dir.path().join("absent.yml"), &["list"]);
    assert!(!output.status.success());
}

#[test]
fn test_diff_requires_both_bounds() {
    let (host, config) = host();

    let output = confwatch(&config, &["diff", &host.name("app.env"), "--from", "abcd"]);
    assert!(!output.status.success());
}
