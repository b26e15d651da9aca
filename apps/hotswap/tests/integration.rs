//! Integration tests for the hotswap CLI

use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

fn hotswap() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_hotswap"));
    for var in [
        "HOTSWAP_SERVICE_NAME",
        "HOTSWAP_CHECK_PERIOD",
        "HOTSWAP_OVERLAPPING",
        "HOTSWAP_FEED_DIR",
        "HOTSWAP_LOG_DIR",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

fn write_config(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("config.toml");
    let contents = format!(
        "[service]\nname = \"agent\"\n\n[logging]\ndirectory = \"{}\"\n",
        dir.join("logs").display()
    );
    std::fs::write(&path, contents).unwrap();
    path
}

#[test]
fn test_cli_version() {
    let output = hotswap().arg("--version").output().expect("Failed to execute hotswap");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("hotswap"));
}

#[test]
fn test_cli_help() {
    let output = hotswap().arg("--help").output().expect("Failed to execute hotswap");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("install"));
    assert!(stdout.contains("uninstall"));
    assert!(stdout.contains("updated"));
}

#[test]
fn test_cli_invalid_command() {
    let output = hotswap()
        .arg("invalid-command")
        .output()
        .expect("Failed to execute hotswap");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unrecognized subcommand"));
}

#[test]
fn test_marker_commands_exit_cleanly() {
    for marker in ["firstrun", "obsolete"] {
        let status = hotswap()
            .args(["--config", "/nonexistent/hotswap.toml", marker])
            .status()
            .expect("Failed to execute hotswap");
        assert_eq!(status.code(), Some(0), "{marker}");
    }
}

#[test]
fn test_missing_config_file_fails() {
    let status = hotswap()
        .args(["--config", "/nonexistent/hotswap.toml", "uninstall"])
        .status()
        .expect("Failed to execute hotswap");
    assert_eq!(status.code(), Some(1));
}

#[test]
fn test_invalid_version_is_rejected_before_touching_services() {
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path());

    let output = hotswap()
        .arg("--config")
        .arg(&config)
        .args(["install", "not-a-version"])
        .output()
        .expect("Failed to execute hotswap");

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Invalid arguments"));
}

#[test]
fn test_invalid_env_override_fails() {
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path());

    let status = hotswap()
        .arg("--config")
        .arg(&config)
        .arg("uninstall")
        .env("HOTSWAP_CHECK_PERIOD", "often")
        .status()
        .expect("Failed to execute hotswap");
    assert_eq!(status.code(), Some(1));
}
