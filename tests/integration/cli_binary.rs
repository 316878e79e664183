//! Runs the compiled binary against a directory source

use std::path::Path;
use std::process::{Command, Output};

use crate::integration::DeployWorkspace;

fn scriptdeploy(workspace: &Path, config: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_scriptdeploy"))
        .arg("--workspace")
        .arg(workspace)
        .arg("--config")
        .arg(config)
        .arg("--quiet")
        .args(args)
        .env_remove("SCRIPTDEPLOY_LOG")
        .output()
        .unwrap()
}

#[test]
fn test_binary_check_then_adjust() {
    let ws = DeployWorkspace::new();
    ws.publish("7", &[("a.php", "A", "Scripts", "<?php echo 1;")]);
    let config = ws.write_config_file();

    let output = scriptdeploy(ws.root(), &config, &["check", "--format", "json"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["state"], "unclear");
    assert_eq!(value["revision"], "7");

    let output = scriptdeploy(ws.root(), &config, &["adjust"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Adjusted: 1 created"));

    let output = scriptdeploy(ws.root(), &config, &["status", "--format", "json"]);
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["state"], "synced");
    assert_eq!(value["state_code"], 1);
}

#[test]
fn test_binary_reports_errors_on_stderr() {
    let ws = DeployWorkspace::new();
    ws.publish("1", &[]);
    let config = ws.write_config_file();

    let output = scriptdeploy(ws.root(), &config, &["forget", "--yes", "nope.php"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("nope.php"));
}

#[test]
fn test_binary_autoload_requires_force_to_overwrite() {
    let ws = DeployWorkspace::new();
    let autoload = ws.root().join("__autoload.php");
    let new_content = ws.root().join("new_autoload.php");
    std::fs::write(&autoload, "<?php // old").unwrap();
    std::fs::write(&new_content, "<?php // new").unwrap();

    let mut config = ws.config();
    config.logging.enabled = false;
    config.autoload.path = Some(autoload.clone());
    let config_path = ws.root().join("with_autoload.toml");
    std::fs::write(&config_path, toml::to_string_pretty(&config).unwrap()).unwrap();

    let output = scriptdeploy(ws.root(), &config_path, &["autoload", "read"]);
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "<?php // old");

    let from = new_content.to_string_lossy().to_string();
    let output = scriptdeploy(ws.root(), &config_path, &["autoload", "write", "--from", &from]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("--force"));

    let output = scriptdeploy(
        ws.root(),
        &config_path,
        &["autoload", "write", "--from", &from, "--force"],
    );
    assert!(output.status.success());
    assert_eq!(std::fs::read_to_string(&autoload).unwrap(), "<?php // new");
}
