#![allow(deprecated)] // Command::cargo_bin

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn arm(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("arm").unwrap();
    cmd.current_dir(dir.path())
        .env_remove("ARMFLOW_CONFIG_PATH")
        .env_remove("ARM_ACCESS_TOKEN")
        .env_remove("ARM_ENDPOINT")
        .env_remove("TF_ACC")
        .env("XDG_CONFIG_HOME", dir.path().join("xdg"))
        .env("HOME", dir.path());
    cmd
}

#[test]
fn test_cli_help() {
    let dir = TempDir::new().unwrap();
    arm(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("mg"))
        .stdout(predicate::str::contains("association"))
        .stdout(predicate::str::contains("vnet"))
        .stdout(predicate::str::contains("subnet"));
}

#[test]
fn test_cli_version() {
    let dir = TempDir::new().unwrap();
    arm(&dir)
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("armflow"))
        .stdout(predicate::str::contains("azurerm_subnet"));
}

#[test]
fn test_reconcile_help() {
    let dir = TempDir::new().unwrap();
    arm(&dir)
        .args(["mg", "reconcile", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--subscription"))
        .stdout(predicate::str::contains("--apply"));
}

#[test]
fn test_association_read_help_shows_id_format() {
    let dir = TempDir::new().unwrap();
    arm(&dir)
        .args(["association", "read", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "/managementGroup/{group}/subscription/{subscription}",
        ));
}

#[test]
fn test_features_defaults() {
    let dir = TempDir::new().unwrap();
    arm(&dir)
        .arg("features")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"purge_soft_delete_on_destroy\": true"))
        .stdout(predicate::str::contains(
            "\"delete_nested_items_during_deletion\": false",
        ));
}

#[test]
fn test_features_from_config_file() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("custom.yaml");
    fs::write(
        &config,
        "features:\n  template_deployment:\n    delete_nested_items_during_deletion: true\n",
    )
    .unwrap();

    arm(&dir)
        .arg("features")
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "\"delete_nested_items_during_deletion\": true",
        ));
}

#[test]
fn test_read_without_token_fails() {
    let dir = TempDir::new().unwrap();
    arm(&dir)
        .args([
            "mg",
            "read",
            "/providers/Microsoft.Management/managementGroups/mg1",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("ARM_ACCESS_TOKEN"));
}

#[test]
fn test_read_rejects_malformed_id() {
    let dir = TempDir::new().unwrap();
    arm(&dir)
        .env("ARM_ACCESS_TOKEN", "token")
        .env("ARM_ENDPOINT", "http://127.0.0.1:9")
        .args(["subnet", "read", "/subscriptions/s1/resourceGroups/rg1"])
        .assert()
        .failure();
}
