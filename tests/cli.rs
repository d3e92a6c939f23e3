//! CLI smoke tests

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn posvault(temp: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("posvault").unwrap();
    cmd.env("POSVAULT_DATA_DIR", temp.path());
    cmd
}

#[test]
fn init_creates_data_directory() {
    let temp = TempDir::new().unwrap();

    posvault(&temp)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized vault"));

    assert!(temp.path().join("data").join("products.json").exists());
    assert!(temp.path().join("data").join("sales.json").exists());
}

#[test]
fn config_shows_paths() {
    let temp = TempDir::new().unwrap();

    posvault(&temp)
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("Data directory"));
}

#[test]
fn stats_lists_collections() {
    let temp = TempDir::new().unwrap();

    posvault(&temp)
        .arg("stats")
        .assert()
        .success()
        .stdout(predicate::str::contains("products"))
        .stdout(predicate::str::contains("backups"));
}

#[test]
fn backup_create_then_list() {
    let temp = TempDir::new().unwrap();

    posvault(&temp)
        .args(["backup", "create"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Backup created"));

    posvault(&temp)
        .args(["backup", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Total: 1 backup(s)"));
}

#[test]
fn backup_restore_requires_force() {
    let temp = TempDir::new().unwrap();

    posvault(&temp).args(["backup", "create"]).assert().success();

    posvault(&temp)
        .args(["backup", "restore", "latest"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--force"));

    posvault(&temp)
        .args(["backup", "restore", "latest", "--force"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Restored"));
}

#[test]
fn key_validate_and_export() {
    let temp = TempDir::new().unwrap();

    posvault(&temp)
        .args(["key", "validate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Key OK"));

    // Exported key is 32 bytes of base64
    posvault(&temp)
        .args(["key", "export"])
        .assert()
        .success()
        .stdout(predicate::str::is_match("^[A-Za-z0-9+/]{43}=\n$").unwrap());
}

#[test]
fn data_export_import_round_trip() {
    let temp = TempDir::new().unwrap();
    let out = temp.path().join("export.json");

    posvault(&temp)
        .args(["data", "export"])
        .arg(&out)
        .assert()
        .success();

    posvault(&temp)
        .args(["data", "import"])
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("Imported"));
}

#[test]
fn unknown_backup_id_fails() {
    let temp = TempDir::new().unwrap();

    posvault(&temp)
        .args(["backup", "validate", "no-such-id"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}
