//! End-to-end CLI tests for the filegate binary.

use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// A command isolated from any user config, pointed at `db`.
fn filegate(home: &Path, db: &Path) -> Command {
    let mut cmd = Command::cargo_bin("filegate").unwrap();
    cmd.env("XDG_CONFIG_HOME", home)
        .env("HOME", home)
        .env_remove("RUST_LOG")
        .arg("--db")
        .arg(db);
    cmd
}

fn workspace() -> (TempDir, std::path::PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let db = temp_dir.path().join("records.db");
    (temp_dir, db)
}

#[test]
fn test_binary_help_displays_usage() {
    let mut cmd = Command::cargo_bin("filegate").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Conditional access"));
}

#[test]
fn test_binary_without_subcommand_fails() {
    let mut cmd = Command::cargo_bin("filegate").unwrap();
    cmd.assert().failure();
}

#[test]
fn test_check_unknown_url_is_denied() {
    let (dir, db) = workspace();
    filegate(dir.path(), &db)
        .args(["check", "docs", "manual.pdf"])
        .assert()
        .success()
        .stdout(predicate::str::contains("denied (not_found)"));
}

#[test]
fn test_quota_flow_disables_url() {
    let (dir, db) = workspace();
    filegate(dir.path(), &db)
        .args(["category", "set", "docs", "--public", "true"])
        .assert()
        .success()
        .stdout(predicate::str::contains("category 'docs' saved"));
    filegate(dir.path(), &db)
        .args(["file", "set", "manual.pdf", "--size", "1024"])
        .assert()
        .success();
    filegate(dir.path(), &db)
        .args([
            "url", "set", "docs", "manual.pdf", "--enabled", "true", "--count", "1",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("url 'docs/manual.pdf' saved"));

    filegate(dir.path(), &db)
        .args(["check", "docs", "manual.pdf"])
        .assert()
        .success()
        .stdout(predicate::str::diff("allowed\n"));

    filegate(dir.path(), &db)
        .args(["record-download", "docs", "manual.pdf"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "url=updated category=updated file=updated",
        ))
        .stdout(predicate::str::contains(
            "quota used up: docs/manual.pdf is now disabled",
        ));

    filegate(dir.path(), &db)
        .args(["check", "docs", "manual.pdf"])
        .assert()
        .success()
        .stdout(predicate::str::contains("denied (disabled)"));

    filegate(dir.path(), &db)
        .args(["file", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("manual.pdf\tsize=1024\tdownloads=1"));
}

#[test]
fn test_record_download_without_records_succeeds() {
    let (dir, db) = workspace();
    filegate(dir.path(), &db)
        .args(["record-download", "docs", "ghost.bin"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "url=missing category=missing file=missing",
        ));
}

#[test]
fn test_url_set_keeps_existing_fields() {
    let (dir, db) = workspace();
    filegate(dir.path(), &db)
        .args([
            "url",
            "set",
            "docs",
            "manual.pdf",
            "--count",
            "3",
            "--description",
            "first edition",
        ])
        .assert()
        .success();
    filegate(dir.path(), &db)
        .args(["url", "set", "docs", "manual.pdf", "--enabled", "true"])
        .assert()
        .success();

    filegate(dir.path(), &db)
        .args(["url", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "docs/manual.pdf\tenabled=true\tremaining=3\tdownloads=0",
        ));
    filegate(dir.path(), &db)
        .args(["url", "show", "docs/manual.pdf"])
        .assert()
        .success()
        .stdout(predicate::str::contains("first edition"));
}

#[test]
fn test_url_delete_by_key() {
    let (dir, db) = workspace();
    filegate(dir.path(), &db)
        .args(["url", "set", "docs", "manual.pdf"])
        .assert()
        .success();
    filegate(dir.path(), &db)
        .args(["url", "delete", "docs/manual.pdf"])
        .assert()
        .success()
        .stdout(predicate::str::contains("url 'docs/manual.pdf' deleted"));
    filegate(dir.path(), &db)
        .args(["url", "show", "docs/manual.pdf"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("url 'docs/manual.pdf' not found"));
}

#[test]
fn test_url_key_without_separator_is_rejected() {
    let (dir, db) = workspace();
    filegate(dir.path(), &db)
        .args(["url", "delete", "nokey"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid url key 'nokey'"))
        .stderr(predicate::str::contains("Use the form category/filename"));
}

#[test]
fn test_new_url_is_disabled_until_enabled() {
    let (dir, db) = workspace();
    filegate(dir.path(), &db)
        .args(["url", "set", "docs", "manual.pdf"])
        .assert()
        .success();
    filegate(dir.path(), &db)
        .args(["check", "docs", "manual.pdf"])
        .assert()
        .success()
        .stdout(predicate::str::contains("denied (disabled)"));
}

#[test]
fn test_invalid_category_name_is_rejected() {
    let (dir, db) = workspace();
    filegate(dir.path(), &db)
        .args(["category", "set", "bad name!"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Suggestion"));
}

#[test]
fn test_show_missing_category_fails() {
    let (dir, db) = workspace();
    filegate(dir.path(), &db)
        .args(["category", "show", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("category 'nope' not found"));
}

#[test]
fn test_category_list_public_only() {
    let (dir, db) = workspace();
    filegate(dir.path(), &db)
        .args(["category", "set", "open", "--public", "true"])
        .assert()
        .success();
    filegate(dir.path(), &db)
        .args(["category", "set", "hidden"])
        .assert()
        .success();

    filegate(dir.path(), &db)
        .args(["category", "list", "--public"])
        .assert()
        .success()
        .stdout(predicate::str::contains("open"))
        .stdout(predicate::str::contains("hidden").not());
}

#[test]
fn test_delete_then_delete_again_fails() {
    let (dir, db) = workspace();
    filegate(dir.path(), &db)
        .args(["file", "set", "a.txt"])
        .assert()
        .success();
    filegate(dir.path(), &db)
        .args(["file", "delete", "a.txt"])
        .assert()
        .success()
        .stdout(predicate::str::contains("file 'a.txt' deleted"));
    filegate(dir.path(), &db)
        .args(["file", "delete", "a.txt"])
        .assert()
        .failure();
}

#[test]
fn test_config_show_reads_config_file() {
    let (dir, db) = workspace();
    let config_dir = dir.path().join("filegate");
    std::fs::create_dir_all(&config_dir).unwrap();
    std::fs::write(
        config_dir.join("config.toml"),
        "serialize_updates = false\ndb_max_connections = 2 # small pool\n",
    )
    .unwrap();

    filegate(dir.path(), &db)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config_file = loaded"))
        .stdout(predicate::str::contains("serialize_updates = false"))
        .stdout(predicate::str::contains("db_max_connections = 2"))
        .stdout(predicate::str::contains(format!(
            "db_path = {}",
            db.display()
        )));
}

#[test]
fn test_invalid_config_file_fails() {
    let (dir, db) = workspace();
    let config_path = dir.path().join("custom.toml");
    std::fs::write(&config_path, "concurrency = 4\n").unwrap();

    filegate(dir.path(), &db)
        .arg("--config")
        .arg(&config_path)
        .args(["check", "docs", "a.txt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown configuration key"));
}
