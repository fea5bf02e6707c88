//! CLI command contract tests
//!
//! Runs the `dbkeep` binary against temp directories holding real SQLite
//! files.
//!
//! Contract guarantees tested:
//! - Exit code 0 on success (including partial-success cleanup), 1 on failure
//! - Stable JSON schema in `--format json` mode
//! - No ANSI escapes on stdout in `--format plain` mode
//! - Actionable error messages for failure paths

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

// =============================================================================
// Test fixture helpers
// =============================================================================

/// Temp dir with a small live database at `<dir>/live.db`.
fn setup_db() -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("create temp dir");
    let db_path = dir.path().join("live.db");
    let conn = rusqlite::Connection::open(&db_path).expect("open DB");
    conn.execute_batch(
        "CREATE TABLE items (id INTEGER PRIMARY KEY, name TEXT);
         INSERT INTO items (name) VALUES ('alpha'), ('beta');",
    )
    .expect("seed DB");
    drop(conn);
    (dir, db_path)
}

/// Build a dbkeep command isolated from ambient config.
#[allow(deprecated)]
fn dbkeep_cmd(cwd: &Path) -> Command {
    let mut cmd = Command::cargo_bin("dbkeep").expect("dbkeep binary should be built");
    cmd.current_dir(cwd);
    cmd.env_remove("DBKEEP_CONFIG");
    cmd.env_remove("RUST_LOG");
    cmd
}

fn parse_json(stdout: &[u8]) -> serde_json::Value {
    serde_json::from_slice(stdout).expect("stdout should be a JSON object")
}

/// Assert that output contains no ANSI escape sequences.
fn assert_no_ansi(output: &str, context: &str) {
    assert!(
        !output.contains("\x1b["),
        "{context}: output should not contain ANSI escapes, got:\n{output}"
    );
}

fn create_json(cwd: &Path, db: &Path) -> PathBuf {
    let output = dbkeep_cmd(cwd)
        .args(["create", "--format", "json"])
        .arg(db)
        .output()
        .expect("dbkeep create should execute");
    assert!(output.status.success(), "create failed: {output:?}");
    let json = parse_json(&output.stdout);
    PathBuf::from(json["backup_path"].as_str().expect("backup_path"))
}

fn add_row(db: &Path, name: &str) {
    let conn = rusqlite::Connection::open(db).expect("open DB");
    conn.execute("INSERT INTO items (name) VALUES (?1)", [name])
        .expect("insert");
}

// =============================================================================
// dbkeep create
// =============================================================================

#[test]
fn contract_create_plain() {
    let (dir, db) = setup_db();
    let output = dbkeep_cmd(dir.path())
        .arg("create")
        .arg(&db)
        .output()
        .expect("dbkeep create should execute");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());
    assert_no_ansi(&stdout, "dbkeep create (plain)");
    assert!(stdout.starts_with("Backup created: "), "stdout: {stdout}");

    let backups = dir.path().join("backups");
    assert_eq!(fs::read_dir(&backups).unwrap().count(), 2);
}

#[test]
fn contract_create_json_schema() {
    let (dir, db) = setup_db();
    let backup = create_json(dir.path(), &db);

    assert!(backup.starts_with(dir.path().join("backups")));
    assert_eq!(fs::read(&backup).unwrap(), fs::read(&db).unwrap());
    assert!(PathBuf::from(format!("{}.json", backup.display())).is_file());
}

#[test]
fn contract_create_explicit_dir() {
    let (dir, db) = setup_db();
    let target_dir = dir.path().join("elsewhere").join("nested");

    dbkeep_cmd(dir.path())
        .arg("create")
        .arg(&db)
        .arg("--dir")
        .arg(&target_dir)
        .assert()
        .success();

    assert_eq!(fs::read_dir(&target_dir).unwrap().count(), 2);
}

#[test]
fn contract_create_missing_db_fails() {
    let dir = TempDir::new().unwrap();
    dbkeep_cmd(dir.path())
        .args(["create", "missing.db"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Not found"))
        .stderr(predicate::str::contains("To fix:"));
}

#[test]
fn contract_create_without_db_is_actionable() {
    let dir = TempDir::new().unwrap();
    dbkeep_cmd(dir.path())
        .arg("create")
        .assert()
        .failure()
        .stderr(predicate::str::contains("backup.db_path"));
}

#[test]
fn contract_create_uses_config_file() {
    let (dir, db) = setup_db();
    let backups = dir.path().join("from-config");
    fs::write(
        dir.path().join("dbkeep.toml"),
        format!(
            "[backup]\ndb_path = \"{}\"\ndir = \"{}\"\n",
            db.display(),
            backups.display()
        ),
    )
    .unwrap();

    dbkeep_cmd(dir.path()).arg("create").assert().success();
    assert_eq!(fs::read_dir(&backups).unwrap().count(), 2);
}

#[test]
fn contract_invalid_config_fails() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("bad.toml");
    fs::write(&config, "[backup]\nmax_backups = 0\n").unwrap();

    let output = dbkeep_cmd(dir.path())
        .args(["list", ".", "--format", "json", "--config"])
        .arg(&config)
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let json = parse_json(&output.stdout);
    assert_eq!(json["ok"], false);
    assert_eq!(json["error"]["code"], "config");
}

// =============================================================================
// dbkeep list
// =============================================================================

#[test]
fn contract_list_empty_creates_dir() {
    let dir = TempDir::new().unwrap();
    let backups = dir.path().join("backups");

    dbkeep_cmd(dir.path())
        .arg("list")
        .arg(&backups)
        .assert()
        .success()
        .stdout(predicate::str::contains("No backups found"));
    assert!(backups.is_dir());
}

#[test]
fn contract_list_json_newest_first() {
    let (dir, db) = setup_db();
    let first = create_json(dir.path(), &db);
    std::thread::sleep(std::time::Duration::from_millis(1100));
    let second = create_json(dir.path(), &db);

    let output = dbkeep_cmd(dir.path())
        .args(["list", "--format", "json", "--db"])
        .arg(&db)
        .output()
        .unwrap();
    assert!(output.status.success());

    let json = parse_json(&output.stdout);
    assert_eq!(json["ok"], true);
    assert_eq!(json["count"], 2);
    let backups = json["backups"].as_array().unwrap();
    assert_eq!(backups[0]["path"], second.display().to_string());
    assert_eq!(backups[1]["path"], first.display().to_string());
    for entry in backups {
        for key in ["path", "filename", "date", "size", "description", "original_db"] {
            assert!(entry.get(key).is_some(), "missing key {key} in {entry}");
        }
    }
}

#[test]
fn contract_list_plain_shows_size_and_description() {
    let (dir, db) = setup_db();
    create_json(dir.path(), &db);

    let output = dbkeep_cmd(dir.path())
        .arg("list")
        .arg(dir.path().join("backups"))
        .output()
        .unwrap();
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert_no_ansi(&stdout, "dbkeep list (plain)");
    assert!(stdout.contains(" MB  backup_"), "stdout: {stdout}");
    assert!(stdout.contains("Automatic backup from"), "stdout: {stdout}");
}

// =============================================================================
// dbkeep restore / verify
// =============================================================================

#[test]
fn contract_restore_recovers_target_from_metadata() {
    let (dir, db) = setup_db();
    let backup = create_json(dir.path(), &db);
    let backed_up = fs::read(&backup).unwrap();
    add_row(&db, "after backup");

    let output = dbkeep_cmd(dir.path())
        .args(["restore", "--format", "json"])
        .arg(&backup)
        .output()
        .unwrap();
    assert!(output.status.success(), "restore failed: {output:?}");

    let json = parse_json(&output.stdout);
    assert_eq!(json["ok"], true);
    assert_eq!(json["dry_run"], false);
    let safety = PathBuf::from(json["safety_copy"].as_str().unwrap());
    assert!(
        safety
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("pre_restore_")
    );
    assert!(safety.is_file());
    assert_eq!(fs::read(&db).unwrap(), backed_up);
}

#[test]
fn contract_restore_dry_run_changes_nothing() {
    let (dir, db) = setup_db();
    let backup = create_json(dir.path(), &db);
    add_row(&db, "keep");
    let live = fs::read(&db).unwrap();

    dbkeep_cmd(dir.path())
        .arg("restore")
        .arg(&backup)
        .arg("--dry-run")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("Dry run:"));

    assert_eq!(fs::read(&db).unwrap(), live);
}

#[test]
fn contract_restore_invalid_backup_fails() {
    let (dir, db) = setup_db();
    let bogus = dir.path().join("bogus.db");
    fs::write(&bogus, b"this is not a database at all, just text").unwrap();
    let live = fs::read(&db).unwrap();

    let output = dbkeep_cmd(dir.path())
        .args(["restore", "--format", "json"])
        .arg(&bogus)
        .arg("--target")
        .arg(&db)
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let json = parse_json(&output.stdout);
    assert_eq!(json["error"]["code"], "invalid_format");
    assert!(json["error"]["remediation"]["summary"].is_string());
    assert_eq!(fs::read(&db).unwrap(), live);
}

#[test]
fn contract_restore_without_target_or_metadata() {
    let (dir, db) = setup_db();
    dbkeep_cmd(dir.path())
        .arg("restore")
        .arg(&db)
        .assert()
        .failure()
        .stderr(predicate::str::contains("--target"));
}

#[test]
fn contract_verify() {
    let (dir, db) = setup_db();
    let backup = create_json(dir.path(), &db);

    dbkeep_cmd(dir.path())
        .arg("verify")
        .arg(&backup)
        .assert()
        .success()
        .stdout(predicate::str::contains("healthy"));

    let bogus = dir.path().join("bogus.db");
    fs::write(&bogus, b"corrupted").unwrap();
    dbkeep_cmd(dir.path())
        .arg("verify")
        .arg(&bogus)
        .assert()
        .failure()
        .code(1);
}

// =============================================================================
// dbkeep delete / scheduled / prune
// =============================================================================

#[test]
fn contract_delete() {
    let (dir, db) = setup_db();
    let backup = create_json(dir.path(), &db);

    dbkeep_cmd(dir.path())
        .arg("delete")
        .arg(&backup)
        .assert()
        .success();
    assert!(!backup.exists());
    assert!(!PathBuf::from(format!("{}.json", backup.display())).exists());

    let output = dbkeep_cmd(dir.path())
        .args(["delete", "--format", "json"])
        .arg(&backup)
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(parse_json(&output.stdout)["error"]["code"], "not_found");
}

#[test]
fn contract_scheduled_prunes_to_max() {
    let (dir, db) = setup_db();
    let mut last = serde_json::Value::Null;
    for i in 0..3 {
        if i > 0 {
            std::thread::sleep(std::time::Duration::from_millis(1100));
        }
        let output = dbkeep_cmd(dir.path())
            .args(["scheduled", "--max", "2", "--format", "json"])
            .arg(&db)
            .output()
            .unwrap();
        assert!(output.status.success(), "scheduled failed: {output:?}");
        last = parse_json(&output.stdout);
    }

    assert_eq!(last["pruned"], true);
    assert_eq!(last["cleanup_failed"], false);
    assert_eq!(last["max_backups"], 2);
    assert_eq!(last["removed"].as_array().unwrap().len(), 1);

    let artifacts = fs::read_dir(dir.path().join("backups"))
        .unwrap()
        .filter(|e| {
            e.as_ref()
                .unwrap()
                .file_name()
                .to_string_lossy()
                .ends_with(".db")
        })
        .count();
    assert_eq!(artifacts, 2);
}

#[test]
fn contract_scheduled_rejects_zero_max() {
    let (dir, db) = setup_db();
    dbkeep_cmd(dir.path())
        .args(["scheduled", "--max", "0"])
        .arg(&db)
        .assert()
        .failure()
        .stderr(predicate::str::contains("max_backups"));
    assert!(!dir.path().join("backups").exists());
}

#[test]
fn contract_scheduled_accepts_large_max() {
    let (dir, db) = setup_db();
    let output = dbkeep_cmd(dir.path())
        .args(["scheduled", "--max", "150", "--format", "json"])
        .arg(&db)
        .output()
        .unwrap();
    assert!(output.status.success(), "scheduled failed: {output:?}");
    let json = parse_json(&output.stdout);
    assert_eq!(json["max_backups"], 150);
    assert_eq!(json["pruned"], false);
}

#[test]
fn contract_prune_plain() {
    let (dir, db) = setup_db();
    create_json(dir.path(), &db);
    std::thread::sleep(std::time::Duration::from_millis(1100));
    create_json(dir.path(), &db);

    dbkeep_cmd(dir.path())
        .arg("prune")
        .arg(dir.path().join("backups"))
        .args(["--max", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed 1 old backup(s)"));

    dbkeep_cmd(dir.path())
        .arg("prune")
        .arg(dir.path().join("backups"))
        .args(["--max", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Nothing to prune"));
}

#[test]
fn contract_help_lists_subcommands() {
    let dir = TempDir::new().unwrap();
    let output = dbkeep_cmd(dir.path()).arg("--help").output().unwrap();
    let stdout = String::from_utf8_lossy(&output.stdout);
    for sub in ["create", "restore", "list", "delete", "scheduled", "prune", "verify"] {
        assert!(stdout.contains(sub), "help should mention {sub}: {stdout}");
    }
}
