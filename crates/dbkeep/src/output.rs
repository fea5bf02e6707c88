//! Rendering of command results.
//!
//! Plain output is human text without ANSI escapes. JSON output is one
//! object per command on stdout, always carrying an `ok` flag.

use std::path::{Path, PathBuf};

use chrono::SecondsFormat;
use serde_json::{Value, json};

use dbkeep_core::{CatalogEntry, PruneSummary, RestoreReport, ScheduledReport};

/// Output format for command results
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    Plain,
    /// JSON object on stdout
    Json,
}

pub struct Printer {
    format: OutputFormat,
}

impl Printer {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn created(&self, backup_path: &Path) {
        match self.format {
            OutputFormat::Plain => {
                println!("Backup created: {}", backup_path.display());
            }
            OutputFormat::Json => emit(&json!({
                "ok": true,
                "backup_path": path_str(backup_path),
            })),
        }
    }

    pub fn restored(&self, report: &RestoreReport) {
        match self.format {
            OutputFormat::Plain => println!("{}", report.message()),
            OutputFormat::Json => emit(&json!({
                "ok": true,
                "backup_path": path_str(&report.backup_path),
                "target_path": path_str(&report.target_path),
                "safety_copy": report.safety_copy.as_deref().map(path_str),
                "dry_run": report.dry_run,
                "message": report.message(),
            })),
        }
    }

    pub fn listed(&self, dir: &Path, entries: &[CatalogEntry]) {
        match self.format {
            OutputFormat::Plain => {
                if entries.is_empty() {
                    println!("No backups found in {}", dir.display());
                    return;
                }
                for entry in entries {
                    println!("{}", list_line(entry));
                }
            }
            OutputFormat::Json => {
                let backups: Vec<Value> = entries.iter().map(entry_json).collect();
                emit(&json!({
                    "ok": true,
                    "dir": path_str(dir),
                    "count": entries.len(),
                    "backups": backups,
                }));
            }
        }
    }

    pub fn deleted(&self, backup_path: &Path) {
        match self.format {
            OutputFormat::Plain => println!("Backup deleted: {}", backup_path.display()),
            OutputFormat::Json => emit(&json!({
                "ok": true,
                "deleted": path_str(backup_path),
            })),
        }
    }

    pub fn scheduled(&self, report: &ScheduledReport) {
        match self.format {
            OutputFormat::Plain => {
                println!("{}", report.message());
                print_failures(&report.prune);
            }
            OutputFormat::Json => emit(&json!({
                "ok": true,
                "backup_path": path_str(&report.backup_path),
                "max_backups": report.max_backups,
                "pruned": report.pruned(),
                "cleanup_failed": report.cleanup_failed(),
                "removed": paths_json(&report.prune.removed),
                "failures": failures_json(&report.prune),
                "message": report.message(),
            })),
        }
    }

    pub fn pruned(&self, dir: &Path, summary: &PruneSummary) {
        match self.format {
            OutputFormat::Plain => {
                if summary.pruned() {
                    println!(
                        "Removed {} old backup(s) from {}; {} kept.",
                        summary.removed.len(),
                        dir.display(),
                        summary.kept
                    );
                } else {
                    println!(
                        "Nothing to prune in {}; {} kept.",
                        dir.display(),
                        summary.kept
                    );
                }
                print_failures(summary);
            }
            OutputFormat::Json => emit(&json!({
                "ok": true,
                "dir": path_str(dir),
                "removed": paths_json(&summary.removed),
                "kept": summary.kept,
                "failures": failures_json(summary),
            })),
        }
    }

    pub fn verified(&self, backup_path: &Path) {
        match self.format {
            OutputFormat::Plain => println!("Backup is healthy: {}", backup_path.display()),
            OutputFormat::Json => emit(&json!({
                "ok": true,
                "backup_path": path_str(backup_path),
                "healthy": true,
            })),
        }
    }

    /// Report a failed command: stderr for plain, stdout object for JSON.
    pub fn error(&self, err: &anyhow::Error) {
        let core = err.downcast_ref::<dbkeep_core::Error>();
        let remediation = core.and_then(dbkeep_core::Error::remediation);

        match self.format {
            OutputFormat::Plain => {
                eprintln!("Error: {err:#}");
                if let Some(remediation) = remediation {
                    eprint!("{}", remediation.render_plain());
                }
            }
            OutputFormat::Json => emit(&json!({
                "ok": false,
                "error": {
                    "code": core.map_or("error", dbkeep_core::Error::code),
                    "message": format!("{err:#}"),
                    "remediation": remediation,
                },
            })),
        }
    }
}

fn emit(value: &Value) {
    println!("{value:#}");
}

fn path_str(path: &Path) -> String {
    path.display().to_string()
}

fn paths_json(paths: &[PathBuf]) -> Vec<String> {
    paths.iter().map(|p| path_str(p)).collect()
}

fn failures_json(summary: &PruneSummary) -> Vec<Value> {
    summary
        .failures
        .iter()
        .map(|f| json!({ "path": path_str(&f.path), "error": f.error }))
        .collect()
}

fn print_failures(summary: &PruneSummary) {
    for failure in &summary.failures {
        eprintln!(
            "  could not remove {}: {}",
            failure.path.display(),
            failure.error
        );
    }
}

fn list_line(entry: &CatalogEntry) -> String {
    let mut line = format!(
        "{}  {:>8.2} MB  {}",
        entry.date.format("%Y-%m-%d %H:%M:%S"),
        entry.size_mb(),
        entry.filename
    );
    if !entry.description.is_empty() {
        line.push_str("  ");
        line.push_str(&entry.description);
    }
    line
}

fn entry_json(entry: &CatalogEntry) -> Value {
    json!({
        "path": path_str(&entry.path),
        "filename": entry.filename,
        "date": entry.date.to_rfc3339_opts(SecondsFormat::Secs, false),
        "size": entry.size,
        "description": entry.description,
        "original_db": entry.metadata.as_ref().and_then(|m| m.original_db.clone()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Local, TimeZone};

    fn entry(description: &str) -> CatalogEntry {
        let date = Local.with_ymd_and_hms(2026, 7, 4, 9, 30, 0).single().unwrap();
        CatalogEntry {
            path: PathBuf::from("/b/backup_20260704_093000.db"),
            filename: "backup_20260704_093000.db".to_string(),
            date,
            modified: date,
            size: 1024 * 1024,
            description: description.to_string(),
            metadata: None,
        }
    }

    #[test]
    fn list_line_has_date_size_and_description() {
        let line = list_line(&entry("nightly"));
        assert!(line.starts_with("2026-07-04 09:30:00"));
        assert!(line.contains("1.00 MB"));
        assert!(line.ends_with("backup_20260704_093000.db  nightly"));
    }

    #[test]
    fn list_line_omits_empty_description() {
        assert!(list_line(&entry("")).ends_with(".db"));
    }

    #[test]
    fn entry_json_is_stable() {
        let value = entry_json(&entry("x"));
        assert_eq!(value["filename"], "backup_20260704_093000.db");
        assert_eq!(value["size"], 1_048_576);
        assert!(value["original_db"].is_null());
        assert!(value["date"].as_str().unwrap().starts_with("2026-07-04T09:30:00"));
    }
}
