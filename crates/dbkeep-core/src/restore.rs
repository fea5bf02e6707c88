//! Restore a backup over a live database.
//!
//! Stages run strictly in order, and any of them can fail:
//!
//! ```text
//! Validating → SafetyBackup → Overwriting → Done
//! ```
//!
//! Nothing touches the target before validation passes and the safety copy
//! of the current target (if any) is on disk. The final overwrite stages the
//! backup next to the target and renames it into place, so the target is
//! always either the old file or the complete new one.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::creator::{copy_database, default_backup_dir, ensure_dir, snapshot_database};
use crate::integrity::{DatabaseValidator, IntegrityVerdict, SqliteValidator};
use crate::metadata;
use crate::naming::{self, PRE_RESTORE_PREFIX, SIDE_FILE_SUFFIXES};
use crate::{Error, Result};

/// Restore pipeline stage, reported in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreStage {
    Validating,
    SafetyBackup,
    Overwriting,
    Done,
}

impl fmt::Display for RestoreStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Validating => "validating",
            Self::SafetyBackup => "safety_backup",
            Self::Overwriting => "overwriting",
            Self::Done => "done",
        };
        f.write_str(label)
    }
}

/// Options for restore.
#[derive(Debug, Clone, Default)]
pub struct RestoreOptions {
    /// Database to overwrite; recovered from the sidecar when `None`
    pub target: Option<PathBuf>,
    /// Validate and resolve everything, but write nothing
    pub dry_run: bool,
}

/// Result of a restore.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestoreReport {
    /// Backup artifact that was restored
    pub backup_path: PathBuf,
    /// Database that was overwritten
    pub target_path: PathBuf,
    /// Safety copy of the previous target contents (if a target existed)
    pub safety_copy: Option<PathBuf>,
    /// Whether this was a dry-run
    pub dry_run: bool,
}

impl RestoreReport {
    /// Human-readable summary naming the restored target.
    #[must_use]
    pub fn message(&self) -> String {
        let mut message = if self.dry_run {
            format!(
                "Dry run: '{}' would be restored to '{}'.",
                self.backup_path.display(),
                self.target_path.display()
            )
        } else {
            format!(
                "Backup restored successfully to '{}'.",
                self.target_path.display()
            )
        };
        if let Some(safety) = &self.safety_copy {
            let verb = if self.dry_run { "would be" } else { "was" };
            message.push_str(&format!(
                " Previous database {verb} saved to '{}'.",
                safety.display()
            ));
        }
        message
    }
}

/// Restore `backup_path` over `target_path` (or the sidecar's `original_db`).
pub fn restore_backup(backup_path: &Path, target_path: Option<&Path>) -> Result<RestoreReport> {
    let opts = RestoreOptions {
        target: target_path.map(Path::to_path_buf),
        dry_run: false,
    };
    restore_with_options(backup_path, &opts)
}

/// Restore with explicit [`RestoreOptions`] (target override, dry-run).
pub fn restore_with_options(backup_path: &Path, opts: &RestoreOptions) -> Result<RestoreReport> {
    restore_with(&SqliteValidator, backup_path, opts, Local::now())
}

/// Restore using an explicit validator and clock.
pub fn restore_with(
    validator: &dyn DatabaseValidator,
    backup_path: &Path,
    opts: &RestoreOptions,
    now: DateTime<Local>,
) -> Result<RestoreReport> {
    let span = tracing::info_span!("restore", backup = %backup_path.display());
    let _guard = span.enter();

    tracing::debug!(stage = %RestoreStage::Validating, "Restore stage");
    verify_with(validator, backup_path)?;

    let target = resolve_target(backup_path, opts.target.as_deref())?;
    ensure_distinct(backup_path, &target)?;
    let safety_copy = target.is_file().then(|| safety_copy_path(&target, now));

    if opts.dry_run {
        return Ok(RestoreReport {
            backup_path: backup_path.to_path_buf(),
            target_path: target,
            safety_copy,
            dry_run: true,
        });
    }

    tracing::debug!(stage = %RestoreStage::SafetyBackup, "Restore stage");
    if let Some(safety) = &safety_copy {
        if let Some(dir) = safety.parent() {
            ensure_dir(dir)?;
        }
        snapshot_database(&target, safety)?;
        tracing::info!(safety_copy = %safety.display(), "Saved pre-restore copy");
    }

    tracing::debug!(stage = %RestoreStage::Overwriting, "Restore stage");
    replace_file(backup_path, &target)?;

    tracing::info!(
        stage = %RestoreStage::Done,
        target = %target.display(),
        "Backup restored"
    );
    Ok(RestoreReport {
        backup_path: backup_path.to_path_buf(),
        target_path: target,
        safety_copy,
        dry_run: false,
    })
}

/// Check that `backup_path` exists and is a healthy SQLite database.
pub fn verify_backup(backup_path: &Path) -> Result<()> {
    verify_with(&SqliteValidator, backup_path)
}

/// Check `backup_path` with an explicit validator.
pub fn verify_with(validator: &dyn DatabaseValidator, backup_path: &Path) -> Result<()> {
    if !backup_path.is_file() {
        return Err(Error::NotFound(format!(
            "Backup file '{}'",
            backup_path.display()
        )));
    }

    match validator.validate(backup_path) {
        IntegrityVerdict::Healthy => Ok(()),
        IntegrityVerdict::Corrupt(details) => Err(Error::CorruptBackup {
            path: backup_path.display().to_string(),
            details,
        }),
        IntegrityVerdict::InvalidFormat(details) => Err(Error::InvalidFormat {
            path: backup_path.display().to_string(),
            details,
        }),
    }
}

/// Resolve the restore target: explicit wins, else the sidecar's `original_db`.
pub fn resolve_target(backup_path: &Path, explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(target) = explicit.filter(|t| !t.as_os_str().is_empty()) {
        return Ok(target.to_path_buf());
    }

    metadata::read_optional(&naming::sidecar_path(backup_path))
        .and_then(|meta| meta.original_db_path())
        .ok_or_else(|| Error::NoTarget(backup_path.display().to_string()))
}

/// Where the safety copy of `target` goes: `<target dir>/backups/pre_restore_<ts>.<ext>`.
#[must_use]
pub fn safety_copy_path(target: &Path, now: DateTime<Local>) -> PathBuf {
    let dir = default_backup_dir(target);
    let ext = naming::extension_of(target);
    dir.join(naming::generate_name_at(PRE_RESTORE_PREFIX, &ext, now))
}

fn ensure_distinct(backup_path: &Path, target: &Path) -> Result<()> {
    if !target.exists() {
        return Ok(());
    }
    let same = match (fs::canonicalize(backup_path), fs::canonicalize(target)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    };
    if same {
        return Err(Error::TargetIsBackup(target.display().to_string()));
    }
    Ok(())
}

/// Copy `src` next to `target`, drop stale side files, then rename over `target`.
fn replace_file(src: &Path, target: &Path) -> Result<()> {
    let parent = target
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent).map_err(|e| {
        Error::io(
            format!("Failed to create restore directory {}", parent.display()),
            e,
        )
    })?;

    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "database".to_string());
    let staging = parent.join(format!(".{name}.restore.tmp"));
    if let Err(e) = copy_database(src, &staging) {
        let _ = fs::remove_file(&staging);
        return Err(e);
    }

    remove_side_files(target);

    if let Err(e) = fs::rename(&staging, target) {
        let _ = fs::remove_file(&staging);
        return Err(Error::io(
            format!("Failed to replace {}", target.display()),
            e,
        ));
    }
    Ok(())
}

fn remove_side_files(target: &Path) {
    for suffix in SIDE_FILE_SUFFIXES {
        let side = naming::with_suffix(target, suffix);
        if side.exists() {
            if let Err(e) = fs::remove_file(&side) {
                tracing::warn!(path = %side.display(), error = %e, "Failed to remove stale side file");
            }
        }
    }
}
