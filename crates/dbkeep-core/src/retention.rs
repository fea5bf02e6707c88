//! Count-based retention: create a backup, then keep only the newest N.
//!
//! Pruning is best effort. A backup that cannot be removed is reported in
//! the [`PruneSummary`] and logged, and never undoes the backup that was
//! just created.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::catalog::list_backups;
use crate::creator::{create_backup_at, resolve_backup_dir};
use crate::error::ConfigError;
use crate::naming;
use crate::{Error, Result};

/// Default number of backups kept per directory.
pub const DEFAULT_MAX_BACKUPS: u32 = 5;

/// How many backups a directory keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionPolicy {
    max_backups: u32,
}

impl RetentionPolicy {
    /// Keep the newest `max_backups` backups; zero is rejected.
    pub fn new(max_backups: u32) -> Result<Self> {
        if max_backups == 0 {
            return Err(ConfigError::ValidationError(
                "max_backups must be at least 1, got 0".to_string(),
            )
            .into());
        }
        Ok(Self { max_backups })
    }

    #[must_use]
    pub fn max_backups(&self) -> u32 {
        self.max_backups
    }
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            max_backups: DEFAULT_MAX_BACKUPS,
        }
    }
}

/// A backup that could not be removed during pruning.
#[derive(Debug, Clone, Serialize)]
pub struct PruneFailure {
    pub path: PathBuf,
    pub error: String,
}

/// Summary of a retention sweep.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PruneSummary {
    /// Artifacts removed, oldest last
    pub removed: Vec<PathBuf>,
    /// Entries left in the directory
    pub kept: usize,
    /// Entries that should have been removed but were not
    pub failures: Vec<PruneFailure>,
}

impl PruneSummary {
    #[must_use]
    pub fn pruned(&self) -> bool {
        !self.removed.is_empty()
    }

    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Outcome of [`create_scheduled_backup`].
#[derive(Debug, Clone, Serialize)]
pub struct ScheduledReport {
    /// The backup just created
    pub backup_path: PathBuf,
    pub max_backups: u32,
    pub prune: PruneSummary,
}

impl ScheduledReport {
    #[must_use]
    pub fn pruned(&self) -> bool {
        self.prune.pruned()
    }

    /// The backup exists but some old backups could not be removed.
    #[must_use]
    pub fn cleanup_failed(&self) -> bool {
        !self.prune.is_clean()
    }

    #[must_use]
    pub fn message(&self) -> String {
        let created = format!("Backup created at '{}'", self.backup_path.display());
        if self.cleanup_failed() {
            format!(
                "{created}, but cleaning up old backups failed for {} file(s).",
                self.prune.failures.len()
            )
        } else if self.pruned() {
            format!(
                "{created}. Removed {} old backup(s), keeping the newest {}.",
                self.prune.removed.len(),
                self.max_backups
            )
        } else {
            format!("{created}.")
        }
    }
}

/// Delete a backup artifact and its sidecar (if present).
pub fn delete_backup(backup_path: &Path) -> Result<()> {
    if !backup_path.is_file() {
        return Err(Error::NotFound(format!(
            "Backup file '{}'",
            backup_path.display()
        )));
    }

    fs::remove_file(backup_path).map_err(|e| {
        Error::io(format!("Failed to delete {}", backup_path.display()), e)
    })?;

    let sidecar = naming::sidecar_path(backup_path);
    if sidecar.symlink_metadata().is_ok() {
        fs::remove_file(&sidecar)
            .map_err(|e| Error::io(format!("Failed to delete {}", sidecar.display()), e))?;
    }

    tracing::info!(backup = %backup_path.display(), "Backup deleted");
    Ok(())
}

/// Remove every backup in `backup_dir` beyond the newest `max_backups`.
pub fn prune_backups(backup_dir: &Path, policy: RetentionPolicy) -> PruneSummary {
    let entries = list_backups(backup_dir);
    let keep = policy.max_backups() as usize;
    if entries.len() <= keep {
        return PruneSummary {
            removed: Vec::new(),
            kept: entries.len(),
            failures: Vec::new(),
        };
    }

    let mut summary = PruneSummary::default();
    for entry in entries.iter().skip(keep) {
        match delete_backup(&entry.path) {
            Ok(()) => summary.removed.push(entry.path.clone()),
            Err(e) => {
                tracing::warn!(
                    path = %entry.path.display(),
                    error = %e,
                    "Failed to remove rotated backup"
                );
                summary.failures.push(PruneFailure {
                    path: entry.path.clone(),
                    error: e.to_string(),
                });
            }
        }
    }
    // An artifact removed before its sidecar failed is gone, not kept.
    summary.kept = entries.iter().filter(|e| e.path.is_file()).count();

    tracing::info!(
        dir = %backup_dir.display(),
        removed = summary.removed.len(),
        kept = summary.kept,
        failed = summary.failures.len(),
        "Pruned backups"
    );
    summary
}

/// Create a backup of `db_path`, then prune `backup_dir` to `policy`.
pub fn create_scheduled_backup(
    db_path: &Path,
    backup_dir: Option<&Path>,
    policy: RetentionPolicy,
) -> Result<ScheduledReport> {
    create_scheduled_backup_at(db_path, backup_dir, policy, Local::now())
}

/// [`create_scheduled_backup`] stamped with `now`.
pub fn create_scheduled_backup_at(
    db_path: &Path,
    backup_dir: Option<&Path>,
    policy: RetentionPolicy,
    now: DateTime<Local>,
) -> Result<ScheduledReport> {
    let backup_dir = resolve_backup_dir(db_path, backup_dir);
    let backup_path = create_backup_at(db_path, Some(&backup_dir), now)?;
    let prune = prune_backups(&backup_dir, policy);

    Ok(ScheduledReport {
        backup_path,
        max_backups: policy.max_backups(),
        prune,
    })
}
