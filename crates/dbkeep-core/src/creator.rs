//! Backup creation: copy the live database into a backup directory and
//! record its sidecar metadata.
//!
//! The artifact copy and the sidecar write are two separate steps. If the
//! sidecar write fails the operation fails, but the artifact stays on disk;
//! the catalog treats such an artifact as valid with filesystem defaults.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Local};
use rusqlite::Connection;
use rusqlite::backup::Backup;

use crate::metadata::{self, BackupMetadata};
use crate::naming::{self, BACKUP_DIR_NAME, BACKUP_PREFIX, DEFAULT_EXTENSION};
use crate::{Error, Result};

/// Default backup directory for a database: `<abs dir of db_path>/backups`.
#[must_use]
pub fn default_backup_dir(db_path: &Path) -> PathBuf {
    let absolute = absolute_path(db_path);
    absolute
        .parent()
        .map_or_else(|| PathBuf::from(BACKUP_DIR_NAME), |dir| dir.join(BACKUP_DIR_NAME))
}

/// Resolve an optional caller-supplied backup directory.
#[must_use]
pub fn resolve_backup_dir(db_path: &Path, backup_dir: Option<&Path>) -> PathBuf {
    match backup_dir {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => default_backup_dir(db_path),
    }
}

/// Create a backup of `db_path`, returning the artifact path.
///
/// Writers of the live database should be quiesced first; nothing here
/// locks the file against concurrent modification.
pub fn create_backup(db_path: &Path, backup_dir: Option<&Path>) -> Result<PathBuf> {
    create_backup_at(db_path, backup_dir, Local::now())
}

/// Create a backup of `db_path` stamped with `now`.
pub fn create_backup_at(
    db_path: &Path,
    backup_dir: Option<&Path>,
    now: DateTime<Local>,
) -> Result<PathBuf> {
    let backup_dir = resolve_backup_dir(db_path, backup_dir);
    ensure_dir(&backup_dir)?;

    // Step 1: copy the database byte-for-byte
    let filename = naming::generate_name_at(BACKUP_PREFIX, DEFAULT_EXTENSION, now);
    let backup_path = backup_dir.join(&filename);
    let bytes = copy_database(db_path, &backup_path)?;

    // Step 2: write the sidecar; the artifact is kept even if this fails
    let original_db = absolute_path(db_path);
    let metadata = BackupMetadata::new(
        original_db.display().to_string(),
        now,
        format!("Automatic backup from {}", now.format("%Y-%m-%d %H:%M")),
    );
    let sidecar = naming::sidecar_path(&backup_path);
    if let Err(e) = metadata::write(&metadata, &sidecar) {
        tracing::warn!(
            backup = %backup_path.display(),
            error = %e,
            "Backup copied but metadata write failed"
        );
        return Err(e);
    }

    tracing::info!(
        source = %original_db.display(),
        backup = %backup_path.display(),
        bytes,
        "Backup created"
    );
    Ok(backup_path)
}

/// Create `dir` and any missing parents. An existing directory is fine.
pub fn ensure_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).map_err(|e| {
        Error::io(
            format!("Failed to create backup directory {}", dir.display()),
            e,
        )
    })
}

/// Byte-for-byte copy used for backups and restore safety copies.
pub(crate) fn copy_database(src: &Path, dest: &Path) -> Result<u64> {
    if !src.is_file() {
        return Err(Error::NotFound(format!("Database '{}'", src.display())));
    }
    fs::copy(src, dest).map_err(|e| {
        Error::io(
            format!("Failed to copy {} to {}", src.display(), dest.display()),
            e,
        )
    })
}

/// Consistent snapshot of a live database for restore safety copies.
///
/// Uses SQLite's online backup API so committed pages still sitting in a
/// `-wal` file land in `dest`. A target SQLite cannot open is copied raw,
/// together with any `-wal`, `-shm` or `-journal` file next to it.
pub(crate) fn snapshot_database(src: &Path, dest: &Path) -> Result<()> {
    if !src.is_file() {
        return Err(Error::NotFound(format!("Database '{}'", src.display())));
    }

    match online_backup(src, dest) {
        Ok(()) => Ok(()),
        Err(e) => {
            tracing::warn!(
                source = %src.display(),
                error = %e,
                "Online backup failed, copying raw files"
            );
            let _ = fs::remove_file(dest);
            copy_database(src, dest)?;
            for suffix in naming::SIDE_FILE_SUFFIXES {
                let side = naming::with_suffix(src, suffix);
                if side.is_file() {
                    copy_database(&side, &naming::with_suffix(dest, suffix))?;
                }
            }
            Ok(())
        }
    }
}

fn online_backup(src: &Path, dest: &Path) -> rusqlite::Result<()> {
    let src = Connection::open(src)?;
    let mut dest = Connection::open(dest)?;
    let backup = Backup::new(&src, &mut dest)?;
    backup.run_to_completion(-1, Duration::from_millis(50), None)
}

/// Absolute form of `path` without resolving symlinks.
pub(crate) fn absolute_path(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}
