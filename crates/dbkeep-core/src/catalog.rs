//! Newest-first listing of the backups in a directory.
//!
//! Listing never fails outward. A missing directory is created and lists as
//! empty; a sidecar that is missing, malformed, or partial falls back to
//! filesystem values; any other traversal error is logged and yields an
//! empty list.

use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDateTime};
use serde::Serialize;

use crate::creator::ensure_dir;
use crate::metadata::{self, BackupMetadata};
use crate::naming::{self, DEFAULT_EXTENSION};
use crate::{Error, Result};

/// One backup artifact as seen by the catalog.
#[derive(Debug, Clone, Serialize)]
pub struct CatalogEntry {
    /// Full path of the artifact
    pub path: PathBuf,
    /// Artifact file name
    pub filename: String,
    /// Effective creation time: sidecar `backup_date`, else mtime
    pub date: DateTime<Local>,
    /// Filesystem modification time
    pub modified: DateTime<Local>,
    /// Artifact size in bytes
    pub size: u64,
    /// Sidecar description, or empty
    pub description: String,
    /// Parsed sidecar, if one was readable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<BackupMetadata>,
}

impl CatalogEntry {
    /// Size in mebibytes, for display.
    #[must_use]
    pub fn size_mb(&self) -> f64 {
        self.size as f64 / (1024.0 * 1024.0)
    }
}

/// List the backups in `backup_dir`, newest first.
pub fn list_backups(backup_dir: &Path) -> Vec<CatalogEntry> {
    match scan(backup_dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(
                dir = %backup_dir.display(),
                error = %e,
                "Failed to list backups"
            );
            Vec::new()
        }
    }
}

fn scan(backup_dir: &Path) -> Result<Vec<CatalogEntry>> {
    ensure_dir(backup_dir)?;

    let read_dir = fs::read_dir(backup_dir).map_err(|e| {
        Error::io(
            format!("Failed to read backup directory {}", backup_dir.display()),
            e,
        )
    })?;

    let mut entries = Vec::new();
    for entry in read_dir {
        let entry = entry.map_err(|e| {
            Error::io(
                format!("Failed to read backup directory {}", backup_dir.display()),
                e,
            )
        })?;
        let filename = entry.file_name().to_string_lossy().into_owned();
        if !naming::is_artifact_name(&filename, DEFAULT_EXTENSION) {
            continue;
        }

        let path = entry.path();
        let fs_meta = fs::metadata(&path)
            .map_err(|e| Error::io(format!("Failed to stat {}", path.display()), e))?;
        if !fs_meta.is_file() {
            continue;
        }
        let modified: DateTime<Local> = fs_meta
            .modified()
            .map_err(|e| Error::io(format!("Failed to stat {}", path.display()), e))?
            .into();

        entries.push(build_entry(path, filename, modified, fs_meta.len()));
    }

    entries.sort_by(compare_entries);
    Ok(entries)
}

fn build_entry(
    path: PathBuf,
    filename: String,
    modified: DateTime<Local>,
    size: u64,
) -> CatalogEntry {
    let sidecar = metadata::read_optional(&naming::sidecar_path(&path));

    let date = sidecar
        .as_ref()
        .and_then(BackupMetadata::parsed_date)
        .unwrap_or(modified);
    let description = sidecar
        .as_ref()
        .and_then(|m| m.description.clone())
        .unwrap_or_default();

    CatalogEntry {
        path,
        filename,
        date,
        modified,
        size,
        description,
        metadata: sidecar,
    }
}

/// Newest first. Equal dates fall back to the timestamp in the name, then
/// the filename, both descending; names without a timestamp sort last.
fn compare_entries(a: &CatalogEntry, b: &CatalogEntry) -> Ordering {
    b.date
        .cmp(&a.date)
        .then_with(|| name_stamp(b).cmp(&name_stamp(a)))
        .then_with(|| b.filename.cmp(&a.filename))
}

fn name_stamp(entry: &CatalogEntry) -> Option<NaiveDateTime> {
    naming::parse_name(&entry.filename).map(|(_, ts)| ts)
}
