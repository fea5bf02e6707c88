//! Backup artifact naming.
//!
//! Artifacts are named `<prefix>_<YYYYMMDD_HHMMSS>.<ext>` so that a plain
//! lexical sort within one prefix is also a chronological sort. Sidecars
//! append `.json` to the full artifact path.
//!
//! Names are only unique at second granularity per prefix. Two backups
//! taken within the same second under the same prefix share a name and the
//! later copy replaces the earlier one.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDateTime};

/// Extension used for backup artifacts and as fallback for extension-less sources.
pub const DEFAULT_EXTENSION: &str = "db";
/// Prefix for regular backups.
pub const BACKUP_PREFIX: &str = "backup";
/// Prefix for safety copies taken right before a restore.
pub const PRE_RESTORE_PREFIX: &str = "pre_restore";
/// Suffix appended to an artifact path to form its sidecar path.
pub const SIDECAR_SUFFIX: &str = ".json";
/// Name of the default backup directory created next to a database.
pub const BACKUP_DIR_NAME: &str = "backups";
/// SQLite side files that belong to a database file.
pub const SIDE_FILE_SUFFIXES: [&str; 3] = ["-wal", "-shm", "-journal"];

const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
const TIMESTAMP_LEN: usize = 15;

/// Build an artifact filename stamped with the current local time.
#[must_use]
pub fn generate_name(prefix: &str, extension: &str) -> String {
    generate_name_at(prefix, extension, Local::now())
}

/// Build an artifact filename stamped with `now`.
#[must_use]
pub fn generate_name_at(prefix: &str, extension: &str, now: DateTime<Local>) -> String {
    format!("{prefix}_{}.{extension}", now.format(TIMESTAMP_FORMAT))
}

/// Split an artifact filename back into its prefix and timestamp.
///
/// Returns `None` for anything not shaped like `<prefix>_<YYYYMMDD_HHMMSS>.<ext>`.
#[must_use]
pub fn parse_name(filename: &str) -> Option<(String, NaiveDateTime)> {
    let (stem, _ext) = filename.rsplit_once('.')?;
    if stem.len() < TIMESTAMP_LEN + 2 {
        return None;
    }
    let split = stem.len() - TIMESTAMP_LEN;
    if stem.as_bytes()[split - 1] != b'_' {
        return None;
    }
    let prefix = &stem[..split - 1];
    if prefix.is_empty() {
        return None;
    }
    let ts = NaiveDateTime::parse_from_str(&stem[split..], TIMESTAMP_FORMAT).ok()?;
    Some((prefix.to_string(), ts))
}

/// Sidecar metadata path for an artifact (`<artifact>.json`).
#[must_use]
pub fn sidecar_path(artifact: &Path) -> PathBuf {
    with_suffix(artifact, SIDECAR_SUFFIX)
}

/// `path` with `suffix` appended to its full file name.
#[must_use]
pub fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut raw: OsString = path.as_os_str().to_owned();
    raw.push(suffix);
    PathBuf::from(raw)
}

/// Whether `filename` denotes a backup artifact with the given extension.
///
/// Sidecars (`*.db.json`) and hidden staging files never match.
#[must_use]
pub fn is_artifact_name(filename: &str, extension: &str) -> bool {
    if filename.starts_with('.') {
        return false;
    }
    Path::new(filename)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
}

/// Extension of `path`, or [`DEFAULT_EXTENSION`] when it has none.
#[must_use]
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty())
        .unwrap_or(DEFAULT_EXTENSION)
        .to_string()
}
