//! JSON sidecar metadata for backup artifacts.
//!
//! Every key is optional on read: sidecars carry no schema version, so a
//! sidecar missing keys (or carrying extra ones) still parses and the
//! catalog falls back to filesystem defaults for whatever is absent.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Provenance recorded next to each backup artifact.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupMetadata {
    /// Absolute path of the source database when the backup was taken
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_db: Option<String>,
    /// ISO-8601 creation timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_date: Option<String>,
    /// Human-readable label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl BackupMetadata {
    /// Metadata for a backup of `original_db` taken at `created_at`.
    #[must_use]
    pub fn new(
        original_db: impl Into<String>,
        created_at: DateTime<Local>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            original_db: Some(original_db.into()),
            backup_date: Some(format_backup_date(created_at)),
            description: Some(description.into()),
        }
    }

    /// `backup_date` parsed as a local timestamp, if present and parseable.
    #[must_use]
    pub fn parsed_date(&self) -> Option<DateTime<Local>> {
        self.backup_date.as_deref().and_then(parse_backup_date)
    }

    /// `original_db` as a path, ignoring blank values.
    #[must_use]
    pub fn original_db_path(&self) -> Option<PathBuf> {
        self.original_db
            .as_deref()
            .map(str::trim)
            .filter(|raw| !raw.is_empty())
            .map(PathBuf::from)
    }
}

/// Serialize `metadata` as pretty UTF-8 JSON at `path`.
///
/// The JSON is written to a hidden sibling and renamed into place, so
/// readers see either the complete sidecar or none at all.
pub fn write(metadata: &BackupMetadata, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(metadata).map_err(|e| Error::Parse {
        path: path.display().to_string(),
        source: e,
    })?;

    let staging = staging_path(path);
    fs::write(&staging, json.as_bytes()).map_err(|e| {
        Error::io(
            format!("Failed to write metadata {}", staging.display()),
            e,
        )
    })?;

    if let Err(e) = fs::rename(&staging, path) {
        let _ = fs::remove_file(&staging);
        return Err(Error::io(
            format!("Failed to write metadata {}", path.display()),
            e,
        ));
    }
    Ok(())
}

/// Read and parse the sidecar at `path`.
///
/// `NotFound` when the file is absent, `Parse` when it is not valid JSON.
pub fn read(path: &Path) -> Result<BackupMetadata> {
    let data = fs::read_to_string(path).map_err(|e| {
        if e.kind() == io::ErrorKind::NotFound {
            Error::NotFound(format!("Metadata file '{}'", path.display()))
        } else {
            Error::io(format!("Failed to read metadata {}", path.display()), e)
        }
    })?;

    serde_json::from_str(&data).map_err(|e| Error::Parse {
        path: path.display().to_string(),
        source: e,
    })
}

/// Advisory read: any failure means "no metadata available".
pub fn read_optional(path: &Path) -> Option<BackupMetadata> {
    match read(path) {
        Ok(metadata) => Some(metadata),
        Err(Error::NotFound(_)) => None,
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "Ignoring unreadable metadata");
            None
        }
    }
}

/// Format a creation timestamp the way sidecars store it (RFC 3339, micros).
#[must_use]
pub fn format_backup_date(value: DateTime<Local>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, false)
}

/// Parse a sidecar `backup_date`.
///
/// Accepts RFC 3339 with an offset, naive `YYYY-MM-DDTHH:MM:SS[.ffffff]`
/// (also with a space separator) read as local time, and bare dates.
#[must_use]
pub fn parse_backup_date(raw: &str) -> Option<DateTime<Local>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Local));
    }

    const NAIVE_FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
    ];
    let naive = NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })?;

    // Use `earliest()` to handle ambiguous DST fall-back times.
    Local.from_local_datetime(&naive).earliest()
}

fn staging_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.tmp"))
}
