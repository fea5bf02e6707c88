//! Candidate validation before a restore.
//!
//! The database engine is an external collaborator reached through
//! [`DatabaseValidator`]. [`SqliteValidator`] opens the file with rusqlite and
//! runs `PRAGMA integrity_check`.

use std::path::Path;

use rusqlite::{Connection, ErrorCode, OpenFlags};

/// Outcome of validating a candidate database file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrityVerdict {
    /// Opened and passed the integrity check
    Healthy,
    /// Opened as the expected format but the integrity check reported problems
    Corrupt(String),
    /// Could not be opened as the expected format at all
    InvalidFormat(String),
}

/// Validates a candidate backup file.
pub trait DatabaseValidator {
    fn validate(&self, path: &Path) -> IntegrityVerdict;
}

/// SQLite validator backed by `PRAGMA integrity_check`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteValidator;

/// Cap on integrity-check messages carried into the verdict.
const MAX_REPORTED_PROBLEMS: usize = 5;

impl DatabaseValidator for SqliteValidator {
    fn validate(&self, path: &Path) -> IntegrityVerdict {
        let conn = match Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY) {
            Ok(conn) => conn,
            Err(e) => return classify(&e),
        };

        let rows = conn.prepare("PRAGMA integrity_check").and_then(|mut stmt| {
            let rows = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .take(MAX_REPORTED_PROBLEMS)
                .collect::<rusqlite::Result<Vec<String>>>();
            rows
        });

        match rows {
            Ok(rows) if rows.len() == 1 && rows[0] == "ok" => IntegrityVerdict::Healthy,
            Ok(rows) if rows.is_empty() => {
                IntegrityVerdict::Corrupt("integrity check returned no rows".to_string())
            }
            Ok(rows) => IntegrityVerdict::Corrupt(rows.join("; ")),
            Err(e) => classify(&e),
        }
    }
}

fn classify(err: &rusqlite::Error) -> IntegrityVerdict {
    match err.sqlite_error_code() {
        Some(ErrorCode::DatabaseCorrupt) => IntegrityVerdict::Corrupt(err.to_string()),
        _ => IntegrityVerdict::InvalidFormat(err.to_string()),
    }
}
