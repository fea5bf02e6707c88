//! Error types for dbkeep-core

use std::fmt::Write;
use std::io;
use thiserror::Error;

/// Remediation command for resolving an error
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RemediationCommand {
    /// Short label describing the command purpose
    pub label: String,
    /// Command to run
    pub command: String,
}

/// Actionable remediation guidance for an error
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Remediation {
    /// One-line summary of how to fix the issue
    pub summary: String,
    /// Suggested commands to resolve or diagnose the issue
    pub commands: Vec<RemediationCommand>,
    /// Additional alternative guidance
    pub alternatives: Vec<String>,
}

impl Remediation {
    /// Create a new remediation with a summary
    #[must_use]
    pub fn new(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            commands: Vec::new(),
            alternatives: Vec::new(),
        }
    }

    /// Add a suggested command
    #[must_use]
    pub fn command(mut self, label: impl Into<String>, command: impl Into<String>) -> Self {
        self.commands.push(RemediationCommand {
            label: label.into(),
            command: command.into(),
        });
        self
    }

    /// Add an alternative suggestion
    #[must_use]
    pub fn alternative(mut self, alternative: impl Into<String>) -> Self {
        self.alternatives.push(alternative.into());
        self
    }

    /// Render remediation text for human-readable output
    #[must_use]
    pub fn render_plain(&self) -> String {
        let mut output = String::new();
        let _ = writeln!(output, "To fix:");
        let _ = writeln!(output, "  {}", self.summary);

        if !self.commands.is_empty() {
            let _ = writeln!(output, "  Commands:");
            for cmd in &self.commands {
                let _ = writeln!(output, "    - {}: {}", cmd.label, cmd.command);
            }
        }

        if !self.alternatives.is_empty() {
            let _ = writeln!(output, "  Alternatives:");
            for alt in &self.alternatives {
                let _ = writeln!(output, "    - {alt}");
            }
        }

        output
    }
}

/// Result type alias using the library's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for dbkeep-core
#[derive(Error, Debug)]
pub enum Error {
    /// Backup artifact or source database does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Candidate file cannot be opened as a SQLite database
    #[error("Not a valid SQLite database: {path} ({details})")]
    InvalidFormat { path: String, details: String },

    /// Candidate file opened but failed the integrity check
    #[error("Backup is corrupt and cannot be restored: {path} ({details})")]
    CorruptBackup { path: String, details: String },

    /// Restore target could not be determined
    #[error("No restore target given and none recorded for backup: {0}")]
    NoTarget(String),

    /// Restore target resolves to the backup artifact itself
    #[error("Restore target is the backup file itself: {0}")]
    TargetIsBackup(String),

    /// Filesystem failures (copy, write, delete, mkdir)
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    /// Malformed sidecar JSON
    #[error("Failed to parse metadata {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

impl Error {
    /// Wrap an I/O error with a human-readable context line.
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Stable machine-readable code for JSON output and exit reporting.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::InvalidFormat { .. } => "invalid_format",
            Self::CorruptBackup { .. } => "corrupt_backup",
            Self::NoTarget(_) => "no_target",
            Self::TargetIsBackup(_) => "target_is_backup",
            Self::Io { .. } => "io",
            Self::Parse { .. } => "parse",
            Self::Config(_) => "config",
        }
    }

    /// Return remediation guidance when available.
    #[must_use]
    pub fn remediation(&self) -> Option<Remediation> {
        match self {
            Self::NotFound(_) => Some(
                Remediation::new("Check the path and retry.")
                    .command("List backups", "dbkeep list <backup_dir>")
                    .alternative("Pass an absolute path to avoid working-directory surprises."),
            ),
            Self::InvalidFormat { .. } => Some(
                Remediation::new("The selected file is not a SQLite database. Pick another backup.")
                    .command("List backups", "dbkeep list <backup_dir>")
                    .command("Verify a backup", "dbkeep verify <backup>"),
            ),
            Self::CorruptBackup { .. } => Some(
                Remediation::new("The backup failed PRAGMA integrity_check. Restore an older backup.")
                    .command("List backups", "dbkeep list <backup_dir>")
                    .alternative("Delete the corrupt backup so retention keeps healthy copies."),
            ),
            Self::NoTarget(_) => Some(
                Remediation::new("Pass the database to restore into explicitly.")
                    .command("Restore", "dbkeep restore <backup> --target <db_path>")
                    .alternative("The backup's .json sidecar is missing or has no original_db."),
            ),
            Self::TargetIsBackup(_) => Some(Remediation::new(
                "Choose a restore target different from the backup file.",
            )),
            Self::Io { .. } => Some(
                Remediation::new("Check filesystem permissions and free space, then retry.")
                    .alternative("Verify the backup directory exists and is writable."),
            ),
            Self::Parse { .. } => Some(
                Remediation::new("The metadata sidecar is not valid JSON.")
                    .alternative("Delete or fix the .json sidecar; the backup itself stays usable."),
            ),
            Self::Config(err) => Some(err.remediation()),
        }
    }
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to read config file {0}: {1}")]
    ReadFailed(String, String),

    #[error("Failed to parse config: {0}")]
    ParseFailed(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl ConfigError {
    #[must_use]
    pub fn remediation(&self) -> Remediation {
        match self {
            Self::FileNotFound(path) => Remediation::new(format!(
                "Config file not found: {path}. Verify the path and retry."
            ))
            .command("Check path", format!("ls -l \"{path}\""))
            .alternative("Pass --config with the correct path."),
            Self::ReadFailed(path, _) => Remediation::new(format!(
                "Failed to read config file: {path}. Check permissions."
            ))
            .command("Check permissions", format!("ls -l \"{path}\""))
            .alternative("Ensure the file is readable by the current user."),
            Self::ParseFailed(_) => Remediation::new("Config parse failed. Fix the TOML syntax.")
                .alternative("Validate the config file format."),
            Self::ValidationError(_) => {
                Remediation::new("A config value is out of range. Adjust it and retry.")
                    .alternative("max_backups must be at least 1.")
            }
        }
    }
}
