//! Configuration management for dbkeep
//!
//! Handles loading and validation of dbkeep.toml configuration files.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::logging::{LogConfig, LogLevel};
use crate::retention::{DEFAULT_MAX_BACKUPS, RetentionPolicy};
use crate::Result;

/// Environment variable naming an explicit config file
pub const CONFIG_ENV: &str = "DBKEEP_CONFIG";

/// Config file looked up in the working directory
pub const CONFIG_FILE_NAME: &str = "dbkeep.toml";

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-friendly output
    #[default]
    Pretty,
    /// JSON lines
    Json,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pretty => f.write_str("pretty"),
            Self::Json => f.write_str("json"),
        }
    }
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            _ => Err(format!("unknown log format: {s}. Expected pretty or json")),
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// General settings
    #[serde(default)]
    pub general: GeneralConfig,

    /// Backup settings
    #[serde(default)]
    pub backup: BackupConfig,
}

/// General configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log format (pretty, json)
    #[serde(default)]
    pub log_format: LogFormat,

    /// Optional log file, appended to
    #[serde(default)]
    pub log_file: Option<String>,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: LogFormat::default(),
            log_file: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Backup configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupConfig {
    /// Live database used when a command is not given one
    #[serde(default)]
    pub db_path: Option<String>,

    /// Backup directory; defaults to `<db dir>/backups`
    #[serde(default)]
    pub dir: Option<String>,

    /// Backups kept by scheduled runs and `prune`
    #[serde(default = "default_max_backups")]
    pub max_backups: u32,

    /// Whether an external scheduler should run `dbkeep scheduled`
    #[serde(default)]
    pub auto_backup: bool,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            dir: None,
            max_backups: default_max_backups(),
            auto_backup: false,
        }
    }
}

fn default_max_backups() -> u32 {
    DEFAULT_MAX_BACKUPS
}

impl Config {
    /// Load configuration from default locations.
    ///
    /// `explicit` wins, then `$DBKEEP_CONFIG`, then `./dbkeep.toml`; with
    /// none of them present the defaults are used.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load_from(path);
        }

        if let Some(path) = std::env::var_os(CONFIG_ENV).filter(|v| !v.is_empty()) {
            return Self::load_from(Path::new(&path));
        }

        let local = Path::new(CONFIG_FILE_NAME);
        if local.is_file() {
            return Self::load_from(local);
        }

        tracing::debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()).into());
        }
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadFailed(path.display().to_string(), e.to_string()))?;

        let config = Self::from_toml_str(&raw)?;
        tracing::debug!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    /// Parse and validate TOML text.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(raw).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<()> {
        self.general
            .log_level
            .parse::<LogLevel>()
            .map_err(ConfigError::ValidationError)?;
        self.retention_policy()?;
        Ok(())
    }

    pub fn retention_policy(&self) -> Result<RetentionPolicy> {
        RetentionPolicy::new(self.backup.max_backups)
    }

    /// Configured live database, with `~` expanded.
    #[must_use]
    pub fn db_path(&self) -> Option<PathBuf> {
        non_blank(self.backup.db_path.as_deref()).map(expand_tilde)
    }

    /// Configured backup directory, with `~` expanded.
    #[must_use]
    pub fn backup_dir(&self) -> Option<PathBuf> {
        non_blank(self.backup.dir.as_deref()).map(expand_tilde)
    }

    #[must_use]
    pub fn log_config(&self) -> LogConfig {
        LogConfig {
            level: self.general.log_level.clone(),
            format: self.general.log_format,
            file: non_blank(self.general.log_file.as_deref()).map(expand_tilde),
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Expand a leading `~` to the home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    if path == "~" {
        return dirs::home_dir().unwrap_or_else(|| PathBuf::from(path));
    }
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use tempfile::TempDir;

    #[test]
    fn default_config_is_valid() {
        let config = Config::default();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.general.log_format, LogFormat::Pretty);
        assert_eq!(config.backup.max_backups, 5);
        assert!(!config.backup.auto_backup);
        assert!(config.validate().is_ok());
        assert!(config.db_path().is_none());
    }

    #[test]
    fn parses_full_file() {
        let config = Config::from_toml_str(
            r#"
            [general]
            log_level = "debug"
            log_format = "json"
            log_file = "/var/log/dbkeep.log"

            [backup]
            db_path = "/srv/app/live.db"
            dir = "/srv/app/snapshots"
            max_backups = 12
            auto_backup = true
            "#,
        )
        .unwrap();

        assert_eq!(config.general.log_format, LogFormat::Json);
        assert_eq!(config.db_path(), Some(PathBuf::from("/srv/app/live.db")));
        assert_eq!(config.backup_dir(), Some(PathBuf::from("/srv/app/snapshots")));
        assert_eq!(config.retention_policy().unwrap().max_backups(), 12);
        assert!(config.backup.auto_backup);

        let log = config.log_config();
        assert_eq!(log.level, "debug");
        assert_eq!(log.file, Some(PathBuf::from("/var/log/dbkeep.log")));
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let config = Config::from_toml_str("[backup]\nauto_backup = true\n").unwrap();
        assert_eq!(config.backup.max_backups, 5);
        assert_eq!(config.general.log_level, "info");
    }

    #[test]
    fn zero_max_backups_is_rejected() {
        let err = Config::from_toml_str("[backup]\nmax_backups = 0\n").unwrap_err();
        assert!(
            matches!(err, Error::Config(ConfigError::ValidationError(_))),
            "got {err:?}"
        );

        let config = Config::from_toml_str("[backup]\nmax_backups = 250\n").unwrap();
        assert_eq!(config.retention_policy().unwrap().max_backups(), 250);
    }

    #[test]
    fn unknown_log_level_is_rejected() {
        let err = Config::from_toml_str("[general]\nlog_level = \"chatty\"\n").unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::ValidationError(_))));
    }

    #[test]
    fn bad_toml_is_parse_failure() {
        let err = Config::from_toml_str("[backup\nmax_backups = 3").unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::ParseFailed(_))));
    }

    #[test]
    fn load_from_missing_file() {
        let tmp = TempDir::new().unwrap();
        let err = Config::load_from(&tmp.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn load_explicit_path() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("dbkeep.toml");
        std::fs::write(&path, "[backup]\nmax_backups = 2\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.backup.max_backups, 2);
    }

    #[test]
    fn blank_paths_are_unset() {
        let config = Config::from_toml_str("[backup]\ndb_path = \"  \"\ndir = \"\"\n").unwrap();
        assert!(config.db_path().is_none());
        assert!(config.backup_dir().is_none());
    }

    #[test]
    fn expand_tilde_variants() {
        assert_eq!(expand_tilde("/abs/path"), PathBuf::from("/abs/path"));
        assert_eq!(expand_tilde("rel/path"), PathBuf::from("rel/path"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_tilde("~"), home);
            assert_eq!(expand_tilde("~/db/live.db"), home.join("db/live.db"));
        }
    }

    #[test]
    fn log_format_from_str() {
        assert_eq!("pretty".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert!("xml".parse::<LogFormat>().is_err());
        assert_eq!(LogFormat::Json.to_string(), "json");
    }
}
