//! dbkeep-core: Core library for dbkeep
//!
//! Point-in-time backups of a single-file SQLite database: timestamped
//! copies with JSON sidecar metadata, validated restores with a safety copy
//! of the live file, a newest-first catalog, and count-based retention.
//!
//! # Architecture
//!
//! ```text
//! retention ──► creator ──► naming + metadata
//!     │            ▲
//!     ▼            │ (safety copy)
//!  catalog ◄── restore ──► integrity (SQLite PRAGMA integrity_check)
//! ```
//!
//! # Modules
//!
//! - `naming`: `<prefix>_<YYYYMMDD_HHMMSS>.<ext>` artifact names and sidecar paths
//! - `metadata`: JSON sidecar read/write
//! - `creator`: copy the live database into a backup directory
//! - `integrity`: validate a candidate file as a healthy SQLite database
//! - `restore`: validate, take a safety copy, then overwrite the target
//! - `catalog`: list backups newest-first
//! - `retention`: create-then-prune and delete
//! - `config`: `dbkeep.toml` loading and validation
//! - `logging`: tracing subscriber setup
//!
//! # Concurrency
//!
//! Everything here is synchronous, blocking file I/O. No locking is taken
//! against other processes: quiesce writers of the live database before
//! backing it up or restoring over it.
//!
//! # Safety
//!
//! This crate forbids unsafe code.

#![forbid(unsafe_code)]

pub mod catalog;
pub mod config;
pub mod creator;
pub mod error;
pub mod integrity;
pub mod logging;
pub mod metadata;
pub mod naming;
pub mod restore;
pub mod retention;

pub use catalog::{CatalogEntry, list_backups};
pub use creator::{create_backup, resolve_backup_dir};
pub use error::{ConfigError, Error, Remediation, Result};
pub use metadata::BackupMetadata;
pub use restore::{
    RestoreOptions, RestoreReport, restore_backup, restore_with_options, verify_backup,
};
pub use retention::{
    PruneSummary, RetentionPolicy, ScheduledReport, create_scheduled_backup, delete_backup,
    prune_backups,
};

/// Version of the dbkeep-core crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
