//! dbkeep command line interface
//!
//! Thin wrapper over `dbkeep-core`: resolves paths from flags and
//! `dbkeep.toml`, runs one operation, and renders the result as plain text
//! or JSON.

mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};

use dbkeep_core::config::Config;
use dbkeep_core::logging::init_logging;
use dbkeep_core::retention::RetentionPolicy;
use dbkeep_core::{
    RestoreOptions, create_backup, create_scheduled_backup, delete_backup, list_backups,
    prune_backups, resolve_backup_dir, restore_with_options, verify_backup,
};

use crate::output::{OutputFormat, Printer};

/// Point-in-time backups for single-file SQLite databases
#[derive(Parser, Debug)]
#[command(name = "dbkeep")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to dbkeep.toml (default: $DBKEEP_CONFIG, then ./dbkeep.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level override (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Output format
    #[arg(long, value_enum, default_value = "plain", global = true)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Copy the database into the backup directory
    Create {
        /// Database to back up (default: backup.db_path from config)
        db: Option<PathBuf>,

        /// Backup directory (default: <db dir>/backups)
        #[arg(long)]
        dir: Option<PathBuf>,
    },

    /// Validate a backup and copy it over the live database
    Restore {
        /// Backup artifact to restore
        backup: PathBuf,

        /// Database to overwrite (default: original_db from the sidecar)
        #[arg(long)]
        target: Option<PathBuf>,

        /// Check everything but write nothing
        #[arg(long)]
        dry_run: bool,
    },

    /// List backups, newest first
    List {
        /// Backup directory
        dir: Option<PathBuf>,

        /// List the default backup directory of this database
        #[arg(long, conflicts_with = "dir")]
        db: Option<PathBuf>,
    },

    /// Delete a backup and its metadata
    Delete {
        /// Backup artifact to delete
        backup: PathBuf,
    },

    /// Create a backup, then keep only the newest N
    Scheduled {
        /// Database to back up (default: backup.db_path from config)
        db: Option<PathBuf>,

        /// Backup directory (default: <db dir>/backups)
        #[arg(long)]
        dir: Option<PathBuf>,

        /// Backups to keep (default: backup.max_backups from config)
        #[arg(long)]
        max: Option<u32>,
    },

    /// Remove all but the newest N backups
    Prune {
        /// Backup directory
        dir: Option<PathBuf>,

        /// Backups to keep (default: backup.max_backups from config)
        #[arg(long)]
        max: Option<u32>,
    },

    /// Run the integrity check on a backup without restoring it
    Verify {
        /// Backup artifact to check
        backup: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let printer = Printer::new(cli.format);

    match run(cli, &printer) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            printer.error(&err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli, printer: &Printer) -> Result<()> {
    let config = Config::load(cli.config.as_deref())?;

    let mut log_config = config.log_config();
    if let Some(level) = cli.log_level {
        log_config.level = level;
    }
    init_logging(&log_config).context("Failed to initialize logging")?;
    tracing::debug!(command = ?cli.command, "Running command");

    match cli.command {
        Commands::Create { db, dir } => {
            let db = require_db(db, &config)?;
            let dir = dir.or_else(|| config.backup_dir());
            let backup_path = create_backup(&db, dir.as_deref())?;
            printer.created(&backup_path);
        }
        Commands::Restore {
            backup,
            target,
            dry_run,
        } => {
            let opts = RestoreOptions { target, dry_run };
            let report = restore_with_options(&backup, &opts)?;
            printer.restored(&report);
        }
        Commands::List { dir, db } => {
            let dir = match (dir, db) {
                (Some(dir), _) => dir,
                (None, Some(db)) => resolve_backup_dir(&db, config.backup_dir().as_deref()),
                (None, None) => configured_dir(&config)?,
            };
            let entries = list_backups(&dir);
            printer.listed(&dir, &entries);
        }
        Commands::Delete { backup } => {
            delete_backup(&backup)?;
            printer.deleted(&backup);
        }
        Commands::Scheduled { db, dir, max } => {
            let db = require_db(db, &config)?;
            let dir = dir.or_else(|| config.backup_dir());
            let policy = policy(max, &config)?;
            let report = create_scheduled_backup(&db, dir.as_deref(), policy)?;
            printer.scheduled(&report);
        }
        Commands::Prune { dir, max } => {
            let dir = match dir {
                Some(dir) => dir,
                None => configured_dir(&config)?,
            };
            let policy = policy(max, &config)?;
            let summary = prune_backups(&dir, policy);
            printer.pruned(&dir, &summary);
        }
        Commands::Verify { backup } => {
            verify_backup(&backup)?;
            printer.verified(&backup);
        }
    }

    Ok(())
}

fn require_db(db: Option<PathBuf>, config: &Config) -> Result<PathBuf> {
    match db.or_else(|| config.db_path()) {
        Some(db) => Ok(db),
        None => bail!("No database given. Pass DB or set backup.db_path in dbkeep.toml"),
    }
}

/// Backup directory from config: `backup.dir`, else derived from `backup.db_path`.
fn configured_dir(config: &Config) -> Result<PathBuf> {
    if let Some(dir) = config.backup_dir() {
        return Ok(dir);
    }
    match config.db_path() {
        Some(db) => Ok(resolve_backup_dir(&db, None)),
        None => bail!(
            "No backup directory given. Pass DIR or set backup.dir or backup.db_path in dbkeep.toml"
        ),
    }
}

fn policy(max: Option<u32>, config: &Config) -> Result<RetentionPolicy> {
    match max {
        Some(max) => Ok(RetentionPolicy::new(max)?),
        None => Ok(config.retention_policy()?),
    }
}
