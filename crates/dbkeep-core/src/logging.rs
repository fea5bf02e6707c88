//! Structured logging for dbkeep.
//!
//! One global `tracing` subscriber: stderr in pretty or JSON form, plus an
//! optional append-only log file in the same form. `RUST_LOG` overrides the
//! configured level.
//!
//! Events use these field names consistently:
//! - `backup`: backup artifact path
//! - `source`, `target`: live database paths
//! - `dir`: backup directory
//! - `stage`: restore stage

pub use crate::config::LogFormat;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};
use tracing_subscriber::fmt::{self, MakeWriter};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Layer, Registry};

static LOGGING_INITIALIZED: OnceLock<()> = OnceLock::new();

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Logging configuration, usually built by [`crate::config::Config::log_config`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// trace, debug, info, warn or error
    pub level: String,
    pub format: LogFormat,
    pub file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info.as_str().to_string(),
            format: LogFormat::Pretty,
            file: None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("logging already initialized")]
    AlreadyInitialized,

    #[error("invalid log level: {0}")]
    InvalidLevel(String),

    #[error("failed to open log file: {0}")]
    FileOpen(#[from] io::Error),

    #[error("failed to set global subscriber: {0}")]
    SetSubscriber(#[from] tracing::subscriber::SetGlobalDefaultError),
}

/// Install the global subscriber. A second call fails with
/// [`LogError::AlreadyInitialized`].
pub fn init_logging(config: &LogConfig) -> Result<(), LogError> {
    if LOGGING_INITIALIZED.get().is_some() {
        return Err(LogError::AlreadyInitialized);
    }

    let level: LogLevel = config
        .level
        .parse()
        .map_err(|_| LogError::InvalidLevel(config.level.clone()))?;
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    let mut layers = vec![output_layer(config.format, io::stderr, true)];
    if let Some(path) = &config.file {
        let file = open_log_file(path)?;
        layers.push(output_layer(config.format, Mutex::new(file), false));
    }

    tracing::subscriber::set_global_default(
        tracing_subscriber::registry().with(layers).with(filter),
    )?;
    let _ = LOGGING_INITIALIZED.set(());

    tracing::debug!(
        log_level = %level.as_str(),
        log_format = %config.format,
        log_file = ?config.file,
        "Logging initialized"
    );
    Ok(())
}

/// Formatting layer writing `format` lines to `writer`.
fn output_layer<W>(format: LogFormat, writer: W, ansi: bool) -> BoxedLayer
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = fmt::layer().with_writer(writer).with_target(true);
    match format {
        LogFormat::Pretty => layer.with_ansi(ansi).boxed(),
        LogFormat::Json => layer
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .flatten_event(true)
            .boxed(),
    }
}

fn open_log_file(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

/// Accepted log levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            _ => Err(format!(
                "unknown log level: {s}. Expected one of: trace, debug, info, warn, error"
            )),
        }
    }
}
