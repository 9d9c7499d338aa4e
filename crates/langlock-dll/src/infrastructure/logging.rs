//! Diagnostic logging.
//!
//! The library lives inside someone else's process, so it never writes to
//! stdout and is silent unless a log file is configured.  When one is, a
//! `tracing-subscriber` fmt layer appends plain-text lines to it, with thread
//! ids included because hook callbacks run on OS-chosen threads.
//!
//! The filter comes from `LANGLOCK_LOG` when set, otherwise from
//! `[logging] level`.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use thiserror::Error;
use tracing_subscriber::EnvFilter;

use super::storage::config::LoggingConfig;

/// Environment variable overriding the configured filter.
pub const LOG_ENV: &str = "LANGLOCK_LOG";

/// Error type for logging initialisation.
#[derive(Debug, Error)]
pub enum LoggingError {
    /// The log file could not be opened for appending.
    #[error("cannot open log file {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The host process already installed a global subscriber.
    #[error("a global tracing subscriber is already installed")]
    AlreadyInstalled,
}

/// Builds the filter: `LANGLOCK_LOG` first, then `level`, then `info`.
pub fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Opens `path` for appending, creating it if needed.
///
/// # Errors
///
/// Returns [`LoggingError::Open`] on any file-system failure.
pub fn open_log_file(path: &Path) -> Result<File, LoggingError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| LoggingError::Open {
            path: path.to_path_buf(),
            source,
        })
}

/// Installs the global subscriber described by `config`.
///
/// Returns `Ok(false)` when no log file is configured (nothing installed).
///
/// # Errors
///
/// Returns [`LoggingError::Open`] if the file cannot be opened and
/// [`LoggingError::AlreadyInstalled`] if the host already owns the global
/// subscriber, which is left untouched.
pub fn init_logging(config: &LoggingConfig) -> Result<bool, LoggingError> {
    let Some(path) = config.file.as_deref() else {
        return Ok(false);
    };
    let file = open_log_file(path)?;

    tracing_subscriber::fmt()
        .with_env_filter(build_filter(&config.level))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_thread_ids(true)
        .try_init()
        .map_err(|_| LoggingError::AlreadyInstalled)?;
    Ok(true)
}

/// Starts logging for the library runtime.
///
/// A host-owned global subscriber is not an error: the locker's events then
/// flow into it.  Returns the error the caller should report, if any.
pub fn start_logging(config: &LoggingConfig) -> Option<LoggingError> {
    match init_logging(config) {
        Ok(_) | Err(LoggingError::AlreadyInstalled) => None,
        Err(e @ LoggingError::Open { .. }) => Some(e),
    }
}
