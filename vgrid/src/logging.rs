//! Tracing subscriber bootstrap.
//!
//! Hosts call [`init_logging`] once at startup. Logs go to stderr and,
//! when a directory is configured, to a daily rolling file. The filter
//! comes from `RUST_LOG` when set, otherwise from [`LoggingConfig::filter`]
//! (`vgrid=info` by default).
//!
//! The returned [`LoggingGuard`] flushes the file writer on drop and must
//! be kept alive for the lifetime of the process.

use std::path::PathBuf;

use thiserror::Error;
use time::format_description::well_known::Rfc3339;
use time::UtcOffset;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::OffsetTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Default filter directive.
pub const DEFAULT_FILTER: &str = "vgrid=info";

/// Errors raised while installing the subscriber.
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Invalid log filter '{filter}': {reason}")]
    InvalidFilter { filter: String, reason: String },

    #[error("Failed to create log directory {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("A global subscriber is already installed: {0}")]
    AlreadyInitialized(String),
}

/// Logging options.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is not set.
    pub filter: String,
    /// Directory of the rolling log file; `None` logs to stderr only.
    pub log_dir: Option<PathBuf>,
    /// File name prefix of the rolling log.
    pub file_prefix: String,
    /// Colored stderr output.
    pub ansi: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_FILTER.to_string(),
            log_dir: None,
            file_prefix: "vgrid.log".to_string(),
            ansi: true,
        }
    }
}

impl LoggingConfig {
    /// Set the fallback filter.
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self
    }

    /// Also write to a daily rolling file in `dir`.
    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(dir.into());
        self
    }

    /// Toggle colored output.
    pub fn with_ansi(mut self, ansi: bool) -> Self {
        self.ansi = ansi;
        self
    }

    /// Filter from `RUST_LOG`, falling back to the configured directive.
    pub fn env_filter(&self) -> Result<EnvFilter, LoggingError> {
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&self.filter))
            .map_err(|e| LoggingError::InvalidFilter {
                filter: self.filter.clone(),
                reason: e.to_string(),
            })
    }
}

/// Keeps the file writer alive.
#[derive(Debug)]
pub struct LoggingGuard {
    _file: Option<WorkerGuard>,
}

/// Install the global subscriber.
///
/// # Errors
///
/// Fails on an invalid filter, an unusable log directory, or when another
/// subscriber is already installed.
pub fn init_logging(config: LoggingConfig) -> Result<LoggingGuard, LoggingError> {
    let filter = config.env_filter()?;
    let timer = OffsetTime::local_rfc_3339().unwrap_or_else(|_| OffsetTime::new(UtcOffset::UTC, Rfc3339));

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_timer(timer.clone())
        .with_ansi(config.ansi);

    let (file_layer, guard) = match &config.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir).map_err(|source| LoggingError::Io {
                path: dir.clone(),
                source,
            })?;
            let appender = tracing_appender::rolling::daily(dir, &config.file_prefix);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_timer(timer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))?;

    tracing::debug!(filter = %config.filter, file = config.log_dir.is_some(), "Logging: initialized");
    Ok(LoggingGuard { _file: guard })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LoggingConfig::default();
        assert_eq!(config.filter, "vgrid=info");
        assert!(config.log_dir.is_none());
    }

    #[test]
    fn test_builder() {
        let config = LoggingConfig::default()
            .with_filter("vgrid=debug")
            .with_log_dir("/tmp/vgrid-logs")
            .with_ansi(false);
        assert_eq!(config.filter, "vgrid=debug");
        assert_eq!(config.log_dir, Some(PathBuf::from("/tmp/vgrid-logs")));
        assert!(!config.ansi);
    }
}
