//! Tracing subscriber setup.
//!
//! Installs a `tracing-subscriber` registry with:
//!
//! - an `EnvFilter` built from the configured level (`RUST_LOG` wins when set)
//! - a local-time `fmt` layer on stderr
//! - an optional daily-rolling log file written through a non-blocking
//!   `tracing-appender` worker
//! - a Chrome trace layer when built with the `profiling` feature
//!
//! Keep the returned [`LoggingGuard`] alive for the whole run; dropping it
//! flushes and stops the file writer.

use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::LocalTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::error::LoggingError;

/// Default filter directive.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Default log file name prefix (the date is appended by the appender).
pub const DEFAULT_FILE_PREFIX: &str = "arsession.log";

/// Logging settings, usually from the `[logging]` config section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Filter directive, e.g. `info` or `info,arsession::lifecycle=debug`.
    pub level: String,
    /// Directory for rolling log files. `None` logs to stderr only.
    pub directory: Option<PathBuf>,
    pub file_prefix: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            directory: None,
            file_prefix: DEFAULT_FILE_PREFIX.to_string(),
        }
    }
}

impl LoggingConfig {
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    pub fn with_directory(mut self, directory: Option<PathBuf>) -> Self {
        self.directory = directory;
        self
    }
}

/// Keeps background log writers alive.
#[must_use = "dropping the guard stops file logging"]
pub struct LoggingGuard {
    _file: Option<WorkerGuard>,
    #[cfg(feature = "profiling")]
    _chrome: tracing_chrome::FlushGuard,
}

impl std::fmt::Debug for LoggingGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoggingGuard")
            .field("file", &self._file.is_some())
            .finish_non_exhaustive()
    }
}

/// Parse a filter directive.
pub fn parse_filter(level: &str) -> Result<EnvFilter, LoggingError> {
    EnvFilter::try_new(level).map_err(|e| LoggingError::Filter {
        directive: level.to_string(),
        reason: e.to_string(),
    })
}

/// `RUST_LOG` if set and valid, otherwise the configured level.
fn env_filter(config: &LoggingConfig) -> Result<EnvFilter, LoggingError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => parse_filter(&config.level),
    }
}

/// Install the global subscriber.
pub fn init(config: &LoggingConfig) -> Result<LoggingGuard, LoggingError> {
    let filter = env_filter(config)?;

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_timer(LocalTime::rfc_3339())
        .with_target(true);

    let (file_layer, file_guard) = match &config.directory {
        Some(dir) => {
            std::fs::create_dir_all(dir).map_err(|source| LoggingError::Directory {
                path: dir.display().to_string(),
                source,
            })?;
            let appender = tracing_appender::rolling::daily(dir, &config.file_prefix);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_timer(LocalTime::rfc_3339());
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer);

    #[cfg(feature = "profiling")]
    let (registry, chrome_guard) = {
        let (chrome_layer, guard) = tracing_chrome::ChromeLayerBuilder::new()
            .include_args(true)
            .build();
        (registry.with(chrome_layer), guard)
    };

    registry
        .try_init()
        .map_err(|e| LoggingError::Install(e.to_string()))?;

    tracing::debug!(
        level = %config.level,
        directory = ?config.directory,
        "Logging initialized"
    );

    Ok(LoggingGuard {
        _file: file_guard,
        #[cfg(feature = "profiling")]
        _chrome: chrome_guard,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, "info");
        assert!(config.directory.is_none());
        assert_eq!(config.file_prefix, "arsession.log");
    }

    #[test]
    fn test_parse_filter_accepts_directives() {
        assert!(parse_filter("debug").is_ok());
        assert!(parse_filter("info,arsession::lifecycle=trace").is_ok());
    }

    #[test]
    fn test_builders() {
        let config = LoggingConfig::default()
            .with_level("warn")
            .with_directory(Some(PathBuf::from("/tmp/logs")));
        assert_eq!(config.level, "warn");
        assert_eq!(config.directory, Some(PathBuf::from("/tmp/logs")));
    }
}
