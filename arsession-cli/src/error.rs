//! CLI error type.

use std::fmt;

use arsession::error::{ConfigError, LoggingError};

/// Errors surfaced to `main`, which prints them and exits non-zero.
#[derive(Debug)]
pub enum CliError {
    /// Configuration could not be loaded or is inconsistent.
    Config(ConfigError),
    /// Logging could not be installed.
    Logging(LoggingError),
    /// The async runtime could not be started.
    Runtime(std::io::Error),
    /// The Ctrl+C handler could not be installed.
    Signal(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(e) => write!(f, "{}", e),
            CliError::Logging(e) => write!(f, "{}", e),
            CliError::Runtime(e) => write!(f, "Failed to start runtime: {}", e),
            CliError::Signal(msg) => write!(f, "Failed to set signal handler: {}", msg),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Config(e) => Some(e),
            CliError::Logging(e) => Some(e),
            CliError::Runtime(e) => Some(e),
            CliError::Signal(_) => None,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e)
    }
}

impl From<LoggingError> for CliError {
    fn from(e: LoggingError) -> Self {
        CliError::Logging(e)
    }
}
