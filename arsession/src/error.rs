//! Error types for collaborators and session initialization.
//!
//! None of these cross the [`LifecycleController`](crate::lifecycle::LifecycleController)
//! boundary. The controller logs them and, for terminal init failures,
//! reports them through a [`LifecycleEvent`](crate::lifecycle::LifecycleEvent).

use std::time::Duration;

use thiserror::Error;

use crate::lifecycle::InitStage;

/// Errors reported by a video source.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SourceError {
    /// Camera access was refused by the platform.
    #[error("Camera permission denied")]
    PermissionDenied,

    /// The image or video file could not be opened.
    #[error("Media not found: {0}")]
    NotFound(String),

    /// The source was disposed while initializing.
    #[error("Source disposed")]
    Disposed,
}

/// Errors reported by a detection context.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ContextError {
    /// Camera calibration data could not be loaded.
    #[error("Failed to load camera parameters from {path}: {reason}")]
    Calibration { path: String, reason: String },

    /// Init resolved but no internal controller is available.
    #[error("Context initialized without a controller")]
    NotCalibrated,

    /// The context was disposed while initializing.
    #[error("Context disposed")]
    Disposed,
}

/// Reasons a single initialization attempt can stop.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    /// The source failed to become ready.
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// The detection context failed to initialize.
    #[error("Context error: {0}")]
    Context(#[from] ContextError),

    /// A suspension point did not complete within the configured timeout.
    #[error("Timed out after {elapsed:?} waiting for {stage}")]
    Timeout { stage: InitStage, elapsed: Duration },

    /// The source signalled readiness but reports no frame data.
    #[error("Source ready with zero-sized frames ({width}x{height})")]
    ZeroDimensions { width: u32, height: u32 },

    /// The owning session was disposed while the attempt was suspended.
    #[error("Session cancelled")]
    Cancelled,
}

impl SessionError {
    /// Whether this error came from disposal rather than a real failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, SessionError::Cancelled)
    }
}

/// Errors that can occur loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file could not be read.
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Configuration file is not valid INI.
    #[error("Failed to parse config file: {0}")]
    Parse(String),

    /// A key holds a value that cannot be interpreted.
    #[error("Invalid value '{value}' for {section}.{key}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
    },

    /// The effective configuration could not be rendered as INI.
    #[error("Failed to render configuration: {0}")]
    Render(#[source] std::io::Error),
}

/// Errors that can occur installing the tracing subscriber.
#[derive(Debug, Error)]
pub enum LoggingError {
    /// Log directory could not be created.
    #[error("Failed to create log directory {path}: {source}")]
    Directory {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The filter directive could not be parsed.
    #[error("Invalid log filter '{directive}': {reason}")]
    Filter { directive: String, reason: String },

    /// A global subscriber was already installed.
    #[error("Failed to install subscriber: {0}")]
    Install(String),
}
