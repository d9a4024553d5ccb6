//! Lifecycle states and init outcomes.

use std::fmt;

/// Where an AR session is in its initialization sequence.
///
/// Exactly one state holds at a time. `Disposing` is transient: it is entered
/// and left within a single `dispose_ar()` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    /// No session exists.
    Idle,
    /// Source created, waiting for it to become ready.
    SourceInitializing,
    /// Source ready; waiting for first frame if configured.
    SourceReady,
    /// Detection context created, waiting for calibration.
    ContextInitializing,
    /// Context calibrated; tracker about to be bound.
    ContextReady,
    /// Tracker bound; per-frame updates run.
    TrackingActive,
    /// Resources being released.
    Disposing,
}

impl LifecycleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleState::Idle => "idle",
            LifecycleState::SourceInitializing => "source_initializing",
            LifecycleState::SourceReady => "source_ready",
            LifecycleState::ContextInitializing => "context_initializing",
            LifecycleState::ContextReady => "context_ready",
            LifecycleState::TrackingActive => "tracking_active",
            LifecycleState::Disposing => "disposing",
        }
    }

    /// Whether initialization is still in flight.
    pub fn is_initializing(&self) -> bool {
        matches!(
            self,
            LifecycleState::SourceInitializing
                | LifecycleState::SourceReady
                | LifecycleState::ContextInitializing
                | LifecycleState::ContextReady
        )
    }

    /// User-facing status line.
    pub fn display_status(&self) -> &'static str {
        match self {
            LifecycleState::Idle => "Stopped",
            LifecycleState::SourceInitializing => "Starting camera...",
            LifecycleState::SourceReady => "Camera ready",
            LifecycleState::ContextInitializing => "Calibrating...",
            LifecycleState::ContextReady => "Calibrated",
            LifecycleState::TrackingActive => "Tracking",
            LifecycleState::Disposing => "Stopping...",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The suspension points of an init attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InitStage {
    /// Waiting for the source's readiness signal.
    SourceReady,
    /// Waiting for the first decodable frame.
    FirstFrame,
    /// Waiting for the detection context to calibrate.
    ContextInit,
}

impl fmt::Display for InitStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            InitStage::SourceReady => "source ready",
            InitStage::FirstFrame => "first frame",
            InitStage::ContextInit => "context init",
        })
    }
}

/// Result of an `init_ar()` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitOutcome {
    /// A new session started with this epoch.
    Started { epoch: u64 },
    /// A session already exists; nothing was done.
    Rejected { state: LifecycleState },
}

impl InitOutcome {
    pub fn is_started(&self) -> bool {
        matches!(self, InitOutcome::Started { .. })
    }
}
