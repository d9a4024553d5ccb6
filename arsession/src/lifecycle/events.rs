//! Lifecycle events broadcast to observers.

use std::fmt;

use crate::error::SessionError;
use crate::scene::{Dimensions, Orientation};

use super::state::LifecycleState;

/// Default capacity of the lifecycle event channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Something observable happened to the AR session.
///
/// Delivered through a `tokio::sync::broadcast` channel; slow receivers may
/// lag and miss events, so these are for observation only.
#[derive(Debug, Clone, PartialEq)]
pub enum LifecycleEvent {
    /// The controller moved between states.
    StateChanged {
        epoch: u64,
        from: LifecycleState,
        to: LifecycleState,
    },

    /// `init_ar()` was called while a session already existed.
    InitRejected { state: LifecycleState },

    /// One init attempt failed.
    AttemptFailed {
        epoch: u64,
        attempt: u32,
        error: SessionError,
        will_retry: bool,
    },

    /// All init attempts failed; the session was torn down.
    InitFailed {
        epoch: u64,
        attempts: u32,
        error: SessionError,
    },

    /// A session was disposed.
    Disposed { epoch: u64 },

    /// A settled resize is about to dispose and re-initialize the session.
    Reinitializing { viewport: Dimensions },

    /// A settled resize was applied to the live session without re-init.
    ViewportSynced {
        viewport: Dimensions,
        orientation: Option<Orientation>,
    },
}

impl LifecycleEvent {
    /// Target state if this is a state change.
    pub fn entered_state(&self) -> Option<LifecycleState> {
        match self {
            LifecycleEvent::StateChanged { to, .. } => Some(*to),
            _ => None,
        }
    }
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleEvent::StateChanged { epoch, from, to } => {
                write!(f, "session {}: {} -> {}", epoch, from, to)
            }
            LifecycleEvent::InitRejected { state } => {
                write!(f, "init rejected while {}", state)
            }
            LifecycleEvent::AttemptFailed {
                epoch,
                attempt,
                error,
                will_retry,
            } => {
                write!(f, "session {}: attempt {} failed: {}", epoch, attempt, error)?;
                if *will_retry {
                    f.write_str(" (retrying)")?;
                }
                Ok(())
            }
            LifecycleEvent::InitFailed {
                epoch,
                attempts,
                error,
            } => write!(
                f,
                "session {}: initialization failed after {} attempt(s): {}",
                epoch, attempts, error
            ),
            LifecycleEvent::Disposed { epoch } => write!(f, "session {} disposed", epoch),
            LifecycleEvent::Reinitializing { viewport } => {
                write!(f, "viewport settled at {}, reinitializing", viewport)
            }
            LifecycleEvent::ViewportSynced {
                viewport,
                orientation,
            } => match orientation {
                Some(o) => write!(f, "viewport settled at {}, source {}", viewport, o),
                None => write!(f, "viewport settled at {}", viewport),
            },
        }
    }
}
