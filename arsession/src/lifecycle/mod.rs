//! AR session lifecycle management.
//!
//! The [`LifecycleController`] is the only component that creates, mutates
//! or disposes the session's source, detection context and pose tracker.
//!
//! # State Machine
//!
//! ```text
//! Idle --init_ar--> SourceInitializing --ready--> SourceReady
//! SourceReady --first frame--> ContextInitializing --calibrated--> ContextReady
//! ContextReady --tracker bound--> TrackingActive
//! (any non-Idle) --dispose_ar--> Disposing --> Idle
//! (initializing) --last attempt failed--> Idle
//! ```
//!
//! # Guarantees
//!
//! - A detection context is never created before its source is ready and
//!   reports non-zero frame dimensions
//! - A tracker is never created before its context has calibrated
//! - At most one session exists; `init_ar()` while one exists is rejected
//! - `dispose_ar()` is safe from any state and idempotent
//! - A resize burst produces one settled action, not one per event
//!
//! There is no timeout by default: a source that never becomes ready (camera
//! permission denied, for instance) parks the controller in
//! `SourceInitializing` until disposed. Set
//! [`ControllerConfig::init_timeout`] and [`ControllerConfig::init_attempts`]
//! for bounded retry with a reported terminal failure.

mod config;
mod controller;
pub mod debounce;
mod events;
mod session;
mod state;

pub use config::{ControllerConfig, ResizePolicy, DEFAULT_RESIZE_QUIET, DEFAULT_RETRY_DELAY};
pub use controller::LifecycleController;
pub use debounce::Debouncer;
pub use events::{LifecycleEvent, DEFAULT_EVENT_CAPACITY};
pub use state::{InitOutcome, InitStage, LifecycleState};
