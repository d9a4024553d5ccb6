//! Controller configuration.
//!
//! The knobs here cover the variations the controller supports: whether to
//! wait for the first decodable frame, what a settled resize does, and how
//! the detection canvas is sized (in [`ContextConfig`]).

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::collab::{ContextConfig, SourceConfig, TrackerConfig};

use super::events::DEFAULT_EVENT_CAPACITY;

/// Default quiet window after the last resize event before acting on it.
pub const DEFAULT_RESIZE_QUIET: Duration = Duration::from_secs(1);

/// Default pause between failed init attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(2);

/// What a settled viewport resize does to a live session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizePolicy {
    /// Dispose the session and initialize a new one for the new viewport.
    FullReinit,
    /// Keep the session; re-derive orientation and canvas size in place.
    RecomputeInPlace,
}

impl ResizePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResizePolicy::FullReinit => "reinit",
            ResizePolicy::RecomputeInPlace => "recompute",
        }
    }
}

impl FromStr for ResizePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "reinit" | "full_reinit" => Ok(ResizePolicy::FullReinit),
            "recompute" | "recompute_in_place" => Ok(ResizePolicy::RecomputeInPlace),
            _ => Err(s.to_string()),
        }
    }
}

impl fmt::Display for ResizePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration for [`LifecycleController`](super::LifecycleController).
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerConfig {
    pub source: SourceConfig,
    pub context: ContextConfig,
    pub tracker: TrackerConfig,

    /// Wait for the first decodable frame before reading actual dimensions.
    pub wait_for_first_frame: bool,

    pub resize_policy: ResizePolicy,

    /// Quiet window that coalesces a burst of resize events.
    pub resize_quiet: Duration,

    /// Bound on each init suspension point. `None` waits forever.
    pub init_timeout: Option<Duration>,

    /// Init attempts per session before giving up (at least 1).
    pub init_attempts: u32,

    /// Pause between failed attempts.
    pub retry_delay: Duration,

    /// Lifecycle event channel capacity.
    pub event_capacity: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            source: SourceConfig::default(),
            context: ContextConfig::default(),
            tracker: TrackerConfig::default(),
            wait_for_first_frame: true,
            resize_policy: ResizePolicy::FullReinit,
            resize_quiet: DEFAULT_RESIZE_QUIET,
            init_timeout: None,
            init_attempts: 1,
            retry_delay: DEFAULT_RETRY_DELAY,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl ControllerConfig {
    pub fn with_source(mut self, source: SourceConfig) -> Self {
        self.source = source;
        self
    }

    pub fn with_context(mut self, context: ContextConfig) -> Self {
        self.context = context;
        self
    }

    pub fn with_tracker(mut self, tracker: TrackerConfig) -> Self {
        self.tracker = tracker;
        self
    }

    pub fn with_wait_for_first_frame(mut self, wait: bool) -> Self {
        self.wait_for_first_frame = wait;
        self
    }

    pub fn with_resize_policy(mut self, policy: ResizePolicy) -> Self {
        self.resize_policy = policy;
        self
    }

    pub fn with_resize_quiet(mut self, quiet: Duration) -> Self {
        self.resize_quiet = quiet;
        self
    }

    pub fn with_init_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.init_timeout = timeout;
        self
    }

    /// Set attempts and the delay between them. Zero attempts is treated as one.
    pub fn with_retry(mut self, attempts: u32, delay: Duration) -> Self {
        self.init_attempts = attempts.max(1);
        self.retry_delay = delay;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_reference_behavior() {
        let config = ControllerConfig::default();
        assert!(config.wait_for_first_frame);
        assert_eq!(config.resize_policy, ResizePolicy::FullReinit);
        assert_eq!(config.resize_quiet, Duration::from_secs(1));
        assert_eq!(config.init_timeout, None);
        assert_eq!(config.init_attempts, 1);
    }

    #[test]
    fn test_with_retry_clamps_zero_attempts() {
        let config = ControllerConfig::default().with_retry(0, Duration::from_millis(10));
        assert_eq!(config.init_attempts, 1);
        assert_eq!(config.retry_delay, Duration::from_millis(10));
    }

    #[test]
    fn test_resize_policy_parse() {
        assert_eq!("reinit".parse::<ResizePolicy>(), Ok(ResizePolicy::FullReinit));
        assert_eq!(
            "Recompute".parse::<ResizePolicy>(),
            Ok(ResizePolicy::RecomputeInPlace)
        );
        assert!("ignore".parse::<ResizePolicy>().is_err());
    }
}
