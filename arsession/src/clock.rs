//! Per-frame time deltas for the render loop.
//!
//! The first tick has no predecessor, so it reports one nominal frame period.
//! Every delta is clamped to `max_delta` so a loop that was starved (window
//! hidden, process suspended) resumes with a single bounded step instead of a
//! jump.

use std::time::{Duration, Instant};

/// Default upper bound on a single frame delta.
pub const DEFAULT_MAX_DELTA: Duration = Duration::from_millis(200);

/// Default nominal frame period (60 Hz).
pub const DEFAULT_FRAME_PERIOD: Duration = Duration::from_nanos(1_000_000_000 / 60);

/// Timing information handed to animation hooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameTime {
    /// Clamped time since the previous tick.
    pub delta: Duration,
    /// Time since the first tick.
    pub elapsed: Duration,
}

/// Produces clamped per-frame deltas.
#[derive(Debug, Clone)]
pub struct FrameClock {
    max_delta: Duration,
    frame_period: Duration,
    started: Option<Instant>,
    last: Option<Instant>,
    frames: u64,
}

impl FrameClock {
    pub fn new(max_delta: Duration, frame_period: Duration) -> Self {
        Self {
            max_delta,
            frame_period,
            started: None,
            last: None,
            frames: 0,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_MAX_DELTA, DEFAULT_FRAME_PERIOD)
    }

    /// Advance the clock to `now` and return the frame timing.
    ///
    /// A `now` earlier than the previous tick yields a zero delta.
    pub fn tick(&mut self, now: Instant) -> FrameTime {
        let raw = match self.last {
            Some(last) => now.saturating_duration_since(last),
            None => self.frame_period,
        };
        let started = *self.started.get_or_insert(now);

        self.last = Some(now);
        self.frames += 1;

        FrameTime {
            delta: raw.min(self.max_delta),
            elapsed: now.saturating_duration_since(started),
        }
    }

    /// Number of ticks so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn max_delta(&self) -> Duration {
        self.max_delta
    }

    pub fn frame_period(&self) -> Duration {
        self.frame_period
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_first_tick_is_nominal_period() {
        let mut clock = FrameClock::with_defaults();
        let time = clock.tick(Instant::now());
        assert_eq!(time.delta, DEFAULT_FRAME_PERIOD);
        assert_eq!(time.elapsed, Duration::ZERO);
        assert_eq!(clock.frames(), 1);
    }

    #[test]
    fn test_regular_delta() {
        let mut clock = FrameClock::with_defaults();
        let start = Instant::now();
        clock.tick(start);
        let time = clock.tick(start + Duration::from_millis(16));
        assert_eq!(time.delta, Duration::from_millis(16));
        assert_eq!(time.elapsed, Duration::from_millis(16));
    }

    #[test]
    fn test_delta_clamped_after_stall() {
        let mut clock = FrameClock::with_defaults();
        let start = Instant::now();
        clock.tick(start);
        let time = clock.tick(start + Duration::from_secs(5));
        assert_eq!(time.delta, DEFAULT_MAX_DELTA);
        assert_eq!(time.elapsed, Duration::from_secs(5));
    }

    #[test]
    fn test_backwards_time_is_zero_delta() {
        let mut clock = FrameClock::with_defaults();
        let start = Instant::now() + Duration::from_secs(1);
        clock.tick(start);
        let time = clock.tick(start - Duration::from_millis(10));
        assert_eq!(time.delta, Duration::ZERO);
    }

    proptest! {
        #[test]
        fn prop_delta_never_exceeds_max(steps in proptest::collection::vec(0u64..2_000, 1..50)) {
            let mut clock = FrameClock::with_defaults();
            let mut now = Instant::now();
            for step in steps {
                now += Duration::from_millis(step);
                let time = clock.tick(now);
                prop_assert!(time.delta <= DEFAULT_MAX_DELTA);
            }
        }
    }
}
