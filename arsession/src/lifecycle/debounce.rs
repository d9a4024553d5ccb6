//! Trailing-edge debouncer for viewport resize bursts.
//!
//! Every trigger cancels the pending timer and starts a new one; the action
//! runs only after a full quiet window with no further triggers.
//!
//! ```text
//! resize  resize   resize
//!   │       │        │
//!   ▼       ▼        ▼
//!   ├─ ✗ ───┼─ ✗ ────┼──────── quiet ────────► action (once)
//! ```
//!
//! A generation counter backs up the cancellation token: a timer that wakes
//! after it was superseded (the token raced with the sleep) sees a stale
//! generation and does nothing, so two timers never both fire.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::trace;

#[derive(Debug, Default)]
struct DebounceState {
    generation: u64,
    pending: Option<CancellationToken>,
}

/// Coalesces bursts of triggers into one delayed action.
#[derive(Debug, Clone)]
pub struct Debouncer {
    quiet: Duration,
    state: Arc<Mutex<DebounceState>>,
}

impl Debouncer {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            state: Arc::new(Mutex::new(DebounceState::default())),
        }
    }

    pub fn quiet(&self) -> Duration {
        self.quiet
    }

    /// Restart the quiet window; `action` runs if it elapses undisturbed.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn trigger<F>(&self, action: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let token = CancellationToken::new();
        let generation = {
            let mut state = self.state.lock();
            if let Some(previous) = state.pending.replace(token.clone()) {
                previous.cancel();
            }
            state.generation += 1;
            state.generation
        };

        let state = Arc::clone(&self.state);
        let quiet = self.quiet;
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {
                    trace!(generation, "Debounce timer superseded");
                }
                _ = tokio::time::sleep(quiet) => {
                    let current = {
                        let mut state = state.lock();
                        if state.generation == generation {
                            state.pending = None;
                            true
                        } else {
                            false
                        }
                    };
                    if current {
                        action();
                    }
                }
            }
        });
    }

    /// Drop the pending action, if any.
    pub fn cancel(&self) {
        let mut state = self.state.lock();
        state.generation += 1;
        if let Some(pending) = state.pending.take() {
            pending.cancel();
        }
    }

    /// Whether an action is waiting for its quiet window.
    pub fn is_pending(&self) -> bool {
        self.state.lock().pending.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter() -> (Arc<AtomicUsize>, impl Fn() -> Box<dyn FnOnce() + Send>) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        let make = move || {
            let c = Arc::clone(&c);
            Box::new(move || {
                c.fetch_add(1, Ordering::SeqCst);
            }) as Box<dyn FnOnce() + Send>
        };
        (count, make)
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_trigger_fires_after_quiet() {
        let debouncer = Debouncer::new(Duration::from_millis(1000));
        let (count, make) = counter();

        debouncer.trigger(make());
        assert!(debouncer.is_pending());

        tokio::time::sleep(Duration::from_millis(999)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!debouncer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_coalesces_to_one() {
        let debouncer = Debouncer::new(Duration::from_millis(1000));
        let (count, make) = counter();

        for _ in 0..5 {
            debouncer.trigger(make());
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        // 900ms after the last trigger: still quiet-waiting
        tokio::time::sleep(Duration::from_millis(800)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_drops_pending_action() {
        let debouncer = Debouncer::new(Duration::from_millis(100));
        let (count, make) = counter();

        debouncer.trigger(make());
        debouncer.cancel();
        tokio::time::sleep(Duration::from_millis(500)).await;

        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert!(!debouncer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_separate_bursts_fire_separately() {
        let debouncer = Debouncer::new(Duration::from_millis(100));
        let (count, make) = counter();

        debouncer.trigger(make());
        tokio::time::sleep(Duration::from_millis(200)).await;
        debouncer.trigger(make());
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(count.load(Ordering::SeqCst), 2);
    }
}
