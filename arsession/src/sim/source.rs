//! Simulated video source.

use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::debug;

use crate::collab::{Frame, SourceKind, VideoSource};
use crate::error::SourceError;
use crate::scene::Dimensions;

use super::stats::SimStats;
use super::SimConfig;

#[derive(Debug, Default)]
struct SourceState {
    ready_at: Option<Instant>,
    disposed: bool,
    frame_index: u64,
}

/// A source that becomes ready after a delay and delivers synthetic frames.
///
/// Frame dimensions read 0×0 until `first_frame_delay` after readiness,
/// like a media element whose metadata has not loaded yet.
#[derive(Debug)]
pub struct SimSource {
    id: u64,
    kind: SourceKind,
    requested: Dimensions,
    actual: Dimensions,
    ready_delay: Duration,
    first_frame_delay: Duration,
    never_ready: bool,
    fails: bool,
    stats: Arc<SimStats>,
    state: Mutex<SourceState>,
}

impl SimSource {
    pub(crate) fn new(
        id: u64,
        kind: SourceKind,
        requested: Dimensions,
        config: &SimConfig,
        fails: bool,
        stats: Arc<SimStats>,
    ) -> Self {
        Self {
            id,
            kind,
            requested,
            actual: config.native_resolution.unwrap_or(requested),
            ready_delay: config.ready_delay,
            first_frame_delay: config.first_frame_delay,
            never_ready: config.never_ready,
            fails,
            stats,
            state: Mutex::new(SourceState::default()),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_disposed(&self) -> bool {
        self.state.lock().disposed
    }

    fn frames_available(&self, state: &SourceState) -> bool {
        !state.disposed
            && state
                .ready_at
                .is_some_and(|at| Instant::now() >= at + self.first_frame_delay)
    }
}

impl VideoSource for SimSource {
    fn kind(&self) -> &SourceKind {
        &self.kind
    }

    fn requested(&self) -> Dimensions {
        self.requested
    }

    fn init(&self) -> BoxFuture<'_, Result<(), SourceError>> {
        Box::pin(async move {
            if self.never_ready {
                return futures::future::pending().await;
            }
            tokio::time::sleep(self.ready_delay).await;
            if self.fails {
                return Err(SourceError::PermissionDenied);
            }

            let mut state = self.state.lock();
            if state.disposed {
                return Err(SourceError::Disposed);
            }
            state.ready_at = Some(Instant::now());
            debug!(id = self.id, "Sim: source ready");
            Ok(())
        })
    }

    fn first_frame(&self) -> BoxFuture<'_, Result<(), SourceError>> {
        Box::pin(async move {
            let deadline = {
                let state = self.state.lock();
                if state.disposed {
                    return Err(SourceError::Disposed);
                }
                match state.ready_at {
                    Some(at) => at + self.first_frame_delay,
                    None => return Err(SourceError::NotFound("no stream".to_string())),
                }
            };
            tokio::time::sleep_until(deadline).await;
            if self.state.lock().disposed {
                return Err(SourceError::Disposed);
            }
            Ok(())
        })
    }

    fn is_ready(&self) -> bool {
        let state = self.state.lock();
        state.ready_at.is_some() && !state.disposed
    }

    fn frame_dimensions(&self) -> Dimensions {
        let state = self.state.lock();
        if self.frames_available(&state) {
            self.actual
        } else {
            Dimensions::default()
        }
    }

    fn current_frame(&self) -> Option<Frame> {
        let mut state = self.state.lock();
        if !self.frames_available(&state) {
            return None;
        }
        let index = state.frame_index;
        state.frame_index += 1;
        Some(Frame {
            index,
            dimensions: self.actual,
            captured_at: Instant::now().into_std(),
        })
    }

    fn dispose(&self) {
        let mut state = self.state.lock();
        if state.disposed {
            return;
        }
        state.disposed = true;
        state.ready_at = None;
        self.stats.source_disposed();
        debug!(id = self.id, "Sim: media tracks stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(config: &SimConfig, fails: bool) -> (SimSource, Arc<SimStats>) {
        let stats = Arc::new(SimStats::default());
        let source = SimSource::new(
            1,
            SourceKind::Webcam,
            Dimensions::new(640, 480),
            config,
            fails,
            Arc::clone(&stats),
        );
        (source, stats)
    }

    #[tokio::test(start_paused = true)]
    async fn test_dimensions_zero_until_first_frame() {
        let config = SimConfig::default().with_first_frame_delay(Duration::from_millis(500));
        let (source, _) = source(&config, false);

        assert!(!source.is_ready());
        source.init().await.unwrap();
        assert!(source.is_ready());
        assert!(source.frame_dimensions().is_empty());
        assert!(source.current_frame().is_none());

        source.first_frame().await.unwrap();
        assert_eq!(source.frame_dimensions(), Dimensions::new(640, 480));
        assert_eq!(source.current_frame().unwrap().index, 0);
        assert_eq!(source.current_frame().unwrap().index, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_native_resolution_overrides_request() {
        let config =
            SimConfig::default().with_native_resolution(Some(Dimensions::new(1280, 720)));
        let (source, _) = source(&config, false);
        source.init().await.unwrap();
        source.first_frame().await.unwrap();

        assert_eq!(source.requested(), Dimensions::new(640, 480));
        assert_eq!(source.frame_dimensions(), Dimensions::new(1280, 720));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_source() {
        let (source, _) = source(&SimConfig::default(), true);
        assert_eq!(source.init().await, Err(SourceError::PermissionDenied));
        assert!(!source.is_ready());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispose_is_idempotent() {
        let (source, stats) = source(&SimConfig::default(), false);
        source.init().await.unwrap();

        source.dispose();
        source.dispose();

        assert!(source.is_disposed());
        assert!(!source.is_ready());
        assert!(source.frame_dimensions().is_empty());
        assert_eq!(stats.snapshot().sources_disposed, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_init_after_dispose_fails() {
        let (source, _) = source(&SimConfig::default(), false);
        source.dispose();
        assert_eq!(source.init().await, Err(SourceError::Disposed));
    }
}
