//! Deterministic in-process collaborators.
//!
//! `SimBackend` stands in for a real camera + marker detector: sources become
//! ready after a configurable delay, contexts "calibrate" after another, and
//! a marker appears in view according to a schedule. Everything runs on Tokio
//! timers, so tests with paused time are fully deterministic.
//!
//! [`SimStats`] counts constructions and disposals so callers can verify the
//! controller's ordering and cleanup guarantees.

mod context;
mod renderer;
mod source;
mod stats;
mod tracker;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

pub use context::SimContext;
pub use renderer::{RecordingRenderer, RenderLog};
pub use source::SimSource;
pub use stats::{SimStats, SimStatsSnapshot};
pub use tracker::SimTracker;

use crate::collab::{
    ArBackend, ContextConfig, ControllerHandle, DetectionContext, MarkerKind, PoseTracker,
    SourceConfig, TrackerConfig, VideoSource,
};
use crate::scene::Dimensions;

/// When the simulated marker is in front of the camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerVisibility {
    Always,
    Never,
    /// Visible for the first `visible` frames of every `period` frames.
    Cycle { period: u64, visible: u64 },
}

impl MarkerVisibility {
    pub fn is_visible(&self, frame_index: u64) -> bool {
        match *self {
            MarkerVisibility::Always => true,
            MarkerVisibility::Never => false,
            MarkerVisibility::Cycle { period, visible } => {
                period > 0 && frame_index % period < visible
            }
        }
    }
}

/// Behavior of the simulated collaborators.
#[derive(Debug, Clone, PartialEq)]
pub struct SimConfig {
    /// Delay before a source reports ready.
    pub ready_delay: Duration,
    /// Delay after readiness before frames have dimensions.
    pub first_frame_delay: Duration,
    /// Delay before a context finishes calibrating.
    pub context_delay: Duration,
    /// Resolution the "device" delivers. `None` honors the request.
    pub native_resolution: Option<Dimensions>,
    /// Sources never become ready (e.g. permission prompt never answered).
    pub never_ready: bool,
    /// The first N sources fail with permission denied.
    pub failing_sources: u64,
    /// Marker placed in front of the camera.
    pub marker: MarkerKind,
    pub visibility: MarkerVisibility,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            ready_delay: Duration::from_millis(100),
            first_frame_delay: Duration::from_millis(50),
            context_delay: Duration::from_millis(200),
            native_resolution: None,
            never_ready: false,
            failing_sources: 0,
            marker: MarkerKind::Barcode { value: 0 },
            visibility: MarkerVisibility::Always,
        }
    }
}

impl SimConfig {
    pub fn with_ready_delay(mut self, delay: Duration) -> Self {
        self.ready_delay = delay;
        self
    }

    pub fn with_first_frame_delay(mut self, delay: Duration) -> Self {
        self.first_frame_delay = delay;
        self
    }

    pub fn with_context_delay(mut self, delay: Duration) -> Self {
        self.context_delay = delay;
        self
    }

    pub fn with_native_resolution(mut self, resolution: Option<Dimensions>) -> Self {
        self.native_resolution = resolution;
        self
    }

    pub fn with_never_ready(mut self, never_ready: bool) -> Self {
        self.never_ready = never_ready;
        self
    }

    pub fn with_failing_sources(mut self, count: u64) -> Self {
        self.failing_sources = count;
        self
    }

    pub fn with_marker(mut self, marker: MarkerKind) -> Self {
        self.marker = marker;
        self
    }

    pub fn with_visibility(mut self, visibility: MarkerVisibility) -> Self {
        self.visibility = visibility;
        self
    }
}

/// Backend producing simulated sources, contexts and trackers.
#[derive(Debug)]
pub struct SimBackend {
    config: SimConfig,
    stats: Arc<SimStats>,
    next_id: AtomicU64,
}

impl SimBackend {
    pub fn new(config: SimConfig) -> Self {
        Self {
            config,
            stats: Arc::new(SimStats::default()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn stats(&self) -> Arc<SimStats> {
        Arc::clone(&self.stats)
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }
}

impl ArBackend for SimBackend {
    fn create_source(&self, config: &SourceConfig, requested: Dimensions) -> Arc<dyn VideoSource> {
        let ordinal = self.stats.record_source(requested);
        let fails = ordinal <= self.config.failing_sources;
        let id = self.next_id();
        debug!(id, kind = %config.kind, %requested, fails, "Sim: source created");
        Arc::new(SimSource::new(
            id,
            config.kind.clone(),
            requested,
            &self.config,
            fails,
            Arc::clone(&self.stats),
        ))
    }

    fn create_context(
        &self,
        config: &ContextConfig,
        canvas: Dimensions,
    ) -> Arc<dyn DetectionContext> {
        self.stats.record_context(canvas);
        let id = self.next_id();
        debug!(id, %canvas, mode = %config.detection_mode, "Sim: context created");
        Arc::new(SimContext::new(
            id,
            config.clone(),
            canvas,
            &self.config,
            Arc::clone(&self.stats),
        ))
    }

    fn create_tracker(
        &self,
        controller: ControllerHandle,
        config: &TrackerConfig,
    ) -> Arc<dyn PoseTracker> {
        self.stats.record_tracker();
        debug!(controller = controller.id, marker = %config.marker, "Sim: tracker created");
        Arc::new(SimTracker::new(
            controller,
            config.clone(),
            Arc::clone(&self.stats),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_visibility_cycle() {
        let cycle = MarkerVisibility::Cycle {
            period: 10,
            visible: 3,
        };
        assert!(cycle.is_visible(0));
        assert!(cycle.is_visible(2));
        assert!(!cycle.is_visible(3));
        assert!(cycle.is_visible(12));
        assert!(!MarkerVisibility::Cycle {
            period: 0,
            visible: 3
        }
        .is_visible(0));
    }

    #[test]
    fn test_backend_records_constructions() {
        let backend = SimBackend::new(SimConfig::default());
        backend.create_source(&SourceConfig::default(), Dimensions::new(640, 480));
        backend.create_context(&ContextConfig::default(), Dimensions::new(640, 480));

        let stats = backend.stats().snapshot();
        assert_eq!(stats.sources_created, 1);
        assert_eq!(stats.source_requests, vec![Dimensions::new(640, 480)]);
        assert_eq!(stats.contexts_created, 1);
        assert_eq!(stats.trackers_created, 0);
    }
}
