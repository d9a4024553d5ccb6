//! Resources owned by one AR session.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::collab::{DetectionContext, PoseTracker, VideoSource};

/// The live source/context/tracker triple of one session.
///
/// At most one `Session` exists per controller. Every release method is
/// check-before-act, so releasing twice or releasing a stage that was never
/// reached is a no-op. Dropping a session releases whatever it still holds.
pub(crate) struct Session {
    /// Identifies this session; init tasks compare it after every await.
    pub epoch: u64,
    /// Cancelled on disposal to wake the init task.
    pub cancel: CancellationToken,
    pub source: Option<Arc<dyn VideoSource>>,
    pub context: Option<Arc<dyn DetectionContext>>,
    pub tracker: Option<Arc<dyn PoseTracker>>,
}

impl Session {
    pub fn new(epoch: u64, source: Arc<dyn VideoSource>) -> Self {
        Self {
            epoch,
            cancel: CancellationToken::new(),
            source: Some(source),
            context: None,
            tracker: None,
        }
    }

    /// Release the tracker and the context it is bound to.
    ///
    /// The tracker reference is always dropped together with its context,
    /// whether or not the detection engine cascades the disposal itself.
    pub fn release_context(&mut self) {
        if let Some(tracker) = self.tracker.take() {
            tracker.dispose();
            debug!(epoch = self.epoch, "Pose tracker released");
        }
        if let Some(context) = self.context.take() {
            context.dispose();
            debug!(epoch = self.epoch, "Detection context released");
        }
    }

    /// Stop the media stream and drop the source.
    pub fn release_source(&mut self) {
        if let Some(source) = self.source.take() {
            source.dispose();
            debug!(epoch = self.epoch, "Video source released");
        }
    }

    /// Cancel in-flight initialization and release everything, tracker first.
    pub fn release_all(&mut self) {
        self.cancel.cancel();
        self.release_context();
        self.release_source();
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.release_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collab::{ArBackend, ContextConfig, SourceConfig, TrackerConfig};
    use crate::scene::Dimensions;
    use crate::sim::{SimBackend, SimConfig};

    fn full_session(backend: &SimBackend) -> Session {
        let dims = Dimensions::new(640, 480);
        let source = backend.create_source(&SourceConfig::default(), dims);
        let context = backend.create_context(&ContextConfig::default(), dims);
        let tracker = backend.create_tracker(
            crate::collab::ControllerHandle { id: 1, canvas: dims },
            &TrackerConfig::default(),
        );
        let mut session = Session::new(1, source);
        session.context = Some(context);
        session.tracker = Some(tracker);
        session
    }

    #[test]
    fn test_release_all_disposes_each_once() {
        let backend = SimBackend::new(SimConfig::default());
        let mut session = full_session(&backend);

        session.release_all();
        session.release_all();

        let stats = backend.stats().snapshot();
        assert_eq!(stats.trackers_disposed, 1);
        assert_eq!(stats.contexts_disposed, 1);
        assert_eq!(stats.sources_disposed, 1);
        assert!(session.cancel.is_cancelled());
        assert!(session.source.is_none());
    }

    #[test]
    fn test_release_context_drops_tracker() {
        let backend = SimBackend::new(SimConfig::default());
        let mut session = full_session(&backend);

        session.release_context();

        assert!(session.tracker.is_none());
        assert!(session.context.is_none());
        assert!(session.source.is_some());
    }

    #[test]
    fn test_drop_releases_resources() {
        let backend = SimBackend::new(SimConfig::default());
        drop(full_session(&backend));

        let stats = backend.stats().snapshot();
        assert_eq!(stats.sources_disposed, 1);
        assert_eq!(stats.contexts_disposed, 1);
    }

    #[test]
    fn test_partial_session_release() {
        let backend = SimBackend::new(SimConfig::default());
        let source = backend.create_source(&SourceConfig::default(), Dimensions::new(640, 480));
        let mut session = Session::new(7, source);

        session.release_all();

        let stats = backend.stats().snapshot();
        assert_eq!(stats.sources_disposed, 1);
        assert_eq!(stats.contexts_disposed, 0);
    }
}
