//! The lifecycle controller.
//!
//! Owns the single AR session, sequences its three-stage initialization,
//! gates per-frame updates on full readiness and implements the idempotent
//! dispose/reinit protocol.
//!
//! # Init Sequence
//!
//! ```text
//! init_ar() ──► create source ──► spawn init task
//!                                      │
//!                       await source.init()          (SourceInitializing)
//!                       await source.first_frame()   (SourceReady, optional)
//!                       create context @ actual dims (ContextInitializing)
//!                       await context.init()
//!                       copy projection, orientation (ContextReady)
//!                       create tracker               (TrackingActive)
//! ```
//!
//! Each await is raced against the session's cancellation token and, when
//! configured, a timeout. After every await the task re-locks the controller
//! and checks that its session epoch is still the live one before touching
//! shared state; a disposed session's task exits quietly.
//!
//! The init task only holds the controller weakly. Dropping the last
//! controller handle drops the session, which releases its resources and
//! cancels the task even if initialization is parked.

use std::future::Future;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::collab::{ArBackend, DetectionContext, VideoSource};
use crate::error::{ContextError, SessionError};
use crate::scene::{Dimensions, Orientation, SceneNode, SharedStage, Stage};

use super::config::{ControllerConfig, ResizePolicy};
use super::debounce::Debouncer;
use super::events::LifecycleEvent;
use super::session::Session;
use super::state::{InitOutcome, InitStage, LifecycleState};

/// Mutable controller state, guarded by one lock.
struct Core {
    state: LifecycleState,
    last_epoch: u64,
    session: Option<Session>,
}

impl Core {
    /// The live session if it still has the given epoch.
    fn session_mut(&mut self, epoch: u64) -> Result<&mut Session, SessionError> {
        match self.session.as_mut() {
            Some(session) if session.epoch == epoch => Ok(session),
            _ => Err(SessionError::Cancelled),
        }
    }
}

struct ControllerInner {
    config: ControllerConfig,
    backend: Arc<dyn ArBackend>,
    stage: SharedStage,
    core: Mutex<Core>,
    events: broadcast::Sender<LifecycleEvent>,
    resize: Debouncer,
}

impl Drop for ControllerInner {
    fn drop(&mut self) {
        self.resize.cancel();
        if let Some(session) = self.core.get_mut().session.as_ref() {
            debug!(epoch = session.epoch, "Controller dropped, releasing live session");
        }
    }
}

/// Coordinates source, detection context and pose tracker for one page.
///
/// Cheap to clone; all clones drive the same session.
///
/// # Example
///
/// ```ignore
/// use arsession::lifecycle::{ControllerConfig, LifecycleController};
/// use arsession::sim::{SimBackend, SimConfig};
///
/// let backend = Arc::new(SimBackend::new(SimConfig::default()));
/// let controller = LifecycleController::new(ControllerConfig::default(), backend, viewport);
///
/// controller.init_ar();
/// // every frame:
/// controller.update_frame();
/// // later:
/// controller.dispose_ar();
/// ```
#[derive(Clone)]
pub struct LifecycleController {
    inner: Arc<ControllerInner>,
}

impl std::fmt::Debug for LifecycleController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleController")
            .field("state", &self.state())
            .field("epoch", &self.epoch())
            .finish_non_exhaustive()
    }
}

impl LifecycleController {
    /// Create an idle controller with a fresh stage for `viewport`.
    pub fn new(config: ControllerConfig, backend: Arc<dyn ArBackend>, viewport: Dimensions) -> Self {
        let stage = Arc::new(Mutex::new(Stage::new(viewport)));
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        let resize = Debouncer::new(config.resize_quiet);
        Self {
            inner: Arc::new(ControllerInner {
                config,
                backend,
                stage,
                core: Mutex::new(Core {
                    state: LifecycleState::Idle,
                    last_epoch: 0,
                    session: None,
                }),
                events,
                resize,
            }),
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn state(&self) -> LifecycleState {
        self.inner.core.lock().state
    }

    /// Epoch of the live session, if any.
    pub fn epoch(&self) -> Option<u64> {
        self.inner.core.lock().session.as_ref().map(|s| s.epoch)
    }

    pub fn is_tracking(&self) -> bool {
        self.state() == LifecycleState::TrackingActive
    }

    /// Copy of the current scene, camera and viewport.
    pub fn stage(&self) -> Stage {
        self.inner.stage.lock().clone()
    }

    pub fn viewport(&self) -> Dimensions {
        self.inner.stage.lock().viewport
    }

    /// Add a node to the scene; animation hooks can then address it by name.
    pub fn add_scene_node(&self, node: SceneNode) {
        self.inner.stage.lock().scene.add(node);
    }

    /// The mutable stage, for the render loop.
    pub(crate) fn shared_stage(&self) -> SharedStage {
        Arc::clone(&self.inner.stage)
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.inner.config
    }

    /// Subscribe to lifecycle events from this point on.
    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.inner.events.subscribe()
    }

    /// Orientation of the live source's actual frames; `None` without a source.
    pub fn source_orientation(&self) -> Option<Orientation> {
        let core = self.inner.core.lock();
        let source = core.session.as_ref()?.source.as_ref()?;
        let dims = source.frame_dimensions();
        let orientation = Orientation::from_dimensions(dims);
        debug!(width = dims.width, height = dims.height, %orientation, "Source orientation");
        Some(orientation)
    }

    /// Whether a settled-resize action is still waiting for its quiet window.
    pub fn resize_pending(&self) -> bool {
        self.inner.resize.is_pending()
    }

    // =========================================================================
    // Lifecycle commands
    // =========================================================================

    /// Start a new AR session.
    ///
    /// Rejected with a warning (no side effects) unless the controller is
    /// idle. Must be called from within a Tokio runtime; the rest of the
    /// initialization runs on a spawned task.
    pub fn init_ar(&self) -> InitOutcome {
        let mut core = self.inner.core.lock();
        if core.state != LifecycleState::Idle {
            warn!(state = %core.state, "init_ar ignored: session already active");
            self.emit(LifecycleEvent::InitRejected { state: core.state });
            return InitOutcome::Rejected { state: core.state };
        }

        core.last_epoch += 1;
        let epoch = core.last_epoch;
        let source = self.create_source(epoch);
        let session = Session::new(epoch, Arc::clone(&source));
        let cancel = session.cancel.clone();
        core.session = Some(session);
        self.transition(&mut core, epoch, LifecycleState::SourceInitializing);
        drop(core);

        let task = InitTask {
            controller: Arc::downgrade(&self.inner),
            epoch,
            cancel,
            timeout: self.inner.config.init_timeout,
            retry_delay: self.inner.config.retry_delay,
            attempts: self.inner.config.init_attempts.max(1),
        };
        tokio::spawn(task.run(source));
        InitOutcome::Started { epoch }
    }

    /// Tear down the session from whatever state it is in.
    ///
    /// Releases tracker, context and source in that order, cancels any
    /// in-flight initialization and returns to `Idle`. Safe to call when
    /// nothing is initialized, and safe to call repeatedly.
    pub fn dispose_ar(&self) {
        let mut core = self.inner.core.lock();
        let Some(mut session) = core.session.take() else {
            debug!("dispose_ar: no session");
            core.state = LifecycleState::Idle;
            return;
        };

        let epoch = session.epoch;
        self.transition(&mut core, epoch, LifecycleState::Disposing);
        session.release_all();
        drop(session);

        {
            let mut stage = self.inner.stage.lock();
            stage.camera.visible = false;
            stage.scene.visible = false;
        }

        self.transition(&mut core, epoch, LifecycleState::Idle);
        info!(epoch, "AR session disposed");
        self.emit(LifecycleEvent::Disposed { epoch });
    }

    /// Per-frame hook for the render loop.
    ///
    /// Does nothing (and returns `false`) unless tracking is active and the
    /// source is ready. Otherwise feeds the current frame to the detection
    /// context, lets the tracker update the camera and mirrors the camera's
    /// marker-visible flag onto the scene.
    pub fn update_frame(&self) -> bool {
        let core = self.inner.core.lock();
        if core.state != LifecycleState::TrackingActive {
            return false;
        }
        let Some(session) = core.session.as_ref() else {
            return false;
        };
        let (Some(source), Some(context), Some(tracker)) =
            (&session.source, &session.context, &session.tracker)
        else {
            return false;
        };
        if !source.is_ready() {
            return false;
        }
        let Some(frame) = source.current_frame() else {
            return false;
        };

        let detections = context.update(&frame);
        let mut stage = self.inner.stage.lock();
        tracker.update(&detections, &mut stage.camera);
        stage.scene.visible = stage.camera.visible;
        true
    }

    /// Record a viewport change and (re)start the resize quiet window.
    ///
    /// Once the window elapses the configured [`ResizePolicy`] is applied.
    pub fn on_viewport_resize(&self, viewport: Dimensions) {
        self.inner.stage.lock().viewport = viewport;
        debug!(%viewport, "Viewport resized");

        let weak = Arc::downgrade(&self.inner);
        self.inner.resize.trigger(move || {
            if let Some(inner) = weak.upgrade() {
                LifecycleController { inner }.apply_settled_resize();
            }
        });
    }

    /// Apply the resize policy for the current viewport immediately.
    fn apply_settled_resize(&self) {
        let viewport = self.inner.stage.lock().viewport;
        match self.inner.config.resize_policy {
            ResizePolicy::FullReinit => {
                if self.state() == LifecycleState::Idle {
                    debug!(%viewport, "Viewport settled with no session; nothing to reinitialize");
                    return;
                }
                info!(%viewport, "Viewport settled, reinitializing AR session");
                self.emit(LifecycleEvent::Reinitializing { viewport });
                self.dispose_ar();
                self.init_ar();
            }
            ResizePolicy::RecomputeInPlace => self.recompute_in_place(viewport),
        }
    }

    /// Re-derive orientation and canvas size on the live session.
    fn recompute_in_place(&self, viewport: Dimensions) {
        let core = self.inner.core.lock();
        let mut orientation = None;

        if let Some(session) = core.session.as_ref() {
            if let Some(source) = session.source.as_ref().filter(|s| s.is_ready()) {
                let actual = source.frame_dimensions();
                let o = Orientation::from_dimensions(actual);
                orientation = Some(o);
                if let Some(context) = session.context.as_ref() {
                    let canvas = self.inner.config.context.canvas.resolve(actual);
                    context.resize_canvas(canvas);
                    context.set_orientation(o);
                    info!(
                        epoch = session.epoch,
                        %canvas,
                        orientation = %o,
                        "Detection canvas synced to source"
                    );
                }
            }
        }

        self.emit(LifecycleEvent::ViewportSynced {
            viewport,
            orientation,
        });
    }

    // =========================================================================
    // Init steps
    // =========================================================================

    /// Construct the detection context from the source's actual dimensions.
    fn create_context(
        &self,
        epoch: u64,
        source: &Arc<dyn VideoSource>,
    ) -> Result<Arc<dyn DetectionContext>, SessionError> {
        let mut core = self.inner.core.lock();
        core.session_mut(epoch)?;

        let actual = source.frame_dimensions();
        if actual.is_empty() {
            return Err(SessionError::ZeroDimensions {
                width: actual.width,
                height: actual.height,
            });
        }

        let canvas = self.inner.config.context.canvas.resolve(actual);
        info!(
            epoch,
            requested = %source.requested(),
            actual = %actual,
            canvas = %canvas,
            "Source ready, creating detection context"
        );

        self.transition(&mut core, epoch, LifecycleState::ContextInitializing);
        let context = self
            .inner
            .backend
            .create_context(&self.inner.config.context, canvas);
        core.session_mut(epoch)?.context = Some(Arc::clone(&context));
        Ok(context)
    }

    /// Copy calibration results to the camera and bind the pose tracker.
    fn bind_tracker(
        &self,
        epoch: u64,
        source: &Arc<dyn VideoSource>,
        context: &Arc<dyn DetectionContext>,
    ) -> Result<(), SessionError> {
        let mut core = self.inner.core.lock();
        core.session_mut(epoch)?;
        self.transition(&mut core, epoch, LifecycleState::ContextReady);

        let controller = context.controller().ok_or(ContextError::NotCalibrated)?;

        self.inner
            .stage
            .lock()
            .camera
            .projection
            .copy_from(&context.projection_matrix());

        let orientation = Orientation::from_dimensions(source.frame_dimensions());
        context.set_orientation(orientation);

        let tracker = self
            .inner
            .backend
            .create_tracker(controller, &self.inner.config.tracker);
        core.session_mut(epoch)?.tracker = Some(tracker);

        self.transition(&mut core, epoch, LifecycleState::TrackingActive);
        info!(
            epoch,
            marker = %self.inner.config.tracker.marker,
            %orientation,
            "AR tracking active"
        );
        Ok(())
    }

    /// Release a failed attempt's resources.
    ///
    /// With retries left the session stays in `SourceInitializing` with no
    /// source; otherwise it is torn down and `InitFailed` is emitted.
    /// Returns `false` if the session is no longer live.
    fn handle_failed_attempt(
        &self,
        epoch: u64,
        attempt: u32,
        error: SessionError,
        will_retry: bool,
    ) -> bool {
        let mut core = self.inner.core.lock();
        let Ok(session) = core.session_mut(epoch) else {
            return false;
        };

        session.release_context();
        session.release_source();
        self.emit(LifecycleEvent::AttemptFailed {
            epoch,
            attempt,
            error: error.clone(),
            will_retry,
        });

        if will_retry {
            warn!(
                epoch,
                attempt,
                error = %error,
                retry_in_ms = self.inner.config.retry_delay.as_millis() as u64,
                "AR init attempt failed, retrying"
            );
            self.transition(&mut core, epoch, LifecycleState::SourceInitializing);
        } else {
            error!(epoch, attempts = attempt, error = %error, "AR init failed");
            if let Some(mut session) = core.session.take() {
                session.release_all();
            }
            self.transition(&mut core, epoch, LifecycleState::Idle);
            self.emit(LifecycleEvent::InitFailed {
                epoch,
                attempts: attempt,
                error,
            });
        }
        true
    }

    /// Put a fresh source into the live session for the next attempt.
    fn replace_source(&self, epoch: u64) -> Option<Arc<dyn VideoSource>> {
        let mut core = self.inner.core.lock();
        core.session_mut(epoch).ok()?;
        let source = self.create_source(epoch);
        core.session_mut(epoch).ok()?.source = Some(Arc::clone(&source));
        Some(source)
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    /// Ask the backend for a source sized for the current viewport.
    fn create_source(&self, epoch: u64) -> Arc<dyn VideoSource> {
        let viewport = self.inner.stage.lock().viewport;
        let requested = self.inner.config.source.requested_for(viewport);
        info!(
            epoch,
            kind = %self.inner.config.source.kind,
            %viewport,
            %requested,
            "Initializing AR source"
        );
        self.inner
            .backend
            .create_source(&self.inner.config.source, requested)
    }

    fn transition(&self, core: &mut Core, epoch: u64, to: LifecycleState) {
        let from = std::mem::replace(&mut core.state, to);
        if from == to {
            return;
        }
        debug!(epoch, %from, %to, "Lifecycle transition");
        self.emit(LifecycleEvent::StateChanged { epoch, from, to });
    }

    fn emit(&self, event: LifecycleEvent) {
        // No subscribers is fine
        let _ = self.inner.events.send(event);
    }
}

// =============================================================================
// Init task
// =============================================================================

/// Initialization of one session, running on its own task.
///
/// Upgrades the controller only between awaits; a failed upgrade means the
/// controller is gone and ends the task like a disposal would.
struct InitTask {
    controller: Weak<ControllerInner>,
    epoch: u64,
    cancel: CancellationToken,
    timeout: Option<Duration>,
    retry_delay: Duration,
    attempts: u32,
}

impl InitTask {
    fn controller(&self) -> Result<LifecycleController, SessionError> {
        self.controller
            .upgrade()
            .map(|inner| LifecycleController { inner })
            .ok_or(SessionError::Cancelled)
    }

    /// Drive initialization, retrying up to the configured number of attempts.
    async fn run(self, first_source: Arc<dyn VideoSource>) {
        let epoch = self.epoch;
        let mut source = first_source;
        let mut attempt = 1;

        loop {
            let error = match self.attempt(&source).await {
                Ok(()) => return,
                Err(e) => e,
            };
            if error.is_cancelled() {
                debug!(epoch, attempt, "Init task stopped: session disposed");
                return;
            }

            let will_retry = attempt < self.attempts;
            let Ok(controller) = self.controller() else {
                return;
            };
            if !controller.handle_failed_attempt(epoch, attempt, error, will_retry) || !will_retry {
                return;
            }
            drop(controller);

            tokio::select! {
                _ = self.cancel.cancelled() => return,
                _ = tokio::time::sleep(self.retry_delay) => {}
            }

            match self.controller().ok().and_then(|c| c.replace_source(epoch)) {
                Some(next) => source = next,
                None => return,
            }
            attempt += 1;
        }
    }

    /// One pass through source → context → tracker.
    async fn attempt(&self, source: &Arc<dyn VideoSource>) -> Result<(), SessionError> {
        let epoch = self.epoch;
        self.await_stage(InitStage::SourceReady, source.init()).await?;

        let wait_for_first_frame = {
            let controller = self.controller()?;
            let mut core = controller.inner.core.lock();
            core.session_mut(epoch)?;
            controller.transition(&mut core, epoch, LifecycleState::SourceReady);
            controller.inner.config.wait_for_first_frame
        };

        if wait_for_first_frame {
            self.await_stage(InitStage::FirstFrame, source.first_frame())
                .await?;
        }

        let context = self.controller()?.create_context(epoch, source)?;

        self.await_stage(InitStage::ContextInit, context.init())
            .await?;

        self.controller()?.bind_tracker(epoch, source, &context)
    }

    /// Await one suspension point, racing disposal and the optional timeout.
    async fn await_stage<T, E, F>(&self, stage: InitStage, fut: F) -> Result<T, SessionError>
    where
        F: Future<Output = Result<T, E>>,
        SessionError: From<E>,
    {
        let bounded = async {
            match self.timeout {
                Some(limit) => tokio::time::timeout(limit, fut)
                    .await
                    .map_err(|_| SessionError::Timeout {
                        stage,
                        elapsed: limit,
                    }),
                None => Ok(fut.await),
            }
        };

        tokio::select! {
            _ = self.cancel.cancelled() => Err(SessionError::Cancelled),
            result = bounded => result?.map_err(SessionError::from),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::Matrix4;
    use crate::sim::{SimBackend, SimConfig};
    use std::time::Duration;

    const VIEWPORT: Dimensions = Dimensions::new(640, 480);

    fn controller_with(
        config: ControllerConfig,
        sim: SimConfig,
    ) -> (LifecycleController, Arc<SimBackend>) {
        let backend = Arc::new(SimBackend::new(sim));
        let controller = LifecycleController::new(
            config,
            Arc::clone(&backend) as Arc<dyn ArBackend>,
            VIEWPORT,
        );
        (controller, backend)
    }

    async fn settle(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_controller_is_idle() {
        let (controller, _) = controller_with(ControllerConfig::default(), SimConfig::default());
        assert_eq!(controller.state(), LifecycleState::Idle);
        assert_eq!(controller.epoch(), None);
        assert_eq!(controller.source_orientation(), None);
        assert!(!controller.update_frame());
    }

    #[tokio::test(start_paused = true)]
    async fn test_init_reaches_tracking_active() {
        let (controller, backend) =
            controller_with(ControllerConfig::default(), SimConfig::default());

        assert_eq!(controller.init_ar(), InitOutcome::Started { epoch: 1 });
        assert_eq!(controller.state(), LifecycleState::SourceInitializing);

        settle(1_000).await;

        assert_eq!(controller.state(), LifecycleState::TrackingActive);
        let stats = backend.stats().snapshot();
        assert_eq!(stats.sources_created, 1);
        assert_eq!(stats.contexts_created, 1);
        assert_eq!(stats.trackers_created, 1);
        assert_eq!(stats.context_canvases, vec![Dimensions::new(640, 480)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_projection_copied_to_camera() {
        let (controller, _) = controller_with(ControllerConfig::default(), SimConfig::default());
        controller.init_ar();
        settle(1_000).await;

        assert_ne!(controller.stage().camera.projection, Matrix4::IDENTITY);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_init_is_rejected() {
        let (controller, backend) =
            controller_with(ControllerConfig::default(), SimConfig::default());
        let mut events = controller.subscribe();

        assert!(controller.init_ar().is_started());
        assert_eq!(
            controller.init_ar(),
            InitOutcome::Rejected {
                state: LifecycleState::SourceInitializing
            }
        );
        settle(1_000).await;
        assert!(!controller.init_ar().is_started());

        let stats = backend.stats().snapshot();
        assert_eq!(stats.sources_created, 1);
        assert_eq!(stats.contexts_created, 1);
        assert_eq!(stats.trackers_created, 1);

        let mut initializing = 0;
        let mut rejected = 0;
        while let Ok(event) = events.try_recv() {
            match event {
                LifecycleEvent::StateChanged {
                    to: LifecycleState::SourceInitializing,
                    ..
                } => initializing += 1,
                LifecycleEvent::InitRejected { .. } => rejected += 1,
                _ => {}
            }
        }
        assert_eq!(initializing, 1);
        assert_eq!(rejected, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispose_when_never_initialized() {
        let (controller, backend) =
            controller_with(ControllerConfig::default(), SimConfig::default());
        controller.dispose_ar();
        controller.dispose_ar();
        assert_eq!(controller.state(), LifecycleState::Idle);
        assert_eq!(backend.stats().snapshot().sources_disposed, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_double_dispose_after_tracking() {
        let (controller, backend) =
            controller_with(ControllerConfig::default(), SimConfig::default());
        controller.init_ar();
        settle(1_000).await;

        controller.dispose_ar();
        controller.dispose_ar();

        assert_eq!(controller.state(), LifecycleState::Idle);
        let stats = backend.stats().snapshot();
        assert_eq!(stats.sources_disposed, 1);
        assert_eq!(stats.contexts_disposed, 1);
        assert_eq!(stats.trackers_disposed, 1);
        assert!(!controller.stage().scene.visible);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispose_while_source_initializing() {
        let sim = SimConfig::default().with_ready_delay(Duration::from_secs(10));
        let (controller, backend) = controller_with(ControllerConfig::default(), sim);

        controller.init_ar();
        settle(100).await;
        controller.dispose_ar();
        settle(20_000).await;

        assert_eq!(controller.state(), LifecycleState::Idle);
        let stats = backend.stats().snapshot();
        assert_eq!(stats.sources_disposed, 1);
        assert_eq!(stats.contexts_created, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispose_while_context_initializing() {
        let sim = SimConfig::default().with_context_delay(Duration::from_secs(10));
        let (controller, backend) = controller_with(ControllerConfig::default(), sim);

        controller.init_ar();
        settle(1_000).await;
        assert_eq!(controller.state(), LifecycleState::ContextInitializing);

        controller.dispose_ar();
        settle(20_000).await;

        assert_eq!(controller.state(), LifecycleState::Idle);
        let stats = backend.stats().snapshot();
        assert_eq!(stats.contexts_disposed, 1);
        assert_eq!(stats.trackers_created, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_frame_noop_until_tracking() {
        let sim = SimConfig::default().with_context_delay(Duration::from_secs(5));
        let (controller, backend) = controller_with(ControllerConfig::default(), sim);

        controller.init_ar();
        for _ in 0..10 {
            assert!(!controller.update_frame());
            settle(100).await;
        }
        assert_eq!(backend.stats().snapshot().context_updates, 0);

        settle(10_000).await;
        assert!(controller.update_frame());
        assert!(controller.update_frame());
        assert_eq!(backend.stats().snapshot().context_updates, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_scene_visibility_mirrors_camera() {
        let (controller, _) = controller_with(ControllerConfig::default(), SimConfig::default());
        controller.init_ar();
        settle(1_000).await;

        // Default smoothing needs two sightings before the marker is visible
        controller.update_frame();
        controller.update_frame();
        controller.update_frame();

        let stage = controller.stage();
        assert!(stage.camera.visible);
        assert!(stage.scene.visible);
    }

    #[tokio::test(start_paused = true)]
    async fn test_source_orientation_uses_actual_dimensions() {
        let sim = SimConfig::default().with_native_resolution(Some(Dimensions::new(720, 1280)));
        let (controller, backend) = controller_with(ControllerConfig::default(), sim);

        controller.init_ar();
        settle(1_000).await;

        assert_eq!(controller.source_orientation(), Some(Orientation::Portrait));
        assert_eq!(
            backend.stats().snapshot().context_canvases,
            vec![Dimensions::new(720, 1280)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_init_after_dispose_starts_new_epoch() {
        let (controller, backend) =
            controller_with(ControllerConfig::default(), SimConfig::default());

        controller.init_ar();
        settle(1_000).await;
        controller.dispose_ar();

        assert_eq!(controller.init_ar(), InitOutcome::Started { epoch: 2 });
        settle(1_000).await;
        assert_eq!(controller.state(), LifecycleState::TrackingActive);
        assert_eq!(controller.epoch(), Some(2));
        assert_eq!(backend.stats().snapshot().trackers_created, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_controller_releases_parked_session() {
        let (controller, backend) = controller_with(
            ControllerConfig::default(),
            SimConfig::default().with_never_ready(true),
        );
        controller.init_ar();
        settle(500).await;
        assert_eq!(controller.state(), LifecycleState::SourceInitializing);

        drop(controller);
        settle(60_000).await;

        let stats = backend.stats().snapshot();
        assert_eq!(stats.sources_created, 1);
        assert_eq!(stats.live(), (0, 0, 0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_controller_releases_tracking_session() {
        let (controller, backend) =
            controller_with(ControllerConfig::default(), SimConfig::default());
        controller.init_ar();
        settle(1_000).await;
        assert!(controller.is_tracking());

        drop(controller);

        assert_eq!(backend.stats().snapshot().live(), (0, 0, 0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_resize_does_not_outlive_controller() {
        let (controller, backend) =
            controller_with(ControllerConfig::default(), SimConfig::default());
        controller.init_ar();
        settle(1_000).await;

        controller.on_viewport_resize(Dimensions::new(480, 640));
        drop(controller);
        settle(5_000).await;

        let stats = backend.stats().snapshot();
        assert_eq!(stats.sources_created, 1);
        assert_eq!(stats.live(), (0, 0, 0));
    }

    #[tokio::test]
    async fn test_stage_is_a_snapshot() {
        let (controller, _) = controller_with(ControllerConfig::default(), SimConfig::default());
        controller.add_scene_node(SceneNode::new("cube"));

        let mut copy = controller.stage();
        copy.scene.visible = true;
        copy.viewport = Dimensions::new(1, 1);

        let stage = controller.stage();
        assert!(stage.scene.node("cube").is_some());
        assert!(!stage.scene.visible);
        assert_eq!(controller.viewport(), VIEWPORT);
    }
}
