//! The per-frame render loop.
//!
//! Runs at display rate regardless of AR readiness. Each tick:
//!
//! ```text
//! FrameClock::tick ──► controller.update_frame() ──► animation hooks ──► renderer
//!                        (no-op until tracking)      (scene, FrameTime)   set_size if
//!                                                                         viewport changed,
//!                                                                         then render
//! ```
//!
//! While AR is still initializing the renderer keeps drawing the scene with
//! the camera's last-known state.

use std::time::{Duration, Instant};

use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::clock::{FrameClock, FrameTime, DEFAULT_MAX_DELTA};
use crate::collab::Renderer;
use crate::lifecycle::LifecycleController;
use crate::scene::{Dimensions, Scene, Stage};

/// Default target frame rate.
pub const DEFAULT_FRAME_RATE: u32 = 60;

/// Highest accepted frame rate.
pub const MAX_FRAME_RATE: u32 = 1000;

/// Scene animation callback, invoked once per tick with the clamped delta.
pub type AnimationHook = Box<dyn FnMut(&mut Scene, FrameTime) + Send>;

/// Render loop settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderConfig {
    /// Ticks per second for [`RenderLoop::run`].
    pub frame_rate: u32,
    /// Upper bound on the delta handed to animation hooks.
    pub max_delta: Duration,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            frame_rate: DEFAULT_FRAME_RATE,
            max_delta: DEFAULT_MAX_DELTA,
        }
    }
}

impl RenderConfig {
    pub fn with_frame_rate(mut self, frame_rate: u32) -> Self {
        self.frame_rate = frame_rate;
        self
    }

    pub fn with_max_delta(mut self, max_delta: Duration) -> Self {
        self.max_delta = max_delta;
        self
    }

    /// Nominal time between ticks, with the rate clamped to `1..=MAX_FRAME_RATE`.
    pub fn frame_period(&self) -> Duration {
        Duration::from_secs(1) / self.frame_rate.clamp(1, MAX_FRAME_RATE)
    }
}

/// Drives `update_frame`, animation hooks and the renderer every tick.
pub struct RenderLoop {
    controller: LifecycleController,
    renderer: Box<dyn Renderer>,
    config: RenderConfig,
    clock: FrameClock,
    hooks: Vec<AnimationHook>,
    rendered_size: Option<Dimensions>,
}

impl RenderLoop {
    pub fn new(
        controller: LifecycleController,
        renderer: Box<dyn Renderer>,
        config: RenderConfig,
    ) -> Self {
        let clock = FrameClock::new(config.max_delta, config.frame_period());
        Self {
            controller,
            renderer,
            config,
            clock,
            hooks: Vec::new(),
            rendered_size: None,
        }
    }

    /// Register a scene animation hook. Hooks run in registration order.
    pub fn add_hook<F>(&mut self, hook: F)
    where
        F: FnMut(&mut Scene, FrameTime) + Send + 'static,
    {
        self.hooks.push(Box::new(hook));
    }

    pub fn frames(&self) -> u64 {
        self.clock.frames()
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Run a single frame at `now`.
    pub fn tick(&mut self, now: Instant) -> FrameTime {
        let time = self.clock.tick(now);

        // Takes and releases the stage lock itself.
        self.controller.update_frame();

        let stage = self.controller.shared_stage();
        let mut guard = stage.lock();
        let Stage {
            scene,
            camera,
            viewport,
        } = &mut *guard;

        for hook in &mut self.hooks {
            hook(scene, time);
        }

        if self.rendered_size != Some(*viewport) {
            debug!(width = viewport.width, height = viewport.height, "Renderer resized");
            self.renderer.set_size(*viewport);
            self.rendered_size = Some(*viewport);
        }

        self.renderer.render(scene, camera);
        time
    }

    /// Tick forever at the configured frame rate.
    ///
    /// There is no stop operation; drop the future to end the loop.
    pub async fn run(mut self) {
        let mut interval = tokio::time::interval(self.config.frame_period());
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(frame_rate = self.config.frame_rate, "Render loop started");
        loop {
            let now = interval.tick().await;
            self.tick(now.into_std());
        }
    }
}

impl std::fmt::Debug for RenderLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderLoop")
            .field("config", &self.config)
            .field("frames", &self.clock.frames())
            .field("hooks", &self.hooks.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::lifecycle::{ControllerConfig, LifecycleState};
    use crate::scene::SceneNode;
    use crate::sim::{RecordingRenderer, SimBackend, SimConfig};

    const VIEWPORT: Dimensions = Dimensions::new(640, 480);

    fn render_loop() -> (RenderLoop, RecordingRenderer, Arc<SimBackend>) {
        let backend = Arc::new(SimBackend::new(SimConfig::default()));
        let controller =
            LifecycleController::new(ControllerConfig::default(), backend.clone(), VIEWPORT);
        let renderer = RecordingRenderer::new();
        let render_loop = RenderLoop::new(
            controller,
            Box::new(renderer.clone()),
            RenderConfig::default(),
        );
        (render_loop, renderer, backend)
    }

    #[test]
    fn test_frame_period() {
        assert_eq!(
            RenderConfig::default().with_frame_rate(50).frame_period(),
            Duration::from_millis(20)
        );
        assert_eq!(
            RenderConfig::default().with_frame_rate(0).frame_period(),
            Duration::from_secs(1)
        );
        assert_eq!(
            RenderConfig::default()
                .with_frame_rate(2_000_000_000)
                .frame_period(),
            Duration::from_millis(1)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_with_excessive_frame_rate_keeps_ticking() {
        let backend = Arc::new(SimBackend::new(SimConfig::default()));
        let controller = LifecycleController::new(ControllerConfig::default(), backend, VIEWPORT);
        let renderer = RecordingRenderer::new();
        let render_loop = RenderLoop::new(
            controller,
            Box::new(renderer.clone()),
            RenderConfig::default().with_frame_rate(u32::MAX),
        );

        let handle = tokio::spawn(render_loop.run());
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!handle.is_finished());
        handle.abort();

        assert!(renderer.snapshot().frames > 0);
    }

    #[tokio::test]
    async fn test_renders_while_idle() {
        let (mut render_loop, renderer, backend) = render_loop();
        let start = Instant::now();

        for i in 0..5 {
            render_loop.tick(start + Duration::from_millis(16 * i));
        }

        let log = renderer.snapshot();
        assert_eq!(log.frames, 5);
        assert_eq!(log.sizes, vec![VIEWPORT]);
        assert_eq!(log.visible_frames, 0);
        assert_eq!(render_loop.frames(), 5);
        assert_eq!(render_loop.controller.state(), LifecycleState::Idle);
        assert_eq!(backend.stats().snapshot().context_updates, 0);
    }

    #[tokio::test]
    async fn test_viewport_change_resizes_renderer() {
        let (mut render_loop, renderer, _) = render_loop();
        let start = Instant::now();

        render_loop.tick(start);
        render_loop.controller.shared_stage().lock().viewport = Dimensions::new(480, 640);
        render_loop.tick(start + Duration::from_millis(16));
        render_loop.tick(start + Duration::from_millis(32));

        assert_eq!(
            renderer.snapshot().sizes,
            vec![VIEWPORT, Dimensions::new(480, 640)]
        );
    }

    #[tokio::test]
    async fn test_hooks_receive_clamped_delta() {
        let (mut render_loop, _, _) = render_loop();
        render_loop.controller.add_scene_node(SceneNode::new("cube"));
        render_loop.add_hook(|scene, time| {
            if let Some(node) = scene.node_mut("cube") {
                node.rotation[0] += time.delta.as_secs_f32();
            }
        });

        let start = Instant::now();
        let first = render_loop.tick(start);
        assert_eq!(first.delta, render_loop.config().frame_period());

        // A long stall is clamped.
        let second = render_loop.tick(start + Duration::from_secs(5));
        assert_eq!(second.delta, DEFAULT_MAX_DELTA);

        let stage = render_loop.controller.stage();
        let rotation = stage.scene.node("cube").map(|n| n.rotation[0]);
        let expected =
            render_loop.config().frame_period().as_secs_f32() + DEFAULT_MAX_DELTA.as_secs_f32();
        assert!((rotation.unwrap() - expected).abs() < 1e-6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_drives_tracking() {
        let (render_loop, renderer, backend) = render_loop();
        let controller = render_loop.controller.clone();
        controller.init_ar();

        let handle = tokio::spawn(render_loop.run());
        tokio::time::sleep(Duration::from_secs(1)).await;
        handle.abort();

        assert_eq!(controller.state(), LifecycleState::TrackingActive);
        let log = renderer.snapshot();
        assert!(log.frames > 30, "frames = {}", log.frames);
        assert!(log.visible_frames > 0);
        assert!(backend.stats().snapshot().context_updates > 0);
    }
}
