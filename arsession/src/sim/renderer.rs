//! Renderer that records what it was asked to draw.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::collab::Renderer;
use crate::scene::{Camera, Dimensions, Matrix4, Scene};

/// Everything a [`RecordingRenderer`] has seen.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderLog {
    pub frames: u64,
    /// Frames drawn with the scene visible.
    pub visible_frames: u64,
    /// Every size passed to `set_size`, in order.
    pub sizes: Vec<Dimensions>,
    pub last_projection: Option<Matrix4>,
}

/// Headless renderer for the CLI and tests.
#[derive(Debug, Clone, Default)]
pub struct RecordingRenderer {
    log: Arc<Mutex<RenderLog>>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the log so far.
    pub fn snapshot(&self) -> RenderLog {
        self.log.lock().clone()
    }
}

impl Renderer for RecordingRenderer {
    fn set_size(&mut self, size: Dimensions) {
        self.log.lock().sizes.push(size);
    }

    fn render(&mut self, scene: &Scene, camera: &Camera) {
        let mut log = self.log.lock();
        log.frames += 1;
        if scene.visible {
            log.visible_frames += 1;
        }
        log.last_projection = Some(camera.projection);
    }
}
