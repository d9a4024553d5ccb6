//! Simulated detection context.

use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use parking_lot::Mutex;
use tracing::debug;

use crate::collab::{
    ContextConfig, ControllerHandle, DetectionContext, DetectionResult, Frame, MarkerDetection,
    MarkerKind,
};
use crate::error::ContextError;
use crate::scene::{Dimensions, Matrix4, Orientation};

use super::stats::SimStats;
use super::{MarkerVisibility, SimConfig};

const NEAR: f32 = 0.1;
const FAR: f32 = 1000.0;
/// Vertical field of view used when no calibration file is given.
const DEFAULT_FOV_Y: f32 = std::f32::consts::FRAC_PI_4;

#[derive(Debug)]
struct ContextState {
    canvas: Dimensions,
    orientation: Option<Orientation>,
    controller: Option<ControllerHandle>,
    calibration_bytes: usize,
    disposed: bool,
}

/// A context that calibrates after a delay and "detects" the configured
/// marker according to its visibility schedule.
#[derive(Debug)]
pub struct SimContext {
    id: u64,
    config: ContextConfig,
    init_delay: Duration,
    marker: MarkerKind,
    visibility: MarkerVisibility,
    stats: Arc<SimStats>,
    state: Mutex<ContextState>,
}

impl SimContext {
    pub(crate) fn new(
        id: u64,
        config: ContextConfig,
        canvas: Dimensions,
        sim: &SimConfig,
        stats: Arc<SimStats>,
    ) -> Self {
        Self {
            id,
            config,
            init_delay: sim.context_delay,
            marker: sim.marker.clone(),
            visibility: sim.visibility,
            stats,
            state: Mutex::new(ContextState {
                canvas,
                orientation: None,
                controller: None,
                calibration_bytes: 0,
                disposed: false,
            }),
        }
    }

    pub fn orientation(&self) -> Option<Orientation> {
        self.state.lock().orientation
    }

    pub fn is_disposed(&self) -> bool {
        self.state.lock().disposed
    }

    /// Size of the loaded calibration file, 0 when none was configured.
    pub fn calibration_bytes(&self) -> usize {
        self.state.lock().calibration_bytes
    }

    fn can_detect(&self, marker: &MarkerKind) -> bool {
        match marker {
            MarkerKind::Barcode { value } => {
                self.config.detection_mode.detects_matrix()
                    && *value <= self.config.matrix_code_type.max_value()
            }
            MarkerKind::Pattern { .. } => true,
        }
    }

    fn marker_pose(frame_index: u64) -> Matrix4 {
        let mut pose = Matrix4::IDENTITY;
        let t = frame_index as f32 * 0.1;
        pose.0[12] = 0.05 * t.sin();
        pose.0[13] = 0.05 * t.cos();
        pose.0[14] = -2.0;
        pose
    }
}

impl DetectionContext for SimContext {
    fn canvas(&self) -> Dimensions {
        self.state.lock().canvas
    }

    fn init(&self) -> BoxFuture<'_, Result<(), ContextError>> {
        Box::pin(async move {
            if let Some(path) = &self.config.camera_parameters {
                let data = tokio::fs::read(path)
                    .await
                    .map_err(|e| ContextError::Calibration {
                        path: path.display().to_string(),
                        reason: e.to_string(),
                    })?;
                self.state.lock().calibration_bytes = data.len();
            }

            tokio::time::sleep(self.init_delay).await;

            let mut state = self.state.lock();
            if state.disposed {
                return Err(ContextError::Disposed);
            }
            state.controller = Some(ControllerHandle {
                id: self.id,
                canvas: state.canvas,
            });
            debug!(id = self.id, canvas = %state.canvas, "Sim: context calibrated");
            Ok(())
        })
    }

    fn controller(&self) -> Option<ControllerHandle> {
        self.state.lock().controller
    }

    fn projection_matrix(&self) -> Matrix4 {
        let state = self.state.lock();
        if state.controller.is_none() || state.canvas.is_empty() {
            return Matrix4::IDENTITY;
        }
        let aspect = state.canvas.width as f32 / state.canvas.height as f32;
        let f = 1.0 / (DEFAULT_FOV_Y / 2.0).tan();

        let mut m = [0.0; 16];
        m[0] = f / aspect;
        m[5] = f;
        m[10] = -(FAR + NEAR) / (FAR - NEAR);
        m[11] = -1.0;
        m[14] = -(2.0 * FAR * NEAR) / (FAR - NEAR);
        Matrix4(m)
    }

    fn set_orientation(&self, orientation: Orientation) {
        self.state.lock().orientation = Some(orientation);
    }

    fn resize_canvas(&self, canvas: Dimensions) {
        let mut state = self.state.lock();
        state.canvas = canvas;
        if let Some(controller) = state.controller.as_mut() {
            controller.canvas = canvas;
        }
    }

    fn update(&self, frame: &Frame) -> DetectionResult {
        {
            let state = self.state.lock();
            if state.disposed || state.controller.is_none() {
                return DetectionResult::empty(frame.index);
            }
        }
        self.stats.context_updated();

        if !self.visibility.is_visible(frame.index) || !self.can_detect(&self.marker) {
            return DetectionResult::empty(frame.index);
        }
        DetectionResult {
            frame_index: frame.index,
            markers: vec![MarkerDetection {
                marker: self.marker.clone(),
                pose: Self::marker_pose(frame.index),
                confidence: 1.0,
            }],
        }
    }

    fn dispose(&self) {
        let mut state = self.state.lock();
        if state.disposed {
            return;
        }
        state.disposed = true;
        state.controller = None;
        state.calibration_bytes = 0;
        self.stats.context_disposed();
        debug!(id = self.id, "Sim: context disposed");
    }
}
