//! Simulated pose tracker.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::collab::{ControllerHandle, DetectionResult, PoseTracker, PoseWriteMode, TrackerConfig};
use crate::scene::{Camera, Matrix4};

use super::stats::SimStats;

#[derive(Debug, Default)]
struct TrackerState {
    history: VecDeque<Matrix4>,
    applied: Option<Matrix4>,
    streak: usize,
    disposed: bool,
}

/// Applies detections of its configured marker to the camera.
///
/// With smoothing enabled the pose is the element-wise mean of the last
/// `count` poses, changes under `tolerance` are ignored, and the marker only
/// counts as visible after `threshold` consecutive sightings.
#[derive(Debug)]
pub struct SimTracker {
    controller: ControllerHandle,
    config: TrackerConfig,
    stats: Arc<SimStats>,
    state: Mutex<TrackerState>,
}

impl SimTracker {
    pub(crate) fn new(
        controller: ControllerHandle,
        config: TrackerConfig,
        stats: Arc<SimStats>,
    ) -> Self {
        Self {
            controller,
            config,
            stats,
            state: Mutex::new(TrackerState::default()),
        }
    }

    pub fn controller(&self) -> ControllerHandle {
        self.controller
    }

    fn smoothed(&self, state: &mut TrackerState, pose: Matrix4) -> Matrix4 {
        let smoothing = &self.config.smoothing;
        if !smoothing.enabled {
            return pose;
        }

        state.history.push_back(pose);
        while state.history.len() > smoothing.count.max(1) {
            state.history.pop_front();
        }

        let n = state.history.len() as f32;
        let mut mean = [0.0f32; 16];
        for m in &state.history {
            for (acc, v) in mean.iter_mut().zip(m.0.iter()) {
                *acc += v / n;
            }
        }
        let mean = Matrix4(mean);

        match state.applied {
            Some(prev)
                if prev
                    .0
                    .iter()
                    .zip(mean.0.iter())
                    .all(|(a, b)| (a - b).abs() < smoothing.tolerance) =>
            {
                prev
            }
            _ => mean,
        }
    }
}

impl PoseTracker for SimTracker {
    fn update(&self, detections: &DetectionResult, camera: &mut Camera) {
        let mut state = self.state.lock();
        if state.disposed {
            return;
        }

        let Some(detection) = detections.find(&self.config.marker) else {
            state.streak = 0;
            state.history.clear();
            state.applied = None;
            camera.visible = false;
            return;
        };

        state.streak += 1;
        let pose = self.smoothed(&mut state, detection.pose);
        state.applied = Some(pose);

        camera.transform = match self.config.pose_mode {
            PoseWriteMode::CameraTransform => pose,
            PoseWriteMode::ModelView => Matrix4::IDENTITY,
        };

        let threshold = if self.config.smoothing.enabled {
            self.config.smoothing.threshold.max(1)
        } else {
            1
        };
        camera.visible = state.streak >= threshold;
    }

    fn dispose(&self) {
        let mut state = self.state.lock();
        if state.disposed {
            return;
        }
        state.disposed = true;
        state.history.clear();
        self.stats.tracker_disposed();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collab::{MarkerDetection, MarkerKind, SmoothingConfig};
    use crate::scene::Dimensions;

    fn tracker(config: TrackerConfig) -> SimTracker {
        SimTracker::new(
            ControllerHandle {
                id: 1,
                canvas: Dimensions::new(640, 480),
            },
            config,
            Arc::new(SimStats::default()),
        )
    }

    fn seen(frame_index: u64, z: f32) -> DetectionResult {
        let mut pose = Matrix4::IDENTITY;
        pose.0[14] = z;
        DetectionResult {
            frame_index,
            markers: vec![MarkerDetection {
                marker: MarkerKind::Barcode { value: 0 },
                pose,
                confidence: 1.0,
            }],
        }
    }

    #[test]
    fn test_visibility_requires_threshold() {
        let tracker = tracker(TrackerConfig::default());
        let mut camera = Camera::default();

        tracker.update(&seen(0, -2.0), &mut camera);
        assert!(!camera.visible);
        tracker.update(&seen(1, -2.0), &mut camera);
        assert!(camera.visible);

        tracker.update(&DetectionResult::empty(2), &mut camera);
        assert!(!camera.visible);
    }

    #[test]
    fn test_unsmoothed_pose_written_to_camera() {
        let config = TrackerConfig {
            smoothing: SmoothingConfig {
                enabled: false,
                ..SmoothingConfig::default()
            },
            ..TrackerConfig::default()
        };
        let tracker = tracker(config);
        let mut camera = Camera::default();

        tracker.update(&seen(0, -3.0), &mut camera);
        assert!(camera.visible);
        assert_eq!(camera.transform.0[14], -3.0);
    }

    #[test]
    fn test_smoothing_averages_history() {
        let config = TrackerConfig {
            smoothing: SmoothingConfig {
                enabled: true,
                count: 2,
                tolerance: 0.0,
                threshold: 1,
            },
            ..TrackerConfig::default()
        };
        let tracker = tracker(config);
        let mut camera = Camera::default();

        tracker.update(&seen(0, -2.0), &mut camera);
        tracker.update(&seen(1, -4.0), &mut camera);
        assert_eq!(camera.transform.0[14], -3.0);
    }

    #[test]
    fn test_model_view_mode_leaves_camera_at_origin() {
        let config = TrackerConfig {
            pose_mode: PoseWriteMode::ModelView,
            ..TrackerConfig::default()
        };
        let tracker = tracker(config);
        let mut camera = Camera::default();

        tracker.update(&seen(0, -2.0), &mut camera);
        tracker.update(&seen(1, -2.0), &mut camera);
        assert!(camera.visible);
        assert_eq!(camera.transform, Matrix4::IDENTITY);
    }

    #[test]
    fn test_disposed_tracker_ignores_updates() {
        let tracker = tracker(TrackerConfig::default());
        let mut camera = Camera::default();
        tracker.dispose();
        tracker.dispose();

        tracker.update(&seen(0, -2.0), &mut camera);
        tracker.update(&seen(1, -2.0), &mut camera);
        assert!(!camera.visible);
        assert_eq!(tracker.stats.snapshot().trackers_disposed, 1);
    }
}
