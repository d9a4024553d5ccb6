//! Pose tracker contract.

use std::fmt;
use std::str::FromStr;

use crate::scene::Camera;

use super::context::DetectionResult;

/// The marker a tracker follows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkerKind {
    /// Matrix barcode with the given value.
    Barcode { value: u32 },
    /// Trained pattern loaded from a `.patt` file.
    Pattern { url: String },
}

impl MarkerKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            MarkerKind::Barcode { .. } => "barcode",
            MarkerKind::Pattern { .. } => "pattern",
        }
    }
}

impl fmt::Display for MarkerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarkerKind::Barcode { value } => write!(f, "barcode #{}", value),
            MarkerKind::Pattern { url } => write!(f, "pattern {}", url),
        }
    }
}

/// Where the tracker writes the marker pose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoseWriteMode {
    /// Pose is applied to the content; the camera stays at the origin.
    ModelView,
    /// Pose is applied to the camera; the content stays at the origin.
    CameraTransform,
}

impl PoseWriteMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PoseWriteMode::ModelView => "model_view",
            PoseWriteMode::CameraTransform => "camera_transform",
        }
    }
}

impl FromStr for PoseWriteMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "model_view" | "modelviewmatrix" => Ok(PoseWriteMode::ModelView),
            "camera_transform" | "cameratransformmatrix" => Ok(PoseWriteMode::CameraTransform),
            _ => Err(s.to_string()),
        }
    }
}

impl fmt::Display for PoseWriteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pose smoothing settings.
#[derive(Debug, Clone, PartialEq)]
pub struct SmoothingConfig {
    pub enabled: bool,
    /// Number of recent poses averaged.
    pub count: usize,
    /// Element-wise change below which the previous pose is kept.
    pub tolerance: f32,
    /// Consecutive sightings required before the marker counts as visible.
    pub threshold: usize,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            count: 5,
            tolerance: 0.01,
            threshold: 2,
        }
    }
}

/// Pose tracker settings.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackerConfig {
    pub marker: MarkerKind,
    pub smoothing: SmoothingConfig,
    pub pose_mode: PoseWriteMode,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            marker: MarkerKind::Barcode { value: 0 },
            smoothing: SmoothingConfig::default(),
            pose_mode: PoseWriteMode::CameraTransform,
        }
    }
}

/// Binding between a calibrated context and the scene camera.
pub trait PoseTracker: Send + Sync {
    /// Apply one frame's detections to the camera, updating its pose and
    /// marker-visible flag.
    fn update(&self, detections: &DetectionResult, camera: &mut Camera);

    /// Release the binding. Idempotent.
    fn dispose(&self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pose_write_mode_parse() {
        assert_eq!(
            "camera_transform".parse::<PoseWriteMode>(),
            Ok(PoseWriteMode::CameraTransform)
        );
        assert_eq!(
            "cameraTransformMatrix".parse::<PoseWriteMode>(),
            Ok(PoseWriteMode::CameraTransform)
        );
        assert_eq!("model_view".parse::<PoseWriteMode>(), Ok(PoseWriteMode::ModelView));
        assert!("world".parse::<PoseWriteMode>().is_err());
    }

    #[test]
    fn test_tracker_config_default() {
        let config = TrackerConfig::default();
        assert_eq!(config.marker, MarkerKind::Barcode { value: 0 });
        assert_eq!(config.pose_mode, PoseWriteMode::CameraTransform);
        assert!(config.smoothing.enabled);
    }

    #[test]
    fn test_marker_kind_display() {
        assert_eq!(MarkerKind::Barcode { value: 5 }.to_string(), "barcode #5");
        assert_eq!(
            MarkerKind::Pattern {
                url: "patt.hiro".to_string()
            }
            .type_name(),
            "pattern"
        );
    }
}
