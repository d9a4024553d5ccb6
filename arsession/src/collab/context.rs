//! Detection context contract.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use futures::future::BoxFuture;

use crate::error::ContextError;
use crate::scene::{Dimensions, Matrix4, Orientation};

use super::source::Frame;
use super::tracker::MarkerKind;

/// Which marker families the detector looks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionMode {
    Color,
    ColorAndMatrix,
    Mono,
    MonoAndMatrix,
}

impl DetectionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectionMode::Color => "color",
            DetectionMode::ColorAndMatrix => "color_and_matrix",
            DetectionMode::Mono => "mono",
            DetectionMode::MonoAndMatrix => "mono_and_matrix",
        }
    }

    /// Whether barcode (matrix) markers are detected in this mode.
    pub fn detects_matrix(&self) -> bool {
        matches!(
            self,
            DetectionMode::ColorAndMatrix | DetectionMode::MonoAndMatrix
        )
    }
}

impl FromStr for DetectionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "color" => Ok(DetectionMode::Color),
            "color_and_matrix" => Ok(DetectionMode::ColorAndMatrix),
            "mono" => Ok(DetectionMode::Mono),
            "mono_and_matrix" => Ok(DetectionMode::MonoAndMatrix),
            _ => Err(s.to_string()),
        }
    }
}

impl fmt::Display for DetectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Barcode matrix layout and error correction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatrixCodeType {
    Code3x3,
    Code3x3Hamming63,
    Code3x3Parity65,
    Code4x4,
    Code4x4Bch1393,
    Code4x4Bch1355,
}

impl MatrixCodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatrixCodeType::Code3x3 => "3x3",
            MatrixCodeType::Code3x3Hamming63 => "3x3_hamming63",
            MatrixCodeType::Code3x3Parity65 => "3x3_parity65",
            MatrixCodeType::Code4x4 => "4x4",
            MatrixCodeType::Code4x4Bch1393 => "4x4_bch_13_9_3",
            MatrixCodeType::Code4x4Bch1355 => "4x4_bch_13_5_5",
        }
    }

    /// Largest barcode value this code type can carry.
    pub fn max_value(&self) -> u32 {
        match self {
            MatrixCodeType::Code3x3 => 63,
            MatrixCodeType::Code3x3Hamming63 => 7,
            MatrixCodeType::Code3x3Parity65 => 31,
            MatrixCodeType::Code4x4 => 8191,
            MatrixCodeType::Code4x4Bch1393 => 511,
            MatrixCodeType::Code4x4Bch1355 => 31,
        }
    }
}

impl FromStr for MatrixCodeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "3x3" => Ok(MatrixCodeType::Code3x3),
            "3x3_hamming63" => Ok(MatrixCodeType::Code3x3Hamming63),
            "3x3_parity65" => Ok(MatrixCodeType::Code3x3Parity65),
            "4x4" => Ok(MatrixCodeType::Code4x4),
            "4x4_bch_13_9_3" => Ok(MatrixCodeType::Code4x4Bch1393),
            "4x4_bch_13_5_5" => Ok(MatrixCodeType::Code4x4Bch1355),
            _ => Err(s.to_string()),
        }
    }
}

impl fmt::Display for MatrixCodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the detection canvas is sized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanvasSizing {
    /// Match the source's actual frame dimensions.
    FromSource,
    /// Always use these dimensions.
    Fixed(Dimensions),
}

impl CanvasSizing {
    /// Resolve the canvas for a source delivering `actual` frames.
    pub fn resolve(&self, actual: Dimensions) -> Dimensions {
        match self {
            CanvasSizing::FromSource => actual,
            CanvasSizing::Fixed(dims) => *dims,
        }
    }
}

impl FromStr for CanvasSizing {
    type Err = String;

    /// `source` or `WIDTHxHEIGHT`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("source") {
            return Ok(CanvasSizing::FromSource);
        }
        s.parse::<Dimensions>()
            .ok()
            .filter(|d| !d.is_empty())
            .map(CanvasSizing::Fixed)
            .ok_or_else(|| s.to_string())
    }
}

impl fmt::Display for CanvasSizing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CanvasSizing::FromSource => f.write_str("source"),
            CanvasSizing::Fixed(dims) => write!(f, "{}", dims),
        }
    }
}

/// Detection context settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextConfig {
    /// Camera calibration file. `None` uses the backend's built-in defaults.
    pub camera_parameters: Option<PathBuf>,
    pub detection_mode: DetectionMode,
    pub matrix_code_type: MatrixCodeType,
    /// Inner pattern size relative to the marker border (0 < r < 1).
    pub pattern_ratio: f64,
    pub canvas: CanvasSizing,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            camera_parameters: None,
            detection_mode: DetectionMode::MonoAndMatrix,
            matrix_code_type: MatrixCodeType::Code3x3,
            pattern_ratio: 0.5,
            canvas: CanvasSizing::FromSource,
        }
    }
}

/// Opaque handle to a calibrated context's internal detector.
///
/// Only available once [`DetectionContext::init`] has resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerHandle {
    pub id: u64,
    pub canvas: Dimensions,
}

/// A single recognized marker.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerDetection {
    pub marker: MarkerKind,
    pub pose: Matrix4,
    pub confidence: f32,
}

/// Markers recognized in one frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectionResult {
    pub frame_index: u64,
    pub markers: Vec<MarkerDetection>,
}

impl DetectionResult {
    pub fn empty(frame_index: u64) -> Self {
        Self {
            frame_index,
            markers: Vec::new(),
        }
    }

    pub fn find(&self, marker: &MarkerKind) -> Option<&MarkerDetection> {
        self.markers.iter().find(|d| &d.marker == marker)
    }
}

/// Calibrated detector state bound to one source.
pub trait DetectionContext: Send + Sync {
    /// Size of the detection canvas.
    fn canvas(&self) -> Dimensions;

    /// Load calibration and build the internal controller. Resolves once.
    fn init(&self) -> BoxFuture<'_, Result<(), ContextError>>;

    /// Internal controller, `None` until `init` has resolved.
    fn controller(&self) -> Option<ControllerHandle>;

    /// Projection derived from calibration. Identity before `init` resolves.
    fn projection_matrix(&self) -> Matrix4;

    fn set_orientation(&self, orientation: Orientation);

    /// Resize the detection canvas in place.
    fn resize_canvas(&self, canvas: Dimensions);

    /// Run detection on one frame.
    fn update(&self, frame: &Frame) -> DetectionResult;

    /// Release the controller and calibration data. Idempotent.
    fn dispose(&self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detection_mode_parse() {
        assert_eq!(
            "mono_and_matrix".parse::<DetectionMode>(),
            Ok(DetectionMode::MonoAndMatrix)
        );
        assert!("infrared".parse::<DetectionMode>().is_err());
        assert!(DetectionMode::ColorAndMatrix.detects_matrix());
        assert!(!DetectionMode::Mono.detects_matrix());
    }

    #[test]
    fn test_matrix_code_type_roundtrip_names() {
        for name in [
            "3x3",
            "3x3_hamming63",
            "3x3_parity65",
            "4x4",
            "4x4_bch_13_9_3",
            "4x4_bch_13_5_5",
        ] {
            let code: MatrixCodeType = name.parse().unwrap();
            assert_eq!(code.as_str(), name);
        }
    }

    #[test]
    fn test_canvas_sizing_resolve() {
        let actual = Dimensions::new(1280, 720);
        assert_eq!(CanvasSizing::FromSource.resolve(actual), actual);
        assert_eq!(
            CanvasSizing::Fixed(Dimensions::new(640, 480)).resolve(actual),
            Dimensions::new(640, 480)
        );
    }

    #[test]
    fn test_canvas_sizing_parse() {
        assert_eq!("source".parse::<CanvasSizing>(), Ok(CanvasSizing::FromSource));
        assert_eq!(
            "640x480".parse::<CanvasSizing>(),
            Ok(CanvasSizing::Fixed(Dimensions::new(640, 480)))
        );
        assert!("0x480".parse::<CanvasSizing>().is_err());
    }
}
