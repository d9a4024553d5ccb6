//! Scene-side state shared by the lifecycle controller and the render loop.
//!
//! The [`Stage`] bundles the scene, the camera that receives pose updates and
//! the current viewport. It is owned by the controller and handed to the
//! render loop as a `SharedStage`; other callers get copies.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use parking_lot::Mutex;

/// Width and height in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    /// Create dimensions from width and height.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Whether either side is zero (no usable frame data).
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Orientation implied by these dimensions.
    pub fn orientation(&self) -> Orientation {
        Orientation::from_dimensions(*self)
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for Dimensions {
    type Err = String;

    /// Parse `WIDTHxHEIGHT`, e.g. `640x480`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .trim()
            .split_once(|c| c == 'x' || c == 'X')
            .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{}'", s))?;
        let width = w
            .trim()
            .parse()
            .map_err(|_| format!("invalid width '{}'", w))?;
        let height = h
            .trim()
            .parse()
            .map_err(|_| format!("invalid height '{}'", h))?;
        Ok(Self { width, height })
    }
}

/// Landscape/portrait classification of a frame or viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Orientation {
    Landscape,
    Portrait,
}

impl Orientation {
    /// Landscape iff strictly wider than tall; square frames are portrait.
    pub fn from_dimensions(dims: Dimensions) -> Self {
        if dims.width > dims.height {
            Orientation::Landscape
        } else {
            Orientation::Portrait
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Orientation::Landscape => "landscape",
            Orientation::Portrait => "portrait",
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Column-major 4×4 matrix, as handed over by the detection engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix4(pub [f32; 16]);

impl Matrix4 {
    pub const IDENTITY: Matrix4 = Matrix4([
        1.0, 0.0, 0.0, 0.0, //
        0.0, 1.0, 0.0, 0.0, //
        0.0, 0.0, 1.0, 0.0, //
        0.0, 0.0, 0.0, 1.0,
    ]);

    /// Copy another matrix into this one.
    pub fn copy_from(&mut self, other: &Matrix4) {
        self.0 = other.0;
    }

    pub fn as_array(&self) -> &[f32; 16] {
        &self.0
    }
}

impl Default for Matrix4 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Scene camera.
///
/// The pose tracker writes `transform` and `visible`; the controller writes
/// `projection` once the detection context has calibrated.
#[derive(Debug, Clone, Default)]
pub struct Camera {
    /// Projection derived from camera calibration.
    pub projection: Matrix4,
    /// Pose relative to the tracked marker.
    pub transform: Matrix4,
    /// Whether a marker is currently visible.
    pub visible: bool,
}

/// A named node in the scene whose rotation can be animated.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    pub name: String,
    /// Euler rotation in radians (x, y, z).
    pub rotation: [f32; 3],
    pub position: [f32; 3],
}

impl SceneNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rotation: [0.0; 3],
            position: [0.0; 3],
        }
    }

    pub fn with_position(mut self, position: [f32; 3]) -> Self {
        self.position = position;
        self
    }
}

/// The render target.
///
/// Hidden until the first pose lock: in camera-transform mode the tracker
/// moves the camera rather than the content, so the content would otherwise
/// sit at the origin in front of the lens.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    pub visible: bool,
    pub nodes: Vec<SceneNode>,
}

impl Scene {
    pub fn add(&mut self, node: SceneNode) {
        self.nodes.push(node);
    }

    pub fn node_mut(&mut self, name: &str) -> Option<&mut SceneNode> {
        self.nodes.iter_mut().find(|n| n.name == name)
    }

    pub fn node(&self, name: &str) -> Option<&SceneNode> {
        self.nodes.iter().find(|n| n.name == name)
    }
}

/// Scene, camera and viewport for one page.
#[derive(Debug, Clone)]
pub struct Stage {
    pub scene: Scene,
    pub camera: Camera,
    /// Size the renderer should present at.
    pub viewport: Dimensions,
}

impl Stage {
    pub fn new(viewport: Dimensions) -> Self {
        Self {
            scene: Scene::default(),
            camera: Camera::default(),
            viewport,
        }
    }
}

/// Stage handle shared between the controller and the render loop.
pub(crate) type SharedStage = Arc<Mutex<Stage>>;
