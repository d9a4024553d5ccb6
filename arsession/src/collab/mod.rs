//! Contracts for the external engines an AR session is built from.
//!
//! The lifecycle controller never talks to a camera, a marker detector or a
//! renderer directly. It goes through these traits, and constructs
//! collaborators only through an [`ArBackend`].
//!
//! # Design Principles
//!
//! - **One-shot completions are futures**: `init()` and `first_frame()` resolve
//!   exactly once; the controller awaits them instead of registering callbacks
//! - **Dyn-compatible**: async methods return [`BoxFuture`] so collaborators can
//!   be held as `Arc<dyn Trait>` across await points
//! - **Idempotent disposal**: `dispose()` on an already-disposed collaborator
//!   is a no-op and never panics
//! - **Interior mutability**: methods take `&self`; implementations own their
//!   synchronization

mod context;
mod renderer;
mod source;
mod tracker;

use std::sync::Arc;

pub use futures::future::BoxFuture;

pub use context::{
    CanvasSizing, ContextConfig, ControllerHandle, DetectionContext, DetectionMode,
    DetectionResult, MarkerDetection, MatrixCodeType,
};
pub use renderer::Renderer;
pub use source::{Frame, SourceConfig, SourceKind, VideoSource};
pub use tracker::{MarkerKind, PoseTracker, PoseWriteMode, SmoothingConfig, TrackerConfig};

use crate::scene::Dimensions;

/// Factory for the collaborators of one AR session.
///
/// Implementations wrap a concrete capture/detection stack; see
/// [`SimBackend`](crate::sim::SimBackend) for the in-process one.
pub trait ArBackend: Send + Sync + 'static {
    /// Create a video source asking for `requested` frame dimensions.
    ///
    /// The source is not initialized; the caller awaits [`VideoSource::init`].
    fn create_source(&self, config: &SourceConfig, requested: Dimensions) -> Arc<dyn VideoSource>;

    /// Create a detection context whose canvas is `canvas` pixels.
    ///
    /// Must only be called once the source is ready; `canvas` is derived from
    /// the source's actual frame dimensions.
    fn create_context(&self, config: &ContextConfig, canvas: Dimensions)
        -> Arc<dyn DetectionContext>;

    /// Bind a pose tracker to a calibrated context's controller.
    fn create_tracker(
        &self,
        controller: ControllerHandle,
        config: &TrackerConfig,
    ) -> Arc<dyn PoseTracker>;
}
