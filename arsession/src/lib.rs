//! ARSession - Lifecycle orchestration for marker-based AR
//!
//! This library coordinates the three independently-initializing pieces of a
//! marker-tracking AR session (video source, detection context and pose
//! tracker) with a continuously running render loop.
//!
//! # Architecture
//!
//! ```text
//! RenderLoop tick ──► LifecycleController::update_frame() ──► DetectionContext::update()
//!       │                     (no-op until TrackingActive)            │
//!       │                                                             ▼
//!       │                                              PoseTracker mutates Camera
//!       ▼
//! Renderer::render(scene, camera)
//! ```
//!
//! Initialization runs on its own task, independent of the render loop:
//!
//! ```text
//! Idle ─► SourceInitializing ─► SourceReady ─► ContextInitializing ─► ContextReady ─► TrackingActive
//!   ▲                                                                                      │
//!   └──────────────────────────────── Disposing ◄──────────────────────────────────────────┘
//! ```
//!
//! The engines themselves (video capture, marker detection, rendering) are
//! consumed through the traits in [`collab`]. [`sim`] provides in-process
//! implementations used by the CLI and the tests.

pub mod clock;
pub mod collab;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod logging;
pub mod render_loop;
pub mod scene;
pub mod sim;

/// Library version, as declared in Cargo.toml.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
