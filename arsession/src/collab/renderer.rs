//! Renderer contract.

use crate::scene::{Camera, Dimensions, Scene};

/// Draws the scene from the camera.
///
/// The render loop owns the renderer exclusively, so methods take `&mut self`.
pub trait Renderer: Send {
    fn set_size(&mut self, size: Dimensions);

    fn render(&mut self, scene: &Scene, camera: &Camera);
}
