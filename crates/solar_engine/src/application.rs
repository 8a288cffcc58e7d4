//! Application trait and lifecycle management

use thiserror::Error;

use crate::assets::ObjError;
use crate::config::ConfigError;
use crate::input::InputState;
use crate::render::vulkan::ResourceFactory;
use crate::scene::{SceneCoordinator, SceneError};

/// Per-frame data handed to [`Application::update`]
pub struct FrameContext<'a> {
    /// Input snapshot for this frame
    pub input: &'a dyn InputState,
    /// Seconds since the previous frame
    pub delta_time: f32,
    /// Surface width divided by height
    pub aspect_ratio: f32,
}

/// Application lifecycle trait
///
/// Implement this trait to populate and drive a scene with the engine.
pub trait Application {
    /// Populate the scene.
    ///
    /// Called once, after the first swapchain build, with a factory bound
    /// to the live render pass.
    fn setup(&mut self, scene: &mut SceneCoordinator, resources: &mut dyn ResourceFactory) -> Result<(), AppError>;

    /// Handle input and adjust the scene.
    ///
    /// Called every frame before the scene's behaviors advance.
    fn update(&mut self, scene: &mut SceneCoordinator, frame: &FrameContext<'_>) -> Result<(), AppError>;

    /// Called once before GPU resources are released
    fn shutdown(&mut self, _scene: &mut SceneCoordinator) {}
}

/// Application-level errors
#[derive(Error, Debug)]
pub enum AppError {
    /// An entity could not be registered
    #[error("Scene error")]
    Scene(#[from] SceneError),

    /// A mesh could not be loaded
    #[error("Asset error")]
    Asset(#[from] ObjError),

    /// Configuration could not be loaded or is invalid
    #[error("Config error")]
    Config(#[from] ConfigError),

    /// Custom application error
    #[error("Application error: {0}")]
    Custom(String),
}
