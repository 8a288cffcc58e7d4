//! Backend-agnostic window contract
//!
//! A backend pumps OS events, tracks quit and resize requests, exposes the
//! input snapshot for the current frame and creates the presentation surface.

use ash::vk;
use serde::{Deserialize, Serialize};

use crate::input::InputState;
use crate::render::vulkan::window::WindowResult;

/// Windowing backend selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackendKind {
    /// GLFW via the `glfw` crate
    #[default]
    Glfw,
}

/// Window and event source used by the engine loop
pub trait Platform {
    /// Process pending OS events and refresh the input snapshot
    fn pump_events(&mut self);

    /// Ask the main loop to stop after the current frame
    fn request_quit(&mut self);

    /// Whether the window was closed or a quit was requested
    fn is_quit_requested(&self) -> bool;

    /// Current framebuffer size in pixels
    fn framebuffer_size(&self) -> (u32, u32);

    /// Returns true once after each framebuffer resize
    fn take_resized(&mut self) -> bool;

    /// Instance extensions required to present to this window
    fn required_instance_extensions(&self) -> WindowResult<Vec<String>>;

    /// Create a presentation surface for this window
    fn create_surface(&mut self, instance: vk::Instance) -> WindowResult<vk::SurfaceKHR>;

    /// Input snapshot for the current frame
    fn input(&self) -> &dyn InputState;
}
