//! Window management subsystem
//!
//! The engine talks to the windowing layer only through [`Platform`]. The
//! GLFW implementation lives next to the Vulkan code in
//! `render/vulkan/window.rs` because it also creates the Vulkan surface.

mod backend;

pub use backend::{BackendKind, Platform};
