//! Vulkan backend
//!
//! Thin RAII wrappers over `ash` for long-lived objects (context, swapchain,
//! render pass, framebuffers, sync objects, pools) and plain handle structs
//! for per-entity resources that the scene releases explicitly.

pub mod buffer;
pub mod commands;
pub mod context;
pub mod descriptor;
pub mod factory;
pub mod frame;
pub mod framebuffer;
pub mod memory;
pub mod pipeline;
pub mod render_pass;
pub mod shader;
pub mod swapchain;
pub mod sync;
pub mod window;

pub use buffer::{AllocatedBuffer, GeometryBuffers};
pub use commands::{ActiveRenderPass, CommandRecorder};
pub use context::{VulkanContext, VulkanError, VulkanResult};
pub use factory::{ResourceFactory, VulkanResourceFactory};
pub use frame::{FrameOutcome, RenderCallbacks, Renderer};
pub use pipeline::{PipelineDescription, PipelineObjects, RasterizationMode, VertexAttribute};
pub use window::{GlfwWindow, WindowError};

use ash::vk::Handle;

/// Take a non-null handle out of `slot`, leaving null behind
pub(crate) fn take_handle<H: Handle + Copy>(slot: &mut H) -> Option<H> {
    let handle = *slot;
    if handle.as_raw() == 0 {
        None
    } else {
        *slot = H::from_raw(0);
        Some(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ash::vk;

    #[test]
    fn test_take_handle_nulls_slot_once() {
        let mut buffer = vk::Buffer::from_raw(42);
        assert_eq!(take_handle(&mut buffer), Some(vk::Buffer::from_raw(42)));
        assert_eq!(buffer, vk::Buffer::null());
        assert_eq!(take_handle(&mut buffer), None);
    }
}
