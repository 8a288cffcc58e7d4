//! # Rendering System
//!
//! Vulkan rendering for a single color pass with one pipeline per object.
//!
//! ## Architecture
//!
//! - **Window**: the [`Platform`](window::Platform) seam between the engine
//!   and a windowing backend (event pump, surface creation, input)
//! - **Vulkan Backend**: context, swapchain, frame synchronization and the
//!   [`ResourceFactory`](vulkan::ResourceFactory) that realizes pipelines and
//!   geometry buffers
//! - **Vertex**: the position/normal layout shared by meshes and pipelines

pub mod vertex;
pub mod vulkan;
pub mod window;

pub use vertex::Vertex;
pub use vulkan::{FrameOutcome, RenderCallbacks, Renderer, ResourceFactory, VulkanError, VulkanResult};
pub use window::{BackendKind, Platform};
