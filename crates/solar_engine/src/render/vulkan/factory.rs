//! Resource factory: the seam between scene code and GPU allocation
//!
//! Scene code creates and releases per-entity GPU state only through
//! [`ResourceFactory`]. The renderer hands out a [`VulkanResourceFactory`]
//! bound to its current device, pool and render pass.

use ash::{vk, Device};

use super::buffer::GeometryBuffers;
use super::context::VulkanResult;
use super::pipeline::{create_pipeline, PipelineContext, PipelineDescription, PipelineObjects};
use crate::render::vertex::Vertex;

/// Creates and destroys pipelines and geometry buffers
pub trait ResourceFactory {
    /// Realize a pipeline description
    fn create_pipeline(&mut self, description: &PipelineDescription) -> VulkanResult<PipelineObjects>;

    /// Release a pipeline; repeated calls are no-ops
    fn destroy_pipeline(&mut self, pipeline: &mut PipelineObjects);

    /// Upload geometry; an index buffer is created iff `indices` is non-empty
    fn create_geometry(&mut self, vertices: &[Vertex], indices: &[u32]) -> VulkanResult<GeometryBuffers>;

    /// Release geometry buffers; repeated calls are no-ops
    fn destroy_geometry(&mut self, geometry: &mut GeometryBuffers);
}

/// Factory backed by the live Vulkan device
pub struct VulkanResourceFactory<'a> {
    device: &'a Device,
    memory_properties: &'a vk::PhysicalDeviceMemoryProperties,
    descriptor_pool: vk::DescriptorPool,
    render_pass: vk::RenderPass,
    extent: vk::Extent2D,
}

impl<'a> VulkanResourceFactory<'a> {
    /// Bind a factory to the renderer's current state
    pub fn new(
        device: &'a Device,
        memory_properties: &'a vk::PhysicalDeviceMemoryProperties,
        descriptor_pool: vk::DescriptorPool,
        render_pass: vk::RenderPass,
        extent: vk::Extent2D,
    ) -> Self {
        Self {
            device,
            memory_properties,
            descriptor_pool,
            render_pass,
            extent,
        }
    }
}

impl ResourceFactory for VulkanResourceFactory<'_> {
    fn create_pipeline(&mut self, description: &PipelineDescription) -> VulkanResult<PipelineObjects> {
        let ctx = PipelineContext {
            device: self.device,
            memory_properties: self.memory_properties,
            descriptor_pool: self.descriptor_pool,
            render_pass: self.render_pass,
            extent: self.extent,
        };
        create_pipeline(&ctx, description)
    }

    fn destroy_pipeline(&mut self, pipeline: &mut PipelineObjects) {
        pipeline.destroy(self.device, self.descriptor_pool);
    }

    fn create_geometry(&mut self, vertices: &[Vertex], indices: &[u32]) -> VulkanResult<GeometryBuffers> {
        GeometryBuffers::new(self.device, self.memory_properties, vertices, indices)
    }

    fn destroy_geometry(&mut self, geometry: &mut GeometryBuffers) {
        geometry.destroy(self.device);
    }
}
