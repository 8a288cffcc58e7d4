//! Graphics pipeline creation from declarative descriptions
//!
//! A [`PipelineDescription`] is plain data: vertex layout, uniform bindings,
//! shader files and a wireframe flag. [`create_pipeline`] realizes it as
//! [`PipelineObjects`]: pipeline, layout, one descriptor set and one device
//! local uniform buffer per declared uniform binding.
//!
//! Creation is all-or-nothing. Whatever was created before a failing step is
//! destroyed again before the error is returned. Shader modules only live for
//! the duration of the call.

use ash::{vk, Device};
use std::path::{Path, PathBuf};

use super::buffer::AllocatedBuffer;
use super::commands::ActiveRenderPass;
use super::context::{VulkanError, VulkanResult};
use super::shader::ShaderModule;
use super::take_handle;

/// One vertex attribute read from vertex binding 0
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribute {
    /// Shader input location
    pub location: u32,
    /// Attribute format
    pub format: vk::Format,
    /// Byte offset within a vertex
    pub offset: u32,
}

/// Uniform buffer declared at a descriptor binding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniformBufferBinding {
    /// Descriptor binding index
    pub binding: u32,
    /// Exact size of the buffer in bytes
    pub byte_size: vk::DeviceSize,
}

/// Sampler declared at a descriptor binding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniformImageBinding {
    /// Descriptor binding index
    pub binding: u32,
}

/// Declarative pipeline state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineDescription {
    /// Per-vertex attributes; empty means no vertex input at all
    pub vertex_attributes: Vec<VertexAttribute>,
    /// Byte stride of vertex binding 0
    pub vertex_stride: u32,
    /// Uniform buffers, one device buffer each
    pub uniform_buffers: Vec<UniformBufferBinding>,
    /// Sampler bindings
    pub uniform_images: Vec<UniformImageBinding>,
    /// Compiled vertex shader (required)
    pub vertex_shader: PathBuf,
    /// Compiled fragment shader (required)
    pub fragment_shader: PathBuf,
    /// Compiled geometry shader
    pub geometry_shader: Option<PathBuf>,
    /// Draw lines without culling instead of filled, back-culled triangles
    pub wireframe: bool,
}

impl PipelineDescription {
    /// Description with the two mandatory shader stages
    pub fn new(vertex_shader: impl Into<PathBuf>, fragment_shader: impl Into<PathBuf>) -> Self {
        Self {
            vertex_shader: vertex_shader.into(),
            fragment_shader: fragment_shader.into(),
            ..Self::default()
        }
    }

    /// Set the vertex attribute layout
    pub fn with_vertex_layout(mut self, attributes: Vec<VertexAttribute>, stride: u32) -> Self {
        self.vertex_attributes = attributes;
        self.vertex_stride = stride;
        self
    }

    /// Declare a uniform buffer
    pub fn with_uniform_buffer(mut self, binding: u32, byte_size: vk::DeviceSize) -> Self {
        self.uniform_buffers.push(UniformBufferBinding { binding, byte_size });
        self
    }

    /// Declare a sampler binding
    pub fn with_uniform_image(mut self, binding: u32) -> Self {
        self.uniform_images.push(UniformImageBinding { binding });
        self
    }

    /// Add a geometry stage
    pub fn with_geometry_shader(mut self, path: impl Into<PathBuf>) -> Self {
        self.geometry_shader = Some(path.into());
        self
    }

    /// Switch wireframe rendering on or off
    pub fn with_wireframe(mut self, wireframe: bool) -> Self {
        self.wireframe = wireframe;
        self
    }

    /// Descriptor set layout bindings, uniform buffers first then samplers
    pub fn descriptor_bindings(&self) -> Vec<vk::DescriptorSetLayoutBinding> {
        let buffers = self.uniform_buffers.iter().map(|ubo| (ubo.binding, vk::DescriptorType::UNIFORM_BUFFER));
        let images = self.uniform_images.iter().map(|image| (image.binding, vk::DescriptorType::SAMPLER));

        buffers
            .chain(images)
            .map(|(binding, descriptor_type)| {
                vk::DescriptorSetLayoutBinding::builder()
                    .binding(binding)
                    .descriptor_type(descriptor_type)
                    .descriptor_count(1)
                    .stage_flags(vk::ShaderStageFlags::ALL_GRAPHICS)
                    .build()
            })
            .collect()
    }

    fn validate(&self) -> VulkanResult<()> {
        if self.vertex_shader.as_os_str().is_empty() {
            return Err(VulkanError::MissingShaderStage("vertex"));
        }
        if self.fragment_shader.as_os_str().is_empty() {
            return Err(VulkanError::MissingShaderStage("fragment"));
        }
        if !self.vertex_attributes.is_empty() && self.vertex_stride == 0 {
            return Err(VulkanError::InvalidOperation {
                reason: "Vertex attributes declared with a zero stride".to_string(),
            });
        }
        Ok(())
    }
}

/// Polygon mode and culling derived from the wireframe flag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RasterizationMode {
    /// Fill or line
    pub polygon_mode: vk::PolygonMode,
    /// Faces discarded
    pub cull_mode: vk::CullModeFlags,
}

impl RasterizationMode {
    /// Lines without culling for wireframe, filled back-culled triangles otherwise
    pub fn from_wireframe(wireframe: bool) -> Self {
        if wireframe {
            Self {
                polygon_mode: vk::PolygonMode::LINE,
                cull_mode: vk::CullModeFlags::NONE,
            }
        } else {
            Self {
                polygon_mode: vk::PolygonMode::FILL,
                cull_mode: vk::CullModeFlags::BACK,
            }
        }
    }
}

/// Uniform buffer created for one declared binding
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UniformBufferObjects {
    /// Descriptor binding index
    pub binding: u32,
    /// Device-local buffer updated from command buffers
    pub buffer: AllocatedBuffer,
}

/// Realized pipeline state of one entity
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineObjects {
    /// Graphics pipeline
    pub pipeline: vk::Pipeline,
    /// Pipeline layout with a single set layout
    pub layout: vk::PipelineLayout,
    /// Descriptor set from the shared pool
    pub descriptor_set: vk::DescriptorSet,
    /// Layout of `descriptor_set`
    pub descriptor_set_layout: vk::DescriptorSetLayout,
    /// One buffer per declared uniform buffer binding
    pub uniform_buffers: Vec<UniformBufferObjects>,
}

impl PipelineObjects {
    /// Buffer backing uniform `binding`
    pub fn uniform_buffer(&self, binding: u32) -> Option<vk::Buffer> {
        self.uniform_buffers
            .iter()
            .find(|ubo| ubo.binding == binding)
            .map(|ubo| ubo.buffer.buffer)
            .filter(|&buffer| buffer != vk::Buffer::null())
    }

    /// Bind pipeline and descriptor set for drawing
    pub fn bind(&self, pass: &mut ActiveRenderPass<'_>) {
        pass.bind_pipeline(self.pipeline);
        if self.descriptor_set != vk::DescriptorSet::null() {
            pass.bind_descriptor_sets(self.layout, &[self.descriptor_set]);
        }
    }

    /// Whether every handle is null
    pub fn is_null(&self) -> bool {
        self.pipeline == vk::Pipeline::null()
            && self.layout == vk::PipelineLayout::null()
            && self.descriptor_set == vk::DescriptorSet::null()
            && self.descriptor_set_layout == vk::DescriptorSetLayout::null()
            && self.uniform_buffers.is_empty()
    }

    /// Destroy the non-null handles and null every field.
    ///
    /// Calling it again is a no-op.
    pub fn destroy(&mut self, device: &Device, descriptor_pool: vk::DescriptorPool) {
        unsafe {
            if let Some(pipeline) = take_handle(&mut self.pipeline) {
                device.destroy_pipeline(pipeline, None);
            }
            if let Some(layout) = take_handle(&mut self.layout) {
                device.destroy_pipeline_layout(layout, None);
            }
            if let Some(set) = take_handle(&mut self.descriptor_set) {
                let _ = device.free_descriptor_sets(descriptor_pool, &[set]);
            }
            if let Some(set_layout) = take_handle(&mut self.descriptor_set_layout) {
                device.destroy_descriptor_set_layout(set_layout, None);
            }
        }
        for ubo in &mut self.uniform_buffers {
            ubo.buffer.destroy(device);
        }
        self.uniform_buffers.clear();
    }
}

/// Everything pipeline creation needs from the renderer
pub struct PipelineContext<'a> {
    /// Device function table
    pub device: &'a Device,
    /// Memory types for uniform buffer allocation
    pub memory_properties: &'a vk::PhysicalDeviceMemoryProperties,
    /// Pool the descriptor set is allocated from
    pub descriptor_pool: vk::DescriptorPool,
    /// Render pass the pipeline draws in (subpass 0)
    pub render_pass: vk::RenderPass,
    /// Initial viewport; viewport and scissor are dynamic state
    pub extent: vk::Extent2D,
}

/// Realize `description`, or clean up and return the first error
pub fn create_pipeline(ctx: &PipelineContext<'_>, description: &PipelineDescription) -> VulkanResult<PipelineObjects> {
    description.validate()?;

    let mut objects = PipelineObjects::default();
    match build_pipeline(ctx, description, &mut objects) {
        Ok(()) => Ok(objects),
        Err(e) => {
            objects.destroy(ctx.device, ctx.descriptor_pool);
            Err(e)
        }
    }
}

fn load_stage(device: &Device, path: &Path, stage: vk::ShaderStageFlags) -> VulkanResult<ShaderModule> {
    ShaderModule::from_file(device.clone(), path, stage)
}

fn build_pipeline(
    ctx: &PipelineContext<'_>,
    description: &PipelineDescription,
    objects: &mut PipelineObjects,
) -> VulkanResult<()> {
    let device = ctx.device;

    // Dropped at the end of this function, after the pipeline exists
    let mut shader_modules = vec![
        load_stage(device, &description.vertex_shader, vk::ShaderStageFlags::VERTEX)?,
        load_stage(device, &description.fragment_shader, vk::ShaderStageFlags::FRAGMENT)?,
    ];
    if let Some(geometry) = &description.geometry_shader {
        shader_modules.push(load_stage(device, geometry, vk::ShaderStageFlags::GEOMETRY)?);
    }
    let stages: Vec<vk::PipelineShaderStageCreateInfo> =
        shader_modules.iter().map(ShaderModule::stage_info).collect();

    let bindings = description.descriptor_bindings();
    let set_layout_info = vk::DescriptorSetLayoutCreateInfo::builder().bindings(&bindings);
    objects.descriptor_set_layout = unsafe {
        device
            .create_descriptor_set_layout(&set_layout_info, None)
            .map_err(VulkanError::Api)?
    };

    let set_layouts = [objects.descriptor_set_layout];
    let layout_info = vk::PipelineLayoutCreateInfo::builder().set_layouts(&set_layouts);
    objects.layout = unsafe { device.create_pipeline_layout(&layout_info, None).map_err(VulkanError::Api)? };

    let alloc_info = vk::DescriptorSetAllocateInfo::builder()
        .descriptor_pool(ctx.descriptor_pool)
        .set_layouts(&set_layouts);
    objects.descriptor_set = unsafe {
        device
            .allocate_descriptor_sets(&alloc_info)
            .map_err(VulkanError::Api)?
            .into_iter()
            .next()
            .ok_or_else(|| VulkanError::InvalidOperation {
                reason: "Descriptor pool returned no set".to_string(),
            })?
    };

    for declared in &description.uniform_buffers {
        let buffer = AllocatedBuffer::new(
            device,
            ctx.memory_properties,
            declared.byte_size,
            vk::BufferUsageFlags::UNIFORM_BUFFER | vk::BufferUsageFlags::TRANSFER_DST,
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
        )?;
        objects.uniform_buffers.push(UniformBufferObjects {
            binding: declared.binding,
            buffer,
        });

        let buffer_info = [vk::DescriptorBufferInfo {
            buffer: buffer.buffer,
            offset: 0,
            range: declared.byte_size,
        }];
        let write = vk::WriteDescriptorSet::builder()
            .dst_set(objects.descriptor_set)
            .dst_binding(declared.binding)
            .dst_array_element(0)
            .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
            .buffer_info(&buffer_info)
            .build();
        unsafe { device.update_descriptor_sets(&[write], &[]) };
    }

    let vertex_bindings = [vk::VertexInputBindingDescription {
        binding: 0,
        stride: description.vertex_stride,
        input_rate: vk::VertexInputRate::VERTEX,
    }];
    let vertex_attributes: Vec<vk::VertexInputAttributeDescription> = description
        .vertex_attributes
        .iter()
        .map(|attribute| vk::VertexInputAttributeDescription {
            location: attribute.location,
            binding: 0,
            format: attribute.format,
            offset: attribute.offset,
        })
        .collect();
    let vertex_input = if vertex_attributes.is_empty() {
        vk::PipelineVertexInputStateCreateInfo::builder()
    } else {
        vk::PipelineVertexInputStateCreateInfo::builder()
            .vertex_binding_descriptions(&vertex_bindings)
            .vertex_attribute_descriptions(&vertex_attributes)
    };

    let input_assembly = vk::PipelineInputAssemblyStateCreateInfo::builder()
        .topology(vk::PrimitiveTopology::TRIANGLE_LIST)
        .primitive_restart_enable(false);

    let viewports = [vk::Viewport {
        x: 0.0,
        y: 0.0,
        width: ctx.extent.width as f32,
        height: ctx.extent.height as f32,
        min_depth: 0.0,
        max_depth: 1.0,
    }];
    let scissors = [vk::Rect2D {
        offset: vk::Offset2D { x: 0, y: 0 },
        extent: ctx.extent,
    }];
    let viewport_state = vk::PipelineViewportStateCreateInfo::builder()
        .viewports(&viewports)
        .scissors(&scissors);

    let mode = RasterizationMode::from_wireframe(description.wireframe);
    let rasterizer = vk::PipelineRasterizationStateCreateInfo::builder()
        .depth_clamp_enable(false)
        .rasterizer_discard_enable(false)
        .polygon_mode(mode.polygon_mode)
        .cull_mode(mode.cull_mode)
        .front_face(vk::FrontFace::COUNTER_CLOCKWISE)
        .depth_bias_enable(false)
        .line_width(1.0);

    let multisampling = vk::PipelineMultisampleStateCreateInfo::builder()
        .rasterization_samples(vk::SampleCountFlags::TYPE_1)
        .sample_shading_enable(false);

    let color_blend_attachments = [vk::PipelineColorBlendAttachmentState::builder()
        .color_write_mask(vk::ColorComponentFlags::RGBA)
        .blend_enable(false)
        .build()];
    let color_blending = vk::PipelineColorBlendStateCreateInfo::builder()
        .logic_op_enable(false)
        .logic_op(vk::LogicOp::COPY)
        .attachments(&color_blend_attachments);

    let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
    let dynamic_state = vk::PipelineDynamicStateCreateInfo::builder().dynamic_states(&dynamic_states);

    let pipeline_info = vk::GraphicsPipelineCreateInfo::builder()
        .stages(&stages)
        .vertex_input_state(&vertex_input)
        .input_assembly_state(&input_assembly)
        .viewport_state(&viewport_state)
        .rasterization_state(&rasterizer)
        .multisample_state(&multisampling)
        .color_blend_state(&color_blending)
        .dynamic_state(&dynamic_state)
        .layout(objects.layout)
        .render_pass(ctx.render_pass)
        .subpass(0)
        .build();

    let pipelines = unsafe {
        device
            .create_graphics_pipelines(vk::PipelineCache::null(), &[pipeline_info], None)
            .map_err(|(_, e)| VulkanError::Api(e))?
    };
    objects.pipeline = pipelines.into_iter().next().ok_or_else(|| VulkanError::InvalidOperation {
        reason: "Driver returned no pipeline".to_string(),
    })?;

    log::debug!(
        "Created pipeline ({} stages, {} uniform buffers, wireframe: {})",
        stages.len(),
        objects.uniform_buffers.len(),
        description.wireframe
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ash::vk::Handle;

    #[test]
    fn test_rasterization_from_wireframe_flag() {
        let wire = RasterizationMode::from_wireframe(true);
        assert_eq!(wire.polygon_mode, vk::PolygonMode::LINE);
        assert_eq!(wire.cull_mode, vk::CullModeFlags::NONE);

        let solid = RasterizationMode::from_wireframe(false);
        assert_eq!(solid.polygon_mode, vk::PolygonMode::FILL);
        assert_eq!(solid.cull_mode, vk::CullModeFlags::BACK);
    }

    #[test]
    fn test_descriptor_bindings_follow_declarations() {
        let description = PipelineDescription::new("a.vert.spv", "a.frag.spv")
            .with_uniform_buffer(0, 176)
            .with_uniform_buffer(1, 144)
            .with_uniform_image(2);
        let bindings = description.descriptor_bindings();

        assert_eq!(bindings.len(), 3);
        assert_eq!(bindings[0].binding, 0);
        assert_eq!(bindings[0].descriptor_type, vk::DescriptorType::UNIFORM_BUFFER);
        assert_eq!(bindings[1].binding, 1);
        assert_eq!(bindings[2].descriptor_type, vk::DescriptorType::SAMPLER);
        assert!(bindings.iter().all(|b| b.stage_flags == vk::ShaderStageFlags::ALL_GRAPHICS));
        assert!(bindings.iter().all(|b| b.descriptor_count == 1));
    }

    #[test]
    fn test_missing_stages_rejected() {
        let no_vertex = PipelineDescription::new("", "a.frag.spv");
        assert!(matches!(no_vertex.validate(), Err(VulkanError::MissingShaderStage("vertex"))));

        let no_fragment = PipelineDescription::new("a.vert.spv", "");
        assert!(matches!(no_fragment.validate(), Err(VulkanError::MissingShaderStage("fragment"))));
    }

    #[test]
    fn test_attributes_need_stride() {
        let attributes = vec![VertexAttribute {
            location: 0,
            format: vk::Format::R32G32B32_SFLOAT,
            offset: 0,
        }];
        let description = PipelineDescription::new("a.vert.spv", "a.frag.spv").with_vertex_layout(attributes, 0);
        assert!(description.validate().is_err());
    }

    #[test]
    fn test_uniform_buffer_lookup_by_binding() {
        let objects = PipelineObjects {
            uniform_buffers: vec![
                UniformBufferObjects {
                    binding: 0,
                    buffer: AllocatedBuffer {
                        buffer: vk::Buffer::from_raw(10),
                        ..Default::default()
                    },
                },
                UniformBufferObjects {
                    binding: 1,
                    buffer: AllocatedBuffer {
                        buffer: vk::Buffer::from_raw(11),
                        ..Default::default()
                    },
                },
            ],
            ..Default::default()
        };
        assert_eq!(objects.uniform_buffer(1), Some(vk::Buffer::from_raw(11)));
        assert_eq!(objects.uniform_buffer(0), Some(vk::Buffer::from_raw(10)));
        assert_eq!(objects.uniform_buffer(5), None);
    }

    #[test]
    fn test_default_objects_are_null() {
        assert!(PipelineObjects::default().is_null());
    }
}
