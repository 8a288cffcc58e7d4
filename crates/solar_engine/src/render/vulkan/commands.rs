//! Command buffer management
//!
//! `CommandRecorder` wraps one primary command buffer while it is being
//! recorded; `ActiveRenderPass` borrows the recorder for the duration of a
//! render pass and ends the pass when dropped.

use ash::{vk, Device};

use super::context::{VulkanError, VulkanResult};

/// Command pool whose buffers can be reset individually
pub struct CommandPool {
    device: Device,
    command_pool: vk::CommandPool,
}

impl CommandPool {
    /// Create a pool for the given queue family
    pub fn new(device: Device, queue_family_index: u32) -> VulkanResult<Self> {
        let pool_create_info = vk::CommandPoolCreateInfo::builder()
            .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER)
            .queue_family_index(queue_family_index);

        let command_pool = unsafe {
            device
                .create_command_pool(&pool_create_info, None)
                .map_err(VulkanError::Api)?
        };

        Ok(Self { device, command_pool })
    }

    /// Allocate `count` primary command buffers
    pub fn allocate_command_buffers(&self, count: u32) -> VulkanResult<Vec<vk::CommandBuffer>> {
        let alloc_info = vk::CommandBufferAllocateInfo::builder()
            .command_pool(self.command_pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(count);

        unsafe { self.device.allocate_command_buffers(&alloc_info).map_err(VulkanError::Api) }
    }

    /// Return command buffers to the pool
    pub fn free_command_buffers(&self, command_buffers: &[vk::CommandBuffer]) {
        if command_buffers.is_empty() {
            return;
        }
        unsafe {
            self.device.free_command_buffers(self.command_pool, command_buffers);
        }
    }

    /// Raw handle
    pub fn handle(&self) -> vk::CommandPool {
        self.command_pool
    }
}

impl Drop for CommandPool {
    fn drop(&mut self) {
        unsafe {
            let _ = self.device.device_wait_idle();
            self.device.destroy_command_pool(self.command_pool, None);
        }
    }
}

/// Stage and access masks of a global memory barrier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BarrierScope {
    /// Stages that must complete first
    pub src_stage: vk::PipelineStageFlags,
    /// Stages that wait
    pub dst_stage: vk::PipelineStageFlags,
    /// Accesses made available
    pub src_access: vk::AccessFlags,
    /// Accesses made visible
    pub dst_access: vk::AccessFlags,
}

impl BarrierScope {
    fn uniform_stages() -> vk::PipelineStageFlags {
        vk::PipelineStageFlags::VERTEX_SHADER | vk::PipelineStageFlags::FRAGMENT_SHADER
    }

    /// Uniform reads in shaders before buffer updates (write after read)
    pub fn shader_read_to_transfer() -> Self {
        Self {
            src_stage: Self::uniform_stages(),
            dst_stage: vk::PipelineStageFlags::TRANSFER,
            src_access: vk::AccessFlags::empty(),
            dst_access: vk::AccessFlags::TRANSFER_WRITE,
        }
    }

    /// Buffer updates before uniform reads in shaders (read after write)
    pub fn transfer_to_uniform_read() -> Self {
        Self {
            src_stage: vk::PipelineStageFlags::TRANSFER,
            dst_stage: Self::uniform_stages(),
            src_access: vk::AccessFlags::TRANSFER_WRITE,
            dst_access: vk::AccessFlags::UNIFORM_READ,
        }
    }
}

/// Records into one command buffer
pub struct CommandRecorder {
    command_buffer: vk::CommandBuffer,
    device: Device,
    recording: bool,
}

impl CommandRecorder {
    /// Wrap `command_buffer`; nothing is recorded until [`begin`](Self::begin)
    pub fn new(command_buffer: vk::CommandBuffer, device: Device) -> Self {
        Self {
            command_buffer,
            device,
            recording: false,
        }
    }

    /// Reset the buffer and start recording
    pub fn begin(&mut self) -> VulkanResult<()> {
        if self.recording {
            return Err(VulkanError::InvalidOperation {
                reason: "Command buffer already recording".to_string(),
            });
        }

        let begin_info = vk::CommandBufferBeginInfo::builder().flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);

        unsafe {
            self.device
                .reset_command_buffer(self.command_buffer, vk::CommandBufferResetFlags::empty())
                .map_err(VulkanError::Api)?;
            self.device
                .begin_command_buffer(self.command_buffer, &begin_info)
                .map_err(VulkanError::Api)?;
        }

        self.recording = true;
        Ok(())
    }

    /// Inline buffer update; `data` must be a multiple of 4 bytes and at most 64 KiB
    pub fn update_buffer(&mut self, buffer: vk::Buffer, offset: vk::DeviceSize, data: &[u8]) {
        unsafe {
            self.device.cmd_update_buffer(self.command_buffer, buffer, offset, data);
        }
    }

    /// Hold transfer writes until shader reads recorded earlier on the queue,
    /// including those of the other frame slot, have finished
    pub fn shader_to_transfer_barrier(&mut self) {
        self.memory_barrier(BarrierScope::shader_read_to_transfer());
    }

    /// Make transfer writes visible to uniform reads in later shader stages
    pub fn transfer_to_uniform_barrier(&mut self) {
        self.memory_barrier(BarrierScope::transfer_to_uniform_read());
    }

    fn memory_barrier(&mut self, scope: BarrierScope) {
        let barrier = vk::MemoryBarrier::builder()
            .src_access_mask(scope.src_access)
            .dst_access_mask(scope.dst_access)
            .build();
        unsafe {
            self.device.cmd_pipeline_barrier(
                self.command_buffer,
                scope.src_stage,
                scope.dst_stage,
                vk::DependencyFlags::empty(),
                &[barrier],
                &[],
                &[],
            );
        }
    }

    /// Begin an inline render pass
    pub fn begin_render_pass(
        &mut self,
        render_pass: vk::RenderPass,
        framebuffer: vk::Framebuffer,
        render_area: vk::Rect2D,
        clear_values: &[vk::ClearValue],
    ) -> VulkanResult<ActiveRenderPass<'_>> {
        if !self.recording {
            return Err(VulkanError::InvalidOperation {
                reason: "Command buffer not recording".to_string(),
            });
        }

        let render_pass_begin = vk::RenderPassBeginInfo::builder()
            .render_pass(render_pass)
            .framebuffer(framebuffer)
            .render_area(render_area)
            .clear_values(clear_values);

        unsafe {
            self.device
                .cmd_begin_render_pass(self.command_buffer, &render_pass_begin, vk::SubpassContents::INLINE);
        }

        Ok(ActiveRenderPass { recorder: self })
    }

    /// Finish recording
    pub fn end(mut self) -> VulkanResult<vk::CommandBuffer> {
        if !self.recording {
            return Err(VulkanError::InvalidOperation {
                reason: "Command buffer not recording".to_string(),
            });
        }

        unsafe {
            self.device
                .end_command_buffer(self.command_buffer)
                .map_err(VulkanError::Api)?;
        }

        self.recording = false;
        Ok(self.command_buffer)
    }
}

/// Commands valid inside a render pass
pub struct ActiveRenderPass<'a> {
    recorder: &'a mut CommandRecorder,
}

impl ActiveRenderPass<'_> {
    /// Set dynamic viewport 0
    pub fn set_viewport(&mut self, viewport: &vk::Viewport) {
        unsafe {
            self.recorder
                .device
                .cmd_set_viewport(self.recorder.command_buffer, 0, std::slice::from_ref(viewport));
        }
    }

    /// Set dynamic scissor 0
    pub fn set_scissor(&mut self, scissor: &vk::Rect2D) {
        unsafe {
            self.recorder
                .device
                .cmd_set_scissor(self.recorder.command_buffer, 0, std::slice::from_ref(scissor));
        }
    }

    /// Bind a graphics pipeline
    pub fn bind_pipeline(&mut self, pipeline: vk::Pipeline) {
        unsafe {
            self.recorder.device.cmd_bind_pipeline(
                self.recorder.command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                pipeline,
            );
        }
    }

    /// Bind descriptor sets starting at set 0
    pub fn bind_descriptor_sets(&mut self, layout: vk::PipelineLayout, descriptor_sets: &[vk::DescriptorSet]) {
        unsafe {
            self.recorder.device.cmd_bind_descriptor_sets(
                self.recorder.command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                layout,
                0,
                descriptor_sets,
                &[],
            );
        }
    }

    /// Bind one vertex buffer at binding 0
    pub fn bind_vertex_buffer(&mut self, buffer: vk::Buffer) {
        unsafe {
            self.recorder
                .device
                .cmd_bind_vertex_buffers(self.recorder.command_buffer, 0, &[buffer], &[0]);
        }
    }

    /// Bind a 32-bit index buffer
    pub fn bind_index_buffer(&mut self, buffer: vk::Buffer) {
        unsafe {
            self.recorder.device.cmd_bind_index_buffer(
                self.recorder.command_buffer,
                buffer,
                0,
                vk::IndexType::UINT32,
            );
        }
    }

    /// Non-indexed draw of one instance
    pub fn draw(&mut self, vertex_count: u32) {
        unsafe {
            self.recorder
                .device
                .cmd_draw(self.recorder.command_buffer, vertex_count, 1, 0, 0);
        }
    }

    /// Indexed draw of one instance
    pub fn draw_indexed(&mut self, index_count: u32) {
        unsafe {
            self.recorder
                .device
                .cmd_draw_indexed(self.recorder.command_buffer, index_count, 1, 0, 0, 0);
        }
    }
}

impl Drop for ActiveRenderPass<'_> {
    fn drop(&mut self) {
        unsafe {
            self.recorder.device.cmd_end_render_pass(self.recorder.command_buffer);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_barriers_bracket_uniform_reads() {
        let before = BarrierScope::shader_read_to_transfer();
        let after = BarrierScope::transfer_to_uniform_read();

        // Every stage that reads uniforms after the update also finishes
        // reading before the next update starts
        assert_eq!(before.src_stage, after.dst_stage);
        assert!(before.src_stage.contains(vk::PipelineStageFlags::VERTEX_SHADER));
        assert!(before.src_stage.contains(vk::PipelineStageFlags::FRAGMENT_SHADER));
        assert_eq!(before.dst_stage, vk::PipelineStageFlags::TRANSFER);
        assert_eq!(before.dst_access, vk::AccessFlags::TRANSFER_WRITE);

        assert_eq!(after.src_stage, vk::PipelineStageFlags::TRANSFER);
        assert_eq!(after.src_access, vk::AccessFlags::TRANSFER_WRITE);
        assert_eq!(after.dst_access, vk::AccessFlags::UNIFORM_READ);
    }
}
