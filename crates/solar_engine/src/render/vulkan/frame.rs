//! Frame synchronizer
//!
//! [`Renderer`] drives one frame at a time through a ring of
//! [`MAX_FRAMES_IN_FLIGHT`] slots:
//!
//! 1. wait for the slot's fence
//! 2. acquire a swapchain image (stale surface: rebuild, skip the frame)
//! 3. record: pre-render callback, render pass with the render callback
//! 4. reset the fence and submit
//! 5. present (stale surface: rebuild)
//! 6. advance to the next slot
//!
//! Everything tied to the swapchain (render pass, framebuffers, command
//! buffers) is torn down and recreated by [`Renderer::rebuild`], which also
//! tells the scene through [`RenderCallbacks`] when its GPU resources must
//! go and when they may come back.

use ash::vk;

use super::commands::{ActiveRenderPass, CommandPool, CommandRecorder};
use super::context::{VulkanContext, VulkanError, VulkanResult};
use super::descriptor::DescriptorPool;
use super::factory::VulkanResourceFactory;
use super::framebuffer::Framebuffer;
use super::render_pass::RenderPass;
use super::swapchain::Swapchain;
use super::sync::{next_frame_slot, FrameSync, MAX_FRAMES_IN_FLIGHT};
use super::ResourceFactory;
use crate::config::RendererConfig;
use crate::render::window::Platform;

/// Opaque black
pub const CLEAR_COLOR: [f32; 4] = [0.0, 0.0, 0.0, 1.0];

/// Hooks the renderer calls into the scene layer
pub trait RenderCallbacks {
    /// GPU resources tied to the old device configuration must be released now
    fn on_device_lost(&mut self, resources: &mut dyn ResourceFactory);

    /// Resources may be (re)created against the new configuration
    fn on_device_ready(&mut self, resources: &mut dyn ResourceFactory);

    /// Record transfers that must happen before the render pass
    fn on_pre_render(&mut self, commands: &mut CommandRecorder);

    /// Record draw commands inside the render pass
    fn on_render(&mut self, pass: &mut ActiveRenderPass<'_>);
}

/// What happened to a requested frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Recorded, submitted and presented
    Presented,
    /// The surface was stale; dependent resources were rebuilt instead
    Rebuilt,
    /// Nothing to draw into, e.g. a minimized window
    Skipped,
}

impl FrameOutcome {
    /// Outcome of a frame replaced by [`Renderer::rebuild`]; a surface with
    /// zero area leaves nothing to draw into
    pub fn after_rebuild(rebuilt: bool) -> Self {
        if rebuilt {
            Self::Rebuilt
        } else {
            Self::Skipped
        }
    }
}

struct SwapchainResources {
    command_buffers: Vec<vk::CommandBuffer>,
    framebuffers: Vec<Framebuffer>,
    render_pass: RenderPass,
    swapchain: Swapchain,
    images_in_flight: Vec<vk::Fence>,
}

/// Frame lifecycle and swapchain owner
pub struct Renderer {
    // Declaration order is drop order: swapchain resources go before the
    // pools, sync objects and finally the context.
    targets: Option<SwapchainResources>,
    frames: Vec<FrameSync>,
    descriptor_pool: DescriptorPool,
    command_pool: CommandPool,
    current_frame: usize,
    needs_rebuild: bool,
    context: VulkanContext,
}

impl Renderer {
    /// Create device-level objects. The swapchain is built by the first
    /// [`rebuild`](Self::rebuild).
    pub fn new(platform: &mut dyn Platform, config: &RendererConfig) -> VulkanResult<Self> {
        let context = VulkanContext::new(platform, &config.application_name, config.validation_enabled())?;
        let device = context.raw_device().clone();

        let command_pool = CommandPool::new(device.clone(), context.physical_device().graphics_family)?;
        let descriptor_pool = DescriptorPool::new(device.clone())?;
        let frames = (0..MAX_FRAMES_IN_FLIGHT)
            .map(|_| FrameSync::new(&device))
            .collect::<VulkanResult<Vec<_>>>()?;

        log::info!("Renderer initialized with {} frames in flight", MAX_FRAMES_IN_FLIGHT);

        Ok(Self {
            targets: None,
            frames,
            descriptor_pool,
            command_pool,
            current_frame: 0,
            needs_rebuild: true,
            context,
        })
    }

    /// Vulkan context
    pub fn context(&self) -> &VulkanContext {
        &self.context
    }

    /// Current swapchain extent, if a swapchain exists
    pub fn surface_extent(&self) -> Option<vk::Extent2D> {
        self.targets.as_ref().map(|targets| targets.swapchain.extent())
    }

    /// Slot the next frame will use
    pub fn current_frame(&self) -> usize {
        self.current_frame
    }

    /// Rebuild before the next frame (window resized)
    pub fn request_rebuild(&mut self) {
        self.needs_rebuild = true;
    }

    /// Factory bound to the current render pass and extent
    pub fn resource_factory(&self) -> VulkanResourceFactory<'_> {
        let (render_pass, extent) = self.targets.as_ref().map_or(
            (vk::RenderPass::null(), vk::Extent2D::default()),
            |targets| (targets.render_pass.handle(), targets.swapchain.extent()),
        );
        VulkanResourceFactory::new(
            self.context.raw_device(),
            &self.context.physical_device().memory_properties,
            self.descriptor_pool.handle(),
            render_pass,
            extent,
        )
    }

    /// Tear down and recreate everything that depends on the swapchain.
    ///
    /// Safe to call at startup, when nothing exists yet, and mid-loop.
    /// Returns `false` when the surface has zero area; the rebuild stays
    /// pending until it grows again.
    pub fn rebuild(&mut self, platform: &dyn Platform, callbacks: &mut dyn RenderCallbacks) -> VulkanResult<bool> {
        let (width, height) = platform.framebuffer_size();
        if width == 0 || height == 0 {
            self.needs_rebuild = true;
            return Ok(false);
        }

        self.context.wait_idle()?;
        callbacks.on_device_lost(&mut self.resource_factory());

        let old = self.targets.take();
        let old_swapchain = old.as_ref().map_or(vk::SwapchainKHR::null(), |targets| {
            self.command_pool.free_command_buffers(&targets.command_buffers);
            targets.swapchain.handle()
        });

        let window_extent = vk::Extent2D { width, height };
        let swapchain = Swapchain::new(&self.context, window_extent, old_swapchain)?;
        // The retired swapchain can go once its successor exists
        drop(old);

        let device = self.context.raw_device();
        let render_pass = RenderPass::new_color_pass(device.clone(), swapchain.format().format)?;
        let framebuffers =
            Framebuffer::for_image_views(device, render_pass.handle(), swapchain.image_views(), swapchain.extent())?;
        let command_buffers = self.command_pool.allocate_command_buffers(swapchain.image_count() as u32)?;

        log::info!(
            "Rebuilt swapchain resources: {} framebuffers at {}x{}",
            framebuffers.len(),
            swapchain.extent().width,
            swapchain.extent().height
        );

        self.targets = Some(SwapchainResources {
            images_in_flight: vec![vk::Fence::null(); swapchain.image_count()],
            command_buffers,
            framebuffers,
            render_pass,
            swapchain,
        });
        self.needs_rebuild = false;

        callbacks.on_device_ready(&mut self.resource_factory());
        Ok(true)
    }

    /// Produce one frame.
    ///
    /// A stale surface is handled here by rebuilding and is not an error.
    /// Errors returned from this function are fatal for the render loop.
    pub fn render_frame(
        &mut self,
        platform: &dyn Platform,
        callbacks: &mut dyn RenderCallbacks,
    ) -> VulkanResult<FrameOutcome> {
        if self.needs_rebuild || self.targets.is_none() {
            return self.rebuild(platform, callbacks).map(FrameOutcome::after_rebuild);
        }

        self.frames[self.current_frame].in_flight.wait(u64::MAX)?;

        let outcome = self.draw_frame(platform, callbacks);
        self.current_frame = next_frame_slot(self.current_frame);
        outcome
    }

    fn draw_frame(
        &mut self,
        platform: &dyn Platform,
        callbacks: &mut dyn RenderCallbacks,
    ) -> VulkanResult<FrameOutcome> {
        let frame = &self.frames[self.current_frame];
        let image_available = frame.image_available.handle();
        let render_finished = frame.render_finished.handle();
        let in_flight = frame.in_flight.handle();

        let Some(targets) = self.targets.as_mut() else {
            return Ok(FrameOutcome::Skipped);
        };

        let acquired = unsafe {
            self.context.swapchain_loader().acquire_next_image(
                targets.swapchain.handle(),
                u64::MAX,
                image_available,
                vk::Fence::null(),
            )
        }
        .map_err(VulkanError::Api);
        let image_index = match acquired {
            Ok((index, _suboptimal)) => index,
            Err(e) if e.is_out_of_date() => {
                log::warn!("Swapchain out of date during acquire_next_image");
                return self.rebuild(platform, callbacks).map(FrameOutcome::after_rebuild);
            }
            Err(e) => return Err(e),
        };
        let image = image_index as usize;

        let device = self.context.raw_device();

        // Another slot may still be rendering to this image
        let image_fence = targets.images_in_flight[image];
        if image_fence != vk::Fence::null() && image_fence != in_flight {
            unsafe {
                device
                    .wait_for_fences(&[image_fence], true, u64::MAX)
                    .map_err(VulkanError::Api)?;
            }
        }
        targets.images_in_flight[image] = in_flight;

        let command_buffer = targets.command_buffers[image];
        let extent = targets.swapchain.extent();
        let mut recorder = CommandRecorder::new(command_buffer, device.clone());
        recorder.begin()?;
        // Uniform buffers are shared by both frame slots
        recorder.shader_to_transfer_barrier();
        callbacks.on_pre_render(&mut recorder);
        recorder.transfer_to_uniform_barrier();
        {
            let render_area = vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent,
            };
            let clear_values = [vk::ClearValue {
                color: vk::ClearColorValue { float32: CLEAR_COLOR },
            }];
            let mut pass = recorder.begin_render_pass(
                targets.render_pass.handle(),
                targets.framebuffers[image].handle(),
                render_area,
                &clear_values,
            )?;
            pass.set_viewport(&vk::Viewport {
                x: 0.0,
                y: 0.0,
                width: extent.width as f32,
                height: extent.height as f32,
                min_depth: 0.0,
                max_depth: 1.0,
            });
            pass.set_scissor(&render_area);
            callbacks.on_render(&mut pass);
        }
        let command_buffer = recorder.end()?;

        let wait_semaphores = [image_available];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let command_buffers = [command_buffer];
        let signal_semaphores = [render_finished];
        let submit_info = vk::SubmitInfo::builder()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores)
            .build();

        self.frames[self.current_frame].in_flight.reset()?;
        unsafe {
            device
                .queue_submit(self.context.graphics_queue(), &[submit_info], in_flight)
                .map_err(VulkanError::Api)?;
        }

        let swapchains = [targets.swapchain.handle()];
        let image_indices = [image_index];
        let present_info = vk::PresentInfoKHR::builder()
            .wait_semaphores(&signal_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        let presented = unsafe {
            self.context
                .swapchain_loader()
                .queue_present(self.context.present_queue(), &present_info)
        }
        .map_err(VulkanError::Api);
        match presented {
            Ok(suboptimal) => {
                if suboptimal {
                    log::debug!("Swapchain suboptimal, rebuilding before the next frame");
                    self.needs_rebuild = true;
                }
                log::trace!("Presented image {} from slot {}", image_index, self.current_frame);
                Ok(FrameOutcome::Presented)
            }
            Err(e) if e.is_out_of_date() => {
                log::warn!("Swapchain out of date during present");
                self.rebuild(platform, callbacks).map(FrameOutcome::after_rebuild)
            }
            Err(e) => Err(e),
        }
    }

    /// Release scene resources and wait for the GPU before shutdown
    pub fn shutdown(&mut self, callbacks: &mut dyn RenderCallbacks) -> VulkanResult<()> {
        self.context.wait_idle()?;
        callbacks.on_device_lost(&mut self.resource_factory());
        Ok(())
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        let _ = self.context.wait_idle();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_area_rebuild_is_skipped() {
        assert_eq!(FrameOutcome::after_rebuild(true), FrameOutcome::Rebuilt);
        assert_eq!(FrameOutcome::after_rebuild(false), FrameOutcome::Skipped);
    }
}
