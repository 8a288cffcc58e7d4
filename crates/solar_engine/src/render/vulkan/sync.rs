//! Vulkan synchronization primitives for GPU/CPU coordination
//!
//! RAII wrappers for semaphores and fences, plus [`FrameSync`], the set of
//! objects that guards one in-flight frame slot:
//!
//! ```text
//! acquire ──signal──▶ image_available ──wait──▶ submit ──signal──▶ render_finished ──wait──▶ present
//!                                               submit ──signal──▶ in_flight (waited by the CPU)
//! ```
//!
//! The CPU waits on `in_flight` before reusing a slot, which bounds how far
//! recording may run ahead of the GPU.

use ash::{vk, Device};

use super::context::{VulkanError, VulkanResult};

/// Number of frame slots that may be in flight at once
pub const MAX_FRAMES_IN_FLIGHT: usize = 2;

/// Binary semaphore
pub struct Semaphore {
    device: Device,
    semaphore: vk::Semaphore,
}

impl Semaphore {
    /// Create an unsignaled semaphore
    pub fn new(device: Device) -> VulkanResult<Self> {
        let create_info = vk::SemaphoreCreateInfo::builder();
        let semaphore = unsafe { device.create_semaphore(&create_info, None).map_err(VulkanError::Api)? };
        Ok(Self { device, semaphore })
    }

    /// Raw handle
    pub fn handle(&self) -> vk::Semaphore {
        self.semaphore
    }
}

impl Drop for Semaphore {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_semaphore(self.semaphore, None);
        }
    }
}

/// CPU-visible completion fence
pub struct Fence {
    device: Device,
    fence: vk::Fence,
}

impl Fence {
    /// Create a fence, optionally already signaled
    pub fn new(device: Device, signaled: bool) -> VulkanResult<Self> {
        let flags = if signaled {
            vk::FenceCreateFlags::SIGNALED
        } else {
            vk::FenceCreateFlags::empty()
        };
        let create_info = vk::FenceCreateInfo::builder().flags(flags);
        let fence = unsafe { device.create_fence(&create_info, None).map_err(VulkanError::Api)? };
        Ok(Self { device, fence })
    }

    /// Block until signaled or `timeout` nanoseconds pass
    pub fn wait(&self, timeout: u64) -> VulkanResult<()> {
        unsafe {
            self.device
                .wait_for_fences(&[self.fence], true, timeout)
                .map_err(VulkanError::Api)
        }
    }

    /// Return to the unsignaled state
    pub fn reset(&self) -> VulkanResult<()> {
        unsafe { self.device.reset_fences(&[self.fence]).map_err(VulkanError::Api) }
    }

    /// Raw handle
    pub fn handle(&self) -> vk::Fence {
        self.fence
    }
}

impl Drop for Fence {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_fence(self.fence, None);
        }
    }
}

/// Synchronization objects of one frame slot
pub struct FrameSync {
    /// Signaled when the acquired image may be rendered to
    pub image_available: Semaphore,
    /// Signaled when rendering finished and the image may be presented
    pub render_finished: Semaphore,
    /// Signaled when the slot's submission completed on the GPU
    pub in_flight: Fence,
}

impl FrameSync {
    /// Create the slot with its fence signaled so the first wait returns at once
    pub fn new(device: &Device) -> VulkanResult<Self> {
        Ok(Self {
            image_available: Semaphore::new(device.clone())?,
            render_finished: Semaphore::new(device.clone())?,
            in_flight: Fence::new(device.clone(), true)?,
        })
    }
}

/// Index of the slot following `current`
pub fn next_frame_slot(current: usize) -> usize {
    (current + 1) % MAX_FRAMES_IN_FLIGHT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_slots_wrap() {
        assert_eq!(next_frame_slot(0), 1);
        assert_eq!(next_frame_slot(1), 0);

        let mut slot = 0;
        for _ in 0..5 {
            slot = next_frame_slot(slot);
            assert!(slot < MAX_FRAMES_IN_FLIGHT);
        }
        assert_eq!(slot, 1);
    }
}
