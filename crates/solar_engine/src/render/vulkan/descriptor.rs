//! Shared descriptor pool

use ash::{vk, Device};

use super::context::{VulkanError, VulkanResult};

/// Uniform-buffer descriptors available across all pipelines
pub const MAX_UNIFORM_BUFFER_DESCRIPTORS: u32 = 128;
/// Sampler descriptors available across all pipelines
pub const MAX_SAMPLER_DESCRIPTORS: u32 = 128;
/// Descriptor sets available across all pipelines
pub const MAX_DESCRIPTOR_SETS: u32 = 256;

/// Pool every pipeline allocates its descriptor set from.
///
/// Sets can be freed individually so a pipeline can be destroyed on its own.
pub struct DescriptorPool {
    device: Device,
    pool: vk::DescriptorPool,
}

impl DescriptorPool {
    /// Create the pool
    pub fn new(device: Device) -> VulkanResult<Self> {
        let pool_sizes = [
            vk::DescriptorPoolSize {
                ty: vk::DescriptorType::UNIFORM_BUFFER,
                descriptor_count: MAX_UNIFORM_BUFFER_DESCRIPTORS,
            },
            vk::DescriptorPoolSize {
                ty: vk::DescriptorType::SAMPLER,
                descriptor_count: MAX_SAMPLER_DESCRIPTORS,
            },
        ];
        let create_info = vk::DescriptorPoolCreateInfo::builder()
            .flags(vk::DescriptorPoolCreateFlags::FREE_DESCRIPTOR_SET)
            .max_sets(MAX_DESCRIPTOR_SETS)
            .pool_sizes(&pool_sizes);

        let pool = unsafe { device.create_descriptor_pool(&create_info, None).map_err(VulkanError::Api)? };
        Ok(Self { device, pool })
    }

    /// Raw handle
    pub fn handle(&self) -> vk::DescriptorPool {
        self.pool
    }
}

impl Drop for DescriptorPool {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_descriptor_pool(self.pool, None);
        }
    }
}
