//! Buffer management for geometry and uniforms
//!
//! Buffers here are plain handle pairs rather than RAII wrappers: their
//! lifetime follows the owning entity's GPU residency and is ended
//! explicitly through the resource factory. `destroy` is idempotent.

use ash::{vk, Device};

use super::context::{VulkanError, VulkanResult};
use super::memory::find_memory_type_index;
use super::take_handle;
use crate::render::vertex::Vertex;

/// A buffer and the memory bound to it
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AllocatedBuffer {
    /// Buffer handle
    pub buffer: vk::Buffer,
    /// Backing memory
    pub memory: vk::DeviceMemory,
    /// Requested size in bytes
    pub size: vk::DeviceSize,
}

impl AllocatedBuffer {
    /// Create a buffer, allocate matching memory and bind it.
    ///
    /// On failure everything created so far is released.
    pub fn new(
        device: &Device,
        memory_properties: &vk::PhysicalDeviceMemoryProperties,
        size: vk::DeviceSize,
        usage: vk::BufferUsageFlags,
        properties: vk::MemoryPropertyFlags,
    ) -> VulkanResult<Self> {
        let buffer_info = vk::BufferCreateInfo::builder()
            .size(size)
            .usage(usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        let mut result = Self {
            buffer: unsafe { device.create_buffer(&buffer_info, None).map_err(VulkanError::Api)? },
            memory: vk::DeviceMemory::null(),
            size,
        };

        if let Err(e) = result.allocate_and_bind(device, memory_properties, properties) {
            result.destroy(device);
            return Err(e);
        }

        Ok(result)
    }

    fn allocate_and_bind(
        &mut self,
        device: &Device,
        memory_properties: &vk::PhysicalDeviceMemoryProperties,
        properties: vk::MemoryPropertyFlags,
    ) -> VulkanResult<()> {
        let requirements = unsafe { device.get_buffer_memory_requirements(self.buffer) };
        let memory_type_index = find_memory_type_index(memory_properties, requirements.memory_type_bits, properties)
            .ok_or(VulkanError::NoSuitableMemoryType)?;

        let alloc_info = vk::MemoryAllocateInfo::builder()
            .allocation_size(requirements.size)
            .memory_type_index(memory_type_index);

        unsafe {
            self.memory = device.allocate_memory(&alloc_info, None).map_err(VulkanError::Api)?;
            device
                .bind_buffer_memory(self.buffer, self.memory, 0)
                .map_err(VulkanError::Api)
        }
    }

    /// Copy `data` into host-visible memory: map, copy, flush, unmap.
    ///
    /// The memory is not assumed coherent, so the written range is flushed
    /// before unmapping.
    pub fn upload<T: bytemuck::Pod>(&self, device: &Device, data: &[T]) -> VulkanResult<()> {
        let bytes: &[u8] = bytemuck::cast_slice(data);
        if bytes.len() as vk::DeviceSize > self.size {
            return Err(VulkanError::InvalidOperation {
                reason: format!("Upload of {} bytes exceeds buffer size {}", bytes.len(), self.size),
            });
        }

        unsafe {
            let mapped = device
                .map_memory(self.memory, 0, vk::WHOLE_SIZE, vk::MemoryMapFlags::empty())
                .map_err(VulkanError::Api)?;
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), mapped.cast::<u8>(), bytes.len());

            let range = vk::MappedMemoryRange::builder()
                .memory(self.memory)
                .offset(0)
                .size(vk::WHOLE_SIZE)
                .build();
            let flushed = device.flush_mapped_memory_ranges(&[range]);
            device.unmap_memory(self.memory);
            flushed.map_err(VulkanError::Api)
        }
    }

    /// Whether both handles are null
    pub fn is_null(&self) -> bool {
        self.buffer == vk::Buffer::null() && self.memory == vk::DeviceMemory::null()
    }

    /// Destroy the non-null handles and null every field
    pub fn destroy(&mut self, device: &Device) {
        unsafe {
            if let Some(buffer) = take_handle(&mut self.buffer) {
                device.destroy_buffer(buffer, None);
            }
            if let Some(memory) = take_handle(&mut self.memory) {
                device.free_memory(memory, None);
            }
        }
        self.size = 0;
    }
}

/// Vertex and optional index buffer of one entity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GeometryBuffers {
    /// Vertex data, null when the entity has no vertices
    pub vertex: AllocatedBuffer,
    /// Index data, null when the entity has no indices
    pub index: AllocatedBuffer,
    /// Vertices in the vertex buffer
    pub vertex_count: u32,
    /// Indices in the index buffer
    pub index_count: u32,
}

impl GeometryBuffers {
    /// Upload `vertices` and, when non-empty, `indices` to host-visible buffers.
    ///
    /// If the index buffer fails the vertex buffer is released again.
    pub fn new(
        device: &Device,
        memory_properties: &vk::PhysicalDeviceMemoryProperties,
        vertices: &[Vertex],
        indices: &[u32],
    ) -> VulkanResult<Self> {
        let mut geometry = Self::default();
        match geometry.fill(device, memory_properties, vertices, indices) {
            Ok(()) => Ok(geometry),
            Err(e) => {
                geometry.destroy(device);
                Err(e)
            }
        }
    }

    fn fill(
        &mut self,
        device: &Device,
        memory_properties: &vk::PhysicalDeviceMemoryProperties,
        vertices: &[Vertex],
        indices: &[u32],
    ) -> VulkanResult<()> {
        let host_visible = vk::MemoryPropertyFlags::HOST_VISIBLE;

        if !vertices.is_empty() {
            self.vertex = AllocatedBuffer::new(
                device,
                memory_properties,
                std::mem::size_of_val(vertices) as vk::DeviceSize,
                vk::BufferUsageFlags::VERTEX_BUFFER,
                host_visible,
            )?;
            self.vertex.upload(device, vertices)?;
            self.vertex_count = vertices.len() as u32;
        }

        if !indices.is_empty() {
            self.index = AllocatedBuffer::new(
                device,
                memory_properties,
                std::mem::size_of_val(indices) as vk::DeviceSize,
                vk::BufferUsageFlags::INDEX_BUFFER,
                host_visible,
            )?;
            self.index.upload(device, indices)?;
            self.index_count = indices.len() as u32;
        }

        Ok(())
    }

    /// Whether an index buffer is present
    pub fn has_index_buffer(&self) -> bool {
        self.index.buffer != vk::Buffer::null()
    }

    /// Whether nothing is allocated
    pub fn is_null(&self) -> bool {
        self.vertex.is_null() && self.index.is_null()
    }

    /// Release both buffers; safe to call repeatedly
    pub fn destroy(&mut self, device: &Device) {
        self.vertex.destroy(device);
        self.index.destroy(device);
        self.vertex_count = 0;
        self.index_count = 0;
    }
}
