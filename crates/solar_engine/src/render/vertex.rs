//! Vertex format shared by meshes and pipelines

use ash::vk;
use bytemuck::{Pod, Zeroable};

use crate::foundation::math::Vec3;
use crate::render::vulkan::pipeline::VertexAttribute;

/// Position and normal, tightly packed
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    /// Object-space position
    pub position: [f32; 3],
    /// Object-space normal
    pub normal: [f32; 3],
}

impl Vertex {
    /// Byte stride between consecutive vertices
    pub const STRIDE: u32 = std::mem::size_of::<Self>() as u32;

    /// Vertex from position and normal vectors
    pub fn new(position: Vec3, normal: Vec3) -> Self {
        Self {
            position: position.into(),
            normal: normal.into(),
        }
    }

    /// Position as a vector
    pub fn position(&self) -> Vec3 {
        Vec3::from(self.position)
    }

    /// Attribute layout: location 0 position, location 1 normal
    pub fn attributes() -> Vec<VertexAttribute> {
        vec![
            VertexAttribute {
                location: 0,
                format: vk::Format::R32G32B32_SFLOAT,
                offset: std::mem::offset_of!(Vertex, position) as u32,
            },
            VertexAttribute {
                location: 1,
                format: vk::Format::R32G32B32_SFLOAT,
                offset: std::mem::offset_of!(Vertex, normal) as u32,
            },
        ]
    }
}
