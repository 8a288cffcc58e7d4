//! Uniform block layouts shared with `simple.vert` / `simple.frag`
//!
//! Both blocks use std140 rules: `mat4` and `vec4` members are 16-byte
//! aligned and each struct's size is padded to a multiple of 16.

use bytemuck::{Pod, Zeroable};

use crate::foundation::math::{utils, Mat4, Vec3, Vec4};

/// Binding 0: camera and light, identical for every object in a frame
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GlobalUniforms {
    /// World to view
    pub view: [[f32; 4]; 4],
    /// View to clip, Y flipped for Vulkan
    pub projection: [[f32; 4]; 4],
    /// Point light position, w = 1
    pub light_position: [f32; 4],
    /// Light color, alpha is intensity
    pub light_color: [f32; 4],
    /// Eye position for specular terms
    pub camera_position: [f32; 4],
}

impl Default for GlobalUniforms {
    fn default() -> Self {
        let identity = utils::to_cols_array(&Mat4::identity());
        Self {
            view: identity,
            projection: identity,
            light_position: [0.0, 0.0, 0.0, 1.0],
            light_color: [1.0; 4],
            camera_position: [0.0, 0.0, 0.0, 1.0],
        }
    }
}

impl GlobalUniforms {
    /// Store view and projection matrices and the eye position
    pub fn set_camera(&mut self, view: &Mat4, projection: &Mat4, eye: &Vec3) {
        self.view = utils::to_cols_array(view);
        self.projection = utils::to_cols_array(projection);
        self.camera_position = [eye.x, eye.y, eye.z, 1.0];
    }

    /// Store light position and color
    pub fn set_light(&mut self, position: &Vec4, color: &Vec4) {
        self.light_position = (*position).into();
        self.light_color = (*color).into();
    }
}

/// Binding 1: world transform and material of one object
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ObjectUniforms {
    /// Object to world
    pub world: [[f32; 4]; 4],
    /// Diffuse color
    pub diffuse: [f32; 4],
    /// Emitted color, the only term when lighting is off
    pub emissive: [f32; 4],
    /// Ambient reflectance
    pub ambient: [f32; 4],
    /// Specular color
    pub specular: [f32; 4],
    /// Specular exponent
    pub shininess: f32,
    /// GLSL `bool` is 4 bytes
    pub enable_lighting: u32,
    /// Pads the block to 16 bytes
    pub _padding: [u32; 2],
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_sizes_follow_std140() {
        assert_eq!(std::mem::size_of::<GlobalUniforms>(), 176);
        assert_eq!(std::mem::size_of::<ObjectUniforms>(), 144);
        assert_eq!(std::mem::size_of::<GlobalUniforms>() % 16, 0);
        assert_eq!(std::mem::size_of::<ObjectUniforms>() % 16, 0);
    }

    #[test]
    fn test_set_camera_writes_column_major() {
        let mut globals = GlobalUniforms::default();
        let view = Mat4::new_translation(&Vec3::new(1.0, 2.0, 3.0));
        globals.set_camera(&view, &Mat4::identity(), &Vec3::new(4.0, 5.0, 6.0));

        assert_eq!(globals.view[3], [1.0, 2.0, 3.0, 1.0]);
        assert_eq!(globals.camera_position, [4.0, 5.0, 6.0, 1.0]);
    }

    #[test]
    fn test_set_light() {
        let mut globals = GlobalUniforms::default();
        globals.set_light(&Vec4::new(0.0, 0.0, 0.0, 1.0), &Vec4::new(1.0, 1.0, 0.8, 0.4));
        assert_eq!(globals.light_color, [1.0, 1.0, 0.8, 0.4]);
    }
}
