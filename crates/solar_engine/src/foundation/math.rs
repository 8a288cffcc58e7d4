//! Math utilities and types
//!
//! Provides the nalgebra aliases used across the engine together with the
//! handful of matrix helpers the renderer and the scene graph share.

pub use nalgebra::{Matrix4, Unit, Vector3, Vector4};

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// 3D point type
pub type Point3 = nalgebra::Point3<f32>;

/// Math constants
pub mod constants {
    /// Pi constant
    pub const PI: f32 = std::f32::consts::PI;

    /// 2 * Pi
    pub const TAU: f32 = 2.0 * PI;

    /// Degrees to radians conversion factor
    pub const DEG_TO_RAD: f32 = PI / 180.0;
}

/// Math utility functions
pub mod utils {
    use super::{constants, Mat4};

    /// Convert degrees to radians
    pub fn deg_to_rad(degrees: f32) -> f32 {
        degrees * constants::DEG_TO_RAD
    }

    /// Column-major array layout expected by GLSL `mat4`
    pub fn to_cols_array(matrix: &Mat4) -> [[f32; 4]; 4] {
        (*matrix).into()
    }
}

/// Extension trait for Mat4 with additional convenience methods
pub trait Mat4Ext {
    /// Rotation of `angle` radians around `axis`.
    ///
    /// The axis is normalized first; a zero axis yields the identity.
    fn rotation_about(angle: f32, axis: &Vec3) -> Mat4;

    /// Yaw around +Y applied after pitch around +X.
    fn euler_yx(yaw: f32, pitch: f32) -> Mat4;

    /// Right-handed perspective projection with the Y axis flipped for Vulkan
    fn perspective_vulkan(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4;

    /// Right-handed look-at view matrix
    fn look_at(eye: &Vec3, target: &Vec3, up: &Vec3) -> Mat4;

    /// Translation part of an affine transform
    fn translation_part(&self) -> Vec3;
}

impl Mat4Ext for Mat4 {
    fn rotation_about(angle: f32, axis: &Vec3) -> Mat4 {
        Unit::try_new(*axis, f32::EPSILON)
            .map_or_else(Mat4::identity, |axis| Mat4::from_axis_angle(&axis, angle))
    }

    fn euler_yx(yaw: f32, pitch: f32) -> Mat4 {
        Mat4::from_axis_angle(&Vec3::y_axis(), yaw) * Mat4::from_axis_angle(&Vec3::x_axis(), pitch)
    }

    fn perspective_vulkan(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
        let mut projection = nalgebra::Perspective3::new(aspect, fov_y, near, far).to_homogeneous();
        // Vulkan clip space has +Y pointing down
        projection[(1, 1)] *= -1.0;
        projection
    }

    fn look_at(eye: &Vec3, target: &Vec3, up: &Vec3) -> Mat4 {
        Mat4::look_at_rh(&Point3::from(*eye), &Point3::from(*target), up)
    }

    fn translation_part(&self) -> Vec3 {
        Vec3::new(self[(0, 3)], self[(1, 3)], self[(2, 3)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const EPSILON: f32 = 1e-6;

    #[test]
    fn test_rotation_about_zero_axis_is_identity() {
        let m = Mat4::rotation_about(1.0, &Vec3::zeros());
        assert_relative_eq!(m, Mat4::identity(), epsilon = EPSILON);
    }

    #[test]
    fn test_rotation_about_normalizes_axis() {
        let a = Mat4::rotation_about(0.5, &Vec3::new(0.0, 10.0, 0.0));
        let b = Mat4::rotation_about(0.5, &Vec3::y());
        assert_relative_eq!(a, b, epsilon = EPSILON);
    }

    #[test]
    fn test_euler_yx_forward() {
        let forward = Vec4::new(0.0, 0.0, 1.0, 0.0);

        let straight = Mat4::euler_yx(0.0, 0.0) * forward;
        assert_relative_eq!(straight, forward, epsilon = EPSILON);

        let turned = Mat4::euler_yx(constants::PI * 0.5, 0.0) * forward;
        assert_relative_eq!(turned, Vec4::new(1.0, 0.0, 0.0, 0.0), epsilon = EPSILON);
    }

    #[test]
    fn test_perspective_flips_y() {
        let p = Mat4::perspective_vulkan(utils::deg_to_rad(90.0), 1.0, 0.1, 1000.0);
        assert_relative_eq!(p[(1, 1)], -1.0, epsilon = 1e-5);
        assert_relative_eq!(p[(0, 0)], 1.0, epsilon = 1e-5);
        assert_relative_eq!(p[(3, 2)], -1.0, epsilon = EPSILON);
    }

    #[test]
    fn test_translation_part() {
        let m = Mat4::new_translation(&Vec3::new(1.0, 2.0, 3.0)) * Mat4::rotation_about(0.3, &Vec3::z());
        assert_relative_eq!(m.translation_part(), Vec3::new(1.0, 2.0, 3.0), epsilon = EPSILON);
    }

    #[test]
    fn test_to_cols_array_is_column_major() {
        let m = Mat4::new_translation(&Vec3::new(4.0, 5.0, 6.0));
        let cols = utils::to_cols_array(&m);
        assert_eq!(cols[3], [4.0, 5.0, 6.0, 1.0]);
    }
}
