//! Free-flying perspective camera

use crate::config::CameraConfig;
use crate::foundation::math::{utils, Mat4, Mat4Ext, Vec3, Vec4};

/// Position plus yaw/pitch orientation and a perspective projection
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    position: Vec3,
    yaw: f32,
    pitch: f32,
    fov_degrees: f32,
    near: f32,
    far: f32,
}

impl Camera {
    /// Camera at `position` looking down +Z with a 90 degree field of view
    pub fn new(position: Vec3) -> Self {
        Self {
            position,
            yaw: 0.0,
            pitch: 0.0,
            fov_degrees: 90.0,
            near: 0.1,
            far: 1000.0,
        }
    }

    /// Camera described by configuration
    pub fn from_config(config: &CameraConfig) -> Self {
        Self {
            position: Vec3::from(config.position),
            yaw: config.yaw,
            pitch: config.pitch,
            fov_degrees: config.fov_degrees,
            near: config.near,
            far: config.far,
        }
    }

    /// Eye position
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Move the eye
    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    /// Rotation around +Y in radians
    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    /// Set the rotation around +Y
    pub fn set_yaw(&mut self, yaw: f32) {
        self.yaw = yaw;
    }

    /// Rotation around +X in radians
    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    /// Set the rotation around +X
    pub fn set_pitch(&mut self, pitch: f32) {
        self.pitch = pitch;
    }

    /// Unit view direction: +Z rotated by pitch, then yaw
    pub fn direction(&self) -> Vec3 {
        (Mat4::euler_yx(self.yaw, self.pitch) * Vec4::new(0.0, 0.0, 1.0, 0.0)).xyz()
    }

    /// Horizontal right vector
    pub fn right(&self) -> Vec3 {
        self.direction().cross(&Vec3::y())
    }

    /// Move along the view direction
    pub fn move_forward(&mut self, distance: f32) {
        self.position += self.direction() * distance;
    }

    /// Move sideways, positive to the right
    pub fn strafe(&mut self, distance: f32) {
        self.position += self.right() * distance;
    }

    /// Right-handed look-at along [`direction`](Self::direction)
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at(&self.position, &(self.position + self.direction()), &Vec3::y())
    }

    /// Projection for a surface with the given width / height ratio
    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_vulkan(utils::deg_to_rad(self.fov_degrees), aspect, self.near, self.far)
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::from_config(&CameraConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::constants::PI;
    use approx::assert_relative_eq;

    #[test]
    fn test_default_looks_down_positive_z() {
        let camera = Camera::default();
        assert_relative_eq!(camera.position(), Vec3::new(0.0, 10.0, -200.0));
        assert_relative_eq!(camera.direction(), Vec3::new(0.0, 0.0, 1.0), epsilon = 1e-6);
    }

    #[test]
    fn test_yaw_turns_direction() {
        let mut camera = Camera::new(Vec3::zeros());
        camera.set_yaw(PI * 0.5);
        assert_relative_eq!(camera.direction(), Vec3::new(1.0, 0.0, 0.0), epsilon = 1e-6);
    }

    #[test]
    fn test_movement_helpers() {
        let mut camera = Camera::new(Vec3::zeros());
        camera.move_forward(2.0);
        assert_relative_eq!(camera.position(), Vec3::new(0.0, 0.0, 2.0), epsilon = 1e-6);

        camera.strafe(1.0);
        // +Z cross +Y points to -X
        assert_relative_eq!(camera.position(), Vec3::new(-1.0, 0.0, 2.0), epsilon = 1e-6);
    }

    #[test]
    fn test_view_maps_target_onto_negative_z() {
        let camera = Camera::new(Vec3::new(0.0, 10.0, -200.0));
        let target = camera.position() + camera.direction() * 5.0;
        let in_view = camera.view_matrix() * Vec4::new(target.x, target.y, target.z, 1.0);
        assert_relative_eq!(in_view.xyz(), Vec3::new(0.0, 0.0, -5.0), epsilon = 1e-4);
    }

    #[test]
    fn test_projection_flips_y() {
        let camera = Camera::new(Vec3::zeros());
        let projection = camera.projection_matrix(1.5);
        assert!(projection[(1, 1)] < 0.0);
        assert_relative_eq!(projection[(0, 0)], -projection[(1, 1)] / 1.5, epsilon = 1e-6);
    }
}
