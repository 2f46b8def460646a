//! Static camera for the skinning viewer

use crate::core::types::{Mat4, Vec3};

/// Fixed look-at camera; the projection-view matrix is uploaded once as `MVP`
#[derive(Clone, Debug)]
pub struct Camera {
    pub eye: Vec3,
    pub focus: Vec3,
    pub up: Vec3,
    /// Vertical field of view in radians
    pub fov_y: f32,
    /// Aspect ratio (width / height)
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Camera {
    /// Create camera looking from `eye` at `focus`
    pub fn look_at(eye: Vec3, focus: Vec3, up: Vec3) -> Self {
        Self {
            eye,
            focus,
            up,
            fov_y: 45.0_f32.to_radians(),
            aspect: 16.0 / 9.0,
            near: 0.1,
            far: 100.0,
        }
    }

    /// Get view matrix (world to camera space)
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.focus, self.up)
    }

    /// Get projection matrix (camera to clip space)
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, self.aspect, self.near, self.far)
    }

    /// Get combined view-projection matrix
    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Update aspect ratio (call on window resize)
    pub fn set_aspect(&mut self, width: f32, height: f32) {
        if height > 0.0 {
            self.aspect = width / height;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_focus_projects_to_center() {
        let camera = Camera::look_at(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y);
        let clip = camera.view_projection() * glam::Vec4::new(0.0, 0.0, 0.0, 1.0);
        let ndc = clip.truncate() / clip.w;
        assert!(ndc.x.abs() < 1e-5);
        assert!(ndc.y.abs() < 1e-5);
        assert!(ndc.z > 0.0 && ndc.z < 1.0);
    }

    #[test]
    fn test_set_aspect_ignores_zero_height() {
        let mut camera = Camera::look_at(Vec3::Z, Vec3::ZERO, Vec3::Y);
        camera.set_aspect(1280.0, 720.0);
        assert!((camera.aspect - 1280.0 / 720.0).abs() < 1e-6);
        camera.set_aspect(100.0, 0.0);
        assert!((camera.aspect - 1280.0 / 720.0).abs() < 1e-6);
    }
}
