//! GPU uniform buffer for the static camera

use bytemuck::{Pod, Zeroable};
use glam::Mat4;

use crate::core::camera::Camera;

/// `MVP` uniform (must match the shader's `Camera` struct)
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct CameraUniform {
    pub mvp: [[f32; 4]; 4],
}

impl CameraUniform {
    /// Projection * view, with the model at the world origin
    pub fn from_camera(camera: &Camera) -> Self {
        Self::from_matrix(camera.view_projection())
    }

    pub fn from_matrix(mvp: Mat4) -> Self {
        Self {
            mvp: mvp.to_cols_array_2d(),
        }
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::from_matrix(Mat4::IDENTITY)
    }
}

/// GPU buffer for camera uniform
pub struct CameraBuffer {
    /// Uniform buffer
    buffer: wgpu::Buffer,
    /// Bind group layout
    bind_group_layout: wgpu::BindGroupLayout,
    /// Bind group
    bind_group: wgpu::BindGroup,
}

impl CameraBuffer {
    /// Create new camera buffer
    pub fn new(device: &wgpu::Device) -> Self {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("camera_uniform"),
            size: std::mem::size_of::<CameraUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("camera_bind_group_layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("camera_bind_group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });

        Self {
            buffer,
            bind_group_layout,
            bind_group,
        }
    }

    /// Write the `MVP` matrix
    pub fn update(&self, queue: &wgpu::Queue, mvp: Mat4) {
        let uniform = CameraUniform::from_matrix(mvp);
        queue.write_buffer(&self.buffer, 0, bytemuck::bytes_of(&uniform));
    }

    /// Get bind group layout
    pub fn bind_group_layout(&self) -> &wgpu::BindGroupLayout {
        &self.bind_group_layout
    }

    /// Get bind group
    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn test_uniform_size() {
        // One mat4x4<f32>
        assert_eq!(std::mem::size_of::<CameraUniform>(), 64);
    }

    #[test]
    fn test_from_camera() {
        let camera = Camera::look_at(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y);
        let uniform = CameraUniform::from_camera(&camera);
        assert_eq!(Mat4::from_cols_array_2d(&uniform.mvp), camera.view_projection());
    }
}
