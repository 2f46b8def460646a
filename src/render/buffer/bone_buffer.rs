//! GPU-side bone palette buffer

use bytemuck::{Pod, Zeroable};
use glam::Mat4;

use crate::animation::MAX_BONES;
use crate::core::error::Error;

/// GPU-side bone transform (mat4 for skinning matrix)
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct GpuBoneTransform {
    pub matrix: [[f32; 4]; 4],
}

impl GpuBoneTransform {
    /// Create from a glam Mat4
    pub fn from_mat4(matrix: Mat4) -> Self {
        Self {
            matrix: matrix.to_cols_array_2d(),
        }
    }

    /// Create identity transform
    pub fn identity() -> Self {
        Self::from_mat4(Mat4::IDENTITY)
    }
}

/// Pack a palette into the fixed-size `BoneTransforms` uniform.
///
/// Unused trailing entries are identity.
pub fn pack_palette(palette: &[Mat4]) -> Result<[GpuBoneTransform; MAX_BONES], Error> {
    if palette.len() > MAX_BONES {
        return Err(Error::TooManyBones {
            count: palette.len(),
            max: MAX_BONES,
        });
    }

    let mut packed = [GpuBoneTransform::identity(); MAX_BONES];
    for (slot, matrix) in packed.iter_mut().zip(palette) {
        *slot = GpuBoneTransform::from_mat4(*matrix);
    }
    Ok(packed)
}

/// Bone palette uniform buffer of one mesh
pub struct BoneTransformBuffer {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

impl BoneTransformBuffer {
    /// Layout shared by every mesh's palette bind group
    pub fn create_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("bone_transforms_bind_group_layout"),
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
        })
    }

    /// Create a palette buffer initialised to identity
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue, layout: &wgpu::BindGroupLayout) -> Self {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("bone_transforms"),
            size: (MAX_BONES * std::mem::size_of::<GpuBoneTransform>()) as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("bone_transforms_bind_group"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });

        let identity = [GpuBoneTransform::identity(); MAX_BONES];
        queue.write_buffer(&buffer, 0, bytemuck::cast_slice(&identity));

        Self { buffer, bind_group }
    }

    /// Upload a new palette
    pub fn update(&self, queue: &wgpu::Queue, palette: &[Mat4]) -> Result<(), Error> {
        let packed = pack_palette(palette)?;
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&packed));
        Ok(())
    }

    /// Get the bind group for use in rendering
    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }
}
