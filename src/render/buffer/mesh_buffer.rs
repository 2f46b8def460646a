//! Per-mesh vertex and index buffers
//!
//! Each vertex stream lives in its own buffer bound at a fixed slot:
//! 0 position (vec4), 1 bone ids (vec4<i32>), 2 bone weights (vec4<f32>),
//! 3 normal (vec3).

use std::mem::size_of;

use wgpu::util::{BufferInitDescriptor, DeviceExt};
use wgpu::{vertex_attr_array, BufferAddress, VertexAttribute, VertexBufferLayout, VertexStepMode};

use crate::animation::SkinnedVertexData;
use crate::core::error::Error;

const POSITION_ATTRIBS: [VertexAttribute; 1] = vertex_attr_array![0 => Float32x4];
const IDS_ATTRIBS: [VertexAttribute; 1] = vertex_attr_array![1 => Sint32x4];
const WEIGHTS_ATTRIBS: [VertexAttribute; 1] = vertex_attr_array![2 => Float32x4];
const NORMAL_ATTRIBS: [VertexAttribute; 1] = vertex_attr_array![3 => Float32x3];

fn stream<'a, T>(attributes: &'a [VertexAttribute]) -> VertexBufferLayout<'a> {
    VertexBufferLayout {
        array_stride: size_of::<T>() as BufferAddress,
        step_mode: VertexStepMode::Vertex,
        attributes,
    }
}

/// Vertex buffer layouts for slots 0..=3
pub fn vertex_layouts() -> [VertexBufferLayout<'static>; 4] {
    [
        stream::<[f32; 4]>(&POSITION_ATTRIBS),
        stream::<[i32; 4]>(&IDS_ATTRIBS),
        stream::<[f32; 4]>(&WEIGHTS_ATTRIBS),
        stream::<[f32; 3]>(&NORMAL_ATTRIBS),
    ]
}

/// Check that every vertex stream has one entry per vertex
pub fn validate(data: &SkinnedVertexData) -> Result<(), Error> {
    let n = data.vertex_count();
    if n == 0 || data.index_count() == 0 {
        return Err(Error::Gpu("mesh has no geometry".to_string()));
    }
    if data.ids.len() != n || data.weights.len() != n || data.normals.len() != n {
        return Err(Error::Gpu(format!(
            "vertex streams disagree: {} positions, {} ids, {} weights, {} normals",
            n,
            data.ids.len(),
            data.weights.len(),
            data.normals.len()
        )));
    }
    Ok(())
}

/// GPU copy of one mesh's vertex streams
pub struct MeshBuffer {
    positions: wgpu::Buffer,
    ids: wgpu::Buffer,
    weights: wgpu::Buffer,
    normals: wgpu::Buffer,
    indices: wgpu::Buffer,
    index_count: u32,
}

impl MeshBuffer {
    pub fn new(device: &wgpu::Device, data: &SkinnedVertexData) -> Result<Self, Error> {
        validate(data)?;

        let vertex_buffer = |label: &str, contents: &[u8]| {
            device.create_buffer_init(&BufferInitDescriptor {
                label: Some(label),
                contents,
                usage: wgpu::BufferUsages::VERTEX,
            })
        };

        Ok(Self {
            positions: vertex_buffer("mesh_positions", bytemuck::cast_slice(&data.positions)),
            ids: vertex_buffer("mesh_bone_ids", bytemuck::cast_slice(&data.ids)),
            weights: vertex_buffer("mesh_bone_weights", bytemuck::cast_slice(&data.weights)),
            normals: vertex_buffer("mesh_normals", bytemuck::cast_slice(&data.normals)),
            indices: device.create_buffer_init(&BufferInitDescriptor {
                label: Some("mesh_indices"),
                contents: bytemuck::cast_slice(&data.indices),
                usage: wgpu::BufferUsages::INDEX,
            }),
            index_count: data.index_count() as u32,
        })
    }

    /// Bind all streams and issue the indexed draw
    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        pass.set_vertex_buffer(0, self.positions.slice(..));
        pass.set_vertex_buffer(1, self.ids.slice(..));
        pass.set_vertex_buffer(2, self.weights.slice(..));
        pass.set_vertex_buffer(3, self.normals.slice(..));
        pass.set_index_buffer(self.indices.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..self.index_count, 0, 0..1);
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }
}
