//! GPU buffer management

pub mod camera_buffer;
pub mod bone_buffer;
pub mod mesh_buffer;

pub use camera_buffer::{CameraBuffer, CameraUniform};
pub use bone_buffer::{pack_palette, BoneTransformBuffer, GpuBoneTransform};
pub use mesh_buffer::MeshBuffer;
