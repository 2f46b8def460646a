//! Rendering system and GPU interfaces

pub mod context;
pub mod buffer;
pub mod pipeline;
pub mod texture;
pub mod sink;

pub use context::GpuContext;
pub use sink::{load_scene_meshes, play_headless, GpuSkinningSink, MeshHandle, PaletteSink, RecordingSink};
