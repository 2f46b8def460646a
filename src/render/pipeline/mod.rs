//! Render pipelines

pub mod skinning;

pub use skinning::SkinningPipeline;
