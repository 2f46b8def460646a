//! Error types for skinrig

use thiserror::Error;

/// Main error type for the crate
#[derive(Debug, Error)]
pub enum Error {
    #[error("Failed to load asset {path}: {reason}")]
    AssetLoad { path: String, reason: String },

    #[error("Frame {frame} out of range for track '{track}' ({key_count} keys)")]
    FrameOutOfRange {
        track: String,
        frame: u32,
        key_count: usize,
    },

    #[error("Bone '{0}' has no matching node in the scene graph")]
    UnresolvedBoneName(String),

    #[error("Bone '{0}' matches more than one scene node")]
    AmbiguousBoneName(String),

    #[error("Bone '{0}' registered twice")]
    DuplicateBone(String),

    #[error("More than one animation track targets node '{0}'")]
    DuplicateTrack(String),

    #[error("Track '{track}' has {positions} position, {rotations} rotation and {scales} scale keys")]
    MismatchedKeyCounts {
        track: String,
        positions: usize,
        rotations: usize,
        scales: usize,
    },

    #[error("Mesh uses {count} bones, the skinning shader supports at most {max}")]
    TooManyBones { count: usize, max: usize },

    #[error("Bone '{bone}' weights vertex {vertex}, mesh has {vertex_count} vertices")]
    VertexOutOfRange {
        bone: String,
        vertex: u32,
        vertex_count: usize,
    },

    #[error("Bones not written by the last evaluation pass: {0:?}")]
    StaleBones(Vec<u32>),

    #[error("Pose has {pose} bone slot(s), mesh has {bones} bone(s)")]
    PoseSize { pose: usize, bones: usize },

    #[error("Expected chunk '{expected}', found '{found}'")]
    ChunkTag { expected: String, found: String },

    #[error("Chunk '{tag}' is {len} bytes, not a multiple of the {record_size}-byte record")]
    ChunkLength {
        tag: String,
        len: usize,
        record_size: usize,
    },

    #[error("Config error: {0}")]
    Config(String),

    #[error("GPU error: {0}")]
    Gpu(String),

    #[error("Window error: {0}")]
    Window(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
