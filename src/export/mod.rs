//! Offline rig export
//!
//! A rig is written as a directory of small files, each holding one or more
//! tagged chunks of fixed-size records. Node records are emitted breadth
//! first so a node's parent index is always lower than its own.

pub mod chunk;
pub mod records;
pub mod exporter;
pub mod loader;

pub use chunk::{read_chunk, write_chunk, Tag};
pub use exporter::{export_scene, ExportSummary};
pub use loader::{ExportedMesh, ExportedRig};
pub use records::{BoneRecord, KeyRecord, NodeRecord, TrackRecord};

/// File names inside an export directory
pub mod files {
    pub const NODES: &str = "nodes.dat";
    pub const ANIMATIONS: &str = "animations.dat";
    pub const MESH_COUNT: &str = "num.dat";

    pub fn mesh_file(mesh: usize, kind: &str) -> String {
        format!("mesh{}{}.dat", mesh, kind)
    }
}

/// Chunk tags
pub mod tags {
    use super::Tag;

    pub const NODE: Tag = *b"node";
    pub const NAME: Tag = *b"name";
    pub const TRACK: Tag = *b"trak";
    pub const KEYS: Tag = *b"keys";
    pub const CLIPS: Tag = *b"clip";
    pub const MESH_COUNT: Tag = *b"nums";
    pub const VERTICES: Tag = *b"vert";
    pub const NORMALS: Tag = *b"norm";
    pub const INDICES: Tag = *b"indi";
    pub const WEIGHTS: Tag = *b"weig";
    pub const IDS: Tag = *b"idss";
    pub const BONES: Tag = *b"bone";
}
