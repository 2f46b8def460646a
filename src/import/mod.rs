//! Import boundary
//!
//! Plain owned data produced by an asset importer and consumed once at load
//! time. Nothing here keeps references into the importer's own structures.

pub mod gltf;

use std::path::Path;

use glam::{Mat4, Quat, Vec3};

use crate::core::types::Result;
use crate::export::ExportedRig;

/// Load a glTF / GLB file, or an export directory written by `export_rig`
pub fn load_asset(path: &Path) -> Result<ImportedScene> {
    if path.is_dir() {
        ExportedRig::load(path)?.to_imported()
    } else {
        gltf::load(path)
    }
}

/// One node of the imported hierarchy
#[derive(Clone, Debug, PartialEq)]
pub struct ImportedNode {
    pub name: String,
    /// Local rest transform relative to the parent
    pub transform: Mat4,
    pub children: Vec<ImportedNode>,
}

impl ImportedNode {
    pub fn new(name: impl Into<String>, transform: Mat4) -> Self {
        Self {
            name: name.into(),
            transform,
            children: Vec::new(),
        }
    }

    /// Builder-style child append
    pub fn with_child(mut self, child: ImportedNode) -> Self {
        self.children.push(child);
        self
    }
}

/// A single (vertex, weight) influence of a bone
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VertexWeight {
    pub vertex: u32,
    pub weight: f32,
}

impl VertexWeight {
    pub fn new(vertex: u32, weight: f32) -> Self {
        Self { vertex, weight }
    }
}

/// A bone as listed by an imported mesh
#[derive(Clone, Debug, PartialEq)]
pub struct ImportedBone {
    pub name: String,
    /// Mesh space to bone space
    pub offset: Mat4,
    pub weights: Vec<VertexWeight>,
}

/// Imported triangle mesh with its bone list
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ImportedMesh {
    pub name: String,
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub faces: Vec<Vec<u32>>,
    pub bones: Vec<ImportedBone>,
}

/// Keyframes of one node within a clip; arrays are addressed by frame index
#[derive(Clone, Debug, PartialEq)]
pub struct ImportedChannel {
    pub node_name: String,
    pub positions: Vec<Vec3>,
    pub rotations: Vec<Quat>,
    pub scales: Vec<Vec3>,
}

/// Named animation clip
#[derive(Clone, Debug, PartialEq)]
pub struct ImportedAnimation {
    pub name: String,
    pub channels: Vec<ImportedChannel>,
}

/// Everything the runtime needs from an asset
#[derive(Clone, Debug, PartialEq)]
pub struct ImportedScene {
    pub root: ImportedNode,
    pub meshes: Vec<ImportedMesh>,
    pub animations: Vec<ImportedAnimation>,
}
