//! Bones and per-vertex bone attributes
//!
//! Each mesh keeps its own bone list. A bone's index is the order in which the
//! mesh's bone list was walked, never its depth in the node hierarchy, so the
//! same index addresses the palette and the per-vertex id slots.

use std::collections::HashMap;

use glam::Mat4;

use crate::core::error::Error;
use crate::core::types::Result;
use crate::import::VertexWeight;

/// Maximum number of bones per mesh (size of the shader's palette uniform)
pub const MAX_BONES: usize = 64;

/// Bone influences stored per vertex
pub const MAX_INFLUENCES: usize = 4;

/// Id slot value meaning "no bone"
pub const NO_BONE: i32 = -1;

/// Index of a bone inside its mesh's registry
pub type BoneIndex = u32;

/// Bone ids of one vertex, `NO_BONE` when a slot is free
pub type BoneIds = [i32; MAX_INFLUENCES];

/// Bone weights of one vertex, aligned slot-for-slot with `BoneIds`
pub type BoneWeights = [f32; MAX_INFLUENCES];

/// Put `(bone, weight)` into the first free slot of a vertex.
///
/// Id and weight are written together so both arrays always describe the same
/// pair. Returns `false` when all slots are taken and the influence is dropped.
pub fn insert_influence(ids: &mut BoneIds, weights: &mut BoneWeights, bone: BoneIndex, weight: f32) -> bool {
    match ids.iter().position(|id| *id == NO_BONE) {
        Some(slot) => {
            ids[slot] = bone as i32;
            weights[slot] = weight;
            true
        }
        None => false,
    }
}

/// A bone of a skinned mesh
#[derive(Clone, Debug)]
pub struct Bone {
    pub name: String,
    pub index: BoneIndex,
    /// Mesh space to bone space (inverse bind pose)
    pub offset: Mat4,
}

/// Discovery-ordered bones of one mesh plus its per-vertex bone attributes
#[derive(Clone, Debug)]
pub struct BoneRegistry {
    bones: Vec<Bone>,
    by_name: HashMap<String, BoneIndex>,
    ids: Vec<BoneIds>,
    weights: Vec<BoneWeights>,
    dropped_influences: usize,
}

impl BoneRegistry {
    /// Create an empty registry for a mesh with `vertex_count` vertices
    pub fn new(vertex_count: usize) -> Self {
        Self {
            bones: Vec::new(),
            by_name: HashMap::new(),
            ids: vec![[NO_BONE; MAX_INFLUENCES]; vertex_count],
            weights: vec![[0.0; MAX_INFLUENCES]; vertex_count],
            dropped_influences: 0,
        }
    }

    /// Register the next bone and scatter its weights into the vertex slots
    pub fn register(&mut self, name: &str, offset: Mat4, weights: &[VertexWeight]) -> Result<BoneIndex> {
        if self.by_name.contains_key(name) {
            return Err(Error::DuplicateBone(name.to_string()));
        }
        if self.bones.len() >= MAX_BONES {
            return Err(Error::TooManyBones {
                count: self.bones.len() + 1,
                max: MAX_BONES,
            });
        }

        // Validate everything before touching the slots
        let vertex_count = self.ids.len();
        if let Some(bad) = weights.iter().find(|w| w.vertex as usize >= vertex_count) {
            return Err(Error::VertexOutOfRange {
                bone: name.to_string(),
                vertex: bad.vertex,
                vertex_count,
            });
        }

        let index = self.bones.len() as BoneIndex;
        for w in weights {
            let vertex = w.vertex as usize;
            if !insert_influence(&mut self.ids[vertex], &mut self.weights[vertex], index, w.weight) {
                self.dropped_influences += 1;
                log::debug!(
                    "Vertex {} already has {} influences, dropping bone '{}' ({})",
                    w.vertex,
                    MAX_INFLUENCES,
                    name,
                    w.weight
                );
            }
        }

        self.by_name.insert(name.to_string(), index);
        self.bones.push(Bone {
            name: name.to_string(),
            index,
            offset,
        });

        Ok(index)
    }

    pub fn lookup(&self, name: &str) -> Option<BoneIndex> {
        self.by_name.get(name).copied()
    }

    pub fn bone(&self, index: BoneIndex) -> Option<&Bone> {
        self.bones.get(index as usize)
    }

    /// Number of registered bones
    pub fn len(&self) -> usize {
        self.bones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    /// Bones in discovery order
    pub fn bones(&self) -> &[Bone] {
        &self.bones
    }

    /// Per-vertex bone ids
    pub fn ids(&self) -> &[BoneIds] {
        &self.ids
    }

    /// Per-vertex bone weights
    pub fn weights(&self) -> &[BoneWeights] {
        &self.weights
    }

    pub fn vertex_count(&self) -> usize {
        self.ids.len()
    }

    /// Influences dropped because a vertex already had four
    pub fn dropped_influences(&self) -> usize {
        self.dropped_influences
    }
}
