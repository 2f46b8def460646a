//! Skinned mesh state
//!
//! Owns one mesh's vertex data, bone registry, rig bindings and pose. The
//! scene graph and the track store are shared by all meshes of a scene.

use std::sync::Arc;

use glam::{Mat4, Vec3, Vec4};

use crate::core::error::Error;
use crate::core::types::Result;
use crate::import::{ImportedMesh, ImportedScene};
use crate::scene::SceneGraph;

use super::bone::{BoneIds, BoneRegistry, BoneWeights};
use super::pose::Pose;
use super::skeleton::Rig;
use super::track::{DuplicateTrackPolicy, TrackStore};

/// Vertex streams in the layout the skinning shader consumes
#[derive(Clone, Debug, Default)]
pub struct SkinnedVertexData {
    /// Positions with w = 1
    pub positions: Vec<[f32; 4]>,
    pub ids: Vec<BoneIds>,
    pub weights: Vec<BoneWeights>,
    pub normals: Vec<[f32; 3]>,
    pub indices: Vec<u32>,
}

impl SkinnedVertexData {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }
}

/// A mesh whose bone palette is recomputed every tick
pub struct AnimatedMesh {
    pub name: String,
    graph: Arc<SceneGraph>,
    tracks: Arc<TrackStore>,
    bones: BoneRegistry,
    rig: Rig,
    pose: Pose,
    positions: Vec<Vec3>,
    normals: Vec<Vec3>,
    indices: Vec<u32>,
}

impl AnimatedMesh {
    /// Register the mesh's bones and bind them to the scene
    pub fn from_imported(mesh: &ImportedMesh, graph: Arc<SceneGraph>, tracks: Arc<TrackStore>) -> Result<Self> {
        let vertex_count = mesh.positions.len();

        let mut bones = BoneRegistry::new(vertex_count);
        for bone in &mesh.bones {
            bones.register(&bone.name, bone.offset, &bone.weights)?;
        }
        if bones.dropped_influences() > 0 {
            log::warn!(
                "Mesh '{}': dropped {} bone influence(s) beyond four per vertex",
                mesh.name,
                bones.dropped_influences()
            );
        }

        let indices = triangulate(&mesh.name, &mesh.faces, vertex_count)?;

        let normals = if mesh.normals.len() == vertex_count {
            mesh.normals.clone()
        } else {
            log::warn!(
                "Mesh '{}' has {} normals for {} vertices, using zero normals",
                mesh.name,
                mesh.normals.len(),
                vertex_count
            );
            vec![Vec3::ZERO; vertex_count]
        };

        let rig = Rig::bind(&graph, &bones, &tracks)?;
        let pose = Pose::new(bones.len());

        log::info!(
            "Mesh '{}': {} vertices, {} triangles, {} bones",
            mesh.name,
            vertex_count,
            indices.len() / 3,
            bones.len()
        );

        Ok(Self {
            name: mesh.name.clone(),
            graph,
            tracks,
            bones,
            rig,
            pose,
            positions: mesh.positions.clone(),
            normals,
            indices,
        })
    }

    /// Evaluate the skeleton at `frame` and refresh the palette
    pub fn update_bones(&mut self, frame: u32) -> Result<()> {
        self.rig
            .evaluate(&self.graph, &self.tracks, &self.bones, frame, &mut self.pose)
    }

    /// Current skinning matrices, one per bone
    pub fn palette(&self) -> &[Mat4] {
        &self.pose.bone_transforms
    }

    /// Current world-space bone origins
    pub fn bone_positions(&self) -> &[Vec4] {
        &self.pose.bone_positions
    }

    pub fn bones(&self) -> &BoneRegistry {
        &self.bones
    }

    pub fn rig(&self) -> &Rig {
        &self.rig
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Vertex streams for upload
    pub fn vertex_data(&self) -> SkinnedVertexData {
        SkinnedVertexData {
            positions: self.positions.iter().map(|p| p.extend(1.0).to_array()).collect(),
            ids: self.bones.ids().to_vec(),
            weights: self.bones.weights().to_vec(),
            normals: self.normals.iter().map(|n| n.to_array()).collect(),
            indices: self.indices.clone(),
        }
    }
}

/// Every skinned mesh of a scene animated by one clip
pub struct SkinnedScene {
    pub graph: Arc<SceneGraph>,
    pub tracks: Arc<TrackStore>,
    pub meshes: Vec<AnimatedMesh>,
}

impl SkinnedScene {
    /// Build the runtime state for clip `clip` of an imported scene.
    ///
    /// A scene without animations gets an empty track store and stays in
    /// its rest pose.
    pub fn build(scene: &ImportedScene, clip: usize, policy: DuplicateTrackPolicy) -> Result<Self> {
        let graph = Arc::new(SceneGraph::from_imported(&scene.root));

        let tracks = match scene.animations.get(clip) {
            Some(animation) => TrackStore::from_clip(animation, policy)?,
            None if scene.animations.is_empty() => {
                log::warn!("Scene has no animations, showing the rest pose");
                TrackStore::new(policy)
            }
            None => {
                return Err(Error::Config(format!(
                    "clip {} requested, scene has {} clip(s)",
                    clip,
                    scene.animations.len()
                )));
            }
        };
        let tracks = Arc::new(tracks);

        let mut meshes = Vec::with_capacity(scene.meshes.len());
        for imported in &scene.meshes {
            if imported.faces.is_empty() {
                log::warn!("Mesh '{}' has no faces, skipping", imported.name);
                continue;
            }
            meshes.push(AnimatedMesh::from_imported(imported, graph.clone(), tracks.clone())?);
        }

        Ok(Self {
            graph,
            tracks,
            meshes,
        })
    }

    /// Frames the clip can serve; at least 1 so a static scene still ticks
    pub fn frame_count(&self) -> u32 {
        self.tracks.frame_count().max(1)
    }

    /// Evaluate every mesh at `frame`
    pub fn update(&mut self, frame: u32) -> Result<()> {
        for mesh in &mut self.meshes {
            mesh.update_bones(frame)?;
        }
        Ok(())
    }
}

/// Flatten polygon faces into a triangle list, fanning anything larger
fn triangulate(mesh: &str, faces: &[Vec<u32>], vertex_count: usize) -> Result<Vec<u32>> {
    let mut indices = Vec::with_capacity(faces.len() * 3);
    let mut skipped = 0usize;

    for face in faces {
        if let Some(bad) = face.iter().find(|i| **i as usize >= vertex_count) {
            return Err(Error::AssetLoad {
                path: mesh.to_string(),
                reason: format!("face index {} out of range ({} vertices)", bad, vertex_count),
            });
        }
        if face.len() < 3 {
            skipped += 1;
            continue;
        }
        for i in 1..face.len() - 1 {
            indices.extend_from_slice(&[face[0], face[i], face[i + 1]]);
        }
    }

    if skipped > 0 {
        log::debug!("Mesh '{}': skipped {} point/line face(s)", mesh, skipped);
    }
    Ok(indices)
}
