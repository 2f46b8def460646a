//! Read an export directory back

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use glam::{Mat4, Vec3};

use crate::animation::{Keyframe, NO_BONE};
use crate::core::error::Error;
use crate::core::types::Result;
use crate::import::{
    ImportedAnimation, ImportedBone, ImportedChannel, ImportedMesh, ImportedNode, ImportedScene,
    VertexWeight,
};

use super::chunk::{decode_names, read_chunk};
use super::records::{BoneRecord, KeyRecord, NodeRecord, TrackRecord};
use super::{files, tags};

/// Vertex streams and bones of one exported mesh
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExportedMesh {
    pub positions: Vec<[f32; 4]>,
    pub normals: Vec<[f32; 3]>,
    pub indices: Vec<u32>,
    pub weights: Vec<[f32; 4]>,
    pub ids: Vec<[i32; 4]>,
    pub bones: Vec<BoneRecord>,
}

/// Everything in an export directory
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExportedRig {
    pub nodes: Vec<NodeRecord>,
    pub names: Vec<String>,
    pub tracks: Vec<TrackRecord>,
    pub keys: Vec<KeyRecord>,
    pub clip_names: Vec<String>,
    pub meshes: Vec<ExportedMesh>,
}

fn open(path: &Path) -> Result<BufReader<File>> {
    File::open(path).map(BufReader::new).map_err(|e| Error::AssetLoad {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}

fn invalid(dir: &Path, reason: String) -> Error {
    Error::AssetLoad {
        path: dir.display().to_string(),
        reason,
    }
}

impl ExportedRig {
    /// Load and validate an export directory
    pub fn load(dir: &Path) -> Result<Self> {
        let mut reader = open(&dir.join(files::NODES))?;
        let nodes: Vec<NodeRecord> = read_chunk(&mut reader, &tags::NODE)?;
        let names = decode_names(&read_chunk::<_, u8>(&mut reader, &tags::NAME)?);

        let mut reader = open(&dir.join(files::ANIMATIONS))?;
        let tracks: Vec<TrackRecord> = read_chunk(&mut reader, &tags::TRACK)?;
        let keys: Vec<KeyRecord> = read_chunk(&mut reader, &tags::KEYS)?;
        let clip_names = decode_names(&read_chunk::<_, u8>(&mut reader, &tags::CLIPS)?);

        let counts: Vec<u32> = read_chunk(&mut open(&dir.join(files::MESH_COUNT))?, &tags::MESH_COUNT)?;
        let mesh_count = counts.first().copied().unwrap_or(0) as usize;

        let mut meshes = Vec::with_capacity(mesh_count);
        for i in 0..mesh_count {
            let file = |kind: &str| open(&dir.join(files::mesh_file(i, kind)));
            meshes.push(ExportedMesh {
                positions: read_chunk(&mut file("vertices")?, &tags::VERTICES)?,
                normals: read_chunk(&mut file("normals")?, &tags::NORMALS)?,
                indices: read_chunk(&mut file("indices")?, &tags::INDICES)?,
                weights: read_chunk(&mut file("weights")?, &tags::WEIGHTS)?,
                ids: read_chunk(&mut file("ids")?, &tags::IDS)?,
                bones: read_chunk(&mut file("bones")?, &tags::BONES)?,
            });
        }

        let rig = Self {
            nodes,
            names,
            tracks,
            keys,
            clip_names,
            meshes,
        };
        rig.validate().map_err(|reason| invalid(dir, reason))?;

        log::info!(
            "Loaded export {}: {} nodes, {} clips, {} tracks, {} meshes",
            dir.display(),
            rig.nodes.len(),
            rig.clip_names.len(),
            rig.tracks.len(),
            rig.meshes.len()
        );
        Ok(rig)
    }

    fn validate(&self) -> std::result::Result<(), String> {
        if self.names.len() != self.nodes.len() {
            return Err(format!(
                "{} names for {} nodes",
                self.names.len(),
                self.nodes.len()
            ));
        }
        for (i, node) in self.nodes.iter().enumerate() {
            let parent_ok = match node.parent_index() {
                Some(parent) => parent < i,
                None => i == 0,
            };
            if !parent_ok {
                return Err(format!("node {} has parent {}", i, node.parent));
            }
            if node.track_index().is_some_and(|t| t >= self.tracks.len()) {
                return Err(format!("node {} references missing track {}", i, node.track));
            }
        }
        for track in &self.tracks {
            if track.key_range().end > self.keys.len()
                || track.node < 0
                || track.node as usize >= self.nodes.len()
                || track.clip as usize >= self.clip_names.len()
            {
                return Err(format!("track {:?} out of range", track));
            }
        }
        for (i, mesh) in self.meshes.iter().enumerate() {
            let n = mesh.positions.len();
            if mesh.normals.len() != n || mesh.weights.len() != n || mesh.ids.len() != n {
                return Err(format!("mesh {} has mismatched vertex streams", i));
            }
            if mesh.bones.iter().any(|b| b.node < 0 || b.node as usize >= self.nodes.len()) {
                return Err(format!("mesh {} has a bone without a node", i));
            }
        }
        Ok(())
    }

    /// Rebuild import boundary data so an export feeds the normal runtime path
    pub fn to_imported(&self) -> Result<ImportedScene> {
        self.validate().map_err(|reason| Error::AssetLoad {
            path: "export".to_string(),
            reason,
        })?;
        if self.nodes.is_empty() {
            return Err(Error::AssetLoad {
                path: "export".to_string(),
                reason: "export has no nodes".to_string(),
            });
        }

        // Children always follow their parent, so attach from the back
        let mut slots: Vec<Option<ImportedNode>> = self
            .nodes
            .iter()
            .zip(&self.names)
            .map(|(node, name)| Some(ImportedNode::new(name.clone(), node.transform())))
            .collect();
        for i in (1..slots.len()).rev() {
            let Some(mut node) = slots[i].take() else {
                continue;
            };
            node.children.reverse();
            if let Some(parent) = self.nodes[i].parent_index().and_then(|p| slots[p].as_mut()) {
                parent.children.push(node);
            }
        }
        let mut root = slots[0].take().ok_or_else(|| Error::AssetLoad {
            path: "export".to_string(),
            reason: "root node missing".to_string(),
        })?;
        root.children.reverse();

        let mut animations: Vec<ImportedAnimation> = self
            .clip_names
            .iter()
            .map(|name| ImportedAnimation {
                name: name.clone(),
                channels: Vec::new(),
            })
            .collect();
        for track in &self.tracks {
            let keys: Vec<Keyframe> = self.keys[track.key_range()].iter().map(Keyframe::from).collect();
            animations[track.clip as usize].channels.push(ImportedChannel {
                node_name: self.names[track.node as usize].clone(),
                positions: keys.iter().map(|k| k.translation).collect(),
                rotations: keys.iter().map(|k| k.rotation).collect(),
                scales: keys.iter().map(|k| k.scale).collect(),
            });
        }

        let meshes = self
            .meshes
            .iter()
            .enumerate()
            .map(|(i, mesh)| self.imported_mesh(i, mesh))
            .collect();

        Ok(ImportedScene {
            root,
            meshes,
            animations,
        })
    }

    fn imported_mesh(&self, index: usize, mesh: &ExportedMesh) -> ImportedMesh {
        let mut bones: Vec<ImportedBone> = mesh
            .bones
            .iter()
            .map(|bone| ImportedBone {
                name: self.names[bone.node as usize].clone(),
                offset: Mat4::from_cols_array(&bone.offset),
                weights: Vec::new(),
            })
            .collect();

        for (vertex, (ids, weights)) in mesh.ids.iter().zip(&mesh.weights).enumerate() {
            for (id, weight) in ids.iter().zip(weights) {
                if *id == NO_BONE {
                    continue;
                }
                if let Some(bone) = bones.get_mut(*id as usize) {
                    bone.weights.push(VertexWeight::new(vertex as u32, *weight));
                }
            }
        }

        ImportedMesh {
            name: format!("mesh{}", index),
            positions: mesh
                .positions
                .iter()
                .map(|p| Vec3::new(p[0], p[1], p[2]))
                .collect(),
            normals: mesh.normals.iter().map(|n| Vec3::from_array(*n)).collect(),
            faces: mesh.indices.chunks_exact(3).map(|tri| tri.to_vec()).collect(),
            bones,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::DuplicateTrackPolicy;
    use crate::export::export_scene;
    use crate::scene::SceneGraph;
    use glam::Quat;
    use tempfile::TempDir;

    fn sample_scene() -> ImportedScene {
        let root = ImportedNode::new("root", Mat4::from_rotation_x(0.3))
            .with_child(
                ImportedNode::new("hip", Mat4::from_translation(Vec3::new(0.1, 0.2, 0.3)))
                    .with_child(ImportedNode::new("knee", Mat4::from_scale(Vec3::splat(1.5)))),
            )
            .with_child(ImportedNode::new("spine", Mat4::from_rotation_z(1.1)));

        let mesh = ImportedMesh {
            name: "legs".to_string(),
            positions: vec![Vec3::ZERO, Vec3::X, Vec3::Y],
            normals: vec![Vec3::Z; 3],
            faces: vec![vec![0, 1, 2]],
            bones: vec![
                ImportedBone {
                    name: "knee".to_string(),
                    offset: Mat4::from_translation(Vec3::new(0.0, -1.0, 0.0)),
                    weights: vec![VertexWeight::new(0, 0.5), VertexWeight::new(1, 1.0)],
                },
                ImportedBone {
                    name: "hip".to_string(),
                    offset: Mat4::IDENTITY,
                    weights: vec![VertexWeight::new(0, 0.5)],
                },
            ],
        };

        let clip = ImportedAnimation {
            name: "bend".to_string(),
            channels: vec![ImportedChannel {
                node_name: "knee".to_string(),
                positions: vec![Vec3::ZERO, Vec3::X],
                rotations: vec![Quat::IDENTITY, Quat::from_rotation_x(0.7)],
                scales: vec![Vec3::ONE; 2],
            }],
        };

        ImportedScene {
            root,
            meshes: vec![mesh],
            animations: vec![clip],
        }
    }

    #[test]
    fn test_node_table_round_trip_bit_exact() {
        let temp = TempDir::new().unwrap();
        let scene = sample_scene();
        let summary = export_scene(&scene, &[0], DuplicateTrackPolicy::Reject, temp.path()).unwrap();
        assert_eq!(summary.nodes, 4);
        assert_eq!(summary.tracks, 1);
        assert_eq!(summary.keys, 2);

        let rig = ExportedRig::load(temp.path()).unwrap();
        let graph = SceneGraph::from_imported(&scene.root);
        let order = graph.breadth_first();

        let expected_parents: Vec<i32> = vec![-1, 0, 0, 1];
        let parents: Vec<i32> = rig.nodes.iter().map(|n| n.parent).collect();
        assert_eq!(parents, expected_parents);

        for (record, id) in rig.nodes.iter().zip(&order) {
            let expected = graph.local_transform(*id).to_cols_array();
            let bits: Vec<u32> = record.transform.iter().map(|f| f.to_bits()).collect();
            let expected_bits: Vec<u32> = expected.iter().map(|f| f.to_bits()).collect();
            assert_eq!(bits, expected_bits);
        }
        assert_eq!(rig.names, vec!["root", "hip", "spine", "knee"]);
    }

    #[test]
    fn test_tracks_and_meshes_round_trip() {
        let temp = TempDir::new().unwrap();
        let scene = sample_scene();
        export_scene(&scene, &[0], DuplicateTrackPolicy::default(), temp.path()).unwrap();
        let rig = ExportedRig::load(temp.path()).unwrap();

        let knee = rig.names.iter().position(|n| n == "knee").unwrap();
        assert_eq!(rig.nodes[knee].track_index(), Some(0));
        assert_eq!(rig.tracks[0].node as usize, knee);

        let mesh = &rig.meshes[0];
        assert_eq!(mesh.positions[1], [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(mesh.indices, vec![0, 1, 2]);
        assert_eq!(mesh.ids[0], [0, 1, -1, -1]);
        assert_eq!(mesh.weights[0], [0.5, 0.5, 0.0, 0.0]);
        assert_eq!(mesh.bones[0].node as usize, knee);
    }

    #[test]
    fn test_to_imported_rebuilds_scene() {
        let temp = TempDir::new().unwrap();
        let scene = sample_scene();
        export_scene(&scene, &[0], DuplicateTrackPolicy::default(), temp.path()).unwrap();
        let rebuilt = ExportedRig::load(temp.path()).unwrap().to_imported().unwrap();

        // Same hierarchy, child order included
        assert_eq!(rebuilt.root, scene.root);
        assert_eq!(rebuilt.animations[0].channels, scene.animations[0].channels);

        let mesh = &rebuilt.meshes[0];
        assert_eq!(mesh.positions, scene.meshes[0].positions);
        assert_eq!(mesh.faces, scene.meshes[0].faces);
        assert_eq!(mesh.bones[0].name, "knee");
        assert_eq!(mesh.bones[1].weights, vec![VertexWeight::new(0, 0.5)]);
    }

    #[test]
    fn test_export_without_clip() {
        let temp = TempDir::new().unwrap();
        let summary =
            export_scene(&sample_scene(), &[], DuplicateTrackPolicy::default(), temp.path()).unwrap();
        assert_eq!(summary.tracks, 0);
        assert_eq!(summary.clips, 0);

        let rig = ExportedRig::load(temp.path()).unwrap();
        assert!(rig.nodes.iter().all(|n| n.track == -1));
        assert!(rig.to_imported().unwrap().animations.is_empty());
    }

    fn wave_clip() -> ImportedAnimation {
        ImportedAnimation {
            name: "wave".to_string(),
            channels: vec![
                ImportedChannel {
                    node_name: "spine".to_string(),
                    positions: vec![Vec3::ZERO; 3],
                    rotations: vec![Quat::IDENTITY, Quat::from_rotation_y(0.2), Quat::from_rotation_y(0.4)],
                    scales: vec![Vec3::ONE; 3],
                },
                ImportedChannel {
                    node_name: "knee".to_string(),
                    positions: vec![Vec3::Y; 3],
                    rotations: vec![Quat::IDENTITY; 3],
                    scales: vec![Vec3::ONE; 3],
                },
            ],
        }
    }

    #[test]
    fn test_every_clip_exported_in_order() {
        let temp = TempDir::new().unwrap();
        let mut scene = sample_scene();
        scene.animations.push(wave_clip());

        let summary = export_scene(&scene, &[1, 0], DuplicateTrackPolicy::Reject, temp.path()).unwrap();
        assert_eq!(summary.clips, 2);
        assert_eq!(summary.tracks, 3);
        assert_eq!(summary.keys, 8);

        let rig = ExportedRig::load(temp.path()).unwrap();
        assert_eq!(rig.clip_names, vec!["wave", "bend"]);
        let clips: Vec<u32> = rig.tracks.iter().map(|t| t.clip).collect();
        assert_eq!(clips, vec![0, 0, 1]);

        // Node records point into the first exported clip
        let knee = rig.names.iter().position(|n| n == "knee").unwrap();
        let spine = rig.names.iter().position(|n| n == "spine").unwrap();
        let hip = rig.names.iter().position(|n| n == "hip").unwrap();
        assert_eq!(rig.nodes[spine].track_index(), Some(0));
        assert_eq!(rig.nodes[knee].track_index(), Some(1));
        assert_eq!(rig.nodes[hip].track_index(), None);

        let rebuilt = rig.to_imported().unwrap();
        assert_eq!(rebuilt.animations.len(), 2);
        assert_eq!(rebuilt.animations[0], wave_clip());
        assert_eq!(rebuilt.animations[1], scene.animations[0]);
    }

    #[test]
    fn test_unknown_clip_is_config_error() {
        let temp = TempDir::new().unwrap();
        assert!(matches!(
            export_scene(&sample_scene(), &[0, 3], DuplicateTrackPolicy::default(), temp.path()),
            Err(Error::Config(_))
        ));
        assert!(!temp.path().join(files::NODES).exists());
    }

    #[test]
    fn test_rejects_track_of_unknown_clip() {
        let rig = ExportedRig {
            nodes: vec![NodeRecord::new(None, Mat4::IDENTITY, None)],
            names: vec!["a".to_string()],
            tracks: vec![TrackRecord {
                clip: 1,
                node: 0,
                first_key: 0,
                key_count: 0,
            }],
            clip_names: vec!["only".to_string()],
            ..Default::default()
        };
        assert!(rig.validate().is_err());
        assert!(matches!(rig.to_imported(), Err(Error::AssetLoad { .. })));
    }

    #[test]
    fn test_missing_directory() {
        let temp = TempDir::new().unwrap();
        assert!(matches!(
            ExportedRig::load(&temp.path().join("nope")),
            Err(Error::AssetLoad { .. })
        ));
    }

    #[test]
    fn test_rejects_forward_parent() {
        let rig = ExportedRig {
            nodes: vec![
                NodeRecord::new(None, Mat4::IDENTITY, None),
                NodeRecord::new(Some(1), Mat4::IDENTITY, None),
            ],
            names: vec!["a".to_string(), "b".to_string()],
            ..Default::default()
        };
        assert!(rig.validate().is_err());
    }
}
