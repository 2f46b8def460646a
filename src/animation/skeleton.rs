//! Skeleton evaluation
//!
//! A `Rig` ties one mesh's bones and the shared track store to scene nodes.
//! All name matching happens once in `Rig::bind`; evaluation only follows the
//! precomputed node index tables.

use glam::{Mat4, Vec4};

use crate::core::error::Error;
use crate::core::types::Result;
use crate::scene::{SceneGraph, SceneNodeId};

use super::bone::{BoneIndex, BoneRegistry};
use super::pose::Pose;
use super::track::{TrackIndex, TrackStore};

/// Node-indexed bindings of a mesh's bones and the clip's tracks
#[derive(Clone, Debug)]
pub struct Rig {
    node_track: Vec<Option<TrackIndex>>,
    node_bone: Vec<Option<BoneIndex>>,
    root_transform: Mat4,
    stack: Vec<(SceneNodeId, Mat4)>,
}

impl Rig {
    /// Resolve every bone and track name against the scene graph
    pub fn bind(graph: &SceneGraph, bones: &BoneRegistry, tracks: &TrackStore) -> Result<Self> {
        let mut node_bone = vec![None; graph.len()];
        for bone in bones.bones() {
            if graph.is_ambiguous(&bone.name) {
                return Err(Error::AmbiguousBoneName(bone.name.clone()));
            }
            let node = graph
                .find(&bone.name)
                .ok_or_else(|| Error::UnresolvedBoneName(bone.name.clone()))?;
            node_bone[node.index()] = Some(bone.index);
        }

        // Every node carrying a track's name is driven by it
        let node_track: Vec<Option<TrackIndex>> =
            graph.iter().map(|node| tracks.lookup(&node.name)).collect();

        let unbound = tracks
            .iter()
            .filter(|t| graph.find(t.node_name()).is_none())
            .count();
        if unbound > 0 {
            log::debug!("{} track(s) target nodes missing from the scene graph", unbound);
        }

        let root_transform = if graph.is_empty() {
            Mat4::IDENTITY
        } else {
            graph.local_transform(graph.root())
        };

        Ok(Self {
            node_track,
            node_bone,
            root_transform,
            stack: Vec::with_capacity(graph.len()),
        })
    }

    /// Track bound to a node, if any
    pub fn track_for(&self, node: SceneNodeId) -> Option<TrackIndex> {
        self.node_track.get(node.index()).copied().flatten()
    }

    /// Bone bound to a node, if any
    pub fn bone_for(&self, node: SceneNodeId) -> Option<BoneIndex> {
        self.node_bone.get(node.index()).copied().flatten()
    }

    /// Rest transform of the scene root, applied in front of every palette entry
    pub fn root_transform(&self) -> Mat4 {
        self.root_transform
    }

    /// Compute the palette and bone origins for `frame` into `pose`.
    ///
    /// `pose` must have one slot per bone of `bones`. Nodes are visited in
    /// pre-order, siblings in document order.
    pub fn evaluate(
        &mut self,
        graph: &SceneGraph,
        tracks: &TrackStore,
        bones: &BoneRegistry,
        frame: u32,
        pose: &mut Pose,
    ) -> Result<()> {
        if pose.bone_count() != bones.len() {
            return Err(Error::PoseSize {
                pose: pose.bone_count(),
                bones: bones.len(),
            });
        }
        pose.begin_pass();

        if graph.is_empty() {
            return Ok(());
        }

        self.stack.clear();
        self.stack.push((graph.root(), Mat4::IDENTITY));

        while let Some((node, parent)) = self.stack.pop() {
            let local = match self.node_track[node.index()] {
                Some(track) => match tracks.track(track) {
                    Some(track) => track.sample(frame)?,
                    None => graph.local_transform(node),
                },
                None => graph.local_transform(node),
            };
            let global = parent * local;

            if let Some(bone) = self.node_bone[node.index()] {
                let offset = bones
                    .bone(bone)
                    .map(|b| b.offset)
                    .unwrap_or(Mat4::IDENTITY);
                pose.write(
                    bone,
                    self.root_transform * global * offset,
                    global * Vec4::new(0.0, 0.0, 0.0, 1.0),
                );
            }

            for child in graph.children(node).rev() {
                self.stack.push((child, global));
            }
        }

        let stale = pose.stale_bones();
        if !stale.is_empty() {
            return Err(Error::StaleBones(stale));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::track::{AnimationTrack, DuplicateTrackPolicy, Keyframe};
    use crate::import::ImportedNode;
    use glam::{Quat, Vec3};

    fn key(translation: Vec3) -> Keyframe {
        Keyframe::new(translation, Quat::IDENTITY, Vec3::ONE)
    }

    fn chain_graph() -> SceneGraph {
        SceneGraph::from_imported(
            &ImportedNode::new("root", Mat4::IDENTITY)
                .with_child(ImportedNode::new("child", Mat4::from_translation(Vec3::Z))),
        )
    }

    #[test]
    fn test_two_node_chain() {
        let graph = chain_graph();
        let mut bones = BoneRegistry::new(0);
        bones.register("child", Mat4::IDENTITY, &[]).unwrap();
        let mut tracks = TrackStore::default();
        tracks
            .register(AnimationTrack::new("child", vec![key(Vec3::new(0.0, 1.0, 0.0))]))
            .unwrap();

        let mut rig = Rig::bind(&graph, &bones, &tracks).unwrap();
        let mut pose = Pose::new(bones.len());
        rig.evaluate(&graph, &tracks, &bones, 0, &mut pose).unwrap();

        let moved = pose.bone_transforms[0].transform_point3(Vec3::ZERO);
        assert!((moved - Vec3::new(0.0, 1.0, 0.0)).length() < 1e-6);
        assert_eq!(pose.bone_positions[0], Vec4::new(0.0, 1.0, 0.0, 1.0));
    }

    #[test]
    fn test_parent_propagation() {
        let graph = chain_graph();
        let mut bones = BoneRegistry::new(0);
        bones.register("root", Mat4::IDENTITY, &[]).unwrap();
        bones.register("child", Mat4::IDENTITY, &[]).unwrap();

        let root_key = Keyframe::new(
            Vec3::new(2.0, 0.0, 0.0),
            Quat::from_rotation_z(std::f32::consts::FRAC_PI_2),
            Vec3::ONE,
        );
        let child_key = key(Vec3::new(1.0, 0.0, 0.0));
        let mut tracks = TrackStore::default();
        tracks.register(AnimationTrack::new("root", vec![root_key])).unwrap();
        tracks.register(AnimationTrack::new("child", vec![child_key])).unwrap();

        let mut rig = Rig::bind(&graph, &bones, &tracks).unwrap();
        let mut pose = Pose::new(bones.len());
        rig.evaluate(&graph, &tracks, &bones, 0, &mut pose).unwrap();

        let expected = root_key.to_matrix() * child_key.to_matrix();
        assert!(pose.bone_transforms[1].abs_diff_eq(expected, 1e-6));
        assert!(!pose.bone_transforms[1].abs_diff_eq(child_key.to_matrix(), 1e-3));
    }

    #[test]
    fn test_evaluate_is_idempotent() {
        let graph = chain_graph();
        let mut bones = BoneRegistry::new(0);
        bones.register("child", Mat4::from_translation(-Vec3::Z), &[]).unwrap();
        bones.register("root", Mat4::IDENTITY, &[]).unwrap();
        let mut tracks = TrackStore::default();
        tracks
            .register(AnimationTrack::new(
                "child",
                vec![key(Vec3::X), key(Vec3::Y), key(Vec3::Z)],
            ))
            .unwrap();

        let mut rig = Rig::bind(&graph, &bones, &tracks).unwrap();
        let mut pose = Pose::new(bones.len());
        for frame in 0..tracks.frame_count() {
            rig.evaluate(&graph, &tracks, &bones, frame, &mut pose).unwrap();
            let first = pose.bone_transforms.clone();
            rig.evaluate(&graph, &tracks, &bones, frame, &mut pose).unwrap();
            assert_eq!(first, pose.bone_transforms);
            assert!(pose.stale_bones().is_empty());
        }
    }

    #[test]
    fn test_root_rest_transform_prefixes_palette() {
        let root_rest = Mat4::from_scale(Vec3::splat(2.0));
        let graph = SceneGraph::from_imported(
            &ImportedNode::new("root", root_rest)
                .with_child(ImportedNode::new("child", Mat4::from_translation(Vec3::X))),
        );
        let mut bones = BoneRegistry::new(0);
        bones.register("child", Mat4::IDENTITY, &[]).unwrap();
        let tracks = TrackStore::default();

        let mut rig = Rig::bind(&graph, &bones, &tracks).unwrap();
        let mut pose = Pose::new(1);
        rig.evaluate(&graph, &tracks, &bones, 0, &mut pose).unwrap();

        let global = root_rest * Mat4::from_translation(Vec3::X);
        assert!(pose.bone_transforms[0].abs_diff_eq(root_rest * global, 1e-6));
        assert!((pose.bone_positions[0] - Vec4::new(2.0, 0.0, 0.0, 1.0)).length() < 1e-6);
    }

    #[test]
    fn test_frame_out_of_range_propagates() {
        let graph = chain_graph();
        let bones = BoneRegistry::new(0);
        let mut tracks = TrackStore::new(DuplicateTrackPolicy::Reject);
        tracks.register(AnimationTrack::new("child", vec![key(Vec3::X)])).unwrap();

        let mut rig = Rig::bind(&graph, &bones, &tracks).unwrap();
        let mut pose = Pose::new(0);
        assert!(matches!(
            rig.evaluate(&graph, &tracks, &bones, 1, &mut pose),
            Err(Error::FrameOutOfRange { frame: 1, .. })
        ));
    }

    #[test]
    fn test_pose_size_mismatch() {
        let graph = chain_graph();
        let mut bones = BoneRegistry::new(0);
        bones.register("child", Mat4::IDENTITY, &[]).unwrap();
        let tracks = TrackStore::default();

        let mut rig = Rig::bind(&graph, &bones, &tracks).unwrap();
        let mut pose = Pose::new(2);
        assert!(matches!(
            rig.evaluate(&graph, &tracks, &bones, 0, &mut pose),
            Err(Error::PoseSize { pose: 2, bones: 1 })
        ));
    }

    #[test]
    fn test_siblings_visited_in_document_order() {
        // Both tracks are out of range at frame 3; the first sibling fails first
        let graph = SceneGraph::from_imported(
            &ImportedNode::new("root", Mat4::IDENTITY)
                .with_child(ImportedNode::new("left", Mat4::IDENTITY))
                .with_child(ImportedNode::new("right", Mat4::IDENTITY)),
        );
        let bones = BoneRegistry::new(0);
        let mut tracks = TrackStore::default();
        tracks.register(AnimationTrack::new("left", vec![key(Vec3::X)])).unwrap();
        tracks
            .register(AnimationTrack::new("right", vec![key(Vec3::X), key(Vec3::Y)]))
            .unwrap();

        let mut rig = Rig::bind(&graph, &bones, &tracks).unwrap();
        let mut pose = Pose::new(0);
        assert!(matches!(
            rig.evaluate(&graph, &tracks, &bones, 3, &mut pose),
            Err(Error::FrameOutOfRange { ref track, .. }) if track == "left"
        ));
    }

    #[test]
    fn test_bind_unresolved_bone() {
        let graph = chain_graph();
        let mut bones = BoneRegistry::new(0);
        bones.register("missing", Mat4::IDENTITY, &[]).unwrap();
        assert!(matches!(
            Rig::bind(&graph, &bones, &TrackStore::default()),
            Err(Error::UnresolvedBoneName(_))
        ));
    }

    #[test]
    fn test_bind_ambiguous_bone() {
        let graph = SceneGraph::from_imported(
            &ImportedNode::new("root", Mat4::IDENTITY)
                .with_child(ImportedNode::new("arm", Mat4::IDENTITY))
                .with_child(ImportedNode::new("arm", Mat4::IDENTITY)),
        );
        let mut bones = BoneRegistry::new(0);
        bones.register("arm", Mat4::IDENTITY, &[]).unwrap();
        assert!(matches!(
            Rig::bind(&graph, &bones, &TrackStore::default()),
            Err(Error::AmbiguousBoneName(_))
        ));
    }

    #[test]
    fn test_bind_tables() {
        let graph = chain_graph();
        let mut bones = BoneRegistry::new(0);
        bones.register("child", Mat4::IDENTITY, &[]).unwrap();
        let mut tracks = TrackStore::default();
        tracks.register(AnimationTrack::new("root", vec![key(Vec3::X)])).unwrap();

        let rig = Rig::bind(&graph, &bones, &tracks).unwrap();
        let child = graph.find("child").unwrap();
        assert_eq!(rig.bone_for(child), Some(0));
        assert_eq!(rig.bone_for(graph.root()), None);
        assert_eq!(rig.track_for(graph.root()), Some(0));
        assert_eq!(rig.track_for(child), None);
    }
}
