//! Fixed-size export records

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Quat, Vec3};

use crate::animation::Keyframe;

/// One scene node; `parent` is -1 for the root and otherwise lower than the
/// record's own index
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct NodeRecord {
    pub parent: i32,
    /// Column-major local rest transform
    pub transform: [f32; 16],
    /// Index of the node's track in the first exported clip, -1 when that
    /// clip does not animate it
    pub track: i32,
}

impl NodeRecord {
    pub fn new(parent: Option<usize>, transform: Mat4, track: Option<usize>) -> Self {
        Self {
            parent: parent.map_or(-1, |p| p as i32),
            transform: transform.to_cols_array(),
            track: track.map_or(-1, |t| t as i32),
        }
    }

    pub fn parent_index(&self) -> Option<usize> {
        usize::try_from(self.parent).ok()
    }

    pub fn track_index(&self) -> Option<usize> {
        usize::try_from(self.track).ok()
    }

    pub fn transform(&self) -> Mat4 {
        Mat4::from_cols_array(&self.transform)
    }
}

/// Track of one node in clip `clip`: `key_count` keys starting at `first_key`
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct TrackRecord {
    pub clip: u32,
    pub node: i32,
    pub first_key: u32,
    pub key_count: u32,
}

impl TrackRecord {
    pub fn key_range(&self) -> std::ops::Range<usize> {
        let start = self.first_key as usize;
        start..start + self.key_count as usize
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct KeyRecord {
    pub translation: [f32; 3],
    /// x, y, z, w
    pub rotation: [f32; 4],
    pub scale: [f32; 3],
}

impl From<&Keyframe> for KeyRecord {
    fn from(key: &Keyframe) -> Self {
        Self {
            translation: key.translation.to_array(),
            rotation: key.rotation.to_array(),
            scale: key.scale.to_array(),
        }
    }
}

impl From<&KeyRecord> for Keyframe {
    fn from(record: &KeyRecord) -> Self {
        Keyframe::new(
            Vec3::from_array(record.translation),
            Quat::from_array(record.rotation),
            Vec3::from_array(record.scale),
        )
    }
}

/// Bone of a mesh: the node it follows and its offset matrix
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct BoneRecord {
    pub node: i32,
    pub offset: [f32; 16],
}
