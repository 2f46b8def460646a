//! Frame-indexed keyframe tracks
//!
//! Tracks are addressed by frame index, not time: frame `f` reads key `f` of
//! every property. There is no interpolation between keys.

use std::collections::HashMap;

use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::core::error::Error;
use crate::core::types::Result;
use crate::import::{ImportedAnimation, ImportedChannel};

/// Index of a track inside a `TrackStore`
pub type TrackIndex = u32;

/// How a store reacts to a second track for the same node
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateTrackPolicy {
    /// The later track replaces the earlier one (logged)
    #[default]
    LastWins,
    /// Fail with `Error::DuplicateTrack`
    Reject,
}

/// Transform of one node at one frame
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Keyframe {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Keyframe {
    pub fn new(translation: Vec3, rotation: Quat, scale: Vec3) -> Self {
        Self {
            translation,
            rotation,
            scale,
        }
    }

    /// `T * R * S`: scale first, then rotate, then translate
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_translation(self.translation)
            * Mat4::from_quat(self.rotation)
            * Mat4::from_scale(self.scale)
    }
}

/// Keyframes for one target node
#[derive(Clone, Debug)]
pub struct AnimationTrack {
    node_name: String,
    keys: Vec<Keyframe>,
}

impl AnimationTrack {
    /// Build a track from already aligned keyframes
    pub fn new(node_name: impl Into<String>, keys: Vec<Keyframe>) -> Self {
        Self {
            node_name: node_name.into(),
            keys,
        }
    }

    /// Build a track from separate property arrays, which must share one length
    pub fn from_channel(channel: &ImportedChannel) -> Result<Self> {
        let positions = channel.positions.len();
        let rotations = channel.rotations.len();
        let scales = channel.scales.len();
        if positions != rotations || positions != scales {
            return Err(Error::MismatchedKeyCounts {
                track: channel.node_name.clone(),
                positions,
                rotations,
                scales,
            });
        }

        let keys = channel
            .positions
            .iter()
            .zip(&channel.rotations)
            .zip(&channel.scales)
            .map(|((t, r), s)| Keyframe::new(*t, *r, *s))
            .collect();

        Ok(Self::new(channel.node_name.clone(), keys))
    }

    pub fn node_name(&self) -> &str {
        &self.node_name
    }

    pub fn keys(&self) -> &[Keyframe] {
        &self.keys
    }

    pub fn key_count(&self) -> usize {
        self.keys.len()
    }

    /// Local transform at `frame`
    pub fn sample(&self, frame: u32) -> Result<Mat4> {
        self.keys
            .get(frame as usize)
            .map(Keyframe::to_matrix)
            .ok_or_else(|| Error::FrameOutOfRange {
                track: self.node_name.clone(),
                frame,
                key_count: self.keys.len(),
            })
    }
}

/// Node name to track lookup, shared by every mesh of a scene
#[derive(Clone, Debug, Default)]
pub struct TrackStore {
    tracks: Vec<AnimationTrack>,
    by_name: HashMap<String, TrackIndex>,
    policy: DuplicateTrackPolicy,
}

impl TrackStore {
    pub fn new(policy: DuplicateTrackPolicy) -> Self {
        Self {
            tracks: Vec::new(),
            by_name: HashMap::new(),
            policy,
        }
    }

    /// Build a store from one imported clip
    pub fn from_clip(clip: &ImportedAnimation, policy: DuplicateTrackPolicy) -> Result<Self> {
        let mut store = Self::new(policy);
        for channel in &clip.channels {
            store.register(AnimationTrack::from_channel(channel)?)?;
        }
        log::info!(
            "Loaded clip '{}': {} tracks, {} frames",
            clip.name,
            store.len(),
            store.frame_count()
        );
        Ok(store)
    }

    /// Add a track keyed by its node name
    pub fn register(&mut self, track: AnimationTrack) -> Result<TrackIndex> {
        if let Some(&existing) = self.by_name.get(track.node_name()) {
            return match self.policy {
                DuplicateTrackPolicy::Reject => Err(Error::DuplicateTrack(track.node_name.clone())),
                DuplicateTrackPolicy::LastWins => {
                    log::warn!(
                        "Track for node '{}' registered twice, keeping the later one",
                        track.node_name()
                    );
                    self.tracks[existing as usize] = track;
                    Ok(existing)
                }
            };
        }

        let index = self.tracks.len() as TrackIndex;
        self.by_name.insert(track.node_name.clone(), index);
        self.tracks.push(track);
        Ok(index)
    }

    pub fn lookup(&self, node_name: &str) -> Option<TrackIndex> {
        self.by_name.get(node_name).copied()
    }

    pub fn track(&self, index: TrackIndex) -> Option<&AnimationTrack> {
        self.tracks.get(index as usize)
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AnimationTrack> {
        self.tracks.iter()
    }

    /// Number of frames every track can serve (0 when the store is empty)
    pub fn frame_count(&self) -> u32 {
        self.tracks
            .iter()
            .map(|t| t.key_count() as u32)
            .min()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    fn constant_track(name: &str, translation: Vec3, frames: usize) -> AnimationTrack {
        let key = Keyframe::new(translation, Quat::IDENTITY, Vec3::ONE);
        AnimationTrack::new(name, vec![key; frames])
    }

    #[test]
    fn test_keyframe_order_scale_rotate_translate() {
        let key = Keyframe::new(
            Vec3::new(1.0, 0.0, 0.0),
            Quat::from_rotation_z(std::f32::consts::FRAC_PI_2),
            Vec3::splat(2.0),
        );
        let origin = key.to_matrix() * Vec4::new(0.0, 0.0, 0.0, 1.0);
        assert!((origin - Vec4::new(1.0, 0.0, 0.0, 1.0)).length() < 1e-5);

        // (1,0,0) -> scale (2,0,0) -> rotate (0,2,0) -> translate (1,2,0)
        let x = key.to_matrix() * Vec4::new(1.0, 0.0, 0.0, 1.0);
        assert!((x - Vec4::new(1.0, 2.0, 0.0, 1.0)).length() < 1e-5);
    }

    #[test]
    fn test_sample_out_of_range() {
        let track = constant_track("arm", Vec3::ZERO, 3);
        assert!(track.sample(2).is_ok());
        assert!(matches!(
            track.sample(3),
            Err(Error::FrameOutOfRange { frame: 3, key_count: 3, .. })
        ));
    }

    #[test]
    fn test_from_channel_mismatched_counts() {
        let channel = ImportedChannel {
            node_name: "arm".to_string(),
            positions: vec![Vec3::ZERO; 2],
            rotations: vec![Quat::IDENTITY; 3],
            scales: vec![Vec3::ONE; 2],
        };
        assert!(matches!(
            AnimationTrack::from_channel(&channel),
            Err(Error::MismatchedKeyCounts { rotations: 3, .. })
        ));
    }

    #[test]
    fn test_duplicate_last_wins() {
        let mut store = TrackStore::new(DuplicateTrackPolicy::LastWins);
        store.register(constant_track("arm", Vec3::X, 2)).unwrap();
        store.register(constant_track("arm", Vec3::Y, 2)).unwrap();

        assert_eq!(store.len(), 1);
        let index = store.lookup("arm").unwrap();
        let m = store.track(index).unwrap().sample(0).unwrap();
        assert_eq!(m.w_axis.truncate(), Vec3::Y);
    }

    #[test]
    fn test_duplicate_reject() {
        let mut store = TrackStore::new(DuplicateTrackPolicy::Reject);
        store.register(constant_track("arm", Vec3::X, 2)).unwrap();
        assert!(matches!(
            store.register(constant_track("arm", Vec3::Y, 2)),
            Err(Error::DuplicateTrack(_))
        ));
    }

    #[test]
    fn test_frame_count_is_minimum() {
        let mut store = TrackStore::default();
        assert_eq!(store.frame_count(), 0);
        store.register(constant_track("a", Vec3::ZERO, 180)).unwrap();
        store.register(constant_track("b", Vec3::ZERO, 90)).unwrap();
        assert_eq!(store.frame_count(), 90);
    }

    #[test]
    fn test_from_clip() {
        let clip = ImportedAnimation {
            name: "walk".to_string(),
            channels: vec![ImportedChannel {
                node_name: "leg".to_string(),
                positions: vec![Vec3::ZERO, Vec3::X],
                rotations: vec![Quat::IDENTITY; 2],
                scales: vec![Vec3::ONE; 2],
            }],
        };
        let store = TrackStore::from_clip(&clip, DuplicateTrackPolicy::default()).unwrap();
        assert_eq!(store.frame_count(), 2);
        assert!(store.lookup("leg").is_some());
        assert!(store.lookup("arm").is_none());
    }
}
