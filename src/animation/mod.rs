//! Skeletal animation: bones, tracks, skeleton evaluation and playback

pub mod bone;
pub mod track;
pub mod pose;
pub mod skeleton;
pub mod player;
pub mod mesh;

pub use bone::{Bone, BoneIds, BoneIndex, BoneRegistry, BoneWeights, MAX_BONES, MAX_INFLUENCES, NO_BONE};
pub use track::{AnimationTrack, DuplicateTrackPolicy, Keyframe, TrackIndex, TrackStore};
pub use pose::Pose;
pub use skeleton::Rig;
pub use player::AnimationPlayer;
pub use mesh::{AnimatedMesh, SkinnedScene, SkinnedVertexData};
