//! Per-mesh evaluation output

use glam::{Mat4, Vec4};

use super::bone::BoneIndex;

/// Bone palette and bone origins of one mesh, rewritten every tick
#[derive(Clone, Debug)]
pub struct Pose {
    /// Skinning matrices, indexed by bone
    pub bone_transforms: Vec<Mat4>,
    /// World-space origin of each bone
    pub bone_positions: Vec<Vec4>,
    written_pass: Vec<u64>,
    pass: u64,
}

impl Pose {
    pub fn new(bone_count: usize) -> Self {
        Self {
            bone_transforms: vec![Mat4::IDENTITY; bone_count],
            bone_positions: vec![Vec4::W; bone_count],
            written_pass: vec![0; bone_count],
            pass: 0,
        }
    }

    pub fn bone_count(&self) -> usize {
        self.bone_transforms.len()
    }

    /// Start a new evaluation pass
    pub fn begin_pass(&mut self) {
        self.pass += 1;
    }

    /// Write bone `bone` for the current pass
    pub fn write(&mut self, bone: BoneIndex, transform: Mat4, position: Vec4) {
        let i = bone as usize;
        self.bone_transforms[i] = transform;
        self.bone_positions[i] = position;
        self.written_pass[i] = self.pass;
    }

    /// Bones not written since the last `begin_pass`
    pub fn stale_bones(&self) -> Vec<BoneIndex> {
        self.written_pass
            .iter()
            .enumerate()
            .filter(|(_, stamp)| **stamp != self.pass)
            .map(|(i, _)| i as BoneIndex)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn test_new_pose_is_identity() {
        let pose = Pose::new(2);
        assert_eq!(pose.bone_count(), 2);
        assert!(pose.bone_transforms.iter().all(|m| *m == Mat4::IDENTITY));
    }

    #[test]
    fn test_stale_bones_per_pass() {
        let mut pose = Pose::new(3);
        pose.begin_pass();
        pose.write(0, Mat4::IDENTITY, Vec4::W);
        pose.write(2, Mat4::IDENTITY, Vec4::W);
        assert_eq!(pose.stale_bones(), vec![1]);

        // A bone written in an earlier pass is stale again in the next one
        pose.begin_pass();
        pose.write(1, Mat4::from_translation(Vec3::X), Vec4::new(1.0, 0.0, 0.0, 1.0));
        assert_eq!(pose.stale_bones(), vec![0, 2]);
        assert_eq!(pose.bone_positions[1].x, 1.0);
    }
}
