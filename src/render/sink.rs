//! Skinning palette sink
//!
//! The seam between animation evaluation and whatever consumes the palette.
//! Meshes are loaded once; afterwards only the palette changes per tick.

use glam::Mat4;

use crate::animation::{AnimationPlayer, SkinnedScene, SkinnedVertexData, MAX_BONES};
use crate::core::error::Error;
use crate::core::types::Result;

use super::buffer::{mesh_buffer, BoneTransformBuffer, CameraBuffer, MeshBuffer};
use super::pipeline::SkinningPipeline;
use super::texture::DepthTexture;

/// Handle of a mesh loaded into a sink
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MeshHandle(pub u32);

impl MeshHandle {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Consumer of vertex data and per-tick bone palettes
pub trait PaletteSink {
    /// Upload a mesh's vertex streams once
    fn load_mesh(&mut self, data: &SkinnedVertexData) -> Result<MeshHandle>;

    /// Replace the palette of a loaded mesh
    fn submit_palette(&mut self, mesh: MeshHandle, palette: &[Mat4]) -> Result<()>;
}

fn check_palette(palette: &[Mat4]) -> Result<()> {
    if palette.len() > MAX_BONES {
        return Err(Error::TooManyBones {
            count: palette.len(),
            max: MAX_BONES,
        });
    }
    Ok(())
}

fn unknown_mesh(mesh: MeshHandle) -> Error {
    Error::Gpu(format!("unknown mesh handle {}", mesh.0))
}

struct GpuMesh {
    buffers: MeshBuffer,
    palette: BoneTransformBuffer,
}

/// wgpu implementation drawing every loaded mesh with its latest palette
pub struct GpuSkinningSink {
    device: wgpu::Device,
    queue: wgpu::Queue,
    camera: CameraBuffer,
    bone_layout: wgpu::BindGroupLayout,
    pipeline: SkinningPipeline,
    depth: DepthTexture,
    meshes: Vec<GpuMesh>,
}

impl GpuSkinningSink {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        surface_format: wgpu::TextureFormat,
        width: u32,
        height: u32,
    ) -> Self {
        let camera = CameraBuffer::new(device);
        let bone_layout = BoneTransformBuffer::create_bind_group_layout(device);
        let pipeline = SkinningPipeline::new(
            device,
            surface_format,
            camera.bind_group_layout(),
            &bone_layout,
        );

        Self {
            device: device.clone(),
            queue: queue.clone(),
            camera,
            bone_layout,
            pipeline,
            depth: DepthTexture::new(device, width, height),
            meshes: Vec::new(),
        }
    }

    /// Write the static `MVP` matrix
    pub fn set_camera(&self, mvp: Mat4) {
        self.camera.update(&self.queue, mvp);
    }

    /// Recreate the depth target for a new surface size
    pub fn resize(&mut self, width: u32, height: u32) {
        if (width, height) != self.depth.size() && width > 0 && height > 0 {
            self.depth = DepthTexture::new(&self.device, width, height);
        }
    }

    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    /// Clear `target` and draw every mesh, one indexed draw each
    pub fn render(&self, encoder: &mut wgpu::CommandEncoder, target: &wgpu::TextureView) {
        let mut pass = self.pipeline.begin_pass(encoder, target, self.depth.view());
        pass.set_bind_group(0, self.camera.bind_group(), &[]);
        for mesh in &self.meshes {
            pass.set_bind_group(1, mesh.palette.bind_group(), &[]);
            mesh.buffers.draw(&mut pass);
        }
    }
}

impl PaletteSink for GpuSkinningSink {
    fn load_mesh(&mut self, data: &SkinnedVertexData) -> Result<MeshHandle> {
        let buffers = MeshBuffer::new(&self.device, data)?;
        let palette = BoneTransformBuffer::new(&self.device, &self.queue, &self.bone_layout);

        let handle = MeshHandle(self.meshes.len() as u32);
        self.meshes.push(GpuMesh { buffers, palette });
        log::debug!(
            "Uploaded mesh {} ({} vertices, {} indices)",
            handle.0,
            data.vertex_count(),
            data.index_count()
        );
        Ok(handle)
    }

    fn submit_palette(&mut self, mesh: MeshHandle, palette: &[Mat4]) -> Result<()> {
        check_palette(palette)?;
        let target = self.meshes.get(mesh.index()).ok_or_else(|| unknown_mesh(mesh))?;
        target.palette.update(&self.queue, palette)
    }
}

/// Sink that keeps everything on the CPU; used headless and in tests
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub meshes: Vec<SkinnedVertexData>,
    pub palettes: Vec<Vec<Mat4>>,
    pub submissions: usize,
}

impl PaletteSink for RecordingSink {
    fn load_mesh(&mut self, data: &SkinnedVertexData) -> Result<MeshHandle> {
        mesh_buffer::validate(data)?;
        self.meshes.push(data.clone());
        self.palettes.push(Vec::new());
        Ok(MeshHandle(self.meshes.len() as u32 - 1))
    }

    fn submit_palette(&mut self, mesh: MeshHandle, palette: &[Mat4]) -> Result<()> {
        check_palette(palette)?;
        let slot = self
            .palettes
            .get_mut(mesh.index())
            .ok_or_else(|| unknown_mesh(mesh))?;
        slot.clear();
        slot.extend_from_slice(palette);
        self.submissions += 1;
        Ok(())
    }
}

/// Load every mesh of `scene` into `sink` and submit its current palette
pub fn load_scene_meshes(scene: &SkinnedScene, sink: &mut impl PaletteSink) -> Result<Vec<MeshHandle>> {
    let mut handles = Vec::with_capacity(scene.meshes.len());
    for mesh in &scene.meshes {
        let handle = sink.load_mesh(&mesh.vertex_data())?;
        sink.submit_palette(handle, mesh.palette())?;
        handles.push(handle);
    }
    Ok(handles)
}

/// Run `ticks` fixed steps without a window, recording every palette.
///
/// Each step feeds the player exactly one tick interval, so every step
/// produces a new frame while the clip is non-empty.
pub fn play_headless(
    scene: &mut SkinnedScene,
    player: &mut AnimationPlayer,
    ticks: u32,
) -> Result<RecordingSink> {
    let mut sink = RecordingSink::default();
    let handles = load_scene_meshes(scene, &mut sink)?;

    for _ in 0..ticks {
        if !player.advance(player.tick_seconds()) {
            continue;
        }
        let frame = player.frame();
        for (mesh, handle) in scene.meshes.iter_mut().zip(&handles) {
            mesh.update_bones(frame)?;
            sink.submit_palette(*handle, mesh.palette())?;
        }
    }

    log::info!(
        "Headless run: {} tick(s), {} palette submission(s), stopped at frame {}",
        ticks,
        sink.submissions,
        player.frame()
    );
    Ok(sink)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use glam::{Quat, Vec3};

    use crate::animation::{AnimatedMesh, AnimationPlayer, AnimationTrack, Keyframe, TrackStore};
    use crate::import::{ImportedBone, ImportedMesh, ImportedNode, VertexWeight};
    use crate::scene::SceneGraph;

    fn triangle_data() -> SkinnedVertexData {
        SkinnedVertexData {
            positions: vec![[0.0, 0.0, 0.0, 1.0]; 3],
            ids: vec![[0, -1, -1, -1]; 3],
            weights: vec![[1.0, 0.0, 0.0, 0.0]; 3],
            normals: vec![[0.0, 0.0, 1.0]; 3],
            indices: vec![0, 1, 2],
        }
    }

    #[test]
    fn test_recording_sink_handles() {
        let mut sink = RecordingSink::default();
        let a = sink.load_mesh(&triangle_data()).unwrap();
        let b = sink.load_mesh(&triangle_data()).unwrap();
        assert_eq!(a, MeshHandle(0));
        assert_eq!(b, MeshHandle(1));

        sink.submit_palette(b, &[Mat4::IDENTITY; 2]).unwrap();
        assert!(sink.palettes[0].is_empty());
        assert_eq!(sink.palettes[1].len(), 2);
    }

    #[test]
    fn test_submit_rejects_oversize_palette() {
        let mut sink = RecordingSink::default();
        let mesh = sink.load_mesh(&triangle_data()).unwrap();
        assert!(matches!(
            sink.submit_palette(mesh, &vec![Mat4::IDENTITY; MAX_BONES + 1]),
            Err(Error::TooManyBones { .. })
        ));
        assert!(sink.submit_palette(MeshHandle(7), &[]).is_err());
    }

    #[test]
    fn test_tick_loop_feeds_sink() {
        let graph = Arc::new(SceneGraph::from_imported(
            &ImportedNode::new("root", Mat4::IDENTITY)
                .with_child(ImportedNode::new("bone", Mat4::IDENTITY)),
        ));
        let keys = (0..3)
            .map(|i| Keyframe::new(Vec3::new(i as f32, 0.0, 0.0), Quat::IDENTITY, Vec3::ONE))
            .collect();
        let mut tracks = TrackStore::default();
        tracks.register(AnimationTrack::new("bone", keys)).unwrap();
        let tracks = Arc::new(tracks);

        let imported = ImportedMesh {
            name: "tri".to_string(),
            positions: vec![Vec3::ZERO, Vec3::X, Vec3::Y],
            normals: vec![Vec3::Z; 3],
            faces: vec![vec![0, 1, 2]],
            bones: vec![ImportedBone {
                name: "bone".to_string(),
                offset: Mat4::IDENTITY,
                weights: (0..3).map(|v| VertexWeight::new(v, 1.0)).collect(),
            }],
        };
        let mut mesh = AnimatedMesh::from_imported(&imported, graph, tracks.clone()).unwrap();

        let mut sink = RecordingSink::default();
        let handle = sink.load_mesh(&mesh.vertex_data()).unwrap();
        let mut player = AnimationPlayer::new(tracks.frame_count(), 0.5);

        for _ in 0..4 {
            player.advance(0.5);
            mesh.update_bones(player.frame()).unwrap();
            sink.submit_palette(handle, mesh.palette()).unwrap();
        }

        // Frames 1, 2, 0, 1
        assert_eq!(sink.submissions, 4);
        assert_eq!(sink.palettes[0][0], Mat4::from_translation(Vec3::X));
    }

    #[test]
    fn test_play_headless_records_each_tick() {
        use crate::animation::DuplicateTrackPolicy;
        use crate::import::{ImportedAnimation, ImportedChannel, ImportedScene};

        let imported = ImportedScene {
            root: ImportedNode::new("root", Mat4::IDENTITY)
                .with_child(ImportedNode::new("bone", Mat4::IDENTITY)),
            meshes: vec![ImportedMesh {
                name: "tri".to_string(),
                positions: vec![Vec3::ZERO, Vec3::X, Vec3::Y],
                normals: vec![Vec3::Z; 3],
                faces: vec![vec![0, 1, 2]],
                bones: vec![ImportedBone {
                    name: "bone".to_string(),
                    offset: Mat4::IDENTITY,
                    weights: (0..3).map(|v| VertexWeight::new(v, 1.0)).collect(),
                }],
            }],
            animations: vec![ImportedAnimation {
                name: "slide".to_string(),
                channels: vec![ImportedChannel {
                    node_name: "bone".to_string(),
                    positions: vec![Vec3::ZERO, Vec3::X, Vec3::Y],
                    rotations: vec![Quat::IDENTITY; 3],
                    scales: vec![Vec3::ONE; 3],
                }],
            }],
        };
        let mut scene = SkinnedScene::build(&imported, 0, DuplicateTrackPolicy::default()).unwrap();
        scene.update(0).unwrap();
        let mut player = AnimationPlayer::new(scene.frame_count(), 1.0 / 30.0);

        let sink = play_headless(&mut scene, &mut player, 5).unwrap();

        // One initial upload plus one per tick; frames 1, 2, 0, 1, 2
        assert_eq!(sink.meshes.len(), 1);
        assert_eq!(sink.submissions, 6);
        assert_eq!(player.frame(), 2);
        assert_eq!(sink.palettes[0][0], Mat4::from_translation(Vec3::Y));
    }

    #[test]
    fn test_play_headless_paused_player_keeps_rest_palette() {
        let mut scene = SkinnedScene {
            graph: Arc::new(SceneGraph::from_imported(&ImportedNode::new("root", Mat4::IDENTITY))),
            tracks: Arc::new(TrackStore::default()),
            meshes: Vec::new(),
        };
        let mut player = AnimationPlayer::new(4, 0.5);
        player.pause();

        let sink = play_headless(&mut scene, &mut player, 3).unwrap();
        assert_eq!(sink.submissions, 0);
        assert_eq!(player.frame(), 0);
    }
}
