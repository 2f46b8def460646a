//! Write an imported scene to an export directory

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

use crate::animation::{AnimatedMesh, DuplicateTrackPolicy, TrackStore};
use crate::core::error::Error;
use crate::core::types::Result;
use crate::import::ImportedScene;
use crate::scene::SceneGraph;

use super::chunk::{encode_names, write_chunk};
use super::records::{BoneRecord, KeyRecord, NodeRecord, TrackRecord};
use super::{files, tags};

/// What an export wrote
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExportSummary {
    pub nodes: usize,
    pub clips: usize,
    pub tracks: usize,
    pub keys: usize,
    pub meshes: usize,
}

/// Export the node table, the clips listed in `clips` and every mesh of `scene`.
///
/// Track records are grouped by clip in the order of `clips`, then by node in
/// breadth-first order. A node record points at its track in the first
/// exported clip.
pub fn export_scene(
    scene: &ImportedScene,
    clips: &[usize],
    policy: DuplicateTrackPolicy,
    dir: &Path,
) -> Result<ExportSummary> {
    let animations = clips
        .iter()
        .map(|&i| {
            scene.animations.get(i).ok_or_else(|| {
                Error::Config(format!(
                    "clip {} requested, scene has {} clip(s)",
                    i,
                    scene.animations.len()
                ))
            })
        })
        .collect::<Result<Vec<_>>>()?;
    let stores = animations
        .iter()
        .map(|animation| TrackStore::from_clip(animation, policy))
        .collect::<Result<Vec<_>>>()?;

    std::fs::create_dir_all(dir)?;

    let graph = Arc::new(SceneGraph::from_imported(&scene.root));

    // Breadth-first position of every node id
    let order = graph.breadth_first();
    let mut position = vec![0usize; graph.len()];
    for (i, id) in order.iter().enumerate() {
        position[id.index()] = i;
    }

    let mut track_records = Vec::new();
    let mut key_records = Vec::new();
    let mut node_track = vec![None; graph.len()];
    for (clip, tracks) in stores.iter().enumerate() {
        for (i, id) in order.iter().enumerate() {
            let Some(track) = tracks.lookup(graph.name(*id)).and_then(|t| tracks.track(t)) else {
                continue;
            };
            if clip == 0 {
                node_track[i] = Some(track_records.len());
            }
            track_records.push(TrackRecord {
                clip: clip as u32,
                node: i as i32,
                first_key: key_records.len() as u32,
                key_count: track.key_count() as u32,
            });
            key_records.extend(track.keys().iter().map(KeyRecord::from));
        }
    }
    let clip_names: Vec<&str> = animations.iter().map(|a| a.name.as_str()).collect();

    let node_records: Vec<NodeRecord> = order
        .iter()
        .enumerate()
        .map(|(i, id)| {
            NodeRecord::new(
                graph.parent(*id).map(|p| position[p.index()]),
                graph.local_transform(*id),
                node_track[i],
            )
        })
        .collect();
    let names: Vec<&str> = order.iter().map(|id| graph.name(*id)).collect();

    write_file(&dir.join(files::NODES), |w| {
        write_chunk(w, &tags::NODE, &node_records)?;
        write_chunk(w, &tags::NAME, &encode_names(&names))
    })?;
    write_file(&dir.join(files::ANIMATIONS), |w| {
        write_chunk(w, &tags::TRACK, &track_records)?;
        write_chunk(w, &tags::KEYS, &key_records)?;
        write_chunk(w, &tags::CLIPS, &encode_names(&clip_names))
    })?;
    write_file(&dir.join(files::MESH_COUNT), |w| {
        write_chunk(w, &tags::MESH_COUNT, &[scene.meshes.len() as u32])
    })?;

    // Bones bind to nodes only; no clip is needed to resolve them
    let unanimated = Arc::new(TrackStore::new(policy));
    for (i, imported) in scene.meshes.iter().enumerate() {
        let mesh = AnimatedMesh::from_imported(imported, graph.clone(), unanimated.clone())?;
        let data = mesh.vertex_data();
        let bones: Vec<BoneRecord> = mesh
            .bones()
            .bones()
            .iter()
            .map(|bone| BoneRecord {
                node: graph
                    .find(&bone.name)
                    .map_or(-1, |id| position[id.index()] as i32),
                offset: bone.offset.to_cols_array(),
            })
            .collect();

        write_file(&dir.join(files::mesh_file(i, "vertices")), |w| {
            write_chunk(w, &tags::VERTICES, &data.positions)
        })?;
        write_file(&dir.join(files::mesh_file(i, "normals")), |w| {
            write_chunk(w, &tags::NORMALS, &data.normals)
        })?;
        write_file(&dir.join(files::mesh_file(i, "indices")), |w| {
            write_chunk(w, &tags::INDICES, &data.indices)
        })?;
        write_file(&dir.join(files::mesh_file(i, "weights")), |w| {
            write_chunk(w, &tags::WEIGHTS, &data.weights)
        })?;
        write_file(&dir.join(files::mesh_file(i, "ids")), |w| {
            write_chunk(w, &tags::IDS, &data.ids)
        })?;
        write_file(&dir.join(files::mesh_file(i, "bones")), |w| {
            write_chunk(w, &tags::BONES, &bones)
        })?;
    }

    let summary = ExportSummary {
        nodes: node_records.len(),
        clips: clip_names.len(),
        tracks: track_records.len(),
        keys: key_records.len(),
        meshes: scene.meshes.len(),
    };
    log::info!("Exported {:?} to {}", summary, dir.display());
    Ok(summary)
}

fn write_file<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<()>,
{
    let mut writer = BufWriter::new(File::create(path)?);
    write(&mut writer)?;
    writer.flush()?;
    Ok(())
}
