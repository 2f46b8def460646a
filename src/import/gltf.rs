//! glTF / GLB adapter
//!
//! Converts a glTF document into the import boundary types. Keyframes are
//! taken one per frame in sampler order; sampler input times are ignored.

use std::collections::BTreeMap;
use std::path::Path;

use glam::{Mat4, Quat, Vec3};
use gltf::animation::Interpolation;
use gltf::animation::util::ReadOutputs;
use gltf::mesh::util::{ReadIndices, ReadJoints, ReadWeights};

use crate::core::error::Error;
use crate::core::types::Result;

use super::{
    ImportedAnimation, ImportedBone, ImportedChannel, ImportedMesh, ImportedNode, ImportedScene,
    VertexWeight,
};

/// Name given to the node that parents several scene roots
pub const SYNTHETIC_ROOT: &str = "root";

/// Load a `.gltf` or `.glb` file
pub fn load(path: &Path) -> Result<ImportedScene> {
    let label = path.display().to_string();
    let (doc, buffers, _images) =
        gltf::import(path).map_err(|e| asset_error(&label, e.to_string()))?;
    let scene = convert(&label, &doc, &buffers)?;

    log::info!(
        "Imported {}: {} mesh(es), {} animation(s)",
        label,
        scene.meshes.len(),
        scene.animations.len()
    );
    Ok(scene)
}

/// Load from an in-memory `.gltf` or `.glb` image
pub fn load_slice(label: &str, bytes: &[u8]) -> Result<ImportedScene> {
    let (doc, buffers, _images) =
        gltf::import_slice(bytes).map_err(|e| asset_error(label, e.to_string()))?;
    convert(label, &doc, &buffers)
}

fn asset_error(path: &str, reason: impl Into<String>) -> Error {
    Error::AssetLoad {
        path: path.to_string(),
        reason: reason.into(),
    }
}

fn convert(label: &str, doc: &gltf::Document, buffers: &[gltf::buffer::Data]) -> Result<ImportedScene> {
    let scene = doc
        .default_scene()
        .or_else(|| doc.scenes().next())
        .ok_or_else(|| asset_error(label, "document has no scene"))?;

    let mut meshes = Vec::new();
    let mut roots = Vec::new();
    for node in scene.nodes() {
        roots.push(convert_node(label, &node, buffers, &mut meshes)?);
    }

    let root = if roots.len() == 1 {
        roots.remove(0)
    } else {
        let mut root = ImportedNode::new(SYNTHETIC_ROOT, Mat4::IDENTITY);
        root.children = roots;
        root
    };

    let animations = doc
        .animations()
        .map(|anim| convert_animation(&anim, buffers))
        .collect();

    Ok(ImportedScene {
        root,
        meshes,
        animations,
    })
}

fn node_name(node: &gltf::Node) -> String {
    node.name()
        .map(str::to_string)
        .unwrap_or_else(|| format!("node{}", node.index()))
}

fn convert_node(
    label: &str,
    node: &gltf::Node,
    buffers: &[gltf::buffer::Data],
    meshes: &mut Vec<ImportedMesh>,
) -> Result<ImportedNode> {
    if let Some(mesh) = node.mesh() {
        convert_mesh(label, &mesh, node.skin().as_ref(), buffers, meshes)?;
    }

    let mut imported = ImportedNode::new(
        node_name(node),
        Mat4::from_cols_array_2d(&node.transform().matrix()),
    );
    for child in node.children() {
        imported
            .children
            .push(convert_node(label, &child, buffers, meshes)?);
    }
    Ok(imported)
}

fn convert_mesh(
    label: &str,
    mesh: &gltf::Mesh,
    skin: Option<&gltf::Skin>,
    buffers: &[gltf::buffer::Data],
    meshes: &mut Vec<ImportedMesh>,
) -> Result<()> {
    let base_name = mesh
        .name()
        .map(str::to_string)
        .unwrap_or_else(|| format!("mesh{}", mesh.index()));
    let primitive_count = mesh.primitives().count();

    for prim in mesh.primitives() {
        if prim.mode() != gltf::mesh::Mode::Triangles {
            log::warn!("{}: skipping non-triangle primitive of '{}'", label, base_name);
            continue;
        }

        let reader = prim.reader(|b| buffers.get(b.index()).map(|bb| bb.0.as_slice()));
        let Some(positions) = reader.read_positions() else {
            log::warn!("{}: primitive of '{}' has no positions", label, base_name);
            continue;
        };
        let positions: Vec<Vec3> = positions.map(Vec3::from).collect();
        let normals: Vec<Vec3> = reader
            .read_normals()
            .map(|it| it.map(Vec3::from).collect())
            .unwrap_or_default();

        let indices: Vec<u32> = match reader.read_indices() {
            Some(ReadIndices::U8(it)) => it.map(|v| v as u32).collect(),
            Some(ReadIndices::U16(it)) => it.map(|v| v as u32).collect(),
            Some(ReadIndices::U32(it)) => it.collect(),
            None => (0..positions.len() as u32).collect(),
        };
        let faces = indices.chunks_exact(3).map(|tri| tri.to_vec()).collect();

        let bones = match skin {
            Some(skin) => {
                let joints: Vec<[u16; 4]> = match reader.read_joints(0) {
                    Some(ReadJoints::U8(it)) => it
                        .map(|v| [v[0] as u16, v[1] as u16, v[2] as u16, v[3] as u16])
                        .collect(),
                    Some(ReadJoints::U16(it)) => it.collect(),
                    None => Vec::new(),
                };
                let weights: Vec<[f32; 4]> = match reader.read_weights(0) {
                    Some(ReadWeights::F32(it)) => it.collect(),
                    Some(ReadWeights::U16(it)) => it
                        .map(|v| v.map(|w| w as f32 / 65535.0))
                        .collect(),
                    Some(ReadWeights::U8(it)) => it
                        .map(|v| v.map(|w| w as f32 / 255.0))
                        .collect(),
                    None => Vec::new(),
                };
                skin_bones(label, skin, buffers, &joints, &weights)?
            }
            None => Vec::new(),
        };

        let name = if primitive_count > 1 {
            format!("{}.{}", base_name, prim.index())
        } else {
            base_name.clone()
        };

        meshes.push(ImportedMesh {
            name,
            positions,
            normals,
            faces,
            bones,
        });
    }

    Ok(())
}

fn skin_bones(
    label: &str,
    skin: &gltf::Skin,
    buffers: &[gltf::buffer::Data],
    joints: &[[u16; 4]],
    weights: &[[f32; 4]],
) -> Result<Vec<ImportedBone>> {
    let joint_names: Vec<String> = skin.joints().map(|j| node_name(&j)).collect();
    let reader = skin.reader(|b| buffers.get(b.index()).map(|bb| bb.0.as_slice()));
    let offsets: Vec<Mat4> = match reader.read_inverse_bind_matrices() {
        Some(it) => it.map(|m| Mat4::from_cols_array_2d(&m)).collect(),
        None => vec![Mat4::IDENTITY; joint_names.len()],
    };
    if offsets.len() != joint_names.len() {
        return Err(asset_error(
            label,
            format!(
                "skin has {} joints but {} inverse bind matrices",
                joint_names.len(),
                offsets.len()
            ),
        ));
    }

    let per_joint = transpose_weights(joints, weights, joint_names.len())
        .map_err(|reason| asset_error(label, reason))?;

    Ok(joint_names
        .into_iter()
        .zip(offsets)
        .zip(per_joint)
        .map(|((name, offset), weights)| ImportedBone {
            name,
            offset,
            weights,
        })
        .collect())
}

/// Turn per-vertex (joint, weight) slots into per-joint vertex weight lists
fn transpose_weights(
    joints: &[[u16; 4]],
    weights: &[[f32; 4]],
    joint_count: usize,
) -> std::result::Result<Vec<Vec<VertexWeight>>, String> {
    let mut per_joint = vec![Vec::new(); joint_count];
    for (vertex, (ids, ws)) in joints.iter().zip(weights).enumerate() {
        for (joint, weight) in ids.iter().zip(ws) {
            if *weight <= 0.0 {
                continue;
            }
            let list = per_joint
                .get_mut(*joint as usize)
                .ok_or_else(|| format!("vertex {} references joint {} of {}", vertex, joint, joint_count))?;
            list.push(VertexWeight::new(vertex as u32, *weight));
        }
    }
    Ok(per_joint)
}

#[derive(Default)]
struct NodeChannels {
    name: String,
    rest: (Vec3, Quat, Vec3),
    translations: Vec<Vec3>,
    rotations: Vec<Quat>,
    scales: Vec<Vec3>,
}

fn convert_animation(anim: &gltf::Animation, buffers: &[gltf::buffer::Data]) -> ImportedAnimation {
    let name = anim
        .name()
        .map(str::to_string)
        .unwrap_or_else(|| format!("animation{}", anim.index()));

    // Keyed by node index so channel order follows the document
    let mut nodes: BTreeMap<usize, NodeChannels> = BTreeMap::new();
    for channel in anim.channels() {
        let target = channel.target().node();
        let cubic = channel.sampler().interpolation() == Interpolation::CubicSpline;
        let reader = channel.reader(|b| buffers.get(b.index()).map(|bb| bb.0.as_slice()));
        let Some(outputs) = reader.read_outputs() else {
            continue;
        };
        // Morph weights carry no transform; an entry for them would be a 0-key track
        if let ReadOutputs::MorphTargetWeights(_) = outputs {
            log::debug!(
                "Animation '{}': ignoring morph target weights of '{}'",
                name,
                node_name(&target)
            );
            continue;
        }

        let entry = nodes.entry(target.index()).or_insert_with(|| {
            let (t, r, s) = target.transform().decomposed();
            NodeChannels {
                name: node_name(&target),
                rest: (Vec3::from(t), Quat::from_array(r), Vec3::from(s)),
                ..Default::default()
            }
        });

        match outputs {
            ReadOutputs::Translations(it) => {
                entry.translations = spline_values(it.map(Vec3::from).collect(), cubic);
            }
            ReadOutputs::Rotations(it) => {
                let values = it.into_f32().map(|r| Quat::from_array(r).normalize()).collect();
                entry.rotations = spline_values(values, cubic);
            }
            ReadOutputs::Scales(it) => {
                entry.scales = spline_values(it.map(Vec3::from).collect(), cubic);
            }
            ReadOutputs::MorphTargetWeights(_) => {}
        }
    }

    let channels = nodes
        .into_values()
        .map(merge_channel)
        .filter(|channel| {
            let keep = !channel.positions.is_empty();
            if !keep {
                log::warn!("Animation '{}': channel for '{}' has no keys, dropping", name, channel.node_name);
            }
            keep
        })
        .collect();
    ImportedAnimation { name, channels }
}

/// Cubic spline samplers store (in-tangent, value, out-tangent) per key
fn spline_values<T: Copy>(values: Vec<T>, cubic: bool) -> Vec<T> {
    if cubic {
        values.chunks_exact(3).map(|key| key[1]).collect()
    } else {
        values
    }
}

/// Align T/R/S to one key count, filling absent properties from the rest pose
fn merge_channel(node: NodeChannels) -> ImportedChannel {
    let key_count = node
        .translations
        .len()
        .max(node.rotations.len())
        .max(node.scales.len());
    let (rest_t, rest_r, rest_s) = node.rest;

    ImportedChannel {
        node_name: node.name,
        positions: hold_last(node.translations, key_count, rest_t),
        rotations: hold_last(node.rotations, key_count, rest_r),
        scales: hold_last(node.scales, key_count, rest_s),
    }
}

fn hold_last<T: Copy>(mut values: Vec<T>, len: usize, rest: T) -> Vec<T> {
    let fill = values.last().copied().unwrap_or(rest);
    values.resize(len, fill);
    values
}
