//! skinrig - Skeletal animation playback for imported 3D assets
//!
//! Imports a scene (hierarchy, meshes with bone weights, keyframed clips),
//! evaluates the bone palette per tick and feeds it to a GPU skinning pass.
//! A chunked binary export lets rigs be reloaded without the importer.

pub mod core;
pub mod scene;
pub mod import;
pub mod animation;
pub mod render;
pub mod export;
