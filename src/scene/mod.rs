//! Scene hierarchy shared by every mesh of an asset

pub mod graph;
pub mod node;

pub use graph::SceneGraph;
pub use node::{SceneNode, SceneNodeId};
