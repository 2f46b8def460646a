//! Scene graph node types

use glam::Mat4;

/// Stable index of a node inside its `SceneGraph` arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SceneNodeId(pub u32);

impl SceneNodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A single node in the scene graph.
#[derive(Clone, Debug)]
pub struct SceneNode {
    pub id: SceneNodeId,
    pub name: String,
    pub parent: Option<SceneNodeId>,
    pub children: Vec<SceneNodeId>,
    /// Rest transform relative to the parent.
    pub local_transform: Mat4,
}

impl SceneNode {
    /// Create a new detached scene node.
    pub fn new(id: SceneNodeId, name: impl Into<String>, local_transform: Mat4) -> Self {
        Self {
            id,
            name: name.into(),
            parent: None,
            children: Vec::new(),
            local_transform,
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scene_node_id_ordering() {
        assert!(SceneNodeId(1) < SceneNodeId(2));
        assert_eq!(SceneNodeId(7).index(), 7);
    }

    #[test]
    fn test_scene_node_new() {
        let node = SceneNode::new(SceneNodeId(0), "root", Mat4::IDENTITY);
        assert_eq!(node.name, "root");
        assert!(node.is_root());
        assert!(node.children.is_empty());
        assert_eq!(node.local_transform, Mat4::IDENTITY);
    }
}
