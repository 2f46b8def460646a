//! Immutable CPU-side node hierarchy.
//!
//! Built once from the import boundary into an arena addressed by
//! `SceneNodeId`. Nodes are stored in depth-first pre-order, so the root is
//! always `SceneNodeId(0)` and every parent precedes its children.

use std::collections::{HashMap, HashSet, VecDeque};

use glam::Mat4;

use crate::import::ImportedNode;

use super::node::{SceneNode, SceneNodeId};

/// Arena-backed node hierarchy, read-only after construction.
#[derive(Clone, Debug)]
pub struct SceneGraph {
    nodes: Vec<SceneNode>,
    names: HashMap<String, SceneNodeId>,
    duplicate_names: HashSet<String>,
}

impl SceneGraph {
    /// Copy the imported hierarchy into an owned arena.
    pub fn from_imported(root: &ImportedNode) -> Self {
        let mut graph = Self {
            nodes: Vec::new(),
            names: HashMap::new(),
            duplicate_names: HashSet::new(),
        };

        // Children pushed in reverse so they pop in their original order
        let mut stack: Vec<(&ImportedNode, Option<SceneNodeId>)> = vec![(root, None)];
        while let Some((imported, parent)) = stack.pop() {
            let id = graph.push_node(&imported.name, imported.transform, parent);
            for child in imported.children.iter().rev() {
                stack.push((child, Some(id)));
            }
        }

        if !graph.duplicate_names.is_empty() {
            log::warn!(
                "Scene graph has {} duplicated node name(s): {:?}",
                graph.duplicate_names.len(),
                graph.duplicate_names
            );
        }

        graph
    }

    fn push_node(&mut self, name: &str, transform: Mat4, parent: Option<SceneNodeId>) -> SceneNodeId {
        let id = SceneNodeId(self.nodes.len() as u32);
        let mut node = SceneNode::new(id, name, transform);
        node.parent = parent;
        self.nodes.push(node);

        if let Some(parent) = parent {
            self.nodes[parent.index()].children.push(id);
        }

        if self.names.contains_key(name) {
            self.duplicate_names.insert(name.to_string());
        } else {
            self.names.insert(name.to_string(), id);
        }

        id
    }

    /// Get the root node ID.
    pub fn root(&self) -> SceneNodeId {
        SceneNodeId(0)
    }

    /// Get an immutable reference to a node.
    pub fn get(&self, id: SceneNodeId) -> Option<&SceneNode> {
        self.nodes.get(id.index())
    }

    pub fn name(&self, id: SceneNodeId) -> &str {
        &self.nodes[id.index()].name
    }

    pub fn local_transform(&self, id: SceneNodeId) -> Mat4 {
        self.nodes[id.index()].local_transform
    }

    pub fn parent(&self, id: SceneNodeId) -> Option<SceneNodeId> {
        self.nodes.get(id.index()).and_then(|n| n.parent)
    }

    /// Iterate over the children of a node.
    pub fn children(&self, id: SceneNodeId) -> impl DoubleEndedIterator<Item = SceneNodeId> + '_ {
        self.nodes
            .get(id.index())
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
            .iter()
            .copied()
    }

    /// First node (in pre-order) carrying `name`.
    pub fn find(&self, name: &str) -> Option<SceneNodeId> {
        self.names.get(name).copied()
    }

    /// Whether more than one node carries `name`.
    pub fn is_ambiguous(&self, name: &str) -> bool {
        self.duplicate_names.contains(name)
    }

    /// Total number of nodes in the graph.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes in pre-order.
    pub fn iter(&self) -> impl Iterator<Item = &SceneNode> {
        self.nodes.iter()
    }

    /// Node IDs in level order (breadth first from the root).
    pub fn breadth_first(&self) -> Vec<SceneNodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        if self.nodes.is_empty() {
            return order;
        }

        let mut queue = VecDeque::from([self.root()]);
        while let Some(id) = queue.pop_front() {
            order.push(id);
            queue.extend(self.children(id));
        }
        order
    }
}
