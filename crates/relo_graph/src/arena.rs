//! Append-only node storage with a coordinate index.
//!
//! A node is stored once per [`Module`]; interning the same coordinate again
//! hands back the existing [`NodeId`]. Nothing is ever removed, so every ID
//! stays valid for the lifetime of the arena. Edges are stored as IDs, which
//! keeps the graph free of reference cycles.

use std::collections::HashMap;
use std::ops::Index;

use relo_common::Module;

use crate::graph::GraphNode;
use crate::ids::NodeId;

/// Dense storage of [`GraphNode`]s addressed by [`NodeId`].
#[derive(Debug, Clone, Default)]
pub struct Arena {
    nodes: Vec<GraphNode>,
    by_module: HashMap<Module, NodeId>,
}

impl Arena {
    /// Creates an empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `node` unless its module is already present. Returns the ID of
    /// the stored node and whether it was newly added.
    pub fn intern(&mut self, node: GraphNode) -> (NodeId, bool) {
        if let Some(&id) = self.by_module.get(&node.module) {
            return (id, false);
        }
        let id = NodeId::from_index(self.nodes.len());
        self.by_module.insert(node.module.clone(), id);
        self.nodes.push(node);
        (id, true)
    }

    /// The ID of `module`, if stored.
    pub fn lookup(&self, module: &Module) -> Option<NodeId> {
        self.by_module.get(module).copied()
    }

    /// The node with `id`, or `None` for an ID from another arena.
    pub fn get(&self, id: NodeId) -> Option<&GraphNode> {
        self.nodes.get(id.index())
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> Option<&mut GraphNode> {
        self.nodes.get_mut(id.index())
    }

    /// Number of stored nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// `(id, node)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &GraphNode)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (NodeId::from_index(i), node))
    }
}

/// Panics on an ID from another arena.
impl Index<NodeId> for Arena {
    type Output = GraphNode;

    fn index(&self, id: NodeId) -> &GraphNode {
        &self.nodes[id.index()]
    }
}
