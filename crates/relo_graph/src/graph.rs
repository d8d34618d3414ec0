//! The resolved module DAG.

use std::collections::HashSet;
use std::path::PathBuf;

use relo_common::Module;

use crate::arena::Arena;
use crate::ids::NodeId;

/// One resolved module with its artifacts and direct dependencies.
#[derive(Debug, Clone)]
pub struct GraphNode {
    /// The module's original coordinate.
    pub module: Module,
    /// The binary artifact to relocate.
    pub artifact: PathBuf,
    /// The matching source archive, when the host could provide one.
    pub sources: Option<PathBuf>,
    /// Whether the artifact is already relocated and must be passed through.
    pub already_remapped: bool,
    /// Direct dependencies, de-duplicated, in declaration order.
    pub dependencies: Vec<NodeId>,
}

/// A de-duplicated, acyclic module graph.
///
/// Every distinct [`Module`] appears exactly once; nodes reachable through
/// several parents share one [`NodeId`]. Nodes are stored in post-order, so
/// every node's dependencies have smaller IDs than the node itself.
#[derive(Debug, Clone, Default)]
pub struct ModuleGraph {
    nodes: Arena,
    roots: Vec<NodeId>,
}

impl ModuleGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node whose dependencies are already present.
    ///
    /// Returns the existing ID if the module was added before.
    pub(crate) fn insert(&mut self, node: GraphNode) -> NodeId {
        self.nodes.intern(node).0
    }

    pub(crate) fn add_root(&mut self, id: NodeId) {
        if !self.roots.contains(&id) {
            self.roots.push(id);
        }
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Option<&mut GraphNode> {
        self.nodes.get_mut(id)
    }

    /// Returns the node with the given ID.
    pub fn node(&self, id: NodeId) -> &GraphNode {
        &self.nodes[id]
    }

    /// Looks up the node ID for a coordinate.
    pub fn lookup(&self, module: &Module) -> Option<NodeId> {
        self.nodes.lookup(module)
    }

    /// Iterates over all nodes in post-order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &GraphNode)> {
        self.nodes.iter()
    }

    /// The first-level nodes (children of the synthetic root).
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Every module in the graph, in post-order.
    pub fn modules(&self) -> Vec<Module> {
        self.nodes.iter().map(|(_, n)| n.module.clone()).collect()
    }

    /// Returns the number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns the transitive dependency closure of `id`, excluding `id`
    /// itself, de-duplicated and in depth-first first-visit order.
    pub fn transitive_dependencies(&self, id: NodeId) -> Vec<NodeId> {
        let mut seen = HashSet::new();
        let mut order = Vec::new();
        let mut stack: Vec<NodeId> = self.nodes[id].dependencies.iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            if next == id || !seen.insert(next) {
                continue;
            }
            order.push(next);
            stack.extend(self.nodes[next].dependencies.iter().rev().copied());
        }
        order
    }
}
