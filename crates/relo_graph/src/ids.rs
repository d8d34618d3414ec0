//! Node identifiers for the module graph.

/// Opaque, copyable ID for a node in a [`ModuleGraph`](crate::ModuleGraph).
///
/// Only meaningful for the graph that produced it. IDs follow insertion
/// order, which is post-order for a resolved graph.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct NodeId(u32);

impl NodeId {
    pub(crate) fn from_index(index: usize) -> Self {
        Self(index as u32)
    }

    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }

    /// Returns the raw `u32` index.
    pub fn as_raw(self) -> u32 {
        self.0
    }
}
