use serde::{Deserialize, Serialize};

use crate::types::{EdgeId, NodeId};

/// Position of a node in the cluster tree.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum NodeKind {
    /// Level-0 node without children.
    Leaf,
    /// Node representing the merger of its children.
    Group,
}

/// Snapshot of a node's hierarchy state.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Node identifier.
    pub id: NodeId,
    /// Parent group, `None` at the top level.
    pub parent: Option<NodeId>,
    /// Height in the cluster tree; 0 for leaves.
    pub level: u32,
    /// Leaf or group.
    pub kind: NodeKind,
    /// For groups, whether the children are shown instead of the group.
    pub expanded: bool,
    /// Number of direct children.
    pub child_count: usize,
}

impl Node {
    /// Returns `true` when the node has children.
    pub fn is_group(&self) -> bool {
        self.kind == NodeKind::Group
    }

    /// Returns `true` when the node belongs to a group.
    pub fn is_grouped(&self) -> bool {
        self.parent.is_some()
    }
}

/// Directed weighted edge between two nodes.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    /// Edge identifier.
    pub id: EdgeId,
    /// Source node.
    pub source: NodeId,
    /// Target node.
    pub target: NodeId,
    /// Scalar weight.
    pub weight: f64,
}

/// Synthetic edge summarizing the underlying edges between two visible nodes,
/// at least one of which stands in for a retracted group.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MetaEdge {
    /// Visible representative of the underlying sources.
    pub source: NodeId,
    /// Visible representative of the underlying targets.
    pub target: NodeId,
    /// Aggregated weight.
    pub weight: f64,
    /// Number of underlying edges represented.
    pub count: usize,
}

impl MetaEdge {
    /// Creates an empty meta-edge between two representatives.
    pub fn new(source: NodeId, target: NodeId) -> Self {
        Self {
            source,
            target,
            weight: 0.0,
            count: 0,
        }
    }

    /// Returns whether either endpoint of the meta-edge is `source` or `target`.
    pub fn touches(&self, source: NodeId, target: NodeId) -> bool {
        source == self.source
            || source == self.target
            || target == self.source
            || target == self.target
    }
}

/// How an edge currently appears to traversals.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EdgeView {
    /// Both endpoints are visible as themselves.
    Direct,
    /// Represented by the meta-edge between the two representatives.
    Meta(NodeId, NodeId),
    /// Internal to a retracted group, or attached to an expanded group.
    Hidden,
}

/// Aggregate counters for a graph.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct GraphStats {
    /// Nodes of any kind.
    pub nodes: usize,
    /// Group nodes.
    pub groups: usize,
    /// Nodes currently visible.
    pub visible_nodes: usize,
    /// Underlying edges.
    pub edges: usize,
    /// Live meta-edges.
    pub meta_edges: usize,
    /// Highest level in the cluster tree.
    pub max_level: u32,
}
