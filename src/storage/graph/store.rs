use std::sync::Arc;

use tracing::trace;

use crate::storage::avl::AvlTree;
use crate::storage::meta::MetaEdgeBuilder;
use crate::storage::metrics::GraphMetrics;
use crate::storage::types::{Edge, EdgeView, MetaEdge, Node, NodeKind};
use crate::types::{EdgeId, GraphError, NodeId, Result};

use super::helpers::{by_edge, by_node, edge_tree, meta_tree, node_tree};

/// Stored state of one node.
///
/// The parent is held by identifier so that child and parent never own each other.
pub(crate) struct NodeRecord {
    pub(crate) id: NodeId,
    pub(crate) parent: Option<NodeId>,
    pub(crate) level: u32,
    pub(crate) group: bool,
    pub(crate) expanded: bool,
    pub(crate) children: AvlTree<NodeId>,
    pub(crate) outgoing: AvlTree<EdgeId>,
    pub(crate) incoming: AvlTree<EdgeId>,
}

impl NodeRecord {
    pub(crate) fn leaf(id: NodeId) -> Self {
        Self {
            id,
            parent: None,
            level: 0,
            group: false,
            expanded: false,
            children: AvlTree::new(),
            outgoing: AvlTree::new(),
            incoming: AvlTree::new(),
        }
    }

    pub(crate) fn snapshot(&self) -> Node {
        Node {
            id: self.id,
            parent: self.parent,
            level: self.level,
            kind: if self.group {
                NodeKind::Group
            } else {
                NodeKind::Leaf
            },
            expanded: self.expanded,
            child_count: self.children.len(),
        }
    }
}

/// Shared graph state guarded by the graph's read/write lock.
pub(crate) struct GraphStore {
    pub(crate) nodes: AvlTree<NodeRecord>,
    pub(crate) edges: AvlTree<Edge>,
    pub(crate) top_level: AvlTree<NodeId>,
    pub(crate) metas: AvlTree<MetaEdge>,
    pub(crate) builder: Arc<dyn MetaEdgeBuilder>,
    pub(crate) metrics: Arc<dyn GraphMetrics>,
}

impl GraphStore {
    pub(crate) fn new(builder: Arc<dyn MetaEdgeBuilder>, metrics: Arc<dyn GraphMetrics>) -> Self {
        Self {
            nodes: node_tree(),
            edges: edge_tree(),
            top_level: AvlTree::new(),
            metas: meta_tree(),
            builder,
            metrics,
        }
    }

    pub(crate) fn record(&self, id: NodeId) -> Option<&NodeRecord> {
        self.nodes.find_by(by_node(id))
    }

    pub(crate) fn record_mut(&mut self, id: NodeId) -> Option<&mut NodeRecord> {
        self.nodes.find_mut_by(by_node(id))
    }

    pub(crate) fn require_node(&self, id: NodeId) -> Result<&NodeRecord> {
        self.record(id).ok_or(GraphError::NotFound("node"))
    }

    pub(crate) fn require_edge(&self, id: EdgeId) -> Result<&Edge> {
        self.edges.find_by(by_edge(id)).ok_or(GraphError::NotFound("edge"))
    }

    pub(crate) fn insert_leaf(&mut self, id: NodeId) {
        self.nodes.insert(NodeRecord::leaf(id));
        self.top_level.insert(id);
        self.metrics.node_created();
    }

    /// Adds `id` below `parent`, or to the top level.
    pub(crate) fn attach(&mut self, parent: Option<NodeId>, id: NodeId) {
        match parent {
            Some(parent) => {
                if let Some(record) = self.record_mut(parent) {
                    record.children.insert(id);
                }
            }
            None => {
                self.top_level.insert(id);
            }
        }
    }

    pub(crate) fn detach(&mut self, parent: Option<NodeId>, id: NodeId) {
        match parent {
            Some(parent) => {
                if let Some(record) = self.record_mut(parent) {
                    record.children.remove(&id);
                }
            }
            None => {
                self.top_level.remove(&id);
            }
        }
    }

    /// Recomputes levels from `start` up to the top of the cluster tree.
    pub(crate) fn recompute_levels(&mut self, start: Option<NodeId>) {
        let mut at = start;
        while let Some(id) = at {
            let Some(record) = self.record(id) else {
                break;
            };
            let level = record
                .children
                .iter()
                .filter_map(|child| self.record(*child))
                .map(|child| child.level + 1)
                .max()
                .unwrap_or(0);
            at = record.parent;
            if let Some(record) = self.record_mut(id) {
                record.level = level;
            }
        }
    }

    /// Inserts a new edge and folds it into its meta-edge when one represents it.
    pub(crate) fn insert_edge(&mut self, edge: Edge) {
        self.edges.insert(edge);
        if let Some(record) = self.record_mut(edge.source) {
            record.outgoing.insert(edge.id);
        }
        if let Some(record) = self.record_mut(edge.target) {
            record.incoming.insert(edge.id);
        }
        if let EdgeView::Meta(source, target) = self.edge_view(&edge) {
            self.push_meta(&edge, source, target);
        }
        self.metrics.edge_created();
    }

    /// Removes an edge after pulling it from the meta-edge representing it.
    pub(crate) fn remove_edge_inner(&mut self, id: EdgeId) -> Result<Edge> {
        let edge = *self.require_edge(id)?;
        if let EdgeView::Meta(source, target) = self.edge_view(&edge) {
            self.pull_meta(&edge, source, target)?;
        }
        if let Some(record) = self.record_mut(edge.source) {
            record.outgoing.remove(&id);
        }
        if let Some(record) = self.record_mut(edge.target) {
            record.incoming.remove(&id);
        }
        self.edges.remove_by(by_edge(id));
        self.metrics.edge_removed();
        trace!(edge = %id, "edge removed");
        Ok(edge)
    }

    /// Replaces an edge's weight, keeping its meta-edge consistent.
    pub(crate) fn set_weight_inner(&mut self, id: EdgeId, weight: f64) -> Result<f64> {
        let old = *self.require_edge(id)?;
        let view = self.edge_view(&old);
        if let EdgeView::Meta(source, target) = view {
            self.pull_meta(&old, source, target)?;
        }
        let updated = Edge { weight, ..old };
        if let Some(edge) = self.edges.find_mut_by(by_edge(id)) {
            edge.weight = weight;
        }
        if let EdgeView::Meta(source, target) = view {
            self.push_meta(&updated, source, target);
        }
        Ok(old.weight)
    }

    /// Removes a node that has no children, together with its incident edges.
    pub(crate) fn remove_node_inner(&mut self, id: NodeId) -> Result<Node> {
        let record = self.require_node(id)?;
        if !record.children.is_empty() {
            return Err(GraphError::invalid(format!(
                "node {id} has children; ungroup first"
            )));
        }
        let snapshot = record.snapshot();
        let incident = self.incident_edges([id]);
        for edge in incident {
            self.remove_edge_inner(edge)?;
        }
        self.detach(snapshot.parent, id);
        self.nodes.remove_by(by_node(id));
        self.recompute_levels(snapshot.parent);
        self.metrics.node_removed();
        trace!(node = %id, "node removed");
        Ok(snapshot)
    }
}
