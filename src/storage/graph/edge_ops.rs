use tracing::debug;

use super::helpers::by_endpoints;
use super::locking::LockSet;
use super::HierarchicalGraph;
use crate::storage::types::{Edge, EdgeView, MetaEdge};
use crate::types::{EdgeId, GraphError, NodeId, Result};

fn check_weight(weight: f64) -> Result<()> {
    if weight.is_finite() {
        Ok(())
    } else {
        Err(GraphError::invalid(format!(
            "edge weight must be finite, got {weight}"
        )))
    }
}

impl HierarchicalGraph {
    /// Creates a directed edge; both endpoints must exist.
    ///
    /// When an endpoint is hidden inside a retracted group the edge is folded into
    /// the meta-edge between the representatives.
    pub fn add_edge(&self, source: NodeId, target: NodeId, weight: f64) -> Result<EdgeId> {
        check_weight(weight)?;
        let mut locks = LockSet::root(&self.locks);
        locks.extend([source.raw(), target.raw()])?;
        let mut store = self.store.write();
        store.require_node(source)?;
        store.require_node(target)?;
        let id = self.allocate_edge_id();
        store.insert_edge(Edge {
            id,
            source,
            target,
            weight,
        });
        debug!(edge = %id, %source, %target, weight, "edge added");
        Ok(id)
    }

    /// Returns a copy of the edge.
    pub fn edge(&self, id: EdgeId) -> Result<Edge> {
        Ok(*self.store.read().require_edge(id)?)
    }

    /// How the edge currently appears to traversals.
    pub fn edge_view(&self, id: EdgeId) -> Result<EdgeView> {
        let store = self.store.read();
        let edge = store.require_edge(id)?;
        Ok(store.edge_view(edge))
    }

    /// Removes an edge, pulling it from its meta-edge first.
    pub fn remove_edge(&self, id: EdgeId) -> Result<Edge> {
        let mut locks = LockSet::root(&self.locks);
        let scopes = self.store.read().edge_scopes(id)?;
        locks.extend(scopes)?;
        let removed = self.store.write().remove_edge_inner(id)?;
        debug!(edge = %id, "edge removed");
        Ok(removed)
    }

    /// Replaces the edge's weight and returns the previous one.
    pub fn set_edge_weight(&self, id: EdgeId, weight: f64) -> Result<f64> {
        check_weight(weight)?;
        let mut locks = LockSet::root(&self.locks);
        let scopes = self.store.read().edge_scopes(id)?;
        locks.extend(scopes)?;
        self.store.write().set_weight_inner(id, weight)
    }

    /// The meta-edge from `source` to `target`, if one currently exists.
    pub fn meta_edge(&self, source: NodeId, target: NodeId) -> Option<MetaEdge> {
        self.store
            .read()
            .metas
            .find_by(by_endpoints(source, target))
            .copied()
    }

    /// Aggregated weight of the meta-edge from `source` to `target`.
    pub fn meta_edge_weight(&self, source: NodeId, target: NodeId) -> Option<f64> {
        self.meta_edge(source, target).map(|meta| meta.weight)
    }

    /// Number of underlying edges.
    pub fn edge_count(&self) -> usize {
        self.store.read().edges.len()
    }

    /// Number of live meta-edges.
    pub fn meta_edge_count(&self) -> usize {
        self.store.read().metas.len()
    }
}
