use tracing::debug;

use super::locking::LockSet;
use super::HierarchicalGraph;
use crate::storage::types::Node;
use crate::types::{NodeId, Result};

impl HierarchicalGraph {
    /// Creates a leaf node at the top level of the cluster tree.
    pub fn add_node(&self) -> NodeId {
        let _locks = LockSet::root(&self.locks);
        let id = self.allocate_node_id();
        self.store.write().insert_leaf(id);
        debug!(node = %id, "node added");
        id
    }

    /// Returns a snapshot of the node's hierarchy state.
    pub fn node(&self, id: NodeId) -> Result<Node> {
        Ok(self.store.read().require_node(id)?.snapshot())
    }

    /// Returns whether the node exists.
    pub fn contains_node(&self, id: NodeId) -> bool {
        self.store.read().record(id).is_some()
    }

    /// Removes a node and all edges incident to it.
    ///
    /// Nodes with children are rejected; ungroup them first.
    pub fn remove_node(&self, id: NodeId) -> Result<Node> {
        let mut locks = LockSet::root(&self.locks);
        let scopes = self.store.read().node_scopes(id)?;
        locks.extend(scopes)?;
        let removed = self.store.write().remove_node_inner(id)?;
        debug!(node = %id, "node removed");
        Ok(removed)
    }

    /// Parent group of the node, `None` at the top level.
    pub fn parent(&self, id: NodeId) -> Result<Option<NodeId>> {
        Ok(self.store.read().require_node(id)?.parent)
    }

    /// Height of the node in the cluster tree; 0 for leaves.
    pub fn level(&self, id: NodeId) -> Result<u32> {
        Ok(self.store.read().require_node(id)?.level)
    }

    /// The visible node standing in for `id`: its topmost retracted ancestor, or
    /// `id` itself.
    pub fn representative(&self, id: NodeId) -> Result<NodeId> {
        let store = self.store.read();
        store.require_node(id)?;
        Ok(store.representative(id))
    }

    /// Returns whether the node is currently shown.
    pub fn is_visible(&self, id: NodeId) -> Result<bool> {
        let store = self.store.read();
        store.require_node(id)?;
        Ok(store.is_visible(id))
    }

    /// Number of nodes of any kind.
    pub fn node_count(&self) -> usize {
        self.store.read().nodes.len()
    }
}
