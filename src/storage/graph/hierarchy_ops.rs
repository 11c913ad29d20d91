use rustc_hash::FxHashSet;
use tracing::debug;

use super::helpers::by_node;
use super::locking::LockSet;
use super::store::NodeRecord;
use super::{level_lock, HierarchicalGraph};
use crate::storage::avl::AvlTree;
use crate::types::{GraphError, NodeId, Result};

impl HierarchicalGraph {
    /// Merges `members` into a new retracted group and returns its identifier.
    ///
    /// Members must be distinct, exist and share one parent (or all sit at the top
    /// level). The group takes their place under that parent, and edges leaving the
    /// group are folded into meta-edges.
    pub fn group_nodes(&self, members: &[NodeId]) -> Result<NodeId> {
        let Some(&first) = members.first() else {
            return Err(GraphError::invalid("cannot group an empty set of nodes"));
        };
        let mut seen = FxHashSet::default();
        if let Some(dup) = members.iter().find(|id| !seen.insert(**id)) {
            return Err(GraphError::invalid(format!("node {dup} listed twice")));
        }
        let mut locks = LockSet::root(&self.locks);
        let parent = self.store.read().require_node(first)?.parent;
        locks.extend(
            std::iter::once(level_lock(parent)).chain(members.iter().map(|id| id.raw())),
        )?;
        let mut store = self.store.write();
        let mut level = 0;
        for &member in members {
            let record = store.require_node(member)?;
            if record.parent != parent {
                return Err(GraphError::invalid(format!(
                    "node {member} does not share the parent of node {first}"
                )));
            }
            level = level.max(record.level + 1);
        }

        let subtree = store.subtree(members.iter().copied());
        let affected = store.incident_edges(subtree);
        let before = store.capture_views(&affected);

        let id = self.allocate_node_id();
        let mut children = AvlTree::new();
        for &member in members {
            store.detach(parent, member);
            if let Some(record) = store.record_mut(member) {
                record.parent = Some(id);
            }
            children.insert(member);
        }
        store.nodes.insert(NodeRecord {
            parent,
            level,
            group: true,
            children,
            ..NodeRecord::leaf(id)
        });
        store.attach(parent, id);
        store.recompute_levels(parent);
        store.reconcile(before)?;
        store.metrics.node_created();
        store.metrics.nodes_grouped(members.len());
        debug!(group = %id, members = members.len(), level, "nodes grouped");
        Ok(id)
    }

    /// Dissolves a group, moving its children to the group's parent.
    ///
    /// Children keep their levels. Edges attached to the group itself are removed
    /// with it. Returns the released children.
    pub fn ungroup_nodes(&self, group: NodeId) -> Result<Vec<NodeId>> {
        let mut locks = LockSet::root(&self.locks);
        let scopes = {
            let store = self.store.read();
            let mut scopes = store.node_scopes(group)?;
            let record = store.require_node(group)?;
            scopes.extend(record.children.iter().map(|child| child.raw()));
            scopes
        };
        locks.extend(scopes)?;
        let mut store = self.store.write();
        let record = store.require_node(group)?;
        let parent = record.parent;
        if !record.group || record.children.is_empty() {
            return Err(GraphError::invalid(format!(
                "node {group} is not a group with children"
            )));
        }
        let children: Vec<NodeId> = record.children.iter().copied().collect();

        for edge in store.incident_edges([group]) {
            store.remove_edge_inner(edge)?;
        }
        let subtree = store.subtree(children.iter().copied());
        let affected = store.incident_edges(subtree);
        let before = store.capture_views(&affected);

        for &child in &children {
            if let Some(record) = store.record_mut(child) {
                record.parent = parent;
            }
            store.attach(parent, child);
        }
        store.detach(parent, group);
        store.nodes.remove_by(by_node(group));
        store.recompute_levels(parent);
        store.reconcile(before)?;
        store.metrics.group_dissolved();
        store.metrics.node_removed();
        debug!(%group, children = children.len(), "group dissolved");
        Ok(children)
    }

    /// Shows the group's children in place of the group. Idempotent.
    pub fn expand(&self, group: NodeId) -> Result<()> {
        self.set_expanded(group, true)
    }

    /// Hides the group's children behind the group. Idempotent.
    pub fn retract(&self, group: NodeId) -> Result<()> {
        self.set_expanded(group, false)
    }

    /// Returns whether the group is expanded.
    pub fn is_expanded(&self, group: NodeId) -> Result<bool> {
        let store = self.store.read();
        let record = store.require_node(group)?;
        if !record.group {
            return Err(GraphError::invalid(format!("node {group} is not a group")));
        }
        Ok(record.expanded)
    }

    fn set_expanded(&self, group: NodeId, expanded: bool) -> Result<()> {
        let mut locks = LockSet::root(&self.locks);
        locks.extend([group.raw()])?;
        let mut store = self.store.write();
        let record = store.require_node(group)?;
        if !record.group {
            return Err(GraphError::invalid(format!("node {group} is not a group")));
        }
        if record.expanded == expanded {
            return Ok(());
        }
        let subtree = store.subtree([group]);
        let affected = store.incident_edges(subtree);
        let before = store.capture_views(&affected);
        if let Some(record) = store.record_mut(group) {
            record.expanded = expanded;
        }
        store.reconcile(before)?;
        debug!(%group, expanded, "group visibility changed");
        Ok(())
    }
}
