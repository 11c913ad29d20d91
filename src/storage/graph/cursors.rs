//! Key-positioned cursors over the graph.
//!
//! A cursor remembers the key it returned last and looks up its successor under a
//! short read lock on every step, so removals through the cursor and mutations
//! elsewhere in the graph never invalidate its position.

use std::sync::Arc;

use parking_lot::RwLock;

use super::helpers::{by_edge, next_after};
use super::locking::LockSet;
use super::store::GraphStore;
use super::{level_lock, HierarchicalGraph};
use crate::primitives::concurrency::{CancelToken, LockHandle, LockRegistry};
use crate::storage::cursor::{Cursor, LockedIter};
use crate::storage::types::{Edge, EdgeView, MetaEdge, Node};
use crate::types::{EdgeId, ElementId, GraphError, NodeId, Result, ROOT_LOCK};

/// Which nodes a [`NodeCursor`] walks.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NodeScope {
    /// Every node, hidden or not.
    All,
    /// Nodes currently shown.
    Visible,
    /// Nodes without a parent.
    TopLevel,
    /// Direct children of a group.
    Children(NodeId),
}

impl NodeScope {
    fn lock_id(self) -> ElementId {
        match self {
            NodeScope::Children(group) => level_lock(Some(group)),
            _ => ROOT_LOCK,
        }
    }
}

/// Which edges an [`EdgeCursor`] walks.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EdgeScope {
    /// Every underlying edge.
    All,
    /// Edges drawn directly between two visible nodes.
    Visible,
    /// Edges leaving a node.
    Outgoing(NodeId),
    /// Edges entering a node.
    Incoming(NodeId),
}

impl EdgeScope {
    fn lock_id(self) -> ElementId {
        match self {
            EdgeScope::Outgoing(node) | EdgeScope::Incoming(node) => node.raw(),
            _ => ROOT_LOCK,
        }
    }

    fn anchor(self) -> Option<NodeId> {
        match self {
            EdgeScope::Outgoing(node) | EdgeScope::Incoming(node) => Some(node),
            _ => None,
        }
    }
}

/// Cursor over node snapshots in identifier order.
pub struct NodeCursor {
    store: Arc<RwLock<GraphStore>>,
    locks: Arc<LockRegistry>,
    scope: NodeScope,
    last: Option<NodeId>,
    pending: Option<Node>,
    removable: bool,
}

impl NodeCursor {
    fn new(graph: &HierarchicalGraph, scope: NodeScope) -> Self {
        Self {
            store: Arc::clone(&graph.store),
            locks: Arc::clone(&graph.locks),
            scope,
            last: None,
            pending: None,
            removable: false,
        }
    }

    fn seek(&self) -> Option<Node> {
        let store = self.store.read();
        let mut after = self.last;
        loop {
            let id = match self.scope {
                NodeScope::All | NodeScope::Visible => {
                    next_after(&store.nodes, after, |record| record.id)?.id
                }
                NodeScope::TopLevel => *next_after(&store.top_level, after, |id| *id)?,
                NodeScope::Children(group) => {
                    *next_after(&store.record(group)?.children, after, |id| *id)?
                }
            };
            if self.scope != NodeScope::Visible || store.is_visible(id) {
                return store.record(id).map(|record| record.snapshot());
            }
            after = Some(id);
        }
    }
}

impl Cursor for NodeCursor {
    type Item = Node;

    fn has_next(&mut self) -> bool {
        self.pending = self.seek();
        self.pending.is_some()
    }

    fn next(&mut self) -> Option<Node> {
        let node = self.pending.take().or_else(|| self.seek())?;
        self.last = Some(node.id);
        self.removable = true;
        Some(node)
    }

    fn remove(&mut self) -> Result<Node> {
        self.remove_holding(None)
    }

    fn remove_holding(&mut self, held: Option<ElementId>) -> Result<Node> {
        let id = match self.last {
            Some(id) if self.removable => id,
            _ => return Err(GraphError::Unsupported("remove without a preceding next")),
        };
        let mut locks = LockSet::adopt(&self.locks, held)?;
        let scopes = self.store.read().node_scopes(id)?;
        locks.extend(scopes)?;
        let removed = self.store.write().remove_node_inner(id)?;
        self.removable = false;
        self.pending = None;
        Ok(removed)
    }
}

/// Cursor over underlying edges in identifier order.
pub struct EdgeCursor {
    store: Arc<RwLock<GraphStore>>,
    locks: Arc<LockRegistry>,
    scope: EdgeScope,
    last: Option<EdgeId>,
    pending: Option<Edge>,
    removable: bool,
}

impl EdgeCursor {
    fn new(graph: &HierarchicalGraph, scope: EdgeScope) -> Self {
        Self {
            store: Arc::clone(&graph.store),
            locks: Arc::clone(&graph.locks),
            scope,
            last: None,
            pending: None,
            removable: false,
        }
    }

    fn seek(&self) -> Option<Edge> {
        let store = self.store.read();
        let mut after = self.last;
        loop {
            let edge = match self.scope {
                EdgeScope::All | EdgeScope::Visible => {
                    *next_after(&store.edges, after, |edge| edge.id)?
                }
                EdgeScope::Outgoing(node) => {
                    let id = *next_after(&store.record(node)?.outgoing, after, |id| *id)?;
                    *store.edges.find_by(by_edge(id))?
                }
                EdgeScope::Incoming(node) => {
                    let id = *next_after(&store.record(node)?.incoming, after, |id| *id)?;
                    *store.edges.find_by(by_edge(id))?
                }
            };
            if self.scope != EdgeScope::Visible || store.edge_view(&edge) == EdgeView::Direct {
                return Some(edge);
            }
            after = Some(edge.id);
        }
    }
}

impl Cursor for EdgeCursor {
    type Item = Edge;

    fn has_next(&mut self) -> bool {
        self.pending = self.seek();
        self.pending.is_some()
    }

    fn next(&mut self) -> Option<Edge> {
        let edge = self.pending.take().or_else(|| self.seek())?;
        self.last = Some(edge.id);
        self.removable = true;
        Some(edge)
    }

    fn remove(&mut self) -> Result<Edge> {
        self.remove_holding(None)
    }

    fn remove_holding(&mut self, held: Option<ElementId>) -> Result<Edge> {
        let id = match self.last {
            Some(id) if self.removable => id,
            _ => return Err(GraphError::Unsupported("remove without a preceding next")),
        };
        let mut locks = LockSet::adopt(&self.locks, held)?;
        let scopes = self.store.read().edge_scopes(id)?;
        locks.extend(scopes)?;
        let removed = self.store.write().remove_edge_inner(id)?;
        self.removable = false;
        self.pending = None;
        Ok(removed)
    }
}

/// Cursor over live meta-edges ordered by `(source, target)`.
pub struct MetaEdgeCursor {
    store: Arc<RwLock<GraphStore>>,
    last: Option<(NodeId, NodeId)>,
    pending: Option<MetaEdge>,
}

impl MetaEdgeCursor {
    fn seek(&self) -> Option<MetaEdge> {
        let store = self.store.read();
        next_after(&store.metas, self.last, |meta| (meta.source, meta.target)).copied()
    }
}

impl Cursor for MetaEdgeCursor {
    type Item = MetaEdge;

    fn has_next(&mut self) -> bool {
        self.pending = self.seek();
        self.pending.is_some()
    }

    fn next(&mut self) -> Option<MetaEdge> {
        let meta = self.pending.take().or_else(|| self.seek())?;
        self.last = Some((meta.source, meta.target));
        Some(meta)
    }

    fn remove(&mut self) -> Result<MetaEdge> {
        Err(GraphError::Unsupported(
            "meta-edges are derived from underlying edges",
        ))
    }
}

impl HierarchicalGraph {
    /// Iterates the nodes in `scope`, holding the scope's lock until drained.
    ///
    /// [`NodeScope::Children`] locks the group; every other scope locks the top
    /// level.
    pub fn nodes_in(&self, scope: NodeScope) -> Result<LockedIter<NodeCursor>> {
        let lock = self.locks.acquire(scope.lock_id());
        self.open_nodes(scope, lock)
    }

    /// Cancellable variant of [`HierarchicalGraph::nodes_in`].
    pub fn nodes_in_cancellable(
        &self,
        scope: NodeScope,
        cancel: &CancelToken,
    ) -> Result<LockedIter<NodeCursor>> {
        let lock = self.locks.acquire_cancellable(scope.lock_id(), cancel)?;
        self.open_nodes(scope, lock)
    }

    /// Iterates every node.
    pub fn nodes(&self) -> LockedIter<NodeCursor> {
        self.top_scope_nodes(NodeScope::All)
    }

    /// Iterates the nodes currently shown.
    pub fn visible_nodes(&self) -> LockedIter<NodeCursor> {
        self.top_scope_nodes(NodeScope::Visible)
    }

    /// Iterates the nodes without a parent.
    pub fn top_level_nodes(&self) -> LockedIter<NodeCursor> {
        self.top_scope_nodes(NodeScope::TopLevel)
    }

    /// Iterates the direct children of `group`.
    pub fn children(&self, group: NodeId) -> Result<LockedIter<NodeCursor>> {
        self.nodes_in(NodeScope::Children(group))
    }

    /// Iterates the edges in `scope`, holding the scope's lock until drained.
    ///
    /// [`EdgeScope::Outgoing`] and [`EdgeScope::Incoming`] lock the node; the other
    /// scopes lock the top level.
    pub fn edges_in(&self, scope: EdgeScope) -> Result<LockedIter<EdgeCursor>> {
        let lock = self.locks.acquire(scope.lock_id());
        if let Some(node) = scope.anchor() {
            if let Err(err) = self.store.read().require_node(node) {
                lock.release();
                return Err(err);
            }
        }
        Ok(LockedIter::new(
            EdgeCursor::new(self, scope),
            Some(lock),
        ))
    }

    /// Iterates every underlying edge.
    pub fn edges(&self) -> LockedIter<EdgeCursor> {
        LockedIter::new(
            EdgeCursor::new(self, EdgeScope::All),
            Some(self.locks.acquire(ROOT_LOCK)),
        )
    }

    /// Iterates the edges drawn directly between visible nodes.
    pub fn visible_edges(&self) -> LockedIter<EdgeCursor> {
        LockedIter::new(
            EdgeCursor::new(self, EdgeScope::Visible),
            Some(self.locks.acquire(ROOT_LOCK)),
        )
    }

    /// Iterates the edges leaving `node`.
    pub fn outgoing(&self, node: NodeId) -> Result<LockedIter<EdgeCursor>> {
        self.edges_in(EdgeScope::Outgoing(node))
    }

    /// Iterates the edges entering `node`.
    pub fn incoming(&self, node: NodeId) -> Result<LockedIter<EdgeCursor>> {
        self.edges_in(EdgeScope::Incoming(node))
    }

    /// Iterates the live meta-edges.
    pub fn meta_edges(&self) -> LockedIter<MetaEdgeCursor> {
        LockedIter::new(
            MetaEdgeCursor {
                store: Arc::clone(&self.store),
                last: None,
                pending: None,
            },
            Some(self.locks.acquire(ROOT_LOCK)),
        )
    }

    fn top_scope_nodes(&self, scope: NodeScope) -> LockedIter<NodeCursor> {
        LockedIter::new(
            NodeCursor::new(self, scope),
            Some(self.locks.acquire(ROOT_LOCK)),
        )
    }

    fn open_nodes(&self, scope: NodeScope, lock: LockHandle) -> Result<LockedIter<NodeCursor>> {
        if let NodeScope::Children(group) = scope {
            if let Err(err) = self.store.read().require_node(group) {
                lock.release();
                return Err(err);
            }
        }
        Ok(LockedIter::new(
            NodeCursor::new(self, scope),
            Some(lock),
        ))
    }
}
