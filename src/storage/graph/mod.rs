use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::primitives::concurrency::{LockOptions, LockRegistry};
use crate::storage::meta::{MetaEdgeBuilder, SumBuilder};
use crate::storage::metrics::{default_metrics, GraphMetrics};
use crate::storage::options::GraphOptions;
use crate::types::{EdgeId, ElementId, NodeId, Result, ROOT_LOCK};

mod cursors;
mod edge_ops;
mod helpers;
mod hierarchy_ops;
mod locking;
mod node_ops;
mod store;
mod verify;
mod view;

pub use cursors::{EdgeCursor, EdgeScope, MetaEdgeCursor, NodeCursor, NodeScope};

use store::GraphStore;

/// Concurrent in-memory graph whose nodes form a tree of groups.
///
/// Shared state lives behind a read/write lock that keeps memory safe. Logical
/// exclusion between operations and iterators comes from the per-identifier
/// [`LockRegistry`]. A mutation takes [`ROOT_LOCK`] and then, in ascending order, the
/// lock of every scope it changes:
///
/// * `add_node`: the top level only;
/// * `add_edge`: both endpoints;
/// * `remove_edge` and `set_edge_weight`: the edge and both endpoints;
/// * `remove_node`: its level, the node, and each incident edge with its endpoints;
/// * `group_nodes`: the members' level and the members;
/// * `ungroup_nodes`: the group's level, the group, its children, and each edge
///   attached to the group with its endpoints;
/// * `expand` and `retract`: the group.
///
/// Iterators hold one lock until drained (see [`crate::LockedIter`]): [`ROOT_LOCK`]
/// for the graph-wide scopes, the group for `children`, the node for `outgoing` and
/// `incoming`. An undrained graph-wide iterator therefore blocks every mutation,
/// and a scoped one blocks the mutations touching its scope.
///
/// Every mutation holds [`ROOT_LOCK`] and then the store's write lock for its whole
/// critical section, so mutations run one at a time even on disjoint subtrees.
/// Reads and traversal steps only take the store's read lock and run in parallel.
///
/// The registry's locks are not reentrant: a thread holding an undrained iterator
/// must not call a mutating operation. Removing through the iterator itself is the
/// exception; a scoped iterator's removal fails with [`crate::GraphError::Busy`]
/// rather than wait for the top level.
pub struct HierarchicalGraph {
    store: Arc<RwLock<GraphStore>>,
    locks: Arc<LockRegistry>,
    next_id: AtomicU64,
}

impl HierarchicalGraph {
    /// Creates an empty graph with default options.
    pub fn new() -> Self {
        Self::from_parts(
            Arc::new(SumBuilder::default()),
            &LockOptions::default(),
            default_metrics(),
        )
    }

    /// Creates an empty graph, validating `options`.
    pub fn open(options: GraphOptions) -> Result<Self> {
        options.validate()?;
        let builder = options.resolve_builder()?;
        let metrics = options.metrics.clone().unwrap_or_else(default_metrics);
        tracing::debug!(aggregation = builder.name(), ?options, "graph opened");
        Ok(Self::from_parts(builder, &options.lock, metrics))
    }

    fn from_parts(
        builder: Arc<dyn MetaEdgeBuilder>,
        lock: &LockOptions,
        metrics: Arc<dyn GraphMetrics>,
    ) -> Self {
        Self {
            locks: Arc::new(LockRegistry::with_metrics(lock, Arc::clone(&metrics))),
            store: Arc::new(RwLock::new(GraphStore::new(builder, metrics))),
            next_id: AtomicU64::new(1),
        }
    }

    /// Lock registry guarding this graph's identifiers.
    ///
    /// Callers composing several reads into one critical section lock the relevant
    /// identifiers here, [`ROOT_LOCK`] first and the rest in ascending order.
    pub fn locks(&self) -> &Arc<LockRegistry> {
        &self.locks
    }

    fn allocate_node_id(&self) -> NodeId {
        NodeId(self.next_id.fetch_add(1, AtomicOrdering::SeqCst))
    }

    fn allocate_edge_id(&self) -> EdgeId {
        EdgeId(self.next_id.fetch_add(1, AtomicOrdering::SeqCst))
    }
}

impl Default for HierarchicalGraph {
    fn default() -> Self {
        Self::new()
    }
}

/// Lock identifier guarding the children of `parent` (the top level when `None`).
pub(crate) fn level_lock(parent: Option<NodeId>) -> ElementId {
    parent.map_or(ROOT_LOCK, NodeId::raw)
}
