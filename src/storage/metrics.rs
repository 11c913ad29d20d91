use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;

/// Trait for tracking structural operations and lock behavior of a graph store.
///
/// Implementations collect statistics about node/edge churn, grouping activity and
/// lock contention. Hooks are invoked on hot paths and must be cheap.
pub trait GraphMetrics: Send + Sync {
    /// Records the creation of a node (leaf or group).
    fn node_created(&self);

    /// Records the removal of a node.
    fn node_removed(&self);

    /// Records the creation of an edge.
    fn edge_created(&self);

    /// Records the removal of an edge.
    fn edge_removed(&self);

    /// Records a grouping operation that absorbed `members` nodes.
    fn nodes_grouped(&self, members: usize);

    /// Records an ungrouping operation.
    fn group_dissolved(&self);

    /// Records a lock request that found its identifier already held.
    fn lock_contended(&self);

    /// Records a lock wait abandoned through cancellation.
    fn lock_cancelled(&self);
}

/// A no-op implementation of [`GraphMetrics`] that discards all recorded metrics.
#[derive(Default)]
pub struct NoopMetrics;

impl GraphMetrics for NoopMetrics {
    fn node_created(&self) {}
    fn node_removed(&self) {}
    fn edge_created(&self) {}
    fn edge_removed(&self) {}
    fn nodes_grouped(&self, _members: usize) {}
    fn group_dissolved(&self) {}
    fn lock_contended(&self) {}
    fn lock_cancelled(&self) {}
}

/// A thread-safe counter-based implementation of [`GraphMetrics`].
#[derive(Default)]
pub struct CounterMetrics {
    /// Number of nodes created, groups included.
    pub nodes_created: AtomicU64,

    /// Number of nodes removed, dissolved groups included.
    pub nodes_removed: AtomicU64,

    /// Number of edges created.
    pub edges_created: AtomicU64,

    /// Number of edges removed.
    pub edges_removed: AtomicU64,

    /// Number of grouping operations.
    pub groups_created: AtomicU64,

    /// Total nodes absorbed by grouping operations.
    pub nodes_grouped: AtomicU64,

    /// Number of ungrouping operations.
    pub groups_dissolved: AtomicU64,

    /// Number of lock requests that had to wait.
    pub locks_contended: AtomicU64,

    /// Number of cancelled lock waits.
    pub locks_cancelled: AtomicU64,
}

/// Point-in-time copy of a [`CounterMetrics`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    /// See [`CounterMetrics::nodes_created`].
    pub nodes_created: u64,
    /// See [`CounterMetrics::nodes_removed`].
    pub nodes_removed: u64,
    /// See [`CounterMetrics::edges_created`].
    pub edges_created: u64,
    /// See [`CounterMetrics::edges_removed`].
    pub edges_removed: u64,
    /// See [`CounterMetrics::groups_created`].
    pub groups_created: u64,
    /// See [`CounterMetrics::nodes_grouped`].
    pub nodes_grouped: u64,
    /// See [`CounterMetrics::groups_dissolved`].
    pub groups_dissolved: u64,
    /// See [`CounterMetrics::locks_contended`].
    pub locks_contended: u64,
    /// See [`CounterMetrics::locks_cancelled`].
    pub locks_cancelled: u64,
}

impl CounterMetrics {
    /// Reads every counter.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            nodes_created: self.nodes_created.load(Ordering::Relaxed),
            nodes_removed: self.nodes_removed.load(Ordering::Relaxed),
            edges_created: self.edges_created.load(Ordering::Relaxed),
            edges_removed: self.edges_removed.load(Ordering::Relaxed),
            groups_created: self.groups_created.load(Ordering::Relaxed),
            nodes_grouped: self.nodes_grouped.load(Ordering::Relaxed),
            groups_dissolved: self.groups_dissolved.load(Ordering::Relaxed),
            locks_contended: self.locks_contended.load(Ordering::Relaxed),
            locks_cancelled: self.locks_cancelled.load(Ordering::Relaxed),
        }
    }
}

impl GraphMetrics for CounterMetrics {
    fn node_created(&self) {
        self.nodes_created.fetch_add(1, Ordering::Relaxed);
    }

    fn node_removed(&self) {
        self.nodes_removed.fetch_add(1, Ordering::Relaxed);
    }

    fn edge_created(&self) {
        self.edges_created.fetch_add(1, Ordering::Relaxed);
    }

    fn edge_removed(&self) {
        self.edges_removed.fetch_add(1, Ordering::Relaxed);
    }

    fn nodes_grouped(&self, members: usize) {
        self.groups_created.fetch_add(1, Ordering::Relaxed);
        self.nodes_grouped.fetch_add(members as u64, Ordering::Relaxed);
    }

    fn group_dissolved(&self) {
        self.groups_dissolved.fetch_add(1, Ordering::Relaxed);
    }

    fn lock_contended(&self) {
        self.locks_contended.fetch_add(1, Ordering::Relaxed);
    }

    fn lock_cancelled(&self) {
        self.locks_cancelled.fetch_add(1, Ordering::Relaxed);
    }
}

/// Returns the default metrics implementation wrapped in an [`Arc`].
///
/// The default implementation is [`NoopMetrics`], which discards everything.
pub fn default_metrics() -> Arc<dyn GraphMetrics> {
    Arc::new(NoopMetrics)
}
