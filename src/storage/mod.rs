//! Graph storage engine and core data structures.
//!
//! Holds the ordered index used for every collection, the lock-carrying iterator,
//! the hierarchical graph itself and the strategies plugged into it.

/// Height-balanced ordered index.
///
/// Arena-backed AVL tree used for node, edge, child and adjacency collections.
pub mod avl;

/// Multilevel coarsening strategies.
pub mod coarsen;

/// Traversal cursors and the lock-carrying iterator.
pub mod cursor;

/// Meta-edge weight aggregation.
pub mod meta;

pub(crate) mod graph;
pub(crate) mod metrics;
pub(crate) mod options;
pub(crate) mod types;

pub use avl::AvlTree;
pub use coarsen::{CoarseningStrategy, MaxMatchingCoarsening};
pub use cursor::{Cursor, LockedIter};
pub use graph::{EdgeCursor, EdgeScope, HierarchicalGraph, MetaEdgeCursor, NodeCursor, NodeScope};
pub use meta::{AggregationKind, AverageBuilder, MetaEdgeBuilder, SumBuilder};
pub use metrics::{default_metrics, CounterMetrics, GraphMetrics, MetricsSnapshot, NoopMetrics};
pub use options::GraphOptions;
pub use types::{Edge, EdgeView, GraphStats, MetaEdge, Node, NodeKind};
