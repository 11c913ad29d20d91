//! Concurrent hierarchical graph store.
//!
//! Nodes can be grouped into clusters, clusters into larger clusters, and any
//! cluster can be shown expanded or collapsed. Edges hidden inside a collapsed
//! cluster are summarized by weighted meta-edges, maintained incrementally as the
//! hierarchy changes.
//!
//! Concurrent callers are serialized per node, edge or tree level through a
//! [`LockRegistry`]; iterators hold the lock of what they traverse until drained.

#![warn(missing_docs)]

pub mod primitives;
pub mod storage;
pub mod types;

pub use primitives::concurrency::{CancelToken, LockGuard, LockHandle, LockOptions, LockRegistry};
pub use storage::{
    AggregationKind, AverageBuilder, AvlTree, CoarseningStrategy, Cursor, Edge, EdgeScope,
    EdgeView, GraphOptions, GraphStats, HierarchicalGraph, LockedIter, MaxMatchingCoarsening,
    MetaEdge, MetaEdgeBuilder, Node, NodeKind, NodeScope, SumBuilder,
};
pub use types::{EdgeId, ElementId, GraphError, NodeId, Result, ROOT_LOCK};
