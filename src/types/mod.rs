//! Identifiers and the crate-wide error type.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Raw element identifier shared by nodes and edges.
///
/// Nodes and edges draw from a single counter so an identifier names exactly one
/// element of the store, and the lock registry can key on it directly.
pub type ElementId = u64;

/// Lock identifier naming the top level of the cluster tree.
///
/// Element identifiers start at 1, so this value never collides with a node or edge.
pub const ROOT_LOCK: ElementId = 0;

/// Identifier of a node (leaf or group).
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize, Deserialize)]
pub struct NodeId(pub u64);

/// Identifier of an edge.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize, Deserialize)]
pub struct EdgeId(pub u64);

impl NodeId {
    /// Returns the raw identifier, usable as a lock key.
    pub const fn raw(self) -> ElementId {
        self.0
    }
}

impl EdgeId {
    /// Returns the raw identifier, usable as a lock key.
    pub const fn raw(self) -> ElementId {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<NodeId> for ElementId {
    fn from(value: NodeId) -> Self {
        value.0
    }
}

impl From<EdgeId> for ElementId {
    fn from(value: EdgeId) -> Self {
        value.0
    }
}

/// Errors surfaced by the graph store.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    /// The named element does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),
    /// The caller violated an operation's contract.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// A blocking lock wait was cancelled before the lock was acquired.
    #[error("lock wait on {0} cancelled")]
    Cancelled(ElementId),
    /// A lock that could not be waited for without risking deadlock was held.
    #[error("identifier {0} is locked elsewhere")]
    Busy(ElementId),
    /// The operation is not available on this element kind.
    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),
    /// An internal invariant check failed.
    #[error("corruption detected: {0}")]
    Corruption(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, GraphError>;

impl GraphError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        GraphError::InvalidArgument(message.into())
    }
}
