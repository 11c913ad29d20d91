//! Meta-edge weight aggregation strategies.
//!
//! A [`MetaEdgeBuilder`] folds an underlying edge into a meta-edge when the edge
//! becomes represented by it, and unfolds it again when it stops being represented.
//! Every strategy must be weight-neutral: a push followed by a pull with matching
//! endpoints restores the meta-edge weight up to floating-point error.
//!
//! An edge is *non-deep* relative to a meta-edge when one of its endpoints already
//! is one of the meta-edge's endpoints; non-deep contributions are divided by the
//! configured divisor.

use std::sync::Arc;

use tracing::trace;

use crate::storage::types::{Edge, MetaEdge};
use crate::types::{GraphError, NodeId, Result};

/// Default divisor for non-deep edges (no dampening).
pub const DEFAULT_NON_DEEP_DIVISOR: f64 = 1.0;

/// Strategy maintaining meta-edge weights incrementally.
///
/// `meta.count` holds the number of edges represented before the call; the graph
/// adjusts it afterwards.
pub trait MetaEdgeBuilder: Send + Sync {
    /// Folds `edge` into `meta`.
    ///
    /// The non-deep test compares the edge's stored endpoints against the meta-edge.
    /// `source` and `target` are the representatives the edge is being folded under.
    fn push_edge(&self, edge: &Edge, source: NodeId, target: NodeId, meta: &mut MetaEdge);

    /// Removes the contribution of `edge` from `meta`.
    ///
    /// The non-deep test uses `source` and `target`, which must be the endpoints the
    /// edge had when it was pushed.
    fn pull_edge(&self, edge: &Edge, source: NodeId, target: NodeId, meta: &mut MetaEdge);

    /// Short name used in logs and stats.
    fn name(&self) -> &'static str;
}

/// Selects a built-in [`MetaEdgeBuilder`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum AggregationKind {
    /// Meta-edge weight is the sum of contributions.
    #[default]
    Sum,
    /// Meta-edge weight is the mean of contributions.
    Average,
}

impl AggregationKind {
    /// Instantiates the strategy with the given non-deep divisor.
    pub fn build(self, non_deep_divisor: f64) -> Result<Arc<dyn MetaEdgeBuilder>> {
        Ok(match self {
            AggregationKind::Sum => Arc::new(SumBuilder::new(non_deep_divisor)?),
            AggregationKind::Average => Arc::new(AverageBuilder::new(non_deep_divisor)?),
        })
    }
}

pub(crate) fn validate_divisor(divisor: f64) -> Result<()> {
    if divisor.is_finite() && divisor > 0.0 {
        Ok(())
    } else {
        Err(GraphError::invalid(format!(
            "non-deep divisor must be positive and finite, got {divisor}"
        )))
    }
}

fn divisor_for(divisor: f64, source: NodeId, target: NodeId, meta: &MetaEdge) -> f64 {
    if meta.touches(source, target) {
        divisor
    } else {
        1.0
    }
}

/// Sums edge weights, dividing non-deep contributions by `non_deep_divisor`.
#[derive(Clone, Copy, Debug)]
pub struct SumBuilder {
    non_deep_divisor: f64,
}

impl Default for SumBuilder {
    fn default() -> Self {
        Self {
            non_deep_divisor: DEFAULT_NON_DEEP_DIVISOR,
        }
    }
}

impl SumBuilder {
    /// Creates the builder; `non_deep_divisor` must be positive.
    pub fn new(non_deep_divisor: f64) -> Result<Self> {
        validate_divisor(non_deep_divisor)?;
        Ok(Self { non_deep_divisor })
    }

    /// Configured divisor.
    pub fn non_deep_divisor(&self) -> f64 {
        self.non_deep_divisor
    }
}

impl MetaEdgeBuilder for SumBuilder {
    fn push_edge(&self, edge: &Edge, _source: NodeId, _target: NodeId, meta: &mut MetaEdge) {
        let divisor = divisor_for(self.non_deep_divisor, edge.source, edge.target, meta);
        meta.weight += edge.weight / divisor;
        trace!(edge = %edge.id, divisor, weight = meta.weight, "meta-edge push");
    }

    fn pull_edge(&self, edge: &Edge, source: NodeId, target: NodeId, meta: &mut MetaEdge) {
        let divisor = divisor_for(self.non_deep_divisor, source, target, meta);
        meta.weight -= edge.weight / divisor;
        trace!(edge = %edge.id, divisor, weight = meta.weight, "meta-edge pull");
    }

    fn name(&self) -> &'static str {
        "sum"
    }
}

/// Averages the (divided) contributions of the represented edges.
#[derive(Clone, Copy, Debug)]
pub struct AverageBuilder {
    non_deep_divisor: f64,
}

impl AverageBuilder {
    /// Creates the builder; `non_deep_divisor` must be positive.
    pub fn new(non_deep_divisor: f64) -> Result<Self> {
        validate_divisor(non_deep_divisor)?;
        Ok(Self { non_deep_divisor })
    }
}

impl MetaEdgeBuilder for AverageBuilder {
    fn push_edge(&self, edge: &Edge, _source: NodeId, _target: NodeId, meta: &mut MetaEdge) {
        let divisor = divisor_for(self.non_deep_divisor, edge.source, edge.target, meta);
        let n = meta.count as f64;
        meta.weight = (meta.weight * n + edge.weight / divisor) / (n + 1.0);
    }

    fn pull_edge(&self, edge: &Edge, source: NodeId, target: NodeId, meta: &mut MetaEdge) {
        let divisor = divisor_for(self.non_deep_divisor, source, target, meta);
        let n = meta.count as f64;
        meta.weight = if meta.count <= 1 {
            0.0
        } else {
            (meta.weight * n - edge.weight / divisor) / (n - 1.0)
        };
    }

    fn name(&self) -> &'static str {
        "average"
    }
}
