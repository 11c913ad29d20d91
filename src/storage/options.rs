use std::fmt;
use std::sync::Arc;

use crate::primitives::concurrency::LockOptions;
use crate::storage::meta::{validate_divisor, AggregationKind, MetaEdgeBuilder};
use crate::storage::metrics::GraphMetrics;
use crate::types::Result;

/// Configuration options supplied when opening a [`super::HierarchicalGraph`].
#[derive(Clone)]
pub struct GraphOptions {
    /// Divisor applied to non-deep edge contributions; must be positive.
    pub non_deep_divisor: f64,
    /// Built-in aggregation strategy.
    pub aggregation: AggregationKind,
    /// Custom aggregation strategy, taking precedence over `aggregation`.
    pub builder: Option<Arc<dyn MetaEdgeBuilder>>,
    /// Lock registry tuning.
    pub lock: LockOptions,
    /// Optional metrics collection implementation.
    pub metrics: Option<Arc<dyn GraphMetrics>>,
}

impl Default for GraphOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphOptions {
    /// Creates options with default settings: summed weights, no dampening.
    pub fn new() -> Self {
        Self {
            non_deep_divisor: super::meta::DEFAULT_NON_DEEP_DIVISOR,
            aggregation: AggregationKind::Sum,
            builder: None,
            lock: LockOptions::default(),
            metrics: None,
        }
    }

    /// Preset for multilevel coarsening: non-deep edges count half.
    pub fn coarsening() -> Self {
        Self::new().non_deep_divisor(2.0)
    }

    /// Sets the non-deep divisor.
    pub fn non_deep_divisor(mut self, divisor: f64) -> Self {
        self.non_deep_divisor = divisor;
        self
    }

    /// Selects a built-in aggregation strategy.
    pub fn aggregation(mut self, kind: AggregationKind) -> Self {
        self.aggregation = kind;
        self
    }

    /// Installs a custom aggregation strategy.
    pub fn builder(mut self, builder: Arc<dyn MetaEdgeBuilder>) -> Self {
        self.builder = Some(builder);
        self
    }

    /// Sets the lock registry options.
    pub fn lock(mut self, lock: LockOptions) -> Self {
        self.lock = lock;
        self
    }

    /// Sets the metrics collection implementation.
    pub fn metrics(mut self, metrics: Arc<dyn GraphMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        validate_divisor(self.non_deep_divisor)?;
        self.lock.validate()
    }

    pub(crate) fn resolve_builder(&self) -> Result<Arc<dyn MetaEdgeBuilder>> {
        match &self.builder {
            Some(builder) => Ok(Arc::clone(builder)),
            None => self.aggregation.build(self.non_deep_divisor),
        }
    }
}

impl fmt::Debug for GraphOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphOptions")
            .field("non_deep_divisor", &self.non_deep_divisor)
            .field("aggregation", &self.aggregation)
            .field("builder", &self.builder.as_ref().map(|b| b.name()))
            .field("lock", &self.lock)
            .field("metrics", &self.metrics.is_some())
            .finish()
    }
}
