//! Registry lock sets taken by graph mutations.

use smallvec::SmallVec;
use tracing::trace;

use super::level_lock;
use super::store::GraphStore;
use crate::primitives::concurrency::LockRegistry;
use crate::types::{EdgeId, ElementId, GraphError, NodeId, Result, ROOT_LOCK};

/// Locks held for one mutation, released in reverse order on drop.
///
/// [`ROOT_LOCK`] always comes first. A lock the caller already holds can be
/// adopted: it counts as held but is neither taken nor released here.
pub(crate) struct LockSet<'a> {
    registry: &'a LockRegistry,
    taken: SmallVec<[ElementId; 8]>,
    adopted: Option<ElementId>,
    blocking: bool,
}

impl<'a> LockSet<'a> {
    /// Blocks until the top-level lock is held.
    pub(crate) fn root(registry: &'a LockRegistry) -> Self {
        registry.lock(ROOT_LOCK);
        let mut taken = SmallVec::new();
        taken.push(ROOT_LOCK);
        Self {
            registry,
            taken,
            adopted: None,
            blocking: true,
        }
    }

    /// Builds on `held`, a lock the caller already owns.
    ///
    /// Owning [`ROOT_LOCK`] keeps the usual order, so further locks may block. Owning
    /// any other identifier would put the top-level lock out of order, so every
    /// further lock is only tried and a busy one fails with [`GraphError::Busy`].
    pub(crate) fn adopt(registry: &'a LockRegistry, held: Option<ElementId>) -> Result<Self> {
        let Some(held) = held else {
            return Ok(Self::root(registry));
        };
        let mut set = Self {
            registry,
            taken: SmallVec::new(),
            adopted: Some(held),
            blocking: held == ROOT_LOCK,
        };
        set.extend([ROOT_LOCK])?;
        Ok(set)
    }

    fn holds(&self, id: ElementId) -> bool {
        self.adopted == Some(id) || self.taken.contains(&id)
    }

    /// Locks every identifier of `ids` not already held, in ascending order.
    pub(crate) fn extend<I>(&mut self, ids: I) -> Result<()>
    where
        I: IntoIterator<Item = ElementId>,
    {
        let mut ids: SmallVec<[ElementId; 8]> = ids.into_iter().collect();
        ids.sort_unstable();
        ids.dedup();
        for id in ids {
            if self.holds(id) {
                continue;
            }
            if self.blocking {
                self.registry.lock(id);
            } else if !self.registry.try_lock(id) {
                trace!(id, "lock busy, giving up");
                return Err(GraphError::Busy(id));
            }
            self.taken.push(id);
        }
        Ok(())
    }
}

impl Drop for LockSet<'_> {
    fn drop(&mut self) {
        for id in self.taken.iter().rev() {
            self.registry.unlock(*id);
        }
    }
}

impl GraphStore {
    /// The edge and both of its endpoints.
    pub(crate) fn edge_scopes(&self, id: EdgeId) -> Result<[ElementId; 3]> {
        let edge = self.require_edge(id)?;
        Ok([id.raw(), edge.source.raw(), edge.target.raw()])
    }

    /// Everything removing `id` touches: its level, the node, and each incident edge
    /// with that edge's endpoints.
    pub(crate) fn node_scopes(&self, id: NodeId) -> Result<Vec<ElementId>> {
        let record = self.require_node(id)?;
        let mut scopes = vec![level_lock(record.parent), id.raw()];
        for edge in self.incident_edges([id]) {
            scopes.extend(self.edge_scopes(edge)?);
        }
        Ok(scopes)
    }
}
