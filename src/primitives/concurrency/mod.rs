//! Per-identifier mutual exclusion.
//!
//! [`LockRegistry`] hands out a binary lock for any [`ElementId`] on demand. Entries
//! are created lazily by the first locker and retired as soon as no thread holds or
//! waits on them, so the registry only ever tracks the active working set.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use rustc_hash::FxHashMap;
use tracing::{trace, warn};

use crate::storage::metrics::{GraphMetrics, NoopMetrics};
use crate::types::{ElementId, GraphError, Result};

/// Default number of registry shards.
pub const DEFAULT_LOCK_SHARDS: usize = 16;
/// Default interval at which blocked cancellable waiters re-check their token.
pub const DEFAULT_CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Tuning knobs for a [`LockRegistry`].
#[derive(Clone, Debug)]
pub struct LockOptions {
    /// Number of independently locked maps the identifier space is spread over.
    pub shards: usize,
    /// How often a cancellable waiter wakes up to observe its [`CancelToken`].
    pub cancel_poll_interval: Duration,
}

impl Default for LockOptions {
    fn default() -> Self {
        Self {
            shards: DEFAULT_LOCK_SHARDS,
            cancel_poll_interval: DEFAULT_CANCEL_POLL_INTERVAL,
        }
    }
}

impl LockOptions {
    /// Sets the shard count.
    pub fn shards(mut self, shards: usize) -> Self {
        self.shards = shards;
        self
    }

    /// Sets the cancellation poll interval.
    pub fn cancel_poll_interval(mut self, interval: Duration) -> Self {
        self.cancel_poll_interval = interval;
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.shards == 0 {
            return Err(GraphError::invalid("lock shard count must be at least 1"));
        }
        if self.cancel_poll_interval.is_zero() {
            return Err(GraphError::invalid("cancel poll interval must be non-zero"));
        }
        Ok(())
    }
}

/// Cooperative cancellation flag shared between a waiter and whoever may cancel it.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Creates a token in the non-cancelled state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation of every wait observing this token.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Returns whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

struct LockEntry {
    held: Mutex<bool>,
    released: Condvar,
}

impl LockEntry {
    fn new() -> Self {
        Self {
            held: Mutex::new(false),
            released: Condvar::new(),
        }
    }
}

/// Registry bookkeeping for one identifier. `refs` counts the holder plus waiters.
struct Slot {
    entry: Arc<LockEntry>,
    refs: usize,
}

type Shard = Mutex<FxHashMap<ElementId, Slot>>;

/// Issues and retires one mutual-exclusion primitive per identifier.
pub struct LockRegistry {
    shards: Box<[Shard]>,
    poll_interval: Duration,
    metrics: Arc<dyn GraphMetrics>,
}

impl Default for LockRegistry {
    fn default() -> Self {
        Self::with_metrics(&LockOptions::default(), Arc::new(NoopMetrics))
    }
}

impl LockRegistry {
    /// Creates a registry with the given options and no metrics.
    pub fn new(options: &LockOptions) -> Self {
        Self::with_metrics(options, Arc::new(NoopMetrics))
    }

    /// Creates a registry reporting contention to `metrics`.
    pub fn with_metrics(options: &LockOptions, metrics: Arc<dyn GraphMetrics>) -> Self {
        let shards = options.shards.max(1);
        Self {
            shards: (0..shards)
                .map(|_| Mutex::new(FxHashMap::default()))
                .collect(),
            poll_interval: options.cancel_poll_interval,
            metrics,
        }
    }

    fn shard(&self, id: ElementId) -> &Shard {
        &self.shards[(id % self.shards.len() as u64) as usize]
    }

    /// Registers the caller as a user of `id`, creating the entry if needed.
    fn enter(&self, id: ElementId) -> Arc<LockEntry> {
        let mut map = self.shard(id).lock();
        let slot = map.entry(id).or_insert_with(|| {
            trace!(id, "lock entry created");
            Slot {
                entry: Arc::new(LockEntry::new()),
                refs: 0,
            }
        });
        slot.refs += 1;
        Arc::clone(&slot.entry)
    }

    /// Drops a waiter's reference without it ever having held the lock.
    fn leave(&self, id: ElementId) {
        let mut map = self.shard(id).lock();
        if let Some(slot) = map.get_mut(&id) {
            slot.refs = slot.refs.saturating_sub(1);
            if slot.refs == 0 {
                map.remove(&id);
                trace!(id, "lock entry retired");
            }
        }
    }

    /// Blocks until the caller exclusively holds `id`.
    pub fn lock(&self, id: ElementId) {
        let entry = self.enter(id);
        let mut held = entry.held.lock();
        if *held {
            self.metrics.lock_contended();
        }
        while *held {
            entry.released.wait(&mut held);
        }
        *held = true;
    }

    /// Blocks until the caller holds `id` or `cancel` is triggered.
    ///
    /// On cancellation the caller is neither a holder nor a waiter afterwards, and an
    /// entry that nobody else references is retired.
    pub fn lock_cancellable(&self, id: ElementId, cancel: &CancelToken) -> Result<()> {
        if cancel.is_cancelled() {
            return Err(GraphError::Cancelled(id));
        }
        let entry = self.enter(id);
        let mut held = entry.held.lock();
        if *held {
            self.metrics.lock_contended();
        }
        while *held {
            if cancel.is_cancelled() {
                drop(held);
                self.leave(id);
                self.metrics.lock_cancelled();
                warn!(id, "lock wait cancelled");
                return Err(GraphError::Cancelled(id));
            }
            entry.released.wait_for(&mut held, self.poll_interval);
        }
        *held = true;
        Ok(())
    }

    /// Acquires `id` without blocking. Returns whether the lock was taken.
    pub fn try_lock(&self, id: ElementId) -> bool {
        let mut map = self.shard(id).lock();
        let slot = map.entry(id).or_insert_with(|| Slot {
            entry: Arc::new(LockEntry::new()),
            refs: 0,
        });
        let acquired = {
            let mut held = slot.entry.held.lock();
            if *held {
                false
            } else {
                *held = true;
                true
            }
        };
        if acquired {
            slot.refs += 1;
        }
        acquired
    }

    /// Releases `id` if it is currently held; a no-op otherwise.
    ///
    /// The entry is retired once no holder or waiter references it.
    pub fn unlock(&self, id: ElementId) {
        let mut map = self.shard(id).lock();
        let Some(slot) = map.get_mut(&id) else {
            return;
        };
        {
            let mut held = slot.entry.held.lock();
            if !*held {
                return;
            }
            *held = false;
        }
        slot.refs = slot.refs.saturating_sub(1);
        if slot.refs == 0 {
            map.remove(&id);
            trace!(id, "lock entry retired");
            return;
        }
        let entry = Arc::clone(&slot.entry);
        drop(map);
        entry.released.notify_one();
    }

    /// Blocks until `id` is held and returns a handle that must be released explicitly.
    pub fn acquire(self: &Arc<Self>, id: ElementId) -> LockHandle {
        self.lock(id);
        LockHandle {
            registry: Arc::clone(self),
            id,
        }
    }

    /// Cancellable variant of [`LockRegistry::acquire`].
    pub fn acquire_cancellable(
        self: &Arc<Self>,
        id: ElementId,
        cancel: &CancelToken,
    ) -> Result<LockHandle> {
        self.lock_cancellable(id, cancel)?;
        Ok(LockHandle {
            registry: Arc::clone(self),
            id,
        })
    }

    /// Blocks until `id` is held and returns a guard releasing it on drop.
    pub fn guard(&self, id: ElementId) -> LockGuard<'_> {
        self.lock(id);
        LockGuard { registry: self, id }
    }

    #[cfg(test)]
    pub(crate) fn entry_count(&self) -> usize {
        self.shards.iter().map(|shard| shard.lock().len()).sum()
    }
}

/// A held lock owned by whoever carries the handle.
///
/// Dropping the handle does not release the lock; call [`LockHandle::release`]. This
/// lets a traversal keep the lock for exactly as long as it is being drained.
#[must_use = "dropping a LockHandle leaves the identifier locked"]
pub struct LockHandle {
    registry: Arc<LockRegistry>,
    id: ElementId,
}

impl LockHandle {
    /// Identifier this handle holds.
    pub fn id(&self) -> ElementId {
        self.id
    }

    /// Releases the lock.
    pub fn release(self) {
        self.registry.unlock(self.id);
    }
}

impl std::fmt::Debug for LockHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockHandle").field("id", &self.id).finish()
    }
}

/// Scoped lock released when dropped.
pub struct LockGuard<'a> {
    registry: &'a LockRegistry,
    id: ElementId,
}

impl LockGuard<'_> {
    /// Identifier this guard holds.
    pub fn id(&self) -> ElementId {
        self.id
    }
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        self.registry.unlock(self.id);
    }
}
