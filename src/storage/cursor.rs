//! Traversal cursors and the lock-carrying iterator built on them.

use crate::primitives::concurrency::LockHandle;
use crate::types::{ElementId, Result};

/// A resumable traversal over a mutable collection.
pub trait Cursor {
    /// Element produced by the traversal.
    type Item;

    /// Returns whether another element is available.
    fn has_next(&mut self) -> bool;

    /// Advances and returns the next element.
    ///
    /// Meaningful only after [`Cursor::has_next`] returned `true`.
    fn next(&mut self) -> Option<Self::Item>;

    /// Removes the element most recently returned by [`Cursor::next`] from the
    /// underlying collection.
    fn remove(&mut self) -> Result<Self::Item>;

    /// Like [`Cursor::remove`], for a caller already holding the given lock over the
    /// traversal. Cursors that lock further identifiers adopt it instead of taking
    /// it again.
    fn remove_holding(&mut self, _held: Option<ElementId>) -> Result<Self::Item> {
        self.remove()
    }
}

/// Iterator that owns a held lock and gives it up once traversal is exhausted.
///
/// The lock is released by the first [`LockedIter::has_next`] call that finds the
/// cursor drained; `for` loops and iterator adapters reach that point on their own.
/// Dropping the iterator before exhaustion keeps the lock held. Callers that stop
/// early must call [`LockedIter::release`].
#[must_use = "a LockedIter holds its lock until drained or released"]
pub struct LockedIter<C: Cursor> {
    cursor: C,
    lock: Option<LockHandle>,
}

impl<C: Cursor> LockedIter<C> {
    /// Wraps `cursor`, taking ownership of a lock the caller already holds.
    pub fn new(cursor: C, lock: Option<LockHandle>) -> Self {
        Self { cursor, lock }
    }

    /// Delegates to the cursor, releasing the lock when it reports exhaustion.
    pub fn has_next(&mut self) -> bool {
        if self.cursor.has_next() {
            return true;
        }
        if let Some(lock) = self.lock.take() {
            lock.release();
        }
        false
    }

    /// Removes the element last returned from the underlying collection.
    pub fn remove(&mut self) -> Result<C::Item> {
        let held = self.lock_id();
        self.cursor.remove_holding(held)
    }

    /// Returns whether the iterator still holds its lock.
    pub fn holds_lock(&self) -> bool {
        self.lock.is_some()
    }

    /// Identifier of the held lock, if any.
    pub fn lock_id(&self) -> Option<ElementId> {
        self.lock.as_ref().map(LockHandle::id)
    }

    /// Abandons the traversal and releases the lock.
    pub fn release(mut self) {
        if let Some(lock) = self.lock.take() {
            lock.release();
        }
    }
}

impl<C: Cursor> Iterator for LockedIter<C> {
    type Item = C::Item;

    fn next(&mut self) -> Option<Self::Item> {
        if self.has_next() {
            self.cursor.next()
        } else {
            None
        }
    }
}
