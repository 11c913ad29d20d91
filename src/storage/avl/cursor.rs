use crate::storage::cursor::Cursor;
use crate::types::{GraphError, Result};

use super::{AvlTree, SlotId};

/// Borrowing in-order iterator over an [`AvlTree`].
///
/// Each step walks parent links, so a full pass is O(n) and a single step is
/// O(log n) at worst.
pub struct Iter<'a, T> {
    tree: &'a AvlTree<T>,
    next: Option<SlotId>,
    remaining: usize,
}

impl<'a, T> Iter<'a, T> {
    pub(super) fn new(tree: &'a AvlTree<T>) -> Self {
        Self {
            tree,
            next: tree.first_slot(),
            remaining: tree.len(),
        }
    }
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let slot = self.next?;
        self.next = self.tree.successor(slot);
        self.remaining = self.remaining.saturating_sub(1);
        Some(self.tree.item(slot))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

/// In-order cursor over a mutably borrowed [`AvlTree`].
///
/// Yields clones of the stored items and can remove the item it returned last
/// without disturbing the rest of the walk.
pub struct CursorMut<'a, T> {
    tree: &'a mut AvlTree<T>,
    next: Option<SlotId>,
    last: Option<SlotId>,
}

impl<'a, T> CursorMut<'a, T> {
    pub(super) fn new(tree: &'a mut AvlTree<T>) -> Self {
        let next = tree.first_slot();
        Self {
            tree,
            next,
            last: None,
        }
    }

    /// Item the next call to [`Cursor::next`] will return.
    pub fn peek(&self) -> Option<&T> {
        self.next.map(|slot| self.tree.item(slot))
    }
}

impl<T: Clone> Cursor for CursorMut<'_, T> {
    type Item = T;

    fn has_next(&mut self) -> bool {
        self.next.is_some()
    }

    fn next(&mut self) -> Option<T> {
        let slot = self.next?;
        self.last = Some(slot);
        self.next = self.tree.successor(slot);
        Some(self.tree.item(slot).clone())
    }

    fn remove(&mut self) -> Result<T> {
        let slot = self
            .last
            .take()
            .ok_or(GraphError::Unsupported("remove without a preceding next"))?;
        let (item, succ) = self.tree.remove_slot(slot);
        self.next = succ;
        Ok(item)
    }
}
