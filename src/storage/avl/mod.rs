//! Height-balanced binary search tree used as the ordered index for graph elements.
//!
//! Nodes live in a slot arena and link to their parent and children by slot number,
//! so rotations relink nodes without moving payloads. A slot keeps its item for as
//! long as the item is in the tree, which is what lets [`CursorMut`] remove the
//! element it just returned and keep walking.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use crate::types::{GraphError, Result};

mod cursor;

pub use cursor::{CursorMut, Iter};

/// Total order over tree items supplied by the caller.
pub type Comparator<T> = Arc<dyn Fn(&T, &T) -> Ordering + Send + Sync>;

pub(crate) type SlotId = usize;

struct AvlNode<T> {
    item: T,
    parent: Option<SlotId>,
    left: Option<SlotId>,
    right: Option<SlotId>,
    height: u32,
}

/// An AVL tree ordered by a caller-supplied comparison.
///
/// The comparison must be a strict total order; items comparing equal are treated
/// as the same key, and inserting one replaces the stored item.
pub struct AvlTree<T> {
    slots: Vec<Option<AvlNode<T>>>,
    free: Vec<SlotId>,
    root: Option<SlotId>,
    len: usize,
    cmp: Comparator<T>,
}

impl<T: Ord + 'static> AvlTree<T> {
    /// Creates an empty tree ordered by `T`'s [`Ord`] implementation.
    pub fn new() -> Self {
        Self::with_comparator(|a: &T, b: &T| a.cmp(b))
    }
}

impl<T: Ord + 'static> Default for AvlTree<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> AvlTree<T> {
    /// Creates an empty tree ordered by `cmp`.
    pub fn with_comparator<F>(cmp: F) -> Self
    where
        F: Fn(&T, &T) -> Ordering + Send + Sync + 'static,
    {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            root: None,
            len: 0,
            cmp: Arc::new(cmp),
        }
    }

    /// Number of items stored.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` when the tree holds no items.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Height of the tree in nodes; zero when empty.
    pub fn height(&self) -> usize {
        self.h(self.root) as usize
    }

    /// Removes every item.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.root = None;
        self.len = 0;
    }

    /// Inserts `item`, returning the previously stored equal item if there was one.
    pub fn insert(&mut self, item: T) -> Option<T> {
        let mut parent = None;
        let mut go_left = false;
        let mut cur = self.root;
        while let Some(slot) = cur {
            let node = self.node(slot);
            match (self.cmp)(&item, &node.item) {
                Ordering::Less => {
                    parent = Some(slot);
                    go_left = true;
                    cur = node.left;
                }
                Ordering::Greater => {
                    parent = Some(slot);
                    go_left = false;
                    cur = node.right;
                }
                Ordering::Equal => {
                    return Some(std::mem::replace(&mut self.node_mut(slot).item, item));
                }
            }
        }
        let slot = self.alloc(AvlNode {
            item,
            parent,
            left: None,
            right: None,
            height: 1,
        });
        match parent {
            None => self.root = Some(slot),
            Some(p) if go_left => self.node_mut(p).left = Some(slot),
            Some(p) => self.node_mut(p).right = Some(slot),
        }
        self.len += 1;
        self.retrace(parent);
        None
    }

    /// Removes the item equal to `key`.
    pub fn remove(&mut self, key: &T) -> Option<T> {
        let slot = self.find_slot(key)?;
        Some(self.remove_slot(slot).0)
    }

    /// Removes the item matched by `probe` (see [`AvlTree::find_by`]).
    pub fn remove_by<F>(&mut self, probe: F) -> Option<T>
    where
        F: FnMut(&T) -> Ordering,
    {
        let slot = self.find_slot_by(probe)?;
        Some(self.remove_slot(slot).0)
    }

    /// Looks up the stored item equal to `key`.
    pub fn find(&self, key: &T) -> Option<&T> {
        self.find_slot(key).map(|slot| &self.node(slot).item)
    }

    /// Returns whether an item equal to `key` is stored.
    pub fn contains(&self, key: &T) -> bool {
        self.find_slot(key).is_some()
    }

    /// Looks up an item with a probe reporting how each visited item orders relative
    /// to the target, the same convention as [`slice::binary_search_by`].
    pub fn find_by<F>(&self, probe: F) -> Option<&T>
    where
        F: FnMut(&T) -> Ordering,
    {
        self.find_slot_by(probe).map(|slot| &self.node(slot).item)
    }

    /// Mutable variant of [`AvlTree::find_by`].
    ///
    /// The caller must not change the item's position in the order.
    pub fn find_mut_by<F>(&mut self, probe: F) -> Option<&mut T>
    where
        F: FnMut(&T) -> Ordering,
    {
        let slot = self.find_slot_by(probe)?;
        Some(&mut self.node_mut(slot).item)
    }

    /// Returns the smallest item that `probe` reports as [`Ordering::Greater`] than the
    /// target, i.e. the first item strictly after it.
    pub fn first_after_by<F>(&self, mut probe: F) -> Option<&T>
    where
        F: FnMut(&T) -> Ordering,
    {
        let mut best = None;
        let mut cur = self.root;
        while let Some(slot) = cur {
            let node = self.node(slot);
            if probe(&node.item) == Ordering::Greater {
                best = Some(slot);
                cur = node.left;
            } else {
                cur = node.right;
            }
        }
        best.map(|slot| &self.node(slot).item)
    }

    /// Smallest item.
    pub fn first(&self) -> Option<&T> {
        self.root.map(|root| &self.node(self.min_from(root)).item)
    }

    /// Largest item.
    pub fn last(&self) -> Option<&T> {
        self.root.map(|root| &self.node(self.max_from(root)).item)
    }

    /// Lazy in-order traversal.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter::new(self)
    }

    /// In-order cursor able to remove the element it last returned.
    pub fn cursor_mut(&mut self) -> CursorMut<'_, T> {
        CursorMut::new(self)
    }

    /// Verifies ordering, parent links, cached heights and the balance bound.
    pub fn check_invariants(&self) -> Result<()> {
        let mut count = 0usize;
        if let Some(root) = self.root {
            if self.node(root).parent.is_some() {
                return Err(GraphError::Corruption("AVL root has a parent".into()));
            }
            self.check_subtree(root, &mut count)?;
        }
        if count != self.len {
            return Err(GraphError::Corruption(format!(
                "AVL length {} but {} reachable nodes",
                self.len, count
            )));
        }
        let mut prev: Option<&T> = None;
        for item in self.iter() {
            if let Some(prev) = prev {
                if (self.cmp)(prev, item) != Ordering::Less {
                    return Err(GraphError::Corruption(
                        "AVL in-order traversal not strictly increasing".into(),
                    ));
                }
            }
            prev = Some(item);
        }
        Ok(())
    }

    fn check_subtree(&self, slot: SlotId, count: &mut usize) -> Result<u32> {
        *count += 1;
        let node = self.node(slot);
        let mut heights = [0u32; 2];
        for (i, child) in [node.left, node.right].into_iter().enumerate() {
            if let Some(child) = child {
                if self.node(child).parent != Some(slot) {
                    return Err(GraphError::Corruption(format!(
                        "AVL slot {child} has a stale parent link"
                    )));
                }
                heights[i] = self.check_subtree(child, count)?;
            }
        }
        let height = 1 + heights[0].max(heights[1]);
        if height != node.height {
            return Err(GraphError::Corruption(format!(
                "AVL slot {slot} caches height {} but measures {height}",
                node.height
            )));
        }
        if heights[0].abs_diff(heights[1]) > 1 {
            return Err(GraphError::Corruption(format!(
                "AVL slot {slot} out of balance"
            )));
        }
        Ok(height)
    }

    pub(crate) fn first_slot(&self) -> Option<SlotId> {
        self.root.map(|root| self.min_from(root))
    }

    pub(crate) fn item(&self, slot: SlotId) -> &T {
        &self.node(slot).item
    }

    pub(crate) fn successor(&self, slot: SlotId) -> Option<SlotId> {
        if let Some(right) = self.node(slot).right {
            return Some(self.min_from(right));
        }
        let mut child = slot;
        let mut parent = self.node(slot).parent;
        while let Some(p) = parent {
            if self.node(p).left == Some(child) {
                return Some(p);
            }
            child = p;
            parent = self.node(p).parent;
        }
        None
    }

    /// Removes the item held by `slot` and returns it together with the slot now
    /// holding its in-order successor.
    pub(crate) fn remove_slot(&mut self, slot: SlotId) -> (T, Option<SlotId>) {
        let node = self.node(slot);
        if let (Some(_), Some(right)) = (node.left, node.right) {
            // The successor's item moves into `slot`, so `slot` is where the walk resumes.
            let succ = self.min_from(right);
            self.swap_items(slot, succ);
            let item = self.unlink(succ);
            return (item, Some(slot));
        }
        let succ = self.successor(slot);
        let item = self.unlink(slot);
        (item, succ)
    }

    fn find_slot(&self, key: &T) -> Option<SlotId> {
        self.find_slot_by(|item| (self.cmp)(item, key))
    }

    fn find_slot_by<F>(&self, mut probe: F) -> Option<SlotId>
    where
        F: FnMut(&T) -> Ordering,
    {
        let mut cur = self.root;
        while let Some(slot) = cur {
            let node = self.node(slot);
            match probe(&node.item) {
                Ordering::Equal => return Some(slot),
                Ordering::Greater => cur = node.left,
                Ordering::Less => cur = node.right,
            }
        }
        None
    }

    /// Detaches a slot with at most one child and rebalances up to the root.
    fn unlink(&mut self, slot: SlotId) -> T {
        let node = self.node(slot);
        let child = node.left.or(node.right);
        let parent = node.parent;
        self.replace_child(parent, slot, child);
        if let Some(child) = child {
            self.node_mut(child).parent = parent;
        }
        let item = self.release(slot);
        self.len -= 1;
        self.retrace(parent);
        item
    }

    fn retrace(&mut self, mut cur: Option<SlotId>) {
        while let Some(slot) = cur {
            let top = self.rebalance(slot);
            cur = self.node(top).parent;
        }
    }

    fn rebalance(&mut self, slot: SlotId) -> SlotId {
        self.update_height(slot);
        let balance = self.balance_factor(slot);
        if balance > 1 {
            let right = self.child(slot, Side::Right);
            if self.balance_factor(right) < 0 {
                self.rotate_right(right);
            }
            return self.rotate_left(slot);
        }
        if balance < -1 {
            let left = self.child(slot, Side::Left);
            if self.balance_factor(left) > 0 {
                self.rotate_left(left);
            }
            return self.rotate_right(slot);
        }
        slot
    }

    fn rotate_left(&mut self, x: SlotId) -> SlotId {
        let y = self.child(x, Side::Right);
        let inner = self.node(y).left;
        let parent = self.node(x).parent;
        self.node_mut(x).right = inner;
        if let Some(inner) = inner {
            self.node_mut(inner).parent = Some(x);
        }
        self.node_mut(y).parent = parent;
        self.replace_child(parent, x, Some(y));
        self.node_mut(y).left = Some(x);
        self.node_mut(x).parent = Some(y);
        self.update_height(x);
        self.update_height(y);
        y
    }

    fn rotate_right(&mut self, x: SlotId) -> SlotId {
        let y = self.child(x, Side::Left);
        let inner = self.node(y).right;
        let parent = self.node(x).parent;
        self.node_mut(x).left = inner;
        if let Some(inner) = inner {
            self.node_mut(inner).parent = Some(x);
        }
        self.node_mut(y).parent = parent;
        self.replace_child(parent, x, Some(y));
        self.node_mut(y).right = Some(x);
        self.node_mut(x).parent = Some(y);
        self.update_height(x);
        self.update_height(y);
        y
    }

    fn replace_child(&mut self, parent: Option<SlotId>, old: SlotId, new: Option<SlotId>) {
        match parent {
            None => self.root = new,
            Some(p) => {
                let node = self.node_mut(p);
                if node.left == Some(old) {
                    node.left = new;
                } else {
                    node.right = new;
                }
            }
        }
    }

    fn swap_items(&mut self, a: SlotId, b: SlotId) {
        let (lo, hi) = if a < b { (a, b) } else { (b, a) };
        let (head, tail) = self.slots.split_at_mut(hi);
        match (head[lo].as_mut(), tail[0].as_mut()) {
            (Some(x), Some(y)) => std::mem::swap(&mut x.item, &mut y.item),
            _ => unreachable!("AVL swap on vacant slot"),
        }
    }

    fn min_from(&self, mut slot: SlotId) -> SlotId {
        while let Some(left) = self.node(slot).left {
            slot = left;
        }
        slot
    }

    fn max_from(&self, mut slot: SlotId) -> SlotId {
        while let Some(right) = self.node(slot).right {
            slot = right;
        }
        slot
    }

    fn h(&self, slot: Option<SlotId>) -> u32 {
        slot.map_or(0, |slot| self.node(slot).height)
    }

    fn balance_factor(&self, slot: SlotId) -> i64 {
        let node = self.node(slot);
        i64::from(self.h(node.right)) - i64::from(self.h(node.left))
    }

    fn update_height(&mut self, slot: SlotId) {
        let node = self.node(slot);
        let height = 1 + self.h(node.left).max(self.h(node.right));
        self.node_mut(slot).height = height;
    }

    fn child(&self, slot: SlotId, side: Side) -> SlotId {
        let node = self.node(slot);
        let child = match side {
            Side::Left => node.left,
            Side::Right => node.right,
        };
        match child {
            Some(child) => child,
            None => unreachable!("AVL rotation around missing {side:?} child of slot {slot}"),
        }
    }

    fn alloc(&mut self, node: AvlNode<T>) -> SlotId {
        match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = Some(node);
                slot
            }
            None => {
                self.slots.push(Some(node));
                self.slots.len() - 1
            }
        }
    }

    fn release(&mut self, slot: SlotId) -> T {
        match self.slots[slot].take() {
            Some(node) => {
                self.free.push(slot);
                node.item
            }
            None => unreachable!("AVL release of vacant slot {slot}"),
        }
    }

    fn node(&self, slot: SlotId) -> &AvlNode<T> {
        match &self.slots[slot] {
            Some(node) => node,
            None => unreachable!("AVL link to vacant slot {slot}"),
        }
    }

    fn node_mut(&mut self, slot: SlotId) -> &mut AvlNode<T> {
        match &mut self.slots[slot] {
            Some(node) => node,
            None => unreachable!("AVL link to vacant slot {slot}"),
        }
    }
}

#[derive(Clone, Copy, Debug)]
enum Side {
    Left,
    Right,
}

impl<T: fmt::Debug> fmt::Debug for AvlTree<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<'a, T> IntoIterator for &'a AvlTree<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: Ord + 'static> FromIterator<T> for AvlTree<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut tree = AvlTree::new();
        for item in iter {
            tree.insert(item);
        }
        tree
    }
}
