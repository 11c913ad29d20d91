use std::cmp::Ordering;

use crate::storage::avl::AvlTree;
use crate::storage::types::{Edge, MetaEdge};
use crate::types::{EdgeId, NodeId};

use super::store::NodeRecord;

pub(crate) fn node_tree() -> AvlTree<NodeRecord> {
    AvlTree::with_comparator(|a: &NodeRecord, b: &NodeRecord| a.id.cmp(&b.id))
}

pub(crate) fn edge_tree() -> AvlTree<Edge> {
    AvlTree::with_comparator(|a: &Edge, b: &Edge| a.id.cmp(&b.id))
}

pub(crate) fn meta_tree() -> AvlTree<MetaEdge> {
    AvlTree::with_comparator(|a: &MetaEdge, b: &MetaEdge| {
        (a.source, a.target).cmp(&(b.source, b.target))
    })
}

pub(crate) fn by_node(id: NodeId) -> impl Fn(&NodeRecord) -> Ordering {
    move |record| record.id.cmp(&id)
}

pub(crate) fn by_edge(id: EdgeId) -> impl Fn(&Edge) -> Ordering {
    move |edge| edge.id.cmp(&id)
}

pub(crate) fn by_endpoints(source: NodeId, target: NodeId) -> impl Fn(&MetaEdge) -> Ordering {
    move |meta| (meta.source, meta.target).cmp(&(source, target))
}

/// First item of `tree` whose key follows `after`, or the first item at all.
pub(crate) fn next_after<T, K, F>(tree: &AvlTree<T>, after: Option<K>, key: F) -> Option<&T>
where
    K: Ord,
    F: Fn(&T) -> K,
{
    match after {
        None => tree.first(),
        Some(after) => tree.first_after_by(|item| key(item).cmp(&after)),
    }
}
