//! Visibility rules and meta-edge bookkeeping.

use std::collections::BTreeSet;

use tracing::{trace, warn};

use crate::storage::types::{Edge, EdgeView, MetaEdge};
use crate::types::{EdgeId, GraphError, NodeId, Result};

use super::helpers::{by_edge, by_endpoints};
use super::store::GraphStore;

impl GraphStore {
    /// Topmost retracted proper ancestor of `id`, or `id` itself.
    pub(crate) fn representative(&self, id: NodeId) -> NodeId {
        let mut rep = id;
        let mut at = self.record(id).and_then(|record| record.parent);
        while let Some(ancestor) = at {
            let Some(record) = self.record(ancestor) else {
                break;
            };
            if !record.expanded {
                rep = ancestor;
            }
            at = record.parent;
        }
        rep
    }

    pub(crate) fn is_visible(&self, id: NodeId) -> bool {
        match self.record(id) {
            Some(record) => {
                !(record.group && record.expanded) && self.representative(id) == id
            }
            None => false,
        }
    }

    pub(crate) fn edge_view(&self, edge: &Edge) -> EdgeView {
        let source = self.representative(edge.source);
        let target = self.representative(edge.target);
        if source == target {
            return if edge.source == edge.target && self.is_visible(source) {
                EdgeView::Direct
            } else {
                EdgeView::Hidden
            };
        }
        if !self.is_visible(source) || !self.is_visible(target) {
            return EdgeView::Hidden;
        }
        if source == edge.source && target == edge.target {
            EdgeView::Direct
        } else {
            EdgeView::Meta(source, target)
        }
    }

    /// `roots` and all of their descendants.
    pub(crate) fn subtree<I>(&self, roots: I) -> Vec<NodeId>
    where
        I: IntoIterator<Item = NodeId>,
    {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = roots.into_iter().collect();
        while let Some(id) = stack.pop() {
            if let Some(record) = self.record(id) {
                out.push(id);
                stack.extend(record.children.iter().copied());
            }
        }
        out
    }

    pub(crate) fn incident_edges<I>(&self, nodes: I) -> BTreeSet<EdgeId>
    where
        I: IntoIterator<Item = NodeId>,
    {
        let mut edges = BTreeSet::new();
        for id in nodes {
            if let Some(record) = self.record(id) {
                edges.extend(record.outgoing.iter().copied());
                edges.extend(record.incoming.iter().copied());
            }
        }
        edges
    }

    /// Records the current view of each edge, for a later [`GraphStore::reconcile`].
    pub(crate) fn capture_views(&self, edges: &BTreeSet<EdgeId>) -> Vec<(EdgeId, EdgeView)> {
        edges
            .iter()
            .filter_map(|id| self.edges.find_by(by_edge(*id)))
            .map(|edge| (edge.id, self.edge_view(edge)))
            .collect()
    }

    /// Moves each captured edge from its old meta-edge to its current one.
    pub(crate) fn reconcile(&mut self, before: Vec<(EdgeId, EdgeView)>) -> Result<()> {
        for (id, old) in before {
            let Some(edge) = self.edges.find_by(by_edge(id)).copied() else {
                continue;
            };
            let new = self.edge_view(&edge);
            if new == old {
                continue;
            }
            if let EdgeView::Meta(source, target) = old {
                self.pull_meta(&edge, source, target)?;
            }
            if let EdgeView::Meta(source, target) = new {
                self.push_meta(&edge, source, target);
            }
        }
        Ok(())
    }

    pub(crate) fn push_meta(&mut self, edge: &Edge, source: NodeId, target: NodeId) {
        match self.metas.find_mut_by(by_endpoints(source, target)) {
            Some(meta) => {
                self.builder.push_edge(edge, source, target, meta);
                meta.count += 1;
            }
            None => {
                let mut meta = MetaEdge::new(source, target);
                self.builder.push_edge(edge, source, target, &mut meta);
                meta.count = 1;
                trace!(%source, %target, "meta-edge created");
                self.metas.insert(meta);
            }
        }
    }

    pub(crate) fn pull_meta(&mut self, edge: &Edge, source: NodeId, target: NodeId) -> Result<()> {
        let Some(meta) = self.metas.find_mut_by(by_endpoints(source, target)) else {
            warn!(edge = %edge.id, %source, %target, "represented edge has no meta-edge");
            return Err(GraphError::Corruption(format!(
                "edge {} is not represented by a meta-edge {source}->{target}",
                edge.id
            )));
        };
        self.builder.pull_edge(edge, edge.source, edge.target, meta);
        meta.count -= 1;
        if meta.count == 0 {
            self.metas.remove_by(by_endpoints(source, target));
            trace!(%source, %target, "meta-edge retired");
        }
        Ok(())
    }
}
