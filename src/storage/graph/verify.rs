use tracing::warn;

use super::helpers::{by_endpoints, meta_tree};
use super::store::GraphStore;
use super::HierarchicalGraph;
use crate::storage::types::{EdgeView, GraphStats, MetaEdge};
use crate::types::{GraphError, Result};

const WEIGHT_TOLERANCE: f64 = 1e-6;

fn corruption(msg: String) -> GraphError {
    warn!(%msg, "graph verification failed");
    GraphError::Corruption(msg)
}

impl GraphStore {
    fn verify_trees(&self) -> Result<()> {
        self.nodes.check_invariants()?;
        self.edges.check_invariants()?;
        self.top_level.check_invariants()?;
        self.metas.check_invariants()?;
        for record in &self.nodes {
            record.children.check_invariants()?;
            record.outgoing.check_invariants()?;
            record.incoming.check_invariants()?;
        }
        Ok(())
    }

    fn verify_hierarchy(&self) -> Result<()> {
        let mut roots = 0;
        for record in &self.nodes {
            let id = record.id;
            match record.parent {
                None => {
                    roots += 1;
                    if !self.top_level.contains(&id) {
                        return Err(corruption(format!("node {id} missing from the top level")));
                    }
                }
                Some(parent) => {
                    let listed = self
                        .record(parent)
                        .is_some_and(|p| p.group && p.children.contains(&id));
                    if !listed {
                        return Err(corruption(format!(
                            "node {id} is not a child of its parent {parent}"
                        )));
                    }
                }
            }
            let mut level = 0;
            for child in &record.children {
                let child_record = self
                    .record(*child)
                    .ok_or_else(|| corruption(format!("node {id} lists missing child {child}")))?;
                if child_record.parent != Some(id) {
                    return Err(corruption(format!(
                        "child {child} does not point back to {id}"
                    )));
                }
                level = level.max(child_record.level + 1);
            }
            if level != record.level {
                return Err(corruption(format!(
                    "node {id} has level {} but its children imply {level}",
                    record.level
                )));
            }
        }
        if roots != self.top_level.len() {
            return Err(corruption(format!(
                "top level lists {} nodes but {roots} have no parent",
                self.top_level.len()
            )));
        }
        Ok(())
    }

    fn verify_edges(&self) -> Result<()> {
        for edge in &self.edges {
            let endpoints = self.record(edge.source).zip(self.record(edge.target));
            let Some((source, target)) = endpoints else {
                return Err(corruption(format!("edge {} has a missing endpoint", edge.id)));
            };
            if !source.outgoing.contains(&edge.id) || !target.incoming.contains(&edge.id) {
                return Err(corruption(format!(
                    "edge {} missing from its endpoints' adjacency",
                    edge.id
                )));
            }
        }
        Ok(())
    }

    /// Rebuilds every meta-edge from scratch and compares with the live ones.
    fn verify_meta_edges(&self) -> Result<()> {
        let mut expected = meta_tree();
        for edge in &self.edges {
            if let EdgeView::Meta(source, target) = self.edge_view(edge) {
                let mut meta = expected
                    .remove_by(by_endpoints(source, target))
                    .unwrap_or_else(|| MetaEdge::new(source, target));
                self.builder.push_edge(edge, source, target, &mut meta);
                meta.count += 1;
                expected.insert(meta);
            }
        }
        if expected.len() != self.metas.len() {
            return Err(corruption(format!(
                "expected {} meta-edges, found {}",
                expected.len(),
                self.metas.len()
            )));
        }
        for want in &expected {
            let Some(have) = self.metas.find_by(by_endpoints(want.source, want.target)) else {
                return Err(corruption(format!(
                    "meta-edge {}->{} is missing",
                    want.source, want.target
                )));
            };
            let tolerance = WEIGHT_TOLERANCE * want.weight.abs().max(1.0);
            if have.count != want.count || (have.weight - want.weight).abs() > tolerance {
                return Err(corruption(format!(
                    "meta-edge {}->{} holds {} edges weighing {}, expected {} weighing {}",
                    want.source, want.target, have.count, have.weight, want.count, want.weight
                )));
            }
        }
        Ok(())
    }

    pub(crate) fn stats(&self) -> GraphStats {
        let mut stats = GraphStats {
            nodes: self.nodes.len(),
            edges: self.edges.len(),
            meta_edges: self.metas.len(),
            ..GraphStats::default()
        };
        for record in &self.nodes {
            if record.group {
                stats.groups += 1;
            }
            if self.is_visible(record.id) {
                stats.visible_nodes += 1;
            }
            stats.max_level = stats.max_level.max(record.level);
        }
        stats
    }
}

impl HierarchicalGraph {
    /// Checks every structural invariant of the graph.
    ///
    /// Covers index balance, parent/child links, levels, edge adjacency, and that each
    /// meta-edge matches a from-scratch aggregation of the edges it represents.
    pub fn verify(&self) -> Result<()> {
        let store = self.store.read();
        store.verify_trees()?;
        store.verify_hierarchy()?;
        store.verify_edges()?;
        store.verify_meta_edges()
    }

    /// Aggregate counters.
    pub fn stats(&self) -> GraphStats {
        self.store.read().stats()
    }
}
