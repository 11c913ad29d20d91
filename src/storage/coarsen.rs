//! Multilevel coarsening strategies built on grouping.

use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;
use tracing::{debug, info};

use crate::storage::graph::HierarchicalGraph;
use crate::types::{NodeId, Result};

/// Strategy collapsing and restoring one level of a [`HierarchicalGraph`].
pub trait CoarseningStrategy: Send + Sync {
    /// Groups top-level nodes into a coarser level and returns how many groups were
    /// created.
    fn coarsen(&self, graph: &HierarchicalGraph) -> Result<usize>;

    /// Dissolves the coarsest level and returns how many groups were dissolved.
    fn refine(&self, graph: &HierarchicalGraph) -> Result<usize>;
}

type Neighbors = SmallVec<[(NodeId, f64); 4]>;

/// Greedy heavy-edge matching: each top-level node is paired with its unmatched
/// neighbor of largest connecting weight.
#[derive(Clone, Copy, Debug, Default)]
pub struct MaxMatchingCoarsening;

impl MaxMatchingCoarsening {
    /// Visible top-level nodes and the weighted links between them, through direct
    /// edges and meta-edges alike.
    fn top_level_adjacency(
        graph: &HierarchicalGraph,
    ) -> (Vec<NodeId>, FxHashMap<NodeId, Neighbors>) {
        let mut candidates = Vec::new();
        for node in graph.top_level_nodes() {
            if graph.is_visible(node.id).unwrap_or(false) {
                candidates.push(node.id);
            }
        }
        let members: FxHashSet<NodeId> = candidates.iter().copied().collect();
        let mut links: Vec<(NodeId, NodeId, f64)> = graph
            .visible_edges()
            .map(|edge| (edge.source, edge.target, edge.weight))
            .collect();
        links.extend(
            graph
                .meta_edges()
                .map(|meta| (meta.source, meta.target, meta.weight)),
        );

        let mut adjacency: FxHashMap<NodeId, Neighbors> = FxHashMap::default();
        for (source, target, weight) in links {
            if source == target || !members.contains(&source) || !members.contains(&target) {
                continue;
            }
            adjacency.entry(source).or_default().push((target, weight));
            adjacency.entry(target).or_default().push((source, weight));
        }
        (candidates, adjacency)
    }
}

impl CoarseningStrategy for MaxMatchingCoarsening {
    fn coarsen(&self, graph: &HierarchicalGraph) -> Result<usize> {
        let (candidates, adjacency) = Self::top_level_adjacency(graph);
        let mut matched: FxHashSet<NodeId> = FxHashSet::default();
        let mut pairs = Vec::new();
        for node in candidates {
            if matched.contains(&node) {
                continue;
            }
            let best = adjacency
                .get(&node)
                .into_iter()
                .flatten()
                .filter(|(other, _)| !matched.contains(other))
                .max_by(|x, y| x.1.total_cmp(&y.1).then_with(|| y.0.cmp(&x.0)));
            if let Some(&(partner, _)) = best {
                matched.insert(node);
                matched.insert(partner);
                pairs.push([node, partner]);
            }
        }
        for pair in &pairs {
            graph.group_nodes(pair)?;
        }
        info!(groups = pairs.len(), "coarsened one level");
        Ok(pairs.len())
    }

    fn refine(&self, graph: &HierarchicalGraph) -> Result<usize> {
        let top: Vec<_> = graph.top_level_nodes().filter(|n| n.is_group()).collect();
        let Some(level) = top.iter().map(|n| n.level).max() else {
            return Ok(0);
        };
        let mut dissolved = 0;
        for node in top.iter().filter(|n| n.level == level) {
            if node.child_count > 0 {
                graph.ungroup_nodes(node.id)?;
                dissolved += 1;
            }
        }
        debug!(level, dissolved, "refined one level");
        Ok(dissolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(len: usize) -> (HierarchicalGraph, Vec<NodeId>) {
        let graph = HierarchicalGraph::new();
        let nodes: Vec<NodeId> = (0..len).map(|_| graph.add_node()).collect();
        for pair in nodes.windows(2) {
            graph.add_edge(pair[0], pair[1], 1.0).unwrap();
        }
        (graph, nodes)
    }

    #[test]
    fn coarsening_pairs_neighbors() {
        let (graph, nodes) = path(4);
        let created = MaxMatchingCoarsening.coarsen(&graph).unwrap();
        assert_eq!(created, 2);
        assert_eq!(graph.parent(nodes[0]).unwrap(), graph.parent(nodes[1]).unwrap());
        assert_eq!(graph.parent(nodes[2]).unwrap(), graph.parent(nodes[3]).unwrap());
        assert_ne!(graph.parent(nodes[1]).unwrap(), graph.parent(nodes[2]).unwrap());
        assert_eq!(graph.top_level_nodes().count(), 2);
        assert_eq!(graph.meta_edge_count(), 1);
        graph.verify().unwrap();
    }

    #[test]
    fn heavier_edges_win() {
        let graph = HierarchicalGraph::new();
        let a = graph.add_node();
        let b = graph.add_node();
        let c = graph.add_node();
        graph.add_edge(a, b, 1.0).unwrap();
        graph.add_edge(a, c, 5.0).unwrap();
        assert_eq!(MaxMatchingCoarsening.coarsen(&graph).unwrap(), 1);
        assert_eq!(graph.parent(a).unwrap(), graph.parent(c).unwrap());
        assert_eq!(graph.parent(b).unwrap(), None);
    }

    #[test]
    fn repeated_coarsening_then_refinement_restores_leaves() {
        let (graph, nodes) = path(8);
        assert_eq!(MaxMatchingCoarsening.coarsen(&graph).unwrap(), 4);
        assert_eq!(MaxMatchingCoarsening.coarsen(&graph).unwrap(), 2);
        assert_eq!(graph.stats().max_level, 2);
        graph.verify().unwrap();

        assert_eq!(MaxMatchingCoarsening.refine(&graph).unwrap(), 2);
        assert_eq!(MaxMatchingCoarsening.refine(&graph).unwrap(), 4);
        assert_eq!(MaxMatchingCoarsening.refine(&graph).unwrap(), 0);
        for node in nodes {
            assert_eq!(graph.parent(node).unwrap(), None);
        }
        assert_eq!(graph.meta_edge_count(), 0);
        assert_eq!(graph.visible_edges().count(), 7);
        graph.verify().unwrap();
    }

    #[test]
    fn isolated_nodes_stay_unmatched() {
        let graph = HierarchicalGraph::new();
        graph.add_node();
        graph.add_node();
        assert_eq!(MaxMatchingCoarsening.coarsen(&graph).unwrap(), 0);
        assert_eq!(MaxMatchingCoarsening.refine(&graph).unwrap(), 0);
    }
}
