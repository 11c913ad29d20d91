#![allow(missing_docs)]

use hgraph::{
    CoarseningStrategy, EdgeView, GraphOptions, HierarchicalGraph, MaxMatchingCoarsening, NodeId,
};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

const EPS: f64 = 1e-6;

fn weight(graph: &HierarchicalGraph, source: NodeId, target: NodeId) -> f64 {
    graph
        .meta_edge_weight(source, target)
        .unwrap_or_else(|| panic!("missing meta-edge {source}->{target}"))
}

/// A and B are grouped into G next to the group C = {D}. A -> D never touched G
/// or C directly (deep) while A -> C ends on C (non-deep), so with divisor 2 the
/// meta-edge G -> C weighs 1/1 + 3/2.
#[test]
fn grouping_and_ungrouping_preserve_edge_weights() {
    let graph = HierarchicalGraph::open(GraphOptions::coarsening()).unwrap();
    let a = graph.add_node();
    let b = graph.add_node();
    let d = graph.add_node();
    let c = graph.group_nodes(&[d]).unwrap();
    let deep = graph.add_edge(a, d, 1.0).unwrap();
    let shallow = graph.add_edge(a, c, 3.0).unwrap();
    let inside = graph.add_edge(a, b, 4.0).unwrap();
    let before_meta = graph.meta_edge(a, c).unwrap();

    let g = graph.group_nodes(&[a, b]).unwrap();
    assert!((weight(&graph, g, c) - 2.5).abs() < EPS);
    assert_eq!(graph.meta_edge(g, c).unwrap().count, 2);
    assert_eq!(graph.edge_view(inside).unwrap(), EdgeView::Hidden);
    assert_eq!(graph.visible_nodes().map(|n| n.id).collect::<Vec<_>>(), vec![c, g]);
    graph.verify().unwrap();

    graph.ungroup_nodes(g).unwrap();
    assert!(graph.meta_edge(g, c).is_none());
    let after_meta = graph.meta_edge(a, c).unwrap();
    assert_eq!(after_meta.count, before_meta.count);
    assert!((after_meta.weight - before_meta.weight).abs() < EPS);
    for (edge, w) in [(deep, 1.0), (shallow, 3.0), (inside, 4.0)] {
        assert_eq!(graph.edge(edge).unwrap().weight, w);
    }
    assert_eq!(graph.edge_view(shallow).unwrap(), EdgeView::Direct);
    assert_eq!(graph.edge_view(inside).unwrap(), EdgeView::Direct);
    graph.verify().unwrap();
}

#[test]
fn grouping_round_trip_restores_parent_and_level() {
    let graph = HierarchicalGraph::new();
    let a = graph.add_node();
    let b = graph.add_node();
    let c = graph.add_node();
    let top = graph.group_nodes(&[a, b, c]).unwrap();
    let nested = graph.group_nodes(&[c]).unwrap();
    let before: Vec<_> = [a, b]
        .iter()
        .map(|n| (graph.parent(*n).unwrap(), graph.level(*n).unwrap()))
        .collect();

    let pair = graph.group_nodes(&[a, b]).unwrap();
    assert_eq!(graph.level(pair).unwrap(), 1);
    graph.ungroup_nodes(pair).unwrap();

    let after: Vec<_> = [a, b]
        .iter()
        .map(|n| (graph.parent(*n).unwrap(), graph.level(*n).unwrap()))
        .collect();
    assert_eq!(before, after);
    assert_eq!(graph.parent(nested).unwrap(), Some(top));
    assert_eq!(graph.level(top).unwrap(), 2);
    graph.verify().unwrap();
}

#[test]
fn nested_views_follow_expansion() {
    let graph = HierarchicalGraph::new();
    let leaves: Vec<_> = (0..4).map(|_| graph.add_node()).collect();
    let x = graph.add_node();
    for leaf in &leaves {
        graph.add_edge(*leaf, x, 1.0).unwrap();
    }
    let left = graph.group_nodes(&leaves[..2]).unwrap();
    let right = graph.group_nodes(&leaves[2..]).unwrap();
    let root = graph.group_nodes(&[left, right]).unwrap();
    assert!((weight(&graph, root, x) - 4.0).abs() < EPS);

    graph.expand(root).unwrap();
    assert!(graph.meta_edge(root, x).is_none());
    assert!((weight(&graph, left, x) - 2.0).abs() < EPS);
    assert!((weight(&graph, right, x) - 2.0).abs() < EPS);

    graph.expand(left).unwrap();
    assert!(graph.meta_edge(left, x).is_none());
    assert_eq!(graph.visible_edges().count(), 2);
    graph.verify().unwrap();

    // Retracting the root hides the expanded child again.
    graph.retract(root).unwrap();
    assert!((weight(&graph, root, x) - 4.0).abs() < EPS);
    assert_eq!(graph.meta_edge_count(), 1);
    assert_eq!(graph.representative(leaves[0]).unwrap(), root);
    graph.verify().unwrap();
}

#[test]
fn random_graph_coarsens_and_refines_consistently() {
    let graph = HierarchicalGraph::open(GraphOptions::coarsening()).unwrap();
    let mut rng = ChaCha8Rng::seed_from_u64(0xc0a5);
    let nodes: Vec<_> = (0..200).map(|_| graph.add_node()).collect();
    for _ in 0..600 {
        let s = nodes[rng.gen_range(0..nodes.len())];
        let t = nodes[rng.gen_range(0..nodes.len())];
        graph.add_edge(s, t, rng.gen_range(0.5..4.0)).unwrap();
    }
    let initial = graph.stats();

    let strategy = MaxMatchingCoarsening;
    let mut levels = 0;
    while levels < 5 && strategy.coarsen(&graph).unwrap() > 0 {
        levels += 1;
        graph.verify().unwrap();
    }
    assert!(levels > 0);
    assert!(graph.stats().visible_nodes < initial.visible_nodes);

    while strategy.refine(&graph).unwrap() > 0 {
        graph.verify().unwrap();
    }
    let refined = graph.stats();
    assert_eq!(refined.nodes, initial.nodes);
    assert_eq!(refined.edges, initial.edges);
    assert_eq!(refined.meta_edges, 0);
    assert_eq!(refined.max_level, 0);
}
