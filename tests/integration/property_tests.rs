#![allow(missing_docs)]

use std::collections::BTreeSet;

use hgraph::{
    AvlTree, Edge, EdgeId, GraphOptions, HierarchicalGraph, MetaEdge, MetaEdgeBuilder, NodeId,
    SumBuilder,
};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum TreeOp {
    Insert(u16),
    Remove(u16),
}

fn arb_tree_op() -> impl Strategy<Value = TreeOp> {
    prop_oneof![
        3 => any::<u16>().prop_map(TreeOp::Insert),
        1 => any::<u16>().prop_map(TreeOp::Remove),
    ]
}

#[derive(Debug, Clone)]
enum HierarchyOp {
    Group(Vec<usize>),
    Ungroup(usize),
    Toggle(usize),
    Reweight(usize, f64),
}

fn arb_hierarchy_op() -> impl Strategy<Value = HierarchyOp> {
    prop_oneof![
        prop::collection::vec(0usize..64, 1..4).prop_map(HierarchyOp::Group),
        (0usize..64).prop_map(HierarchyOp::Ungroup),
        (0usize..64).prop_map(HierarchyOp::Toggle),
        (0usize..64, 0.0f64..10.0).prop_map(|(i, w)| HierarchyOp::Reweight(i, w)),
    ]
}

proptest! {
    #[test]
    fn prop_avl_stays_balanced_and_ordered(ops in prop::collection::vec(arb_tree_op(), 1..400)) {
        let mut tree = AvlTree::new();
        let mut model = BTreeSet::new();
        for op in ops {
            match op {
                TreeOp::Insert(key) => {
                    prop_assert_eq!(tree.insert(key).is_some(), !model.insert(key));
                }
                TreeOp::Remove(key) => {
                    prop_assert_eq!(tree.remove(&key), model.take(&key));
                }
            }
        }
        tree.check_invariants().unwrap();
        let n = tree.len();
        prop_assert_eq!(n, model.len());
        prop_assert!(tree.height() as f64 <= 1.44 * ((n + 2) as f64).log2());
        let keys: Vec<u16> = tree.iter().copied().collect();
        prop_assert!(keys.windows(2).all(|w| w[0] < w[1]));
        prop_assert_eq!(keys, model.into_iter().collect::<Vec<_>>());
    }

    #[test]
    fn prop_meta_push_pull_is_neutral(
        start in -100.0f64..100.0,
        weight in 0.0f64..50.0,
        divisor in 0.5f64..8.0,
        source in 1u64..6,
        target in 1u64..6,
    ) {
        let builder = SumBuilder::new(divisor).unwrap();
        let mut meta = MetaEdge::new(NodeId(1), NodeId(2));
        meta.weight = start;
        meta.count = 1;
        let edge = Edge { id: EdgeId(99), source: NodeId(source), target: NodeId(target), weight };
        builder.push_edge(&edge, meta.source, meta.target, &mut meta);
        builder.pull_edge(&edge, edge.source, edge.target, &mut meta);
        prop_assert!((meta.weight - start).abs() < 1e-6);
    }

    #[test]
    fn prop_hierarchy_changes_keep_meta_edges_exact(
        edges in prop::collection::vec((0usize..12, 0usize..12, 0.0f64..10.0), 0..40),
        ops in prop::collection::vec(arb_hierarchy_op(), 0..30),
    ) {
        let graph = HierarchicalGraph::open(GraphOptions::coarsening()).unwrap();
        let mut nodes: Vec<NodeId> = (0..12).map(|_| graph.add_node()).collect();
        let edge_ids: Vec<EdgeId> = edges
            .iter()
            .map(|(s, t, w)| graph.add_edge(nodes[*s], nodes[*t], *w).unwrap())
            .collect();
        for op in ops {
            match op {
                HierarchyOp::Group(picks) => {
                    let members: BTreeSet<NodeId> =
                        picks.iter().map(|i| nodes[i % nodes.len()]).collect();
                    let members: Vec<NodeId> = members.into_iter().collect();
                    // Only members sharing a parent may be grouped.
                    if let Ok(group) = graph.group_nodes(&members) {
                        nodes.push(group);
                    }
                }
                HierarchyOp::Ungroup(i) => {
                    let node = nodes[i % nodes.len()];
                    if graph.ungroup_nodes(node).is_ok() {
                        nodes.retain(|n| *n != node);
                    }
                }
                HierarchyOp::Toggle(i) => {
                    let node = nodes[i % nodes.len()];
                    if let Ok(expanded) = graph.is_expanded(node) {
                        if expanded {
                            graph.retract(node).unwrap();
                        } else {
                            graph.expand(node).unwrap();
                        }
                    }
                }
                HierarchyOp::Reweight(i, w) => {
                    if !edge_ids.is_empty() {
                        let edge = edge_ids[i % edge_ids.len()];
                        if graph.edge(edge).is_ok() {
                            graph.set_edge_weight(edge, w).unwrap();
                        }
                    }
                }
            }
            graph.verify().unwrap();
        }
    }

    #[test]
    fn prop_group_ungroup_round_trip(picks in prop::collection::btree_set(0usize..10, 1..6)) {
        let graph = HierarchicalGraph::new();
        let nodes: Vec<NodeId> = (0..10).map(|_| graph.add_node()).collect();
        for pair in nodes.windows(2) {
            graph.add_edge(pair[0], pair[1], 1.0).unwrap();
        }
        let members: Vec<NodeId> = picks.iter().map(|i| nodes[*i]).collect();
        let before: Vec<_> = members
            .iter()
            .map(|n| (graph.parent(*n).unwrap(), graph.level(*n).unwrap()))
            .collect();

        let group = graph.group_nodes(&members).unwrap();
        graph.ungroup_nodes(group).unwrap();

        let after: Vec<_> = members
            .iter()
            .map(|n| (graph.parent(*n).unwrap(), graph.level(*n).unwrap()))
            .collect();
        prop_assert_eq!(before, after);
        prop_assert_eq!(graph.meta_edge_count(), 0);
        prop_assert_eq!(graph.visible_edges().count(), 9);
        graph.verify().unwrap();
    }
}
