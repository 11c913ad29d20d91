#![allow(missing_docs)]

use std::thread;

use hgraph::{GraphOptions, HierarchicalGraph, NodeId};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

const THREADS: usize = 6;
const ROUNDS: usize = 60;
const EPS: f64 = 1e-6;

fn worker(graph: &HierarchicalGraph, hub: NodeId, seed: u64) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    for _ in 0..ROUNDS {
        let members: Vec<_> = (0..rng.gen_range(2..5)).map(|_| graph.add_node()).collect();
        for member in &members {
            graph.add_edge(*member, hub, rng.gen_range(1.0..3.0)).unwrap();
        }
        let group = graph.group_nodes(&members).unwrap();
        if rng.gen_bool(0.5) {
            graph.expand(group).unwrap();
            graph.retract(group).unwrap();
        }
        let nested = graph.group_nodes(&[group]).unwrap();
        graph.ungroup_nodes(nested).unwrap();
        if rng.gen_bool(0.3) {
            graph.ungroup_nodes(group).unwrap();
        }
    }
}

#[test]
fn concurrent_hierarchy_changes_keep_meta_edges_consistent() {
    let graph = HierarchicalGraph::open(GraphOptions::coarsening()).unwrap();
    let hub = graph.add_node();

    thread::scope(|s| {
        for t in 0..THREADS {
            let graph = &graph;
            s.spawn(move || worker(graph, hub, 0xfeed + t as u64));
        }
        // A reader draining full traversals alongside the writers.
        s.spawn(|| {
            for _ in 0..ROUNDS {
                let visible = graph.visible_nodes().count();
                assert!(visible >= 1);

                // Writers wait on the top-level lock until the traversal drains.
                let metas = graph.meta_edges();
                let expected = graph.meta_edge_count();
                let seen: Vec<_> = metas.collect();
                assert_eq!(seen.len(), expected);
                assert!(seen.iter().all(|m| m.count >= 1 && m.weight > 0.0));
                assert!(seen.iter().all(|m| m.target == hub));
            }
        });
    });

    graph.verify().unwrap();
    let stats = graph.stats();
    assert_eq!(stats.nodes - stats.groups, graph.edge_count() + 1);

    // Every edge ends on the hub, so meta-edge weights add up to the weights of the
    // edges they represent, each divided by 2 for touching the hub.
    let hidden: f64 = graph
        .edges()
        .filter(|e| graph.parent(e.source).unwrap().is_some())
        .map(|e| e.weight / 2.0)
        .sum();
    let folded: f64 = graph.meta_edges().map(|m| m.weight).sum();
    assert!((hidden - folded).abs() < EPS * hidden.max(1.0));
}

#[test]
fn concurrent_edge_updates_on_shared_group() {
    let graph = HierarchicalGraph::new();
    let hub = graph.add_node();
    let leaves: Vec<_> = (0..THREADS).map(|_| graph.add_node()).collect();
    let edges: Vec<_> = leaves
        .iter()
        .map(|leaf| graph.add_edge(*leaf, hub, 1.0).unwrap())
        .collect();
    let group = graph.group_nodes(&leaves).unwrap();

    thread::scope(|s| {
        for (t, edge) in edges.iter().enumerate() {
            let graph = &graph;
            let edge = *edge;
            s.spawn(move || {
                for round in 0..ROUNDS {
                    graph
                        .set_edge_weight(edge, (t + round) as f64)
                        .unwrap();
                }
            });
        }
    });

    let expected: f64 = (0..THREADS).map(|t| (t + ROUNDS - 1) as f64).sum();
    let meta = graph.meta_edge(group, hub).unwrap();
    assert_eq!(meta.count, THREADS);
    assert!((meta.weight - expected).abs() < EPS * expected);
    graph.verify().unwrap();
}
