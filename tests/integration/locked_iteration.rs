#![allow(missing_docs)]

use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use hgraph::{CancelToken, GraphError, HierarchicalGraph, NodeScope, ROOT_LOCK};

fn populated(nodes: usize) -> HierarchicalGraph {
    let graph = HierarchicalGraph::new();
    let ids: Vec<_> = (0..nodes).map(|_| graph.add_node()).collect();
    for pair in ids.windows(2) {
        graph.add_edge(pair[0], pair[1], 1.0).unwrap();
    }
    graph
}

#[test]
fn drained_iterator_frees_the_scope_for_other_threads() {
    let graph = populated(16);
    assert_eq!(graph.nodes().count(), 16);

    let graph = &graph;
    thread::scope(|s| {
        let (tx, rx) = mpsc::channel();
        s.spawn(move || {
            let lock = graph.locks().try_lock(ROOT_LOCK);
            tx.send(lock).unwrap();
            if lock {
                graph.locks().unlock(ROOT_LOCK);
            }
        });
        assert!(rx.recv().unwrap());
    });
}

#[test]
fn abandoned_iterator_keeps_the_scope_locked() {
    let graph = populated(4);
    let mut iter = graph.visible_nodes();
    assert!(iter.next().is_some());
    drop(iter);

    // Nothing released the top-level lock.
    assert!(!graph.locks().try_lock(ROOT_LOCK));
    let cancel = CancelToken::new();
    let blocked = thread::scope(|s| {
        let waiter = s.spawn(|| graph.nodes_in_cancellable(NodeScope::All, &cancel).err());
        thread::sleep(Duration::from_millis(20));
        cancel.cancel();
        waiter.join().unwrap()
    });
    assert_eq!(blocked, Some(GraphError::Cancelled(ROOT_LOCK)));

    // Whoever owns the stuck scope can still free it.
    graph.locks().unlock(ROOT_LOCK);
    assert_eq!(graph.nodes().count(), 4);
}

#[test]
fn explicit_release_ends_an_early_exit() {
    let graph = populated(8);
    let mut iter = graph.edges();
    let first = iter.next().unwrap();
    assert!(iter.holds_lock());
    iter.release();
    assert!(graph.locks().try_lock(ROOT_LOCK));
    graph.locks().unlock(ROOT_LOCK);
    assert_eq!(graph.edge(first.id).unwrap(), first);
}

#[test]
fn mutation_waits_for_an_undrained_scope() {
    let graph = populated(4);
    let first = graph.top_level_nodes().next().map(|n| n.id);
    assert!(first.is_some());
    // The iterator above was dropped after one element, so the top level is held.
    assert!(!graph.locks().try_lock(ROOT_LOCK));

    let graph = &graph;
    thread::scope(|s| {
        let (tx, rx) = mpsc::channel();
        s.spawn(move || {
            let id = graph.add_node();
            tx.send(id).unwrap();
        });
        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
        graph.locks().unlock(ROOT_LOCK);
        let added = rx.recv().unwrap();
        assert!(graph.contains_node(added));
    });
}

#[test]
fn removal_through_the_iterator_is_visible_afterwards() {
    let graph = populated(10);
    let mut iter = graph.nodes();
    let mut removed = 0;
    while let Some(node) = iter.next() {
        if node.id.raw() % 2 == 0 {
            iter.remove().unwrap();
            removed += 1;
        }
    }
    assert!(!iter.holds_lock());
    assert_eq!(graph.node_count(), 10 - removed);
    graph.verify().unwrap();
}

const WAIT: Duration = Duration::from_millis(50);

#[test]
fn outgoing_scope_holds_off_edge_removal() {
    let graph = HierarchicalGraph::new();
    let a = graph.add_node();
    let b = graph.add_node();
    let c = graph.add_node();
    let ab = graph.add_edge(a, b, 1.0).unwrap();
    let ac = graph.add_edge(a, c, 1.0).unwrap();

    let graph = &graph;
    thread::scope(|s| {
        let mut iter = graph.outgoing(a).unwrap();
        assert_eq!(iter.next().map(|e| e.id), Some(ab));

        let (tx, rx) = mpsc::channel();
        s.spawn(move || tx.send(graph.remove_edge(ac).map(|e| e.id)).unwrap());
        assert!(rx.recv_timeout(WAIT).is_err());

        let rest: Vec<_> = iter.map(|e| e.id).collect();
        assert_eq!(rest, vec![ac]);
        assert_eq!(rx.recv().unwrap(), Ok(ac));
    });
    assert_eq!(graph.outgoing(a).unwrap().count(), 1);
    graph.verify().unwrap();
}

#[test]
fn incoming_scope_holds_off_edge_creation() {
    let graph = HierarchicalGraph::new();
    let target = graph.add_node();
    let x = graph.add_node();
    let y = graph.add_node();
    graph.add_edge(x, target, 1.0).unwrap();

    let graph = &graph;
    thread::scope(|s| {
        let mut iter = graph.incoming(target).unwrap();
        assert!(iter.next().is_some());

        let (tx, rx) = mpsc::channel();
        s.spawn(move || tx.send(graph.add_edge(y, target, 2.0)).unwrap());
        assert!(rx.recv_timeout(WAIT).is_err());

        assert_eq!(iter.count(), 0);
        assert!(rx.recv().unwrap().is_ok());
    });
    assert_eq!(graph.incoming(target).unwrap().count(), 2);
}

#[test]
fn children_scope_holds_off_removal_through_a_graph_wide_cursor() {
    let graph = HierarchicalGraph::new();
    let a = graph.add_node();
    let b = graph.add_node();
    let g = graph.group_nodes(&[a, b]).unwrap();

    let graph = &graph;
    thread::scope(|s| {
        let mut children = graph.children(g).unwrap();
        assert_eq!(children.next().map(|n| n.id), Some(a));

        let (tx, rx) = mpsc::channel();
        s.spawn(move || {
            let mut all = graph.nodes();
            let mut removed = None;
            while let Some(node) = all.next() {
                if node.id == b {
                    removed = Some(all.remove().map(|n| n.id));
                }
            }
            tx.send(removed).unwrap();
        });
        assert!(rx.recv_timeout(WAIT).is_err());

        let rest: Vec<_> = children.map(|n| n.id).collect();
        assert_eq!(rest, vec![b]);
        assert_eq!(rx.recv().unwrap(), Some(Ok(b)));
    });
    let left: Vec<_> = graph.children(g).unwrap().map(|n| n.id).collect();
    assert_eq!(left, vec![a]);
    graph.verify().unwrap();
}

#[test]
fn visible_scope_holds_off_nested_grouping_and_expansion() {
    let graph = HierarchicalGraph::new();
    let a = graph.add_node();
    let b = graph.add_node();
    let x = graph.add_node();
    graph.add_edge(a, x, 1.0).unwrap();
    let g = graph.group_nodes(&[a, b]).unwrap();

    let graph = &graph;
    thread::scope(|s| {
        let mut visible = graph.visible_nodes();
        assert_eq!(visible.next().map(|n| n.id), Some(x));

        let (tx, rx) = mpsc::channel();
        s.spawn(move || {
            let result = graph
                .group_nodes(&[a])
                .and_then(|inner| graph.expand(g).map(|()| inner));
            tx.send(result).unwrap();
        });
        assert!(rx.recv_timeout(WAIT).is_err());

        // The traversal still sees the hierarchy it started on.
        let rest: Vec<_> = visible.map(|n| n.id).collect();
        assert_eq!(rest, vec![g]);
        let inner = rx.recv().unwrap().unwrap();
        assert_eq!(graph.parent(inner).unwrap(), Some(g));
    });
    let shown: Vec<_> = graph.visible_nodes().map(|n| n.id).collect();
    assert_eq!(shown.len(), 3);
    assert!(!shown.contains(&g));
    graph.verify().unwrap();
}
