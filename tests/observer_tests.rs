use std::sync::Arc;

use livegraph::{EdgeSelector, Graph, Node, NodeType, Output};
use parking_lot::Mutex;

fn single_nodes(rows: &[Output]) -> Vec<Node> {
    rows.iter().map(|row| row.node().cloned().unwrap()).collect()
}

#[test]
fn test_initial_results_are_queued_as_added() {
    let graph = Graph::new();
    let ty = NodeType::new("Job");
    let a = graph.add_node(&Node::new(&ty)).unwrap();
    let b = graph.add_node(&Node::new(&ty)).unwrap();

    let observer = graph.observe(&ty).unwrap();

    assert_eq!(single_nodes(&observer.results()), vec![a.clone(), b.clone()]);
    assert_eq!(single_nodes(&observer.added()), vec![a, b]);
    assert!(observer.added().is_empty());
    assert!(observer.removed().is_empty());
}

#[test]
fn test_diff_reports_added_and_removed() {
    let graph = Graph::new();
    let ty = NodeType::new("Job");
    let first = graph.add_node(&Node::new(&ty)).unwrap();
    let observer = graph.observe(&ty).unwrap();
    observer.added();

    let second = graph.add_node(&Node::new(&ty)).unwrap();
    graph.remove_node(&first).unwrap();

    assert_eq!(single_nodes(&observer.added()), vec![second.clone()]);
    assert_eq!(single_nodes(&observer.removed()), vec![first]);
    assert_eq!(single_nodes(&observer.results()), vec![second]);
}

#[test]
fn test_listeners_receive_batches_in_order() {
    let graph = Graph::new();
    let ty = NodeType::root();
    let (a, b) = (Node::new(&ty), Node::new(&ty));
    let observer = graph.observe(ty.to(&ty)).unwrap();

    let log = Arc::new(Mutex::new(Vec::new()));
    let added_log = Arc::clone(&log);
    observer.on_added(move |rows| added_log.lock().push(("added", single_nodes(rows))));
    let removed_log = Arc::clone(&log);
    observer.on_removed(move |rows| removed_log.lock().push(("removed", single_nodes(rows))));

    graph.add_edge(&a, &b, None).unwrap();
    graph.add_edge(&b, &a, None).unwrap();
    graph
        .remove_edges_by_nodes(&EdgeSelector::exact(&a, &b))
        .unwrap();

    assert_eq!(
        *log.lock(),
        vec![
            ("added", vec![a.clone()]),
            ("added", vec![b.clone()]),
            ("removed", vec![a]),
        ]
    );
}

#[test]
fn test_listener_may_poll_observer() {
    let graph = Graph::new();
    let ty = NodeType::new("Job");
    let observer = Arc::new(graph.observe(&ty).unwrap());
    let seen = Arc::new(Mutex::new(0usize));

    let weak = Arc::downgrade(&observer);
    let sink = Arc::clone(&seen);
    observer.on_added(move |_| {
        if let Some(observer) = weak.upgrade() {
            *sink.lock() += observer.added().len();
        }
    });

    graph.add_node(&Node::new(&ty)).unwrap();

    assert_eq!(*seen.lock(), 1);
    assert!(observer.added().is_empty());
}

#[test]
fn test_unchanged_results_fire_nothing() {
    let graph = Graph::new();
    let ty = NodeType::root();
    let hub = Node::new(&ty);
    graph.add_edge(&hub, &Node::new(&ty), None).unwrap();
    let observer = graph.observe(ty.to(&ty)).unwrap();
    observer.added();

    let calls = Arc::new(Mutex::new(0usize));
    let sink = Arc::clone(&calls);
    observer.on_added(move |_| *sink.lock() += 1);
    graph.add_edge(&hub, &Node::new(&ty), None).unwrap();

    assert_eq!(*calls.lock(), 0);
    assert!(observer.added().is_empty());
    assert_eq!(single_nodes(&observer.results()), vec![hub]);
}

#[test]
fn test_destroy_clears_everything() {
    let graph = Graph::new();
    let ty = NodeType::new("Job");
    graph.add_node(&Node::new(&ty)).unwrap();
    let observer = graph.observe(&ty).unwrap();
    let calls = Arc::new(Mutex::new(0usize));
    let sink = Arc::clone(&calls);
    observer.on_added(move |_| *sink.lock() += 1);

    observer.destroy();
    graph.add_node(&Node::new(&ty)).unwrap();

    assert!(observer.is_destroyed());
    assert!(observer.added().is_empty());
    assert!(observer.results().is_empty());
    assert_eq!(*calls.lock(), 0);
    assert_eq!(graph.subscriber_count(), 0);
}
