use std::sync::Arc;

use livegraph::{
    Edge, EdgeSelector, EdgeType, Graph, GraphConfig, GraphError, GraphEvent, Item, Node,
    NodeType,
};
use parking_lot::Mutex;
use serde_json::json;

fn record_events(graph: &Graph) -> Arc<Mutex<Vec<GraphEvent>>> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    graph.subscribe(move |_, event| sink.lock().push(event.clone()));
    events
}

fn chain(graph: &Graph, ty: &NodeType, len: usize) -> Vec<Node> {
    let nodes: Vec<Node> = (0..len).map(|_| Node::new(ty)).collect();
    for pair in nodes.windows(2) {
        graph.add_edge(&pair[0], &pair[1], None).unwrap();
    }
    nodes
}

#[test]
fn test_indices_stay_symmetric() {
    let graph = Graph::new();
    let ty = NodeType::new("Station");
    let nodes = chain(&graph, &ty, 3);

    assert_eq!(graph.node_count(), 3);
    assert_eq!(graph.edge_count(), 2);
    for node in &nodes {
        let edges = graph.edges_of(node);
        for edge in &edges.from {
            assert_eq!(graph.endpoints(edge).unwrap().0, *node);
        }
        for edge in &edges.to {
            assert_eq!(graph.endpoints(edge).unwrap().1, *node);
        }
    }
    assert_eq!(graph.edges_of(&nodes[1]).len(), 2);
    assert_eq!(graph.nodes_of_type(&ty), nodes);
}

#[test]
fn test_type_index_includes_subtypes() {
    let graph = Graph::new();
    let animal = NodeType::new("Animal");
    let dog = animal.subtype("Dog");
    let plain = graph.add_node(&Node::new(&animal)).unwrap();
    let rex = graph.add_node(&Node::new(&dog)).unwrap();

    assert_eq!(graph.nodes_of_type(&animal), vec![plain.clone(), rex.clone()]);
    assert_eq!(graph.nodes_of_type(&dog), vec![rex]);
    assert_eq!(graph.nodes_of_type(&NodeType::root()).len(), 2);
}

#[test]
fn test_add_node_is_idempotent() {
    let graph = Graph::new();
    let events = record_events(&graph);
    let node = Node::with_data(&NodeType::root(), json!({"name": "solo"}));

    graph.add_node(&node).unwrap();
    graph.add_node(&node).unwrap();

    assert_eq!(graph.node_count(), 1);
    assert_eq!(events.lock().len(), 1);
    assert_eq!(node.data()["name"], "solo");
    assert_eq!(node.graph(), Some(graph.clone()));
}

#[test]
fn test_add_edge_is_idempotent() {
    let graph = Graph::new();
    let ty = NodeType::root();
    let (a, b) = (Node::new(&ty), Node::new(&ty));
    let edge = graph.add_edge(&a, &b, None).unwrap();
    let again = graph.add_edge(&a, &b, Some(&edge)).unwrap();

    assert_eq!(edge, again);
    assert_eq!(graph.edge_count(), 1);
    assert!(edge.edge_type().is_a(&EdgeType::root()));
}

#[test]
fn test_remove_node_cascades_edges() {
    let graph = Graph::new();
    let nodes = chain(&graph, &NodeType::root(), 3);
    let events = record_events(&graph);

    graph.remove_node(&nodes[1]).unwrap();

    assert_eq!(graph.node_count(), 2);
    assert_eq!(graph.edge_count(), 0);
    assert!(nodes[1].graph().is_none());
    let events = events.lock();
    assert_eq!(events.len(), 3);
    assert!(events.iter().all(|event| matches!(event, GraphEvent::Removed(_))));
    assert_eq!(
        events.last().map(GraphEvent::item),
        Some(&Item::Node(nodes[1].clone()))
    );
    assert!(graph.edges_of(&nodes[0]).is_empty());
}

#[test]
fn test_remove_missing_is_not_found() {
    let graph = Graph::new();
    let node = Node::new(&NodeType::root());
    let err = graph.remove_node(&node).unwrap_err();
    assert!(matches!(err, GraphError::NotFound(_)));

    let edge = Edge::new(&EdgeType::root());
    let err = graph.remove_edge(&edge).unwrap_err();
    assert!(matches!(err, GraphError::NotFound(_)));
}

#[test]
fn test_ownership_transfer_moves_only_the_node() {
    let first = Graph::new();
    let second = Graph::new();
    let nodes = chain(&first, &NodeType::root(), 4);
    let dropped = first.edges_of(&nodes[0]).from;
    let kept = first.edges_of(&nodes[2]).from;

    second.add_node(&nodes[0]).unwrap();

    assert_eq!(first.node_count(), 3);
    assert_eq!(first.edge_count(), 2);
    assert_eq!(second.node_count(), 1);
    assert_eq!(second.edge_count(), 0);
    assert_eq!(nodes[0].graph(), Some(second.clone()));
    assert_eq!(nodes[1].graph(), Some(first.clone()));
    assert!(dropped[0].graph().is_none());
    assert!(first.contains_edge(&kept[0]));
    assert!(second.edges_of(&nodes[0]).is_empty());
}

#[test]
fn test_edge_transfer_brings_endpoints() {
    let first = Graph::new();
    let second = Graph::new();
    let ty = NodeType::root();
    let (a, b) = (Node::new(&ty), Node::new(&ty));
    let edge = first.add_edge(&a, &b, None).unwrap();

    second.add_edge(&a, &b, Some(&edge)).unwrap();

    assert_eq!(first.edge_count(), 0);
    assert_eq!(second.edge_count(), 1);
    assert_eq!(second.node_count(), 2);
}

#[test]
fn test_prewired_edges_attach_with_node() {
    let graph = Graph::new();
    let ty = NodeType::root();
    let follows = EdgeType::new("Follows");
    let (a, b, c) = (Node::new(&ty), Node::new(&ty), Node::new(&ty));
    let ab = Edge::between(&follows, &a, &b);
    let bc = Edge::between(&follows, &b, &c);

    assert_eq!(a.edges().from, vec![ab.clone()]);
    graph.add_node(&a).unwrap();

    assert_eq!(graph.node_count(), 3);
    assert_eq!(graph.edge_count(), 2);
    assert!(graph.contains_edge(&ab));
    assert!(graph.contains_edge(&bc));
    assert_eq!(c.edges().to, vec![bc]);
}

#[test]
fn test_half_wired_edge_is_structural_error() {
    let graph = Graph::new();
    let ty = NodeType::root();
    let (a, b) = (Node::new(&ty), Node::new(&ty));
    let _ab = Edge::between(&EdgeType::root(), &a, &b);
    let dangling = Edge::new(&EdgeType::root());
    dangling.set_from(&b).unwrap();

    let err = graph.add_node(&a).unwrap_err();

    assert!(matches!(err, GraphError::StructuralIntegrity(_)));
    assert_eq!(graph.node_count(), 0);
    assert_eq!(graph.edge_count(), 0);
    assert!(a.graph().is_none());

    let err = graph.insert_edge(&dangling).unwrap_err();
    assert!(matches!(err, GraphError::StructuralIntegrity(_)));
}

#[test]
fn test_insert_edge_attaches_wired_edge() {
    let graph = Graph::new();
    let ty = NodeType::root();
    let (a, b) = (Node::new(&ty), Node::new(&ty));
    let edge = Edge::new(&EdgeType::root());
    edge.set_from(&a).unwrap();
    edge.set_to(&b).unwrap();

    graph.insert_edge(&edge).unwrap();

    assert_eq!(graph.endpoints(&edge), Some((a.clone(), b)));
    let err = edge.set_to(&a).unwrap_err();
    assert!(matches!(err, GraphError::InvalidInput(_)));
}

#[test]
fn test_remove_edges_by_selector() {
    let graph = Graph::new();
    let ty = NodeType::root();
    let likes = EdgeType::new("Likes");
    let (a, b, c) = (Node::new(&ty), Node::new(&ty), Node::new(&ty));
    let ab = graph.add_edge(&a, &b, None).unwrap();
    let ba = graph.add_edge(&b, &a, Some(&Edge::new(&likes))).unwrap();
    let bc = graph.add_edge(&b, &c, None).unwrap();
    let ca = graph.add_edge(&c, &a, Some(&Edge::new(&likes))).unwrap();

    graph.remove_edges_by_nodes(&EdgeSelector::exact(&a, &b)).unwrap();
    assert!(!graph.contains_edge(&ab));
    assert!(graph.contains_edge(&ba));

    graph
        .remove_edges_by_nodes(&EdgeSelector::touching(&a).of_type(&likes))
        .unwrap();
    assert!(!graph.contains_edge(&ba));
    assert!(!graph.contains_edge(&ca));
    assert!(graph.contains_edge(&bc));

    graph.remove_edges_by_nodes(&EdgeSelector::between(&c, &b)).unwrap();
    assert_eq!(graph.edge_count(), 0);
    assert_eq!(graph.node_count(), 3);
}

#[test]
fn test_one_sided_selector() {
    let graph = Graph::new();
    let nodes = chain(&graph, &NodeType::root(), 3);
    graph.add_edge(&nodes[2], &nodes[0], None).unwrap();

    graph
        .remove_edges_by_nodes(&EdgeSelector::new().to(&nodes[0]))
        .unwrap();

    assert_eq!(graph.edge_count(), 2);
    assert!(graph.edges_of(&nodes[0]).to.is_empty());
}

#[test]
fn test_selector_without_node_is_invalid() {
    let graph = Graph::new();
    let err = graph.remove_edges_by_nodes(&EdgeSelector::new()).unwrap_err();
    assert!(matches!(err, GraphError::InvalidInput(_)));

    let node = Node::new(&NodeType::root());
    let mixed = EdgeSelector::new().from(&node).from_or_to(&node);
    assert!(matches!(
        graph.remove_edges_by_nodes(&mixed),
        Err(GraphError::InvalidInput(_))
    ));
}

#[test]
fn test_remove_by_type() {
    let graph = Graph::new();
    let animal = NodeType::new("Animal");
    let dog = animal.subtype("Dog");
    let cat = animal.subtype("Cat");
    let rex = Node::new(&dog);
    let tom = Node::new(&cat);
    let chases = EdgeType::new("Chases");
    graph.add_edge(&rex, &tom, Some(&Edge::new(&chases))).unwrap();
    graph.add_edge(&tom, &rex, None).unwrap();

    graph.remove_edges_by_type(&chases);
    assert_eq!(graph.edge_count(), 1);

    graph.remove_nodes_by_type(&dog);
    assert_eq!(graph.nodes_of_type(&animal), vec![tom]);
    assert_eq!(graph.edge_count(), 0);
}

#[test]
fn test_subscribers_may_reenter_store() {
    let graph = Graph::new();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    graph.subscribe(move |graph, _| sink.lock().push((graph.node_count(), graph.edge_count())));

    let ty = NodeType::root();
    graph.add_edge(&Node::new(&ty), &Node::new(&ty), None).unwrap();

    // Every event sees the fully applied mutation.
    assert_eq!(*seen.lock(), vec![(2, 1), (2, 1), (2, 1)]);
}

#[test]
fn test_unsubscribe_stops_delivery() {
    let graph = Graph::with_config(&GraphConfig::new().with_node_capacity(8));
    let events = Arc::new(Mutex::new(0usize));
    let sink = Arc::clone(&events);
    let id = graph.subscribe(move |_, _| *sink.lock() += 1);

    graph.add_node(&Node::new(&NodeType::root())).unwrap();
    assert!(graph.unsubscribe(id));
    assert!(!graph.unsubscribe(id));
    graph.add_node(&Node::new(&NodeType::root())).unwrap();

    assert_eq!(*events.lock(), 1);
    assert_eq!(graph.subscriber_count(), 0);
}
