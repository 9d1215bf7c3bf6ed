use std::collections::BTreeMap;

use livegraph::{
    CompiledQuery, Edge, EdgeType, Graph, GraphError, Item, Node, NodeType, Output, QueryInput,
    QueryItem,
};

fn nodes_of(rows: &[Output]) -> Vec<Node> {
    rows.iter().map(|row| row.node().cloned().unwrap()).collect()
}

fn list_of(row: &Output) -> Vec<Node> {
    row.as_list()
        .unwrap()
        .iter()
        .map(|item| item.as_node().cloned().unwrap())
        .collect()
}

#[test]
fn test_node_to_node_returns_sources() {
    let graph = Graph::new();
    let ty = NodeType::root();
    let (n1, n2, n3) = (Node::new(&ty), Node::new(&ty), Node::new(&ty));
    graph.add_edge(&n1, &n2, None).unwrap();
    graph.add_edge(&n2, &n3, None).unwrap();

    let rows = graph.query(ty.to(&ty)).unwrap().collect().unwrap();

    assert_eq!(nodes_of(&rows), vec![n1, n2]);
}

#[test]
fn test_self_loop_requires_same_node() {
    let graph = Graph::new();
    let ty = NodeType::root();
    let (n1, n2) = (Node::new(&ty), Node::new(&ty));
    graph.add_edge(&n1, &n1, None).unwrap();
    graph.add_edge(&n1, &n2, None).unwrap();

    let rows = graph.query(ty.named("n").to("n")).unwrap().collect().unwrap();

    assert_eq!(nodes_of(&rows), vec![n1]);
}

#[test]
fn test_three_cycle_yields_rotations() {
    let graph = Graph::new();
    let ty = NodeType::root();
    let (n1, n2, n3) = (Node::new(&ty), Node::new(&ty), Node::new(&ty));
    graph.add_edge(&n1, &n2, None).unwrap();
    graph.add_edge(&n2, &n3, None).unwrap();
    graph.add_edge(&n3, &n1, None).unwrap();

    let input = QueryInput::list([
        ty.named("a").to("b"),
        ty.named("b").to("c"),
        ty.named("c").to("a"),
    ]);
    let rows = graph.query(input).unwrap().collect().unwrap();

    let rotations: Vec<Vec<Node>> = rows.iter().map(list_of).collect();
    assert_eq!(rotations.len(), 3);
    for expected in [
        vec![n1.clone(), n2.clone(), n3.clone()],
        vec![n2.clone(), n3.clone(), n1.clone()],
        vec![n3.clone(), n1.clone(), n2.clone()],
    ] {
        assert!(rotations.contains(&expected), "missing rotation {expected:?}");
    }
}

#[test]
fn test_excluding_drops_subtype_tree() {
    let graph = Graph::new();
    let root = NodeType::root();
    let sub = NodeType::new("Sub");
    let deeper = sub.subtype("Deeper");
    let other = NodeType::new("Other");
    let plain = graph.add_node(&Node::new(&root)).unwrap();
    graph.add_node(&Node::new(&sub)).unwrap();
    graph.add_node(&Node::new(&deeper)).unwrap();
    let unrelated = graph.add_node(&Node::new(&other)).unwrap();

    let rows = graph.query(root.excluding(&sub)).unwrap().collect().unwrap();

    assert_eq!(nodes_of(&rows), vec![plain, unrelated]);
}

#[test]
fn test_edge_excluding_drops_subtype() {
    let graph = Graph::new();
    let ty = NodeType::root();
    let likes = EdgeType::new("Likes");
    let loves = likes.subtype("Loves");
    let (a, b, c) = (Node::new(&ty), Node::new(&ty), Node::new(&ty));
    let ab = graph.add_edge(&a, &b, Some(&Edge::new(&likes))).unwrap();
    graph.add_edge(&b, &c, Some(&Edge::new(&loves))).unwrap();
    graph.add_edge(&c, &a, None).unwrap();

    let rows = graph.query(likes.excluding(&loves)).unwrap().collect().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].edge(), Some(&ab));

    let rows = graph
        .query(ty.to(likes.named("rel").excluding(&loves)))
        .unwrap()
        .collect()
        .unwrap();
    assert_eq!(nodes_of(&rows), vec![a]);
}

#[test]
fn test_outputs_are_deduplicated() {
    let graph = Graph::new();
    let ty = NodeType::root();
    let hub = Node::new(&ty);
    for _ in 0..4 {
        graph.add_edge(&hub, &Node::new(&ty), None).unwrap();
    }

    let compiled = CompiledQuery::compile(&QueryInput::from(ty.to(&ty))).unwrap();
    let raw = compiled.execute(&graph).count();
    let rows = compiled.collect(&graph).unwrap();

    assert_eq!(raw, 4);
    assert_eq!(nodes_of(&rows), vec![hub]);
}

#[test]
fn test_disconnected_items_multiply() {
    let graph = Graph::new();
    let person = NodeType::new("Person");
    let city = NodeType::new("City");
    let people: Vec<Node> = (0..3)
        .map(|_| graph.add_node(&Node::new(&person)).unwrap())
        .collect();
    let cities: Vec<Node> = (0..2)
        .map(|_| graph.add_node(&Node::new(&city)).unwrap())
        .collect();

    let rows = graph
        .query(QueryInput::list([QueryItem::from(&person), QueryItem::from(&city)]))
        .unwrap()
        .collect()
        .unwrap();

    assert_eq!(rows.len(), people.len() * cities.len());
    assert_eq!(list_of(&rows[0]), vec![people[0].clone(), cities[0].clone()]);
    assert_eq!(list_of(&rows[5]), vec![people[2].clone(), cities[1].clone()]);
}

#[test]
fn test_empty_component_yields_nothing() {
    let graph = Graph::new();
    let person = NodeType::new("Person");
    let city = NodeType::new("City");
    graph.add_node(&Node::new(&person)).unwrap();

    let rows = graph
        .query(QueryInput::list([QueryItem::from(&person), QueryItem::from(&city)]))
        .unwrap()
        .collect()
        .unwrap();

    assert!(rows.is_empty());
}

#[test]
fn test_map_input_projects_named_keys() {
    let graph = Graph::new();
    let person = NodeType::new("Person");
    let knows = EdgeType::new("Knows");
    let (ann, bob) = (Node::new(&person), Node::new(&person));
    let edge = graph.add_edge(&ann, &bob, Some(&Edge::new(&knows))).unwrap();

    let input = QueryInput::map([
        ("who", QueryItem::from(person.named("who").to(knows.named("rel")))),
        ("rel", QueryItem::from("rel")),
        ("whom", QueryItem::from(person.named("whom").from("rel"))),
    ]);
    let rows = graph.query(input).unwrap().collect().unwrap();

    assert_eq!(rows.len(), 1);
    let expected = BTreeMap::from([
        ("who".to_string(), Item::Node(ann)),
        ("rel".to_string(), Item::Edge(edge)),
        ("whom".to_string(), Item::Node(bob)),
    ]);
    assert_eq!(rows[0].as_map(), Some(&expected));
}

#[test]
fn test_edge_fragment_direction() {
    let graph = Graph::new();
    let person = NodeType::new("Person");
    let knows = EdgeType::new("Knows");
    let (ann, bob, cat) = (Node::new(&person), Node::new(&person), Node::new(&person));
    let ab = graph.add_edge(&ann, &bob, Some(&Edge::new(&knows))).unwrap();
    graph.add_edge(&cat, &ann, Some(&Edge::new(&knows))).unwrap();

    let rows = graph
        .query(knows.from(&ann).to(&person))
        .unwrap()
        .collect()
        .unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].edge(), Some(&ab));
}

#[test]
fn test_with_matches_either_orientation() {
    let graph = Graph::new();
    let ty = NodeType::root();
    let (a, b, c) = (Node::new(&ty), Node::new(&ty), Node::new(&ty));
    graph.add_edge(&a, &b, None).unwrap();
    graph.add_edge(&c, &a, None).unwrap();

    let rows = graph
        .query(QueryInput::list([
            QueryItem::from(ty.named("x").with("other")),
            QueryItem::from("other"),
        ]))
        .unwrap()
        .collect()
        .unwrap();

    let pairs: Vec<(Node, Node)> = rows
        .iter()
        .map(|row| {
            let list = list_of(row);
            (list[0].clone(), list[1].clone())
        })
        .collect();
    assert_eq!(
        pairs,
        vec![
            (a.clone(), b.clone()),
            (a.clone(), c.clone()),
            (b, a.clone()),
            (c, a),
        ]
    );
}

#[test]
fn test_edge_reference_before_its_definition() {
    let graph = Graph::new();
    let person = NodeType::new("Person");
    let knows = EdgeType::new("Knows");
    let (ann, bob) = (Node::new(&person), Node::new(&person));
    let edge = graph.add_edge(&ann, &bob, Some(&Edge::new(&knows))).unwrap();
    graph.add_edge(&bob, &ann, None).unwrap();

    let rows = graph
        .query(QueryInput::list([
            QueryItem::from(person.named("who").to("rel")),
            knows.named("rel").into(),
        ]))
        .unwrap()
        .collect()
        .unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(
        rows[0].as_list(),
        Some(&[Item::Node(ann), Item::Edge(edge)][..])
    );
}

#[test]
fn test_node_from_or_to_matches_either_orientation() {
    let graph = Graph::new();
    let ty = NodeType::root();
    let (a, b, c) = (Node::new(&ty), Node::new(&ty), Node::new(&ty));
    graph.add_edge(&a, &b, None).unwrap();
    graph.add_node(&c).unwrap();

    let rows = graph.query(ty.from_or_to(&ty)).unwrap().collect().unwrap();

    assert_eq!(nodes_of(&rows), vec![a, b]);
}

#[test]
fn test_instance_anchor() {
    let graph = Graph::new();
    let ty = NodeType::root();
    let nodes: Vec<Node> = (0..3).map(|_| Node::new(&ty)).collect();
    graph.add_edge(&nodes[0], &nodes[1], None).unwrap();
    graph.add_edge(&nodes[0], &nodes[2], None).unwrap();
    graph.add_edge(&nodes[1], &nodes[2], None).unwrap();

    let rows = graph
        .query(ty.from(&nodes[0]))
        .unwrap()
        .collect()
        .unwrap();

    assert_eq!(nodes_of(&rows), vec![nodes[1].clone(), nodes[2].clone()]);
}

#[test]
fn test_detached_instance_matches_nothing() {
    let graph = Graph::new();
    let ty = NodeType::root();
    graph.add_node(&Node::new(&ty)).unwrap();
    let stray = Node::new(&ty);

    let rows = graph.query(&stray).unwrap().collect().unwrap();
    assert!(rows.is_empty());
}

#[test]
fn test_typed_edge_narrows_traversal() {
    let graph = Graph::new();
    let ty = NodeType::root();
    let likes = EdgeType::new("Likes");
    let loves = likes.subtype("Loves");
    let (a, b, c) = (Node::new(&ty), Node::new(&ty), Node::new(&ty));
    graph.add_edge(&a, &b, Some(&Edge::new(&loves))).unwrap();
    graph.add_edge(&b, &c, None).unwrap();

    let rows = graph.query(ty.to(&likes)).unwrap().collect().unwrap();

    assert_eq!(nodes_of(&rows), vec![a]);
}

#[test]
fn test_compile_errors_surface_immediately() {
    let graph = Graph::new();
    let ty = NodeType::root();

    let err = graph
        .query(QueryInput::list([
            QueryItem::from(ty.named("x")),
            EdgeType::root().named("x").into(),
        ]))
        .unwrap_err();
    assert!(matches!(err, GraphError::ReferenceMismatch(_)));

    let err = graph
        .query(
            EdgeType::root()
                .from_or_to(&ty)
                .from_or_to(&ty)
                .with(&ty),
        )
        .unwrap_err();
    assert!(matches!(err, GraphError::StructuralIntegrity(_)));
}

#[test]
fn test_uncached_query_sees_later_mutations() {
    let graph = Graph::new();
    let ty = NodeType::new("Task");
    let query = graph.query(&ty).unwrap();
    assert_eq!(query.collect().unwrap().len(), 0);

    graph.add_node(&Node::new(&ty)).unwrap();
    assert_eq!(query.collect().unwrap().len(), 1);
    assert!(!query.run().is_cached());
}
