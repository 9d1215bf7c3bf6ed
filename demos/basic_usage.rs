use livegraph::{Edge, EdgeType, Graph, GraphError, Node, NodeType, QueryInput, QueryOptions};
use serde_json::json;

fn name(node: &Node) -> &str {
    node.data()["name"].as_str().unwrap_or("?")
}

fn main() -> Result<(), GraphError> {
    let graph = Graph::new();
    let person = NodeType::new("Person");
    let admin = person.subtype("Admin");
    let follows = EdgeType::new("Follows");

    let ann = Node::with_data(&admin, json!({"name": "ann"}));
    let bob = Node::with_data(&person, json!({"name": "bob"}));
    let cid = Node::with_data(&person, json!({"name": "cid"}));
    graph.add_edge(&ann, &bob, Some(&Edge::new(&follows)))?;
    graph.add_edge(&bob, &cid, Some(&Edge::new(&follows)))?;

    let followers = graph.query_with(person.to(&follows), QueryOptions::cached())?;
    for row in followers.run() {
        if let Some(node) = row?.node() {
            println!("follows someone: {}", name(node));
        }
    }

    let observer = graph.observe(QueryInput::list([
        person.named("a").to("b"),
        person.named("b").to("c"),
        person.named("c").to("a"),
    ]))?;
    observer.on_added(|rows| println!("new triangles: {}", rows.len()));

    graph.add_edge(&cid, &ann, Some(&Edge::new(&follows)))?;
    println!("triangle rotations: {}", observer.results().len());
    println!("non-admin followers: {}", {
        graph
            .query(person.excluding(&admin).to(&follows))?
            .collect()?
            .len()
    });
    Ok(())
}
