//! In-memory typed graph store with declarative pattern queries.
//!
//! Nodes and edges carry a type from a single-inheritance hierarchy. Queries are built
//! from types, instances and named references, compiled once into a plan, and executed
//! lazily. A [`LiveQuery`] can cache its results and keep them fresh from store events;
//! an [`Observer`] additionally reports which results were added or removed.
//!
//! ```rust
//! use livegraph::{Graph, Node, NodeType};
//!
//! let graph = Graph::new();
//! let person = NodeType::new("Person");
//! let (a, b) = (Node::new(&person), Node::new(&person));
//! graph.add_edge(&a, &b, None).unwrap();
//!
//! let query = graph.query(person.to(&person)).unwrap();
//! let rows = query.collect().unwrap();
//! assert_eq!(rows.len(), 1);
//! assert_eq!(rows[0].node(), Some(&a));
//! ```
//!
//! Run Criterion benchmarks with `cargo bench` to inspect reports under `target/criterion`.

pub mod cache;
pub mod config;
pub mod errors;
pub mod graph;
pub mod live;
pub mod observer;
pub mod pattern;
pub mod query;
pub mod types;

pub use crate::config::{GraphConfig, QueryOptions};
pub use crate::errors::GraphError;
pub use crate::graph::{
    Edge, EdgeId, EdgeSelector, Graph, GraphEvent, Item, Node, NodeEdges, NodeId, SubscriptionId,
};
pub use crate::live::{LiveQuery, QueryRows};
pub use crate::observer::Observer;
pub use crate::pattern::{EdgeFragment, NodeFragment, QueryInput, QueryItem, Relation};
pub use crate::query::{CompiledQuery, Output, ResultKey};
pub use crate::types::{EdgeType, ItemKind, ItemType, NodeType, TypeId};
