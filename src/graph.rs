//! In-memory typed graph store.
//!
//! [`Graph`] is a cheap-clone handle over shared state. Every mutation updates all
//! indices under one write lock, releases it, and only then notifies subscribers, so a
//! subscriber never observes a half-applied change and may freely re-enter the store.

mod index;
mod selector;
mod types;

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use ahash::AHashSet;
use parking_lot::{Mutex, RwLock, RwLockReadGuard};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::{
    config::{GraphConfig, QueryOptions},
    errors::GraphError,
    live::LiveQuery,
    observer::Observer,
    query::QueryInput,
    types::{EdgeType, NodeType},
};

pub(crate) use index::GraphIndex;
pub use selector::EdgeSelector;
pub use types::{Edge, EdgeId, Item, Node, NodeEdges, NodeId};

static NEXT_GRAPH_ID: AtomicU64 = AtomicU64::new(1);

/// A structural change, delivered to subscribers after the store is consistent again.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GraphEvent {
    Added(Item),
    Removed(Item),
}

impl GraphEvent {
    pub fn item(&self) -> &Item {
        match self {
            GraphEvent::Added(item) | GraphEvent::Removed(item) => item,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionId(u64);

pub(crate) type Subscriber = Arc<dyn Fn(&Graph, &GraphEvent) + Send + Sync>;

pub(crate) struct GraphShared {
    id: u64,
    index: RwLock<GraphIndex>,
    subscribers: Mutex<Vec<(SubscriptionId, Subscriber)>>,
    next_subscription: AtomicU64,
}

/// Embedded graph store handle. Cloning shares the same store.
#[derive(Clone)]
pub struct Graph {
    pub(crate) shared: Arc<GraphShared>,
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl Graph {
    pub fn new() -> Self {
        Self::with_config(&GraphConfig::default())
    }

    pub fn with_config(config: &GraphConfig) -> Self {
        Self {
            shared: Arc::new(GraphShared {
                id: NEXT_GRAPH_ID.fetch_add(1, Ordering::Relaxed),
                index: RwLock::new(GraphIndex::with_config(config)),
                subscribers: Mutex::new(Vec::new()),
                next_subscription: AtomicU64::new(1),
            }),
        }
    }

    pub fn id(&self) -> u64 {
        self.shared.id
    }

    /// `true` when both handles point at the same store.
    pub fn ptr_eq(&self, other: &Graph) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, GraphIndex> {
        self.shared.index.read()
    }
}

impl Graph {
    /// Attaches `node`. Already-owned nodes are returned unchanged.
    ///
    /// A node owned by another graph is removed there first, which drops its incident
    /// edges in that graph; it arrives here without edges. A detached node brings the
    /// edges wired to it beforehand; if any of those lacks an endpoint nothing is mutated
    /// and a structural error is returned.
    pub fn add_node(&self, node: &Node) -> Result<Node, GraphError> {
        preflight(std::slice::from_ref(node))?;
        let mut events = Vec::new();
        let result = self.attach_node(node, &mut events);
        self.dispatch(events);
        result.map(|()| node.clone())
    }

    pub fn add_nodes<'a, I>(&self, nodes: I) -> Result<Vec<Node>, GraphError>
    where
        I: IntoIterator<Item = &'a Node>,
    {
        nodes.into_iter().map(|node| self.add_node(node)).collect()
    }

    /// Removes `node` and every edge incident to it.
    pub fn remove_node(&self, node: &Node) -> Result<(), GraphError> {
        let removed = self.shared.index.write().remove_node(node.id());
        let Some((node, edges)) = removed else {
            return Err(GraphError::not_found(format!("node {}", node.id())));
        };
        let mut events = Vec::with_capacity(edges.len() + 1);
        for edge in edges {
            edge.set_owner(None);
            events.push(GraphEvent::Removed(Item::Edge(edge)));
        }
        node.set_owner(None);
        events.push(GraphEvent::Removed(Item::Node(node)));
        self.dispatch(events);
        Ok(())
    }

    pub fn remove_nodes<'a, I>(&self, nodes: I) -> Result<(), GraphError>
    where
        I: IntoIterator<Item = &'a Node>,
    {
        for node in nodes {
            self.remove_node(node)?;
        }
        Ok(())
    }

    /// Removes every node filed under `ty` or one of its subtypes.
    pub fn remove_nodes_by_type(&self, ty: &NodeType) {
        let mut events = Vec::new();
        {
            let mut index = self.shared.index.write();
            let ids: Vec<NodeId> = index.node_ids_of_type(ty.id()).collect();
            for id in ids {
                if let Some((node, edges)) = index.remove_node(id) {
                    for edge in edges {
                        edge.set_owner(None);
                        events.push(GraphEvent::Removed(Item::Edge(edge)));
                    }
                    node.set_owner(None);
                    events.push(GraphEvent::Removed(Item::Node(node)));
                }
            }
        }
        debug!(
            graph = self.shared.id,
            node_type = ty.name(),
            removed = events.len(),
            "removed nodes by type"
        );
        self.dispatch(events);
    }

    /// Connects `from` to `to`, creating a root-typed edge when `edge` is `None`.
    ///
    /// An edge already owned by this graph is returned unchanged. Endpoints are added
    /// idempotently, moving them here if another graph owns them.
    pub fn add_edge(
        &self,
        from: &Node,
        to: &Node,
        edge: Option<&Edge>,
    ) -> Result<Edge, GraphError> {
        let edge = edge.cloned().unwrap_or_else(|| Edge::new(&EdgeType::root()));
        if edge.is_owned_by(&self.shared) {
            return Ok(edge);
        }
        preflight(&[from.clone(), to.clone()])?;
        if let Some(previous) = edge.graph() {
            previous.remove_edge(&edge)?;
        }
        edge.rewire(from, to);
        let mut events = Vec::new();
        let result = self.attach_edge(&edge, &mut events);
        self.dispatch(events);
        result.map(|()| edge)
    }

    /// Attaches an edge whose endpoints were wired with [`Edge::set_from`] and
    /// [`Edge::set_to`].
    pub fn insert_edge(&self, edge: &Edge) -> Result<Edge, GraphError> {
        if edge.is_owned_by(&self.shared) {
            return Ok(edge.clone());
        }
        let (from, to) = edge.endpoints().ok_or_else(|| {
            GraphError::structural(format!("edge {} is missing an endpoint", edge.id()))
        })?;
        preflight(&[from, to])?;
        let mut events = Vec::new();
        let result = self.attach_edge(edge, &mut events);
        self.dispatch(events);
        result.map(|()| edge.clone())
    }

    pub fn remove_edge(&self, edge: &Edge) -> Result<(), GraphError> {
        let removed = self.shared.index.write().remove_edge(edge.id());
        let Some(edge) = removed else {
            return Err(GraphError::not_found(format!("edge {}", edge.id())));
        };
        edge.set_owner(None);
        self.dispatch(vec![GraphEvent::Removed(Item::Edge(edge))]);
        Ok(())
    }

    pub fn remove_edges<'a, I>(&self, edges: I) -> Result<(), GraphError>
    where
        I: IntoIterator<Item = &'a Edge>,
    {
        for edge in edges {
            self.remove_edge(edge)?;
        }
        Ok(())
    }

    /// Removes the edges picked by `selector`; see [`EdgeSelector`] for the shapes.
    pub fn remove_edges_by_nodes(&self, selector: &EdgeSelector) -> Result<(), GraphError> {
        let mut events = Vec::new();
        {
            let mut index = self.shared.index.write();
            for id in index.select_edges(selector)? {
                if let Some(edge) = index.remove_edge(id) {
                    edge.set_owner(None);
                    events.push(GraphEvent::Removed(Item::Edge(edge)));
                }
            }
        }
        self.dispatch(events);
        Ok(())
    }

    pub fn remove_edges_by_type(&self, ty: &EdgeType) {
        let mut events = Vec::new();
        {
            let mut index = self.shared.index.write();
            let ids: Vec<EdgeId> = index.edge_ids_of_type(ty.id()).collect();
            for id in ids {
                if let Some(edge) = index.remove_edge(id) {
                    edge.set_owner(None);
                    events.push(GraphEvent::Removed(Item::Edge(edge)));
                }
            }
        }
        self.dispatch(events);
    }

    fn attach_node(&self, node: &Node, events: &mut Vec<GraphEvent>) -> Result<(), GraphError> {
        if node.is_owned_by(&self.shared) {
            return Ok(());
        }
        if let Some(previous) = node.graph() {
            debug!(
                node = %node.id(),
                from = previous.id(),
                to = self.shared.id,
                "transferring node"
            );
            previous.remove_node(node)?;
        }
        let carried = node.pending_edges();
        self.shared.index.write().insert_node(node);
        node.set_owner(Some(&self.shared));
        node.clear_pending();
        events.push(GraphEvent::Added(Item::Node(node.clone())));
        for edge in carried {
            self.attach_edge(&edge, events)?;
        }
        Ok(())
    }

    fn attach_edge(&self, edge: &Edge, events: &mut Vec<GraphEvent>) -> Result<(), GraphError> {
        if edge.is_owned_by(&self.shared) {
            return Ok(());
        }
        let (from, to) = edge.endpoints().ok_or_else(|| {
            GraphError::structural(format!("edge {} is missing an endpoint", edge.id()))
        })?;
        if let Some(previous) = edge.graph() {
            previous.remove_edge(edge)?;
        }
        self.attach_node(&from, events)?;
        self.attach_node(&to, events)?;
        // Attaching a detached endpoint may already have carried this edge in.
        if edge.is_owned_by(&self.shared) {
            return Ok(());
        }
        self.shared
            .index
            .write()
            .insert_edge(edge, from.id(), to.id())?;
        edge.set_owner(Some(&self.shared));
        events.push(GraphEvent::Added(Item::Edge(edge.clone())));
        Ok(())
    }
}

impl Graph {
    pub fn contains_node(&self, node: &Node) -> bool {
        self.read().contains_node(node.id())
    }

    pub fn contains_edge(&self, edge: &Edge) -> bool {
        self.read().contains_edge(edge.id())
    }

    pub fn node_count(&self) -> usize {
        self.read().node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.read().edge_count()
    }

    /// Nodes filed under `ty`, subtypes included, in creation order.
    pub fn nodes_of_type(&self, ty: &NodeType) -> Vec<Node> {
        self.read().nodes_of_type(ty.id())
    }

    pub fn edges_of_type(&self, ty: &EdgeType) -> Vec<Edge> {
        self.read().edges_of_type(ty.id())
    }

    pub fn endpoints(&self, edge: &Edge) -> Option<(Node, Node)> {
        let index = self.read();
        let ends = index.ends(edge.id())?;
        Some((index.node(ends.from)?.clone(), index.node(ends.to)?.clone()))
    }

    pub fn edges_of(&self, node: &Node) -> NodeEdges {
        let index = self.read();
        let Some(adjacency) = index.adjacency(node.id()) else {
            return NodeEdges::default();
        };
        let resolve = |ids: &std::collections::BTreeSet<EdgeId>| {
            ids.iter()
                .filter_map(|id| index.edge(*id).cloned())
                .collect()
        };
        NodeEdges {
            from: resolve(&adjacency.from),
            to: resolve(&adjacency.to),
        }
    }
}

impl Graph {
    pub fn subscribe<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&Graph, &GraphEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.shared.next_subscription.fetch_add(1, Ordering::Relaxed));
        self.shared.subscribers.lock().push((id, Arc::new(handler)));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.shared.subscribers.lock();
        let before = subscribers.len();
        subscribers.retain(|(existing, _)| *existing != id);
        before != subscribers.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.shared.subscribers.lock().len()
    }

    fn dispatch(&self, events: Vec<GraphEvent>) {
        for event in events {
            let subscribers: Vec<Subscriber> = self
                .shared
                .subscribers
                .lock()
                .iter()
                .map(|(_, handler)| Arc::clone(handler))
                .collect();
            trace!(
                graph = self.shared.id,
                ?event,
                subscribers = subscribers.len(),
                "dispatching"
            );
            for handler in subscribers {
                handler(self, &event);
            }
        }
    }
}

impl Graph {
    /// Uncached live query; every `run()` re-executes.
    pub fn query<I: Into<QueryInput>>(&self, input: I) -> Result<LiveQuery, GraphError> {
        LiveQuery::new(self, input, QueryOptions::default())
    }

    pub fn query_with<I: Into<QueryInput>>(
        &self,
        input: I,
        options: QueryOptions,
    ) -> Result<LiveQuery, GraphError> {
        LiveQuery::new(self, input, options)
    }

    pub fn observe<I: Into<QueryInput>>(&self, input: I) -> Result<Observer, GraphError> {
        Observer::new(self, input)
    }
}

impl PartialEq for Graph {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Graph {}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let index = self.read();
        f.debug_struct("Graph")
            .field("id", &self.shared.id)
            .field("nodes", &index.node_count())
            .field("edges", &index.edge_count())
            .finish()
    }
}

/// Walks detached nodes reachable through pre-wired edges and rejects the whole
/// attachment if any of those edges is missing an endpoint.
fn preflight(roots: &[Node]) -> Result<(), GraphError> {
    let mut seen = AHashSet::new();
    let mut stack: Vec<Node> = roots
        .iter()
        .filter(|node| node.graph().is_none())
        .cloned()
        .collect();
    while let Some(node) = stack.pop() {
        if !seen.insert(node.id()) {
            continue;
        }
        for edge in node.pending_edges() {
            let (from, to) = edge.endpoints().ok_or_else(|| {
                GraphError::structural(format!(
                    "edge {} incident to node {} is missing an endpoint",
                    edge.id(),
                    node.id()
                ))
            })?;
            for next in [from, to] {
                if next.graph().is_none() && !seen.contains(&next.id()) {
                    stack.push(next);
                }
            }
        }
    }
    Ok(())
}
