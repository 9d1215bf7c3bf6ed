use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::{
    errors::GraphError,
    types::{EdgeType, ItemKind, ItemType, NodeType},
};

use super::{Graph, GraphShared};

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);
static NEXT_EDGE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique node identity. Ids increase monotonically and are never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(u64);

/// Process-unique edge identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EdgeId(u64);

impl NodeId {
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl EdgeId {
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

type Owner = Mutex<Option<Weak<GraphShared>>>;

fn owner_graph(owner: &Owner) -> Option<Graph> {
    owner
        .lock()
        .as_ref()
        .and_then(Weak::upgrade)
        .map(|shared| Graph { shared })
}

fn owned_by(owner: &Owner, shared: &Arc<GraphShared>) -> bool {
    owner
        .lock()
        .as_ref()
        .is_some_and(|weak| std::ptr::eq(weak.as_ptr(), Arc::as_ptr(shared)))
}

struct NodeInner {
    id: NodeId,
    ty: NodeType,
    data: serde_json::Value,
    owner: Owner,
    /// Edges wired to this node while it was detached.
    pending: Mutex<Vec<Weak<EdgeInner>>>,
}

/// Shared handle to a graph node. Equality and hashing use the node id only.
#[derive(Clone)]
pub struct Node(Arc<NodeInner>);

impl Node {
    pub fn new(ty: &NodeType) -> Node {
        Self::with_data(ty, serde_json::Value::Null)
    }

    pub fn with_data(ty: &NodeType, data: serde_json::Value) -> Node {
        Node(Arc::new(NodeInner {
            id: NodeId(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed)),
            ty: ty.clone(),
            data,
            owner: Mutex::new(None),
            pending: Mutex::new(Vec::new()),
        }))
    }

    pub fn id(&self) -> NodeId {
        self.0.id
    }

    pub fn node_type(&self) -> &NodeType {
        &self.0.ty
    }

    pub fn data(&self) -> &serde_json::Value {
        &self.0.data
    }

    /// The graph currently owning this node.
    pub fn graph(&self) -> Option<Graph> {
        owner_graph(&self.0.owner)
    }

    /// Incident edges, read from the owning store's index. A detached node reports the
    /// edges wired to it before attachment.
    pub fn edges(&self) -> NodeEdges {
        match self.graph() {
            Some(graph) => graph.edges_of(self),
            None => {
                let mut view = NodeEdges::default();
                for edge in self.pending_edges() {
                    if edge.from().as_ref() == Some(self) {
                        view.from.push(edge.clone());
                    }
                    if edge.to().as_ref() == Some(self) {
                        view.to.push(edge);
                    }
                }
                view
            }
        }
    }

    pub(crate) fn is_owned_by(&self, shared: &Arc<GraphShared>) -> bool {
        owned_by(&self.0.owner, shared)
    }

    pub(crate) fn set_owner(&self, shared: Option<&Arc<GraphShared>>) {
        *self.0.owner.lock() = shared.map(Arc::downgrade);
    }

    pub(crate) fn pending_edges(&self) -> Vec<Edge> {
        self.0
            .pending
            .lock()
            .iter()
            .filter_map(Weak::upgrade)
            .map(Edge)
            .collect()
    }

    pub(crate) fn clear_pending(&self) {
        self.0.pending.lock().clear();
    }

    fn register_pending(&self, edge: &Edge) {
        let mut pending = self.0.pending.lock();
        pending.retain(|weak| weak.strong_count() > 0);
        if !pending
            .iter()
            .any(|weak| std::ptr::eq(weak.as_ptr(), Arc::as_ptr(&edge.0)))
        {
            pending.push(Arc::downgrade(&edge.0));
        }
    }

    fn unregister_pending(&self, edge: &Edge) {
        self.0.pending.lock().retain(|weak| {
            weak.strong_count() > 0 && !std::ptr::eq(weak.as_ptr(), Arc::as_ptr(&edge.0))
        });
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}

impl Eq for Node {}

impl Hash for Node {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node({}: {})", self.0.id, self.0.ty.name())
    }
}

#[derive(Default)]
struct Ends {
    from: Option<Node>,
    to: Option<Node>,
}

struct EdgeInner {
    id: EdgeId,
    ty: EdgeType,
    data: serde_json::Value,
    owner: Owner,
    ends: Mutex<Ends>,
}

/// Shared handle to a directed graph edge. Equality and hashing use the edge id only.
#[derive(Clone)]
pub struct Edge(Arc<EdgeInner>);

impl Edge {
    pub fn new(ty: &EdgeType) -> Edge {
        Self::with_data(ty, serde_json::Value::Null)
    }

    pub fn with_data(ty: &EdgeType, data: serde_json::Value) -> Edge {
        Edge(Arc::new(EdgeInner {
            id: EdgeId(NEXT_EDGE_ID.fetch_add(1, Ordering::Relaxed)),
            ty: ty.clone(),
            data,
            owner: Mutex::new(None),
            ends: Mutex::new(Ends::default()),
        }))
    }

    /// A detached edge already wired between `from` and `to`.
    pub fn between(ty: &EdgeType, from: &Node, to: &Node) -> Edge {
        let edge = Self::new(ty);
        edge.rewire(from, to);
        edge
    }

    pub fn id(&self) -> EdgeId {
        self.0.id
    }

    pub fn edge_type(&self) -> &EdgeType {
        &self.0.ty
    }

    pub fn data(&self) -> &serde_json::Value {
        &self.0.data
    }

    pub fn graph(&self) -> Option<Graph> {
        owner_graph(&self.0.owner)
    }

    pub fn from(&self) -> Option<Node> {
        self.0.ends.lock().from.clone()
    }

    pub fn to(&self) -> Option<Node> {
        self.0.ends.lock().to.clone()
    }

    /// Both endpoints, or `None` while either is unset.
    pub fn endpoints(&self) -> Option<(Node, Node)> {
        let ends = self.0.ends.lock();
        match (&ends.from, &ends.to) {
            (Some(from), Some(to)) => Some((from.clone(), to.clone())),
            _ => None,
        }
    }

    /// Wire the source of a detached edge.
    pub fn set_from(&self, node: &Node) -> Result<(), GraphError> {
        self.ensure_detached()?;
        let previous = self.0.ends.lock().from.replace(node.clone());
        self.release_endpoint(previous);
        if node.graph().is_none() {
            node.register_pending(self);
        }
        Ok(())
    }

    /// Wire the target of a detached edge.
    pub fn set_to(&self, node: &Node) -> Result<(), GraphError> {
        self.ensure_detached()?;
        let previous = self.0.ends.lock().to.replace(node.clone());
        self.release_endpoint(previous);
        if node.graph().is_none() {
            node.register_pending(self);
        }
        Ok(())
    }

    /// Store-side rewiring; skips the detached check.
    pub(crate) fn rewire(&self, from: &Node, to: &Node) {
        let (old_from, old_to) = {
            let mut ends = self.0.ends.lock();
            (ends.from.replace(from.clone()), ends.to.replace(to.clone()))
        };
        self.release_endpoint(old_from);
        self.release_endpoint(old_to);
        for node in [from, to] {
            if node.graph().is_none() {
                node.register_pending(self);
            }
        }
    }

    pub(crate) fn is_owned_by(&self, shared: &Arc<GraphShared>) -> bool {
        owned_by(&self.0.owner, shared)
    }

    pub(crate) fn set_owner(&self, shared: Option<&Arc<GraphShared>>) {
        *self.0.owner.lock() = shared.map(Arc::downgrade);
        if shared.is_some() {
            if let Some((from, to)) = self.endpoints() {
                from.unregister_pending(self);
                to.unregister_pending(self);
            }
        }
    }

    fn ensure_detached(&self) -> Result<(), GraphError> {
        if self.graph().is_some() {
            return Err(GraphError::invalid_input(format!(
                "edge {} is attached; rewire it through its graph",
                self.0.id
            )));
        }
        Ok(())
    }

    fn release_endpoint(&self, previous: Option<Node>) {
        if let Some(node) = previous {
            let still_wired = {
                let ends = self.0.ends.lock();
                ends.from.as_ref() == Some(&node) || ends.to.as_ref() == Some(&node)
            };
            if !still_wired {
                node.unregister_pending(self);
            }
        }
    }
}

impl PartialEq for Edge {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}

impl Eq for Edge {}

impl Hash for Edge {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
    }
}

impl fmt::Debug for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Edge({}: {})", self.0.id, self.0.ty.name())
    }
}

/// A node or an edge. Used for store events and for bound query values.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum Item {
    Node(Node),
    Edge(Edge),
}

impl Item {
    pub fn kind(&self) -> ItemKind {
        match self {
            Item::Node(_) => ItemKind::Node,
            Item::Edge(_) => ItemKind::Edge,
        }
    }

    pub fn item_type(&self) -> &ItemType {
        match self {
            Item::Node(node) => node.node_type().item_type(),
            Item::Edge(edge) => edge.edge_type().item_type(),
        }
    }

    /// Raw id. Node and edge ids come from separate counters, so pair with
    /// [`Item::kind`] when comparing across kinds.
    pub fn raw_id(&self) -> u64 {
        match self {
            Item::Node(node) => node.id().as_u64(),
            Item::Edge(edge) => edge.id().as_u64(),
        }
    }

    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Item::Node(node) => Some(node),
            Item::Edge(_) => None,
        }
    }

    pub fn as_edge(&self) -> Option<&Edge> {
        match self {
            Item::Edge(edge) => Some(edge),
            Item::Node(_) => None,
        }
    }
}

impl From<Node> for Item {
    fn from(value: Node) -> Self {
        Item::Node(value)
    }
}

impl From<Edge> for Item {
    fn from(value: Edge) -> Self {
        Item::Edge(value)
    }
}

/// Incident edges of a node, split by role.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NodeEdges {
    /// Edges where the node is the source.
    pub from: Vec<Edge>,
    /// Edges where the node is the target.
    pub to: Vec<Edge>,
}

impl NodeEdges {
    pub fn len(&self) -> usize {
        self.from.len() + self.to.len()
    }

    pub fn is_empty(&self) -> bool {
        self.from.is_empty() && self.to.is_empty()
    }
}
