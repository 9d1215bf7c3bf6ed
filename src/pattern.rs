//! Declarative query input: a single tagged AST plus fluent fragment builders.
//!
//! ```rust
//! use livegraph::{NodeType, QueryInput};
//!
//! let person = NodeType::new("Person");
//! // "people who have an outgoing edge to another person, bound as `a` and `b`"
//! let input = QueryInput::list([person.named("a").to("b"), person.named("b")]);
//! assert_eq!(input.shape().len(), 2);
//! ```

use std::collections::BTreeMap;

use crate::{
    graph::{Edge, Node},
    types::{EdgeType, NodeType},
};

/// One element of a query pattern.
#[derive(Clone, Debug)]
pub enum QueryItem {
    NodeType(NodeType),
    EdgeType(EdgeType),
    Node(Node),
    Edge(Edge),
    /// A named reference, resolved against other items in the same query.
    Ref(String),
    NodeFragment(Box<NodeFragment>),
    EdgeFragment(Box<EdgeFragment>),
}

/// How a related item attaches to its fragment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Relation {
    /// Node fragments: joined by an edge in either direction, or an endpoint of the
    /// given edge; `from_or_to` is an alias. Edge fragments: same as
    /// [`Relation::FromOrTo`].
    With,
    /// Node fragments: has an outgoing edge to the item. Edge fragments: the item is
    /// the target.
    To,
    /// Node fragments: has an incoming edge from the item. Edge fragments: the item is
    /// the source.
    From,
    /// Edge fragments only: the item is either endpoint. At most two per edge.
    FromOrTo,
}

#[derive(Clone, Debug)]
pub enum NodeBase {
    Type(NodeType),
    Instance(Node),
}

#[derive(Clone, Debug)]
pub enum EdgeBase {
    Type(EdgeType),
    Instance(Edge),
}

#[derive(Clone, Debug)]
pub struct NodeFragment {
    pub base: NodeBase,
    pub name: Option<String>,
    pub relations: Vec<(Relation, QueryItem)>,
    pub excluding: Vec<NodeType>,
}

#[derive(Clone, Debug)]
pub struct EdgeFragment {
    pub base: EdgeBase,
    pub name: Option<String>,
    pub relations: Vec<(Relation, QueryItem)>,
    pub excluding: Vec<EdgeType>,
}

impl NodeFragment {
    pub fn of_type(ty: &NodeType) -> Self {
        Self::with_base(NodeBase::Type(ty.clone()))
    }

    pub fn instance(node: &Node) -> Self {
        Self::with_base(NodeBase::Instance(node.clone()))
    }

    fn with_base(base: NodeBase) -> Self {
        Self {
            base,
            name: None,
            relations: Vec::new(),
            excluding: Vec::new(),
        }
    }

    /// Bind this fragment's slot to `name` so other items can refer to it.
    pub fn named(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn with<I: Into<QueryItem>>(self, item: I) -> Self {
        self.relate(Relation::With, item)
    }

    /// Alias for [`NodeFragment::with`].
    pub fn from_or_to<I: Into<QueryItem>>(self, item: I) -> Self {
        self.with(item)
    }

    pub fn to<I: Into<QueryItem>>(self, item: I) -> Self {
        self.relate(Relation::To, item)
    }

    pub fn from<I: Into<QueryItem>>(self, item: I) -> Self {
        self.relate(Relation::From, item)
    }

    pub fn excluding(mut self, ty: &NodeType) -> Self {
        self.excluding.push(ty.clone());
        self
    }

    fn relate<I: Into<QueryItem>>(mut self, relation: Relation, item: I) -> Self {
        self.relations.push((relation, item.into()));
        self
    }
}

impl EdgeFragment {
    pub fn of_type(ty: &EdgeType) -> Self {
        Self::with_base(EdgeBase::Type(ty.clone()))
    }

    pub fn instance(edge: &Edge) -> Self {
        Self::with_base(EdgeBase::Instance(edge.clone()))
    }

    fn with_base(base: EdgeBase) -> Self {
        Self {
            base,
            name: None,
            relations: Vec::new(),
            excluding: Vec::new(),
        }
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn with<I: Into<QueryItem>>(self, item: I) -> Self {
        self.relate(Relation::With, item)
    }

    pub fn to<I: Into<QueryItem>>(self, item: I) -> Self {
        self.relate(Relation::To, item)
    }

    pub fn from<I: Into<QueryItem>>(self, item: I) -> Self {
        self.relate(Relation::From, item)
    }

    pub fn from_or_to<I: Into<QueryItem>>(self, item: I) -> Self {
        self.relate(Relation::FromOrTo, item)
    }

    pub fn excluding(mut self, ty: &EdgeType) -> Self {
        self.excluding.push(ty.clone());
        self
    }

    fn relate<I: Into<QueryItem>>(mut self, relation: Relation, item: I) -> Self {
        self.relations.push((relation, item.into()));
        self
    }
}

impl NodeType {
    pub fn named(&self, name: &str) -> NodeFragment {
        NodeFragment::of_type(self).named(name)
    }

    pub fn with<I: Into<QueryItem>>(&self, item: I) -> NodeFragment {
        NodeFragment::of_type(self).with(item)
    }

    pub fn from_or_to<I: Into<QueryItem>>(&self, item: I) -> NodeFragment {
        NodeFragment::of_type(self).with(item)
    }

    pub fn to<I: Into<QueryItem>>(&self, item: I) -> NodeFragment {
        NodeFragment::of_type(self).to(item)
    }

    pub fn from<I: Into<QueryItem>>(&self, item: I) -> NodeFragment {
        NodeFragment::of_type(self).from(item)
    }

    pub fn excluding(&self, ty: &NodeType) -> NodeFragment {
        NodeFragment::of_type(self).excluding(ty)
    }
}

impl EdgeType {
    pub fn named(&self, name: &str) -> EdgeFragment {
        EdgeFragment::of_type(self).named(name)
    }

    pub fn with<I: Into<QueryItem>>(&self, item: I) -> EdgeFragment {
        EdgeFragment::of_type(self).with(item)
    }

    pub fn to<I: Into<QueryItem>>(&self, item: I) -> EdgeFragment {
        EdgeFragment::of_type(self).to(item)
    }

    pub fn from<I: Into<QueryItem>>(&self, item: I) -> EdgeFragment {
        EdgeFragment::of_type(self).from(item)
    }

    pub fn from_or_to<I: Into<QueryItem>>(&self, item: I) -> EdgeFragment {
        EdgeFragment::of_type(self).from_or_to(item)
    }

    pub fn excluding(&self, ty: &EdgeType) -> EdgeFragment {
        EdgeFragment::of_type(self).excluding(ty)
    }
}

impl From<NodeType> for QueryItem {
    fn from(value: NodeType) -> Self {
        QueryItem::NodeType(value)
    }
}

impl From<&NodeType> for QueryItem {
    fn from(value: &NodeType) -> Self {
        QueryItem::NodeType(value.clone())
    }
}

impl From<EdgeType> for QueryItem {
    fn from(value: EdgeType) -> Self {
        QueryItem::EdgeType(value)
    }
}

impl From<&EdgeType> for QueryItem {
    fn from(value: &EdgeType) -> Self {
        QueryItem::EdgeType(value.clone())
    }
}

impl From<Node> for QueryItem {
    fn from(value: Node) -> Self {
        QueryItem::Node(value)
    }
}

impl From<&Node> for QueryItem {
    fn from(value: &Node) -> Self {
        QueryItem::Node(value.clone())
    }
}

impl From<Edge> for QueryItem {
    fn from(value: Edge) -> Self {
        QueryItem::Edge(value)
    }
}

impl From<&Edge> for QueryItem {
    fn from(value: &Edge) -> Self {
        QueryItem::Edge(value.clone())
    }
}

impl From<&str> for QueryItem {
    fn from(value: &str) -> Self {
        QueryItem::Ref(value.to_string())
    }
}

impl From<String> for QueryItem {
    fn from(value: String) -> Self {
        QueryItem::Ref(value)
    }
}

impl From<NodeFragment> for QueryItem {
    fn from(value: NodeFragment) -> Self {
        QueryItem::NodeFragment(Box::new(value))
    }
}

impl From<EdgeFragment> for QueryItem {
    fn from(value: EdgeFragment) -> Self {
        QueryItem::EdgeFragment(Box::new(value))
    }
}

/// Top-level query input. The output of every match mirrors this shape.
#[derive(Clone, Debug)]
pub enum QueryInput {
    Single(QueryItem),
    List(Vec<QueryItem>),
    Map(BTreeMap<String, QueryItem>),
}

impl QueryInput {
    pub fn single<T: Into<QueryItem>>(item: T) -> Self {
        QueryInput::Single(item.into())
    }

    pub fn list<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<QueryItem>,
    {
        QueryInput::List(items.into_iter().map(Into::into).collect())
    }

    pub fn map<I, K, T>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, T)>,
        K: Into<String>,
        T: Into<QueryItem>,
    {
        QueryInput::Map(
            entries
                .into_iter()
                .map(|(key, item)| (key.into(), item.into()))
                .collect(),
        )
    }

    pub fn shape(&self) -> QueryShape {
        match self {
            QueryInput::Single(_) => QueryShape::Single,
            QueryInput::List(items) => QueryShape::List(items.len()),
            QueryInput::Map(entries) => QueryShape::Map(entries.keys().cloned().collect()),
        }
    }
}

macro_rules! single_input_from {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for QueryInput {
                fn from(value: $ty) -> Self {
                    QueryInput::Single(value.into())
                }
            }
        )*
    };
}

single_input_from!(
    NodeType,
    &NodeType,
    EdgeType,
    &EdgeType,
    Node,
    &Node,
    Edge,
    &Edge,
    &str,
    String,
    NodeFragment,
    EdgeFragment,
);

impl From<QueryItem> for QueryInput {
    fn from(value: QueryItem) -> Self {
        QueryInput::Single(value)
    }
}

impl From<Vec<QueryItem>> for QueryInput {
    fn from(value: Vec<QueryItem>) -> Self {
        QueryInput::List(value)
    }
}

impl From<BTreeMap<String, QueryItem>> for QueryInput {
    fn from(value: BTreeMap<String, QueryItem>) -> Self {
        QueryInput::Map(value)
    }
}

/// The outer shape of a query input, kept for projection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum QueryShape {
    Single,
    List(usize),
    Map(Vec<String>),
}

impl QueryShape {
    /// Number of output positions.
    pub fn len(&self) -> usize {
        match self {
            QueryShape::Single => 1,
            QueryShape::List(len) => *len,
            QueryShape::Map(keys) => keys.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
