//! Node and edge type vocabulary.
//!
//! Every declared type receives a numeric [`TypeId`] and a precomputed ancestor list
//! (self first, root last) when it is created. Subtype checks are a scan of that list;
//! nothing is reflected at query time. Node types and edge types live in separate
//! hierarchies rooted at [`NodeType::root`] and [`EdgeType::root`].

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, LazyLock};

use serde::{Deserialize, Serialize};

static NEXT_TYPE_ID: AtomicU32 = AtomicU32::new(0);

static ROOT_NODE_TYPE: LazyLock<NodeType> =
    LazyLock::new(|| NodeType(ItemType::declare("Node", ItemKind::Node, None)));
static ROOT_EDGE_TYPE: LazyLock<EdgeType> =
    LazyLock::new(|| EdgeType(ItemType::declare("Edge", ItemKind::Edge, None)));

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TypeId(u32);

impl TypeId {
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

/// Which half of the graph an item or type belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemKind {
    Node,
    Edge,
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemKind::Node => f.write_str("node"),
            ItemKind::Edge => f.write_str("edge"),
        }
    }
}

#[derive(Debug)]
struct TypeInfo {
    id: TypeId,
    name: String,
    kind: ItemKind,
    /// Self first, root last.
    ancestors: Vec<TypeId>,
}

/// A registered type of either kind. [`NodeType`] and [`EdgeType`] wrap this.
#[derive(Clone)]
pub struct ItemType(Arc<TypeInfo>);

impl ItemType {
    fn declare(name: &str, kind: ItemKind, parent: Option<&ItemType>) -> Self {
        let id = TypeId(NEXT_TYPE_ID.fetch_add(1, Ordering::Relaxed));
        let mut ancestors = vec![id];
        if let Some(parent) = parent {
            ancestors.extend_from_slice(&parent.0.ancestors);
        }
        Self(Arc::new(TypeInfo {
            id,
            name: name.to_string(),
            kind,
            ancestors,
        }))
    }

    pub fn id(&self) -> TypeId {
        self.0.id
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn kind(&self) -> ItemKind {
        self.0.kind
    }

    /// Type ids from this type up to its root, inclusive on both ends.
    pub fn ancestors(&self) -> &[TypeId] {
        &self.0.ancestors
    }

    /// `true` when `other` is this type or one of its ancestors.
    pub fn is_a(&self, other: &ItemType) -> bool {
        self.0.kind == other.0.kind && self.0.ancestors.contains(&other.0.id)
    }

    /// The more specific of two related types, or `None` when neither derives from the
    /// other.
    pub fn narrowest(&self, other: &ItemType) -> Option<ItemType> {
        if self.is_a(other) {
            Some(self.clone())
        } else if other.is_a(self) {
            Some(other.clone())
        } else {
            None
        }
    }

    pub fn root(kind: ItemKind) -> ItemType {
        match kind {
            ItemKind::Node => NodeType::root().0,
            ItemKind::Edge => EdgeType::root().0,
        }
    }
}

impl PartialEq for ItemType {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}

impl Eq for ItemType {}

impl std::hash::Hash for ItemType {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
    }
}

impl fmt::Debug for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}#{})", self.0.kind, self.0.name, self.0.id.0)
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.name)
    }
}

/// A node type. Clone is cheap.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct NodeType(ItemType);

impl NodeType {
    pub fn root() -> NodeType {
        ROOT_NODE_TYPE.clone()
    }

    /// Declare a new node type deriving from the root node type.
    pub fn new(name: &str) -> NodeType {
        Self::root().subtype(name)
    }

    /// Declare a new node type deriving from `self`.
    pub fn subtype(&self, name: &str) -> NodeType {
        NodeType(ItemType::declare(name, ItemKind::Node, Some(&self.0)))
    }

    pub fn id(&self) -> TypeId {
        self.0.id()
    }

    pub fn name(&self) -> &str {
        self.0.name()
    }

    pub fn is_a(&self, other: &NodeType) -> bool {
        self.0.is_a(&other.0)
    }

    pub fn item_type(&self) -> &ItemType {
        &self.0
    }
}

/// An edge type. Clone is cheap.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct EdgeType(ItemType);

impl EdgeType {
    pub fn root() -> EdgeType {
        ROOT_EDGE_TYPE.clone()
    }

    pub fn new(name: &str) -> EdgeType {
        Self::root().subtype(name)
    }

    pub fn subtype(&self, name: &str) -> EdgeType {
        EdgeType(ItemType::declare(name, ItemKind::Edge, Some(&self.0)))
    }

    pub fn id(&self) -> TypeId {
        self.0.id()
    }

    pub fn name(&self) -> &str {
        self.0.name()
    }

    pub fn is_a(&self, other: &EdgeType) -> bool {
        self.0.is_a(&other.0)
    }

    pub fn item_type(&self) -> &ItemType {
        &self.0
    }
}

impl From<NodeType> for ItemType {
    fn from(value: NodeType) -> Self {
        value.0
    }
}

impl From<EdgeType> for ItemType {
    fn from(value: EdgeType) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subtype_ancestors_end_at_root() {
        let animal = NodeType::new("Animal");
        let dog = animal.subtype("Dog");
        assert_eq!(
            dog.item_type().ancestors(),
            &[dog.id(), animal.id(), NodeType::root().id()]
        );
        assert!(dog.is_a(&animal));
        assert!(dog.is_a(&NodeType::root()));
        assert!(!animal.is_a(&dog));
    }

    #[test]
    fn test_narrowest_picks_descendant() {
        let animal = NodeType::new("Animal");
        let dog = animal.subtype("Dog");
        let cat = animal.subtype("Cat");
        let narrowed = animal.item_type().narrowest(dog.item_type());
        assert_eq!(narrowed, Some(dog.item_type().clone()));
        assert!(dog.item_type().narrowest(cat.item_type()).is_none());
    }

    #[test]
    fn test_node_and_edge_roots_are_unrelated() {
        let node_root = ItemType::root(ItemKind::Node);
        let edge_root = ItemType::root(ItemKind::Edge);
        assert!(!node_root.is_a(&edge_root));
        assert!(node_root.narrowest(&edge_root).is_none());
    }
}
