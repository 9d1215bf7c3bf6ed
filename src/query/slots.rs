//! Compiled query positions.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::{
    graph::Item,
    pattern::QueryShape,
    types::{ItemKind, ItemType},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SlotKind {
    Node,
    Edge,
    /// A string reference that has not been used in a typed context yet.
    Unknown,
}

impl SlotKind {
    pub fn item_kind(self) -> Option<ItemKind> {
        match self {
            SlotKind::Node => Some(ItemKind::Node),
            SlotKind::Edge => Some(ItemKind::Edge),
            SlotKind::Unknown => None,
        }
    }
}

impl From<ItemKind> for SlotKind {
    fn from(value: ItemKind) -> Self {
        match value {
            ItemKind::Node => SlotKind::Node,
            ItemKind::Edge => SlotKind::Edge,
        }
    }
}

/// Where a slot's bound value lands in the projected output.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OutputPosition {
    Root,
    Index(usize),
    Key(String),
}

#[derive(Clone, Debug)]
pub struct Slot {
    pub name: String,
    pub kind: SlotKind,
    /// Synthesized by the parser rather than named by the caller.
    pub anonymous: bool,
    pub instance: Option<Item>,
    pub ty: Option<ItemType>,
    pub excluded: Vec<ItemType>,
    /// Edge slots: source node slots. Node slots: edge slots pointing at this node.
    pub from: Vec<String>,
    /// Edge slots: target node slots. Node slots: edge slots leaving this node.
    pub to: Vec<String>,
    /// Endpoint links in either role.
    pub from_or_to: Vec<String>,
    pub outputs: Vec<OutputPosition>,
}

impl Slot {
    pub(crate) fn new(name: String, kind: SlotKind, anonymous: bool) -> Self {
        Self {
            name,
            kind,
            anonymous,
            instance: None,
            ty: None,
            excluded: Vec::new(),
            from: Vec::new(),
            to: Vec::new(),
            from_or_to: Vec::new(),
            outputs: Vec::new(),
        }
    }

    /// Declared type, falling back to the root type of the slot's kind.
    pub fn scan_type(&self) -> Option<ItemType> {
        match (&self.ty, self.kind.item_kind()) {
            (Some(ty), _) => Some(ty.clone()),
            (None, Some(kind)) => Some(ItemType::root(kind)),
            (None, None) => None,
        }
    }

    /// Constraints checkable on a single candidate: kind, exact instance, required type
    /// and exclusions.
    pub fn accepts(&self, item: &Item) -> bool {
        if self.kind.item_kind() != Some(item.kind()) {
            return false;
        }
        if let Some(instance) = &self.instance {
            if instance != item {
                return false;
            }
        }
        self.admits_type(item.item_type())
    }

    /// Type-only relevance check used by live queries.
    pub fn admits_type(&self, ty: &ItemType) -> bool {
        let Some(required) = self.scan_type() else {
            return false;
        };
        ty.is_a(&required) && !self.excluded.iter().any(|excluded| ty.is_a(excluded))
    }
}

/// Every slot of one compiled query, in creation order.
#[derive(Clone, Debug)]
pub struct Slots {
    slots: Vec<Slot>,
    by_name: AHashMap<String, usize>,
    shape: QueryShape,
}

impl Slots {
    pub(crate) fn new(
        slots: Vec<Slot>,
        by_name: AHashMap<String, usize>,
        shape: QueryShape,
    ) -> Self {
        Self {
            slots,
            by_name,
            shape,
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn shape(&self) -> &QueryShape {
        &self.shape
    }

    pub fn get(&self, name: &str) -> Option<&Slot> {
        self.by_name.get(name).map(|index| &self.slots[*index])
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    pub fn slot(&self, index: usize) -> Option<&Slot> {
        self.slots.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Slot> {
        self.slots.iter()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Slot> {
        self.slots.iter().filter(|slot| slot.kind == SlotKind::Node)
    }

    pub fn edges(&self) -> impl Iterator<Item = &Slot> {
        self.slots.iter().filter(|slot| slot.kind == SlotKind::Edge)
    }

    pub fn unknown(&self) -> impl Iterator<Item = &Slot> {
        self.slots.iter().filter(|slot| slot.kind == SlotKind::Unknown)
    }

    /// `true` when adding or removing `item` could change this query's results.
    pub fn is_relevant(&self, item: &Item) -> bool {
        let kind = SlotKind::from(item.kind());
        self.slots
            .iter()
            .any(|slot| slot.kind == kind && slot.admits_type(item.item_type()))
    }
}

/// A node slot's role on an edge slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Source,
    Target,
    /// Either end.
    Endpoint,
}

impl Role {
    pub fn opposite(self) -> Role {
        match self {
            Role::Source => Role::Target,
            Role::Target => Role::Source,
            Role::Endpoint => Role::Endpoint,
        }
    }
}
