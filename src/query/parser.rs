//! Compiles [`QueryInput`] into [`Slots`].

use ahash::AHashMap;

use crate::{
    errors::GraphError,
    graph::Item,
    pattern::{EdgeBase, EdgeFragment, NodeBase, NodeFragment, QueryInput, QueryItem, Relation},
    types::{EdgeType, ItemKind, ItemType},
};

use super::slots::{OutputPosition, Role, Slot, SlotKind, Slots};

/// Maximum number of `from_or_to` endpoints on one edge slot.
pub const MAX_EDGE_ENDPOINTS: usize = 2;

pub fn parse(input: &QueryInput) -> Result<Slots, GraphError> {
    let mut parser = Parser::default();
    match input {
        QueryInput::Single(item) => {
            let slot = parser.item(item, Expect::Any)?;
            parser.slots[slot].outputs.push(OutputPosition::Root);
        }
        QueryInput::List(items) => {
            for (index, item) in items.iter().enumerate() {
                let slot = parser.item(item, Expect::Any)?;
                parser.slots[slot].outputs.push(OutputPosition::Index(index));
            }
        }
        QueryInput::Map(entries) => {
            for (key, item) in entries {
                let slot = parser.item(item, Expect::Any)?;
                parser.slots[slot].outputs.push(OutputPosition::Key(key.clone()));
            }
        }
    }
    parser.finish(input)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Expect {
    Any,
    Node,
    Edge,
}

impl Expect {
    fn slot_kind(self) -> SlotKind {
        match self {
            Expect::Any => SlotKind::Unknown,
            Expect::Node => SlotKind::Node,
            Expect::Edge => SlotKind::Edge,
        }
    }

    fn check(self, found: ItemKind, what: &str) -> Result<(), GraphError> {
        match (self, found) {
            (Expect::Any, _) | (Expect::Node, ItemKind::Node) | (Expect::Edge, ItemKind::Edge) => {
                Ok(())
            }
            (expected, found) => Err(GraphError::reference_mismatch(format!(
                "expected {expected:?} item, found {found} {what}"
            ))),
        }
    }
}

#[derive(Default)]
struct Parser {
    slots: Vec<Slot>,
    by_name: AHashMap<String, usize>,
    anonymous: usize,
    deferred: Vec<(usize, usize, Role)>,
}

impl Parser {
    fn item(&mut self, item: &QueryItem, expect: Expect) -> Result<usize, GraphError> {
        match item {
            QueryItem::NodeType(ty) => {
                expect.check(ItemKind::Node, ty.name())?;
                let slot = self.anonymous_slot(SlotKind::Node);
                self.narrow(slot, ty.item_type())?;
                Ok(slot)
            }
            QueryItem::EdgeType(ty) => {
                expect.check(ItemKind::Edge, ty.name())?;
                let slot = self.anonymous_slot(SlotKind::Edge);
                self.narrow(slot, ty.item_type())?;
                Ok(slot)
            }
            QueryItem::Node(node) => {
                expect.check(ItemKind::Node, "instance")?;
                self.instance_slot(Item::Node(node.clone()), None)
            }
            QueryItem::Edge(edge) => {
                expect.check(ItemKind::Edge, "instance")?;
                self.instance_slot(Item::Edge(edge.clone()), None)
            }
            QueryItem::Ref(name) => self.named_slot(name, expect.slot_kind()),
            QueryItem::NodeFragment(fragment) => {
                expect.check(ItemKind::Node, "fragment")?;
                self.node_fragment(fragment)
            }
            QueryItem::EdgeFragment(fragment) => {
                expect.check(ItemKind::Edge, "fragment")?;
                self.edge_fragment(fragment)
            }
        }
    }

    fn node_fragment(&mut self, fragment: &NodeFragment) -> Result<usize, GraphError> {
        let slot = match &fragment.base {
            NodeBase::Type(ty) => {
                let slot = match &fragment.name {
                    Some(name) => self.named_slot(name, SlotKind::Node)?,
                    None => self.anonymous_slot(SlotKind::Node),
                };
                self.narrow(slot, ty.item_type())?;
                slot
            }
            NodeBase::Instance(node) => {
                self.instance_slot(Item::Node(node.clone()), fragment.name.as_deref())?
            }
        };
        for ty in &fragment.excluding {
            self.exclude(slot, ty.item_type())?;
        }
        for (relation, item) in &fragment.relations {
            let role = match relation {
                Relation::To => Role::Source,
                Relation::From => Role::Target,
                Relation::With | Relation::FromOrTo => Role::Endpoint,
            };
            self.node_relation(slot, item, role)?;
        }
        Ok(slot)
    }

    fn edge_fragment(&mut self, fragment: &EdgeFragment) -> Result<usize, GraphError> {
        let slot = match &fragment.base {
            EdgeBase::Type(ty) => {
                let slot = match &fragment.name {
                    Some(name) => self.named_slot(name, SlotKind::Edge)?,
                    None => self.anonymous_slot(SlotKind::Edge),
                };
                self.narrow(slot, ty.item_type())?;
                slot
            }
            EdgeBase::Instance(edge) => {
                self.instance_slot(Item::Edge(edge.clone()), fragment.name.as_deref())?
            }
        };
        for ty in &fragment.excluding {
            self.exclude(slot, ty.item_type())?;
        }
        for (relation, item) in &fragment.relations {
            // The related node plays `role` on this edge.
            let role = match relation {
                Relation::To => Role::Target,
                Relation::From => Role::Source,
                Relation::With | Relation::FromOrTo => Role::Endpoint,
            };
            let node = self.item(item, Expect::Node)?;
            self.link(node, slot, role)?;
        }
        Ok(slot)
    }

    /// `role` is what the fragment's node plays on the connecting edge.
    fn node_relation(
        &mut self,
        node: usize,
        item: &QueryItem,
        role: Role,
    ) -> Result<(), GraphError> {
        if let QueryItem::Ref(name) = item {
            let other = self.named_slot(name, SlotKind::Unknown)?;
            if self.slots[other].kind == SlotKind::Unknown {
                // Lowered in `finish`, once the reference has a kind.
                self.deferred.push((node, other, role));
                return Ok(());
            }
            return self.connect(node, other, role);
        }
        if is_edge_item(item) {
            let edge = self.item(item, Expect::Edge)?;
            return self.link(node, edge, role);
        }
        let edge = self.companion_edge()?;
        self.link(node, edge, role)?;
        let other = self.item(item, Expect::Node)?;
        self.link(other, edge, role.opposite())
    }

    /// Links `node` to an existing slot: directly for an edge, through a companion edge
    /// otherwise. A reference nothing else typed is taken as a node.
    fn connect(&mut self, node: usize, other: usize, role: Role) -> Result<(), GraphError> {
        if self.slots[other].kind == SlotKind::Edge {
            return self.link(node, other, role);
        }
        self.set_kind(other, SlotKind::Node)?;
        let edge = self.companion_edge()?;
        self.link(node, edge, role)?;
        self.link(other, edge, role.opposite())
    }

    fn companion_edge(&mut self) -> Result<usize, GraphError> {
        let edge = self.anonymous_slot(SlotKind::Edge);
        self.narrow(edge, EdgeType::root().item_type())?;
        Ok(edge)
    }

    fn link(&mut self, node: usize, edge: usize, role: Role) -> Result<(), GraphError> {
        let node_name = self.slots[node].name.clone();
        let edge_name = self.slots[edge].name.clone();
        match role {
            Role::Source => {
                self.slots[node].to.push(edge_name);
                self.slots[edge].from.push(node_name);
            }
            Role::Target => {
                self.slots[node].from.push(edge_name);
                self.slots[edge].to.push(node_name);
            }
            Role::Endpoint => {
                self.slots[node].from_or_to.push(edge_name);
                self.slots[edge].from_or_to.push(node_name);
                if self.slots[edge].from_or_to.len() > MAX_EDGE_ENDPOINTS {
                    return Err(GraphError::structural(format!(
                        "edge `{}` has more than {MAX_EDGE_ENDPOINTS} from_or_to endpoints",
                        self.slots[edge].name
                    )));
                }
            }
        }
        Ok(())
    }

    fn anonymous_slot(&mut self, kind: SlotKind) -> usize {
        let name = format!("#{}", self.anonymous);
        self.anonymous += 1;
        self.push(Slot::new(name, kind, true))
    }

    fn named_slot(&mut self, name: &str, kind: SlotKind) -> Result<usize, GraphError> {
        validate_name(name)?;
        match self.by_name.get(name).copied() {
            Some(slot) => {
                self.set_kind(slot, kind)?;
                Ok(slot)
            }
            None => Ok(self.push(Slot::new(name.to_string(), kind, false))),
        }
    }

    fn instance_slot(&mut self, instance: Item, name: Option<&str>) -> Result<usize, GraphError> {
        let kind = SlotKind::from(instance.kind());
        let slot = match name {
            Some(name) => self.named_slot(name, kind)?,
            None => {
                let key = match &instance {
                    Item::Node(node) => format!("@{}", node.id()),
                    Item::Edge(edge) => format!("@{}", edge.id()),
                };
                match self.by_name.get(&key).copied() {
                    Some(slot) => slot,
                    None => self.push(Slot::new(key, kind, true)),
                }
            }
        };
        if let Some(existing) = &self.slots[slot].instance {
            if existing != &instance {
                return Err(GraphError::reference_mismatch(format!(
                    "`{}` bound to two different instances",
                    self.slots[slot].name
                )));
            }
        }
        let ty = instance.item_type().clone();
        self.slots[slot].instance = Some(instance);
        self.narrow(slot, &ty)?;
        Ok(slot)
    }

    fn push(&mut self, slot: Slot) -> usize {
        let index = self.slots.len();
        self.by_name.insert(slot.name.clone(), index);
        self.slots.push(slot);
        index
    }

    fn set_kind(&mut self, slot: usize, kind: SlotKind) -> Result<(), GraphError> {
        let current = self.slots[slot].kind;
        match (current, kind) {
            (_, SlotKind::Unknown) => Ok(()),
            (SlotKind::Unknown, resolved) => {
                self.slots[slot].kind = resolved;
                Ok(())
            }
            (current, kind) if current == kind => Ok(()),
            (current, kind) => Err(GraphError::reference_mismatch(format!(
                "`{}` used both as {current:?} and as {kind:?}",
                self.slots[slot].name
            ))),
        }
    }

    fn narrow(&mut self, slot: usize, ty: &ItemType) -> Result<(), GraphError> {
        self.set_kind(slot, SlotKind::from(ty.kind()))?;
        let narrowed = match &self.slots[slot].ty {
            None => ty.clone(),
            Some(existing) => existing.narrowest(ty).ok_or_else(|| {
                GraphError::reference_mismatch(format!(
                    "`{}` constrained to unrelated types {existing} and {ty}",
                    self.slots[slot].name
                ))
            })?,
        };
        self.slots[slot].ty = Some(narrowed);
        Ok(())
    }

    fn exclude(&mut self, slot: usize, ty: &ItemType) -> Result<(), GraphError> {
        self.set_kind(slot, SlotKind::from(ty.kind()))?;
        if !self.slots[slot].excluded.contains(ty) {
            self.slots[slot].excluded.push(ty.clone());
        }
        Ok(())
    }

    fn finish(mut self, input: &QueryInput) -> Result<Slots, GraphError> {
        for (node, other, role) in std::mem::take(&mut self.deferred) {
            self.connect(node, other, role)?;
        }
        if let Some(slot) = self.slots.iter().find(|slot| slot.kind == SlotKind::Unknown) {
            return Err(GraphError::reference_mismatch(format!(
                "reference `{}` is never used as a node or an edge",
                slot.name
            )));
        }
        Ok(Slots::new(self.slots, self.by_name, input.shape()))
    }
}

fn is_edge_item(item: &QueryItem) -> bool {
    matches!(
        item,
        QueryItem::EdgeType(_) | QueryItem::Edge(_) | QueryItem::EdgeFragment(_)
    )
}

fn validate_name(name: &str) -> Result<(), GraphError> {
    if name.trim().is_empty() {
        return Err(GraphError::invalid_input("reference name must be set"));
    }
    if name.starts_with('#') || name.starts_with('@') {
        return Err(GraphError::invalid_input(format!(
            "reference name `{name}` uses a reserved prefix"
        )));
    }
    Ok(())
}
