//! Lazy match enumeration over a [`Plan`].
//!
//! Each component runs as an explicit frame stack, one frame per step, and components
//! are combined by a second stack so the output is their cartesian product. Reads take
//! a short-lived guard per expansion; nothing is held between pulls.

use std::iter::FusedIterator;
use std::sync::Arc;

use crate::{
    errors::GraphError,
    graph::{EdgeId, Graph, GraphIndex, Item, NodeId},
};

use super::planner::{ComponentPlan, Plan, Relation, Step};
use super::slots::{Role, Slot, Slots};

/// One binding per slot, indexed like [`Slots`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Match {
    bindings: Vec<Option<Item>>,
}

impl Match {
    pub fn get(&self, slot: usize) -> Option<&Item> {
        self.bindings.get(slot).and_then(Option::as_ref)
    }

    pub fn named(&self, slots: &Slots, name: &str) -> Option<&Item> {
        slots.index_of(name).and_then(|slot| self.get(slot))
    }

    pub fn bindings(&self) -> &[Option<Item>] {
        &self.bindings
    }
}

pub fn execute(plan: Arc<Plan>, slots: Arc<Slots>, graph: &Graph) -> Matches {
    Matches::new(plan, slots, graph.clone())
}

/// Finite, single-pass stream of matches.
pub struct Matches {
    graph: Graph,
    plan: Arc<Plan>,
    slots: Arc<Slots>,
    stack: Vec<ComponentSearch>,
    done: bool,
}

impl Matches {
    fn new(plan: Arc<Plan>, slots: Arc<Slots>, graph: Graph) -> Self {
        let mut stack = Vec::with_capacity(plan.components.len());
        if !plan.is_empty() {
            stack.push(ComponentSearch::new(0, vec![None; slots.len()]));
        }
        Self {
            done: stack.is_empty(),
            graph,
            plan,
            slots,
            stack,
        }
    }

    pub fn slots(&self) -> &Arc<Slots> {
        &self.slots
    }

    fn fail(&mut self, err: GraphError) -> Option<Result<Match, GraphError>> {
        self.done = true;
        self.stack.clear();
        Some(Err(err))
    }
}

impl Iterator for Matches {
    type Item = Result<Match, GraphError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.done {
                return None;
            }
            let Some(search) = self.stack.last_mut() else {
                self.done = true;
                return None;
            };
            let Some(component) = self.plan.components.get(search.component) else {
                let err = GraphError::internal(format!("component {} missing", search.component));
                return self.fail(err);
            };
            match search.next(component, &self.graph, &self.slots) {
                Some(Ok(bindings)) => {
                    let depth = self.stack.len();
                    if depth == self.plan.components.len() {
                        return Some(Ok(Match { bindings }));
                    }
                    self.stack.push(ComponentSearch::new(depth, bindings));
                }
                Some(Err(err)) => return self.fail(err),
                None => {
                    self.stack.pop();
                }
            }
        }
    }
}

impl FusedIterator for Matches {}

struct Frame {
    step: usize,
    candidates: Vec<Option<Item>>,
    cursor: usize,
}

/// Backtracking search over one component, seeded with the bindings of the
/// components before it.
struct ComponentSearch {
    component: usize,
    bindings: Vec<Option<Item>>,
    frames: Vec<Frame>,
    started: bool,
}

impl ComponentSearch {
    fn new(component: usize, bindings: Vec<Option<Item>>) -> Self {
        Self {
            component,
            bindings,
            frames: Vec::new(),
            started: false,
        }
    }

    fn next(
        &mut self,
        component: &ComponentPlan,
        graph: &Graph,
        slots: &Slots,
    ) -> Option<Result<Vec<Option<Item>>, GraphError>> {
        let steps = &component.steps;
        if !self.started {
            self.started = true;
            let first = steps.first()?;
            match self.expand(first, graph, slots) {
                Ok(candidates) => self.frames.push(Frame {
                    step: 0,
                    candidates,
                    cursor: 0,
                }),
                Err(err) => return Some(Err(err)),
            }
        }

        loop {
            let frame = self.frames.last_mut()?;
            let step = &steps[frame.step];
            if frame.cursor >= frame.candidates.len() {
                if let Some(slot) = step.binds() {
                    self.bindings[slot] = None;
                }
                self.frames.pop();
                continue;
            }
            let candidate = frame.candidates[frame.cursor].clone();
            frame.cursor += 1;
            let next = frame.step + 1;
            if let (Some(slot), Some(item)) = (step.binds(), candidate) {
                self.bindings[slot] = Some(item);
            }
            let Some(next_step) = steps.get(next) else {
                return Some(Ok(self.bindings.clone()));
            };
            match self.expand(next_step, graph, slots) {
                Ok(candidates) => self.frames.push(Frame {
                    step: next,
                    candidates,
                    cursor: 0,
                }),
                Err(err) => {
                    self.frames.clear();
                    return Some(Err(err));
                }
            }
        }
    }

    /// Candidates for a binding step, or a single `None` when a check step holds.
    fn expand(
        &self,
        step: &Step,
        graph: &Graph,
        slots: &Slots,
    ) -> Result<Vec<Option<Item>>, GraphError> {
        let index = graph.read();
        match step {
            Step::ScanNodes { slot, ty } => {
                let target = slot_at(slots, *slot)?;
                let items: Vec<Item> = match &target.instance {
                    Some(Item::Node(node)) => {
                        index.node(node.id()).cloned().map(Item::Node).into_iter().collect()
                    }
                    Some(Item::Edge(_)) => Vec::new(),
                    None => index
                        .node_ids_of_type(ty.id())
                        .filter_map(|id| index.node(id).cloned())
                        .map(Item::Node)
                        .collect(),
                };
                Ok(accepted(target, items))
            }
            Step::ScanEdges { slot, ty } => {
                let target = slot_at(slots, *slot)?;
                let items: Vec<Item> = match &target.instance {
                    Some(Item::Edge(edge)) => {
                        index.edge(edge.id()).cloned().map(Item::Edge).into_iter().collect()
                    }
                    Some(Item::Node(_)) => Vec::new(),
                    None => index
                        .edge_ids_of_type(ty.id())
                        .filter_map(|id| index.edge(id).cloned())
                        .map(Item::Edge)
                        .collect(),
                };
                Ok(accepted(target, items))
            }
            Step::Traverse { from, to, relation } => {
                let target = slot_at(slots, *to)?;
                let bound = self.bound(*from, slots)?;
                let items = if *from == relation.node {
                    let node = node_id(bound, slots, *from)?;
                    edges_in_role(&index, node, relation.role)
                        .into_iter()
                        .filter_map(|id| index.edge(id).cloned())
                        .map(Item::Edge)
                        .collect()
                } else {
                    let edge = edge_id(bound, slots, *from)?;
                    nodes_in_role(&index, edge, relation.role)
                        .into_iter()
                        .filter_map(|id| index.node(id).cloned())
                        .map(Item::Node)
                        .collect()
                };
                Ok(accepted(target, items))
            }
            Step::EnsureConnection { relation } => {
                let holds = self.connected(&index, relation, slots)?;
                Ok(if holds { vec![None] } else { Vec::new() })
            }
            Step::EnsurePair { edge, a, b } => {
                let edge = edge_id(self.bound(*edge, slots)?, slots, *edge)?;
                let a = node_id(self.bound(*a, slots)?, slots, *a)?;
                let b = node_id(self.bound(*b, slots)?, slots, *b)?;
                let holds = index.ends(edge).is_some_and(|ends| {
                    (ends.from == a && ends.to == b) || (ends.from == b && ends.to == a)
                });
                Ok(if holds { vec![None] } else { Vec::new() })
            }
        }
    }

    fn connected(
        &self,
        index: &GraphIndex,
        relation: &Relation,
        slots: &Slots,
    ) -> Result<bool, GraphError> {
        let node = node_id(self.bound(relation.node, slots)?, slots, relation.node)?;
        let edge = edge_id(self.bound(relation.edge, slots)?, slots, relation.edge)?;
        Ok(index.ends(edge).is_some_and(|ends| match relation.role {
            Role::Source => ends.from == node,
            Role::Target => ends.to == node,
            Role::Endpoint => ends.from == node || ends.to == node,
        }))
    }

    fn bound(&self, slot: usize, slots: &Slots) -> Result<&Item, GraphError> {
        self.bindings
            .get(slot)
            .and_then(Option::as_ref)
            .ok_or_else(|| {
                let name = slots.slot(slot).map_or("?", |s| s.name.as_str());
                GraphError::internal(format!("slot `{name}` used before it was bound"))
            })
    }
}

fn slot_at(slots: &Slots, index: usize) -> Result<&Slot, GraphError> {
    slots
        .slot(index)
        .ok_or_else(|| GraphError::internal(format!("slot {index} out of range")))
}

fn accepted(slot: &Slot, items: Vec<Item>) -> Vec<Option<Item>> {
    items
        .into_iter()
        .filter(|item| slot.accepts(item))
        .map(Some)
        .collect()
}

fn node_id(item: &Item, slots: &Slots, slot: usize) -> Result<NodeId, GraphError> {
    item.as_node().map(|node| node.id()).ok_or_else(|| {
        let name = slots.slot(slot).map_or("?", |s| s.name.as_str());
        GraphError::internal(format!("slot `{name}` expected a node binding"))
    })
}

fn edge_id(item: &Item, slots: &Slots, slot: usize) -> Result<EdgeId, GraphError> {
    item.as_edge().map(|edge| edge.id()).ok_or_else(|| {
        let name = slots.slot(slot).map_or("?", |s| s.name.as_str());
        GraphError::internal(format!("slot `{name}` expected an edge binding"))
    })
}

/// Edges where `node` plays `role`, in ascending id.
fn edges_in_role(index: &GraphIndex, node: NodeId, role: Role) -> Vec<EdgeId> {
    let Some(adjacency) = index.adjacency(node) else {
        return Vec::new();
    };
    match role {
        Role::Source => adjacency.from.iter().copied().collect(),
        Role::Target => adjacency.to.iter().copied().collect(),
        Role::Endpoint => adjacency.from.union(&adjacency.to).copied().collect(),
    }
}

fn nodes_in_role(index: &GraphIndex, edge: EdgeId, role: Role) -> Vec<NodeId> {
    let Some(ends) = index.ends(edge) else {
        return Vec::new();
    };
    match role {
        Role::Source => vec![ends.from],
        Role::Target => vec![ends.to],
        Role::Endpoint if ends.from == ends.to => vec![ends.from],
        Role::Endpoint => vec![ends.from, ends.to],
    }
}
