//! Turns [`Slots`] into an ordered list of steps per connected component.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::{errors::GraphError, types::ItemType};

use super::disjoint::DisjointSet;
use super::slots::{Role, SlotKind, Slots};

/// `node` plays `role` on `edge`. Both are slot indices.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Relation {
    pub node: usize,
    pub edge: usize,
    pub role: Role,
}

impl Relation {
    pub fn involves(&self, slot: usize) -> bool {
        self.node == slot || self.edge == slot
    }

    pub fn other(&self, slot: usize) -> usize {
        if self.node == slot { self.edge } else { self.node }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Step {
    ScanNodes { slot: usize, ty: ItemType },
    ScanEdges { slot: usize, ty: ItemType },
    /// Binds `to` from the already bound `from` along `relation`.
    Traverse { from: usize, to: usize, relation: Relation },
    /// Both ends already bound; checks `relation` holds.
    EnsureConnection { relation: Relation },
    /// `edge` joins exactly `a` and `b`, in either orientation.
    EnsurePair { edge: usize, a: usize, b: usize },
}

impl Step {
    /// Slot bound by this step, if any.
    pub fn binds(&self) -> Option<usize> {
        match self {
            Step::ScanNodes { slot, .. } | Step::ScanEdges { slot, .. } => Some(*slot),
            Step::Traverse { to, .. } => Some(*to),
            Step::EnsureConnection { .. } | Step::EnsurePair { .. } => None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ComponentPlan {
    /// Member slots in ascending index order.
    pub slots: Vec<usize>,
    pub steps: Vec<Step>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Plan {
    pub components: Vec<ComponentPlan>,
}

impl Plan {
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn step_count(&self) -> usize {
        self.components.iter().map(|c| c.steps.len()).sum()
    }
}

/// Every `(node, edge, role)` link, read off the edge slots in slot order.
pub fn relations(slots: &Slots) -> Result<Vec<Relation>, GraphError> {
    let mut relations = Vec::new();
    for (edge, slot) in slots.iter().enumerate() {
        if slot.kind != SlotKind::Edge {
            continue;
        }
        let linked = [
            (&slot.from, Role::Source),
            (&slot.to, Role::Target),
            (&slot.from_or_to, Role::Endpoint),
        ];
        for (names, role) in linked {
            for name in names {
                let node = slots.index_of(name).ok_or_else(|| {
                    GraphError::internal(format!(
                        "edge slot `{}` links unknown `{name}`",
                        slot.name
                    ))
                })?;
                let relation = Relation { node, edge, role };
                if !relations.contains(&relation) {
                    relations.push(relation);
                }
            }
        }
    }
    Ok(relations)
}

pub fn plan(slots: &Slots) -> Result<Plan, GraphError> {
    let relations = relations(slots)?;
    let mut components = DisjointSet::new(slots.len());
    for relation in &relations {
        components.union(relation.node, relation.edge);
    }

    let mut plan = Plan::default();
    for members in components.groups() {
        plan.components.push(plan_component(slots, &relations, members)?);
    }
    Ok(plan)
}

fn plan_component(
    slots: &Slots,
    relations: &[Relation],
    members: Vec<usize>,
) -> Result<ComponentPlan, GraphError> {
    // Placeholder origin policy: the first slot in parse order.
    let Some(&origin) = members.first() else {
        return Err(GraphError::internal("empty query component"));
    };
    let origin_slot = slots
        .slot(origin)
        .ok_or_else(|| GraphError::internal(format!("slot {origin} out of range")))?;
    let ty = origin_slot
        .scan_type()
        .ok_or_else(|| GraphError::internal(format!("slot `{}` has no kind", origin_slot.name)))?;

    let mut steps = vec![match origin_slot.kind {
        SlotKind::Node => Step::ScanNodes { slot: origin, ty },
        _ => Step::ScanEdges { slot: origin, ty },
    }];

    let local: Vec<(usize, &Relation)> = relations
        .iter()
        .enumerate()
        .filter(|(_, relation)| members.binary_search(&relation.node).is_ok())
        .collect();
    let mut checked = vec![false; relations.len()];
    let mut bound = vec![false; slots.len()];
    bound[origin] = true;

    let mut queue = VecDeque::from([origin]);
    while let Some(current) = queue.pop_front() {
        for (index, relation) in &local {
            if checked[*index] || !relation.involves(current) {
                continue;
            }
            checked[*index] = true;
            let other = relation.other(current);
            if bound[other] {
                steps.push(Step::EnsureConnection {
                    relation: **relation,
                });
            } else {
                bound[other] = true;
                steps.push(Step::Traverse {
                    from: current,
                    to: other,
                    relation: **relation,
                });
                queue.push_back(other);
            }
        }
    }

    if let Some(unbound) = members.iter().find(|slot| !bound[**slot]) {
        return Err(GraphError::internal(format!(
            "slot {unbound} unreachable from component origin {origin}"
        )));
    }

    for &edge in &members {
        let Some(slot) = slots.slot(edge) else { continue };
        if slot.kind != SlotKind::Edge {
            continue;
        }
        if let [a, b] = slot.from_or_to.as_slice() {
            let a = slots
                .index_of(a)
                .ok_or_else(|| GraphError::internal(format!("unknown endpoint `{a}`")))?;
            let b = slots
                .index_of(b)
                .ok_or_else(|| GraphError::internal(format!("unknown endpoint `{b}`")))?;
            steps.push(Step::EnsurePair { edge, a, b });
        }
    }

    Ok(ComponentPlan {
        slots: members,
        steps,
    })
}
