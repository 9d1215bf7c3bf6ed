//! The four consistency-coupled indices behind a [`super::Graph`].
//!
//! Indices hold ids, never handles; the `nodes`/`edges` maps are the only place a
//! handle is stored. All ordered sets iterate in ascending id, which is creation order.

use std::collections::BTreeSet;

use ahash::AHashMap;
use tracing::trace;

use crate::{
    config::GraphConfig,
    errors::GraphError,
    types::TypeId,
};

use super::selector::EdgeSelector;
use super::types::{Edge, EdgeId, Node, NodeId};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct EdgeEnds {
    pub from: NodeId,
    pub to: NodeId,
}

#[derive(Clone, Debug, Default)]
pub(crate) struct Adjacency {
    /// Edges where the node is the source.
    pub from: BTreeSet<EdgeId>,
    /// Edges where the node is the target.
    pub to: BTreeSet<EdgeId>,
}

#[derive(Default)]
pub(crate) struct GraphIndex {
    nodes: AHashMap<NodeId, Node>,
    edges: AHashMap<EdgeId, Edge>,
    nodes_by_type: AHashMap<TypeId, BTreeSet<NodeId>>,
    edges_by_type: AHashMap<TypeId, BTreeSet<EdgeId>>,
    nodes_by_edge: AHashMap<EdgeId, EdgeEnds>,
    edges_by_node: AHashMap<NodeId, Adjacency>,
}

impl GraphIndex {
    pub fn with_config(config: &GraphConfig) -> Self {
        let nodes = config.reserve_node_capacity.unwrap_or(0);
        let edges = config.reserve_edge_capacity.unwrap_or(0);
        Self {
            nodes: AHashMap::with_capacity(nodes),
            edges: AHashMap::with_capacity(edges),
            nodes_by_type: AHashMap::new(),
            edges_by_type: AHashMap::new(),
            nodes_by_edge: AHashMap::with_capacity(edges),
            edges_by_node: AHashMap::with_capacity(nodes),
        }
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(&id)
    }

    pub fn contains_node(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn contains_edge(&self, id: EdgeId) -> bool {
        self.edges.contains_key(&id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn ends(&self, id: EdgeId) -> Option<EdgeEnds> {
        self.nodes_by_edge.get(&id).copied()
    }

    pub fn adjacency(&self, id: NodeId) -> Option<&Adjacency> {
        self.edges_by_node.get(&id)
    }

    pub fn node_ids_of_type(&self, ty: TypeId) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes_by_type
            .get(&ty)
            .into_iter()
            .flat_map(|set| set.iter().copied())
    }

    pub fn edge_ids_of_type(&self, ty: TypeId) -> impl Iterator<Item = EdgeId> + '_ {
        self.edges_by_type
            .get(&ty)
            .into_iter()
            .flat_map(|set| set.iter().copied())
    }

    pub fn nodes_of_type(&self, ty: TypeId) -> Vec<Node> {
        self.node_ids_of_type(ty)
            .filter_map(|id| self.nodes.get(&id).cloned())
            .collect()
    }

    pub fn edges_of_type(&self, ty: TypeId) -> Vec<Edge> {
        self.edge_ids_of_type(ty)
            .filter_map(|id| self.edges.get(&id).cloned())
            .collect()
    }

    /// Returns `false` when the node was already present.
    pub fn insert_node(&mut self, node: &Node) -> bool {
        let id = node.id();
        if self.nodes.contains_key(&id) {
            return false;
        }
        for ty in node.node_type().item_type().ancestors() {
            self.nodes_by_type.entry(*ty).or_default().insert(id);
        }
        self.edges_by_node.entry(id).or_default();
        self.nodes.insert(id, node.clone());
        trace!(node = %id, "indexed node");
        true
    }

    /// Both endpoints must already be indexed.
    pub fn insert_edge(
        &mut self,
        edge: &Edge,
        from: NodeId,
        to: NodeId,
    ) -> Result<bool, GraphError> {
        let id = edge.id();
        if self.edges.contains_key(&id) {
            return Ok(false);
        }
        if !self.nodes.contains_key(&from) || !self.nodes.contains_key(&to) {
            return Err(GraphError::internal(format!(
                "edge {id} endpoints {from}/{to} are not indexed"
            )));
        }
        for ty in edge.edge_type().item_type().ancestors() {
            self.edges_by_type.entry(*ty).or_default().insert(id);
        }
        self.nodes_by_edge.insert(id, EdgeEnds { from, to });
        self.edges_by_node.entry(from).or_default().from.insert(id);
        self.edges_by_node.entry(to).or_default().to.insert(id);
        self.edges.insert(id, edge.clone());
        trace!(edge = %id, from = %from, to = %to, "indexed edge");
        Ok(true)
    }

    pub fn remove_edge(&mut self, id: EdgeId) -> Option<Edge> {
        let edge = self.edges.remove(&id)?;
        for ty in edge.edge_type().item_type().ancestors() {
            remove_from_bucket(&mut self.edges_by_type, *ty, &id);
        }
        if let Some(ends) = self.nodes_by_edge.remove(&id) {
            if let Some(adjacency) = self.edges_by_node.get_mut(&ends.from) {
                adjacency.from.remove(&id);
            }
            if let Some(adjacency) = self.edges_by_node.get_mut(&ends.to) {
                adjacency.to.remove(&id);
            }
        }
        trace!(edge = %id, "unindexed edge");
        Some(edge)
    }

    /// Removes the node and every incident edge. Returned edges are in id order.
    pub fn remove_node(&mut self, id: NodeId) -> Option<(Node, Vec<Edge>)> {
        if !self.nodes.contains_key(&id) {
            return None;
        }
        let incident: BTreeSet<EdgeId> = self
            .edges_by_node
            .get(&id)
            .map(|adjacency| adjacency.from.union(&adjacency.to).copied().collect())
            .unwrap_or_default();
        let edges = incident
            .into_iter()
            .filter_map(|edge| self.remove_edge(edge))
            .collect();
        let node = self.nodes.remove(&id)?;
        for ty in node.node_type().item_type().ancestors() {
            remove_from_bucket(&mut self.nodes_by_type, *ty, &id);
        }
        self.edges_by_node.remove(&id);
        trace!(node = %id, "unindexed node");
        Some((node, edges))
    }

    /// Resolves a selector against the adjacency index without scanning all edges.
    pub fn select_edges(&self, selector: &EdgeSelector) -> Result<BTreeSet<EdgeId>, GraphError> {
        selector.validate()?;
        let empty = Adjacency::default();
        let adjacency = |node: &Node| self.edges_by_node.get(&node.id()).unwrap_or(&empty);

        let candidates: BTreeSet<EdgeId> = match (&selector.from, &selector.to) {
            (Some(from), Some(to)) => adjacency(from)
                .from
                .intersection(&adjacency(to).to)
                .copied()
                .collect(),
            (Some(from), None) => adjacency(from).from.clone(),
            (None, Some(to)) => adjacency(to).to.clone(),
            (None, None) => match selector.from_or_to.as_slice() {
                [one] => {
                    let adj = adjacency(one);
                    adj.from.union(&adj.to).copied().collect()
                }
                [a, b] => {
                    let (a, b) = (adjacency(a), adjacency(b));
                    let forward: BTreeSet<EdgeId> = a.from.intersection(&b.to).copied().collect();
                    let backward: BTreeSet<EdgeId> = b.from.intersection(&a.to).copied().collect();
                    forward.union(&backward).copied().collect()
                }
                _ => BTreeSet::new(),
            },
        };

        Ok(match &selector.edge_type {
            None => candidates,
            Some(ty) => candidates
                .into_iter()
                .filter(|id| {
                    self.edges
                        .get(id)
                        .is_some_and(|edge| edge.edge_type().is_a(ty))
                })
                .collect(),
        })
    }
}

fn remove_from_bucket<T: Ord>(buckets: &mut AHashMap<TypeId, BTreeSet<T>>, ty: TypeId, id: &T) {
    if let Some(bucket) = buckets.get_mut(&ty) {
        bucket.remove(id);
        if bucket.is_empty() {
            buckets.remove(&ty);
        }
    }
}
