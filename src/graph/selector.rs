use crate::{errors::GraphError, types::EdgeType};

use super::types::Node;

/// Picks edges by endpoint for [`super::Graph::remove_edges_by_nodes`].
///
/// Three shapes are accepted:
/// - exact: `from` and `to` both set;
/// - one-sided: exactly one of `from`/`to` set;
/// - symmetric: one or two `from_or_to` nodes, matching either role.
///
/// Any shape may be narrowed by `edge_type`, which matches subtypes as well.
#[derive(Clone, Debug, Default)]
pub struct EdgeSelector {
    pub from: Option<Node>,
    pub to: Option<Node>,
    pub from_or_to: Vec<Node>,
    pub edge_type: Option<EdgeType>,
}

impl EdgeSelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Edges with `from` as source and `to` as target.
    pub fn exact(from: &Node, to: &Node) -> Self {
        Self::new().from(from).to(to)
    }

    /// Edges touching `node` in either role.
    pub fn touching(node: &Node) -> Self {
        Self::new().from_or_to(node)
    }

    /// Edges joining `a` and `b` in either orientation.
    pub fn between(a: &Node, b: &Node) -> Self {
        Self::new().from_or_to(a).from_or_to(b)
    }

    pub fn from(mut self, node: &Node) -> Self {
        self.from = Some(node.clone());
        self
    }

    pub fn to(mut self, node: &Node) -> Self {
        self.to = Some(node.clone());
        self
    }

    pub fn from_or_to(mut self, node: &Node) -> Self {
        self.from_or_to.push(node.clone());
        self
    }

    pub fn of_type(mut self, ty: &EdgeType) -> Self {
        self.edge_type = Some(ty.clone());
        self
    }

    pub fn validate(&self) -> Result<(), GraphError> {
        let directed = self.from.is_some() || self.to.is_some();
        if directed && !self.from_or_to.is_empty() {
            return Err(GraphError::invalid_input(
                "edge selector mixes from/to with from_or_to",
            ));
        }
        if !directed && self.from_or_to.is_empty() {
            return Err(GraphError::invalid_input("edge selector names no node"));
        }
        if self.from_or_to.len() > 2 {
            return Err(GraphError::invalid_input(
                "edge selector accepts at most two from_or_to nodes",
            ));
        }
        Ok(())
    }
}
