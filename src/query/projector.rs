//! Shapes matches into the caller's input layout and drops repeated results.

use std::collections::BTreeMap;
use std::fmt;

use ahash::AHashSet;

use crate::{
    errors::GraphError,
    graph::{Edge, Item, Node},
    pattern::QueryShape,
    types::ItemKind,
};

use super::executor::{Match, Matches};
use super::slots::{OutputPosition, Slots};

/// A projected result, mirroring the query input's shape.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Output {
    Single(Item),
    List(Vec<Item>),
    Map(BTreeMap<String, Item>),
}

impl Output {
    pub fn as_single(&self) -> Option<&Item> {
        match self {
            Output::Single(item) => Some(item),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Item]> {
        match self {
            Output::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Item>> {
        match self {
            Output::Map(entries) => Some(entries),
            _ => None,
        }
    }

    /// Shorthand for a single node result.
    pub fn node(&self) -> Option<&Node> {
        self.as_single().and_then(Item::as_node)
    }

    pub fn edge(&self) -> Option<&Edge> {
        self.as_single().and_then(Item::as_edge)
    }

    pub fn key(&self) -> ResultKey {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"livegraph.result.v1");
        match self {
            Output::Single(item) => {
                hasher.update(&[0]);
                hash_item(&mut hasher, item);
            }
            Output::List(items) => {
                hasher.update(&[1]);
                hasher.update(&(items.len() as u64).to_le_bytes());
                for (position, item) in items.iter().enumerate() {
                    hasher.update(&(position as u64).to_le_bytes());
                    hash_item(&mut hasher, item);
                }
            }
            Output::Map(entries) => {
                hasher.update(&[2]);
                hasher.update(&(entries.len() as u64).to_le_bytes());
                for (key, item) in entries {
                    hasher.update(&(key.len() as u64).to_le_bytes());
                    hasher.update(key.as_bytes());
                    hash_item(&mut hasher, item);
                }
            }
        }
        ResultKey(*hasher.finalize().as_bytes())
    }
}

fn hash_item(hasher: &mut blake3::Hasher, item: &Item) {
    let kind = match item.kind() {
        ItemKind::Node => 0u8,
        ItemKind::Edge => 1u8,
    };
    hasher.update(&[kind]);
    hasher.update(&item.raw_id().to_le_bytes());
}

/// Content identity of an [`Output`]: equal keys mean the same shape bound to the same
/// items.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResultKey([u8; 32]);

impl ResultKey {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for ResultKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResultKey(")?;
        for byte in &self.0[..8] {
            write!(f, "{byte:02x}")?;
        }
        write!(f, ")")
    }
}

pub fn project(matched: &Match, slots: &Slots) -> Result<Output, GraphError> {
    let mut root = None;
    let mut list: Vec<Option<Item>> = match slots.shape() {
        QueryShape::List(len) => vec![None; *len],
        _ => Vec::new(),
    };
    let mut map = BTreeMap::new();

    for (index, slot) in slots.iter().enumerate() {
        if slot.outputs.is_empty() {
            continue;
        }
        let value = matched.get(index).ok_or_else(|| {
            GraphError::internal(format!("output slot `{}` left unbound", slot.name))
        })?;
        for position in &slot.outputs {
            match position {
                OutputPosition::Root => root = Some(value.clone()),
                OutputPosition::Index(i) => {
                    let entry = list.get_mut(*i).ok_or_else(|| {
                        GraphError::internal(format!("output index {i} out of range"))
                    })?;
                    *entry = Some(value.clone());
                }
                OutputPosition::Key(key) => {
                    map.insert(key.clone(), value.clone());
                }
            }
        }
    }

    match slots.shape() {
        QueryShape::Single => root
            .map(Output::Single)
            .ok_or_else(|| GraphError::internal("root output position left empty")),
        QueryShape::List(_) => list
            .into_iter()
            .enumerate()
            .map(|(i, item)| {
                item.ok_or_else(|| GraphError::internal(format!("output index {i} left empty")))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Output::List),
        QueryShape::Map(keys) => {
            if let Some(missing) = keys.iter().find(|key| !map.contains_key(*key)) {
                return Err(GraphError::internal(format!(
                    "output key `{missing}` left empty"
                )));
            }
            Ok(Output::Map(map))
        }
    }
}

/// Projected, deduplicated stream over one execution.
pub struct ResultStream {
    matches: Matches,
    seen: AHashSet<ResultKey>,
    done: bool,
}

impl ResultStream {
    pub fn new(matches: Matches) -> Self {
        Self {
            matches,
            seen: AHashSet::new(),
            done: false,
        }
    }
}

impl Iterator for ResultStream {
    type Item = Result<Output, GraphError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            let matched = match self.matches.next()? {
                Ok(matched) => matched,
                Err(err) => {
                    self.done = true;
                    return Some(Err(err));
                }
            };
            let output = match project(&matched, self.matches.slots()) {
                Ok(output) => output,
                Err(err) => {
                    self.done = true;
                    return Some(Err(err));
                }
            };
            if self.seen.insert(output.key()) {
                return Some(Ok(output));
            }
        }
    }
}

impl std::iter::FusedIterator for ResultStream {}
