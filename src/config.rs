//! Configuration for graph stores and live queries.
//!
//! Both structures are plain data with `Default` implementations and serde derives, so a
//! host application can embed them in its own configuration file.

use serde::{Deserialize, Serialize};

/// Store construction options.
///
/// # Default Configuration
///
/// ```rust
/// use livegraph::GraphConfig;
/// let config = GraphConfig::default();
/// assert!(config.reserve_node_capacity.is_none());
/// assert!(config.reserve_edge_capacity.is_none());
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphConfig {
    /// Optional capacity pre-allocation for nodes
    ///
    /// **Default:** `None`
    ///
    /// A hint about the expected number of nodes. The store grows beyond it as needed.
    pub reserve_node_capacity: Option<usize>,

    /// Optional capacity pre-allocation for edges
    ///
    /// **Default:** `None`
    pub reserve_edge_capacity: Option<usize>,
}

impl GraphConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_node_capacity(mut self, capacity: usize) -> Self {
        self.reserve_node_capacity = Some(capacity);
        self
    }

    pub fn with_edge_capacity(mut self, capacity: usize) -> Self {
        self.reserve_edge_capacity = Some(capacity);
        self
    }
}

/// Options for [`crate::LiveQuery`].
///
/// ```rust
/// use livegraph::QueryOptions;
/// assert!(!QueryOptions::default().cache);
/// assert!(QueryOptions::cached().cache);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryOptions {
    /// Execute eagerly, subscribe to the store and serve `run()` from the cached
    /// result set.
    ///
    /// **Default:** `false`, every `run()` re-executes lazily.
    pub cache: bool,
}

impl QueryOptions {
    pub fn cached() -> Self {
        Self { cache: true }
    }

    pub fn uncached() -> Self {
        Self { cache: false }
    }
}
