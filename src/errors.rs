use thiserror::Error;

/// Error type for graph store and query operations.
///
/// Nothing here is retried: every operation is deterministic given the current graph
/// state, so the caller fixes the query or the graph and tries again.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// A named reference used with incompatible kinds or unrelated types.
    #[error("reference mismatch: {0}")]
    ReferenceMismatch(String),
    /// An edge missing an endpoint, or a fragment exceeding its endpoint limit.
    #[error("structural integrity violation: {0}")]
    StructuralIntegrity(String),
    /// Planner or executor bookkeeping went wrong. Always a bug.
    #[error("internal consistency violation: {0}")]
    InternalConsistency(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl GraphError {
    pub fn reference_mismatch<T: Into<String>>(msg: T) -> Self {
        GraphError::ReferenceMismatch(msg.into())
    }

    pub fn structural<T: Into<String>>(msg: T) -> Self {
        GraphError::StructuralIntegrity(msg.into())
    }

    pub fn internal<T: Into<String>>(msg: T) -> Self {
        GraphError::InternalConsistency(msg.into())
    }

    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        GraphError::NotFound(msg.into())
    }

    pub fn invalid_input<T: Into<String>>(msg: T) -> Self {
        GraphError::InvalidInput(msg.into())
    }
}
