//! Query pipeline: parse, plan, execute, project.

pub mod disjoint;
pub mod executor;
pub mod parser;
pub mod planner;
pub mod projector;
pub mod slots;

use std::sync::Arc;

use tracing::debug;

use crate::{errors::GraphError, graph::Graph, graph::Item};

pub use crate::pattern::{QueryInput, QueryItem, QueryShape};
pub use executor::{Match, Matches};
pub use planner::{Plan, Step};
pub use projector::{Output, ResultKey, ResultStream};
pub use slots::{OutputPosition, Role, Slot, SlotKind, Slots};

/// Parsed and planned query, reusable across executions.
#[derive(Clone, Debug)]
pub struct CompiledQuery {
    slots: Arc<Slots>,
    plan: Arc<Plan>,
}

impl CompiledQuery {
    pub fn compile(input: &QueryInput) -> Result<Self, GraphError> {
        let slots = parser::parse(input)?;
        debug!(
            slots = slots.len(),
            nodes = slots.nodes().count(),
            edges = slots.edges().count(),
            "parsed query"
        );
        let plan = planner::plan(&slots)?;
        debug!(
            components = plan.components.len(),
            steps = plan.step_count(),
            "planned query"
        );
        Ok(Self {
            slots: Arc::new(slots),
            plan: Arc::new(plan),
        })
    }

    pub fn slots(&self) -> &Arc<Slots> {
        &self.slots
    }

    pub fn plan(&self) -> &Arc<Plan> {
        &self.plan
    }

    /// Raw matches, before projection and deduplication.
    pub fn execute(&self, graph: &Graph) -> Matches {
        executor::execute(Arc::clone(&self.plan), Arc::clone(&self.slots), graph)
    }

    pub fn results(&self, graph: &Graph) -> ResultStream {
        ResultStream::new(self.execute(graph))
    }

    /// Runs to completion, stopping at the first error.
    pub fn collect(&self, graph: &Graph) -> Result<Vec<Output>, GraphError> {
        self.results(graph).collect()
    }

    pub fn is_relevant(&self, item: &Item) -> bool {
        self.slots.is_relevant(item)
    }
}
