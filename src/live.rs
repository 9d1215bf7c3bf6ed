//! Live queries: a compiled query bound to one store, optionally cached and kept fresh
//! by a store subscription.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tracing::{debug, error};

use crate::{
    cache::ResultCache,
    config::QueryOptions,
    errors::GraphError,
    graph::{Graph, GraphEvent, SubscriptionId},
    query::{CompiledQuery, Output, QueryInput, ResultStream, Slots},
};

/// Called with the fresh result set after every successful recompute.
pub(crate) type RecomputeHook = Arc<dyn Fn(&[Output]) + Send + Sync>;

struct LiveShared {
    compiled: CompiledQuery,
    cache: ResultCache,
    hook: Option<RecomputeHook>,
    active: AtomicBool,
}

impl LiveShared {
    fn on_event(&self, graph: &Graph, event: &GraphEvent) {
        if !self.active.load(Ordering::Acquire) || !self.compiled.is_relevant(event.item()) {
            return;
        }
        match self.compiled.collect(graph) {
            Ok(rows) => {
                debug!(graph = graph.id(), rows = rows.len(), "recomputed live query");
                let rows = Arc::new(rows);
                self.cache.replace(Arc::clone(&rows));
                if let Some(hook) = &self.hook {
                    hook(rows.as_slice());
                }
            }
            Err(err) => {
                error!(
                    graph = graph.id(),
                    error = %err,
                    "live query recompute failed, keeping previous results"
                );
            }
        }
    }
}

/// A query bound to a [`Graph`].
///
/// Without caching, every [`LiveQuery::run`] re-executes lazily. With
/// [`QueryOptions::cached`], the query executes once on construction, subscribes to the
/// store and recomputes its cached result set on every relevant change.
pub struct LiveQuery {
    graph: Graph,
    shared: Arc<LiveShared>,
    options: QueryOptions,
    subscription: Mutex<Option<SubscriptionId>>,
}

impl LiveQuery {
    pub fn new<I: Into<QueryInput>>(
        graph: &Graph,
        input: I,
        options: QueryOptions,
    ) -> Result<Self, GraphError> {
        Self::build(graph, &input.into(), options, None)
    }

    pub(crate) fn with_recompute_hook(
        graph: &Graph,
        input: &QueryInput,
        hook: RecomputeHook,
    ) -> Result<Self, GraphError> {
        Self::build(graph, input, QueryOptions::cached(), Some(hook))
    }

    fn build(
        graph: &Graph,
        input: &QueryInput,
        options: QueryOptions,
        hook: Option<RecomputeHook>,
    ) -> Result<Self, GraphError> {
        let shared = Arc::new(LiveShared {
            compiled: CompiledQuery::compile(input)?,
            cache: ResultCache::new(),
            hook,
            active: AtomicBool::new(true),
        });

        let mut subscription = None;
        if options.cache {
            let rows = shared.compiled.collect(graph)?;
            shared.cache.replace(Arc::new(rows));
            let weak = Arc::downgrade(&shared);
            subscription = Some(graph.subscribe(move |graph, event| {
                if let Some(shared) = weak.upgrade() {
                    shared.on_event(graph, event);
                }
            }));
            debug!(graph = graph.id(), "subscribed cached live query");
        }

        Ok(Self {
            graph: graph.clone(),
            shared,
            options,
            subscription: Mutex::new(subscription),
        })
    }

    /// Current results. Served from the cache when one is held, otherwise a fresh lazy
    /// execution.
    pub fn run(&self) -> QueryRows {
        match self.shared.cache.get() {
            Some(rows) => QueryRows {
                inner: RowsInner::Cached { rows, cursor: 0 },
            },
            None => QueryRows {
                inner: RowsInner::Live(self.shared.compiled.results(&self.graph)),
            },
        }
    }

    pub fn collect(&self) -> Result<Vec<Output>, GraphError> {
        self.run().collect()
    }

    /// The cached result set, if this query holds one.
    pub fn snapshot(&self) -> Option<Arc<Vec<Output>>> {
        self.shared.cache.get()
    }

    pub fn is_cached(&self) -> bool {
        self.options.cache
    }

    pub fn is_destroyed(&self) -> bool {
        !self.shared.active.load(Ordering::Acquire)
    }

    pub fn slots(&self) -> &Slots {
        self.shared.compiled.slots()
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Unsubscribes and drops the cache. Later `run()` calls execute uncached.
    pub fn destroy(&self) {
        self.shared.active.store(false, Ordering::Release);
        if let Some(id) = self.subscription.lock().take() {
            self.graph.unsubscribe(id);
            debug!(graph = self.graph.id(), "unsubscribed live query");
        }
        self.shared.cache.clear();
    }
}

impl Drop for LiveQuery {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl fmt::Debug for LiveQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveQuery")
            .field("graph", &self.graph.id())
            .field("cache", &self.options.cache)
            .field("slots", &self.slots().len())
            .finish()
    }
}

/// Result rows of one [`LiveQuery::run`].
pub struct QueryRows {
    inner: RowsInner,
}

enum RowsInner {
    Live(ResultStream),
    Cached { rows: Arc<Vec<Output>>, cursor: usize },
}

impl QueryRows {
    /// `true` when rows come from a cached snapshot.
    pub fn is_cached(&self) -> bool {
        matches!(self.inner, RowsInner::Cached { .. })
    }
}

impl Iterator for QueryRows {
    type Item = Result<Output, GraphError>;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.inner {
            RowsInner::Live(stream) => stream.next(),
            RowsInner::Cached { rows, cursor } => {
                let row = rows.get(*cursor)?.clone();
                *cursor += 1;
                Some(Ok(row))
            }
        }
    }
}
