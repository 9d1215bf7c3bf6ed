//! Change feeds over a cached live query.
//!
//! An [`Observer`] keeps the previous result set keyed by [`ResultKey`]. Every recompute
//! is diffed against it, and the differences are both queued for polling and pushed to
//! listeners. Listeners run after internal state is updated and with no internal lock
//! held, so they may poll the observer or mutate the store.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use ahash::AHashSet;
use parking_lot::Mutex;
use tracing::debug;

use crate::{
    errors::GraphError,
    graph::Graph,
    live::{LiveQuery, RecomputeHook},
    query::{Output, QueryInput, ResultKey, Slots},
};

pub type Listener = Arc<dyn Fn(&[Output]) + Send + Sync>;

#[derive(Default)]
struct ObserverState {
    retained: Vec<(ResultKey, Output)>,
    added: VecDeque<Output>,
    removed: VecDeque<Output>,
}

#[derive(Default)]
struct ObserverShared {
    state: Mutex<ObserverState>,
    on_added: Mutex<Vec<Listener>>,
    on_removed: Mutex<Vec<Listener>>,
    destroyed: AtomicBool,
}

impl ObserverShared {
    fn seed(&self, rows: &[Output]) {
        let mut state = self.state.lock();
        state.retained = rows.iter().map(|row| (row.key(), row.clone())).collect();
        state.added.extend(rows.iter().cloned());
    }

    fn apply(&self, rows: &[Output]) {
        if self.destroyed.load(Ordering::Acquire) {
            return;
        }
        let keyed: Vec<(ResultKey, Output)> =
            rows.iter().map(|row| (row.key(), row.clone())).collect();

        let (added, removed) = {
            let mut state = self.state.lock();
            let previous: AHashSet<ResultKey> =
                state.retained.iter().map(|(key, _)| *key).collect();
            let current: AHashSet<ResultKey> = keyed.iter().map(|(key, _)| *key).collect();
            let added: Vec<Output> = keyed
                .iter()
                .filter(|(key, _)| !previous.contains(key))
                .map(|(_, row)| row.clone())
                .collect();
            let removed: Vec<Output> = state
                .retained
                .iter()
                .filter(|(key, _)| !current.contains(key))
                .map(|(_, row)| row.clone())
                .collect();
            state.retained = keyed;
            state.added.extend(added.iter().cloned());
            state.removed.extend(removed.iter().cloned());
            (added, removed)
        };

        if added.is_empty() && removed.is_empty() {
            return;
        }
        debug!(added = added.len(), removed = removed.len(), "observer diff");
        if !removed.is_empty() {
            let listeners = self.on_removed.lock().clone();
            for listener in listeners {
                listener(removed.as_slice());
            }
        }
        if !added.is_empty() {
            let listeners = self.on_added.lock().clone();
            for listener in listeners {
                listener(added.as_slice());
            }
        }
    }
}

/// Incremental view over a query's results.
pub struct Observer {
    live: LiveQuery,
    shared: Arc<ObserverShared>,
}

impl Observer {
    /// Executes the query and queues the initial results as added. Listeners
    /// registered afterwards only see later changes.
    pub fn new<I: Into<QueryInput>>(graph: &Graph, input: I) -> Result<Self, GraphError> {
        let shared = Arc::new(ObserverShared::default());
        let weak = Arc::downgrade(&shared);
        let hook: RecomputeHook = Arc::new(move |rows: &[Output]| {
            if let Some(shared) = weak.upgrade() {
                shared.apply(rows);
            }
        });
        let live = LiveQuery::with_recompute_hook(graph, &input.into(), hook)?;
        if let Some(rows) = live.snapshot() {
            shared.seed(&rows);
        }
        Ok(Self { live, shared })
    }

    /// Drains results added since the last call.
    pub fn added(&self) -> Vec<Output> {
        self.shared.state.lock().added.drain(..).collect()
    }

    /// Drains results removed since the last call.
    pub fn removed(&self) -> Vec<Output> {
        self.shared.state.lock().removed.drain(..).collect()
    }

    pub fn on_added<F>(&self, listener: F)
    where
        F: Fn(&[Output]) + Send + Sync + 'static,
    {
        self.shared.on_added.lock().push(Arc::new(listener));
    }

    pub fn on_removed<F>(&self, listener: F)
    where
        F: Fn(&[Output]) + Send + Sync + 'static,
    {
        self.shared.on_removed.lock().push(Arc::new(listener));
    }

    /// The retained result set, in result order.
    pub fn results(&self) -> Vec<Output> {
        self.shared
            .state
            .lock()
            .retained
            .iter()
            .map(|(_, row)| row.clone())
            .collect()
    }

    pub fn slots(&self) -> &Slots {
        self.live.slots()
    }

    pub fn is_destroyed(&self) -> bool {
        self.shared.destroyed.load(Ordering::Acquire)
    }

    /// Unsubscribes and clears queues, listeners and retained results.
    pub fn destroy(&self) {
        self.shared.destroyed.store(true, Ordering::Release);
        self.live.destroy();
        *self.shared.state.lock() = ObserverState::default();
        self.shared.on_added.lock().clear();
        self.shared.on_removed.lock().clear();
    }
}

impl fmt::Debug for Observer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("Observer")
            .field("retained", &state.retained.len())
            .field("pending_added", &state.added.len())
            .field("pending_removed", &state.removed.len())
            .finish()
    }
}
