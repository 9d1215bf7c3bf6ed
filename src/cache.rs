use std::sync::Arc;

use parking_lot::RwLock;

use crate::query::Output;

/// Last computed result set of a cached live query. Readers get a cheap snapshot that
/// stays valid after the cache is replaced.
#[derive(Default)]
pub struct ResultCache {
    inner: RwLock<Option<Arc<Vec<Output>>>>,
}

impl ResultCache {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(None),
        }
    }

    pub fn get(&self) -> Option<Arc<Vec<Output>>> {
        self.inner.read().clone()
    }

    /// Stores `rows` and returns the snapshot it replaced.
    pub fn replace(&self, rows: Arc<Vec<Output>>) -> Option<Arc<Vec<Output>>> {
        self.inner.write().replace(rows)
    }

    pub fn is_populated(&self) -> bool {
        self.inner.read().is_some()
    }

    pub fn clear(&self) {
        self.inner.write().take();
    }
}
