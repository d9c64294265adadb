//! Post-commit cache invalidation.

use crate::model::ResourceType;
use crate::observability::{CacheMetrics, NoOpMetrics};
use crate::store::TagStore;
use std::sync::Arc;

/// Invalidates cached listings after catalog mutations.
///
/// Call [`after_mutation`] only once the mutation is durable. Invalidating
/// before the write commits re-opens the window where a concurrent read
/// repopulates the cache with pre-commit data; the store's epoch fencing
/// protects loads that straddle the sweep, not sweeps that run early.
///
/// [`after_mutation`]: MutationInvalidator::after_mutation
#[derive(Clone)]
pub struct MutationInvalidator {
    store: Arc<TagStore>,
    metrics: Arc<dyn CacheMetrics>,
}

impl MutationInvalidator {
    pub fn new(store: Arc<TagStore>) -> Self {
        MutationInvalidator {
            store,
            metrics: Arc::new(NoOpMetrics),
        }
    }

    /// Set a custom metrics handler.
    pub fn with_metrics(mut self, metrics: Arc<dyn CacheMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Drop every cached listing of `resource`, synchronously. Returns the
    /// number of entries removed.
    ///
    /// The sweep is scoped to the resource's own tag: a book mutation leaves
    /// authors listings untouched and vice versa.
    pub fn after_mutation(&self, resource: ResourceType) -> usize {
        let tag = resource.tag();
        let removed = self.store.invalidate_tags(std::slice::from_ref(&tag));
        self.metrics.record_invalidation(&tag, removed);
        info!("✓ Swept {} cached listings for tag {}", removed, tag);
        removed
    }
}
