//! Builder for wiring a [`CatalogService`] together.

use crate::invalidator::MutationInvalidator;
use crate::listing::ListingCache;
use crate::observability::{CacheMetrics, NoOpMetrics, TtlPolicy};
use crate::repository::CatalogRepository;
use crate::serialization::{JsonSerializer, RecordSerializer};
use crate::service::CatalogService;
use crate::store::TagStore;
use crate::version::{ApiVersion, ResponseVersioner};
use std::sync::Arc;
use std::time::Duration;

/// Fluent builder for a [`CatalogService`].
///
/// Every knob has a working default: an in-process [`TagStore`], JSON
/// serialization, no-op metrics, no expiry, no load timeout, and API version
/// 1.0 for requests that declare none. The listing cache and the mutation
/// invalidator always share one store, so sweeps reach the listings they are
/// meant for.
///
/// # Example
///
/// ```ignore
/// use catalog_cache::{CatalogService, InMemoryCatalog, TtlPolicy};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// let service = CatalogService::builder(Arc::new(InMemoryCatalog::with_fixtures()))
///     .with_ttl_policy(TtlPolicy::Fixed(Duration::from_secs(300)))
///     .with_load_timeout(Duration::from_secs(2))
///     .build();
/// ```
pub struct CatalogServiceBuilder<R: CatalogRepository> {
    repository: Arc<R>,
    store: Option<Arc<TagStore>>,
    serializer: Arc<dyn RecordSerializer>,
    metrics: Arc<dyn CacheMetrics>,
    ttl_policy: TtlPolicy,
    load_timeout: Option<Duration>,
    default_version: ApiVersion,
}

impl<R: CatalogRepository> CatalogServiceBuilder<R> {
    /// Create a builder with default settings.
    pub fn new(repository: Arc<R>) -> Self {
        CatalogServiceBuilder {
            repository,
            store: None,
            serializer: Arc::new(JsonSerializer),
            metrics: Arc::new(NoOpMetrics),
            ttl_policy: TtlPolicy::default(),
            load_timeout: None,
            default_version: ApiVersion::DEFAULT,
        }
    }

    /// Use an existing store instead of a fresh one. Lets several services
    /// share one cache.
    pub fn with_store(mut self, store: Arc<TagStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Replace the payload serializer for listings and details.
    pub fn with_serializer(mut self, serializer: Arc<dyn RecordSerializer>) -> Self {
        self.serializer = serializer;
        self
    }

    /// Record cache activity through `metrics`.
    pub fn with_metrics(mut self, metrics: Arc<dyn CacheMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Set the entry lifetime policy.
    ///
    /// # Example
    ///
    /// ```ignore
    /// builder.with_ttl_policy(TtlPolicy::Fixed(Duration::from_secs(300)))
    /// ```
    pub fn with_ttl_policy(mut self, policy: TtlPolicy) -> Self {
        self.ttl_policy = policy;
        self
    }

    /// Bound the time a cache miss may spend loading and serializing.
    pub fn with_load_timeout(mut self, timeout: Duration) -> Self {
        self.load_timeout = Some(timeout);
        self
    }

    /// API version assumed when a request declares none.
    pub fn with_default_version(mut self, version: ApiVersion) -> Self {
        self.default_version = version;
        self
    }

    /// Assemble the service.
    pub fn build(self) -> CatalogService<R> {
        let store = self.store.unwrap_or_else(|| Arc::new(TagStore::new()));

        let mut listings = ListingCache::new(Arc::clone(&store), Arc::clone(&self.repository))
            .with_serializer(Arc::clone(&self.serializer))
            .with_metrics(Arc::clone(&self.metrics))
            .with_ttl_policy(self.ttl_policy);
        if let Some(timeout) = self.load_timeout {
            listings = listings.with_load_timeout(timeout);
        }

        let invalidator = MutationInvalidator::new(store).with_metrics(self.metrics);

        CatalogService::from_parts(
            self.repository,
            listings,
            invalidator,
            ResponseVersioner::new(self.default_version),
            self.serializer,
        )
    }
}
