//! Read-through cache of serialized listing pages.

use crate::error::{Error, Result};
use crate::key::{ListingKey, PageRequest};
use crate::model::ResourceType;
use crate::observability::{CacheMetrics, NoOpMetrics, TtlPolicy};
use crate::repository::CatalogRepository;
use crate::serialization::{JsonSerializer, RecordSerializer, View};
use crate::store::{CacheOutcome, TagStore};
use bytes::Bytes;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Read-through cache of serialized listing pages.
///
/// On a miss the repository page is loaded, serialized under the resource's
/// view and stored tagged with the resource's cache tag. Concurrent callers
/// for the same key collapse into one load ([`TagStore`] single-flight), and
/// a configured load timeout bounds the whole load-and-serialize step so
/// every caller of the flight shares the same timeout outcome.
///
/// # Example
///
/// ```ignore
/// use catalog_cache::{InMemoryCatalog, ListingCache, PageRequest, ResourceType, TagStore};
/// use std::sync::Arc;
///
/// let store = Arc::new(TagStore::new());
/// let repository = Arc::new(InMemoryCatalog::with_fixtures());
/// let listings = ListingCache::new(store, repository);
///
/// let payload = listings
///     .get_listing(ResourceType::Book, PageRequest::default())
///     .await?;
/// ```
pub struct ListingCache<R: CatalogRepository> {
    store: Arc<TagStore>,
    repository: Arc<R>,
    serializer: Arc<dyn RecordSerializer>,
    metrics: Arc<dyn CacheMetrics>,
    ttl_policy: TtlPolicy,
    load_timeout: Option<Duration>,
}

impl<R: CatalogRepository> ListingCache<R> {
    /// Create a listing cache with defaults: JSON serialization, no TTL, no
    /// load timeout, no metrics.
    pub fn new(store: Arc<TagStore>, repository: Arc<R>) -> Self {
        ListingCache {
            store,
            repository,
            serializer: Arc::new(JsonSerializer),
            metrics: Arc::new(NoOpMetrics),
            ttl_policy: TtlPolicy::default(),
            load_timeout: None,
        }
    }

    /// Set a custom serializer.
    pub fn with_serializer(mut self, serializer: Arc<dyn RecordSerializer>) -> Self {
        self.serializer = serializer;
        self
    }

    /// Set a custom metrics handler.
    pub fn with_metrics(mut self, metrics: Arc<dyn CacheMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Set the entry lifetime policy.
    pub fn with_ttl_policy(mut self, policy: TtlPolicy) -> Self {
        self.ttl_policy = policy;
        self
    }

    /// Bound the load-and-serialize step. On expiry the flight fails with
    /// [`Error::LoadTimeout`] for every caller and nothing is stored.
    pub fn with_load_timeout(mut self, timeout: Duration) -> Self {
        self.load_timeout = Some(timeout);
        self
    }

    /// Return the serialized listing for `resource` at `page`, populating the
    /// cache on miss.
    ///
    /// # Errors
    ///
    /// - `Error::DataUnavailable`: the repository load failed; nothing cached
    /// - `Error::LoadTimeout`: the configured load timeout elapsed
    /// - `Error::Serialization`: the page could not be encoded
    pub async fn get_listing(&self, resource: ResourceType, page: PageRequest) -> Result<Bytes> {
        let timer = Instant::now();
        let key = ListingKey::new(resource, page).encode();
        let tag = resource.tag();
        let ttl = self.ttl_policy.get_ttl(resource);
        let view = View::for_resource(resource);

        debug!("» Listing lookup for {} (tag: {})", key, tag);

        let repository = Arc::clone(&self.repository);
        let serializer = Arc::clone(&self.serializer);
        let timeout = self.load_timeout;

        let outcome = self
            .store
            .get_or_compute(key.clone(), vec![tag], ttl, move || async move {
                let load = async {
                    let records = repository.load_page(resource, page).await?;
                    serializer.serialize_listing(&records, view)
                };
                match timeout {
                    Some(limit) => tokio::time::timeout(limit, load)
                        .await
                        .map_err(|_| Error::LoadTimeout(limit))?,
                    None => load.await,
                }
            })
            .await;

        match outcome {
            Ok((payload, CacheOutcome::Loaded)) => {
                self.metrics.record_miss(&key, timer.elapsed());
                info!(
                    "✓ Listing {} loaded in {:?} ({} bytes)",
                    key,
                    timer.elapsed(),
                    payload.len()
                );
                Ok(payload)
            }
            Ok((payload, _)) => {
                self.metrics.record_hit(&key, timer.elapsed());
                Ok(payload)
            }
            Err(e) => {
                self.metrics.record_error(&key, &e.to_string());
                Err(e)
            }
        }
    }

    /// The shared store (for stats and invalidation wiring).
    pub fn store(&self) -> &TagStore {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::CacheKey;
    use crate::model::Tag;
    use crate::repository::InMemoryCatalog;
    use futures::future::join_all;
    use std::sync::Mutex;

    fn cache(repository: Arc<InMemoryCatalog>) -> ListingCache<InMemoryCatalog> {
        ListingCache::new(Arc::new(TagStore::new()), repository)
    }

    #[tokio::test]
    async fn test_miss_then_hit_loads_once() {
        let repository = Arc::new(InMemoryCatalog::with_fixtures());
        let listings = cache(Arc::clone(&repository));
        let page = PageRequest::default();

        let first = listings
            .get_listing(ResourceType::Book, page)
            .await
            .expect("Failed to load listing");
        assert_eq!(repository.load_count(), 1);

        let second = listings
            .get_listing(ResourceType::Book, page)
            .await
            .expect("Failed to read listing");
        assert_eq!(repository.load_count(), 1);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_distinct_windows_cache_separately() {
        let repository = Arc::new(InMemoryCatalog::with_fixtures());
        let listings = cache(Arc::clone(&repository));

        listings
            .get_listing(ResourceType::Book, PageRequest::new(1, 3))
            .await
            .expect("Failed to load page 1");
        listings
            .get_listing(ResourceType::Book, PageRequest::new(2, 3))
            .await
            .expect("Failed to load page 2");

        assert_eq!(repository.load_count(), 2);
        assert_eq!(listings.store().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_readers_share_one_load() {
        let repository = Arc::new(InMemoryCatalog::with_fixtures());
        repository.set_load_delay(Some(Duration::from_millis(50)));
        let listings = cache(Arc::clone(&repository));
        let page = PageRequest::new(2, 5);

        let readers = (0..6).map(|_| listings.get_listing(ResourceType::Book, page));
        let payloads: Vec<_> = join_all(readers)
            .await
            .into_iter()
            .map(|result| result.expect("Reader failed"))
            .collect();

        assert_eq!(repository.load_count(), 1);
        assert!(payloads.windows(2).all(|pair| pair[0] == pair[1]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_timeout_shared_and_not_cached() {
        let repository = Arc::new(InMemoryCatalog::with_fixtures());
        repository.set_load_delay(Some(Duration::from_secs(10)));
        let listings = cache(Arc::clone(&repository))
            .with_load_timeout(Duration::from_millis(100));
        let page = PageRequest::default();

        let result = listings.get_listing(ResourceType::Book, page).await;
        assert_eq!(
            result.expect_err("load should time out"),
            Error::LoadTimeout(Duration::from_millis(100))
        );
        assert_eq!(listings.store().len(), 0);

        // Recovery: the next read is a clean load.
        repository.set_load_delay(None);
        let payload = listings
            .get_listing(ResourceType::Book, page)
            .await
            .expect("Recovery load failed");
        assert!(!payload.is_empty());
    }

    #[tokio::test]
    async fn test_loader_failure_not_cached() {
        let repository = Arc::new(InMemoryCatalog::with_fixtures());
        let listings = cache(Arc::clone(&repository));
        let page = PageRequest::default();

        repository.set_offline(true);
        let result = listings.get_listing(ResourceType::Author, page).await;
        assert!(matches!(result, Err(Error::DataUnavailable(_))));
        assert_eq!(listings.store().len(), 0);

        repository.set_offline(false);
        listings
            .get_listing(ResourceType::Author, page)
            .await
            .expect("Recovery load failed");
        assert_eq!(listings.store().len(), 1);
    }

    #[tokio::test]
    async fn test_metrics_record_hits_and_misses() {
        #[derive(Default)]
        struct CountingMetrics {
            hits: Mutex<usize>,
            misses: Mutex<usize>,
        }

        impl CacheMetrics for CountingMetrics {
            fn record_hit(&self, _key: &CacheKey, _elapsed: Duration) {
                *self.hits.lock().expect("Failed to lock hits") += 1;
            }

            fn record_miss(&self, _key: &CacheKey, _elapsed: Duration) {
                *self.misses.lock().expect("Failed to lock misses") += 1;
            }
        }

        let metrics = Arc::new(CountingMetrics::default());
        let repository = Arc::new(InMemoryCatalog::with_fixtures());
        let listings = ListingCache::new(Arc::new(TagStore::new()), repository)
            .with_metrics(Arc::clone(&metrics) as Arc<dyn CacheMetrics>);
        let page = PageRequest::default();

        listings
            .get_listing(ResourceType::Book, page)
            .await
            .expect("Failed to load");
        listings
            .get_listing(ResourceType::Book, page)
            .await
            .expect("Failed to read");

        assert_eq!(*metrics.misses.lock().expect("Failed to lock misses"), 1);
        assert_eq!(*metrics.hits.lock().expect("Failed to lock hits"), 1);
    }

    #[tokio::test]
    async fn test_invalidation_forces_reload() {
        let repository = Arc::new(InMemoryCatalog::with_fixtures());
        let listings = cache(Arc::clone(&repository));
        let page = PageRequest::default();

        listings
            .get_listing(ResourceType::Book, page)
            .await
            .expect("Failed to load");
        assert_eq!(repository.load_count(), 1);

        listings.store().invalidate_tags(&[Tag::new("booksCache")]);

        listings
            .get_listing(ResourceType::Book, page)
            .await
            .expect("Failed to reload");
        assert_eq!(repository.load_count(), 2);
    }
}
