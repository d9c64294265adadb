//! Metrics hooks and TTL policy.

use crate::key::CacheKey;
use crate::model::{ResourceType, Tag};
use std::collections::HashMap;
use std::time::Duration;

/// Metrics sink for cache operations.
///
/// Every method defaults to a no-op so implementations override only what
/// they report.
pub trait CacheMetrics: Send + Sync {
    /// A read served from cache, either a stored entry or a joined flight.
    fn record_hit(&self, _key: &CacheKey, _elapsed: Duration) {}

    /// A read that led a load and populated the cache.
    fn record_miss(&self, _key: &CacheKey, _elapsed: Duration) {}

    /// A read or load that failed.
    fn record_error(&self, _key: &CacheKey, _error: &str) {}

    /// A tag sweep. `evicted` counts the entries removed.
    fn record_invalidation(&self, _tag: &Tag, _evicted: usize) {}
}

/// Metrics sink that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpMetrics;

impl CacheMetrics for NoOpMetrics {}

/// Entry lifetime policy.
///
/// Consistency comes from tag invalidation; TTLs are a backstop against
/// entries that invalidation never reaches. The default keeps entries until
/// they are invalidated.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum TtlPolicy {
    /// Entries live until invalidated.
    #[default]
    NoExpiry,
    /// Same lifetime for every entry.
    Fixed(Duration),
    /// Per-resource lifetimes; unlisted resources never expire.
    PerResource(HashMap<ResourceType, Duration>),
}

impl TtlPolicy {
    /// TTL for an entry of the given resource type, `None` for no expiry.
    pub fn get_ttl(&self, resource: ResourceType) -> Option<Duration> {
        match self {
            TtlPolicy::NoExpiry => None,
            TtlPolicy::Fixed(ttl) => Some(*ttl),
            TtlPolicy::PerResource(ttls) => ttls.get(&resource).copied(),
        }
    }
}
