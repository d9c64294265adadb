//! # catalog-cache
//!
//! A cache-consistency layer for a paginated REST catalog of authors and
//! books.
//!
//! ## Features
//!
//! - **Tag-Scoped Invalidation:** Every cached listing is indexed under its
//!   resource's tag; one sweep drops them all
//! - **Single-Flight Loads:** Concurrent misses on one key share a single
//!   repository load instead of stampeding
//! - **Deterministic Keys:** `<resource>-<page>-<pageSize>` windows, with
//!   lenient parsing of raw query parameters
//! - **Write-Through Consistency:** Mutations sweep their resource's listings
//!   only after the repository commits, and only that resource's
//! - **Versioned Payloads:** The `Accept` header's declared API version gates
//!   which fields a detail response carries
//! - **Async Native:** Tokio-based; no lock is ever held across an await
//!
//! ## Quick Start
//!
//! ```ignore
//! use catalog_cache::{BookDraft, CatalogService, InMemoryCatalog, PageRequest};
//! use std::sync::Arc;
//!
//! // 1. Wire a service over your repository
//! let service = CatalogService::new(Arc::new(InMemoryCatalog::with_fixtures()));
//!
//! // 2. Listing reads populate the cache once per window
//! let page = service.books(PageRequest::new(1, 3)).await?;
//! let again = service.books(PageRequest::new(1, 3)).await?; // cache hit
//!
//! // 3. Mutations sweep their resource's listings after commit
//! service
//!     .create_book(BookDraft {
//!         title: "The Commit Log".to_string(),
//!         cover_text: "Cover".to_string(),
//!         comment: None,
//!         author_id: Some(1),
//!     })
//!     .await?;
//! // the next books() read reloads; authors listings stay cached
//!
//! // 4. Details honor the Accept header's declared version
//! let detail = service
//!     .book_detail(1, Some("application/json; version=2.0"))
//!     .await?;
//! ```

#[macro_use]
extern crate log;

pub mod builder;
pub mod error;
pub mod invalidator;
pub mod key;
pub mod listing;
pub mod model;
pub mod observability;
pub mod repository;
pub mod serialization;
pub mod service;
pub mod store;
pub mod version;

// Re-exports for convenience
pub use builder::CatalogServiceBuilder;
pub use error::{Error, Result};
pub use invalidator::MutationInvalidator;
pub use key::{CacheKey, ListingKey, PageRequest};
pub use listing::ListingCache;
pub use model::{
    AuthorDraft, AuthorRecord, AuthorSummary, BookDraft, BookRecord, BookSummary, Record,
    ResourceType, Tag,
};
pub use observability::{CacheMetrics, NoOpMetrics, TtlPolicy};
pub use repository::{CatalogRepository, InMemoryCatalog};
pub use serialization::{JsonSerializer, RecordSerializer, View};
pub use service::CatalogService;
pub use store::{CacheEntry, CacheOutcome, TagStore};
pub use version::{ApiVersion, ResponseVersioner};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
