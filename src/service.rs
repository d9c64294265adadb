//! Catalog service facade: cached listings, versioned details, invalidating
//! mutations.

use crate::builder::CatalogServiceBuilder;
use crate::error::{Error, Result};
use crate::invalidator::MutationInvalidator;
use crate::key::PageRequest;
use crate::listing::ListingCache;
use crate::model::{AuthorDraft, AuthorRecord, BookDraft, BookRecord, Record, ResourceType};
use crate::repository::CatalogRepository;
use crate::serialization::{RecordSerializer, View};
use crate::store::TagStore;
use crate::version::ResponseVersioner;
use bytes::Bytes;
use std::sync::Arc;

/// The catalog's read/write surface.
///
/// Listing reads serve cached payloads; detail reads bypass the cache and
/// honor the API version the request declares. Every mutation commits through
/// one private helper that sweeps the resource's tag only after the
/// repository reports the mutation durable, so no code path can mutate
/// without invalidating.
///
/// # Example
///
/// ```ignore
/// use catalog_cache::{CatalogService, InMemoryCatalog, PageRequest};
/// use std::sync::Arc;
///
/// let service = CatalogService::new(Arc::new(InMemoryCatalog::with_fixtures()));
///
/// let first_page = service.books(PageRequest::default()).await?;
/// let detail = service.book_detail(1, Some("application/json; version=2.0")).await?;
/// ```
pub struct CatalogService<R: CatalogRepository> {
    repository: Arc<R>,
    listings: ListingCache<R>,
    invalidator: MutationInvalidator,
    versioner: ResponseVersioner,
    serializer: Arc<dyn RecordSerializer>,
}

impl<R: CatalogRepository> CatalogService<R> {
    /// Create a service with default wiring. See [`CatalogService::builder`]
    /// for configuration.
    pub fn new(repository: Arc<R>) -> Self {
        CatalogServiceBuilder::new(repository).build()
    }

    /// Start a builder for custom wiring (TTL policy, load timeout, default
    /// API version, metrics, serializer, shared store).
    pub fn builder(repository: Arc<R>) -> CatalogServiceBuilder<R> {
        CatalogServiceBuilder::new(repository)
    }

    pub(crate) fn from_parts(
        repository: Arc<R>,
        listings: ListingCache<R>,
        invalidator: MutationInvalidator,
        versioner: ResponseVersioner,
        serializer: Arc<dyn RecordSerializer>,
    ) -> Self {
        CatalogService {
            repository,
            listings,
            invalidator,
            versioner,
            serializer,
        }
    }

    /// Serialized authors listing page. Cached under the `authorsCache` tag.
    pub async fn authors(&self, page: PageRequest) -> Result<Bytes> {
        self.listings.get_listing(ResourceType::Author, page).await
    }

    /// Serialized books listing page. Cached under the `booksCache` tag.
    pub async fn books(&self, page: PageRequest) -> Result<Bytes> {
        self.listings.get_listing(ResourceType::Book, page).await
    }

    /// Serialized author detail. Not cached.
    ///
    /// # Errors
    ///
    /// `Error::NotFound` if the author does not exist.
    pub async fn author_detail(&self, id: i64, accept: Option<&str>) -> Result<Bytes> {
        self.detail(ResourceType::Author, id, accept).await
    }

    /// Serialized book detail. Not cached. The `comment` field appears only
    /// when the request declares API version 2.0 or later.
    ///
    /// # Errors
    ///
    /// `Error::NotFound` if the book does not exist.
    pub async fn book_detail(&self, id: i64, accept: Option<&str>) -> Result<Bytes> {
        self.detail(ResourceType::Book, id, accept).await
    }

    async fn detail(
        &self,
        resource: ResourceType,
        id: i64,
        accept: Option<&str>,
    ) -> Result<Bytes> {
        let version = self.versioner.resolve(accept);
        let record: Record = self
            .repository
            .load_by_id(resource, id)
            .await?
            .ok_or(Error::NotFound { resource, id })?;
        debug!("» Serving {} {} detail at API version {}", resource, id, version);
        self.serializer
            .serialize_detail(&record, View::for_resource(resource), version)
    }

    /// Create an author and sweep the authors listings.
    pub async fn create_author(&self, draft: AuthorDraft) -> Result<AuthorRecord> {
        let outcome = self.repository.create_author(draft).await;
        self.commit(ResourceType::Author, outcome)
    }

    /// Replace an author's fields and sweep the authors listings.
    ///
    /// # Errors
    ///
    /// `Error::NotFound` if the author does not exist; nothing is swept.
    pub async fn update_author(&self, id: i64, draft: AuthorDraft) -> Result<AuthorRecord> {
        let outcome = self.repository.update_author(id, draft).await.and_then(|updated| {
            updated.ok_or(Error::NotFound {
                resource: ResourceType::Author,
                id,
            })
        });
        self.commit(ResourceType::Author, outcome)
    }

    /// Delete an author (their books cascade in the repository) and sweep the
    /// authors listings.
    ///
    /// # Errors
    ///
    /// `Error::NotFound` if the author does not exist; nothing is swept.
    pub async fn delete_author(&self, id: i64) -> Result<()> {
        let outcome = self.repository.delete_author(id).await.and_then(|existed| {
            if existed {
                Ok(())
            } else {
                Err(Error::NotFound {
                    resource: ResourceType::Author,
                    id,
                })
            }
        });
        self.commit(ResourceType::Author, outcome)
    }

    /// Create a book and sweep the books listings.
    pub async fn create_book(&self, draft: BookDraft) -> Result<BookRecord> {
        let outcome = self.repository.create_book(draft).await;
        self.commit(ResourceType::Book, outcome)
    }

    /// Replace a book's fields (re-linking its author from the draft) and
    /// sweep the books listings.
    ///
    /// # Errors
    ///
    /// `Error::NotFound` if the book does not exist; nothing is swept.
    pub async fn update_book(&self, id: i64, draft: BookDraft) -> Result<BookRecord> {
        let outcome = self.repository.update_book(id, draft).await.and_then(|updated| {
            updated.ok_or(Error::NotFound {
                resource: ResourceType::Book,
                id,
            })
        });
        self.commit(ResourceType::Book, outcome)
    }

    /// Delete a book and sweep the books listings.
    ///
    /// # Errors
    ///
    /// `Error::NotFound` if the book does not exist; nothing is swept.
    pub async fn delete_book(&self, id: i64) -> Result<()> {
        let outcome = self.repository.delete_book(id).await.and_then(|existed| {
            if existed {
                Ok(())
            } else {
                Err(Error::NotFound {
                    resource: ResourceType::Book,
                    id,
                })
            }
        });
        self.commit(ResourceType::Book, outcome)
    }

    /// The single mutation choke point: sweeps the resource's listings only
    /// when the repository reported success. Failed mutations change nothing,
    /// so the cache stays as it was.
    fn commit<T>(&self, resource: ResourceType, outcome: Result<T>) -> Result<T> {
        let value = outcome?;
        self.invalidator.after_mutation(resource);
        Ok(value)
    }

    /// The underlying listing cache.
    pub fn listings(&self) -> &ListingCache<R> {
        &self.listings
    }

    /// The shared cache store.
    pub fn store(&self) -> &TagStore {
        self.listings.store()
    }

    /// The repository handle.
    pub fn repository(&self) -> &R {
        &self.repository
    }
}
