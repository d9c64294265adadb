//! Catalog data access: the repository contract and an in-memory
//! implementation.

use crate::error::{Error, Result};
use crate::key::PageRequest;
use crate::model::{
    AuthorDraft, AuthorRecord, AuthorSummary, BookDraft, BookRecord, BookSummary, Record,
    ResourceType,
};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// Data access contract for the catalog.
///
/// Listing loads must be deterministic for a given store state: pages are
/// ordered by ascending id, so equal requests against unchanged data return
/// equal pages. Implementations map their driver errors into
/// [`Error::DataUnavailable`].
#[allow(async_fn_in_trait)]
pub trait CatalogRepository: Send + Sync {
    /// Load one listing page, ordered by ascending id.
    async fn load_page(&self, resource: ResourceType, page: PageRequest) -> Result<Vec<Record>>;

    /// Load one record by id.
    async fn load_by_id(&self, resource: ResourceType, id: i64) -> Result<Option<Record>>;

    async fn create_author(&self, draft: AuthorDraft) -> Result<AuthorRecord>;

    /// Replace an author's fields. `None` if the author does not exist.
    async fn update_author(&self, id: i64, draft: AuthorDraft) -> Result<Option<AuthorRecord>>;

    /// Delete an author and, cascading, every book linked to them. `false` if
    /// the author did not exist.
    async fn delete_author(&self, id: i64) -> Result<bool>;

    async fn create_book(&self, draft: BookDraft) -> Result<BookRecord>;

    /// Replace a book's fields, re-linking its author from the draft. `None`
    /// if the book does not exist.
    async fn update_book(&self, id: i64, draft: BookDraft) -> Result<Option<BookRecord>>;

    /// Delete a book. `false` if the book did not exist.
    async fn delete_book(&self, id: i64) -> Result<bool>;
}

#[derive(Debug, Clone)]
struct StoredAuthor {
    id: i64,
    last_name: String,
    first_name: Option<String>,
}

#[derive(Debug, Clone)]
struct StoredBook {
    id: i64,
    title: String,
    cover_text: String,
    comment: Option<String>,
    author_id: Option<i64>,
}

#[derive(Debug, Default)]
struct CatalogState {
    authors: BTreeMap<i64, StoredAuthor>,
    books: BTreeMap<i64, StoredBook>,
    next_author_id: i64,
    next_book_id: i64,
}

/// In-memory catalog backed by ordered maps.
///
/// Serves tests and demos, and doubles as the reference for the ordering and
/// cascade semantics a storage adapter must honor. Includes fault injection:
/// an optional per-load delay and an offline switch, plus a counter of
/// listing loads for asserting cache behavior.
///
/// # Example
///
/// ```ignore
/// use catalog_cache::{InMemoryCatalog, CatalogRepository, PageRequest, ResourceType};
///
/// let catalog = InMemoryCatalog::with_fixtures();
/// let page = catalog
///     .load_page(ResourceType::Book, PageRequest::default())
///     .await?;
/// assert_eq!(page.len(), 3);
/// ```
#[derive(Debug)]
pub struct InMemoryCatalog {
    state: Mutex<CatalogState>,
    loads: AtomicUsize,
    offline: AtomicBool,
    load_delay: Mutex<Option<Duration>>,
}

impl InMemoryCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        InMemoryCatalog {
            state: Mutex::new(CatalogState {
                next_author_id: 1,
                next_book_id: 1,
                ..CatalogState::default()
            }),
            loads: AtomicUsize::new(0),
            offline: AtomicBool::new(false),
            load_delay: Mutex::new(None),
        }
    }

    /// Create a seeded catalog: 20 authors and 20 books, book `i` linked to
    /// author `i`.
    pub fn with_fixtures() -> Self {
        let catalog = Self::new();
        {
            let mut state = catalog.lock_state();
            for i in 1..=20i64 {
                state.authors.insert(
                    i,
                    StoredAuthor {
                        id: i,
                        last_name: format!("Lastname {}", i),
                        first_name: Some(format!("Firstname {}", i)),
                    },
                );
            }
            for i in 1..=20i64 {
                state.books.insert(
                    i,
                    StoredBook {
                        id: i,
                        title: format!("Book {}", i),
                        cover_text: format!("Cover text for book {}", i),
                        comment: Some(format!("Librarian note no. {}", i)),
                        author_id: Some(i),
                    },
                );
            }
            state.next_author_id = 21;
            state.next_book_id = 21;
        }
        catalog
    }

    /// Simulate the backing store being unreachable. While offline, every
    /// trait method fails with [`Error::DataUnavailable`].
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::Relaxed);
    }

    /// Delay every listing load, for timeout and single-flight tests.
    pub fn set_load_delay(&self, delay: Option<Duration>) {
        *self.lock_delay() = delay;
    }

    /// Number of listing loads served so far.
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::Relaxed)
    }

    fn check_online(&self) -> Result<()> {
        if self.offline.load(Ordering::Relaxed) {
            return Err(Error::DataUnavailable("catalog storage offline".to_string()));
        }
        Ok(())
    }

    fn lock_state(&self) -> MutexGuard<'_, CatalogState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("⚠ Catalog state mutex poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn lock_delay(&self) -> MutexGuard<'_, Option<Duration>> {
        match self.load_delay.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Default for InMemoryCatalog {
    fn default() -> Self {
        InMemoryCatalog::new()
    }
}

fn assemble_author(state: &CatalogState, author: &StoredAuthor) -> AuthorRecord {
    let books = state
        .books
        .values()
        .filter(|book| book.author_id == Some(author.id))
        .map(|book| BookSummary {
            id: book.id,
            title: book.title.clone(),
            cover_text: book.cover_text.clone(),
        })
        .collect();
    AuthorRecord {
        id: author.id,
        last_name: author.last_name.clone(),
        first_name: author.first_name.clone(),
        books,
    }
}

fn assemble_book(state: &CatalogState, book: &StoredBook) -> BookRecord {
    let author = book
        .author_id
        .and_then(|id| state.authors.get(&id))
        .map(|author| AuthorSummary {
            id: author.id,
            last_name: author.last_name.clone(),
            first_name: author.first_name.clone(),
        });
    BookRecord {
        id: book.id,
        title: book.title.clone(),
        cover_text: book.cover_text.clone(),
        comment: book.comment.clone(),
        author,
    }
}

impl CatalogRepository for InMemoryCatalog {
    async fn load_page(&self, resource: ResourceType, page: PageRequest) -> Result<Vec<Record>> {
        self.loads.fetch_add(1, Ordering::Relaxed);

        // Copy the delay out so no guard is held across the sleep.
        let delay = *self.lock_delay();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.check_online()?;

        let state = self.lock_state();
        let records = match resource {
            ResourceType::Author => state
                .authors
                .values()
                .skip(page.offset())
                .take(page.page_size() as usize)
                .map(|author| Record::Author(assemble_author(&state, author)))
                .collect(),
            ResourceType::Book => state
                .books
                .values()
                .skip(page.offset())
                .take(page.page_size() as usize)
                .map(|book| Record::Book(assemble_book(&state, book)))
                .collect(),
        };
        Ok(records)
    }

    async fn load_by_id(&self, resource: ResourceType, id: i64) -> Result<Option<Record>> {
        self.check_online()?;
        let state = self.lock_state();
        let record = match resource {
            ResourceType::Author => state
                .authors
                .get(&id)
                .map(|author| Record::Author(assemble_author(&state, author))),
            ResourceType::Book => state
                .books
                .get(&id)
                .map(|book| Record::Book(assemble_book(&state, book))),
        };
        Ok(record)
    }

    async fn create_author(&self, draft: AuthorDraft) -> Result<AuthorRecord> {
        self.check_online()?;
        let mut state = self.lock_state();
        let id = state.next_author_id;
        state.next_author_id += 1;
        let author = StoredAuthor {
            id,
            last_name: draft.last_name,
            first_name: draft.first_name,
        };
        state.authors.insert(id, author);
        let record = assemble_author(&state, &state.authors[&id]);
        debug!("✓ Created author {}", id);
        Ok(record)
    }

    async fn update_author(&self, id: i64, draft: AuthorDraft) -> Result<Option<AuthorRecord>> {
        self.check_online()?;
        let mut state = self.lock_state();
        let Some(author) = state.authors.get_mut(&id) else {
            return Ok(None);
        };
        author.last_name = draft.last_name;
        author.first_name = draft.first_name;
        let record = assemble_author(&state, &state.authors[&id]);
        debug!("✓ Updated author {}", id);
        Ok(Some(record))
    }

    async fn delete_author(&self, id: i64) -> Result<bool> {
        self.check_online()?;
        let mut state = self.lock_state();
        if state.authors.remove(&id).is_none() {
            return Ok(false);
        }
        // Deleting an author removes their books as well.
        state.books.retain(|_, book| book.author_id != Some(id));
        debug!("✓ Deleted author {} (books cascaded)", id);
        Ok(true)
    }

    async fn create_book(&self, draft: BookDraft) -> Result<BookRecord> {
        self.check_online()?;
        let mut state = self.lock_state();
        let id = state.next_book_id;
        state.next_book_id += 1;
        // An unknown author id leaves the book unattributed.
        let author_id = draft
            .author_id
            .filter(|author_id| state.authors.contains_key(author_id));
        let book = StoredBook {
            id,
            title: draft.title,
            cover_text: draft.cover_text,
            comment: draft.comment,
            author_id,
        };
        state.books.insert(id, book);
        let record = assemble_book(&state, &state.books[&id]);
        debug!("✓ Created book {}", id);
        Ok(record)
    }

    async fn update_book(&self, id: i64, draft: BookDraft) -> Result<Option<BookRecord>> {
        self.check_online()?;
        let mut state = self.lock_state();
        if !state.books.contains_key(&id) {
            return Ok(None);
        }
        let author_id = draft
            .author_id
            .filter(|author_id| state.authors.contains_key(author_id));
        if let Some(book) = state.books.get_mut(&id) {
            book.title = draft.title;
            book.cover_text = draft.cover_text;
            book.comment = draft.comment;
            book.author_id = author_id;
        }
        let record = assemble_book(&state, &state.books[&id]);
        debug!("✓ Updated book {}", id);
        Ok(Some(record))
    }

    async fn delete_book(&self, id: i64) -> Result<bool> {
        self.check_online()?;
        let mut state = self.lock_state();
        let existed = state.books.remove(&id).is_some();
        if existed {
            debug!("✓ Deleted book {}", id);
        }
        Ok(existed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fixtures_shape() {
        let catalog = InMemoryCatalog::with_fixtures();

        let authors = catalog
            .load_page(ResourceType::Author, PageRequest::new(1, 25))
            .await
            .expect("Failed to load authors");
        assert_eq!(authors.len(), 20);

        let books = catalog
            .load_page(ResourceType::Book, PageRequest::new(1, 25))
            .await
            .expect("Failed to load books");
        assert_eq!(books.len(), 20);
    }

    #[tokio::test]
    async fn test_pages_are_ordered_and_windowed() {
        let catalog = InMemoryCatalog::with_fixtures();

        let page = catalog
            .load_page(ResourceType::Book, PageRequest::new(2, 5))
            .await
            .expect("Failed to load page");
        let ids: Vec<i64> = page.iter().map(Record::id).collect();
        assert_eq!(ids, vec![6, 7, 8, 9, 10]);
    }

    #[tokio::test]
    async fn test_default_window_serves_first_three() {
        let catalog = InMemoryCatalog::with_fixtures();

        let page = catalog
            .load_page(ResourceType::Author, PageRequest::default())
            .await
            .expect("Failed to load page");
        let ids: Vec<i64> = page.iter().map(Record::id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_page_past_the_end_is_empty() {
        let catalog = InMemoryCatalog::with_fixtures();

        let page = catalog
            .load_page(ResourceType::Book, PageRequest::new(8, 3))
            .await
            .expect("Failed to load page");
        assert!(page.is_empty());
    }

    #[tokio::test]
    async fn test_create_assigns_sequential_ids() {
        let catalog = InMemoryCatalog::new();

        let first = catalog
            .create_author(AuthorDraft {
                last_name: "First".to_string(),
                first_name: None,
            })
            .await
            .expect("Failed to create");
        let second = catalog
            .create_author(AuthorDraft {
                last_name: "Second".to_string(),
                first_name: None,
            })
            .await
            .expect("Failed to create");

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
    }

    #[tokio::test]
    async fn test_author_delete_cascades_books() {
        let catalog = InMemoryCatalog::with_fixtures();

        assert!(catalog.delete_author(3).await.expect("Failed to delete"));

        // Author 3's book went with them.
        let book = catalog
            .load_by_id(ResourceType::Book, 3)
            .await
            .expect("Failed to load");
        assert!(book.is_none());

        // Other books survive.
        let other = catalog
            .load_by_id(ResourceType::Book, 4)
            .await
            .expect("Failed to load");
        assert!(other.is_some());
    }

    #[tokio::test]
    async fn test_book_relink_with_unknown_author_unattributes() {
        let catalog = InMemoryCatalog::with_fixtures();

        let updated = catalog
            .update_book(
                1,
                BookDraft {
                    title: "Book 1".to_string(),
                    cover_text: "Cover text for book 1".to_string(),
                    comment: None,
                    author_id: Some(999),
                },
            )
            .await
            .expect("Failed to update")
            .expect("Book missing");
        assert!(updated.author.is_none());
    }

    #[tokio::test]
    async fn test_book_relink_to_existing_author() {
        let catalog = InMemoryCatalog::with_fixtures();

        let updated = catalog
            .update_book(
                1,
                BookDraft {
                    title: "Book 1".to_string(),
                    cover_text: "Cover text for book 1".to_string(),
                    comment: None,
                    author_id: Some(5),
                },
            )
            .await
            .expect("Failed to update")
            .expect("Book missing");
        assert_eq!(updated.author.expect("author missing").id, 5);
    }

    #[tokio::test]
    async fn test_missing_rows_update_and_delete() {
        let catalog = InMemoryCatalog::new();

        let updated = catalog
            .update_author(
                42,
                AuthorDraft {
                    last_name: "Ghost".to_string(),
                    first_name: None,
                },
            )
            .await
            .expect("update should not error");
        assert!(updated.is_none());

        assert!(!catalog.delete_book(42).await.expect("delete should not error"));
    }

    #[tokio::test]
    async fn test_offline_fails_loads_and_mutations() {
        let catalog = InMemoryCatalog::with_fixtures();
        catalog.set_offline(true);

        let load = catalog
            .load_page(ResourceType::Book, PageRequest::default())
            .await;
        assert!(matches!(load, Err(Error::DataUnavailable(_))));

        let create = catalog
            .create_book(BookDraft {
                title: "Offline".to_string(),
                cover_text: "Offline".to_string(),
                comment: None,
                author_id: None,
            })
            .await;
        assert!(matches!(create, Err(Error::DataUnavailable(_))));

        catalog.set_offline(false);
        let load = catalog
            .load_page(ResourceType::Book, PageRequest::default())
            .await;
        assert!(load.is_ok());
    }

    #[tokio::test]
    async fn test_load_count_tracks_listing_loads() {
        let catalog = InMemoryCatalog::with_fixtures();
        assert_eq!(catalog.load_count(), 0);

        catalog
            .load_page(ResourceType::Book, PageRequest::default())
            .await
            .expect("Failed to load");
        catalog
            .load_page(ResourceType::Author, PageRequest::default())
            .await
            .expect("Failed to load");
        assert_eq!(catalog.load_count(), 2);
    }

    #[tokio::test]
    async fn test_author_record_embeds_book_summaries() {
        let catalog = InMemoryCatalog::with_fixtures();

        let record = catalog
            .load_by_id(ResourceType::Author, 7)
            .await
            .expect("Failed to load")
            .expect("Author missing");
        let Record::Author(author) = record else {
            panic!("expected an author record");
        };
        assert_eq!(author.books.len(), 1);
        assert_eq!(author.books[0].title, "Book 7");
    }
}
