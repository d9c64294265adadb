//! Basic usage walkthrough: cached listings, invalidating mutations,
//! versioned details.

use catalog_cache::{
    error::Result, AuthorDraft, BookDraft, CatalogService, InMemoryCatalog, PageRequest,
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Debug)
        .try_init()
        .ok();

    println!("\n=== Catalog Cache - Basic Example ===\n");

    // 1. Wire a service over the fixture catalog (20 authors, 20 books)
    println!("1. Wiring the catalog service...");
    let repository = Arc::new(InMemoryCatalog::with_fixtures());
    let service = CatalogService::new(Arc::clone(&repository));
    println!("   ✓ Service ready\n");

    // 2. First listing read - cache miss, loads from the repository
    println!("2. First request for the books listing (page 1):");
    let page = PageRequest::default();
    let listing = service.books(page).await?;
    println!(
        "   ✓ Loaded {} bytes (repository loads so far: {})\n",
        listing.len(),
        repository.load_count()
    );

    // 3. Second read - served from cache, no repository load
    println!("3. Second request for the same listing:");
    let cached = service.books(page).await?;
    println!(
        "   ✓ Served {} bytes from cache (repository loads still: {})\n",
        cached.len(),
        repository.load_count()
    );

    // 4. Raw query parameters are coerced, never rejected
    println!("4. Request with mangled paging (page=\"oops\", limit=\"-2\"):");
    let lenient = PageRequest::from_raw(Some("oops"), Some("-2"));
    service.books(lenient).await?;
    println!(
        "   ✓ Fell back to the default window {}x{}\n",
        lenient.page(),
        lenient.page_size()
    );

    // 5. A mutation sweeps only its own resource's listings
    println!("5. Creating a book (sweeps books listings, authors untouched):");
    service.authors(page).await?;
    let loads_before = repository.load_count();
    let created = service
        .create_book(BookDraft {
            title: "The Commit Log".to_string(),
            cover_text: "A story told in appends".to_string(),
            comment: Some("Staff pick".to_string()),
            author_id: Some(1),
        })
        .await?;
    println!("   ✓ Created book {}", created.id);

    service.books(page).await?;
    service.authors(page).await?;
    println!(
        "   ✓ Books reloaded, authors still cached ({} -> {} loads)\n",
        loads_before,
        repository.load_count()
    );

    // 6. Details honor the Accept header's declared API version
    println!("6. Book detail under API version 1.0 and 2.0:");
    let v1 = service.book_detail(created.id, None).await?;
    let v2 = service
        .book_detail(created.id, Some("application/json; version=2.0"))
        .await?;
    println!("   ✓ v1 ({} bytes): {}", v1.len(), String::from_utf8_lossy(&v1));
    println!("   ✓ v2 ({} bytes): {}\n", v2.len(), String::from_utf8_lossy(&v2));

    // 7. Author mutations follow the same rule
    println!("7. Creating an author (sweeps authors listings):");
    let author = service
        .create_author(AuthorDraft {
            last_name: "Turing".to_string(),
            first_name: Some("Alan".to_string()),
        })
        .await?;
    println!("   ✓ Created author {}", author.id);
    service.authors(page).await?;
    println!(
        "   ✓ Authors reloaded (total repository loads: {})\n",
        repository.load_count()
    );

    println!("=== Example Complete ===\n");

    Ok(())
}
