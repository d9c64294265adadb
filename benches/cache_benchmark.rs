use catalog_cache::{
    BookDraft, CatalogService, InMemoryCatalog, ListingKey, PageRequest, ResourceType,
};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::Rng;
use std::sync::Arc;
use tokio::runtime::Runtime;

fn warm_service(rt: &Runtime) -> CatalogService<InMemoryCatalog> {
    let service = CatalogService::new(Arc::new(InMemoryCatalog::with_fixtures()));
    rt.block_on(async {
        for page in 1..=7 {
            service
                .books(PageRequest::new(page, 3))
                .await
                .expect("warm books listing");
        }
    });
    service
}

fn bench_listing_hit(c: &mut Criterion) {
    let rt = Runtime::new().expect("build runtime");
    let service = warm_service(&rt);
    let mut rng = rand::rng();

    c.bench_function("listing/warm_hit", |b| {
        let service = &service;
        b.to_async(&rt).iter(|| {
            let page = PageRequest::new(rng.random_range(1..=7), 3);
            async move {
                let payload = service.books(page).await.expect("read cached listing");
                black_box(payload.len());
            }
        });
    });
}

fn bench_key_encode(c: &mut Criterion) {
    c.bench_function("key/encode", |b| {
        b.iter(|| {
            let key = ListingKey::new(
                black_box(ResourceType::Book),
                PageRequest::new(black_box(4), 25),
            )
            .encode();
            black_box(key.as_str().len());
        });
    });
}

fn bench_invalidate_reload(c: &mut Criterion) {
    let rt = Runtime::new().expect("build runtime");
    let service = CatalogService::new(Arc::new(InMemoryCatalog::with_fixtures()));
    let page = PageRequest::default();

    c.bench_function("listing/invalidate_reload", |b| {
        let service = &service;
        b.to_async(&rt).iter(|| async move {
            let book = service
                .create_book(BookDraft {
                    title: "Bench".to_string(),
                    cover_text: "Bench".to_string(),
                    comment: None,
                    author_id: Some(1),
                })
                .await
                .expect("create book");
            let payload = service.books(page).await.expect("reload listing");
            black_box(payload.len());
            service.delete_book(book.id).await.expect("delete book");
        });
    });
}

criterion_group!(
    benches,
    bench_listing_hit,
    bench_key_encode,
    bench_invalidate_reload
);
criterion_main!(benches);
