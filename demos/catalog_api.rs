//! REST catalog over the cache layer: paginated listings, versioned details,
//! invalidating mutations.
//!
//! Try it:
//!
//! ```text
//! curl 'http://127.0.0.1:3000/api/v1/books?page=2&limit=5'
//! curl -H 'Accept: application/json; version=2.0' http://127.0.0.1:3000/api/v1/books/1
//! curl -X POST -H 'Content-Type: application/json' \
//!      -d '{"title":"New","cover_text":"Cover","author_id":1}' \
//!      http://127.0.0.1:3000/api/v1/books
//! ```

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use bytes::Bytes;
use catalog_cache::{AuthorDraft, BookDraft, CatalogService, Error, InMemoryCatalog, PageRequest};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

/// Application state
#[derive(Clone)]
struct AppState {
    service: Arc<CatalogService<InMemoryCatalog>>,
}

/// Raw paging parameters. Kept as strings so the lenient coercion policy
/// applies instead of a rejection.
#[derive(Deserialize)]
struct Paging {
    page: Option<String>,
    limit: Option<String>,
}

impl Paging {
    fn window(&self) -> PageRequest {
        PageRequest::from_raw(self.page.as_deref(), self.limit.as_deref())
    }
}

fn accept_header(headers: &HeaderMap) -> Option<&str> {
    headers.get(header::ACCEPT).and_then(|value| value.to_str().ok())
}

fn json_payload(payload: Bytes) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        payload,
    )
        .into_response()
}

fn error_response(error: Error) -> Response {
    let status = match &error {
        Error::NotFound { .. } => StatusCode::NOT_FOUND,
        Error::LoadTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
        Error::DataUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        Error::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(json!({"error": error.to_string()}))).into_response()
}

/// List authors with caching
async fn list_authors(State(state): State<AppState>, Query(paging): Query<Paging>) -> Response {
    match state.service.authors(paging.window()).await {
        Ok(payload) => json_payload(payload),
        Err(error) => error_response(error),
    }
}

/// List books with caching
async fn list_books(State(state): State<AppState>, Query(paging): Query<Paging>) -> Response {
    match state.service.books(paging.window()).await {
        Ok(payload) => json_payload(payload),
        Err(error) => error_response(error),
    }
}

/// Author detail, shaped by the Accept header's API version
async fn author_detail(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Response {
    match state.service.author_detail(id, accept_header(&headers)).await {
        Ok(payload) => json_payload(payload),
        Err(error) => error_response(error),
    }
}

/// Book detail, shaped by the Accept header's API version
async fn book_detail(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Response {
    match state.service.book_detail(id, accept_header(&headers)).await {
        Ok(payload) => json_payload(payload),
        Err(error) => error_response(error),
    }
}

async fn create_author(State(state): State<AppState>, Json(draft): Json<AuthorDraft>) -> Response {
    match state.service.create_author(draft).await {
        Ok(author) => (StatusCode::CREATED, Json(author)).into_response(),
        Err(error) => error_response(error),
    }
}

async fn update_author(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Json(draft): Json<AuthorDraft>,
) -> Response {
    match state.service.update_author(id, draft).await {
        Ok(author) => Json(author).into_response(),
        Err(error) => error_response(error),
    }
}

async fn delete_author(Path(id): Path<i64>, State(state): State<AppState>) -> Response {
    match state.service.delete_author(id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error_response(error),
    }
}

async fn create_book(State(state): State<AppState>, Json(draft): Json<BookDraft>) -> Response {
    match state.service.create_book(draft).await {
        Ok(book) => (StatusCode::CREATED, Json(book)).into_response(),
        Err(error) => error_response(error),
    }
}

async fn update_book(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Json(draft): Json<BookDraft>,
) -> Response {
    match state.service.update_book(id, draft).await {
        Ok(book) => Json(book).into_response(),
        Err(error) => error_response(error),
    }
}

async fn delete_book(Path(id): Path<i64>, State(state): State<AppState>) -> Response {
    match state.service.delete_book(id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error_response(error),
    }
}

/// Health check endpoint
async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "service": "catalog-cache-api"
    }))
}

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .try_init()
        .ok();

    let service = Arc::new(CatalogService::new(Arc::new(
        InMemoryCatalog::with_fixtures(),
    )));
    let state = AppState { service };

    // Build router
    let app = Router::new()
        .route("/health", get(health))
        .route("/api/v1/authors", get(list_authors).post(create_author))
        .route(
            "/api/v1/authors/{id}",
            get(author_detail).put(update_author).delete(delete_author),
        )
        .route("/api/v1/books", get(list_books).post(create_book))
        .route(
            "/api/v1/books/{id}",
            get(book_detail).put(update_book).delete(delete_book),
        )
        .with_state(state);

    // Start server
    let listener = tokio::net::TcpListener::bind("127.0.0.1:3000")
        .await
        .expect("Failed to bind port 3000");

    println!("Server running on http://127.0.0.1:3000");
    println!("Listings: http://127.0.0.1:3000/api/v1/books?page=1&limit=3");
    println!("Detail:   http://127.0.0.1:3000/api/v1/books/1");
    println!("Health:   http://127.0.0.1:3000/health");

    axum::serve(listener, app)
        .await
        .expect("Failed to start server");
}
