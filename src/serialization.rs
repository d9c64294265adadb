//! View-projected JSON serialization of catalog records.
//!
//! A view selects the field projection for a payload. The authors view embeds
//! each author's book summaries (no author back-reference inside them); the
//! books view embeds each book's author summary (no book list inside it), so
//! neither projection can recurse.

use crate::error::{Error, Result};
use crate::model::{AuthorRecord, BookRecord, Record, ResourceType};
use crate::version::ApiVersion;
use bytes::Bytes;
use serde::Serialize;
use std::fmt;

/// Serialization view for catalog payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum View {
    /// Author-centric projection: authors with embedded book summaries.
    Authors,
    /// Book-centric projection: books with an embedded author summary.
    Books,
}

impl View {
    pub fn for_resource(resource: ResourceType) -> View {
        match resource {
            ResourceType::Author => View::Authors,
            ResourceType::Book => View::Books,
        }
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            View::Authors => write!(f, "authors"),
            View::Books => write!(f, "books"),
        }
    }
}

/// Serialization collaborator. The cache stores whatever bytes this produces
/// and never inspects them.
pub trait RecordSerializer: Send + Sync {
    /// Serialize a listing page under a view.
    ///
    /// Listing payloads are un-versioned: every field of the view appears,
    /// version-gated ones included.
    fn serialize_listing(&self, records: &[Record], view: View) -> Result<Bytes>;

    /// Serialize one record for a detail response, honoring the declared API
    /// version for version-gated fields.
    fn serialize_detail(&self, record: &Record, view: View, version: ApiVersion) -> Result<Bytes>;
}

/// serde_json serializer producing the catalog's REST payloads.
///
/// Field names are snake_case; absent optional fields are omitted rather than
/// emitted as `null`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl RecordSerializer for JsonSerializer {
    fn serialize_listing(&self, records: &[Record], view: View) -> Result<Bytes> {
        let encoded = match view {
            View::Authors => {
                let projected = records
                    .iter()
                    .map(|record| author_under_view(record, view))
                    .collect::<Result<Vec<_>>>()?;
                serde_json::to_vec(&projected)
            }
            View::Books => {
                let projected = records
                    .iter()
                    .map(|record| book_under_view(record, view))
                    // Listings carry no version, so gated fields stay visible.
                    .map(|book| book.map(|b| project_book(b, true)))
                    .collect::<Result<Vec<_>>>()?;
                serde_json::to_vec(&projected)
            }
        }
        .map_err(|e| Error::Serialization(format!("Failed to encode {} listing: {}", view, e)))?;

        Ok(Bytes::from(encoded))
    }

    fn serialize_detail(&self, record: &Record, view: View, version: ApiVersion) -> Result<Bytes> {
        let encoded = match view {
            View::Authors => {
                let author = author_under_view(record, view)?;
                serde_json::to_vec(&author)
            }
            View::Books => {
                let book = book_under_view(record, view)?;
                let include_comment = version >= BookRecord::COMMENT_SINCE;
                serde_json::to_vec(&project_book(book, include_comment))
            }
        }
        .map_err(|e| {
            Error::Serialization(format!(
                "Failed to encode {} detail for id {}: {}",
                view,
                record.id(),
                e
            ))
        })?;

        Ok(Bytes::from(encoded))
    }
}

fn author_under_view<'a>(record: &'a Record, view: View) -> Result<AuthorView<'a>> {
    match record {
        Record::Author(author) => Ok(project_author(author)),
        Record::Book(_) => Err(Error::Serialization(format!(
            "book record cannot render under the {} view",
            view
        ))),
    }
}

fn book_under_view<'a>(record: &'a Record, view: View) -> Result<&'a BookRecord> {
    match record {
        Record::Book(book) => Ok(book),
        Record::Author(_) => Err(Error::Serialization(format!(
            "author record cannot render under the {} view",
            view
        ))),
    }
}

fn project_author(author: &AuthorRecord) -> AuthorView<'_> {
    AuthorView {
        id: author.id,
        last_name: &author.last_name,
        first_name: author.first_name.as_deref(),
        books: author
            .books
            .iter()
            .map(|book| BookSummaryView {
                id: book.id,
                title: &book.title,
                cover_text: &book.cover_text,
            })
            .collect(),
    }
}

fn project_book(book: &BookRecord, include_comment: bool) -> BookView<'_> {
    BookView {
        id: book.id,
        title: &book.title,
        cover_text: &book.cover_text,
        comment: if include_comment {
            book.comment.as_deref()
        } else {
            None
        },
        author: book.author.as_ref().map(|author| AuthorSummaryView {
            id: author.id,
            last_name: &author.last_name,
            first_name: author.first_name.as_deref(),
        }),
    }
}

#[derive(Serialize)]
struct AuthorView<'a> {
    id: i64,
    last_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    first_name: Option<&'a str>,
    books: Vec<BookSummaryView<'a>>,
}

#[derive(Serialize)]
struct BookSummaryView<'a> {
    id: i64,
    title: &'a str,
    cover_text: &'a str,
}

#[derive(Serialize)]
struct BookView<'a> {
    id: i64,
    title: &'a str,
    cover_text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    comment: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    author: Option<AuthorSummaryView<'a>>,
}

#[derive(Serialize)]
struct AuthorSummaryView<'a> {
    id: i64,
    last_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    first_name: Option<&'a str>,
}
