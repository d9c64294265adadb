//! Catalog resource model: resource types, cache tags, read records and drafts.

use crate::version::ApiVersion;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Resource types served by the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceType {
    Author,
    Book,
}

impl ResourceType {
    /// Cache tag grouping every cached listing of this resource type.
    ///
    /// One tag per resource type; a mutation of the type sweeps the tag.
    pub fn tag(&self) -> Tag {
        match self {
            ResourceType::Author => Tag::new("authorsCache"),
            ResourceType::Book => Tag::new("booksCache"),
        }
    }

    /// Segment this resource contributes to listing cache keys.
    pub fn key_segment(&self) -> &'static str {
        match self {
            ResourceType::Author => "authors",
            ResourceType::Book => "books",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceType::Author => write!(f, "author"),
            ResourceType::Book => write!(f, "book"),
        }
    }
}

/// A cache tag. Entries carrying a tag are invalidated together.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tag(String);

impl Tag {
    pub fn new(name: impl Into<String>) -> Self {
        Tag(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Tag {
    fn from(name: &str) -> Self {
        Tag::new(name)
    }
}

/// Denormalized author read record, shaped for the authors view: the author's
/// books ride along as summaries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorRecord {
    pub id: i64,
    pub last_name: String,
    pub first_name: Option<String>,
    pub books: Vec<BookSummary>,
}

/// Book fields embedded in an author record. Carries no author back-reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookSummary {
    pub id: i64,
    pub title: String,
    pub cover_text: String,
}

/// Denormalized book read record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookRecord {
    pub id: i64,
    pub title: String,
    pub cover_text: String,
    /// Librarian's note. Emitted in detail payloads only from API version
    /// [`BookRecord::COMMENT_SINCE`] on.
    pub comment: Option<String>,
    /// Linked author, if any. Carries no book list.
    pub author: Option<AuthorSummary>,
}

impl BookRecord {
    /// API version that introduced the `comment` field.
    pub const COMMENT_SINCE: ApiVersion = ApiVersion::new(2, 0);
}

/// Author fields embedded in a book record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorSummary {
    pub id: i64,
    pub last_name: String,
    pub first_name: Option<String>,
}

/// A single catalog read record.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Author(AuthorRecord),
    Book(BookRecord),
}

impl Record {
    pub fn resource_type(&self) -> ResourceType {
        match self {
            Record::Author(_) => ResourceType::Author,
            Record::Book(_) => ResourceType::Book,
        }
    }

    pub fn id(&self) -> i64 {
        match self {
            Record::Author(author) => author.id,
            Record::Book(book) => book.id,
        }
    }
}

/// Fields accepted when creating or replacing an author.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthorDraft {
    pub last_name: String,
    pub first_name: Option<String>,
}

/// Fields accepted when creating or replacing a book.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookDraft {
    pub title: String,
    pub cover_text: String,
    pub comment: Option<String>,
    /// Author to link. `None` or an unknown id leaves the book unattributed.
    pub author_id: Option<i64>,
}
