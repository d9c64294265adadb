//! Listing cache key codec and pagination coercion.
//!
//! Keys are deterministic and human-readable. The namespace is part of the
//! observable behavior of the catalog: `"<resource>-<page>-<pageSize>"`, e.g.
//! `"authors-1-3"` or `"books-2-5"`, with a `-v<major>.<minor>` suffix when a
//! key is version-scoped.

use crate::model::ResourceType;
use crate::version::ApiVersion;
use std::fmt;

/// Page number used when the request omits or mangles `page`.
pub const DEFAULT_PAGE: u32 = 1;

/// Page size used when the request omits or mangles `limit`.
pub const DEFAULT_PAGE_SIZE: u32 = 3;

/// A validated pagination window.
///
/// Construction is lenient by policy: missing, non-numeric or non-positive
/// input falls back to the defaults instead of erroring, matching the
/// query-parameter handling of the HTTP layer this crate serves. Two requests
/// that coerce to the same window share one cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageRequest {
    page: u32,
    page_size: u32,
}

impl PageRequest {
    /// Build a window, substituting the defaults for zero values.
    pub fn new(page: u32, page_size: u32) -> Self {
        PageRequest {
            page: if page == 0 { DEFAULT_PAGE } else { page },
            page_size: if page_size == 0 { DEFAULT_PAGE_SIZE } else { page_size },
        }
    }

    /// Coerce raw query-string input.
    ///
    /// # Example
    ///
    /// ```ignore
    /// use catalog_cache::PageRequest;
    ///
    /// let page = PageRequest::from_raw(Some("2"), Some("5"));
    /// assert_eq!((page.page(), page.page_size()), (2, 5));
    ///
    /// // Garbage falls back to the defaults
    /// let page = PageRequest::from_raw(Some("abc"), Some("-1"));
    /// assert_eq!((page.page(), page.page_size()), (1, 3));
    /// ```
    pub fn from_raw(page: Option<&str>, page_size: Option<&str>) -> Self {
        PageRequest {
            page: coerce(page, DEFAULT_PAGE),
            page_size: coerce(page_size, DEFAULT_PAGE_SIZE),
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Zero-based offset of the first row in this window.
    pub fn offset(&self) -> usize {
        (self.page as usize - 1) * self.page_size as usize
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        PageRequest::new(DEFAULT_PAGE, DEFAULT_PAGE_SIZE)
    }
}

fn coerce(raw: Option<&str>, default: u32) -> u32 {
    raw.and_then(|s| s.trim().parse::<u32>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(default)
}

/// A deterministic cache key. Equal logical requests encode to equal keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for CacheKey {
    fn from(raw: String) -> Self {
        CacheKey(raw)
    }
}

impl From<&str> for CacheKey {
    fn from(raw: &str) -> Self {
        CacheKey(raw.to_string())
    }
}

/// Identity of one cached listing: resource type, window and, when a key is
/// version-scoped, the API version.
///
/// Listing keys carry no version today (listing payloads are un-versioned);
/// the slot exists so a versioned cache re-keys instead of serving mixed
/// payloads under one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListingKey {
    resource: ResourceType,
    page: PageRequest,
    version: Option<ApiVersion>,
}

impl ListingKey {
    pub fn new(resource: ResourceType, page: PageRequest) -> Self {
        ListingKey {
            resource,
            page,
            version: None,
        }
    }

    /// Scope the key to an API version.
    pub fn with_version(mut self, version: ApiVersion) -> Self {
        self.version = Some(version);
        self
    }

    /// Encode into the observable key namespace.
    ///
    /// Pure and total: same inputs, same key, for any input.
    pub fn encode(&self) -> CacheKey {
        let mut key = format!(
            "{}-{}-{}",
            self.resource.key_segment(),
            self.page.page(),
            self.page.page_size()
        );
        if let Some(version) = self.version {
            key.push_str(&format!("-v{}", version));
        }
        CacheKey(key)
    }
}
