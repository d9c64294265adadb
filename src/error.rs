//! Error types for catalog cache operations.

use crate::model::ResourceType;
use std::time::Duration;

/// Errors surfaced by cache reads, loads and catalog mutations.
///
/// The enum is `Clone` because a single-flight load shares its outcome with
/// every caller that joined the flight: the leader's error is handed to each
/// waiter verbatim.
///
/// Invalid pagination input is deliberately not represented here. Page and
/// page-size coercion is lenient by policy and falls back to the documented
/// defaults; see [`crate::key::PageRequest`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The data loader or a mutation collaborator failed. Nothing is cached
    /// and there are no silent retries; the next read starts a fresh load.
    #[error("data source unavailable: {0}")]
    DataUnavailable(String),

    /// A cache load exceeded the configured timeout. Shared with every
    /// caller waiting on the flight; no partial entry is stored.
    #[error("cache load timed out after {0:?}")]
    LoadTimeout(Duration),

    /// A record or listing page could not be encoded for caching.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// Detail, update or delete addressed a resource that does not exist.
    #[error("{resource} {id} not found")]
    NotFound { resource: ResourceType, id: i64 },
}

/// Convenience result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::DataUnavailable("connection refused".to_string());
        assert_eq!(err.to_string(), "data source unavailable: connection refused");

        let err = Error::NotFound {
            resource: ResourceType::Book,
            id: 42,
        };
        assert_eq!(err.to_string(), "book 42 not found");
    }

    #[test]
    fn test_error_clone_for_shared_flights() {
        let err = Error::LoadTimeout(Duration::from_secs(2));
        let shared = err.clone();
        assert_eq!(err, shared);
    }
}
