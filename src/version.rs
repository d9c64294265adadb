//! API version resolution for detail responses.
//!
//! Clients declare the version they want through a media-type parameter on the
//! `Accept` header, e.g. `application/json; version=2.0`. The resolved version
//! drives which version-gated fields the serializer emits.

use std::fmt;

/// An API version declared by a client, ordered by `(major, minor)`.
///
/// Parsing is lenient: `"2"` reads as `2.0`. Anything that does not start
/// with a numeric major component is rejected and the caller falls back to
/// its default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ApiVersion {
    major: u16,
    minor: u16,
}

impl ApiVersion {
    /// The version assumed when a request declares nothing.
    pub const DEFAULT: ApiVersion = ApiVersion::new(1, 0);

    pub const fn new(major: u16, minor: u16) -> Self {
        ApiVersion { major, minor }
    }

    /// Parse `"2.0"` or `"2"`; `None` if the input is not a version.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let (major, minor) = match raw.split_once('.') {
            Some((major, minor)) => (major, minor),
            None => (raw, "0"),
        };
        Some(ApiVersion {
            major: major.trim().parse().ok()?,
            minor: minor.trim().parse().ok()?,
        })
    }

    pub fn major(&self) -> u16 {
        self.major
    }

    pub fn minor(&self) -> u16 {
        self.minor
    }
}

impl Default for ApiVersion {
    fn default() -> Self {
        ApiVersion::DEFAULT
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Resolves the API version a request declares.
///
/// Scans the `;`-separated parameters of an `Accept`-style header value for a
/// `version=<v>` parameter. A missing header, a missing parameter or an
/// unparsable value all resolve to the configured default, never an error.
///
/// # Example
///
/// ```ignore
/// use catalog_cache::{ApiVersion, ResponseVersioner};
///
/// let versioner = ResponseVersioner::new(ApiVersion::new(1, 0));
/// let v = versioner.resolve(Some("application/json; version=2.0"));
/// assert_eq!(v, ApiVersion::new(2, 0));
/// ```
#[derive(Debug, Clone)]
pub struct ResponseVersioner {
    default_version: ApiVersion,
}

impl ResponseVersioner {
    pub fn new(default_version: ApiVersion) -> Self {
        ResponseVersioner { default_version }
    }

    /// Resolve the declared version from an `Accept` header value.
    pub fn resolve(&self, accept: Option<&str>) -> ApiVersion {
        let Some(header) = accept else {
            return self.default_version;
        };
        for part in header.split(';') {
            if let Some((name, value)) = part.split_once('=') {
                if name.trim() == "version" {
                    let resolved = ApiVersion::parse(value).unwrap_or(self.default_version);
                    debug!("Resolved API version {} from Accept header", resolved);
                    return resolved;
                }
            }
        }
        self.default_version
    }

    pub fn default_version(&self) -> ApiVersion {
        self.default_version
    }
}

impl Default for ResponseVersioner {
    fn default() -> Self {
        ResponseVersioner::new(ApiVersion::DEFAULT)
    }
}
