//! Store locator parsing.
//!
//! # Responsibility
//! - Classify one configuration string as a local relational file or a
//!   remote SPARQL endpoint.
//!
//! # Invariants
//! - Parsing never opens a connection or touches the filesystem.
//! - Strings matching neither shape are rejected with `LocatorError`.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use url::Url;

/// File suffixes recognized as local SQLite stores.
pub const RELATIONAL_SUFFIXES: &[&str] = &[".db", ".sqlite", ".sqlite3"];

/// Backend target selected by one configuration string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocator {
    /// Local SQLite file.
    Relational(PathBuf),
    /// Remote SPARQL query endpoint.
    TripleStore(Url),
}

impl StoreLocator {
    /// Parses a locator string.
    ///
    /// A URL with scheme and host wins over suffix matching, so
    /// `http://host/catalog.db` is an endpoint. `file:` URLs become local
    /// paths and must carry a relational suffix.
    pub fn parse(value: &str) -> Result<Self, LocatorError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(LocatorError::Empty);
        }

        if let Ok(url) = Url::parse(trimmed) {
            if url.scheme() == "file" {
                return relational_file_url(&url)
                    .ok_or_else(|| LocatorError::Unrecognized(trimmed.to_string()));
            }
            if url.host_str().is_some_and(|host| !host.is_empty()) {
                return Ok(Self::TripleStore(url));
            }
        }

        if has_relational_suffix(trimmed) {
            return Ok(Self::Relational(PathBuf::from(trimmed)));
        }

        Err(LocatorError::Unrecognized(trimmed.to_string()))
    }

    /// Short backend label used in log events.
    pub fn backend_name(&self) -> &'static str {
        match self {
            Self::Relational(_) => "relational",
            Self::TripleStore(_) => "triplestore",
        }
    }
}

impl Display for StoreLocator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Relational(path) => write!(f, "{}", path.display()),
            Self::TripleStore(url) => write!(f, "{url}"),
        }
    }
}

/// Configuration error for unusable locator strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocatorError {
    Empty,
    Unrecognized(String),
}

impl Display for LocatorError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "store locator cannot be empty"),
            Self::Unrecognized(value) => write!(
                f,
                "store locator `{value}` is neither a {} file nor a URL with scheme and host",
                RELATIONAL_SUFFIXES.join("|")
            ),
        }
    }
}

impl Error for LocatorError {}

fn relational_file_url(url: &Url) -> Option<StoreLocator> {
    let path = url.to_file_path().ok()?;
    let text = path.to_str()?;
    has_relational_suffix(text).then(|| StoreLocator::Relational(path.clone()))
}

fn has_relational_suffix(value: &str) -> bool {
    RELATIONAL_SUFFIXES.iter().any(|suffix| {
        value
            .strip_suffix(suffix)
            .is_some_and(|stem| !stem.is_empty() && !stem.ends_with(['/', '\\']))
    })
}
