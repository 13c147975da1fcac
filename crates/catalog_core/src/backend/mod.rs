//! Backend-specific query processors.
//!
//! # Responsibility
//! - Talk to each store in its native query language.
//! - Return typed, normalized rows or a `StoreError`.
//!
//! # Invariants
//! - The set of backend kinds is closed: relational and triple store.
//! - Processors hold only their target; connections are per call.

use crate::db::DbError;
use crate::locator::StoreLocator;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

pub mod relational;
pub mod sparql;
pub mod triplestore;

pub use relational::{AnnotationRow, EntityRow, ImageRow, RelationalProcessor};
pub use sparql::{HttpSparqlTransport, SparqlBinding, SparqlResults, SparqlTransport};
pub use triplestore::{escape_literal, GraphQuery, GraphRow, TripleStoreProcessor};

pub type StoreResult<T> = Result<T, StoreError>;

/// Failure raised by one backend call.
#[derive(Debug)]
pub enum StoreError {
    /// SQLite open/schema/query failure.
    Db(DbError),
    /// Endpoint unreachable, timed out, or the body could not be read.
    Transport(String),
    /// Endpoint answered with a non-success status.
    Endpoint { status: u16, body: String },
    /// Response lacked an expected column or could not be decoded.
    MalformedResult(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Transport(message) => write!(f, "store unreachable: {message}"),
            Self::Endpoint { status, body } => {
                write!(f, "endpoint returned status {status}: {body}")
            }
            Self::MalformedResult(message) => write!(f, "malformed query result: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Transport(_) => None,
            Self::Endpoint { .. } => None,
            Self::MalformedResult(_) => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// One registered backend, tagged by capability.
#[derive(Clone)]
pub enum QueryProcessor {
    Relational(RelationalProcessor),
    TripleStore(TripleStoreProcessor),
}

impl QueryProcessor {
    /// Builds the processor matching `locator`.
    ///
    /// Triple-store processors use `transport` for every SELECT.
    pub fn from_locator(locator: StoreLocator, transport: Arc<dyn SparqlTransport>) -> Self {
        match locator {
            StoreLocator::Relational(path) => Self::Relational(RelationalProcessor::new(path)),
            StoreLocator::TripleStore(endpoint) => {
                Self::TripleStore(TripleStoreProcessor::new(endpoint, transport))
            }
        }
    }

    /// Short backend label used in log events and outcome reports.
    pub fn backend_name(&self) -> &'static str {
        match self {
            Self::Relational(_) => "relational",
            Self::TripleStore(_) => "triplestore",
        }
    }

    /// Path or endpoint this processor targets.
    pub fn target(&self) -> String {
        match self {
            Self::Relational(processor) => processor.db_path().display().to_string(),
            Self::TripleStore(processor) => processor.endpoint().to_string(),
        }
    }
}

impl std::fmt::Debug for QueryProcessor {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryProcessor")
            .field("backend", &self.backend_name())
            .field("target", &self.target())
            .finish()
    }
}

impl From<RelationalProcessor> for QueryProcessor {
    fn from(value: RelationalProcessor) -> Self {
        Self::Relational(value)
    }
}

impl From<TripleStoreProcessor> for QueryProcessor {
    fn from(value: TripleStoreProcessor) -> Self {
        Self::TripleStore(value)
    }
}
