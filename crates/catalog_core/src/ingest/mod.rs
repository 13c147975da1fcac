//! Record loaders that populate the catalog stores.
//!
//! # Responsibility
//! - Accept already-parsed records and write them to one backend.
//! - Split `;`-delimited creator fields into one row per creator.
//! - Mint stable subject IRIs for triple-store entities.
//!
//! # Invariants
//! - Records are validated before any write is issued.
//! - Relational loads replace table contents inside one transaction.

use crate::backend::StoreError;
use crate::db::DbError;
use serde::de::DeserializeOwned;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod collection;
pub mod records;
pub mod relational;

pub use collection::{
    collection_triples, insert_data, mint_subject_iri, CollectionLoader, RdfTerm, Triple,
    TripleStoreCollectionLoader,
};
pub use records::{AnnotationRecord, CanvasRecord, CollectionRecord, ManifestRecord, MetadataRecord};
pub use relational::{
    AnnotationLoader, MetadataLoader, SqliteAnnotationLoader, SqliteMetadataLoader,
};

pub type IngestResult<T> = Result<T, IngestError>;

/// Ingestion failure.
#[derive(Debug)]
pub enum IngestError {
    Db(DbError),
    Store(StoreError),
    Parse(serde_json::Error),
    /// Record at `index` failed validation; nothing was written.
    InvalidRecord { index: usize, message: String },
}

impl Display for IngestError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Store(err) => write!(f, "{err}"),
            Self::Parse(err) => write!(f, "invalid record document: {err}"),
            Self::InvalidRecord { index, message } => {
                write!(f, "record {index} is invalid: {message}")
            }
        }
    }
}

impl Error for IngestError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Store(err) => Some(err),
            Self::Parse(err) => Some(err),
            Self::InvalidRecord { .. } => None,
        }
    }
}

impl From<DbError> for IngestError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for IngestError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<StoreError> for IngestError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<serde_json::Error> for IngestError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}

/// Parses a JSON array of records.
pub fn parse_records<T: DeserializeOwned>(text: &str) -> IngestResult<Vec<T>> {
    Ok(serde_json::from_str(text)?)
}

pub(crate) fn require_non_empty(index: usize, field: &str, value: &str) -> IngestResult<()> {
    if value.trim().is_empty() {
        return Err(IngestError::InvalidRecord {
            index,
            message: format!("`{field}` must not be empty"),
        });
    }
    Ok(())
}
