//! Federated document catalog core.
//! Answers catalog questions across SQLite metadata stores and SPARQL
//! triple stores, merging both views of each entity on its identifier.

pub mod backend;
pub mod config;
pub mod db;
pub mod federation;
pub mod ingest;
pub mod locator;
pub mod logging;
pub mod model;

pub use backend::{
    HttpSparqlTransport, QueryProcessor, RelationalProcessor, SparqlTransport, StoreError,
    StoreResult, TripleStoreProcessor,
};
pub use config::{CatalogConfig, ConfigError, ConfigResult};
pub use federation::{BackendOutcome, FederatedQueryEngine, FederatedResult, OutcomeStatus};
pub use ingest::{IngestError, IngestResult};
pub use locator::{LocatorError, StoreLocator};
pub use logging::{
    active_log_target, default_log_level, init_logging, init_logging_with_config, LogTarget,
    LoggingError, LoggingResult,
};
pub use model::entity::{
    Annotation, Canvas, CatalogEntity, Collection, EntityId, EntityKind, EntityWithMetadata,
    IdentifiableEntity, Image, Manifest,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
