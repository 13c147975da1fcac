//! Catalog domain model for the collection/manifest/canvas hierarchy.
//!
//! # Responsibility
//! - Define read-only projections materialized by federated queries.
//! - Own the creators codec shared by ingestion and aggregation.
//!
//! # Invariants
//! - Every domain object is identified by an opaque, non-empty `id`.
//! - Objects are rebuilt on every query and never written back.

pub mod creators;
pub mod entity;
