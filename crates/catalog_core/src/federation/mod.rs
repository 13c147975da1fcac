//! Federated querying across registered stores.
//!
//! # Responsibility
//! - Own the ordered processor registry.
//! - Fan each catalog question out to both store kinds and merge on `id`.
//! - Report which backend calls succeeded alongside the merged answer.

pub mod engine;
mod merge;
pub mod outcome;

pub use engine::FederatedQueryEngine;
pub use outcome::{BackendOutcome, FederatedResult, OutcomeStatus};
