//! Per-backend outcome reporting for federated calls.

use crate::backend::{QueryProcessor, StoreError};

/// Result of one backend call inside a federated query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutcomeStatus {
    /// Call succeeded and contributed this many rows.
    Rows(usize),
    /// Call failed; its contribution was excluded from the merge.
    Failed(String),
}

/// One backend call made while answering a federated query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendOutcome {
    pub backend: &'static str,
    pub target: String,
    pub op: &'static str,
    pub status: OutcomeStatus,
}

impl BackendOutcome {
    pub(crate) fn rows(processor: &QueryProcessor, op: &'static str, count: usize) -> Self {
        Self {
            backend: processor.backend_name(),
            target: processor.target(),
            op,
            status: OutcomeStatus::Rows(count),
        }
    }

    pub(crate) fn failed(processor: &QueryProcessor, op: &'static str, err: &StoreError) -> Self {
        Self {
            backend: processor.backend_name(),
            target: processor.target(),
            op,
            status: OutcomeStatus::Failed(err.to_string()),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.status, OutcomeStatus::Failed(_))
    }
}

/// Federated answer plus the backend calls that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FederatedResult<T> {
    pub value: T,
    pub outcomes: Vec<BackendOutcome>,
}

impl<T> FederatedResult<T> {
    /// Returns whether at least one backend call failed.
    pub fn is_partial(&self) -> bool {
        self.outcomes.iter().any(BackendOutcome::is_failure)
    }

    pub fn failures(&self) -> impl Iterator<Item = &BackendOutcome> {
        self.outcomes.iter().filter(|outcome| outcome.is_failure())
    }

    pub fn into_value(self) -> T {
        self.value
    }
}
