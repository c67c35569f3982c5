//! Manager error kinds.

use std::time::Duration;

use thiserror::Error;

use crate::store::StoreError;

/// Errors returned by manager operations.
///
/// `NotFound`, `Validation` and `Conflict` carry caller-facing messages and
/// are returned before anything is written.
#[derive(Debug, Error)]
pub enum ManagerError {
    /// A referenced instance, block, route, certificate, file or plan is missing.
    #[error("{0}")]
    NotFound(String),

    /// Malformed or contradictory input.
    #[error("{0}")]
    Validation(String),

    /// Duplicate key, no-op change or ambiguous configuration.
    #[error("{0}")]
    Conflict(String),

    /// Concurrent writers kept colliding; the caller may try again.
    #[error("temporary failure: {0}")]
    Transient(String),

    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("store error: {0}")]
    Store(StoreError),
}

impl ManagerError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        ManagerError::NotFound(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        ManagerError::Validation(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        ManagerError::Conflict(msg.into())
    }

    pub(crate) fn instance_not_found(name: &str) -> Self {
        ManagerError::NotFound(format!("rpaas instance \"{}\" not found", name))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ManagerError::NotFound(_))
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, ManagerError::Validation(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, ManagerError::Conflict(_))
    }

    /// A stale write that is worth re-reading and trying again.
    pub(crate) fn is_write_conflict(&self) -> bool {
        match self {
            ManagerError::Store(e) => {
                matches!(e, StoreError::Conflict { .. } | StoreError::AlreadyExists { .. })
            }
            ManagerError::Transient(_) => true,
            _ => false,
        }
    }
}

impl From<StoreError> for ManagerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { .. } => ManagerError::NotFound(err.to_string()),
            StoreError::Deadline(d) => ManagerError::Timeout(d.0),
            other => ManagerError::Store(other),
        }
    }
}

pub type ManagerResult<T> = Result<T, ManagerError>;
