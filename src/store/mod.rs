//! Object store client subsystem.
//!
//! # Data Flow
//! ```text
//! manager operation
//!     → Api<T> (typed facade, namespace scoped, deadline per call)
//!     → dyn ObjectStore (JSON documents keyed by kind/namespace/name)
//!     → MemoryStore (DashMap + optional JSON file) or any remote store
//! ```
//!
//! # Design Decisions
//! - The store works on `serde_json::Value` so the trait stays object safe
//! - Every write bumps `metadata.resourceVersion`; stale writes fail with
//!   `StoreError::Conflict` and callers decide whether to retry
//! - Two handles: `cached` for writes and generic reads, `live` for
//!   replica state that must never be stale

pub mod api;
pub mod memory;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::resilience::timeouts::DeadlineExceeded;

pub use api::Api;
pub use memory::MemoryStore;

/// Address of one stored object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectKey {
    pub kind: String,
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    pub fn new(kind: &str, namespace: &str, name: &str) -> Self {
        Self {
            kind: kind.to_string(),
            namespace: namespace.to_string(),
            name: name.to_string(),
        }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.kind, self.namespace, self.name)
    }
}

/// Errors returned by object store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{kind} \"{name}\" not found")]
    NotFound { kind: String, name: String },

    #[error("{kind} \"{name}\" already exists")]
    AlreadyExists { kind: String, name: String },

    /// The object changed between read and write.
    #[error("{kind} \"{name}\" was modified concurrently")]
    Conflict { kind: String, name: String },

    #[error("invalid object: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Deadline(#[from] DeadlineExceeded),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn not_found(key: &ObjectKey) -> Self {
        StoreError::NotFound {
            kind: key.kind.clone(),
            name: key.name.clone(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Storage backend for control-plane objects.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn get(&self, key: &ObjectKey) -> StoreResult<Value>;

    /// Objects of `kind` in `namespace` whose labels contain `selector`.
    async fn list(
        &self,
        kind: &str,
        namespace: &str,
        selector: &BTreeMap<String, String>,
    ) -> StoreResult<Vec<Value>>;

    async fn create(&self, key: &ObjectKey, object: Value) -> StoreResult<Value>;

    async fn update(&self, key: &ObjectKey, object: Value) -> StoreResult<Value>;

    async fn delete(&self, key: &ObjectKey) -> StoreResult<()>;
}

/// The pair of store handles a manager works with.
#[derive(Clone)]
pub struct StoreHandles {
    /// Source of instance reads and target of all writes.
    pub cached: Arc<dyn ObjectStore>,
    /// Uncached view for replica status and purge fan-out.
    pub live: Arc<dyn ObjectStore>,
}

impl StoreHandles {
    pub fn new(cached: Arc<dyn ObjectStore>, live: Arc<dyn ObjectStore>) -> Self {
        Self { cached, live }
    }

    /// Uses one backend for both handles.
    pub fn single(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            cached: store.clone(),
            live: store,
        }
    }
}
