//! Typed, namespace-scoped access to an `ObjectStore`.

use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use crate::model::Resource;
use crate::resilience::timeouts::with_deadline;
use crate::store::{ObjectKey, ObjectStore, StoreError, StoreResult};

/// Typed handle over objects of one kind in one namespace.
pub struct Api<T> {
    store: Arc<dyn ObjectStore>,
    namespace: String,
    deadline: Duration,
    _kind: PhantomData<fn() -> T>,
}

impl<T> Clone for Api<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            namespace: self.namespace.clone(),
            deadline: self.deadline,
            _kind: PhantomData,
        }
    }
}

impl<T: Resource> Api<T> {
    pub fn new(store: Arc<dyn ObjectStore>, namespace: &str, deadline: Duration) -> Self {
        Self {
            store,
            namespace: namespace.to_string(),
            deadline,
            _kind: PhantomData,
        }
    }

    fn key(&self, name: &str) -> ObjectKey {
        ObjectKey::new(T::KIND, &self.namespace, name)
    }

    pub async fn get(&self, name: &str) -> StoreResult<T> {
        let key = self.key(name);
        let value = with_deadline(self.deadline, self.store.get(&key)).await??;
        Ok(serde_json::from_value(value)?)
    }

    /// Like `get`, mapping NotFound to `None`.
    pub async fn get_opt(&self, name: &str) -> StoreResult<Option<T>> {
        match self.get(name).await {
            Ok(object) => Ok(Some(object)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn list(&self, selector: &BTreeMap<String, String>) -> StoreResult<Vec<T>> {
        let values = with_deadline(
            self.deadline,
            self.store.list(T::KIND, &self.namespace, selector),
        )
        .await??;

        values
            .into_iter()
            .map(|v| serde_json::from_value(v).map_err(StoreError::from))
            .collect()
    }

    pub async fn create(&self, object: &T) -> StoreResult<T> {
        let key = self.key(&object.meta().name);
        let value = serde_json::to_value(object)?;
        let stored = with_deadline(self.deadline, self.store.create(&key, value)).await??;
        Ok(serde_json::from_value(stored)?)
    }

    /// Writes `object` back. Fails with `Conflict` if its resource version
    /// is stale.
    pub async fn update(&self, object: &T) -> StoreResult<T> {
        let key = self.key(&object.meta().name);
        let value = serde_json::to_value(object)?;
        let stored = with_deadline(self.deadline, self.store.update(&key, value)).await??;
        Ok(serde_json::from_value(stored)?)
    }

    pub async fn delete(&self, name: &str) -> StoreResult<()> {
        let key = self.key(name);
        with_deadline(self.deadline, self.store.delete(&key)).await?
    }
}
