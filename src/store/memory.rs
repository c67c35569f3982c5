//! In-memory object store with optional JSON persistence.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::Resource;
use crate::observability::metrics;
use crate::store::{ObjectKey, ObjectStore, StoreError, StoreResult};

/// On-disk representation of one stored object.
#[derive(Serialize, Deserialize)]
struct PersistedObject {
    key: ObjectKey,
    object: Value,
}

/// A thread-safe object store.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<DashMap<ObjectKey, Value>>,
    version: Arc<AtomicU64>,
    persistence_path: Option<PathBuf>,
}

impl MemoryStore {
    pub fn new(persistence_path: Option<PathBuf>) -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
            version: Arc::new(AtomicU64::new(0)),
            persistence_path,
        }
    }

    /// Load from file if it exists; the file becomes the save target.
    pub fn load_from_file(path: &Path) -> std::io::Result<Self> {
        let store = Self::new(Some(path.to_path_buf()));
        if path.exists() {
            let reader = BufReader::new(File::open(path)?);
            let objects: Vec<PersistedObject> = serde_json::from_reader(reader)?;

            let mut highest = 0;
            for entry in objects {
                highest = highest.max(resource_version(&entry.object).unwrap_or(0));
                store.inner.insert(entry.key, entry.object);
            }
            store.version.store(highest, Ordering::SeqCst);
            tracing::info!(objects = store.inner.len(), path = ?path, "Loaded objects from store file");
        }
        Ok(store)
    }

    /// Save to the persistence file, if one is configured.
    pub fn save_to_file(&self) -> std::io::Result<()> {
        if let Some(path) = &self.persistence_path {
            let mut objects: Vec<PersistedObject> = self
                .inner
                .iter()
                .map(|r| PersistedObject {
                    key: r.key().clone(),
                    object: r.value().clone(),
                })
                .collect();
            objects.sort_by(|a, b| a.key.cmp(&b.key));

            let writer = BufWriter::new(File::create(path)?);
            serde_json::to_writer(writer, &objects)?;
            tracing::info!(objects = objects.len(), path = ?path, "Saved objects to store file");
        }
        Ok(())
    }

    /// Inserts or replaces a typed object without version checks.
    pub fn seed<T: Resource>(&self, object: &T) -> StoreResult<()> {
        let meta = object.meta();
        let key = ObjectKey::new(T::KIND, &meta.namespace, &meta.name);
        let mut value = serde_json::to_value(object)?;
        set_resource_version(&mut value, self.next_version());
        self.inner.insert(key, value);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    fn next_version(&self) -> u64 {
        self.version.fetch_add(1, Ordering::SeqCst) + 1
    }
}

fn resource_version(object: &Value) -> Option<u64> {
    object
        .get("metadata")
        .and_then(|m| m.get("resourceVersion"))
        .and_then(Value::as_u64)
}

fn set_resource_version(object: &mut Value, version: u64) {
    if let Some(meta) = object.get_mut("metadata").and_then(Value::as_object_mut) {
        meta.insert("resourceVersion".to_string(), Value::from(version));
    }
}

fn labels_match(object: &Value, selector: &BTreeMap<String, String>) -> bool {
    let labels = object.get("metadata").and_then(|m| m.get("labels"));
    selector.iter().all(|(k, v)| {
        labels
            .and_then(|l| l.get(k))
            .and_then(Value::as_str)
            .map(|l| l == v)
            .unwrap_or(false)
    })
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn get(&self, key: &ObjectKey) -> StoreResult<Value> {
        self.inner
            .get(key)
            .map(|r| r.value().clone())
            .ok_or_else(|| StoreError::not_found(key))
    }

    async fn list(
        &self,
        kind: &str,
        namespace: &str,
        selector: &BTreeMap<String, String>,
    ) -> StoreResult<Vec<Value>> {
        let mut found: Vec<(String, Value)> = self
            .inner
            .iter()
            .filter(|r| r.key().kind == kind && r.key().namespace == namespace)
            .filter(|r| labels_match(r.value(), selector))
            .map(|r| (r.key().name.clone(), r.value().clone()))
            .collect();
        found.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(found.into_iter().map(|(_, v)| v).collect())
    }

    async fn create(&self, key: &ObjectKey, mut object: Value) -> StoreResult<Value> {
        match self.inner.entry(key.clone()) {
            Entry::Occupied(_) => Err(StoreError::AlreadyExists {
                kind: key.kind.clone(),
                name: key.name.clone(),
            }),
            Entry::Vacant(slot) => {
                set_resource_version(&mut object, self.next_version());
                slot.insert(object.clone());
                metrics::record_store_write(&key.kind, "create");
                Ok(object)
            }
        }
    }

    async fn update(&self, key: &ObjectKey, mut object: Value) -> StoreResult<Value> {
        match self.inner.entry(key.clone()) {
            Entry::Vacant(_) => Err(StoreError::not_found(key)),
            Entry::Occupied(mut slot) => {
                let incoming = resource_version(&object);
                if incoming.is_some() && incoming != resource_version(slot.get()) {
                    metrics::record_store_conflict(&key.kind);
                    return Err(StoreError::Conflict {
                        kind: key.kind.clone(),
                        name: key.name.clone(),
                    });
                }
                set_resource_version(&mut object, self.next_version());
                slot.insert(object.clone());
                metrics::record_store_write(&key.kind, "update");
                Ok(object)
            }
        }
    }

    async fn delete(&self, key: &ObjectKey) -> StoreResult<()> {
        self.inner
            .remove(key)
            .map(|_| metrics::record_store_write(&key.kind, "delete"))
            .ok_or_else(|| StoreError::not_found(key))
    }
}
