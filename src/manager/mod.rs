//! Instance configuration and lifecycle manager.
//!
//! # Data Flow
//! ```text
//! Reads:   store → values.rs (resolve references) → facet manager → caller
//! Writes:  caller → validate → fresh read → merge → write back
//!                                   ↑                  │
//!                                   └── stale version ─┘ (retried with backoff)
//!
//! Live reads (status.rs, purge.rs) go to the uncached store handle.
//! ```
//!
//! # Design Decisions
//! - The instance is the unit of mutation; every facet edit rewrites it whole
//! - Validation happens before the first write, so domain errors never leave
//!   partial state behind
//! - Configuration (flavors, team affinity) is injected and immutable for the
//!   lifetime of a `Manager`; reloads build a new one

pub mod blocks;
pub mod certificates;
pub mod error;
pub mod files;
pub mod instances;
pub mod paths;
pub mod plans;
pub mod purge;
pub mod routes;
pub mod status;
pub mod values;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{ControlPlaneConfig, RetryConfig, RpaasConfig};
use crate::model::{Instance, Resource};
use crate::nginx::CachePurger;
use crate::resilience::retries::retry_if;
use crate::store::{Api, StoreHandles};

pub use blocks::ConfigurationBlock;
pub use certificates::CertificateData;
pub use error::{ManagerError, ManagerResult};
pub use files::File;
pub use instances::{BindAppArgs, CreateArgs, InstanceInfo, UpdateInstanceArgs};
pub use purge::PurgeCacheArgs;
pub use routes::Route;
pub use status::{ReplicaStatus, ReplicaStatusMap};

/// Entry point for every instance operation.
#[derive(Clone)]
pub struct Manager {
    stores: StoreHandles,
    config: Arc<RpaasConfig>,
    purger: Arc<dyn CachePurger>,
    retries: RetryConfig,
    store_timeout: Duration,
    purge_concurrency: usize,
}

impl Manager {
    pub fn new(stores: StoreHandles, config: Arc<RpaasConfig>, purger: Arc<dyn CachePurger>) -> Self {
        Self {
            stores,
            config,
            purger,
            retries: RetryConfig::default(),
            store_timeout: Duration::from_secs(5),
            purge_concurrency: 16,
        }
    }

    /// Build a manager from a full process configuration.
    pub fn from_config(
        stores: StoreHandles,
        config: &ControlPlaneConfig,
        purger: Arc<dyn CachePurger>,
    ) -> Self {
        Self::new(stores, Arc::new(config.rpaas.clone()), purger)
            .with_retries(config.retries.clone())
            .with_store_timeout(Duration::from_millis(config.store.operation_timeout_ms))
            .with_purge_concurrency(config.purge.max_concurrency)
    }

    /// Same stores and purger under a freshly loaded configuration.
    pub fn reconfigured(&self, config: &ControlPlaneConfig) -> Self {
        Self::from_config(self.stores.clone(), config, self.purger.clone())
    }

    pub fn with_retries(mut self, retries: RetryConfig) -> Self {
        self.retries = retries;
        self
    }

    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    pub fn with_purge_concurrency(mut self, limit: usize) -> Self {
        self.purge_concurrency = limit.max(1);
        self
    }

    pub fn config(&self) -> &RpaasConfig {
        &self.config
    }

    pub(crate) fn namespace(&self) -> &str {
        &self.config.namespace
    }

    /// Cached handle: instance reads and every write.
    pub(crate) fn api<T: Resource>(&self) -> Api<T> {
        Api::new(self.stores.cached.clone(), self.namespace(), self.store_timeout)
    }

    /// Uncached handle for replica state.
    pub(crate) fn live_api<T: Resource>(&self) -> Api<T> {
        Api::new(self.stores.live.clone(), self.namespace(), self.store_timeout)
    }

    pub async fn get_instance(&self, name: &str) -> ManagerResult<Instance> {
        self.api::<Instance>()
            .get_opt(name)
            .await?
            .ok_or_else(|| ManagerError::instance_not_found(name))
    }

    /// Run `op` again while it fails on a stale write.
    pub(crate) async fn with_write_retries<T, F, Fut>(&self, op: F) -> ManagerResult<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = ManagerResult<T>>,
    {
        retry_if(&self.retries, |e: &ManagerError| e.is_write_conflict(), op)
            .await
            .map_err(|e| match e {
                ManagerError::Store(inner) if inner.is_conflict() => {
                    ManagerError::Transient(inner.to_string())
                }
                other => other,
            })
    }

    /// Fresh read, in-memory merge, write back. `mutate` may run more than
    /// once and must not have side effects beyond the instance it is given.
    pub(crate) async fn mutate_instance<F>(&self, name: &str, mutate: F) -> ManagerResult<Instance>
    where
        F: Fn(&mut Instance) -> ManagerResult<()> + Send + Sync,
    {
        let mutate = &mutate;
        self.with_write_retries(|attempt| async move {
            let mut instance = self.get_instance(name).await?;
            mutate(&mut instance)?;
            if attempt > 1 {
                tracing::warn!(instance = %name, attempt, "Retrying instance update after conflict");
            }
            Ok(self.api::<Instance>().update(&instance).await?)
        })
        .await
    }

    /// Update the named object of kind `T`, creating it from `init` when
    /// missing.
    pub(crate) async fn upsert<T, I, F>(&self, name: &str, init: I, mutate: F) -> ManagerResult<T>
    where
        T: Resource,
        I: Fn() -> T + Send + Sync,
        F: Fn(&mut T) -> ManagerResult<()> + Send + Sync,
    {
        let api = self.api::<T>();
        let (api, init, mutate) = (&api, &init, &mutate);
        self.with_write_retries(|_| async move {
            match api.get_opt(name).await? {
                Some(mut object) => {
                    mutate(&mut object)?;
                    Ok(api.update(&object).await?)
                }
                None => {
                    let mut object = init();
                    mutate(&mut object)?;
                    Ok(api.create(&object).await?)
                }
            }
        })
        .await
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn test_get_instance_not_found() {
        let store = MemoryStore::new(None);
        let err = manager(&store).get_instance("not-found-instance").await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "rpaas instance \"not-found-instance\" not found");
    }

    #[tokio::test]
    async fn test_mutation_errors_leave_instance_untouched() {
        let store = MemoryStore::new(None);
        seed(&store, &[instance("my-instance")]);
        let mgr = manager(&store);
        let before = mgr.get_instance("my-instance").await.unwrap();

        let err = mgr
            .mutate_instance("my-instance", |i| {
                i.spec.host = "changed".into();
                Err(ManagerError::validation("nope"))
            })
            .await
            .unwrap_err();
        assert!(err.is_validation());

        assert_eq!(mgr.get_instance("my-instance").await.unwrap(), before);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_mutations_are_not_lost() {
        let store = MemoryStore::new(None);
        seed(&store, &[instance("my-instance")]);
        let mgr = manager(&store).with_retries(RetryConfig {
            max_attempts: 50,
            base_delay_ms: 1,
            max_delay_ms: 2,
        });

        let mut tasks = tokio::task::JoinSet::new();
        for i in 0..10 {
            let mgr = mgr.clone();
            tasks.spawn(async move {
                mgr.mutate_instance("my-instance", move |inst| {
                    let labels = &mut inst.metadata.labels;
                    labels.insert(format!("writer-{}", i), "done".to_string());
                    Ok(())
                })
                .await
            });
        }
        while let Some(res) = tasks.join_next().await {
            res.unwrap().unwrap();
        }

        let stored = mgr.get_instance("my-instance").await.unwrap();
        assert_eq!(stored.metadata.labels.len(), 10);
    }

    #[tokio::test]
    async fn test_slow_store_surfaces_timeout() {
        let inner = MemoryStore::new(None);
        seed(&inner, &[instance("my-instance")]);
        let mgr = faulty_manager(FaultyStore {
            inner,
            get_delay: Duration::from_millis(200),
            ..Default::default()
        })
        .with_store_timeout(Duration::from_millis(20));

        let err = mgr.get_instance("my-instance").await.unwrap_err();
        assert!(matches!(err, ManagerError::Timeout(d) if d == Duration::from_millis(20)));

        let err = mgr
            .update_block(
                "my-instance",
                ConfigurationBlock {
                    name: "server".into(),
                    content: "listen 8080;".into(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ManagerError::Timeout(_)));
    }
}
