//! Cache purge fan-out across ready replicas.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::manager::error::{ManagerError, ManagerResult};
use crate::manager::Manager;
use crate::model::{Replica, Workload};
use crate::observability::metrics;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurgeCacheArgs {
    pub path: String,

    #[serde(default)]
    pub preserve_path: bool,
}

impl Manager {
    /// Purges `args.path` on every ready replica. Returns how many replicas
    /// acknowledged; individual failures are logged, not returned.
    pub async fn purge_cache(&self, instance_name: &str, args: PurgeCacheArgs) -> ManagerResult<usize> {
        self.get_instance(instance_name).await?;
        if args.path.is_empty() {
            return Err(ManagerError::validation("path is required"));
        }

        let addresses = self.ready_addresses(instance_name).await?;
        if addresses.is_empty() {
            return Ok(0);
        }

        let purged = Arc::new(AtomicUsize::new(0));
        let permits = Arc::new(Semaphore::new(self.purge_concurrency));
        let args = Arc::new(args);
        let mut tasks = JoinSet::new();

        for address in addresses {
            let purger = self.purger.clone();
            let purged = purged.clone();
            let permits = permits.clone();
            let args = args.clone();

            tasks.spawn(async move {
                let Ok(_permit) = permits.acquire_owned().await else {
                    return;
                };
                match purger.purge(&address, &args.path, args.preserve_path).await {
                    Ok(()) => {
                        purged.fetch_add(1, Ordering::Relaxed);
                        metrics::record_purge("success");
                    }
                    Err(e) => {
                        metrics::record_purge("failure");
                        tracing::warn!(address = %address, path = %args.path, error = %e, "Failed to purge replica cache");
                    }
                }
            });
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                tracing::warn!(error = %e, "Purge task did not complete");
            }
        }

        let purged = purged.load(Ordering::Relaxed);
        tracing::info!(instance = %instance_name, path = %args.path, purged, "Cache purged");
        Ok(purged)
    }

    /// IPs of the instance's replicas that are ready right now.
    async fn ready_addresses(&self, instance_name: &str) -> ManagerResult<Vec<String>> {
        let Some(workload) = self.live_api::<Workload>().get_opt(instance_name).await? else {
            return Ok(Vec::new());
        };

        let replicas = self.live_api::<Replica>();
        let mut addresses = Vec::new();
        for name in &workload.status.pods {
            if let Some(replica) = replicas.get_opt(name).await? {
                if replica.is_ready() && !replica.ip.is_empty() {
                    addresses.push(replica.ip);
                }
            }
        }
        Ok(addresses)
    }
}
