//! Replica status and instance address.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::manager::error::ManagerResult;
use crate::manager::Manager;
use crate::model::{Event, Replica, Resource, Service, ServiceType, Workload};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicaStatus {
    pub running: bool,

    #[serde(default)]
    pub status: String,

    #[serde(default)]
    pub address: String,
}

/// Replica name → status.
pub type ReplicaStatusMap = BTreeMap<String, ReplicaStatus>;

fn format_event(event: &Event) -> String {
    let source = &event.source;
    if source.host.is_empty() {
        format!("{} [{}]", event.message, source.component)
    } else {
        format!("{} [{}, {}]", event.message, source.component, source.host)
    }
}

/// Distinct event lines about `replica`, in the order they were listed.
fn replica_events(events: &[Event], replica: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    for event in events
        .iter()
        .filter(|e| e.involved_object.kind == Replica::KIND && e.involved_object.name == replica)
    {
        let line = format_event(event);
        if !lines.contains(&line) {
            lines.push(line);
        }
    }
    lines.join("\n")
}

fn service_address(service: &Service) -> String {
    match service.service_type {
        ServiceType::LoadBalancer => service
            .ingress
            .first()
            .map(|ingress| {
                if ingress.ip.is_empty() {
                    ingress.hostname.clone()
                } else {
                    ingress.ip.clone()
                }
            })
            .unwrap_or_default(),
        _ => service.cluster_ip.clone(),
    }
}

impl Manager {
    /// Per-replica readiness, address and recent events, read from the
    /// live store.
    pub async fn get_instance_status(&self, instance_name: &str) -> ManagerResult<ReplicaStatusMap> {
        self.get_instance(instance_name).await?;
        let workload = self.live_api::<Workload>().get(instance_name).await?;

        let mut statuses = ReplicaStatusMap::new();
        if workload.status.pods.is_empty() {
            return Ok(statuses);
        }

        let replicas = self.live_api::<Replica>();
        let events = self.live_api::<Event>().list(&BTreeMap::new()).await?;

        for name in &workload.status.pods {
            let status = match replicas.get_opt(name).await? {
                Some(replica) => ReplicaStatus {
                    running: replica.is_ready(),
                    status: replica_events(&events, name),
                    address: replica.ip,
                },
                None => ReplicaStatus {
                    running: false,
                    status: format!("pods \"{}\" not found", name),
                    address: String::new(),
                },
            };
            statuses.insert(name.clone(), status);
        }

        tracing::debug!(instance = %instance_name, replicas = statuses.len(), "Collected instance status");
        Ok(statuses)
    }

    /// Externally reachable address, or empty while none is assigned.
    pub async fn get_instance_address(&self, instance_name: &str) -> ManagerResult<String> {
        self.get_instance(instance_name).await?;

        let Some(workload) = self.api::<Workload>().get_opt(instance_name).await? else {
            return Ok(String::new());
        };

        let services = self.api::<Service>();
        for name in &workload.status.services {
            if let Some(service) = services.get_opt(name).await? {
                return Ok(service_address(&service));
            }
        }
        Ok(String::new())
    }
}
