//! Live objects reported by the runtime that serves an instance.

use serde::{Deserialize, Serialize};

use crate::model::meta::{impl_resource, ObjectMeta};

/// The replica set backing an instance. Shares the instance's name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workload {
    pub metadata: ObjectMeta,

    #[serde(default)]
    pub status: WorkloadStatus,
}

impl_resource!(Workload, "Nginx");

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkloadStatus {
    /// Names of the replicas currently scheduled.
    pub pods: Vec<String>,

    /// Names of the services exposing the replicas.
    pub services: Vec<String>,
}

/// One running replica of the proxy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Replica {
    pub metadata: ObjectMeta,

    #[serde(default)]
    pub ip: String,

    #[serde(default)]
    pub containers: Vec<ContainerStatus>,
}

impl_resource!(Replica, "Pod");

impl Replica {
    /// A replica is ready when every container reports ready.
    pub fn is_ready(&self) -> bool {
        self.containers.iter().all(|c| c.ready)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerStatus {
    pub name: String,

    pub ready: bool,
}

/// A runtime event about some object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub metadata: ObjectMeta,

    pub involved_object: InvolvedObject,

    #[serde(default)]
    pub source: EventSource,

    #[serde(default)]
    pub message: String,
}

impl_resource!(Event, "Event");

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvolvedObject {
    pub kind: String,

    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EventSource {
    pub component: String,

    pub host: String,
}

/// A network service in front of the replicas.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub metadata: ObjectMeta,

    #[serde(rename = "type", default)]
    pub service_type: ServiceType,

    #[serde(rename = "clusterIP", default)]
    pub cluster_ip: String,

    #[serde(default)]
    pub ingress: Vec<LoadBalancerIngress>,
}

impl_resource!(Service, "Service");

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceType {
    #[default]
    ClusterIP,
    LoadBalancer,
    NodePort,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoadBalancerIngress {
    pub ip: String,

    pub hostname: String,
}
