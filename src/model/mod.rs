//! Object model shared by the store, the managers and the API.
//!
//! # Data Flow
//! ```text
//! Instance (declarative root)
//!     ├── blocks      → ValueSource (inline | config map key)
//!     ├── locations   → ordered Location list
//!     ├── certificates→ TlsSecret index → Secret "<instance>-certificates"
//!     └── extra_files → FilesRef index  → ConfigMap "<instance>-extra-files-<hex>"
//!
//! Live objects (written by the runtime, read-only here):
//!     Workload → pods / services → Replica, Service, Event
//! ```
//!
//! # Design Decisions
//! - Every stored type carries an `ObjectMeta` and implements `Resource`
//! - Optional collections serialize as absent, never as empty containers
//! - Wire names are camelCase

pub mod instance;
pub mod live;
pub mod meta;
pub mod plan;
pub mod resources;

pub use instance::{
    Affinity, BlockType, ConfigMapKeySelector, FilesRef, Instance, InstanceSpec, Location,
    NodeAffinity, NodeSelectorRequirement, NodeSelectorTerm, PodTemplate, ServiceTemplate,
    TlsSecret, TlsSecretItem, ValueSource,
};
pub use live::{
    ContainerStatus, Event, EventSource, InvolvedObject, LoadBalancerIngress, Replica, Service,
    ServiceType, Workload, WorkloadStatus,
};
pub use meta::{ObjectMeta, Resource};
pub use plan::{Plan, PlanSpec, ProxyTuning, ResourceLimits};
pub use resources::{ConfigMap, Secret};
