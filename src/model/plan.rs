//! Plans: reusable execution profiles for instances.

use serde::{Deserialize, Serialize};

use crate::model::meta::{impl_resource, ObjectMeta};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub metadata: ObjectMeta,

    #[serde(default)]
    pub spec: PlanSpec,
}

impl_resource!(Plan, "RpaasPlan");

/// Plan body. Also used as the flavor / plan-override fragment attached to
/// an instance, where unset fields mean "inherit from the plan".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlanSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// At most one plan per namespace may set this.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub default: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    #[serde(skip_serializing_if = "ProxyTuning::is_empty")]
    pub config: ProxyTuning,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceLimits>,
}

impl PlanSpec {
    /// Overlays every field set in `other` onto `self`.
    pub fn merge(&mut self, other: &PlanSpec) {
        if other.description.is_some() {
            self.description = other.description.clone();
        }
        if other.image.is_some() {
            self.image = other.image.clone();
        }
        self.config.merge(&other.config);
        if let Some(theirs) = &other.resources {
            let ours = self.resources.get_or_insert_with(ResourceLimits::default);
            if theirs.cpu.is_some() {
                ours.cpu = theirs.cpu.clone();
            }
            if theirs.memory.is_some() {
                ours.memory = theirs.memory.clone();
            }
        }
    }
}

/// Proxy tuning knobs rendered into the generated configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProxyTuning {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_enabled: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_size: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_path: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub worker_processes: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub worker_connections: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

impl ProxyTuning {
    pub fn is_empty(&self) -> bool {
        *self == ProxyTuning::default()
    }

    fn merge(&mut self, other: &ProxyTuning) {
        macro_rules! overlay {
            ($($field:ident),*) => {
                $(if other.$field.is_some() {
                    self.$field = other.$field.clone();
                })*
            };
        }
        overlay!(cache_enabled, cache_size, cache_path, worker_processes, worker_connections, user);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResourceLimits {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<String>,
}
