//! The reverse-proxy instance: the declarative root object.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::model::live::ServiceType;
use crate::model::meta::{impl_resource, ObjectMeta};
use crate::model::plan::PlanSpec;

/// A reverse-proxy instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instance {
    pub metadata: ObjectMeta,

    #[serde(default)]
    pub spec: InstanceSpec,
}

impl_resource!(Instance, "RpaasInstance");

/// Desired state of an instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InstanceSpec {
    /// Plan the instance runs with. Empty means the default plan.
    pub plan_name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i32>,

    /// Configuration fragments keyed by scope. `None` when there are none.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocks: Option<BTreeMap<BlockType, ValueSource>>,

    /// Path rules in precedence order. `None` when there are none.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locations: Option<Vec<Location>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificates: Option<TlsSecret>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra_files: Option<FilesRef>,

    /// Host of the bound application; empty when unbound.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub host: String,

    /// Flavor or plan-override fragment composed with the plan downstream.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan_template: Option<PlanSpec>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<ServiceTemplate>,

    pub pod_template: PodTemplate,
}

/// Scope a configuration block is rendered into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlockType {
    Root,
    Http,
    Server,
    LuaServer,
    LuaWorker,
}

impl BlockType {
    pub const ALL: [BlockType; 5] = [
        BlockType::Root,
        BlockType::Http,
        BlockType::Server,
        BlockType::LuaServer,
        BlockType::LuaWorker,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BlockType::Root => "root",
            BlockType::Http => "http",
            BlockType::Server => "server",
            BlockType::LuaServer => "lua-server",
            BlockType::LuaWorker => "lua-worker",
        }
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string does not name a block scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownBlockType(pub String);

impl FromStr for BlockType {
    type Err = UnknownBlockType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BlockType::ALL
            .iter()
            .copied()
            .find(|b| b.as_str() == s)
            .ok_or_else(|| UnknownBlockType(s.to_string()))
    }
}

/// A literal value or a reference to one stored elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ValueSource {
    Value(String),
    ConfigMapKeyRef(ConfigMapKeySelector),
}

impl ValueSource {
    pub fn inline(value: impl Into<String>) -> Self {
        ValueSource::Value(value.into())
    }
}

/// Points at one key of a config map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigMapKeySelector {
    pub name: String,

    pub key: String,

    /// Missing optional references resolve to an empty value.
    #[serde(default)]
    pub optional: bool,
}

/// A path rule. Carries either `content` or `destination`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Location {
    pub path: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,

    #[serde(rename = "forceHTTPS", skip_serializing_if = "std::ops::Not::not")]
    pub force_https: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<ValueSource>,
}

/// Index of the certificate pairs stored in one secret.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TlsSecret {
    pub secret_name: String,

    #[serde(default)]
    pub items: Vec<TlsSecretItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TlsSecretItem {
    pub certificate_field: String,

    pub key_field: String,
}

impl TlsSecretItem {
    /// Builds the `<name>.crt` / `<name>.key` pair for a certificate name.
    pub fn for_name(name: &str) -> Self {
        Self {
            certificate_field: format!("{}.crt", name),
            key_field: format!("{}.key", name),
        }
    }

    /// The user-facing certificate name.
    pub fn name(&self) -> &str {
        self.certificate_field
            .strip_suffix(".crt")
            .unwrap_or(&self.certificate_field)
    }
}

/// Index of extra files: storage key → logical path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilesRef {
    pub name: String,

    #[serde(default)]
    pub files: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServiceTemplate {
    #[serde(rename = "type")]
    pub service_type: ServiceType,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PodTemplate {
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub affinity: Option<Affinity>,
}

/// Scheduling constraints applied to the replicas of a team's instances.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Affinity {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_affinity: Option<NodeAffinity>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NodeAffinity {
    /// Terms are ORed; expressions inside a term are ANDed.
    pub required: Vec<NodeSelectorTerm>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NodeSelectorTerm {
    pub match_expressions: Vec<NodeSelectorRequirement>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NodeSelectorRequirement {
    pub key: String,

    pub operator: String,

    pub values: Vec<String>,
}
