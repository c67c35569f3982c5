//! Key/value objects backing references, certificates and extra files.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::meta::{impl_resource, ObjectMeta};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigMap {
    pub metadata: ObjectMeta,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub data: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub binary_data: BTreeMap<String, Vec<u8>>,
}

impl_resource!(ConfigMap, "ConfigMap");

impl ConfigMap {
    /// Looks a key up in `data`, then in `binary_data`.
    pub fn value(&self, key: &str) -> Option<Vec<u8>> {
        self.data
            .get(key)
            .map(|v| v.as_bytes().to_vec())
            .or_else(|| self.binary_data.get(key).cloned())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Secret {
    pub metadata: ObjectMeta,

    #[serde(default)]
    pub data: BTreeMap<String, Vec<u8>>,
}

impl_resource!(Secret, "Secret");
