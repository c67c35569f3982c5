//! Object metadata and the `Resource` trait.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Identity and bookkeeping attached to every stored object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ObjectMeta {
    pub name: String,

    pub namespace: String,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,

    /// Assigned by the store on every write. A write carrying a stale
    /// version is rejected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_version: Option<u64>,
}

impl ObjectMeta {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            ..Default::default()
        }
    }

    pub fn with_labels(mut self, labels: BTreeMap<String, String>) -> Self {
        self.labels = labels;
        self
    }

    /// True when every selector pair is present in the labels.
    pub fn matches_labels(&self, selector: &BTreeMap<String, String>) -> bool {
        selector
            .iter()
            .all(|(k, v)| self.labels.get(k).map(|l| l == v).unwrap_or(false))
    }
}

/// A typed object that can be kept in an `ObjectStore`.
pub trait Resource: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Kind name used as the first component of the storage key.
    const KIND: &'static str;

    fn meta(&self) -> &ObjectMeta;

    fn meta_mut(&mut self) -> &mut ObjectMeta;
}

macro_rules! impl_resource {
    ($ty:ty, $kind:literal) => {
        impl $crate::model::meta::Resource for $ty {
            const KIND: &'static str = $kind;

            fn meta(&self) -> &$crate::model::meta::ObjectMeta {
                &self.metadata
            }

            fn meta_mut(&mut self) -> &mut $crate::model::meta::ObjectMeta {
                &mut self.metadata
            }
        }
    };
}

pub(crate) use impl_resource;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_selector_matching() {
        let mut labels = BTreeMap::new();
        labels.insert("rpaas_instance".to_string(), "my-instance".to_string());
        labels.insert("app".to_string(), "nginx".to_string());
        let meta = ObjectMeta::new("rpaasv2", "pod-1").with_labels(labels);

        let mut selector = BTreeMap::new();
        assert!(meta.matches_labels(&selector));

        selector.insert("rpaas_instance".to_string(), "my-instance".to_string());
        assert!(meta.matches_labels(&selector));

        selector.insert("app".to_string(), "other".to_string());
        assert!(!meta.matches_labels(&selector));
    }
}
