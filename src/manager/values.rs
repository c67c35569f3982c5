//! Resolution of "value or reference" fields.

use crate::manager::error::{ManagerError, ManagerResult};
use crate::model::{ConfigMap, ValueSource};
use crate::store::Api;

/// Returns the literal behind `source`. A missing config map or key is an
/// error for required references and an empty string for optional ones.
pub async fn resolve_value(config_maps: &Api<ConfigMap>, source: &ValueSource) -> ManagerResult<String> {
    let selector = match source {
        ValueSource::Value(value) => return Ok(value.clone()),
        ValueSource::ConfigMapKeyRef(selector) => selector,
    };

    let config_map = match config_maps.get_opt(&selector.name).await? {
        Some(cm) => cm,
        None if selector.optional => return Ok(String::new()),
        None => {
            return Err(ManagerError::not_found(format!(
                "config map \"{}\" not found",
                selector.name
            )))
        }
    };

    match config_map.value(&selector.key) {
        Some(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
        None if selector.optional => Ok(String::new()),
        None => Err(ManagerError::not_found(format!(
            "key \"{}\" not found in config map \"{}\"",
            selector.key, selector.name
        ))),
    }
}
