//! Location rules ("routes").

use serde::{Deserialize, Serialize};

use crate::manager::error::{ManagerError, ManagerResult};
use crate::manager::paths::is_location_path_valid;
use crate::manager::values::resolve_value;
use crate::manager::Manager;
use crate::model::{ConfigMap, Location, ValueSource};

/// A location as seen by callers, with its content resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Route {
    pub path: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub destination: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub content: String,

    #[serde(rename = "https_only")]
    pub https_only: bool,
}

impl Route {
    /// Checks run in a fixed order; the first failure wins.
    pub fn validate(&self) -> ManagerResult<()> {
        if self.path.is_empty() {
            return Err(ManagerError::validation("path is required"));
        }
        if !is_location_path_valid(&self.path) {
            return Err(ManagerError::validation("invalid path format"));
        }
        match (self.content.is_empty(), self.destination.is_empty()) {
            (true, true) => return Err(ManagerError::validation("either content or destination are required")),
            (false, false) => return Err(ManagerError::validation("cannot set both content and destination")),
            _ => {}
        }
        if !self.content.is_empty() && self.https_only {
            return Err(ManagerError::validation("cannot set both content and httpsonly"));
        }
        Ok(())
    }

    fn to_location(&self) -> Location {
        if self.content.is_empty() {
            Location {
                path: self.path.clone(),
                destination: Some(self.destination.clone()),
                force_https: self.https_only,
                content: None,
            }
        } else {
            Location {
                path: self.path.clone(),
                destination: None,
                force_https: false,
                content: Some(ValueSource::inline(self.content.clone())),
            }
        }
    }
}

impl Manager {
    /// Every location of the instance in precedence order.
    pub async fn get_routes(&self, instance_name: &str) -> ManagerResult<Vec<Route>> {
        let instance = self.get_instance(instance_name).await?;
        let config_maps = self.api::<ConfigMap>();

        let mut routes = Vec::new();
        for location in instance.spec.locations.iter().flatten() {
            let content = match &location.content {
                Some(source) => resolve_value(&config_maps, source).await?,
                None => String::new(),
            };
            routes.push(Route {
                path: location.path.clone(),
                destination: location.destination.clone().unwrap_or_default(),
                content,
                https_only: location.force_https,
            });
        }
        Ok(routes)
    }

    /// Replaces the location with the same path in place, or appends it.
    pub async fn update_route(&self, instance_name: &str, route: Route) -> ManagerResult<()> {
        route.validate()?;
        let location = route.to_location();

        self.mutate_instance(instance_name, |instance| {
            let locations = instance.spec.locations.get_or_insert_with(Vec::new);
            match locations.iter_mut().find(|l| l.path == location.path) {
                Some(existing) => *existing = location.clone(),
                None => locations.push(location.clone()),
            }
            Ok(())
        })
        .await?;

        tracing::info!(instance = %instance_name, path = %route.path, "Route updated");
        Ok(())
    }

    pub async fn delete_route(&self, instance_name: &str, path: &str) -> ManagerResult<()> {
        let not_found = || ManagerError::not_found("path does not exist");

        self.mutate_instance(instance_name, |instance| {
            let locations = instance.spec.locations.as_mut().ok_or_else(not_found)?;
            let index = locations
                .iter()
                .position(|l| l.path == path)
                .ok_or_else(not_found)?;
            locations.remove(index);
            if locations.is_empty() {
                instance.spec.locations = None;
            }
            Ok(())
        })
        .await?;

        tracing::info!(instance = %instance_name, path = %path, "Route deleted");
        Ok(())
    }
}
