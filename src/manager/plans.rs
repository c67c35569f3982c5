//! Plan resolution and flavor / plan-override templates.

use std::collections::BTreeMap;

use crate::config::{FlavorConfig, RpaasConfig};
use crate::manager::error::{ManagerError, ManagerResult};
use crate::manager::Manager;
use crate::model::{Plan, PlanSpec};

const FLAVOR_TAG_PREFIXES: [&str; 2] = ["flavor=", "flavor:"];
const OVERRIDE_TAG_PREFIXES: [&str; 2] = ["plan-override=", "plan-override:"];

impl Manager {
    /// The named plan, or the namespace default when `name` is empty.
    pub async fn get_plan(&self, name: &str) -> ManagerResult<Plan> {
        if !name.is_empty() {
            return self
                .api::<Plan>()
                .get_opt(name)
                .await?
                .ok_or_else(|| ManagerError::not_found(format!("plan \"{}\" not found", name)));
        }

        let plans = self.api::<Plan>().list(&BTreeMap::new()).await?;
        select_default(plans)
    }

    /// All plans, ordered by name.
    pub async fn get_plans(&self) -> ManagerResult<Vec<Plan>> {
        let mut plans = self.api::<Plan>().list(&BTreeMap::new()).await?;
        plans.sort_by(|a, b| a.metadata.name.cmp(&b.metadata.name));
        Ok(plans)
    }

    pub fn get_flavors(&self) -> Vec<FlavorConfig> {
        self.config().flavors.clone()
    }
}

/// Picks the single default plan out of `plans`.
pub(crate) fn select_default(plans: Vec<Plan>) -> ManagerResult<Plan> {
    let mut defaults: Vec<Plan> = plans.into_iter().filter(|p| p.spec.default).collect();
    match defaults.len() {
        0 => Err(ManagerError::not_found("no default plan found")),
        1 => Ok(defaults.remove(0)),
        _ => {
            let mut names: Vec<&str> = defaults.iter().map(|p| p.metadata.name.as_str()).collect();
            names.sort_unstable();
            Err(ManagerError::conflict(format!(
                "several default plans found: [{}]",
                names.join(", ")
            )))
        }
    }
}

fn strip_any<'a>(tag: &'a str, prefixes: &[&str]) -> Option<&'a str> {
    prefixes.iter().find_map(|p| tag.strip_prefix(p))
}

/// Builds the plan template selected by an instance's tags: either the
/// merged specs of every `flavor=` tag, or a parsed `plan-override=` JSON
/// fragment. `None` when neither is present.
pub(crate) fn plan_template_from_tags(config: &RpaasConfig, tags: &[String]) -> ManagerResult<Option<PlanSpec>> {
    let flavors: Vec<&str> = tags
        .iter()
        .filter_map(|t| strip_any(t, &FLAVOR_TAG_PREFIXES))
        .collect();
    let overrides: Vec<&str> = tags
        .iter()
        .filter_map(|t| strip_any(t, &OVERRIDE_TAG_PREFIXES))
        .collect();

    if !flavors.is_empty() && !overrides.is_empty() {
        return Err(ManagerError::validation("cannot set both plan-override and flavor"));
    }

    if let Some(raw) = overrides.last() {
        let spec: PlanSpec = serde_json::from_str(raw)
            .map_err(|e| ManagerError::validation(format!("invalid plan-override: {}", e)))?;
        return Ok(Some(spec));
    }

    if flavors.is_empty() {
        return Ok(None);
    }

    let mut merged = PlanSpec::default();
    for name in flavors {
        let flavor = config
            .flavors
            .iter()
            .find(|f| f.name == name)
            .ok_or_else(|| ManagerError::validation(format!("flavor \"{}\" not found", name)))?;
        merged.merge(&flavor.spec);
    }
    Ok(Some(merged))
}
