//! Instance lifecycle: create, update, delete, bind, scale.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::manager::certificates::certificates_secret_name;
use crate::manager::error::{ManagerError, ManagerResult};
use crate::manager::plans::plan_template_from_tags;
use crate::manager::Manager;
use crate::model::{ConfigMap, Instance, InstanceSpec, ObjectMeta, PodTemplate, Secret, ServiceTemplate, ServiceType};
use crate::store::StoreError;

pub const SERVICE_NAME_LABEL: &str = "rpaas.extensions.tsuru.io/service-name";
pub const INSTANCE_NAME_LABEL: &str = "rpaas.extensions.tsuru.io/instance-name";
pub const TEAM_OWNER_LABEL: &str = "rpaas.extensions.tsuru.io/team-owner";
const LEGACY_SERVICE_LABEL: &str = "rpaas_service";
const LEGACY_INSTANCE_LABEL: &str = "rpaas_instance";

pub const DESCRIPTION_ANNOTATION: &str = "rpaas.extensions.tsuru.io/description";
pub const TAGS_ANNOTATION: &str = "rpaas.extensions.tsuru.io/tags";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateArgs {
    pub name: String,
    pub team: String,
    pub plan: String,
    pub description: String,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateInstanceArgs {
    pub team: String,
    pub plan: String,
    pub description: String,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindAppArgs {
    #[serde(default)]
    pub app_host: String,
}

/// Summary of an instance for display.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceInfo {
    pub name: String,
    pub team: String,
    pub plan: String,
    pub description: String,
    pub tags: Vec<String>,
    /// `pending` until an address is assigned.
    pub address: String,
    pub replicas: i32,
    pub routes: Vec<String>,
    pub blocks: Vec<String>,
}

fn instance_labels(service_name: &str, instance_name: &str, team: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        (SERVICE_NAME_LABEL.to_string(), service_name.to_string()),
        (INSTANCE_NAME_LABEL.to_string(), instance_name.to_string()),
        (TEAM_OWNER_LABEL.to_string(), team.to_string()),
        (LEGACY_SERVICE_LABEL.to_string(), service_name.to_string()),
        (LEGACY_INSTANCE_LABEL.to_string(), instance_name.to_string()),
    ])
}

fn joined_tags(tags: &[String]) -> String {
    let mut sorted = tags.to_vec();
    sorted.sort();
    sorted.join(",")
}

fn split_tags(raw: &str) -> Vec<String> {
    raw.split(',').filter(|t| !t.is_empty()).map(str::to_string).collect()
}

impl Manager {
    pub async fn create_instance(&self, args: CreateArgs) -> ManagerResult<Instance> {
        if args.name.is_empty() {
            return Err(ManagerError::validation("name is required"));
        }
        if args.team.is_empty() {
            return Err(ManagerError::validation("team name is required"));
        }

        let plan = match self.get_plan(&args.plan).await {
            Ok(plan) => plan,
            Err(e) if e.is_not_found() => return Err(ManagerError::validation("invalid plan")),
            Err(e) => return Err(e),
        };
        let plan_template = plan_template_from_tags(self.config(), &args.tags)?;

        let already_exists = || ManagerError::conflict(format!("rpaas instance named \"{}\" already exists", args.name));
        let instances = self.api::<Instance>();
        if instances.get_opt(&args.name).await?.is_some() {
            return Err(already_exists());
        }

        let labels = instance_labels(&self.config().service_name, &args.name, &args.team);
        let annotations = BTreeMap::from([
            (DESCRIPTION_ANNOTATION.to_string(), args.description.clone()),
            (TAGS_ANNOTATION.to_string(), joined_tags(&args.tags)),
            (TEAM_OWNER_LABEL.to_string(), args.team.clone()),
        ]);

        let mut metadata = ObjectMeta::new(self.namespace(), &args.name).with_labels(labels.clone());
        metadata.annotations = annotations;

        let instance = Instance {
            metadata,
            spec: InstanceSpec {
                plan_name: plan.metadata.name,
                replicas: Some(1),
                plan_template,
                service: Some(ServiceTemplate {
                    service_type: ServiceType::LoadBalancer,
                    labels: labels.clone(),
                }),
                pod_template: PodTemplate {
                    labels,
                    affinity: self.config().team_affinity.get(&args.team).cloned(),
                    ..Default::default()
                },
                ..Default::default()
            },
        };

        let created = instances.create(&instance).await.map_err(|e| {
            if matches!(e, StoreError::AlreadyExists { .. }) {
                already_exists()
            } else {
                e.into()
            }
        })?;

        tracing::info!(instance = %args.name, team = %args.team, plan = %created.spec.plan_name, "Instance created");
        Ok(created)
    }

    pub async fn update_instance(&self, instance_name: &str, args: UpdateInstanceArgs) -> ManagerResult<()> {
        let plan = self.get_plan(&args.plan).await?;
        let plan_template = plan_template_from_tags(self.config(), &args.tags)?;
        let affinity = self.config().team_affinity.get(&args.team).cloned();
        let tags = joined_tags(&args.tags);

        self.mutate_instance(instance_name, |instance| {
            let meta = &mut instance.metadata;
            meta.labels.insert(TEAM_OWNER_LABEL.to_string(), args.team.clone());
            meta.annotations.insert(DESCRIPTION_ANNOTATION.to_string(), args.description.clone());
            meta.annotations.insert(TAGS_ANNOTATION.to_string(), tags.clone());
            meta.annotations.insert(TEAM_OWNER_LABEL.to_string(), args.team.clone());

            let pod_labels = &mut instance.spec.pod_template.labels;
            for (k, v) in &meta.labels {
                pod_labels.insert(k.clone(), v.clone());
            }
            if let Some(service) = instance.spec.service.as_mut() {
                service.labels.insert(TEAM_OWNER_LABEL.to_string(), args.team.clone());
            }
            if affinity.is_some() {
                instance.spec.pod_template.affinity = affinity.clone();
            }

            instance.spec.plan_name = plan.metadata.name.clone();
            instance.spec.plan_template = plan_template.clone();
            Ok(())
        })
        .await?;

        tracing::info!(instance = %instance_name, plan = %plan.metadata.name, "Instance updated");
        Ok(())
    }

    /// Deletes the instance and the objects it owns.
    pub async fn delete_instance(&self, instance_name: &str) -> ManagerResult<()> {
        let instance = self.get_instance(instance_name).await?;
        self.api::<Instance>().delete(instance_name).await?;

        if instance.spec.certificates.is_some() {
            let secret = certificates_secret_name(instance_name);
            if let Err(e) = self.api::<Secret>().delete(&secret).await {
                tracing::warn!(instance = %instance_name, secret = %secret, error = %e, "Failed to remove certificates");
            }
        }
        if let Some(files) = &instance.spec.extra_files {
            if let Err(e) = self.api::<ConfigMap>().delete(&files.name).await {
                tracing::warn!(instance = %instance_name, config_map = %files.name, error = %e, "Failed to remove extra files");
            }
        }

        tracing::info!(instance = %instance_name, "Instance deleted");
        Ok(())
    }

    pub async fn bind_app(&self, instance_name: &str, args: BindAppArgs) -> ManagerResult<()> {
        self.get_instance(instance_name).await?;
        if args.app_host.is_empty() {
            return Err(ManagerError::validation("application host cannot be empty"));
        }

        self.mutate_instance(instance_name, |instance| {
            if !instance.spec.host.is_empty() {
                return Err(ManagerError::conflict("instance already bound with another application"));
            }
            instance.spec.host = args.app_host.clone();
            Ok(())
        })
        .await?;

        tracing::info!(instance = %instance_name, host = %args.app_host, "Application bound");
        Ok(())
    }

    pub async fn unbind_app(&self, instance_name: &str) -> ManagerResult<()> {
        self.mutate_instance(instance_name, |instance| {
            if instance.spec.host.is_empty() {
                return Err(ManagerError::validation("instance not bound"));
            }
            instance.spec.host.clear();
            Ok(())
        })
        .await?;

        tracing::info!(instance = %instance_name, "Application unbound");
        Ok(())
    }

    pub async fn scale(&self, instance_name: &str, replicas: i32) -> ManagerResult<()> {
        if replicas < 0 {
            return Err(ManagerError::validation(format!("invalid replicas number: {}", replicas)));
        }

        self.mutate_instance(instance_name, |instance| {
            instance.spec.replicas = Some(replicas);
            Ok(())
        })
        .await?;

        tracing::info!(instance = %instance_name, replicas, "Instance scaled");
        Ok(())
    }

    pub async fn instance_info(&self, instance_name: &str) -> ManagerResult<InstanceInfo> {
        let instance = self.get_instance(instance_name).await?;
        let address = self.get_instance_address(instance_name).await?;

        let meta = &instance.metadata;
        let annotation = |key: &str| meta.annotations.get(key).cloned().unwrap_or_default();

        Ok(InstanceInfo {
            name: meta.name.clone(),
            team: meta.labels.get(TEAM_OWNER_LABEL).cloned().unwrap_or_default(),
            plan: instance.spec.plan_name.clone(),
            description: annotation(DESCRIPTION_ANNOTATION),
            tags: split_tags(&annotation(TAGS_ANNOTATION)),
            address: if address.is_empty() { "pending".to_string() } else { address },
            replicas: instance.spec.replicas.unwrap_or_default(),
            routes: instance
                .spec
                .locations
                .iter()
                .flatten()
                .map(|l| l.path.clone())
                .collect(),
            blocks: instance
                .spec
                .blocks
                .iter()
                .flatten()
                .map(|(block_type, _)| block_type.to_string())
                .collect(),
        })
    }
}
