//! Extra files delivered to replicas.
//!
//! The index lives on the instance (`spec.extra_files`); contents live in a
//! config map named `<instance>-extra-files-<suffix>`. Each change writes a
//! fresh config map, repoints the instance, then drops the old one, so
//! replicas never observe an index and a content set that disagree.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::manager::error::{ManagerError, ManagerResult};
use crate::manager::paths::{convert_path_to_config_map_key, is_path_valid};
use crate::manager::Manager;
use crate::model::{ConfigMap, FilesRef, Instance, ObjectMeta};

/// A file keyed by its logical path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct File {
    pub name: String,
    pub content: Vec<u8>,
}

impl File {
    pub fn new(name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

/// Index and contents, both keyed by storage key.
#[derive(Debug, Default)]
struct FileSet {
    paths: BTreeMap<String, String>,
    contents: BTreeMap<String, Vec<u8>>,
}

fn no_extra_files() -> ManagerError {
    ManagerError::not_found("there are no extra files")
}

fn file_missing(name: &str) -> ManagerError {
    ManagerError::not_found(format!("file \"{}\" does not exist", name))
}

fn versioned_name(instance_name: &str) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}-extra-files-{}", instance_name, &suffix[..8])
}

impl Manager {
    pub async fn get_extra_files(&self, instance_name: &str) -> ManagerResult<Vec<File>> {
        let set = self
            .with_write_retries(|_| async move {
                let instance = self.get_instance(instance_name).await?;
                self.load_file_set(&instance).await
            })
            .await?;
        let Some(set) = set else {
            return Ok(Vec::new());
        };

        let mut files: Vec<File> = set
            .paths
            .iter()
            .map(|(key, path)| File::new(path.clone(), set.contents.get(key).cloned().unwrap_or_default()))
            .collect();
        files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(files)
    }

    /// Adds new files. Fails without writing if any path is invalid or
    /// already present.
    pub async fn create_extra_files(&self, instance_name: &str, files: &[File]) -> ManagerResult<()> {
        if let Some(bad) = files.iter().find(|f| !is_path_valid(&f.name)) {
            return Err(ManagerError::validation(format!("invalid file path \"{}\"", bad.name)));
        }

        self.edit_file_set(instance_name, |current| {
            let mut set = current.unwrap_or_default();
            for file in files {
                let key = convert_path_to_config_map_key(&file.name);
                if set.paths.contains_key(&key) || set.paths.values().any(|p| *p == file.name) {
                    return Err(ManagerError::conflict(format!("file \"{}\" already exists", file.name)));
                }
                set.paths.insert(key.clone(), file.name.clone());
                set.contents.insert(key, file.content.clone());
            }
            Ok(set)
        })
        .await?;

        tracing::info!(instance = %instance_name, count = files.len(), "Extra files created");
        Ok(())
    }

    /// Replaces the content of files that already exist. Never creates.
    pub async fn update_extra_files(&self, instance_name: &str, files: &[File]) -> ManagerResult<()> {
        self.edit_file_set(instance_name, |current| {
            let mut set = current.ok_or_else(no_extra_files)?;
            for file in files {
                let key = convert_path_to_config_map_key(&file.name);
                if !set.paths.contains_key(&key) {
                    return Err(file_missing(&file.name));
                }
                set.contents.insert(key, file.content.clone());
            }
            Ok(set)
        })
        .await?;

        tracing::info!(instance = %instance_name, count = files.len(), "Extra files updated");
        Ok(())
    }

    pub async fn delete_extra_files(&self, instance_name: &str, names: &[String]) -> ManagerResult<()> {
        self.edit_file_set(instance_name, |current| {
            let mut set = current.ok_or_else(no_extra_files)?;
            for name in names {
                let key = convert_path_to_config_map_key(name);
                set.paths.remove(&key).ok_or_else(|| file_missing(name))?;
                set.contents.remove(&key);
            }
            Ok(set)
        })
        .await?;

        tracing::info!(instance = %instance_name, count = names.len(), "Extra files deleted");
        Ok(())
    }

    /// Reads the file set `instance` points at. A backing map that vanished
    /// because the instance moved on is reported as a stale read.
    async fn load_file_set(&self, instance: &Instance) -> ManagerResult<Option<FileSet>> {
        let Some(files_ref) = &instance.spec.extra_files else {
            return Ok(None);
        };

        let config_map = match self.api::<ConfigMap>().get_opt(&files_ref.name).await? {
            Some(config_map) => config_map,
            None => {
                let current = self.get_instance(&instance.metadata.name).await?;
                if current.metadata.resource_version != instance.metadata.resource_version {
                    return Err(ManagerError::Transient(format!(
                        "extra files of \"{}\" changed concurrently",
                        instance.metadata.name
                    )));
                }
                return Err(ManagerError::not_found(format!(
                    "ConfigMap \"{}\" not found",
                    files_ref.name
                )));
            }
        };
        let contents = files_ref
            .files
            .keys()
            .filter_map(|key| config_map.value(key).map(|v| (key.clone(), v)))
            .collect();

        Ok(Some(FileSet {
            paths: files_ref.files.clone(),
            contents,
        }))
    }

    /// Applies `edit` to the current file set and swaps the backing config
    /// map. The whole read-edit-write cycle is retried on stale writes.
    async fn edit_file_set<F>(&self, instance_name: &str, edit: F) -> ManagerResult<()>
    where
        F: Fn(Option<FileSet>) -> ManagerResult<FileSet> + Send + Sync,
    {
        let edit = &edit;
        self.with_write_retries(|attempt| async move {
            if attempt > 1 {
                tracing::warn!(instance = %instance_name, attempt, "Retrying extra files update after conflict");
            }

            let mut instance = self.get_instance(instance_name).await?;
            let current = self.load_file_set(&instance).await?;
            let previous = instance.spec.extra_files.as_ref().map(|r| r.name.clone());
            let next = edit(current)?;

            let config_maps = self.api::<ConfigMap>();
            let replacement = if next.paths.is_empty() {
                None
            } else {
                let name = versioned_name(instance_name);
                let config_map = ConfigMap {
                    metadata: ObjectMeta::new(self.namespace(), &name).with_labels(instance.metadata.labels.clone()),
                    binary_data: next.contents,
                    ..Default::default()
                };
                config_maps.create(&config_map).await?;
                Some(name)
            };

            instance.spec.extra_files = replacement.clone().map(|name| FilesRef {
                name,
                files: next.paths,
            });

            if let Err(e) = self.api::<Instance>().update(&instance).await {
                if let Some(orphan) = &replacement {
                    if let Err(cleanup) = config_maps.delete(orphan).await {
                        tracing::warn!(config_map = %orphan, error = %cleanup, "Failed to remove unused extra files");
                    }
                }
                return Err(e.into());
            }

            if let Some(stale) = previous {
                if let Err(e) = config_maps.delete(&stale).await {
                    tracing::warn!(config_map = %stale, error = %e, "Failed to remove previous extra files");
                }
            }
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::testing::*;
    use crate::store::MemoryStore;

    /// "another-instance" with `index.html` in "another-instance-extra-files".
    fn seeded_store() -> MemoryStore {
        let store = MemoryStore::new(None);

        let mut with_files = instance("another-instance");
        with_files.spec.extra_files = Some(FilesRef {
            name: "another-instance-extra-files".into(),
            files: BTreeMap::from([("index.html".into(), "index.html".into())]),
        });

        let mut cm = ConfigMap {
            metadata: ObjectMeta::new(NAMESPACE, "another-instance-extra-files"),
            ..Default::default()
        };
        cm.binary_data.insert("index.html".into(), b"Hello world".to_vec());
        store.seed(&cm).unwrap();

        seed(&store, &[instance("my-instance"), with_files]);
        store
    }

    async fn backing_data(mgr: &Manager, name: &str) -> BTreeMap<String, Vec<u8>> {
        let files_ref = mgr.get_instance(name).await.unwrap().spec.extra_files.unwrap();
        mgr.api::<ConfigMap>().get(&files_ref.name).await.unwrap().binary_data
    }

    #[tokio::test]
    async fn test_create_extra_files_rejects_invalid_path() {
        let store = seeded_store();
        let mgr = manager(&store);

        let err = mgr
            .create_extra_files(
                "my-instance",
                &[File::new("www/index.html", "ok"), File::new("/path/to/my/file", "My invalid filename")],
            )
            .await
            .unwrap_err();
        assert!(err.is_validation());
        assert!(mgr.get_instance("my-instance").await.unwrap().spec.extra_files.is_none());
    }

    #[tokio::test]
    async fn test_create_extra_files() {
        let store = seeded_store();
        let mgr = manager(&store);

        mgr.create_extra_files(
            "my-instance",
            &[
                File::new("www/index.html", "<h1>Hello world!</h1>"),
                File::new("waf/sqli-rules.cnf", "# my awesome rules against SQLi :)..."),
            ],
        )
        .await
        .unwrap();

        let files_ref = mgr.get_instance("my-instance").await.unwrap().spec.extra_files.unwrap();
        assert!(files_ref.name.starts_with("my-instance-extra-files-"));
        assert_eq!(
            files_ref.files,
            BTreeMap::from([
                ("www_index.html".to_string(), "www/index.html".to_string()),
                ("waf_sqli-rules.cnf".to_string(), "waf/sqli-rules.cnf".to_string()),
            ])
        );
        assert_eq!(
            backing_data(&mgr, "my-instance").await,
            BTreeMap::from([
                ("www_index.html".to_string(), b"<h1>Hello world!</h1>".to_vec()),
                ("waf_sqli-rules.cnf".to_string(), b"# my awesome rules against SQLi :)...".to_vec()),
            ])
        );
    }

    #[tokio::test]
    async fn test_create_extra_files_conflict() {
        let store = seeded_store();
        let mgr = manager(&store);

        let err = mgr
            .create_extra_files("another-instance", &[File::new("index.html", "My new hello world")])
            .await
            .unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(err.to_string(), "file \"index.html\" already exists");
        assert_eq!(
            backing_data(&mgr, "another-instance").await["index.html"],
            b"Hello world".to_vec()
        );
    }

    #[tokio::test]
    async fn test_create_extra_files_replaces_backing_map() {
        let store = seeded_store();
        let mgr = manager(&store);

        mgr.create_extra_files("another-instance", &[File::new("www/index.html", "<h1>Hello world!</h1>")])
            .await
            .unwrap();

        let files_ref = mgr.get_instance("another-instance").await.unwrap().spec.extra_files.unwrap();
        assert_ne!(files_ref.name, "another-instance-extra-files");
        assert_eq!(
            backing_data(&mgr, "another-instance").await,
            BTreeMap::from([
                ("index.html".to_string(), b"Hello world".to_vec()),
                ("www_index.html".to_string(), b"<h1>Hello world!</h1>".to_vec()),
            ])
        );
        assert!(mgr
            .api::<ConfigMap>()
            .get_opt("another-instance-extra-files")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_get_extra_files() {
        let store = seeded_store();
        let mgr = manager(&store);

        assert!(mgr.get_extra_files("my-instance").await.unwrap().is_empty());
        assert_eq!(
            mgr.get_extra_files("another-instance").await.unwrap(),
            vec![File::new("index.html", "Hello world")]
        );
        assert!(mgr.get_extra_files("not-found").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_update_extra_files() {
        let store = seeded_store();
        let mgr = manager(&store);

        let err = mgr
            .update_extra_files("my-instance", &[File::new("www/index.html", "<h1>Hello world!</h1>")])
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "there are no extra files");

        let err = mgr
            .update_extra_files("another-instance", &[File::new("www/index.html", "<h1>Hello world!</h1>")])
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "file \"www/index.html\" does not exist");

        mgr.update_extra_files("another-instance", &[File::new("index.html", "<h1>Hello world!</h1>")])
            .await
            .unwrap();
        assert_eq!(
            backing_data(&mgr, "another-instance").await,
            BTreeMap::from([("index.html".to_string(), b"<h1>Hello world!</h1>".to_vec())])
        );
    }

    #[tokio::test]
    async fn test_delete_extra_files() {
        let store = seeded_store();
        let mgr = manager(&store);
        mgr.create_extra_files("my-instance", &[File::new("waf/rules.conf", "# my awesome WAF rules")])
            .await
            .unwrap();

        let err = mgr
            .delete_extra_files("another-instance", &["not-found.txt".to_string()])
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "file \"not-found.txt\" does not exist");

        let err = mgr
            .delete_extra_files("my-instance", &["index.html".to_string()])
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "file \"index.html\" does not exist");

        let backing = mgr.get_instance("another-instance").await.unwrap().spec.extra_files.unwrap().name;
        mgr.delete_extra_files("another-instance", &["index.html".to_string()])
            .await
            .unwrap();
        assert!(mgr.get_instance("another-instance").await.unwrap().spec.extra_files.is_none());
        assert!(mgr.api::<ConfigMap>().get_opt(&backing).await.unwrap().is_none());

        let err = mgr
            .delete_extra_files("another-instance", &["index.html".to_string()])
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "there are no extra files");
    }
}
