//! TLS certificate bundle.
//!
//! Every pair lives in one shared secret per instance,
//! `<instance>-certificates`, under `<name>.crt` / `<name>.key`. The instance
//! keeps the index (`spec.certificates`).

use serde::{Deserialize, Serialize};

use crate::manager::error::{ManagerError, ManagerResult};
use crate::manager::Manager;
use crate::model::{ObjectMeta, Secret, TlsSecret, TlsSecretItem};

pub const DEFAULT_CERTIFICATE_NAME: &str = "default";

/// A certificate pair as seen by callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateData {
    pub name: String,
    pub certificate: String,
    pub key: String,
}

pub(crate) fn certificates_secret_name(instance_name: &str) -> String {
    format!("{}-certificates", instance_name)
}

fn normalize_name(name: &str) -> &str {
    if name.is_empty() {
        DEFAULT_CERTIFICATE_NAME
    } else {
        name
    }
}

/// Requires at least one PEM certificate and one PEM private key.
fn validate_pair(certificate: &[u8], key: &[u8]) -> ManagerResult<()> {
    let mut found = 0;
    for cert in rustls_pemfile::certs(&mut &certificate[..]) {
        cert.map_err(|e| ManagerError::validation(format!("invalid certificate: {}", e)))?;
        found += 1;
    }
    if found == 0 {
        return Err(ManagerError::validation("invalid certificate: no PEM certificate found"));
    }

    match rustls_pemfile::private_key(&mut &key[..]) {
        Ok(Some(_)) => Ok(()),
        Ok(None) => Err(ManagerError::validation("invalid key: no PEM private key found")),
        Err(e) => Err(ManagerError::validation(format!("invalid key: {}", e))),
    }
}

impl Manager {
    /// Stores a certificate pair under `name` (`default` when empty).
    pub async fn update_certificate(
        &self,
        instance_name: &str,
        name: &str,
        certificate: &[u8],
        key: &[u8],
    ) -> ManagerResult<()> {
        let name = normalize_name(name);
        let instance = self.get_instance(instance_name).await?;
        validate_pair(certificate, key)?;

        let secret_name = certificates_secret_name(instance_name);
        let item = TlsSecretItem::for_name(name);

        let existing = self.api::<Secret>().get_opt(&secret_name).await?;
        let previous = [
            existing.as_ref().and_then(|s| s.data.get(&item.certificate_field).cloned()),
            existing.as_ref().and_then(|s| s.data.get(&item.key_field).cloned()),
        ];

        let known = instance
            .spec
            .certificates
            .as_ref()
            .is_some_and(|bundle| bundle.items.contains(&item));
        if known && previous[0].as_deref() == Some(certificate) && previous[1].as_deref() == Some(key) {
            return Err(ManagerError::conflict(format!(
                "certificate \"{}\" already is deployed",
                name
            )));
        }

        let namespace = self.namespace().to_string();
        self.upsert::<Secret, _, _>(
            &secret_name,
            || Secret {
                metadata: ObjectMeta::new(&namespace, &secret_name)
                    .with_labels(instance.metadata.labels.clone()),
                ..Default::default()
            },
            |secret| {
                secret.data.insert(item.certificate_field.clone(), certificate.to_vec());
                secret.data.insert(item.key_field.clone(), key.to_vec());
                Ok(())
            },
        )
        .await?;

        let indexed = self
            .mutate_instance(instance_name, |instance| {
                let bundle = instance.spec.certificates.get_or_insert_with(|| TlsSecret {
                    secret_name: secret_name.clone(),
                    items: Vec::new(),
                });
                bundle.secret_name = secret_name.clone();
                if !bundle.items.contains(&item) {
                    bundle.items.push(item.clone());
                }
                Ok(())
            })
            .await;
        if let Err(e) = indexed {
            self.restore_certificate_fields(&secret_name, &item, &previous).await;
            return Err(e);
        }

        tracing::info!(instance = %instance_name, certificate = %name, "Certificate updated");
        Ok(())
    }

    /// Puts the pair's secret fields back to `previous`, dropping the secret
    /// once nothing is left in it.
    async fn restore_certificate_fields(
        &self,
        secret_name: &str,
        item: &TlsSecretItem,
        previous: &[Option<Vec<u8>>; 2],
    ) {
        let api = self.api::<Secret>();
        let api = &api;
        let restored = self
            .with_write_retries(|_| async move {
                let Some(mut secret) = api.get_opt(secret_name).await? else {
                    return Ok(());
                };
                for (field, value) in [&item.certificate_field, &item.key_field].into_iter().zip(previous) {
                    match value {
                        Some(bytes) => secret.data.insert(field.clone(), bytes.clone()),
                        None => secret.data.remove(field),
                    };
                }
                if secret.data.is_empty() {
                    api.delete(secret_name).await?;
                } else {
                    api.update(&secret).await?;
                }
                Ok(())
            })
            .await;

        if let Err(e) = restored {
            tracing::warn!(secret = %secret_name, error = %e, "Failed to roll back certificate change");
        }
    }

    pub async fn list_certificates(&self, instance_name: &str) -> ManagerResult<Vec<CertificateData>> {
        let instance = self.get_instance(instance_name).await?;
        let Some(bundle) = instance.spec.certificates else {
            return Ok(Vec::new());
        };

        let secret = self.api::<Secret>().get(&bundle.secret_name).await?;
        let text = |field: &str| {
            secret
                .data
                .get(field)
                .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
                .unwrap_or_default()
        };

        Ok(bundle
            .items
            .iter()
            .map(|item| CertificateData {
                name: item.name().to_string(),
                certificate: text(&item.certificate_field),
                key: text(&item.key_field),
            })
            .collect())
    }

    pub async fn delete_certificate(&self, instance_name: &str, name: &str) -> ManagerResult<()> {
        let name = normalize_name(name);
        let item = TlsSecretItem::for_name(name);
        let not_found = || ManagerError::not_found(format!("certificate \"{}\" not found", name));

        let updated = self
            .mutate_instance(instance_name, |instance| {
                let bundle = instance.spec.certificates.as_mut().ok_or_else(not_found)?;
                let index = bundle.items.iter().position(|i| *i == item).ok_or_else(not_found)?;
                bundle.items.remove(index);
                if bundle.items.is_empty() {
                    instance.spec.certificates = None;
                }
                Ok(())
            })
            .await?;

        let secret_name = certificates_secret_name(instance_name);
        let api = self.api::<Secret>();
        let (api, item, secret_name) = (&api, &item, secret_name.as_str());
        let remove_secret = updated.spec.certificates.is_none();
        self.with_write_retries(|_| async move {
            let Some(mut secret) = api.get_opt(secret_name).await? else {
                return Ok(());
            };
            secret.data.remove(&item.certificate_field);
            secret.data.remove(&item.key_field);
            if remove_secret || secret.data.is_empty() {
                api.delete(secret_name).await?;
            } else {
                api.update(&secret).await?;
            }
            Ok(())
        })
        .await?;

        tracing::info!(instance = %instance_name, certificate = %name, "Certificate deleted");
        Ok(())
    }
}
