//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check identity fields and flavor names
//! - Validate value ranges (timeouts > 0, ports valid)
//! - Parse addresses before the server tries to bind them
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ControlPlaneConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::ControlPlaneConfig;

/// One semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Check a parsed configuration, collecting every problem.
pub fn validate_config(config: &ControlPlaneConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("invalid socket address {:?}", config.listener.bind_address),
        ));
    }
    if config.listener.request_timeout_secs == 0 {
        errors.push(ValidationError::new("listener.request_timeout_secs", "must be greater than zero"));
    }
    if let Some(tls) = &config.listener.tls {
        if tls.cert_path.is_empty() || tls.key_path.is_empty() {
            errors.push(ValidationError::new("listener.tls", "cert_path and key_path are both required"));
        }
    }

    if config.rpaas.service_name.trim().is_empty() {
        errors.push(ValidationError::new("rpaas.service_name", "must not be empty"));
    }
    if config.rpaas.namespace.trim().is_empty() {
        errors.push(ValidationError::new("rpaas.namespace", "must not be empty"));
    }

    let mut seen = HashSet::new();
    for flavor in &config.rpaas.flavors {
        if flavor.name.is_empty() {
            errors.push(ValidationError::new("rpaas.flavors", "flavor name must not be empty"));
        } else if !seen.insert(flavor.name.as_str()) {
            errors.push(ValidationError::new(
                "rpaas.flavors",
                format!("duplicate flavor {:?}", flavor.name),
            ));
        }
    }

    if config.store.operation_timeout_ms == 0 {
        errors.push(ValidationError::new("store.operation_timeout_ms", "must be greater than zero"));
    }

    if config.purge.port == 0 {
        errors.push(ValidationError::new("purge.port", "must be a valid port"));
    }
    if config.purge.timeout_ms == 0 {
        errors.push(ValidationError::new("purge.timeout_ms", "must be greater than zero"));
    }
    if config.purge.max_concurrency == 0 {
        errors.push(ValidationError::new("purge.max_concurrency", "must be greater than zero"));
    }

    if config.retries.max_attempts == 0 {
        errors.push(ValidationError::new("retries.max_attempts", "must be at least 1"));
    }
    if config.retries.base_delay_ms > config.retries.max_delay_ms {
        errors.push(ValidationError::new("retries.base_delay_ms", "must not exceed max_delay_ms"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("invalid socket address {:?}", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{FlavorConfig, TlsConfig};
    use crate::model::PlanSpec;

    fn flavor(name: &str) -> FlavorConfig {
        FlavorConfig {
            name: name.to_string(),
            description: String::new(),
            spec: PlanSpec::default(),
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&ControlPlaneConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = ControlPlaneConfig::default();
        config.listener.bind_address = "not-an-address".into();
        config.rpaas.namespace = " ".into();
        config.rpaas.flavors = vec![flavor("vanilla"), flavor("vanilla")];
        config.retries.max_attempts = 0;
        config.purge.port = 0;

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec![
                "listener.bind_address",
                "rpaas.namespace",
                "rpaas.flavors",
                "purge.port",
                "retries.max_attempts",
            ]
        );
    }

    #[test]
    fn test_tls_requires_both_paths() {
        let mut config = ControlPlaneConfig::default();
        config.listener.tls = Some(TlsConfig {
            cert_path: "cert.pem".into(),
            key_path: String::new(),
        });
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "listener.tls");
    }
}
