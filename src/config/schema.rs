//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the control
//! plane. All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::{Affinity, PlanSpec};

/// Root configuration for the control plane.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ControlPlaneConfig {
    /// API listener configuration (bind address, TLS).
    pub listener: ListenerConfig,

    /// Service identity, flavors and team affinity.
    pub rpaas: RpaasConfig,

    /// Object store settings.
    pub store: StoreConfig,

    /// Cache purge fan-out settings.
    pub purge: PurgeConfig,

    /// Retry configuration for conflicting writes.
    pub retries: RetryConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:9999").
    pub bind_address: String,

    /// Optional TLS configuration.
    pub tls: Option<TlsConfig>,

    /// Total time allowed for one API request, in seconds.
    pub request_timeout_secs: u64,

    /// Maximum request body size in bytes.
    pub max_body_size: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:9999".to_string(),
            tls: None,
            request_timeout_secs: 30,
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

/// Process-wide lookup tables shared by every manager operation.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct RpaasConfig {
    /// Service name stamped on instance labels.
    pub service_name: String,

    /// Namespace holding instances, plans and their objects.
    pub namespace: String,

    /// Named plan-template presets selectable with a `flavor=` tag.
    pub flavors: Vec<FlavorConfig>,

    /// Scheduling constraints per team owner.
    pub team_affinity: BTreeMap<String, Affinity>,
}

impl Default for RpaasConfig {
    fn default() -> Self {
        Self {
            service_name: "rpaasv2".to_string(),
            namespace: "rpaasv2".to_string(),
            flavors: Vec::new(),
            team_affinity: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct FlavorConfig {
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub spec: PlanSpec,
}

/// Object store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    /// JSON file the in-memory store is loaded from and saved to.
    pub persistence_path: Option<String>,

    /// Deadline for a single store call in milliseconds.
    pub operation_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            persistence_path: None,
            operation_timeout_ms: 5000,
        }
    }
}

/// Cache purge configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PurgeConfig {
    /// Port of the purge endpoint exposed by every replica.
    pub port: u16,

    /// Deadline for one replica purge call in milliseconds.
    pub timeout_ms: u64,

    /// Maximum purge calls in flight per operation.
    pub max_concurrency: usize,
}

impl Default for PurgeConfig {
    fn default() -> Self {
        Self {
            port: 8800,
            timeout_ms: 5000,
            max_concurrency: 16,
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first.
    pub max_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 50,
            max_delay_ms: 1000,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
