//! Cache purge transport.

use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use hyper::{header, Request, StatusCode};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use thiserror::Error;
use url::Url;

use crate::config::PurgeConfig;
use crate::resilience::timeouts::{with_deadline, DeadlineExceeded};

/// Cached variants are keyed by encoding, so each one is purged.
const ENCODINGS: [&str; 2] = ["gzip", "identity"];

/// Protocols a cache key may have been stored under.
const PROTOCOLS: [&str; 2] = ["http", "https"];

#[derive(Debug, Error)]
pub enum PurgeError {
    #[error("invalid purge request: {0}")]
    InvalidRequest(String),

    #[error("purge request to {address} failed: {reason}")]
    Connection { address: String, reason: String },

    #[error("purge request to {address} returned {status}")]
    Status { address: String, status: u16 },

    #[error(transparent)]
    Deadline(#[from] DeadlineExceeded),
}

/// Purges a cache entry on a single replica.
#[async_trait]
pub trait CachePurger: Send + Sync {
    async fn purge(&self, address: &str, path: &str, preserve_path: bool) -> Result<(), PurgeError>;
}

/// Purger hitting the purge endpoint each replica exposes.
#[derive(Clone)]
pub struct HttpPurger {
    client: Client<HttpConnector, Body>,
    port: u16,
    timeout: Duration,
}

impl HttpPurger {
    pub fn new(config: &PurgeConfig) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        Self {
            client,
            port: config.port,
            timeout: Duration::from_millis(config.timeout_ms),
        }
    }

    /// Paths requested on the replica for one logical purge.
    pub fn purge_paths(path: &str, preserve_path: bool) -> Vec<String> {
        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{}", path)
        };

        if preserve_path {
            vec![format!("/purge{}", path)]
        } else {
            PROTOCOLS
                .iter()
                .map(|proto| format!("/purge/{}{}", proto, path))
                .collect()
        }
    }

    /// Purge URL on one replica. IPv6 hosts are bracketed and the path is
    /// percent-encoded.
    pub fn purge_url(address: &str, port: u16, path: &str) -> Result<Url, PurgeError> {
        let host = match address.parse::<IpAddr>() {
            Ok(IpAddr::V6(ip)) => format!("[{}]", ip),
            _ => address.to_string(),
        };
        let mut url = Url::parse(&format!("http://{}:{}", host, port))
            .map_err(|e| PurgeError::InvalidRequest(format!("{}: {}", address, e)))?;
        url.set_path(path);
        Ok(url)
    }

    async fn send(&self, address: &str, uri: &str, encoding: &str) -> Result<(), PurgeError> {
        let request = Request::builder()
            .method("GET")
            .uri(uri)
            .header(header::ACCEPT_ENCODING, encoding)
            .header(header::USER_AGENT, "rpaas-control-purge")
            .body(Body::empty())
            .map_err(|e| PurgeError::InvalidRequest(e.to_string()))?;

        let response = with_deadline(self.timeout, self.client.request(request))
            .await?
            .map_err(|e| PurgeError::Connection {
                address: address.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if status.is_success() || status == StatusCode::NOT_FOUND {
            Ok(())
        } else {
            Err(PurgeError::Status {
                address: address.to_string(),
                status: status.as_u16(),
            })
        }
    }
}

#[async_trait]
impl CachePurger for HttpPurger {
    async fn purge(&self, address: &str, path: &str, preserve_path: bool) -> Result<(), PurgeError> {
        for purge_path in Self::purge_paths(path, preserve_path) {
            let url = Self::purge_url(address, self.port, &purge_path)?;
            for encoding in ENCODINGS {
                self.send(address, url.as_str(), encoding).await?;
            }
        }
        tracing::debug!(address = %address, path = %path, "Replica cache purged");
        Ok(())
    }
}
