//! Shared utilities for integration tests.
#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use std::collections::BTreeMap;

use async_trait::async_trait;
use rand::Rng;
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use rpaas_control::config::{ControlPlaneConfig, ListenerConfig, RetryConfig};
use rpaas_control::model::{
    ContainerStatus, Instance, ObjectMeta, Plan, PlanSpec, Replica, Resource, Workload, WorkloadStatus,
};
use rpaas_control::nginx::{CachePurger, PurgeError};
use rpaas_control::store::{MemoryStore, ObjectKey, ObjectStore, StoreHandles, StoreResult};
use rpaas_control::{ApiServer, Manager, Shutdown};

pub const NAMESPACE: &str = "rpaasv2";

/// What the programmable backend saw of one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub accept_encoding: String,
}

fn parse_head(head: &str) -> RecordedRequest {
    let mut lines = head.lines();
    let mut request_line = lines.next().unwrap_or_default().split_whitespace();
    let method = request_line.next().unwrap_or_default().to_string();
    let path = request_line.next().unwrap_or_default().to_string();
    let accept_encoding = lines
        .filter_map(|l| l.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("accept-encoding"))
        .map(|(_, value)| value.trim().to_string())
        .unwrap_or_default();

    RecordedRequest {
        method,
        path,
        accept_encoding,
    }
}

/// Start a programmable mock backend. `f` picks the status and body for
/// every request it is shown.
pub async fn start_programmable_backend<F, Fut>(addr: SocketAddr, f: F)
where
    F: Fn(RecordedRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind(addr).await.unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let mut buf = Vec::new();
                        let mut chunk = [0u8; 1024];
                        while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                            match socket.read(&mut chunk).await {
                                Ok(0) | Err(_) => return,
                                Ok(n) => buf.extend_from_slice(&chunk[..n]),
                            }
                        }

                        let request = parse_head(&String::from_utf8_lossy(&buf));
                        let (status, body) = f(request).await;
                        let status_text = match status {
                            200 => "200 OK",
                            404 => "404 Not Found",
                            500 => "500 Internal Server Error",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };

                        let response_str = format!(
                            "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });
}

/// Purger that records every call and always succeeds.
#[derive(Default)]
pub struct RecordingPurger {
    pub calls: Mutex<Vec<(String, String, bool)>>,
}

#[async_trait]
impl CachePurger for RecordingPurger {
    async fn purge(&self, address: &str, path: &str, preserve_path: bool) -> Result<(), PurgeError> {
        self.calls
            .lock()
            .unwrap()
            .push((address.to_string(), path.to_string(), preserve_path));
        Ok(())
    }
}

/// `MemoryStore` that sleeps 1-4ms before every call, so concurrent
/// writers interleave between their reads and writes.
#[derive(Clone, Default)]
pub struct JitteryStore {
    pub inner: MemoryStore,
}

fn jitter() -> Duration {
    Duration::from_millis(rand::thread_rng().gen_range(1..=4))
}

#[async_trait]
impl ObjectStore for JitteryStore {
    async fn get(&self, key: &ObjectKey) -> StoreResult<Value> {
        tokio::time::sleep(jitter()).await;
        self.inner.get(key).await
    }

    async fn list(&self, kind: &str, namespace: &str, selector: &BTreeMap<String, String>) -> StoreResult<Vec<Value>> {
        tokio::time::sleep(jitter()).await;
        self.inner.list(kind, namespace, selector).await
    }

    async fn create(&self, key: &ObjectKey, object: Value) -> StoreResult<Value> {
        tokio::time::sleep(jitter()).await;
        self.inner.create(key, object).await
    }

    async fn update(&self, key: &ObjectKey, object: Value) -> StoreResult<Value> {
        tokio::time::sleep(jitter()).await;
        self.inner.update(key, object).await
    }

    async fn delete(&self, key: &ObjectKey) -> StoreResult<()> {
        tokio::time::sleep(jitter()).await;
        self.inner.delete(key).await
    }
}

pub fn instance(name: &str) -> Instance {
    Instance {
        metadata: ObjectMeta::new(NAMESPACE, name),
        ..Default::default()
    }
}

pub fn plan(name: &str, default: bool) -> Plan {
    Plan {
        metadata: ObjectMeta::new(NAMESPACE, name),
        spec: PlanSpec {
            default,
            description: Some(format!("{} plan", name)),
            ..Default::default()
        },
    }
}

pub fn workload(name: &str, pods: &[&str]) -> Workload {
    Workload {
        metadata: ObjectMeta::new(NAMESPACE, name),
        status: WorkloadStatus {
            pods: pods.iter().map(|p| p.to_string()).collect(),
            services: Vec::new(),
        },
    }
}

pub fn replica(name: &str, ip: &str, ready: bool) -> Replica {
    Replica {
        metadata: ObjectMeta::new(NAMESPACE, name),
        ip: ip.to_string(),
        containers: vec![ContainerStatus {
            name: "nginx".to_string(),
            ready,
        }],
    }
}

pub fn seed<T: Resource>(store: &MemoryStore, objects: &[T]) {
    for object in objects {
        store.seed(object).unwrap();
    }
}

/// A manager over `store` with fast retries.
pub fn manager(store: &MemoryStore, purger: Arc<dyn CachePurger>) -> Manager {
    let mut config = ControlPlaneConfig::default();
    config.retries = RetryConfig {
        max_attempts: 3,
        base_delay_ms: 1,
        max_delay_ms: 5,
    };
    Manager::from_config(StoreHandles::single(Arc::new(store.clone())), &config, purger)
}

/// Serve the API on an ephemeral port. Returns its base URL and the
/// shutdown handle.
pub async fn spawn_api(store: &MemoryStore, purger: Arc<dyn CachePurger>) -> (String, Shutdown) {
    let server = ApiServer::new(manager(store, purger), ListenerConfig::default());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        server.run(listener, signal).await.unwrap();
    });

    (format!("http://{}", addr), shutdown)
}
