//! Metrics collection and exposition.
//!
//! # Metrics
//! - `rpaas_operations_total` (counter): manager operations by name, outcome
//! - `rpaas_operation_duration_seconds` (histogram): manager operation latency
//! - `rpaas_purge_requests_total` (counter): per-replica purge calls by result
//! - `rpaas_store_writes_total` (counter): store writes by kind, verb
//! - `rpaas_store_conflicts_total` (counter): rejected stale writes by kind
//! - `rpaas_api_requests_total` (counter): API requests by method, status

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_operation(operation: &'static str, outcome: &'static str, start: Instant) {
    metrics::counter!("rpaas_operations_total", "operation" => operation, "outcome" => outcome)
        .increment(1);
    metrics::histogram!("rpaas_operation_duration_seconds", "operation" => operation)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_purge(result: &'static str) {
    metrics::counter!("rpaas_purge_requests_total", "result" => result).increment(1);
}

pub fn record_store_write(kind: &str, verb: &'static str) {
    metrics::counter!("rpaas_store_writes_total", "kind" => kind.to_string(), "verb" => verb)
        .increment(1);
}

pub fn record_store_conflict(kind: &str) {
    metrics::counter!("rpaas_store_conflicts_total", "kind" => kind.to_string()).increment(1);
}

pub fn record_api_request(method: &str, status: u16) {
    metrics::counter!(
        "rpaas_api_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}
