//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define proxy metrics (connections, rejections, parse failures)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `proxy_connections_accepted_total` (counter)
//! - `proxy_connections_rejected_total` (counter): admission queue full/closed
//! - `proxy_accept_errors_total` (counter)
//! - `proxy_requests_total` (counter): by method, outcome
//! - `proxy_request_failures_total` (counter): by reason
//! - `proxy_admission_queue_pending` (gauge)
//! - `proxy_request_duration_seconds` (histogram): accept to close
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed
//! - Labels are static strings only

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Duration;

/// Install the Prometheus recorder and its HTTP endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_accepted() {
    metrics::counter!("proxy_connections_accepted_total").increment(1);
}

pub fn record_rejected(reason: &'static str) {
    metrics::counter!("proxy_connections_rejected_total", "reason" => reason).increment(1);
}

pub fn record_accept_error() {
    metrics::counter!("proxy_accept_errors_total").increment(1);
}

pub fn record_queue_depth(pending: usize) {
    metrics::gauge!("proxy_admission_queue_pending").set(pending as f64);
}

pub fn record_request(method: &'static str, outcome: &'static str, elapsed: Duration) {
    metrics::counter!("proxy_requests_total", "method" => method, "outcome" => outcome).increment(1);
    metrics::histogram!("proxy_request_duration_seconds").record(elapsed.as_secs_f64());
}

pub fn record_failure(reason: &'static str) {
    metrics::counter!("proxy_request_failures_total", "reason" => reason).increment(1);
}
