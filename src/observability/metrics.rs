//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_http_requests_total` (counter): requests by method, status class
//! - `gateway_http_request_duration_seconds` (histogram): latency distribution
//! - `gateway_rpc_serve_failures_total` (counter): RPC listener failures after bind
//! - `gateway_secret_generated_total` (counter): session secrets created
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed, so tests need no setup
//! - Status is reported by class (2xx, 4xx, ...) to bound label cardinality

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;
use std::time::Instant;

/// Install the Prometheus recorder and its scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

/// Record one finished HTTP request.
pub fn record_request(method: &str, status: u16, start: Instant) {
    let method = method.to_string();
    let class = status_class(status);
    metrics::counter!(
        "gateway_http_requests_total",
        "method" => method.clone(),
        "status" => class
    )
    .increment(1);
    metrics::histogram!(
        "gateway_http_request_duration_seconds",
        "method" => method,
        "status" => class
    )
    .record(start.elapsed().as_secs_f64());
}

/// Record an RPC serve loop that failed after a successful bind.
pub fn record_rpc_serve_failure() {
    metrics::counter!("gateway_rpc_serve_failures_total").increment(1);
}

/// Record creation of a new session secret.
pub fn record_secret_generated() {
    metrics::counter!("gateway_secret_generated_total").increment(1);
}

fn status_class(status: u16) -> &'static str {
    match status {
        100..=199 => "1xx",
        200..=299 => "2xx",
        300..=399 => "3xx",
        400..=499 => "4xx",
        _ => "5xx",
    }
}
