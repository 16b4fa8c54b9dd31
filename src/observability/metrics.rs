//! Metrics collection and exposition.
//!
//! # Metrics
//! - `cat_requests_total` (counter): annotation requests by outcome
//! - `cat_request_duration_seconds` (histogram): end-to-end latency
//! - `cat_upstream_requests_total` (counter): outbound calls by target and status
//!
//! # Design Decisions
//! - Recording is a no-op until an exporter is installed
//! - Labels are low-cardinality: outcome is a stage name or `ok`

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter listening on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one finished annotation request.
pub fn record_request(outcome: &'static str, start: Instant) {
    metrics::counter!("cat_requests_total", "outcome" => outcome).increment(1);
    metrics::histogram!("cat_request_duration_seconds", "outcome" => outcome)
        .record(start.elapsed().as_secs_f64());
}

/// Record one outbound call. `status` is 0 when no response arrived.
pub fn record_upstream(target: &'static str, status: u16) {
    metrics::counter!(
        "cat_upstream_requests_total",
        "target" => target,
        "status" => status.to_string()
    )
    .increment(1);
}
