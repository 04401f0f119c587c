//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): requests by method, status, rule
//! - `proxy_request_duration_seconds` (histogram): latency by rule
//! - `proxy_upstream_errors_total` (counter): upstream failures by rule, kind
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Rule label used when no rewrite matched.
pub const NO_RULE: &str = "none";

/// Install the Prometheus exporter with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Record a completed request.
pub fn record_request(method: &str, status: u16, rule: &str, start: Instant) {
    metrics::counter!(
        "proxy_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "rule" => rule.to_string()
    )
    .increment(1);

    metrics::histogram!("proxy_request_duration_seconds", "rule" => rule.to_string())
        .record(start.elapsed().as_secs_f64());
}

/// Record an upstream failure (`connect`, `timeout`, `request`).
pub fn record_upstream_error(rule: &str, kind: &'static str) {
    metrics::counter!(
        "proxy_upstream_errors_total",
        "rule" => rule.to_string(),
        "kind" => kind
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_init_metrics_fails_on_taken_address() {
        let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = taken.local_addr().unwrap();

        let err = init_metrics(addr).unwrap_err();
        assert!(matches!(err, BuildError::FailedToCreateHTTPListener(_)));
    }
}
