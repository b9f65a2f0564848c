//! Prometheus metrics exposition
//!
//! - `gateway_requests_total` (counter): labels `status`, `method`
//! - `gateway_request_duration_seconds` (histogram): label `status`
//! - `gateway_token_exchanges_total` (counter): label `outcome`
//! - `gateway_rate_limited_total` (counter), recorded by the rate limiter
//! - `gateway_upstream_errors_total` (counter): labels `surface`,
//!   `classification`, recorded by the API client
//! - `gateway_token_refreshes_total` (counter): label `outcome`, recorded by
//!   the client factory

use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};

const DURATION_METRIC: &str = "gateway_request_duration_seconds";

/// Buckets from 5ms to 60s; video uploads sit at the slow end.
const DURATION_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0,
];

fn builder() -> PrometheusBuilder {
    PrometheusBuilder::new()
        .set_buckets_for_metric(Matcher::Full(DURATION_METRIC.to_string()), DURATION_BUCKETS)
        .expect("histogram buckets are non-empty")
}

/// Install the global Prometheus recorder and return a handle for rendering.
pub fn install_recorder() -> PrometheusHandle {
    builder()
        .install_recorder()
        .expect("failed to install Prometheus recorder")
}

/// Recorder handle that is not installed globally, for tests.
#[cfg(test)]
pub fn test_handle() -> PrometheusHandle {
    builder().build_recorder().handle()
}

/// Record a completed request with status code and HTTP method labels.
pub fn record_request(status: u16, method: &str, duration_secs: f64) {
    let status_str = status.to_string();
    metrics::counter!("gateway_requests_total", "status" => status_str.clone(), "method" => method.to_string())
        .increment(1);
    metrics::histogram!(DURATION_METRIC, "status" => status_str).record(duration_secs);
}

/// Record the outcome of an authorization-code exchange.
pub fn record_token_exchange(outcome: &'static str) {
    metrics::counter!("gateway_token_exchanges_total", "outcome" => outcome).increment(1);
}
