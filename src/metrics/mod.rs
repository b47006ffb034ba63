//! Metrics module
//!
//! Prometheus metrics for the gateway, served from `GET /metrics`.

use lazy_static::lazy_static;
use prometheus::{register_counter_vec, register_histogram_vec, CounterVec, HistogramVec, TextEncoder};

lazy_static! {
    // Request metrics
    pub static ref REQUESTS_TOTAL: CounterVec = register_counter_vec!(
        "torii_requests_total",
        "Total requests by route and status",
        &["route", "status"]
    ).unwrap();

    pub static ref REQUEST_DURATION: HistogramVec = register_histogram_vec!(
        "torii_request_duration_seconds",
        "Request duration in seconds",
        &["route"],
        vec![0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0, 30.0]
    ).unwrap();

    // Auth metrics
    pub static ref AUTH_ATTEMPTS: CounterVec = register_counter_vec!(
        "torii_auth_attempts_total",
        "Authentication attempts",
        &["status"]
    ).unwrap();

    pub static ref AUTHZ_DECISIONS: CounterVec = register_counter_vec!(
        "torii_authz_decisions_total",
        "Authorization decisions",
        &["decision"]
    ).unwrap();

    // Order metrics
    pub static ref ORDERS_TOTAL: CounterVec = register_counter_vec!(
        "torii_orders_total",
        "Commercial orders by catalogue and status",
        &["catalogue", "status"]
    ).unwrap();

    // Upstream metrics
    pub static ref UPSTREAM_ERRORS: CounterVec = register_counter_vec!(
        "torii_upstream_errors_total",
        "Upstream failures by service",
        &["service"]
    ).unwrap();
}

/// Record a completed request
pub fn record_request(route: &str, status: u16, duration_secs: f64) {
    REQUESTS_TOTAL
        .with_label_values(&[route, &status.to_string()])
        .inc();
    REQUEST_DURATION.with_label_values(&[route]).observe(duration_secs);
}

/// Record an authentication attempt
pub fn record_auth_attempt(success: bool) {
    let status = if success { "success" } else { "failure" };
    AUTH_ATTEMPTS.with_label_values(&[status]).inc();
}

/// Record an authorization decision
pub fn record_authz_decision(allowed: bool) {
    let decision = if allowed { "allow" } else { "deny" };
    AUTHZ_DECISIONS.with_label_values(&[decision]).inc();
}

/// Record an order attempt
pub fn record_order(catalogue: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    ORDERS_TOTAL.with_label_values(&[catalogue, status]).inc();
}

/// Record an upstream failure
pub fn record_upstream_error(service: &str) {
    UPSTREAM_ERRORS.with_label_values(&[service]).inc();
}

/// Encode the registry in Prometheus text format
pub fn gather() -> String {
    let encoder = TextEncoder::new();
    encoder
        .encode_to_string(&prometheus::gather())
        .unwrap_or_default()
}
