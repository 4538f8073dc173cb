//! Metrics collection and exposition.
//!
//! # Metrics
//! - `assistant_chat_requests_total` (counter): chat relays by status
//! - `assistant_chat_duration_seconds` (histogram): end-to-end relay latency
//! - `assistant_upstream_retries_total` (counter): upstream retry attempts
//! - `assistant_rate_limited_total` (counter): requests rejected by the limiter
//! - `assistant_registration_events_total` (counter): flow events by resulting state
//! - `assistant_registration_sessions` (gauge): live registration sessions

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_chat(status: u16, start: Instant) {
    counter!("assistant_chat_requests_total", "status" => status.to_string()).increment(1);
    histogram!("assistant_chat_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_upstream_retry() {
    counter!("assistant_upstream_retries_total").increment(1);
}

pub fn record_rate_limited(route: &'static str) {
    counter!("assistant_rate_limited_total", "route" => route).increment(1);
}

pub fn record_registration_event(state: &'static str) {
    counter!("assistant_registration_events_total", "state" => state).increment(1);
}

pub fn set_registration_sessions(count: usize) {
    gauge!("assistant_registration_sessions").set(count as f64);
}
