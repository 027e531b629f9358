//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gatekeeper_requests_total` (counter): requests by method, status, service
//! - `gatekeeper_request_duration_seconds` (histogram): latency by method, service
//! - `gatekeeper_auth_failures_total` (counter): rejected credentials
//! - `gatekeeper_plugin_rejections_total` (counter): hook rejections by plugin, stage

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::plugins::HookStage;

/// Install the Prometheus recorder and its scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Record a finished request. `service` is `"none"` when no route matched.
pub fn record_request(method: &str, status: u16, service: &str, start: Instant) {
    counter!(
        "gatekeeper_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "service" => service.to_string()
    )
    .increment(1);

    histogram!(
        "gatekeeper_request_duration_seconds",
        "method" => method.to_string(),
        "service" => service.to_string()
    )
    .record(start.elapsed().as_secs_f64());
}

pub fn record_auth_failure() {
    counter!("gatekeeper_auth_failures_total").increment(1);
}

pub fn record_plugin_rejection(plugin: &str, stage: HookStage) {
    counter!(
        "gatekeeper_plugin_rejections_total",
        "plugin" => plugin.to_string(),
        "stage" => stage.as_str()
    )
    .increment(1);
}
