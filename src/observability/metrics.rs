//! Metrics collection and exposition.
//!
//! # Metrics
//! - `broadcaster_tx_submitted_total` (counter): transactions accepted into a mempool
//! - `broadcaster_tx_outcome_total` (counter): terminal states by `outcome`
//! - `broadcaster_confirmation_seconds` (histogram): submit → inclusion latency
//! - `broadcaster_endpoint_health` (gauge): 1=healthy, 0=unhealthy, by `endpoint`

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::blockchain::types::TxState;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

/// A signed transaction was accepted by a node.
pub fn record_submitted() {
    metrics::counter!("broadcaster_tx_submitted_total").increment(1);
}

/// A transaction reached a terminal state.
pub fn record_outcome(state: TxState) {
    metrics::counter!("broadcaster_tx_outcome_total", "outcome" => state.as_str()).increment(1);
}

pub fn record_confirmation_latency(seconds: f64) {
    metrics::histogram!("broadcaster_confirmation_seconds").record(seconds);
}

/// Record whether a REST endpoint answered.
pub fn record_endpoint_health(endpoint: &str, healthy: bool) {
    metrics::gauge!("broadcaster_endpoint_health", "endpoint" => endpoint.to_string())
        .set(if healthy { 1.0 } else { 0.0 });
}
