//! Prometheus metrics for monitoring tournament server health.
//!
//! Metrics are exposed in Prometheus text format on a separate listener when
//! `METRICS_BIND` is configured. Without an installed recorder every call
//! here is a no-op.
//!
//! # Metrics Categories
//!
//! - **HTTP Metrics**: Request counts and duration by route and status
//! - **WebSocket Metrics**: Active observer connections
//! - **Event Metrics**: Events published, delivered and dropped by the hub
//! - **Registration Metrics**: Registrations accepted and rejected

use metrics_exporter_prometheus::PrometheusBuilder;
use nexus_tournaments::events::EventHub;
use std::{net::SocketAddr, time::Duration};

/// How often hub totals are copied into the recorder
pub const HUB_SAMPLE_INTERVAL: Duration = Duration::from_secs(5);

/// Initialize Prometheus metrics exporter.
///
/// Metrics will be available at `http://<addr>/metrics`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {}", e))
}

// ============================================================================
// HTTP Metrics
// ============================================================================

/// Record HTTP request.
pub fn http_requests_total(method: &str, path: &str, status: u16) {
    metrics::counter!("http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record HTTP request duration in milliseconds.
pub fn http_request_duration_ms(method: &str, path: &str, duration_ms: f64) {
    metrics::histogram!("http_request_duration_ms",
        "method" => method.to_string(),
        "path" => path.to_string()
    )
    .record(duration_ms);
}

// ============================================================================
// WebSocket Metrics
// ============================================================================

/// A live event stream was opened.
pub fn websocket_observer_connected(stream: &'static str) {
    metrics::gauge!("websocket_observers_active", "stream" => stream).increment(1.0);
    metrics::counter!("websocket_connections_total", "stream" => stream).increment(1);
}

/// A live event stream was closed.
pub fn websocket_observer_disconnected(stream: &'static str) {
    metrics::gauge!("websocket_observers_active", "stream" => stream).decrement(1.0);
}

/// Increment WebSocket messages sent counter.
pub fn websocket_messages_sent() {
    metrics::counter!("websocket_messages_sent").increment(1);
}

// ============================================================================
// Event Metrics
// ============================================================================

/// Copy the hub's running totals into the recorder.
pub fn record_hub_stats(hub: &EventHub) {
    let stats = hub.stats();
    metrics::counter!("events_published_total").absolute(stats.published);
    metrics::counter!("events_delivered_total").absolute(stats.delivered);
    metrics::counter!("events_dropped_total").absolute(stats.dropped);
    metrics::gauge!("event_partitions_active").set(hub.partition_count() as f64);
    metrics::gauge!("event_observers_active").set(hub.observer_count() as f64);
}

/// Sample hub totals until the runtime shuts down.
pub fn spawn_hub_sampler(hub: EventHub) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(HUB_SAMPLE_INTERVAL);
        loop {
            ticker.tick().await;
            record_hub_stats(&hub);
        }
    })
}

// ============================================================================
// Registration Metrics
// ============================================================================

/// Increment registration counter, labelled with the outcome.
pub fn team_registrations_total(outcome: &str) {
    metrics::counter!("team_registrations_total",
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Increment the capacity rejection counter.
pub fn capacity_rejections_total() {
    metrics::counter!("capacity_rejections_total").increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_recorder_is_noop() {
        http_requests_total("GET", "/health", 200);
        http_request_duration_ms("GET", "/health", 1.5);
        websocket_observer_connected("tournament");
        websocket_observer_disconnected("tournament");
        team_registrations_total("accepted");
        capacity_rejections_total();
        record_hub_stats(&EventHub::default());
    }
}
