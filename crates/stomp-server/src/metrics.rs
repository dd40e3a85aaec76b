//! Prometheus recorder and the metric names recorded through the `metrics` facade.

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use tracing::info;

/// Install the Prometheus recorder as the global `metrics` recorder.
///
/// Call once at startup, before connections are accepted. Returns the handle
/// used to render the current values.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    info!("prometheus metrics recorder installed");
    Ok(handle)
}

/// Render Prometheus text format from an installed recorder.
pub fn render(handle: &PrometheusHandle) -> String {
    handle.render()
}

// Metric name constants to avoid typos across modules.

/// Accepted connections (counter).
pub const CONNECTIONS_TOTAL: &str = "stomp_connections_total";
/// Connections refused at the `max_connections` limit (counter).
pub const CONNECTIONS_REFUSED_TOTAL: &str = "stomp_connections_refused_total";
/// Open connections (gauge).
pub const CONNECTIONS_ACTIVE: &str = "stomp_connections_active";
/// Frames received (counter, labels: command).
pub const FRAMES_RECEIVED_TOTAL: &str = "stomp_frames_received_total";
/// Protocol errors sent to clients (counter, labels: kind).
pub const PROTOCOL_ERRORS_TOTAL: &str = "stomp_protocol_errors_total";
/// `MESSAGE` frames queued for subscribers (counter).
pub const MESSAGES_DELIVERED_TOTAL: &str = "stomp_messages_delivered_total";
/// Frames dropped because a connection's send queue was full or closed (counter).
pub const SEND_DROPS_TOTAL: &str = "stomp_send_drops_total";
