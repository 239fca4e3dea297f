//! Metrics collection for FacilityDesk.
//!
//! Metric registration via the `metrics` facade with Prometheus export.
//! Counters are incremented at the call sites in `fd-api`; this module owns
//! the descriptions and the recorder installation.

use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Registers metric descriptions.
pub fn register_metrics() {
    describe_counter!("fd_tickets_created_total", "Support tickets created");
    describe_counter!("fd_tickets_resolved_total", "Support tickets resolved or closed");
    describe_counter!(
        "fd_chat_messages_total",
        "Chat messages appended to ticket threads"
    );
    describe_counter!(
        "fd_chat_handoffs_total",
        "Bot-to-human chat handoffs performed"
    );
    describe_counter!("fd_stock_movements_total", "Consumable stock movements applied");
    describe_counter!(
        "fd_stock_rejections_total",
        "Stock issues rejected for insufficient quantity"
    );
    describe_counter!("fd_assets_assigned_total", "Asset custody assignments");
    describe_counter!("fd_visits_checked_in_total", "Visitor check-ins");
    describe_counter!("fd_errors_total", "Request handler errors");

    describe_gauge!("fd_db_pool_size", "Database pool connections");
    describe_gauge!("fd_db_pool_idle", "Idle database pool connections");

    describe_histogram!(
        "fd_request_duration_seconds",
        "HTTP request handling duration"
    );
}

/// Installs the Prometheus recorder and returns the render handle.
///
/// Call once at startup; subsequent calls fail because a global recorder is
/// already installed.
pub fn init_metrics() -> Result<PrometheusHandle, Box<dyn std::error::Error>> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    register_metrics();
    Ok(handle)
}
