//! Observability infrastructure for FacilityDesk.
//!
//! Structured logging via the tracing ecosystem and metrics registration
//! with a Prometheus exporter.

pub mod logging;
pub mod metrics;

pub use logging::{init_logging, init_logging_with_config, LoggingConfig};
pub use metrics::{init_metrics, register_metrics};
