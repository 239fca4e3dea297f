//! Health check endpoints.

use axum::{extract::State, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use utoipa::ToSchema;

use crate::state::AppState;

/// Start time for uptime calculation.
static START_TIME: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();

/// Initialize the start time.
pub fn init_start_time() {
    START_TIME.get_or_init(Instant::now);
}

/// Creates health check routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/health/detailed", get(health_check_detailed))
        .route("/ready", get(readiness_check))
        .route("/live", get(liveness_check))
}

/// Health response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Overall status: healthy, degraded, or unhealthy.
    pub status: String,
    /// Service version.
    pub version: String,
    /// Database health.
    pub database: DatabaseHealth,
    /// Seconds since the server started.
    pub uptime_seconds: u64,
    /// Component detail (only on /health/detailed).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub components: Option<ComponentsHealth>,
}

/// Database health detail.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DatabaseHealth {
    pub connected: bool,
    pub pool_size: u32,
    pub idle_connections: usize,
}

/// Component health detail.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ComponentsHealth {
    /// Event bus subscriber count.
    pub event_bus_subscribers: usize,
    /// Database backend in use (sqlite or postgres).
    pub database_backend: String,
}

/// Health check endpoint.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "System is healthy", body = HealthResponse),
        (status = 503, description = "System is unhealthy", body = HealthResponse)
    ),
    tag = "Health"
)]
pub(crate) async fn health_check(
    State(state): State<AppState>,
) -> (axum::http::StatusCode, Json<HealthResponse>) {
    let db_healthy = state.db.is_healthy().await;
    let uptime = START_TIME.get().map(|t| t.elapsed().as_secs()).unwrap_or(0);

    let status = if db_healthy { "healthy" } else { "unhealthy" };
    let http_status = if db_healthy {
        axum::http::StatusCode::OK
    } else {
        axum::http::StatusCode::SERVICE_UNAVAILABLE
    };

    (
        http_status,
        Json(HealthResponse {
            status: status.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            database: DatabaseHealth {
                connected: db_healthy,
                pool_size: state.db.pool_size(),
                idle_connections: state.db.idle_connections(),
            },
            uptime_seconds: uptime,
            components: None,
        }),
    )
}

/// Detailed health check endpoint.
#[utoipa::path(
    get,
    path = "/health/detailed",
    responses(
        (status = 200, description = "Detailed system health", body = HealthResponse),
        (status = 503, description = "System is unhealthy", body = HealthResponse)
    ),
    tag = "Health"
)]
pub(crate) async fn health_check_detailed(
    State(state): State<AppState>,
) -> (axum::http::StatusCode, Json<HealthResponse>) {
    let db_healthy = state.db.is_healthy().await;
    let uptime = START_TIME.get().map(|t| t.elapsed().as_secs()).unwrap_or(0);

    let status = if db_healthy { "healthy" } else { "unhealthy" };
    let http_status = if db_healthy {
        axum::http::StatusCode::OK
    } else {
        axum::http::StatusCode::SERVICE_UNAVAILABLE
    };

    (
        http_status,
        Json(HealthResponse {
            status: status.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            database: DatabaseHealth {
                connected: db_healthy,
                pool_size: state.db.pool_size(),
                idle_connections: state.db.idle_connections(),
            },
            uptime_seconds: uptime,
            components: Some(ComponentsHealth {
                event_bus_subscribers: state.event_bus.subscriber_count(),
                database_backend: state.db.db_type().to_string(),
            }),
        }),
    )
}

/// Kubernetes readiness probe.
#[utoipa::path(
    get,
    path = "/ready",
    responses(
        (status = 200, description = "Service is ready"),
        (status = 503, description = "Service is not ready")
    ),
    tag = "Health"
)]
pub(crate) async fn readiness_check(State(state): State<AppState>) -> axum::http::StatusCode {
    if state.db.is_healthy().await {
        axum::http::StatusCode::OK
    } else {
        axum::http::StatusCode::SERVICE_UNAVAILABLE
    }
}

/// Kubernetes liveness probe.
#[utoipa::path(
    get,
    path = "/live",
    responses(
        (status = 200, description = "Service is alive")
    ),
    tag = "Health"
)]
pub(crate) async fn liveness_check() -> axum::http::StatusCode {
    axum::http::StatusCode::OK
}
