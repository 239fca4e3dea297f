//! Metrics endpoints: Prometheus text format and a JSON summary for
//! dashboard tiles.

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::state::AppState;
use fd_core::db::{
    create_asset_repository, create_consumable_repository, create_ticket_repository,
    create_visitor_repository,
};

/// Routes mounted at the root (Prometheus scrape target).
pub fn prometheus_routes() -> Router<AppState> {
    Router::new().route("/metrics", get(prometheus_metrics))
}

/// Routes nested under /api/v1/metrics.
pub fn routes() -> Router<AppState> {
    Router::new().route("/summary", get(summary))
}

/// Prometheus exposition endpoint.
async fn prometheus_metrics(State(state): State<AppState>) -> Result<String, StatusCode> {
    let handle = state
        .prometheus_handle
        .as_ref()
        .ok_or(StatusCode::NOT_IMPLEMENTED)?;

    metrics::gauge!("fd_db_pool_size").set(state.db.pool_size() as f64);
    metrics::gauge!("fd_db_pool_idle").set(state.db.idle_connections() as f64);

    Ok(handle.render())
}

/// JSON counters for the dashboard tiles.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MetricsSummary {
    /// Open (non-terminal) tickets grouped by priority.
    pub open_tickets_by_priority: HashMap<String, u64>,
    /// Assets grouped by status.
    pub assets_by_status: HashMap<String, u64>,
    /// Consumable items at or below reorder level.
    pub low_stock_items: u64,
    /// Visitors currently on site.
    pub open_visits: u64,
}

/// Dashboard summary counters.
#[utoipa::path(
    get,
    path = "/api/v1/metrics/summary",
    responses(
        (status = 200, description = "Summary counters", body = MetricsSummary)
    ),
    tag = "Metrics"
)]
pub(crate) async fn summary(State(state): State<AppState>) -> Result<Json<MetricsSummary>, ApiError> {
    let tickets = create_ticket_repository(&state.db);
    let assets = create_asset_repository(&state.db);
    let consumables = create_consumable_repository(&state.db);
    let visitors = create_visitor_repository(&state.db);

    let open_tickets_by_priority = tickets
        .count_open_by_priority()
        .await?
        .into_iter()
        .map(|(priority, count)| (priority.to_string(), count))
        .collect();

    let assets_by_status = assets
        .count_by_status()
        .await?
        .into_iter()
        .map(|(status, count)| (status.to_string(), count))
        .collect();

    let low_stock_items = consumables.low_stock().await?.len() as u64;
    let open_visits = visitors.count_open_visits().await?;

    Ok(Json(MetricsSummary {
        open_tickets_by_priority,
        assets_by_status,
        low_stock_items,
        open_visits,
    }))
}
