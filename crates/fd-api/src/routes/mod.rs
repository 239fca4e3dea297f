//! API routes.

pub mod assets;
pub mod auth;
pub mod consumables;
pub mod employees;
pub mod health;
pub mod metrics;
pub mod purchase_orders;
pub mod sla_policies;
pub mod suppliers;
pub mod tickets;
pub mod users;
pub mod visitors;

use crate::state::AppState;
use axum::Router;
use serde::Serialize;

use fd_core::db::PaginatedResult;

/// Creates the main API router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", api_routes())
        .merge(health::routes())
        .merge(metrics::prometheus_routes())
        .with_state(state)
}

/// API routes under the /api/v1 prefix.
fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::routes())
        .nest("/admin/users", users::routes())
        .nest("/assets", assets::routes())
        .nest("/employees", employees::routes())
        .nest("/consumables", consumables::routes())
        .nest("/suppliers", suppliers::routes())
        .nest("/purchase-orders", purchase_orders::routes())
        .nest("/tickets", tickets::routes())
        .nest("/visitors", visitors::routes())
        .nest("/visits", visitors::visit_routes())
        .nest("/sla-policies", sla_policies::routes())
        .nest("/metrics", metrics::routes())
}

/// Paginated response wrapper shared by list endpoints.
#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub page: u32,
    pub per_page: u32,
    pub total_items: u64,
    pub total_pages: u32,
}

impl<T> PaginatedResponse<T> {
    /// Builds the wrapper from a repo result, mapping rows to DTOs.
    pub fn from_result<R>(result: PaginatedResult<R>, f: impl FnMut(R) -> T) -> Self {
        let page = result.page;
        let per_page = result.per_page;
        let total_items = result.total;
        let total_pages = result.total_pages;
        Self {
            data: result.items.into_iter().map(f).collect(),
            page,
            per_page,
            total_items,
            total_pages,
        }
    }
}
