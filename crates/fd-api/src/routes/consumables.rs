//! Consumable stock endpoints.
//!
//! Item CRUD plus the ledger operations: restock, issue, adjust, and the
//! transaction history. Quantity never moves through the item update
//! endpoint.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::auth::{AuthenticatedUser, RequireManager};
use crate::error::ApiError;
use crate::routes::PaginatedResponse;
use crate::state::AppState;
use fd_core::db::{
    create_consumable_repository, ConsumableFilter, ConsumableUpdate, Pagination,
};
use fd_core::models::{ConsumableItem, ConsumableTransaction};

/// Creates consumable routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_items).post(create_item))
        .route("/low-stock", get(low_stock))
        .route("/:id", get(get_item).put(update_item).delete(delete_item))
        .route("/:id/restock", post(restock))
        .route("/:id/issue", post(issue))
        .route("/:id/adjust", post(adjust))
        .route("/:id/transactions", get(list_transactions))
}

// ============================================================================
// DTOs
// ============================================================================

/// Query parameters for listing items.
#[derive(Debug, Deserialize, Validate)]
pub struct ListItemsQuery {
    /// Search over name and SKU.
    pub search: Option<String>,
    /// Filter by category.
    pub category: Option<String>,
    #[validate(range(min = 1))]
    pub page: Option<u32>,
    #[validate(range(min = 1, max = 200))]
    pub per_page: Option<u32>,
}

/// Request body for creating an item.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateItemRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(min = 1, max = 64))]
    pub sku: String,
    pub category: Option<String>,
    #[validate(length(min = 1, max = 32))]
    pub unit: String,
    #[validate(range(min = 0))]
    pub reorder_level: Option<i64>,
    pub location: Option<String>,
}

/// Request body for updating an item.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateItemRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    pub category: Option<String>,
    #[validate(length(min = 1, max = 32))]
    pub unit: Option<String>,
    #[validate(range(min = 0))]
    pub reorder_level: Option<i64>,
    pub location: Option<String>,
}

/// Request body for a restock.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RestockRequest {
    /// Units received.
    #[validate(range(min = 1))]
    pub quantity: i64,
    /// External reference, e.g. a purchase order number.
    pub reference: Option<String>,
    pub note: Option<String>,
}

/// Request body for an issue.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct IssueRequest {
    /// Units handed out.
    #[validate(range(min = 1))]
    pub quantity: i64,
    /// Receiving employee.
    pub employee_id: Option<Uuid>,
    pub note: Option<String>,
}

/// Request body for a stocktake adjustment.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AdjustRequest {
    /// The counted on-hand quantity.
    #[validate(range(min = 0))]
    pub counted_quantity: i64,
    pub note: Option<String>,
}

/// Item response DTO.
#[derive(Debug, Serialize, ToSchema)]
pub struct ItemResponse {
    pub id: Uuid,
    pub name: String,
    pub sku: String,
    pub category: Option<String>,
    pub unit: String,
    pub quantity: i64,
    pub reorder_level: i64,
    pub low_stock: bool,
    pub location: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// Ledger row response DTO.
#[derive(Debug, Serialize, ToSchema)]
pub struct TransactionResponse {
    pub id: Uuid,
    pub item_id: Uuid,
    pub kind: String,
    pub quantity: i64,
    pub balance_after: i64,
    pub employee_id: Option<Uuid>,
    pub reference: Option<String>,
    pub note: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Response for a stock movement: the updated item and the ledger row.
#[derive(Debug, Serialize, ToSchema)]
pub struct MovementResponse {
    pub item: ItemResponse,
    pub transaction: TransactionResponse,
}

// ============================================================================
// Handlers
// ============================================================================

/// List items with pagination and filters.
async fn list_items(
    State(state): State<AppState>,
    AuthenticatedUser(_user): AuthenticatedUser,
    Query(query): Query<ListItemsQuery>,
) -> Result<Json<PaginatedResponse<ItemResponse>>, ApiError> {
    query.validate()?;

    let filter = ConsumableFilter {
        search: query.search,
        category: query.category,
    };
    let pagination = Pagination::from_query(query.page, query.per_page);

    let repo = create_consumable_repository(&state.db);
    let result = repo.list(&filter, &pagination).await?;

    Ok(Json(PaginatedResponse::from_result(result, |i| {
        item_to_response(&i)
    })))
}

/// Items at or below their reorder level.
async fn low_stock(
    State(state): State<AppState>,
    AuthenticatedUser(_user): AuthenticatedUser,
) -> Result<Json<Vec<ItemResponse>>, ApiError> {
    let repo = create_consumable_repository(&state.db);
    let items = repo.low_stock().await?;

    Ok(Json(items.iter().map(item_to_response).collect()))
}

/// Create a new item.
async fn create_item(
    State(state): State<AppState>,
    AuthenticatedUser(_user): AuthenticatedUser,
    Json(request): Json<CreateItemRequest>,
) -> Result<(StatusCode, Json<ItemResponse>), ApiError> {
    request.validate()?;

    let repo = create_consumable_repository(&state.db);

    if let Some(existing) = repo.get_by_sku(&request.sku).await? {
        return Err(ApiError::Conflict(format!(
            "SKU '{}' is already used by '{}'",
            existing.sku, existing.name
        )));
    }

    let mut item = ConsumableItem::new(request.name, request.sku, request.unit);
    item.category = request.category;
    item.reorder_level = request.reorder_level.unwrap_or(0);
    item.location = request.location;

    let item = repo.create(&item).await?;

    Ok((StatusCode::CREATED, Json(item_to_response(&item))))
}

/// Get item by ID.
async fn get_item(
    State(state): State<AppState>,
    AuthenticatedUser(_user): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ItemResponse>, ApiError> {
    let repo = create_consumable_repository(&state.db);
    let item = repo
        .get(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Consumable item {} not found", id)))?;

    Ok(Json(item_to_response(&item)))
}

/// Update an item's descriptive fields.
async fn update_item(
    State(state): State<AppState>,
    AuthenticatedUser(_user): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateItemRequest>,
) -> Result<Json<ItemResponse>, ApiError> {
    request.validate()?;

    let update = ConsumableUpdate {
        name: request.name,
        category: request.category,
        unit: request.unit,
        reorder_level: request.reorder_level,
        location: request.location,
    };

    let repo = create_consumable_repository(&state.db);
    let item = repo.update(id, &update).await?;

    Ok(Json(item_to_response(&item)))
}

/// Record a delivery.
async fn restock(
    State(state): State<AppState>,
    AuthenticatedUser(_user): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<RestockRequest>,
) -> Result<Json<MovementResponse>, ApiError> {
    request.validate()?;

    let (item, transaction) = state
        .stock
        .restock(id, request.quantity, request.reference, request.note)
        .await?;

    metrics::counter!("fd_stock_movements_total").increment(1);

    Ok(Json(movement_response(item, transaction)))
}

/// Hand stock out to an employee.
async fn issue(
    State(state): State<AppState>,
    AuthenticatedUser(_user): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<IssueRequest>,
) -> Result<Json<MovementResponse>, ApiError> {
    request.validate()?;

    let result = state
        .stock
        .issue(id, request.quantity, request.employee_id, request.note)
        .await;

    match result {
        Ok((item, transaction)) => {
            metrics::counter!("fd_stock_movements_total").increment(1);
            Ok(Json(movement_response(item, transaction)))
        }
        Err(err) => {
            if matches!(err, fd_core::StockError::InsufficientStock { .. }) {
                metrics::counter!("fd_stock_rejections_total").increment(1);
            }
            Err(err.into())
        }
    }
}

/// Correct the count after a stocktake.
async fn adjust(
    State(state): State<AppState>,
    RequireManager(_user): RequireManager,
    Path(id): Path<Uuid>,
    Json(request): Json<AdjustRequest>,
) -> Result<Json<MovementResponse>, ApiError> {
    request.validate()?;

    let (item, transaction) = state
        .stock
        .adjust(id, request.counted_quantity, request.note)
        .await?;

    metrics::counter!("fd_stock_movements_total").increment(1);

    Ok(Json(movement_response(item, transaction)))
}

/// Ledger rows for an item, newest first.
async fn list_transactions(
    State(state): State<AppState>,
    AuthenticatedUser(_user): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Query(query): Query<ListItemsQuery>,
) -> Result<Json<PaginatedResponse<TransactionResponse>>, ApiError> {
    query.validate()?;

    let pagination = Pagination::from_query(query.page, query.per_page);

    let repo = create_consumable_repository(&state.db);
    repo.get(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Consumable item {} not found", id)))?;

    let result = repo.list_transactions(id, &pagination).await?;

    Ok(Json(PaginatedResponse::from_result(result, |t| {
        transaction_to_response(&t)
    })))
}

/// Delete an item.
///
/// Fails with 409 while ledger rows reference the item.
async fn delete_item(
    State(state): State<AppState>,
    RequireManager(_user): RequireManager,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let repo = create_consumable_repository(&state.db);

    if repo.delete(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!(
            "Consumable item {} not found",
            id
        )))
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn item_to_response(item: &ConsumableItem) -> ItemResponse {
    ItemResponse {
        id: item.id,
        name: item.name.clone(),
        sku: item.sku.clone(),
        category: item.category.clone(),
        unit: item.unit.clone(),
        quantity: item.quantity,
        reorder_level: item.reorder_level,
        low_stock: item.is_low_stock(),
        location: item.location.clone(),
        created_at: item.created_at,
        updated_at: item.updated_at,
    }
}

fn transaction_to_response(tx: &ConsumableTransaction) -> TransactionResponse {
    TransactionResponse {
        id: tx.id,
        item_id: tx.item_id,
        kind: tx.kind.to_string(),
        quantity: tx.quantity,
        balance_after: tx.balance_after,
        employee_id: tx.employee_id,
        reference: tx.reference.clone(),
        note: tx.note.clone(),
        created_at: tx.created_at,
    }
}

fn movement_response(item: ConsumableItem, tx: ConsumableTransaction) -> MovementResponse {
    MovementResponse {
        item: item_to_response(&item),
        transaction: transaction_to_response(&tx),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_to_response_low_stock_flag() {
        let mut item = ConsumableItem::new("Paper", "PAP-1", "ream");
        item.quantity = 3;
        item.reorder_level = 5;
        assert!(item_to_response(&item).low_stock);

        item.quantity = 10;
        assert!(!item_to_response(&item).low_stock);
    }
}
