//! Supplier management endpoints.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
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
use fd_core::db::{create_supplier_repository, supplier_repo::SupplierUpdate, Pagination};
use fd_core::models::Supplier;

/// Creates supplier routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_suppliers).post(create_supplier))
        .route(
            "/:id",
            get(get_supplier).put(update_supplier).delete(delete_supplier),
        )
}

// ============================================================================
// DTOs
// ============================================================================

/// Query parameters for listing suppliers.
#[derive(Debug, Deserialize, Validate)]
pub struct ListSuppliersQuery {
    /// Restrict to active suppliers.
    pub active_only: Option<bool>,
    #[validate(range(min = 1))]
    pub page: Option<u32>,
    #[validate(range(min = 1, max = 200))]
    pub per_page: Option<u32>,
}

/// Request body for creating a supplier.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateSupplierRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub contact_name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// Request body for updating a supplier.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateSupplierRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    pub contact_name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub active: Option<bool>,
}

/// Supplier response DTO.
#[derive(Debug, Serialize, ToSchema)]
pub struct SupplierResponse {
    pub id: Uuid,
    pub name: String,
    pub contact_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub active: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

// ============================================================================
// Handlers
// ============================================================================

/// List suppliers.
async fn list_suppliers(
    State(state): State<AppState>,
    AuthenticatedUser(_user): AuthenticatedUser,
    Query(query): Query<ListSuppliersQuery>,
) -> Result<Json<PaginatedResponse<SupplierResponse>>, ApiError> {
    query.validate()?;

    let pagination = Pagination::from_query(query.page, query.per_page);

    let repo = create_supplier_repository(&state.db);
    let result = repo
        .list(query.active_only.unwrap_or(false), &pagination)
        .await?;

    Ok(Json(PaginatedResponse::from_result(result, |s| {
        supplier_to_response(&s)
    })))
}

/// Create a supplier.
async fn create_supplier(
    State(state): State<AppState>,
    RequireManager(_user): RequireManager,
    Json(request): Json<CreateSupplierRequest>,
) -> Result<(StatusCode, Json<SupplierResponse>), ApiError> {
    request.validate()?;

    let mut supplier = Supplier::new(request.name);
    supplier.contact_name = request.contact_name;
    supplier.email = request.email;
    supplier.phone = request.phone;
    supplier.address = request.address;

    let repo = create_supplier_repository(&state.db);
    let supplier = repo.create(&supplier).await?;

    Ok((StatusCode::CREATED, Json(supplier_to_response(&supplier))))
}

/// Get supplier by ID.
async fn get_supplier(
    State(state): State<AppState>,
    AuthenticatedUser(_user): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<SupplierResponse>, ApiError> {
    let repo = create_supplier_repository(&state.db);
    let supplier = repo
        .get(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Supplier {} not found", id)))?;

    Ok(Json(supplier_to_response(&supplier)))
}

/// Update a supplier.
async fn update_supplier(
    State(state): State<AppState>,
    RequireManager(_user): RequireManager,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateSupplierRequest>,
) -> Result<Json<SupplierResponse>, ApiError> {
    request.validate()?;

    let update = SupplierUpdate {
        name: request.name,
        contact_name: request.contact_name,
        email: request.email,
        phone: request.phone,
        address: request.address,
        active: request.active,
    };

    let repo = create_supplier_repository(&state.db);
    let supplier = repo.update(id, &update).await?;

    Ok(Json(supplier_to_response(&supplier)))
}

/// Delete a supplier.
///
/// Fails with 409 while purchase orders reference the supplier.
async fn delete_supplier(
    State(state): State<AppState>,
    RequireManager(_user): RequireManager,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let repo = create_supplier_repository(&state.db);

    if repo.delete(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("Supplier {} not found", id)))
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn supplier_to_response(supplier: &Supplier) -> SupplierResponse {
    SupplierResponse {
        id: supplier.id,
        name: supplier.name.clone(),
        contact_name: supplier.contact_name.clone(),
        email: supplier.email.clone(),
        phone: supplier.phone.clone(),
        address: supplier.address.clone(),
        active: supplier.active,
        created_at: supplier.created_at,
        updated_at: supplier.updated_at,
    }
}
