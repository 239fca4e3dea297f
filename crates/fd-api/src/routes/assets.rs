//! Asset management endpoints.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::auth::{AuthenticatedUser, RequireManager};
use crate::error::ApiError;
use crate::state::AppState;
use fd_core::db::{
    create_asset_repository, create_employee_repository, AssetFilter, AssetUpdate, Pagination,
};
use fd_core::models::{Asset, AssetCategory, AssetStatus, CustodyRecord};
use fd_core::DeskEvent;

/// Creates asset routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_assets).post(create_asset))
        .route(
            "/:id",
            get(get_asset).put(update_asset).delete(delete_asset),
        )
        .route("/:id/assign", post(assign_asset))
        .route("/:id/unassign", post(unassign_asset))
        .route("/:id/custody", get(custody_history))
}

// ============================================================================
// DTOs
// ============================================================================

/// Query parameters for listing assets.
#[derive(Debug, Deserialize, Validate)]
pub struct ListAssetsQuery {
    /// Search over tag, name, and serial number.
    pub search: Option<String>,
    /// Filter by category.
    pub category: Option<String>,
    /// Filter by status.
    pub status: Option<String>,
    /// Filter by current custodian.
    pub custodian_id: Option<Uuid>,
    /// Page number (1-indexed).
    #[validate(range(min = 1))]
    pub page: Option<u32>,
    /// Items per page.
    #[validate(range(min = 1, max = 200))]
    pub per_page: Option<u32>,
}

/// Request body for creating an asset.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateAssetRequest {
    /// Inventory tag (unique).
    #[validate(length(min = 1, max = 64))]
    pub asset_tag: String,
    /// Descriptive name.
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    /// Category.
    pub category: String,
    pub serial_number: Option<String>,
    pub model: Option<String>,
    pub location: Option<String>,
    pub purchase_date: Option<NaiveDate>,
    pub warranty_expires: Option<NaiveDate>,
    pub notes: Option<String>,
}

/// Request body for updating an asset.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateAssetRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    pub category: Option<String>,
    /// Status change via the edit form (e.g. sending a unit to repair).
    pub status: Option<String>,
    pub serial_number: Option<String>,
    pub model: Option<String>,
    pub location: Option<String>,
    pub purchase_date: Option<NaiveDate>,
    pub warranty_expires: Option<NaiveDate>,
    pub notes: Option<String>,
}

/// Request body for assigning an asset.
#[derive(Debug, Deserialize, ToSchema)]
pub struct AssignAssetRequest {
    /// Employee taking custody.
    pub employee_id: Uuid,
}

/// Asset response DTO.
#[derive(Debug, Serialize, ToSchema)]
pub struct AssetResponse {
    pub id: Uuid,
    pub asset_tag: String,
    pub name: String,
    pub category: String,
    pub status: String,
    pub serial_number: Option<String>,
    pub model: Option<String>,
    pub location: Option<String>,
    pub purchase_date: Option<NaiveDate>,
    pub warranty_expires: Option<NaiveDate>,
    pub custodian_id: Option<Uuid>,
    pub notes: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// Custody record response DTO.
#[derive(Debug, Serialize, ToSchema)]
pub struct CustodyResponse {
    pub id: Uuid,
    pub asset_id: Uuid,
    pub employee_id: Uuid,
    pub assigned_at: chrono::DateTime<chrono::Utc>,
    pub returned_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Paginated response wrapper for assets.
#[derive(Debug, Serialize, ToSchema)]
pub struct PaginatedAssetResponse {
    pub data: Vec<AssetResponse>,
    pub page: u32,
    pub per_page: u32,
    pub total_items: u64,
    pub total_pages: u32,
}

// ============================================================================
// Handlers
// ============================================================================

/// List assets with pagination and filters.
#[utoipa::path(
    get,
    path = "/api/v1/assets",
    responses(
        (status = 200, description = "Assets matching the filters", body = PaginatedAssetResponse)
    ),
    tag = "Assets"
)]
pub(crate) async fn list_assets(
    State(state): State<AppState>,
    AuthenticatedUser(_user): AuthenticatedUser,
    Query(query): Query<ListAssetsQuery>,
) -> Result<Json<PaginatedAssetResponse>, ApiError> {
    query.validate()?;

    let filter = AssetFilter {
        search: query.search,
        category: query.category.as_deref().map(parse_category).transpose()?,
        status: query.status.as_deref().map(parse_status).transpose()?,
        custodian_id: query.custodian_id,
    };
    let pagination = Pagination::from_query(query.page, query.per_page);

    let repo = create_asset_repository(&state.db);
    let result = repo.list(&filter, &pagination).await?;

    Ok(Json(PaginatedAssetResponse {
        page: result.page,
        per_page: result.per_page,
        total_items: result.total,
        total_pages: result.total_pages,
        data: result.items.iter().map(asset_to_response).collect(),
    }))
}

/// Create a new asset.
#[utoipa::path(
    post,
    path = "/api/v1/assets",
    request_body = CreateAssetRequest,
    responses(
        (status = 201, description = "Asset created", body = AssetResponse),
        (status = 409, description = "Duplicate asset tag")
    ),
    tag = "Assets"
)]
pub(crate) async fn create_asset(
    State(state): State<AppState>,
    AuthenticatedUser(_user): AuthenticatedUser,
    Json(request): Json<CreateAssetRequest>,
) -> Result<(StatusCode, Json<AssetResponse>), ApiError> {
    request.validate()?;

    let repo = create_asset_repository(&state.db);

    if let Some(existing) = repo.get_by_tag(&request.asset_tag).await? {
        return Err(ApiError::Conflict(format!(
            "Asset tag '{}' is already used by '{}'",
            existing.asset_tag, existing.name
        )));
    }

    let category = parse_category(&request.category)?;
    let mut asset = Asset::new(request.asset_tag, request.name, category);
    asset.serial_number = request.serial_number;
    asset.model = request.model;
    asset.location = request.location;
    asset.purchase_date = request.purchase_date;
    asset.warranty_expires = request.warranty_expires;
    asset.notes = request.notes;

    let asset = repo.create(&asset).await?;

    Ok((StatusCode::CREATED, Json(asset_to_response(&asset))))
}

/// Get asset by ID.
async fn get_asset(
    State(state): State<AppState>,
    AuthenticatedUser(_user): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<AssetResponse>, ApiError> {
    let repo = create_asset_repository(&state.db);
    let asset = repo
        .get(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Asset {} not found", id)))?;

    Ok(Json(asset_to_response(&asset)))
}

/// Update an asset.
async fn update_asset(
    State(state): State<AppState>,
    AuthenticatedUser(_user): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateAssetRequest>,
) -> Result<Json<AssetResponse>, ApiError> {
    request.validate()?;

    let status = request.status.as_deref().map(parse_status).transpose()?;

    // Status edits never bypass custody: releasing an assigned asset goes
    // through unassign.
    if let Some(status) = status {
        if status == AssetStatus::Assigned {
            return Err(ApiError::BadRequest(
                "Use the assign endpoint to place an asset in custody".to_string(),
            ));
        }
        let repo = create_asset_repository(&state.db);
        let current = repo
            .get(id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("Asset {} not found", id)))?;
        if current.status == AssetStatus::Assigned {
            return Err(ApiError::Conflict(
                "Asset is in custody; unassign it before changing status".to_string(),
            ));
        }
    }

    let update = AssetUpdate {
        name: request.name,
        category: request.category.as_deref().map(parse_category).transpose()?,
        status,
        serial_number: request.serial_number,
        model: request.model,
        location: request.location,
        purchase_date: request.purchase_date,
        warranty_expires: request.warranty_expires,
        notes: request.notes,
    };

    let repo = create_asset_repository(&state.db);
    let asset = repo.update(id, &update).await?;

    Ok(Json(asset_to_response(&asset)))
}

/// Place an asset in an employee's custody.
async fn assign_asset(
    State(state): State<AppState>,
    AuthenticatedUser(_user): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<AssignAssetRequest>,
) -> Result<Json<AssetResponse>, ApiError> {
    let assets = create_asset_repository(&state.db);
    let asset = assets
        .get(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Asset {} not found", id)))?;

    if !asset.is_assignable() {
        return Err(ApiError::Conflict(format!(
            "Asset '{}' is retired and cannot be assigned",
            asset.asset_tag
        )));
    }

    let employees = create_employee_repository(&state.db);
    let employee = employees
        .get(request.employee_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Employee {} not found", request.employee_id)))?;

    if !employee.active {
        return Err(ApiError::Conflict(format!(
            "Employee '{}' is inactive",
            employee.name
        )));
    }

    let asset = assets.assign(id, employee.id).await?;

    metrics::counter!("fd_assets_assigned_total").increment(1);
    state.event_bus.publish(DeskEvent::CustodyChanged {
        asset_id: asset.id,
        employee_id: asset.custodian_id,
    });

    Ok(Json(asset_to_response(&asset)))
}

/// Return an asset to storage.
async fn unassign_asset(
    State(state): State<AppState>,
    AuthenticatedUser(_user): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<AssetResponse>, ApiError> {
    let repo = create_asset_repository(&state.db);
    let asset = repo
        .get(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Asset {} not found", id)))?;

    if asset.custodian_id.is_none() {
        return Err(ApiError::Conflict(format!(
            "Asset '{}' is not assigned",
            asset.asset_tag
        )));
    }

    let asset = repo.unassign(id).await?;

    state.event_bus.publish(DeskEvent::CustodyChanged {
        asset_id: asset.id,
        employee_id: None,
    });

    Ok(Json(asset_to_response(&asset)))
}

/// Custody history for an asset, newest first.
async fn custody_history(
    State(state): State<AppState>,
    AuthenticatedUser(_user): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<CustodyResponse>>, ApiError> {
    let repo = create_asset_repository(&state.db);
    repo.get(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Asset {} not found", id)))?;

    let history = repo.custody_history(id).await?;

    Ok(Json(history.iter().map(custody_to_response).collect()))
}

/// Delete an asset.
async fn delete_asset(
    State(state): State<AppState>,
    RequireManager(_user): RequireManager,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let repo = create_asset_repository(&state.db);

    if repo.delete(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("Asset {} not found", id)))
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn asset_to_response(asset: &Asset) -> AssetResponse {
    AssetResponse {
        id: asset.id,
        asset_tag: asset.asset_tag.clone(),
        name: asset.name.clone(),
        category: asset.category.to_string(),
        status: asset.status.to_string(),
        serial_number: asset.serial_number.clone(),
        model: asset.model.clone(),
        location: asset.location.clone(),
        purchase_date: asset.purchase_date,
        warranty_expires: asset.warranty_expires,
        custodian_id: asset.custodian_id,
        notes: asset.notes.clone(),
        created_at: asset.created_at,
        updated_at: asset.updated_at,
    }
}

fn custody_to_response(record: &CustodyRecord) -> CustodyResponse {
    CustodyResponse {
        id: record.id,
        asset_id: record.asset_id,
        employee_id: record.employee_id,
        assigned_at: record.assigned_at,
        returned_at: record.returned_at,
    }
}

fn parse_category(s: &str) -> Result<AssetCategory, ApiError> {
    AssetCategory::from_db_str(&s.to_lowercase()).ok_or_else(|| {
        ApiError::BadRequest(format!(
            "Invalid category: {}. Must be one of: computer, monitor, printer, phone, furniture, network, other",
            s
        ))
    })
}

fn parse_status(s: &str) -> Result<AssetStatus, ApiError> {
    AssetStatus::from_db_str(&s.to_lowercase()).ok_or_else(|| {
        ApiError::BadRequest(format!(
            "Invalid status: {}. Must be one of: in_storage, assigned, in_repair, retired",
            s
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_category() {
        assert!(matches!(parse_category("computer"), Ok(AssetCategory::Computer)));
        assert!(matches!(parse_category("PRINTER"), Ok(AssetCategory::Printer)));
        assert!(parse_category("gadget").is_err());
    }

    #[test]
    fn test_parse_status() {
        assert!(matches!(parse_status("in_storage"), Ok(AssetStatus::InStorage)));
        assert!(matches!(parse_status("Retired"), Ok(AssetStatus::Retired)));
        assert!(parse_status("lost").is_err());
    }

    #[test]
    fn test_asset_to_response() {
        let mut asset = Asset::new("IT-0001", "ThinkPad T14", AssetCategory::Computer);
        asset.location = Some("Storage B".to_string());

        let response = asset_to_response(&asset);
        assert_eq!(response.asset_tag, "IT-0001");
        assert_eq!(response.category, "computer");
        assert_eq!(response.status, "in_storage");
        assert_eq!(response.location.as_deref(), Some("Storage B"));
    }
}
