//! Visitor and visit logging endpoints.

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
use crate::routes::PaginatedResponse;
use crate::state::AppState;
use fd_core::db::{
    create_employee_repository, create_visitor_repository, visitor_repo::VisitorUpdate,
    Pagination, VisitFilter,
};
use fd_core::models::{Visit, Visitor};
use fd_core::DeskEvent;

/// Creates visitor routes (nested at /visitors).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_visitors).post(create_visitor))
        .route(
            "/:id",
            get(get_visitor).put(update_visitor).delete(delete_visitor),
        )
        .route("/:id/check-in", post(check_in))
}

/// Creates visit routes (nested at /visits).
pub fn visit_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_visits))
        .route("/:id/check-out", post(check_out))
}

// ============================================================================
// DTOs
// ============================================================================

/// Query parameters for listing visitors.
#[derive(Debug, Deserialize, Validate)]
pub struct ListVisitorsQuery {
    /// Search over name and company.
    pub search: Option<String>,
    #[validate(range(min = 1))]
    pub page: Option<u32>,
    #[validate(range(min = 1, max = 200))]
    pub per_page: Option<u32>,
}

/// Query parameters for listing visits.
#[derive(Debug, Deserialize, Validate)]
pub struct ListVisitsQuery {
    /// Only visits still open.
    pub open_only: Option<bool>,
    /// Filter by hosting employee.
    pub host_employee_id: Option<Uuid>,
    /// Filter to a calendar day (UTC).
    pub on_day: Option<NaiveDate>,
    #[validate(range(min = 1))]
    pub page: Option<u32>,
    #[validate(range(min = 1, max = 200))]
    pub per_page: Option<u32>,
}

/// Request body for creating a visitor.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateVisitorRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub company: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// Request body for updating a visitor.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateVisitorRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    pub company: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// Request body for a check-in.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CheckInRequest {
    /// Hosting employee.
    pub host_employee_id: Uuid,
    pub purpose: Option<String>,
    pub badge_number: Option<String>,
}

/// Visitor response DTO.
#[derive(Debug, Serialize, ToSchema)]
pub struct VisitorResponse {
    pub id: Uuid,
    pub name: String,
    pub company: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// Visit response DTO.
#[derive(Debug, Serialize, ToSchema)]
pub struct VisitResponse {
    pub id: Uuid,
    pub visitor_id: Uuid,
    pub host_employee_id: Uuid,
    pub purpose: Option<String>,
    pub badge_number: Option<String>,
    pub checked_in_at: chrono::DateTime<chrono::Utc>,
    pub checked_out_at: Option<chrono::DateTime<chrono::Utc>>,
}

// ============================================================================
// Handlers
// ============================================================================

/// List visitors.
async fn list_visitors(
    State(state): State<AppState>,
    AuthenticatedUser(_user): AuthenticatedUser,
    Query(query): Query<ListVisitorsQuery>,
) -> Result<Json<PaginatedResponse<VisitorResponse>>, ApiError> {
    query.validate()?;

    let pagination = Pagination::from_query(query.page, query.per_page);

    let repo = create_visitor_repository(&state.db);
    let result = repo.list(query.search.as_deref(), &pagination).await?;

    Ok(Json(PaginatedResponse::from_result(result, |v| {
        visitor_to_response(&v)
    })))
}

/// Create a visitor.
async fn create_visitor(
    State(state): State<AppState>,
    AuthenticatedUser(_user): AuthenticatedUser,
    Json(request): Json<CreateVisitorRequest>,
) -> Result<(StatusCode, Json<VisitorResponse>), ApiError> {
    request.validate()?;

    let mut visitor = Visitor::new(request.name);
    visitor.company = request.company;
    visitor.email = request.email;
    visitor.phone = request.phone;

    let repo = create_visitor_repository(&state.db);
    let visitor = repo.create(&visitor).await?;

    Ok((StatusCode::CREATED, Json(visitor_to_response(&visitor))))
}

/// Get visitor by ID.
async fn get_visitor(
    State(state): State<AppState>,
    AuthenticatedUser(_user): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<VisitorResponse>, ApiError> {
    let repo = create_visitor_repository(&state.db);
    let visitor = repo
        .get(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Visitor {} not found", id)))?;

    Ok(Json(visitor_to_response(&visitor)))
}

/// Update a visitor.
async fn update_visitor(
    State(state): State<AppState>,
    AuthenticatedUser(_user): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateVisitorRequest>,
) -> Result<Json<VisitorResponse>, ApiError> {
    request.validate()?;

    let update = VisitorUpdate {
        name: request.name,
        company: request.company,
        email: request.email,
        phone: request.phone,
    };

    let repo = create_visitor_repository(&state.db);
    let visitor = repo.update(id, &update).await?;

    Ok(Json(visitor_to_response(&visitor)))
}

/// Delete a visitor and their visit history.
async fn delete_visitor(
    State(state): State<AppState>,
    RequireManager(_user): RequireManager,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let repo = create_visitor_repository(&state.db);

    if repo.delete(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("Visitor {} not found", id)))
    }
}

/// Check a visitor in.
async fn check_in(
    State(state): State<AppState>,
    AuthenticatedUser(_user): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<CheckInRequest>,
) -> Result<(StatusCode, Json<VisitResponse>), ApiError> {
    request.validate()?;

    let repo = create_visitor_repository(&state.db);
    let visitor = repo
        .get(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Visitor {} not found", id)))?;

    if let Some(open) = repo.open_visit_for(id).await? {
        return Err(ApiError::Conflict(format!(
            "Visitor '{}' is already checked in (visit {})",
            visitor.name, open.id
        )));
    }

    let employees = create_employee_repository(&state.db);
    let host = employees
        .get(request.host_employee_id)
        .await?
        .ok_or_else(|| {
            ApiError::NotFound(format!("Employee {} not found", request.host_employee_id))
        })?;

    let mut visit = Visit::check_in(id, host.id);
    visit.purpose = request.purpose;
    visit.badge_number = request.badge_number;

    let visit = repo.create_visit(&visit).await?;

    metrics::counter!("fd_visits_checked_in_total").increment(1);
    state.event_bus.publish(DeskEvent::VisitorCheckedIn {
        visit_id: visit.id,
        visitor_id: visit.visitor_id,
    });

    Ok((StatusCode::CREATED, Json(visit_to_response(&visit))))
}

/// List visits.
async fn list_visits(
    State(state): State<AppState>,
    AuthenticatedUser(_user): AuthenticatedUser,
    Query(query): Query<ListVisitsQuery>,
) -> Result<Json<PaginatedResponse<VisitResponse>>, ApiError> {
    query.validate()?;

    let filter = VisitFilter {
        open_only: query.open_only.unwrap_or(false),
        host_employee_id: query.host_employee_id,
        on_day: query.on_day,
    };
    let pagination = Pagination::from_query(query.page, query.per_page);

    let repo = create_visitor_repository(&state.db);
    let result = repo.list_visits(&filter, &pagination).await?;

    Ok(Json(PaginatedResponse::from_result(result, |v| {
        visit_to_response(&v)
    })))
}

/// Check a visit out.
async fn check_out(
    State(state): State<AppState>,
    AuthenticatedUser(_user): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<VisitResponse>, ApiError> {
    let repo = create_visitor_repository(&state.db);

    let visit = repo
        .get_visit(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Visit {} not found", id)))?;

    if !visit.is_open() {
        return Err(ApiError::Conflict(format!(
            "Visit {} is already checked out",
            id
        )));
    }

    let visit = repo.check_out(id).await?;

    Ok(Json(visit_to_response(&visit)))
}

// ============================================================================
// Helpers
// ============================================================================

fn visitor_to_response(visitor: &Visitor) -> VisitorResponse {
    VisitorResponse {
        id: visitor.id,
        name: visitor.name.clone(),
        company: visitor.company.clone(),
        email: visitor.email.clone(),
        phone: visitor.phone.clone(),
        created_at: visitor.created_at,
        updated_at: visitor.updated_at,
    }
}

fn visit_to_response(visit: &Visit) -> VisitResponse {
    VisitResponse {
        id: visit.id,
        visitor_id: visit.visitor_id,
        host_employee_id: visit.host_employee_id,
        purpose: visit.purpose.clone(),
        badge_number: visit.badge_number.clone(),
        checked_in_at: visit.checked_in_at,
        checked_out_at: visit.checked_out_at,
    }
}
