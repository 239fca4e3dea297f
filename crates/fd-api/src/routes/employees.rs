//! Employee management endpoints.

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
use fd_core::db::{create_employee_repository, EmployeeFilter, EmployeeUpdate, Pagination};
use fd_core::models::{ChatStatus, Employee};

/// Creates employee routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_employees).post(create_employee))
        .route(
            "/:id",
            get(get_employee).put(update_employee).delete(delete_employee),
        )
        .route("/:id/chat-status", post(set_chat_status))
}

// ============================================================================
// DTOs
// ============================================================================

/// Query parameters for listing employees.
#[derive(Debug, Deserialize, Validate)]
pub struct ListEmployeesQuery {
    /// Search over name and email.
    pub search: Option<String>,
    /// Filter by department.
    pub department: Option<String>,
    /// Filter by active flag.
    pub active: Option<bool>,
    #[validate(range(min = 1))]
    pub page: Option<u32>,
    #[validate(range(min = 1, max = 200))]
    pub per_page: Option<u32>,
}

/// Request body for creating an employee.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateEmployeeRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    pub department: Option<String>,
    pub job_title: Option<String>,
    pub phone: Option<String>,
}

/// Request body for updating an employee.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateEmployeeRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub department: Option<String>,
    pub job_title: Option<String>,
    pub phone: Option<String>,
    pub active: Option<bool>,
}

/// Request body for toggling chat routing.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ChatStatusRequest {
    /// `bot` or `human`.
    pub chat_status: String,
}

/// Employee response DTO.
#[derive(Debug, Serialize, ToSchema)]
pub struct EmployeeResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub department: Option<String>,
    pub job_title: Option<String>,
    pub phone: Option<String>,
    pub chat_status: String,
    pub active: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

// ============================================================================
// Handlers
// ============================================================================

/// List employees with pagination and filters.
async fn list_employees(
    State(state): State<AppState>,
    AuthenticatedUser(_user): AuthenticatedUser,
    Query(query): Query<ListEmployeesQuery>,
) -> Result<Json<PaginatedResponse<EmployeeResponse>>, ApiError> {
    query.validate()?;

    let filter = EmployeeFilter {
        search: query.search,
        department: query.department,
        active: query.active,
    };
    let pagination = Pagination::from_query(query.page, query.per_page);

    let repo = create_employee_repository(&state.db);
    let result = repo.list(&filter, &pagination).await?;

    Ok(Json(PaginatedResponse::from_result(result, |e| {
        employee_to_response(&e)
    })))
}

/// Create a new employee.
async fn create_employee(
    State(state): State<AppState>,
    AuthenticatedUser(_user): AuthenticatedUser,
    Json(request): Json<CreateEmployeeRequest>,
) -> Result<(StatusCode, Json<EmployeeResponse>), ApiError> {
    request.validate()?;

    let repo = create_employee_repository(&state.db);

    if let Some(existing) = repo.get_by_email(&request.email).await? {
        return Err(ApiError::Conflict(format!(
            "Email '{}' is already used by '{}'",
            existing.email, existing.name
        )));
    }

    let mut employee = Employee::new(request.name, request.email);
    employee.department = request.department;
    employee.job_title = request.job_title;
    employee.phone = request.phone;

    let employee = repo.create(&employee).await?;

    Ok((StatusCode::CREATED, Json(employee_to_response(&employee))))
}

/// Get employee by ID.
async fn get_employee(
    State(state): State<AppState>,
    AuthenticatedUser(_user): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<EmployeeResponse>, ApiError> {
    let repo = create_employee_repository(&state.db);
    let employee = repo
        .get(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Employee {} not found", id)))?;

    Ok(Json(employee_to_response(&employee)))
}

/// Update an employee.
async fn update_employee(
    State(state): State<AppState>,
    AuthenticatedUser(_user): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateEmployeeRequest>,
) -> Result<Json<EmployeeResponse>, ApiError> {
    request.validate()?;

    let update = EmployeeUpdate {
        name: request.name,
        email: request.email,
        department: request.department,
        job_title: request.job_title,
        phone: request.phone,
        active: request.active,
    };

    let repo = create_employee_repository(&state.db);
    let employee = repo.update(id, &update).await?;

    Ok(Json(employee_to_response(&employee)))
}

/// Toggle who answers the employee's chat messages.
async fn set_chat_status(
    State(state): State<AppState>,
    AuthenticatedUser(_user): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<ChatStatusRequest>,
) -> Result<Json<EmployeeResponse>, ApiError> {
    let status = ChatStatus::from_db_str(&request.chat_status.to_lowercase()).ok_or_else(|| {
        ApiError::BadRequest(format!(
            "Invalid chat status: {}. Must be 'bot' or 'human'",
            request.chat_status
        ))
    })?;

    let repo = create_employee_repository(&state.db);
    let employee = repo.set_chat_status(id, status).await?;

    Ok(Json(employee_to_response(&employee)))
}

/// Delete an employee.
///
/// Fails with 409 while custody records, tickets, visits, or ledger rows
/// still reference the employee.
async fn delete_employee(
    State(state): State<AppState>,
    RequireManager(_user): RequireManager,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let repo = create_employee_repository(&state.db);

    if repo.delete(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("Employee {} not found", id)))
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn employee_to_response(employee: &Employee) -> EmployeeResponse {
    EmployeeResponse {
        id: employee.id,
        name: employee.name.clone(),
        email: employee.email.clone(),
        department: employee.department.clone(),
        job_title: employee.job_title.clone(),
        phone: employee.phone.clone(),
        chat_status: employee.chat_status.to_string(),
        active: employee.active,
        created_at: employee.created_at,
        updated_at: employee.updated_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_employee_to_response() {
        let employee = Employee::new("Ada", "ada@example.com");
        let response = employee_to_response(&employee);
        assert_eq!(response.chat_status, "bot");
        assert!(response.active);
    }
}
