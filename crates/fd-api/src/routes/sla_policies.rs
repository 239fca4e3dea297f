//! SLA policy endpoints.
//!
//! Policies pair a priority with target response and resolution times. The
//! only enforcement anywhere is stamping due times on tickets at creation;
//! editing a policy never restamps existing tickets.

use axum::{
    extract::{Path, State},
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
use crate::state::AppState;
use fd_core::db::{create_sla_policy_repository, sla_repo::SlaPolicyUpdate};
use fd_core::models::{SlaPolicy, TicketPriority};

/// Creates SLA policy routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_policies).post(create_policy))
        .route(
            "/:id",
            get(get_policy).put(update_policy).delete(delete_policy),
        )
}

// ============================================================================
// DTOs
// ============================================================================

/// Request body for creating a policy.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreatePolicyRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    /// Priority this policy applies to (one policy per priority).
    pub priority: String,
    #[validate(range(min = 1))]
    pub response_target_minutes: i64,
    #[validate(range(min = 1))]
    pub resolution_target_minutes: i64,
}

/// Request body for updating a policy. The priority is fixed at creation.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdatePolicyRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[validate(range(min = 1))]
    pub response_target_minutes: Option<i64>,
    #[validate(range(min = 1))]
    pub resolution_target_minutes: Option<i64>,
}

/// Policy response DTO.
#[derive(Debug, Serialize, ToSchema)]
pub struct PolicyResponse {
    pub id: Uuid,
    pub name: String,
    pub priority: String,
    pub response_target_minutes: i64,
    pub resolution_target_minutes: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

// ============================================================================
// Handlers
// ============================================================================

/// List all policies, ordered by priority.
async fn list_policies(
    State(state): State<AppState>,
    AuthenticatedUser(_user): AuthenticatedUser,
) -> Result<Json<Vec<PolicyResponse>>, ApiError> {
    let repo = create_sla_policy_repository(&state.db);
    let policies = repo.list().await?;

    Ok(Json(policies.iter().map(policy_to_response).collect()))
}

/// Create a policy.
async fn create_policy(
    State(state): State<AppState>,
    RequireManager(_user): RequireManager,
    Json(request): Json<CreatePolicyRequest>,
) -> Result<(StatusCode, Json<PolicyResponse>), ApiError> {
    request.validate()?;

    let priority = parse_priority(&request.priority)?;

    let repo = create_sla_policy_repository(&state.db);

    if let Some(existing) = repo.get_by_priority(priority).await? {
        return Err(ApiError::Conflict(format!(
            "Priority '{}' already has policy '{}'",
            priority, existing.name
        )));
    }

    let policy = SlaPolicy::new(
        request.name,
        priority,
        request.response_target_minutes,
        request.resolution_target_minutes,
    );

    let policy = repo.create(&policy).await?;

    Ok((StatusCode::CREATED, Json(policy_to_response(&policy))))
}

/// Get policy by ID.
async fn get_policy(
    State(state): State<AppState>,
    AuthenticatedUser(_user): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<PolicyResponse>, ApiError> {
    let repo = create_sla_policy_repository(&state.db);
    let policy = repo
        .get(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("SLA policy {} not found", id)))?;

    Ok(Json(policy_to_response(&policy)))
}

/// Update a policy's name or targets.
async fn update_policy(
    State(state): State<AppState>,
    RequireManager(_user): RequireManager,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdatePolicyRequest>,
) -> Result<Json<PolicyResponse>, ApiError> {
    request.validate()?;

    let update = SlaPolicyUpdate {
        name: request.name,
        response_target_minutes: request.response_target_minutes,
        resolution_target_minutes: request.resolution_target_minutes,
    };

    let repo = create_sla_policy_repository(&state.db);
    let policy = repo.update(id, &update).await?;

    Ok(Json(policy_to_response(&policy)))
}

/// Delete a policy. Tickets keep whatever deadlines were stamped.
async fn delete_policy(
    State(state): State<AppState>,
    RequireManager(_user): RequireManager,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let repo = create_sla_policy_repository(&state.db);

    if repo.delete(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("SLA policy {} not found", id)))
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn policy_to_response(policy: &SlaPolicy) -> PolicyResponse {
    PolicyResponse {
        id: policy.id,
        name: policy.name.clone(),
        priority: policy.priority.to_string(),
        response_target_minutes: policy.response_target_minutes,
        resolution_target_minutes: policy.resolution_target_minutes,
        created_at: policy.created_at,
        updated_at: policy.updated_at,
    }
}

fn parse_priority(s: &str) -> Result<TicketPriority, ApiError> {
    TicketPriority::from_db_str(&s.to_lowercase()).ok_or_else(|| {
        ApiError::BadRequest(format!(
            "Invalid priority: {}. Must be one of: low, medium, high, critical",
            s
        ))
    })
}
