//! Service user administration endpoints (admin only).

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::auth::RequireAdmin;
use crate::error::ApiError;
use crate::routes::auth::{user_to_response, UserResponse};
use crate::state::AppState;
use fd_core::auth::password::hash_password;
use fd_core::db::{create_user_repository, UserUpdate};
use fd_core::{Role, User};

/// Creates user administration routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route(
            "/:id",
            get(get_user).put(update_user).delete(delete_user),
        )
        .route("/:id/password", post(change_password))
}

/// Request body for creating a user.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateUserRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 3, max = 64))]
    pub username: String,
    #[validate(length(min = 12, max = 1024))]
    pub password: String,
    pub display_name: Option<String>,
    /// Role: admin, manager, or agent.
    pub role: String,
}

/// Request body for updating a user.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateUserRequest {
    #[validate(email)]
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub role: Option<String>,
    pub enabled: Option<bool>,
}

/// Request body for changing a password.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 12, max = 1024))]
    pub password: String,
}

/// List all users.
async fn list_users(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    let repo = create_user_repository(&state.db);
    let users = repo.list().await?;

    Ok(Json(users.iter().map(user_to_response).collect()))
}

/// Create a user.
async fn create_user(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Json(request): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    request.validate()?;

    let role: Role = request
        .role
        .parse()
        .map_err(|e: String| ApiError::BadRequest(e))?;

    let password_hash =
        hash_password(&request.password).map_err(|e| ApiError::Internal(e.to_string()))?;

    let mut user = User::new(&request.email, &request.username, password_hash, role);
    user.display_name = request.display_name;

    let repo = create_user_repository(&state.db);
    let user = repo.create(&user).await?;

    Ok((StatusCode::CREATED, Json(user_to_response(&user))))
}

/// Get a user by ID.
async fn get_user(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<Uuid>,
) -> Result<Json<UserResponse>, ApiError> {
    let repo = create_user_repository(&state.db);
    let user = repo
        .get(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("User {} not found", id)))?;

    Ok(Json(user_to_response(&user)))
}

/// Update a user.
async fn update_user(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateUserRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    request.validate()?;

    let role = request
        .role
        .as_deref()
        .map(|r| r.parse::<Role>())
        .transpose()
        .map_err(|e: String| ApiError::BadRequest(e))?;

    let repo = create_user_repository(&state.db);

    // Demoting or disabling the last enabled admin would lock everyone out.
    let target = repo
        .get(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("User {} not found", id)))?;
    let loses_admin = target.role == Role::Admin
        && (matches!(role, Some(r) if r != Role::Admin) || request.enabled == Some(false));
    if loses_admin && repo.count_enabled_admins().await? <= 1 {
        return Err(ApiError::Conflict(
            "Cannot demote or disable the last enabled admin".to_string(),
        ));
    }

    if admin.id == id && request.enabled == Some(false) {
        return Err(ApiError::Conflict(
            "Cannot disable your own account".to_string(),
        ));
    }

    let update = UserUpdate {
        email: request.email,
        display_name: request.display_name,
        role,
        enabled: request.enabled,
    };

    let user = repo.update(id, &update).await?;

    Ok(Json(user_to_response(&user)))
}

/// Change a user's password.
async fn change_password(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<Uuid>,
    Json(request): Json<ChangePasswordRequest>,
) -> Result<StatusCode, ApiError> {
    request.validate()?;

    let password_hash =
        hash_password(&request.password).map_err(|e| ApiError::Internal(e.to_string()))?;

    let repo = create_user_repository(&state.db);
    repo.update_password(id, &password_hash).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Delete a user.
async fn delete_user(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if admin.id == id {
        return Err(ApiError::Conflict(
            "Cannot delete your own account".to_string(),
        ));
    }

    let repo = create_user_repository(&state.db);

    let target = repo
        .get(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("User {} not found", id)))?;
    if target.role == Role::Admin && target.enabled && repo.count_enabled_admins().await? <= 1 {
        return Err(ApiError::Conflict(
            "Cannot delete the last enabled admin".to_string(),
        ));
    }

    if repo.delete(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("User {} not found", id)))
    }
}
