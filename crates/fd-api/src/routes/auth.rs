//! Session authentication endpoints.

use axum::{extract::State, http::StatusCode, routing::get, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::{info, warn};
use utoipa::ToSchema;
use validator::Validate;

use crate::auth::{clear_session, set_session_data, AuthenticatedUser};
use crate::error::ApiError;
use crate::state::AppState;
use fd_core::auth::password::verify_password;
use fd_core::db::create_user_repository;
use fd_core::{SessionData, User};

/// Creates auth routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(me))
}

/// Login request body.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    /// Username.
    #[validate(length(min = 1, max = 255))]
    pub username: String,
    /// Password.
    #[validate(length(min = 1, max = 1024))]
    pub password: String,
}

/// Current-user response DTO.
#[derive(Debug, Serialize, ToSchema)]
pub struct UserResponse {
    pub id: uuid::Uuid,
    pub email: String,
    pub username: String,
    pub display_name: Option<String>,
    pub role: String,
    pub enabled: bool,
    pub last_login_at: Option<chrono::DateTime<chrono::Utc>>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

pub(crate) fn user_to_response(user: &User) -> UserResponse {
    UserResponse {
        id: user.id,
        email: user.email.clone(),
        username: user.username.clone(),
        display_name: user.display_name.clone(),
        role: user.role.to_string(),
        enabled: user.enabled,
        last_login_at: user.last_login_at,
        created_at: user.created_at,
    }
}

/// Logs a user in and establishes a session.
async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<LoginRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    request.validate()?;

    let user_repo = create_user_repository(&state.db);
    let user = user_repo.get_by_username(&request.username).await?;

    let Some(user) = user else {
        // Same error as a bad password; usernames are not probeable.
        warn!(username = %request.username, "Login attempt for unknown user");
        return Err(ApiError::InvalidCredentials);
    };

    if !user.enabled {
        return Err(ApiError::AccountDisabled);
    }

    let valid = verify_password(&request.password, &user.password_hash)
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    if !valid {
        warn!(username = %user.username, "Failed login attempt");
        return Err(ApiError::InvalidCredentials);
    }

    set_session_data(&session, SessionData::for_user(&user))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    user_repo.record_login(user.id).await?;

    info!(username = %user.username, "User logged in");

    Ok(Json(user_to_response(&user)))
}

/// Ends the session.
async fn logout(session: Session) -> Result<StatusCode, ApiError> {
    clear_session(&session)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(StatusCode::NO_CONTENT)
}

/// Returns the currently logged-in user.
async fn me(AuthenticatedUser(user): AuthenticatedUser) -> Json<UserResponse> {
    Json(user_to_response(&user))
}
