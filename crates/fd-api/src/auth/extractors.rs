//! Axum extractors for authentication and authorization.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tower_sessions::Session;

use fd_core::db::create_user_repository;
use fd_core::User;

use crate::error::ApiError;
use crate::state::AppState;

use super::get_session_data;

/// Extractor for authenticated users.
///
/// Resolves the session to a fresh user row so disabled accounts and role
/// changes take effect on the next request. Returns 401 without a valid
/// session.
pub struct AuthenticatedUser(pub User);

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);

        if let Ok(session) = Session::from_request_parts(parts, state).await {
            if let Some(session_data) = get_session_data(&session).await {
                let user_repo = create_user_repository(&app_state.db);
                if let Ok(Some(user)) = user_repo.get(session_data.user_id).await {
                    if !user.enabled {
                        return Err(ApiError::AccountDisabled);
                    }
                    return Ok(AuthenticatedUser(user));
                }
                return Err(ApiError::SessionExpired);
            }
        }

        Err(ApiError::Unauthorized(
            "Authentication required".to_string(),
        ))
    }
}

/// Extractor for optional authentication; never fails.
pub struct OptionalUser(pub Option<User>);

#[async_trait]
impl<S> FromRequestParts<S> for OptionalUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match AuthenticatedUser::from_request_parts(parts, state).await {
            Ok(AuthenticatedUser(user)) => Ok(OptionalUser(Some(user))),
            Err(_) => Ok(OptionalUser(None)),
        }
    }
}

/// Extractor requiring the admin role.
pub struct RequireAdmin(pub User);

#[async_trait]
impl<S> FromRequestParts<S> for RequireAdmin
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let AuthenticatedUser(user) = AuthenticatedUser::from_request_parts(parts, state).await?;

        if !user.role.can_manage_users() {
            return Err(ApiError::Forbidden("Admin role required".to_string()));
        }

        Ok(RequireAdmin(user))
    }
}

/// Extractor requiring at least the manager role.
pub struct RequireManager(pub User);

#[async_trait]
impl<S> FromRequestParts<S> for RequireManager
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let AuthenticatedUser(user) = AuthenticatedUser::from_request_parts(parts, state).await?;

        if !user.role.can_manage_records() {
            return Err(ApiError::Forbidden(
                "Manager or admin role required".to_string(),
            ));
        }

        Ok(RequireManager(user))
    }
}
