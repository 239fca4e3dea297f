//! Session authentication tests.

use axum::http::{Method, StatusCode};
use serde_json::json;

use super::common::{body_json, TestApp, ADMIN_PASSWORD};

#[tokio::test]
async fn login_with_wrong_password_is_rejected() {
    let app = TestApp::spawn().await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/auth/login",
            Some(json!({"username": "admin", "password": "wrong"})),
            None,
        )
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["code"], "INVALID_CREDENTIALS");
}

#[tokio::test]
async fn login_with_unknown_user_gives_same_error() {
    let app = TestApp::spawn().await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/auth/login",
            Some(json!({"username": "ghost", "password": ADMIN_PASSWORD})),
            None,
        )
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["code"], "INVALID_CREDENTIALS");
}

#[tokio::test]
async fn me_requires_a_session() {
    let app = TestApp::spawn().await;

    let response = app.request(Method::GET, "/api/v1/auth/me", None, None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_establishes_a_session() {
    let mut app = TestApp::spawn().await;
    let cookie = app.login_admin().await;

    let response = app
        .request(Method::GET, "/api/v1/auth/me", None, Some(&cookie))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["username"], "admin");
    assert_eq!(body["role"], "admin");
}

#[tokio::test]
async fn protected_routes_reject_anonymous_requests() {
    let app = TestApp::spawn().await;

    let response = app.request(Method::GET, "/api/v1/assets", None, None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
