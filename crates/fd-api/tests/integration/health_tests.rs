//! Health endpoint tests.

use axum::http::{Method, StatusCode};

use super::common::{body_json, TestApp};

#[tokio::test]
async fn health_check_reports_healthy() {
    let app = TestApp::spawn().await;

    let response = app.request(Method::GET, "/health", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert!(body["database"]["connected"].as_bool().unwrap());
    assert!(body.get("components").is_none());
}

#[tokio::test]
async fn detailed_health_includes_components() {
    let app = TestApp::spawn().await;

    let response = app
        .request(Method::GET, "/health/detailed", None, None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["components"]["database_backend"], "sqlite");
}

#[tokio::test]
async fn liveness_and_readiness() {
    let app = TestApp::spawn().await;

    let response = app.request(Method::GET, "/live", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.request(Method::GET, "/ready", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
}
