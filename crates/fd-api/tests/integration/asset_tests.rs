//! Asset and custody tests.

use axum::http::{Method, StatusCode};
use serde_json::json;

use super::common::{body_json, create_employee, TestApp};

#[tokio::test]
async fn created_asset_appears_in_list() {
    let mut app = TestApp::spawn().await;

    let response = app
        .admin_request(
            Method::POST,
            "/api/v1/assets",
            Some(json!({
                "asset_tag": "IT-0001",
                "name": "ThinkPad T14",
                "category": "computer",
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .admin_request(Method::GET, "/api/v1/assets?search=IT-0001", None)
        .await;
    let body = body_json(response).await;

    assert_eq!(body["total_items"], 1);
    assert_eq!(body["data"][0]["asset_tag"], "IT-0001");
    assert_eq!(body["data"][0]["status"], "in_storage");
}

#[tokio::test]
async fn duplicate_asset_tag_is_rejected() {
    let mut app = TestApp::spawn().await;

    let create = json!({"asset_tag": "IT-0002", "name": "Monitor", "category": "monitor"});
    let response = app
        .admin_request(Method::POST, "/api/v1/assets", Some(create.clone()))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .admin_request(Method::POST, "/api/v1/assets", Some(create))
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn assign_and_unassign_maintain_custody() {
    let mut app = TestApp::spawn().await;
    let employee_id = create_employee(&mut app, "Ada Lovelace", "ada@example.com").await;

    let response = app
        .admin_request(
            Method::POST,
            "/api/v1/assets",
            Some(json!({"asset_tag": "IT-0003", "name": "MacBook", "category": "computer"})),
        )
        .await;
    let asset = body_json(response).await;
    let asset_id = asset["id"].as_str().unwrap();

    // Assign: status flips and the custodian is recorded.
    let response = app
        .admin_request(
            Method::POST,
            &format!("/api/v1/assets/{}/assign", asset_id),
            Some(json!({"employee_id": employee_id})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "assigned");
    assert_eq!(body["custodian_id"], employee_id.to_string());

    // Custody history shows one open record.
    let response = app
        .admin_request(
            Method::GET,
            &format!("/api/v1/assets/{}/custody", asset_id),
            None,
        )
        .await;
    let history = body_json(response).await;
    assert_eq!(history.as_array().unwrap().len(), 1);
    assert!(history[0]["returned_at"].is_null());

    // Unassign closes the record and returns the asset to storage.
    let response = app
        .admin_request(
            Method::POST,
            &format!("/api/v1/assets/{}/unassign", asset_id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "in_storage");
    assert!(body["custodian_id"].is_null());

    let response = app
        .admin_request(
            Method::GET,
            &format!("/api/v1/assets/{}/custody", asset_id),
            None,
        )
        .await;
    let history = body_json(response).await;
    assert!(!history[0]["returned_at"].is_null());
}

#[tokio::test]
async fn retired_asset_cannot_be_assigned() {
    let mut app = TestApp::spawn().await;
    let employee_id = create_employee(&mut app, "Grace Hopper", "grace@example.com").await;

    let response = app
        .admin_request(
            Method::POST,
            "/api/v1/assets",
            Some(json!({"asset_tag": "IT-0004", "name": "Old printer", "category": "printer"})),
        )
        .await;
    let asset = body_json(response).await;
    let asset_id = asset["id"].as_str().unwrap().to_string();

    let response = app
        .admin_request(
            Method::PUT,
            &format!("/api/v1/assets/{}", asset_id),
            Some(json!({"status": "retired"})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .admin_request(
            Method::POST,
            &format!("/api/v1/assets/{}/assign", asset_id),
            Some(json!({"employee_id": employee_id})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn deleting_asset_removes_it() {
    let mut app = TestApp::spawn().await;

    let response = app
        .admin_request(
            Method::POST,
            "/api/v1/assets",
            Some(json!({"asset_tag": "IT-0005", "name": "Desk", "category": "furniture"})),
        )
        .await;
    let asset = body_json(response).await;
    let asset_id = asset["id"].as_str().unwrap().to_string();

    let response = app
        .admin_request(Method::DELETE, &format!("/api/v1/assets/{}", asset_id), None)
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .admin_request(Method::GET, &format!("/api/v1/assets/{}", asset_id), None)
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
