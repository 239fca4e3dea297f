//! Visitor logging and SLA policy tests.

use axum::http::{Method, StatusCode};
use serde_json::json;

use super::common::{body_json, create_employee, TestApp};

#[tokio::test]
async fn visitor_check_in_and_out() {
    let mut app = TestApp::spawn().await;
    let host_id = create_employee(&mut app, "Host", "host@example.com").await;

    let response = app
        .admin_request(
            Method::POST,
            "/api/v1/visitors",
            Some(json!({"name": "Jordan Vale", "company": "Vale Consulting"})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let visitor = body_json(response).await;
    let visitor_id = visitor["id"].as_str().unwrap().to_string();

    // Check in.
    let response = app
        .admin_request(
            Method::POST,
            &format!("/api/v1/visitors/{}/check-in", visitor_id),
            Some(json!({"host_employee_id": host_id, "purpose": "Audit", "badge_number": "V-12"})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let visit = body_json(response).await;
    let visit_id = visit["id"].as_str().unwrap().to_string();
    assert!(visit["checked_out_at"].is_null());

    // Double check-in is rejected.
    let response = app
        .admin_request(
            Method::POST,
            &format!("/api/v1/visitors/{}/check-in", visitor_id),
            Some(json!({"host_employee_id": host_id})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // The open visit shows in the filtered list.
    let response = app
        .admin_request(Method::GET, "/api/v1/visits?open_only=true", None)
        .await;
    let body = body_json(response).await;
    assert_eq!(body["total_items"], 1);

    // Check out, twice is a conflict.
    let response = app
        .admin_request(
            Method::POST,
            &format!("/api/v1/visits/{}/check-out", visit_id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(!body_json(response).await["checked_out_at"].is_null());

    let response = app
        .admin_request(
            Method::POST,
            &format!("/api/v1/visits/{}/check-out", visit_id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn one_sla_policy_per_priority() {
    let mut app = TestApp::spawn().await;

    let create = json!({
        "name": "Gold",
        "priority": "high",
        "response_target_minutes": 30,
        "resolution_target_minutes": 240,
    });

    let response = app
        .admin_request(Method::POST, "/api/v1/sla-policies", Some(create))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .admin_request(
            Method::POST,
            "/api/v1/sla-policies",
            Some(json!({
                "name": "Gold Duplicate",
                "priority": "high",
                "response_target_minutes": 15,
                "resolution_target_minutes": 120,
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn policy_edits_do_not_restamp_tickets() {
    let mut app = TestApp::spawn().await;
    let employee_id = create_employee(&mut app, "Ana", "ana@example.com").await;

    let response = app
        .admin_request(
            Method::POST,
            "/api/v1/sla-policies",
            Some(json!({
                "name": "Silver",
                "priority": "low",
                "response_target_minutes": 120,
                "resolution_target_minutes": 960,
            })),
        )
        .await;
    let policy = body_json(response).await;
    let policy_id = policy["id"].as_str().unwrap().to_string();

    let response = app
        .admin_request(
            Method::POST,
            "/api/v1/tickets",
            Some(json!({
                "subject": "Squeaky door",
                "priority": "low",
                "requester_id": employee_id,
            })),
        )
        .await;
    let ticket = body_json(response).await;
    let ticket_id = ticket["id"].as_str().unwrap().to_string();
    let original_due = ticket["response_due_at"].clone();

    app.admin_request(
        Method::PUT,
        &format!("/api/v1/sla-policies/{}", policy_id),
        Some(json!({"response_target_minutes": 5})),
    )
    .await;

    let response = app
        .admin_request(Method::GET, &format!("/api/v1/tickets/{}", ticket_id), None)
        .await;
    assert_eq!(body_json(response).await["response_due_at"], original_due);
}

#[tokio::test]
async fn metrics_summary_counts_fixtures() {
    let mut app = TestApp::spawn().await;
    let employee_id = create_employee(&mut app, "Counter", "counter@example.com").await;

    app.admin_request(
        Method::POST,
        "/api/v1/tickets",
        Some(json!({"subject": "One", "priority": "high", "requester_id": employee_id})),
    )
    .await;
    app.admin_request(
        Method::POST,
        "/api/v1/assets",
        Some(json!({"asset_tag": "IT-9000", "name": "Rack", "category": "network"})),
    )
    .await;

    let response = app
        .admin_request(Method::GET, "/api/v1/metrics/summary", None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["open_tickets_by_priority"]["high"], 1);
    assert_eq!(body["assets_by_status"]["in_storage"], 1);
}
