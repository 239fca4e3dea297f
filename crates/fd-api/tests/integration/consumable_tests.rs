//! Consumable stock ledger tests.

use axum::http::{Method, StatusCode};
use serde_json::json;

use super::common::{body_json, create_employee, create_item, TestApp};

#[tokio::test]
async fn restock_and_issue_move_the_ledger() {
    let mut app = TestApp::spawn().await;
    let item_id = create_item(&mut app, "A4 paper", "PAP-A4").await;
    let employee_id = create_employee(&mut app, "Sam", "sam@example.com").await;

    let response = app
        .admin_request(
            Method::POST,
            &format!("/api/v1/consumables/{}/restock", item_id),
            Some(json!({"quantity": 10, "reference": "PO-1"})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["item"]["quantity"], 10);
    assert_eq!(body["transaction"]["kind"], "restock");
    assert_eq!(body["transaction"]["balance_after"], 10);

    let response = app
        .admin_request(
            Method::POST,
            &format!("/api/v1/consumables/{}/issue", item_id),
            Some(json!({"quantity": 4, "employee_id": employee_id})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["item"]["quantity"], 6);
    assert_eq!(body["transaction"]["balance_after"], 6);

    // Ledger lists both movements, newest first.
    let response = app
        .admin_request(
            Method::GET,
            &format!("/api/v1/consumables/{}/transactions", item_id),
            None,
        )
        .await;
    let body = body_json(response).await;
    assert_eq!(body["total_items"], 2);
    assert_eq!(body["data"][0]["kind"], "issue");
    assert_eq!(body["data"][1]["kind"], "restock");
}

#[tokio::test]
async fn over_issue_is_rejected_and_moves_nothing() {
    let mut app = TestApp::spawn().await;
    let item_id = create_item(&mut app, "Toner", "TNR-1").await;

    app.admin_request(
        Method::POST,
        &format!("/api/v1/consumables/{}/restock", item_id),
        Some(json!({"quantity": 3})),
    )
    .await;

    let response = app
        .admin_request(
            Method::POST,
            &format!("/api/v1/consumables/{}/issue", item_id),
            Some(json!({"quantity": 5})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // Quantity unchanged, no issue row written.
    let response = app
        .admin_request(Method::GET, &format!("/api/v1/consumables/{}", item_id), None)
        .await;
    let body = body_json(response).await;
    assert_eq!(body["quantity"], 3);

    let response = app
        .admin_request(
            Method::GET,
            &format!("/api/v1/consumables/{}/transactions", item_id),
            None,
        )
        .await;
    let body = body_json(response).await;
    assert_eq!(body["total_items"], 1);
}

#[tokio::test]
async fn zero_quantity_movements_are_rejected() {
    let mut app = TestApp::spawn().await;
    let item_id = create_item(&mut app, "Cables", "CBL-1").await;

    let response = app
        .admin_request(
            Method::POST,
            &format!("/api/v1/consumables/{}/issue", item_id),
            Some(json!({"quantity": 0})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn adjust_records_stocktake() {
    let mut app = TestApp::spawn().await;
    let item_id = create_item(&mut app, "Pens", "PEN-1").await;

    app.admin_request(
        Method::POST,
        &format!("/api/v1/consumables/{}/restock", item_id),
        Some(json!({"quantity": 8})),
    )
    .await;

    let response = app
        .admin_request(
            Method::POST,
            &format!("/api/v1/consumables/{}/adjust", item_id),
            Some(json!({"counted_quantity": 5, "note": "stocktake"})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["item"]["quantity"], 5);
    assert_eq!(body["transaction"]["kind"], "adjust");
    assert_eq!(body["transaction"]["quantity"], 3);
}

#[tokio::test]
async fn low_stock_view_tracks_reorder_level() {
    let mut app = TestApp::spawn().await;
    // Fixture reorder_level is 2; a fresh item with zero stock is low.
    let item_id = create_item(&mut app, "Staples", "STP-1").await;

    let response = app
        .admin_request(Method::GET, "/api/v1/consumables/low-stock", None)
        .await;
    let body = body_json(response).await;
    assert!(body
        .as_array()
        .unwrap()
        .iter()
        .any(|i| i["id"] == item_id.to_string()));

    // Restocking above the level clears it.
    app.admin_request(
        Method::POST,
        &format!("/api/v1/consumables/{}/restock", item_id),
        Some(json!({"quantity": 10})),
    )
    .await;

    let response = app
        .admin_request(Method::GET, "/api/v1/consumables/low-stock", None)
        .await;
    let body = body_json(response).await;
    assert!(!body
        .as_array()
        .unwrap()
        .iter()
        .any(|i| i["id"] == item_id.to_string()));
}
