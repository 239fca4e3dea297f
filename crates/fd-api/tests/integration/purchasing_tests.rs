//! Supplier and purchase order tests.

use axum::http::{Method, StatusCode};
use serde_json::json;
use uuid::Uuid;

use super::common::{body_json, create_item, TestApp};

async fn create_supplier(app: &mut TestApp, name: &str) -> Uuid {
    let response = app
        .admin_request(
            Method::POST,
            "/api/v1/suppliers",
            Some(json!({"name": name})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["id"]
        .as_str()
        .unwrap()
        .parse()
        .unwrap()
}

#[tokio::test]
async fn order_lifecycle_draft_submit_receive() {
    let mut app = TestApp::spawn().await;
    let supplier_id = create_supplier(&mut app, "Office Supplies Ltd").await;
    let item_id = create_item(&mut app, "Toner", "TNR-9").await;

    // Draft with one consumable line and one plain line.
    let response = app
        .admin_request(
            Method::POST,
            "/api/v1/purchase-orders",
            Some(json!({
                "order_number": "PO-2026-0001",
                "supplier_id": supplier_id,
                "lines": [
                    {"description": "Toner cartridges", "quantity": 6, "unit_price_cents": 4500, "consumable_item_id": item_id},
                    {"description": "Office chair", "quantity": 1, "unit_price_cents": 25000},
                ],
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let order = body_json(response).await;
    let order_id = order["id"].as_str().unwrap().to_string();
    assert_eq!(order["status"], "draft");
    assert_eq!(order["total_cents"], 6 * 4500 + 25000);

    // Receiving a draft is an illegal transition.
    let response = app
        .admin_request(
            Method::POST,
            &format!("/api/v1/purchase-orders/{}/receive", order_id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // Submit, then receive.
    let response = app
        .admin_request(
            Method::POST,
            &format!("/api/v1/purchase-orders/{}/submit", order_id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "submitted");

    let response = app
        .admin_request(
            Method::POST,
            &format!("/api/v1/purchase-orders/{}/receive", order_id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let order = body_json(response).await;
    assert_eq!(order["status"], "received");
    assert!(!order["received_at"].is_null());

    // The consumable line restocked with the order number as reference.
    let response = app
        .admin_request(Method::GET, &format!("/api/v1/consumables/{}", item_id), None)
        .await;
    assert_eq!(body_json(response).await["quantity"], 6);

    let response = app
        .admin_request(
            Method::GET,
            &format!("/api/v1/consumables/{}/transactions", item_id),
            None,
        )
        .await;
    let ledger = body_json(response).await;
    assert_eq!(ledger["data"][0]["reference"], "PO-2026-0001");
}

#[tokio::test]
async fn cancelled_order_stays_cancelled() {
    let mut app = TestApp::spawn().await;
    let supplier_id = create_supplier(&mut app, "Cables Inc").await;

    let response = app
        .admin_request(
            Method::POST,
            "/api/v1/purchase-orders",
            Some(json!({
                "order_number": "PO-2026-0002",
                "supplier_id": supplier_id,
                "lines": [],
            })),
        )
        .await;
    let order = body_json(response).await;
    let order_id = order["id"].as_str().unwrap().to_string();

    let response = app
        .admin_request(
            Method::POST,
            &format!("/api/v1/purchase-orders/{}/cancel", order_id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .admin_request(
            Method::POST,
            &format!("/api/v1/purchase-orders/{}/submit", order_id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn only_drafts_can_be_edited() {
    let mut app = TestApp::spawn().await;
    let supplier_id = create_supplier(&mut app, "Paper Co").await;

    let response = app
        .admin_request(
            Method::POST,
            "/api/v1/purchase-orders",
            Some(json!({
                "order_number": "PO-2026-0003",
                "supplier_id": supplier_id,
                "lines": [{"description": "Paper", "quantity": 10, "unit_price_cents": 650}],
            })),
        )
        .await;
    let order = body_json(response).await;
    let order_id = order["id"].as_str().unwrap().to_string();

    app.admin_request(
        Method::POST,
        &format!("/api/v1/purchase-orders/{}/submit", order_id),
        None,
    )
    .await;

    let response = app
        .admin_request(
            Method::PUT,
            &format!("/api/v1/purchase-orders/{}", order_id),
            Some(json!({"notes": "changed my mind"})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn supplier_with_orders_cannot_be_deleted() {
    let mut app = TestApp::spawn().await;
    let supplier_id = create_supplier(&mut app, "Sticky Notes GmbH").await;

    app.admin_request(
        Method::POST,
        "/api/v1/purchase-orders",
        Some(json!({
            "order_number": "PO-2026-0004",
            "supplier_id": supplier_id,
            "lines": [],
        })),
    )
    .await;

    let response = app
        .admin_request(
            Method::DELETE,
            &format!("/api/v1/suppliers/{}", supplier_id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}
