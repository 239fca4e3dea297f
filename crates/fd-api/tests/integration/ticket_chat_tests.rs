//! Ticket and chat routing tests.

use axum::http::{Method, StatusCode};
use serde_json::json;

use super::common::{body_json, create_employee, create_ticket, TestApp};

#[tokio::test]
async fn ticket_creation_stamps_sla_deadlines() {
    let mut app = TestApp::spawn().await;
    let employee_id = create_employee(&mut app, "Ada", "ada@example.com").await;

    // One policy per priority; medium gets 60/480 targets.
    let response = app
        .admin_request(
            Method::POST,
            "/api/v1/sla-policies",
            Some(json!({
                "name": "Standard",
                "priority": "medium",
                "response_target_minutes": 60,
                "resolution_target_minutes": 480,
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .admin_request(
            Method::POST,
            "/api/v1/tickets",
            Some(json!({
                "subject": "VPN down",
                "priority": "medium",
                "requester_id": employee_id,
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let ticket = body_json(response).await;
    assert!(!ticket["response_due_at"].is_null());
    assert!(!ticket["resolution_due_at"].is_null());

    // No policy for critical: no deadlines.
    let response = app
        .admin_request(
            Method::POST,
            "/api/v1/tickets",
            Some(json!({
                "subject": "Server room on fire",
                "priority": "critical",
                "requester_id": employee_id,
            })),
        )
        .await;
    let ticket = body_json(response).await;
    assert!(ticket["response_due_at"].is_null());
}

#[tokio::test]
async fn bot_answers_and_hands_off() {
    let mut app = TestApp::spawn().await;
    let employee_id = create_employee(&mut app, "Sam", "sam@example.com").await;
    let ticket_id = create_ticket(&mut app, employee_id, "Printer trouble").await;

    // A matching message gets a bot reply.
    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/tickets/{}/employee-messages", ticket_id),
            Some(json!({"employee_id": employee_id, "body": "the printer is jammed"})),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let appended = body_json(response).await;
    assert_eq!(appended[0]["sender"], "employee");
    assert_eq!(appended[1]["sender"], "bot");

    // The last chat partner is the bot.
    let response = app
        .admin_request(
            Method::GET,
            &format!("/api/v1/tickets/{}/chat-partner", ticket_id),
            None,
        )
        .await;
    let body = body_json(response).await;
    assert_eq!(body["partner"], "bot");

    // Asking for a person escalates: system notice, employee now human.
    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/tickets/{}/employee-messages", ticket_id),
            Some(json!({"employee_id": employee_id, "body": "I want a real person"})),
            None,
        )
        .await;
    let appended = body_json(response).await;
    assert_eq!(appended[1]["sender"], "system");

    let response = app
        .admin_request(Method::GET, &format!("/api/v1/employees/{}", employee_id), None)
        .await;
    let body = body_json(response).await;
    assert_eq!(body["chat_status"], "human");
}

#[tokio::test]
async fn agent_reply_takes_over_and_marks_first_response() {
    let mut app = TestApp::spawn().await;
    let employee_id = create_employee(&mut app, "Kim", "kim@example.com").await;
    let ticket_id = create_ticket(&mut app, employee_id, "Broken chair").await;

    let response = app
        .admin_request(
            Method::POST,
            &format!("/api/v1/tickets/{}/messages", ticket_id),
            Some(json!({"body": "On my way with a new chair"})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .admin_request(Method::GET, &format!("/api/v1/tickets/{}", ticket_id), None)
        .await;
    let ticket = body_json(response).await;
    assert!(!ticket["first_response_at"].is_null());

    let response = app
        .admin_request(
            Method::GET,
            &format!("/api/v1/tickets/{}/chat-partner", ticket_id),
            None,
        )
        .await;
    assert_eq!(body_json(response).await["partner"], "agent");
}

#[tokio::test]
async fn message_polling_uses_since_cursor() {
    let mut app = TestApp::spawn().await;
    let employee_id = create_employee(&mut app, "Lee", "lee@example.com").await;
    let ticket_id = create_ticket(&mut app, employee_id, "Email trouble").await;

    app.request(
        Method::POST,
        &format!("/api/v1/tickets/{}/employee-messages", ticket_id),
        Some(json!({"employee_id": employee_id, "body": "outlook won't open"})),
        None,
    )
    .await;

    // Full thread: employee message + bot reply.
    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/tickets/{}/messages", ticket_id),
            None,
            None,
        )
        .await;
    let all = body_json(response).await;
    assert_eq!(all.as_array().unwrap().len(), 2);

    // Polling from the last message's timestamp returns nothing new.
    let last_ts = all[1]["created_at"].as_str().unwrap();
    let response = app
        .request(
            Method::GET,
            &format!(
                "/api/v1/tickets/{}/messages?since={}",
                ticket_id,
                urlencode(last_ts)
            ),
            None,
            None,
        )
        .await;
    let newer = body_json(response).await;
    assert_eq!(newer.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn resolving_ticket_resets_chat_to_bot() {
    let mut app = TestApp::spawn().await;
    let employee_id = create_employee(&mut app, "Max", "max@example.com").await;
    let ticket_id = create_ticket(&mut app, employee_id, "Wifi flaky").await;

    // Agent takes over.
    app.admin_request(
        Method::POST,
        &format!("/api/v1/tickets/{}/messages", ticket_id),
        Some(json!({"body": "looking into it"})),
    )
    .await;

    let response = app
        .admin_request(
            Method::POST,
            &format!("/api/v1/tickets/{}/status", ticket_id),
            Some(json!({"status": "resolved"})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let ticket = body_json(response).await;
    assert!(!ticket["resolved_at"].is_null());

    let response = app
        .admin_request(Method::GET, &format!("/api/v1/employees/{}", employee_id), None)
        .await;
    assert_eq!(body_json(response).await["chat_status"], "bot");

    // A closed thread takes no more messages.
    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/tickets/{}/employee-messages", ticket_id),
            Some(json!({"employee_id": employee_id, "body": "hello?"})),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn wrong_employee_cannot_post_to_ticket() {
    let mut app = TestApp::spawn().await;
    let owner_id = create_employee(&mut app, "Owner", "owner@example.com").await;
    let other_id = create_employee(&mut app, "Other", "other@example.com").await;
    let ticket_id = create_ticket(&mut app, owner_id, "My laptop").await;

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/tickets/{}/employee-messages", ticket_id),
            Some(json!({"employee_id": other_id, "body": "snooping"})),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

/// Percent-encodes the handful of characters RFC 3339 timestamps contain.
fn urlencode(s: &str) -> String {
    s.replace('+', "%2B").replace(':', "%3A")
}
