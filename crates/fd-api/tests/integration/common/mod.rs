//! Common test utilities for integration tests.

use axum::{
    body::Body,
    http::{header, Method, Request, Response, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use fd_api::{ApiServer, AppState};
use fd_core::auth::{password::hash_password, Role, User};
use fd_core::db::{create_user_repository, run_migrations, DbPool};
use fd_core::EventBus;

/// Admin password used by the test fixtures.
pub const ADMIN_PASSWORD: &str = "correct-horse-battery";

/// A running test application: the router plus direct pool access for
/// fixture setup.
pub struct TestApp {
    pub router: Router,
    pub db: DbPool,
    admin_cookie: Option<String>,
}

impl TestApp {
    /// Creates an app over a fresh in-memory SQLite database with all
    /// migrations applied and an admin user seeded.
    pub async fn spawn() -> Self {
        let db_url = format!(
            "sqlite:file:integration_test_{}?mode=memory&cache=shared",
            Uuid::new_v4()
        );

        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect(&db_url)
            .await
            .expect("Failed to create SQLite pool");

        let db = DbPool::Sqlite(pool);
        run_migrations(&db).await.expect("Failed to run migrations");

        let users = create_user_repository(&db);
        let hash = hash_password(ADMIN_PASSWORD).expect("Failed to hash password");
        users
            .create(&User::new("admin@localhost", "admin", hash, Role::Admin))
            .await
            .expect("Failed to seed admin");

        let state = AppState::new(db.clone(), EventBus::new(100));
        let router = ApiServer::with_state(state).router();

        Self {
            router,
            db,
            admin_cookie: None,
        }
    }

    /// Logs the seeded admin in and caches the session cookie.
    pub async fn login_admin(&mut self) -> String {
        if let Some(cookie) = &self.admin_cookie {
            return cookie.clone();
        }

        let response = self
            .request(
                Method::POST,
                "/api/v1/auth/login",
                Some(json!({"username": "admin", "password": ADMIN_PASSWORD})),
                None,
            )
            .await;

        assert_eq!(response.status(), StatusCode::OK, "admin login failed");

        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .expect("login set no cookie")
            .to_str()
            .expect("cookie not utf-8")
            .split(';')
            .next()
            .expect("empty cookie")
            .to_string();

        self.admin_cookie = Some(cookie.clone());
        cookie
    }

    /// Sends a request, optionally with a JSON body and session cookie.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        cookie: Option<&str>,
    ) -> Response<Body> {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .expect("failed to build request"),
            None => builder.body(Body::empty()).expect("failed to build request"),
        };

        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("request failed")
    }

    /// Sends an authenticated request as the admin.
    pub async fn admin_request(
        &mut self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> Response<Body> {
        let cookie = self.login_admin().await;
        self.request(method, uri, body, Some(&cookie)).await
    }
}

/// Reads a response body as JSON.
pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("failed to read body");
    serde_json::from_slice(&bytes).expect("body is not JSON")
}

/// Creates an employee fixture through the API and returns its id.
pub async fn create_employee(app: &mut TestApp, name: &str, email: &str) -> Uuid {
    let response = app
        .admin_request(
            Method::POST,
            "/api/v1/employees",
            Some(json!({"name": name, "email": email})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = body_json(response).await;
    body["id"].as_str().unwrap().parse().unwrap()
}

/// Creates a consumable item fixture and returns its id.
pub async fn create_item(app: &mut TestApp, name: &str, sku: &str) -> Uuid {
    let response = app
        .admin_request(
            Method::POST,
            "/api/v1/consumables",
            Some(json!({"name": name, "sku": sku, "unit": "each", "reorder_level": 2})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = body_json(response).await;
    body["id"].as_str().unwrap().parse().unwrap()
}

/// Creates a ticket fixture and returns its id.
pub async fn create_ticket(app: &mut TestApp, requester_id: Uuid, subject: &str) -> Uuid {
    let response = app
        .admin_request(
            Method::POST,
            "/api/v1/tickets",
            Some(json!({
                "subject": subject,
                "priority": "medium",
                "requester_id": requester_id,
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = body_json(response).await;
    body["id"].as_str().unwrap().parse().unwrap()
}
