//! HTTP middleware for the API server.
//!
//! Request ID generation and propagation, request logging with timing,
//! security headers, CORS, and request body size limits.

use axum::{
    extract::Request,
    http::{header, HeaderValue},
    middleware::Next,
    response::Response,
};
use std::time::Instant;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{info, warn, Span};
use uuid::Uuid;

use fd_core::is_production_environment;

/// Request ID header name.
pub const REQUEST_ID_HEADER: &str = "X-Request-Id";

/// Request ID extension type.
#[derive(Clone, Debug)]
pub struct RequestId(pub String);

/// Middleware to add request ID to requests and responses.
pub async fn request_id(mut request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(String::from)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    request
        .extensions_mut()
        .insert(RequestId(request_id.clone()));

    Span::current().record("request_id", &request_id);

    let mut response = next.run(request).await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    response
}

/// Middleware for request logging.
pub async fn request_logging(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let request_id = request
        .extensions()
        .get::<RequestId>()
        .map(|r| r.0.clone())
        .unwrap_or_else(|| "unknown".to_string());

    let response = next.run(request).await;

    let duration = start.elapsed();
    let status = response.status();

    metrics::histogram!("fd_request_duration_seconds").record(duration.as_secs_f64());

    if status.is_server_error() {
        warn!(
            request_id = %request_id,
            method = %method,
            uri = %uri,
            status = status.as_u16(),
            duration_ms = duration.as_millis() as u64,
            "Request completed with error"
        );
    } else {
        info!(
            request_id = %request_id,
            method = %method,
            uri = %uri,
            status = status.as_u16(),
            duration_ms = duration.as_millis() as u64,
            "Request completed"
        );
    }

    response
}

/// Middleware adding security headers to every response.
pub async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(
        header::REFERRER_POLICY,
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );

    if is_production_environment() {
        headers.insert(
            header::STRICT_TRANSPORT_SECURITY,
            HeaderValue::from_static("max-age=31536000; includeSubDomains"),
        );
    }

    response
}

/// Default request body size limit (2 MB). Form payloads here are small;
/// there is no file upload surface.
pub const DEFAULT_REQUEST_BODY_LIMIT: usize = 2 * 1024 * 1024;

/// Creates a request body size limit layer.
pub fn body_limit_layer() -> RequestBodyLimitLayer {
    RequestBodyLimitLayer::new(DEFAULT_REQUEST_BODY_LIMIT)
}

/// Creates the CORS layer.
///
/// Development allows any origin; production restricts to the configured
/// dashboard origin via `FD_ALLOWED_ORIGIN`.
pub fn cors_layer() -> CorsLayer {
    if is_production_environment() {
        let origin = std::env::var("FD_ALLOWED_ORIGIN")
            .ok()
            .and_then(|o| o.parse::<HeaderValue>().ok());

        match origin {
            Some(origin) => CorsLayer::new()
                .allow_origin(AllowOrigin::exact(origin))
                .allow_methods(tower_http::cors::Any)
                .allow_headers([header::CONTENT_TYPE]),
            None => CorsLayer::new(),
        }
    } else {
        CorsLayer::permissive()
    }
}
