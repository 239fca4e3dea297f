//! API server implementation.

use axum::{middleware, Router};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;
use tower_sessions::{MemoryStore, SessionManagerLayer};
use tracing::info;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::error::ErrorResponse;
use crate::middleware::{
    body_limit_layer, cors_layer, request_id, request_logging, security_headers,
};
use crate::routes;
use crate::state::AppState;
use fd_core::is_production_environment;

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiServerConfig {
    /// Address to bind to.
    pub bind_address: SocketAddr,
    /// Request timeout.
    pub request_timeout: Duration,
    /// Enable Swagger UI.
    pub enable_swagger: bool,
    /// Shutdown timeout for graceful shutdown.
    pub shutdown_timeout: Duration,
}

impl Default for ApiServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([0, 0, 0, 0], 8080)),
            request_timeout: Duration::from_secs(30),
            enable_swagger: true,
            shutdown_timeout: Duration::from_secs(30),
        }
    }
}

/// OpenAPI documentation.
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health::health_check,
        crate::routes::health::health_check_detailed,
        crate::routes::health::readiness_check,
        crate::routes::health::liveness_check,
        crate::routes::assets::list_assets,
        crate::routes::assets::create_asset,
        crate::routes::metrics::summary,
    ),
    components(
        schemas(
            crate::routes::health::HealthResponse,
            crate::routes::health::DatabaseHealth,
            crate::routes::health::ComponentsHealth,
            crate::routes::assets::AssetResponse,
            crate::routes::assets::CreateAssetRequest,
            crate::routes::assets::PaginatedAssetResponse,
            crate::routes::metrics::MetricsSummary,
            ErrorResponse,
        )
    ),
    tags(
        (name = "Health", description = "Health check endpoints"),
        (name = "Assets", description = "Asset and custody management"),
        (name = "Metrics", description = "Service metrics"),
    ),
    info(
        title = "FacilityDesk API",
        version = "0.1.0",
        description = "IT asset and facilities management service",
        license(name = "MIT"),
    )
)]
pub struct ApiDoc;

/// API server.
pub struct ApiServer {
    config: ApiServerConfig,
    state: AppState,
}

impl ApiServer {
    /// Creates a new API server.
    pub fn new(state: AppState, config: ApiServerConfig) -> Self {
        Self { config, state }
    }

    /// Creates a new API server with default configuration.
    pub fn with_state(state: AppState) -> Self {
        Self::new(state, ApiServerConfig::default())
    }

    /// Builds the router.
    pub fn router(&self) -> Router {
        routes::health::init_start_time();

        let mut app = routes::create_router(self.state.clone());

        if self.config.enable_swagger {
            app = app.merge(
                SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()),
            );
        }

        // Sessions are in-memory; a restart logs everyone out, which is
        // acceptable for an internal tool.
        let session_store = MemoryStore::default();
        let session_layer = SessionManagerLayer::new(session_store)
            .with_secure(is_production_environment())
            .with_expiry(tower_sessions::Expiry::OnInactivity(
                tower_sessions::cookie::time::Duration::hours(12),
            ));

        // Middleware order matters: innermost first.
        app.layer(session_layer)
            .layer(middleware::from_fn(security_headers))
            .layer(middleware::from_fn(request_logging))
            .layer(middleware::from_fn(request_id))
            .layer(TraceLayer::new_for_http())
            .layer(cors_layer())
            .layer(body_limit_layer())
            .layer(CatchPanicLayer::new())
    }

    /// Runs the server.
    pub async fn run(self) -> Result<(), std::io::Error> {
        let app = self.router();
        let addr = self.config.bind_address;

        info!("Starting API server on {}", addr);

        let listener = TcpListener::bind(addr).await?;

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("API server shut down gracefully");
        Ok(())
    }

    /// Runs the server with a custom shutdown signal.
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), std::io::Error>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let app = self.router();
        let addr = self.config.bind_address;

        info!("Starting API server on {}", addr);

        let listener = TcpListener::bind(addr).await?;

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("API server shut down gracefully");
        Ok(())
    }
}

/// Default shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fd_core::db::DbPool;
    use fd_core::EventBus;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_router_creation() {
        let db_url = format!(
            "sqlite:file:server_test_{}?mode=memory&cache=shared",
            Uuid::new_v4()
        );
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect(&db_url)
            .await
            .unwrap();
        let state = AppState::new(DbPool::Sqlite(pool), EventBus::new(100));

        let server = ApiServer::with_state(state);
        let _router = server.router();
    }
}
