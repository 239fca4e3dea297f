//! The `serve` command: run the API server.

use anyhow::{Context, Result};
use colored::Colorize;
use std::net::SocketAddr;
use tracing::info;

use fd_api::{ApiServer, ApiServerConfig, AppState};
use fd_core::db::{create_pool, ensure_admin_user, run_migrations};
use fd_core::EventBus;
use fd_observability::init_metrics;

/// Configuration for the serve command.
#[derive(Debug, Clone)]
pub struct ServeConfig {
    /// Host to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Database URL.
    pub database_url: String,
    /// Enable Swagger UI.
    pub swagger: bool,
    /// Seed a default admin on an empty user table.
    pub seed_admin: bool,
    /// Validate configuration and exit without serving.
    pub validate_only: bool,
}

/// Starts the API server: pool, migrations, seeding, then serve until a
/// shutdown signal.
pub async fn run_server(config: ServeConfig) -> Result<()> {
    let bind_address: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", config.host, config.port))?;

    if config.validate_only {
        println!("{} configuration is valid", "✓".green());
        return Ok(());
    }

    let pool = create_pool(&config.database_url)
        .await
        .context("Failed to connect to the database")?;

    run_migrations(&pool)
        .await
        .context("Failed to run migrations")?;

    if config.seed_admin {
        if let Some(password) = ensure_admin_user(&pool)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to seed admin user: {}", e))?
        {
            // Printed once, on first run only.
            println!(
                "{} created default admin user {} with password {}",
                "!".yellow(),
                "admin".bold(),
                password.bold()
            );
        }
    }

    let prometheus_handle = init_metrics()
        .map_err(|e| anyhow::anyhow!("Failed to install metrics recorder: {}", e))?;

    let state =
        AppState::new(pool, EventBus::new(256)).with_prometheus_handle(prometheus_handle);

    let server_config = ApiServerConfig {
        bind_address,
        enable_swagger: config.swagger,
        ..ApiServerConfig::default()
    };

    info!(address = %bind_address, "FacilityDesk starting");

    ApiServer::new(state, server_config)
        .run()
        .await
        .context("Server error")?;

    Ok(())
}
