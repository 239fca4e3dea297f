//! FacilityDesk CLI
//!
//! Command-line interface for the FacilityDesk asset and facilities
//! management service.

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use uuid::Uuid;

mod api_client;
mod commands;
mod config;

use api_client::{ApiClient, ListAssetsParams, ListTicketsParams};
use commands::{run_server, ServeConfig};
use config::AppConfig;

#[derive(Parser)]
#[command(name = "facility-desk")]
#[command(version)]
#[command(about = "IT asset and facilities management service", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Output format (text, json)
    #[arg(long, default_value = "text")]
    format: OutputFormat,

    /// API server URL (for remote commands)
    #[arg(long, default_value = "http://localhost:8080")]
    api_url: String,

    /// Username for remote commands (or FD_USERNAME)
    #[arg(long)]
    username: Option<String>,

    /// Password for remote commands (or FD_PASSWORD)
    #[arg(long)]
    password: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Invalid output format: {}", s)),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Start the API server
    Serve {
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Database URL (sqlite: or postgres://)
        #[arg(short, long)]
        database: Option<String>,

        /// Disable Swagger UI
        #[arg(long)]
        no_swagger: bool,

        /// Validate configuration and exit without starting the server
        #[arg(long)]
        validate_only: bool,
    },

    /// Validate configuration
    Validate {
        /// Configuration file to validate
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Show current configuration
    Config {
        /// Show secrets (redacted by default)
        #[arg(long)]
        show_secrets: bool,
    },

    /// Check a running server's health
    Health,

    /// Inspect assets on a running server
    Asset {
        #[command(subcommand)]
        action: AssetCommands,
    },

    /// Inspect tickets on a running server
    Ticket {
        #[command(subcommand)]
        action: TicketCommands,
    },

    /// Inspect consumable stock on a running server
    Stock {
        #[command(subcommand)]
        action: StockCommands,
    },
}

#[derive(Subcommand)]
enum AssetCommands {
    /// List assets
    List {
        /// Search over tag, name, and serial number
        #[arg(short, long)]
        search: Option<String>,

        /// Filter by status
        #[arg(long)]
        status: Option<String>,

        /// Page number
        #[arg(long)]
        page: Option<u32>,
    },
}

#[derive(Subcommand)]
enum TicketCommands {
    /// List tickets
    List {
        /// Filter by status (comma-separated)
        #[arg(long)]
        status: Option<String>,

        /// Filter by priority (comma-separated)
        #[arg(long)]
        priority: Option<String>,

        /// Page number
        #[arg(long)]
        page: Option<u32>,
    },

    /// Show a ticket with its chat thread
    Show {
        /// Ticket ID
        id: Uuid,
    },
}

#[derive(Subcommand)]
enum StockCommands {
    /// Items at or below their reorder level
    LowStock,

    /// Dashboard summary counters
    Summary,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let app_config = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };

    match cli.command {
        Commands::Serve {
            port,
            host,
            database,
            no_swagger,
            validate_only,
        } => {
            init_logging(&app_config);

            let serve_config = ServeConfig {
                host: host.unwrap_or(app_config.server.host),
                port: port.unwrap_or(app_config.server.port),
                database_url: database.unwrap_or(app_config.database.url),
                swagger: !no_swagger && app_config.server.swagger,
                seed_admin: app_config.database.seed_admin,
                validate_only,
            };

            run_server(serve_config).await
        }

        Commands::Validate { config } => {
            let path = config.or(cli.config);
            match path {
                Some(path) => {
                    AppConfig::load(&path)?;
                    println!("{} {} is valid", "✓".green(), path.display());
                }
                None => {
                    println!("{} no config file given; defaults are valid", "✓".green());
                }
            }
            Ok(())
        }

        Commands::Config { show_secrets } => {
            let config = if show_secrets {
                app_config
            } else {
                app_config.redact_secrets()
            };
            println!("{}", serde_yaml::to_string(&config)?);
            Ok(())
        }

        Commands::Health => {
            let health = ApiClient::health(&cli.api_url).await?;
            match cli.format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&health)?),
                OutputFormat::Text => {
                    let status = health["status"].as_str().unwrap_or("unknown");
                    let colored_status = match status {
                        "healthy" => status.green(),
                        "degraded" => status.yellow(),
                        _ => status.red(),
                    };
                    println!("status:  {}", colored_status);
                    println!(
                        "version: {}",
                        health["version"].as_str().unwrap_or("unknown")
                    );
                    println!("uptime:  {}s", health["uptime_seconds"]);
                }
            }
            Ok(())
        }

        Commands::Asset { action } => {
            let client = login(&cli.api_url, cli.username.as_deref(), cli.password.as_deref()).await?;
            match action {
                AssetCommands::List { search, status, page } => {
                    let page = client
                        .list_assets(&ListAssetsParams { search, status, page })
                        .await?;

                    match cli.format {
                        OutputFormat::Json => {
                            println!("{}", serde_json::to_string_pretty(&page.data)?)
                        }
                        OutputFormat::Text => {
                            for asset in &page.data {
                                println!(
                                    "{}  {:12}  {:10}  {}",
                                    asset["asset_tag"].as_str().unwrap_or("?").bold(),
                                    asset["category"].as_str().unwrap_or("?"),
                                    asset["status"].as_str().unwrap_or("?"),
                                    asset["name"].as_str().unwrap_or("?")
                                );
                            }
                            println!(
                                "page {}/{} ({} assets)",
                                page.page, page.total_pages, page.total_items
                            );
                        }
                    }
                }
            }
            Ok(())
        }

        Commands::Ticket { action } => {
            let client = login(&cli.api_url, cli.username.as_deref(), cli.password.as_deref()).await?;
            match action {
                TicketCommands::List {
                    status,
                    priority,
                    page,
                } => {
                    let page = client
                        .list_tickets(&ListTicketsParams {
                            status,
                            priority,
                            page,
                        })
                        .await?;

                    match cli.format {
                        OutputFormat::Json => {
                            println!("{}", serde_json::to_string_pretty(&page.data)?)
                        }
                        OutputFormat::Text => {
                            for ticket in &page.data {
                                let priority = ticket["priority"].as_str().unwrap_or("?");
                                let colored_priority = match priority {
                                    "critical" => priority.red().bold(),
                                    "high" => priority.red(),
                                    "medium" => priority.yellow(),
                                    _ => priority.normal(),
                                };
                                println!(
                                    "{}  {:12}  {:8}  {}",
                                    ticket["id"].as_str().unwrap_or("?"),
                                    ticket["status"].as_str().unwrap_or("?"),
                                    colored_priority,
                                    ticket["subject"].as_str().unwrap_or("?")
                                );
                            }
                            println!(
                                "page {}/{} ({} tickets)",
                                page.page, page.total_pages, page.total_items
                            );
                        }
                    }
                }

                TicketCommands::Show { id } => {
                    let (ticket, messages) = client.get_ticket(id).await?;

                    match cli.format {
                        OutputFormat::Json => {
                            println!(
                                "{}",
                                serde_json::to_string_pretty(&serde_json::json!({
                                    "ticket": ticket,
                                    "messages": messages,
                                }))?
                            )
                        }
                        OutputFormat::Text => {
                            println!(
                                "{} [{} / {}]",
                                ticket["subject"].as_str().unwrap_or("?").bold(),
                                ticket["status"].as_str().unwrap_or("?"),
                                ticket["priority"].as_str().unwrap_or("?")
                            );
                            for message in &messages {
                                println!(
                                    "  {:8}  {}",
                                    message["sender"].as_str().unwrap_or("?").cyan(),
                                    message["body"].as_str().unwrap_or("")
                                );
                            }
                        }
                    }
                }
            }
            Ok(())
        }

        Commands::Stock { action } => {
            let client = login(&cli.api_url, cli.username.as_deref(), cli.password.as_deref()).await?;
            match action {
                StockCommands::LowStock => {
                    let items = client.low_stock().await?;
                    match cli.format {
                        OutputFormat::Json => {
                            println!("{}", serde_json::to_string_pretty(&items)?)
                        }
                        OutputFormat::Text => {
                            if items.is_empty() {
                                println!("{} nothing below reorder level", "✓".green());
                            }
                            for item in &items {
                                println!(
                                    "{}  {:6} on hand (reorder at {})  {}",
                                    item["sku"].as_str().unwrap_or("?").bold(),
                                    item["quantity"],
                                    item["reorder_level"],
                                    item["name"].as_str().unwrap_or("?")
                                );
                            }
                        }
                    }
                }

                StockCommands::Summary => {
                    let summary = client.metrics_summary().await?;
                    println!("{}", serde_json::to_string_pretty(&summary)?);
                }
            }
            Ok(())
        }
    }
}

/// Logs into the API for remote commands.
async fn login(
    api_url: &str,
    username: Option<&str>,
    password: Option<&str>,
) -> Result<ApiClient> {
    let username = username
        .map(|s| s.to_string())
        .or_else(|| std::env::var("FD_USERNAME").ok())
        .unwrap_or_else(|| "admin".to_string());
    let password = password
        .map(|s| s.to_string())
        .or_else(|| std::env::var("FD_PASSWORD").ok())
        .ok_or_else(|| anyhow::anyhow!("No password given (use --password or FD_PASSWORD)"))?;

    ApiClient::login(api_url, &username, &password).await
}

/// Initializes logging from the config file's logging section.
fn init_logging(config: &AppConfig) {
    use fd_observability::{init_logging_with_config, LoggingConfig};

    let level = match config.logging.level.to_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "warn" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    };

    let logging = LoggingConfig {
        level,
        json_format: config.logging.json_format,
        ..LoggingConfig::default()
    };

    init_logging_with_config(logging);
}
