//! Core library for FacilityDesk.
//!
//! FacilityDesk is an IT asset and facilities management service: asset and
//! custody tracking, consumable stock with a transaction ledger, suppliers
//! and purchase orders, support tickets with poll-based chat and a
//! bot-assisted triage mode, visitor logging, and SLA policy configuration.
//!
//! This crate holds the domain models, the database layer (SQLite and
//! PostgreSQL via SQLx), the stock and chat services, the event bus, and
//! auth primitives. The HTTP surface lives in `fd-api`.

pub mod auth;
pub mod chat;
pub mod db;
pub mod events;
pub mod models;
pub mod stock;

pub use auth::{Role, SessionData, User};
pub use chat::{ChatError, ChatPartner, ChatService, TriageBot};
pub use events::{DeskEvent, EventBus, EventEnvelope};
pub use stock::{StockError, StockService};

/// Returns true when the service runs in a production environment.
///
/// Controlled by the `FD_ENV` environment variable (`production` enables
/// strict security headers and cookie flags).
pub fn is_production_environment() -> bool {
    std::env::var("FD_ENV")
        .map(|v| v.eq_ignore_ascii_case("production"))
        .unwrap_or(false)
}
