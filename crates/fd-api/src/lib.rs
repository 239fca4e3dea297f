//! HTTP API server for FacilityDesk.
//!
//! A versioned JSON API over the fd-core domain: assets and custody,
//! employees, consumable stock, suppliers and purchase orders, support
//! tickets with chat, visitors, SLA policies, and service users. Liveness
//! for chat and ticket views is poll-based; there is no push transport.

pub mod auth;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;

pub use error::{ApiError, ErrorResponse};
pub use server::{ApiServer, ApiServerConfig};
pub use state::AppState;
