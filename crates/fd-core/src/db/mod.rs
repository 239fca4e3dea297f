//! Database layer for FacilityDesk.
//!
//! Persistence for assets, employees, consumables, purchasing, tickets,
//! visitors, SLA policies, and service users using SQLx with support for
//! both SQLite (development) and PostgreSQL (production).

mod error;
mod pagination;
mod pool;
mod schema;

pub mod asset_repo;
pub mod chat_repo;
pub mod consumable_repo;
pub mod employee_repo;
pub mod purchase_repo;
#[cfg(feature = "database")]
pub mod seed;
pub mod sla_repo;
pub mod supplier_repo;
pub mod ticket_repo;
pub mod user_repo;
pub mod visitor_repo;

pub use error::DbError;
pub use pagination::{PaginatedResult, Pagination, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
pub use pool::{
    create_pool, create_pool_with_options, escape_like_pattern, make_like_pattern, DbPool,
    PoolOptions,
};
pub use schema::run_migrations;

// Re-export repository traits and filter/update types
pub use asset_repo::{AssetFilter, AssetRepository, AssetUpdate};
pub use chat_repo::ChatMessageRepository;
pub use consumable_repo::{
    ConsumableFilter, ConsumableRepository, ConsumableUpdate, MovementOutcome, StockMovement,
};
pub use employee_repo::{EmployeeFilter, EmployeeRepository, EmployeeUpdate};
pub use purchase_repo::{PurchaseOrderFilter, PurchaseOrderRepository, PurchaseOrderUpdate};
pub use sla_repo::{SlaPolicyRepository, SlaPolicyUpdate};
pub use supplier_repo::{SupplierRepository, SupplierUpdate};
pub use ticket_repo::{TicketFilter, TicketRepository, TicketUpdate};
pub use user_repo::{UserRepository, UserUpdate};
pub use visitor_repo::{VisitFilter, VisitorRepository, VisitorUpdate};

// Re-export factory functions
pub use asset_repo::create_asset_repository;
pub use chat_repo::create_chat_message_repository;
pub use consumable_repo::create_consumable_repository;
pub use employee_repo::create_employee_repository;
pub use purchase_repo::create_purchase_order_repository;
pub use sla_repo::create_sla_policy_repository;
pub use supplier_repo::create_supplier_repository;
pub use ticket_repo::create_ticket_repository;
pub use user_repo::create_user_repository;
pub use visitor_repo::create_visitor_repository;

#[cfg(feature = "database")]
pub use seed::ensure_admin_user;
