//! Domain models for FacilityDesk.

pub mod asset;
pub mod consumable;
pub mod employee;
pub mod purchase;
pub mod sla;
pub mod supplier;
pub mod ticket;
pub mod visitor;

pub use asset::{Asset, AssetCategory, AssetStatus, CustodyRecord};
pub use consumable::{ConsumableItem, ConsumableTransaction, TransactionKind};
pub use employee::{ChatStatus, Employee};
pub use purchase::{OrderStatus, PurchaseOrder, PurchaseOrderLine};
pub use sla::SlaPolicy;
pub use supplier::Supplier;
pub use ticket::{ChatMessage, MessageSender, SupportTicket, TicketPriority, TicketStatus};
pub use visitor::{Visit, Visitor};
