//! Purchase orders and their line items.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A purchase order placed with a supplier.
///
/// Orders move `Draft -> Submitted -> Received`, or to `Cancelled` from
/// either pre-received state. Receiving an order restocks every line that
/// references a consumable item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseOrder {
    pub id: Uuid,
    /// Human-facing order number (unique, e.g. "PO-2026-0042").
    pub order_number: String,
    /// Supplier the order is placed with.
    pub supplier_id: Uuid,
    /// Current status.
    pub status: OrderStatus,
    /// Line items.
    pub lines: Vec<PurchaseOrderLine>,
    /// When the order was submitted to the supplier.
    pub submitted_at: Option<DateTime<Utc>>,
    /// When the goods were received.
    pub received_at: Option<DateTime<Utc>>,
    /// Free-form notes.
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PurchaseOrder {
    /// Creates a new draft order with no lines.
    pub fn new(order_number: impl Into<String>, supplier_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            order_number: order_number.into(),
            supplier_id,
            status: OrderStatus::Draft,
            lines: Vec::new(),
            submitted_at: None,
            received_at: None,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Order total in cents, computed from the lines.
    pub fn total_cents(&self) -> i64 {
        self.lines
            .iter()
            .map(|l| l.quantity * l.unit_price_cents)
            .sum()
    }

    /// Returns true if the transition from the current status is allowed.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self.status, next),
            (Draft, Submitted) | (Submitted, Received) | (Draft, Cancelled) | (Submitted, Cancelled)
        )
    }
}

/// One line on a purchase order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseOrderLine {
    pub id: Uuid,
    pub order_id: Uuid,
    /// What is being bought.
    pub description: String,
    /// Units ordered.
    pub quantity: i64,
    /// Price per unit, in cents.
    pub unit_price_cents: i64,
    /// Consumable item this line restocks on receipt, if any.
    pub consumable_item_id: Option<Uuid>,
}

impl PurchaseOrderLine {
    pub fn new(order_id: Uuid, description: impl Into<String>, quantity: i64, unit_price_cents: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            order_id,
            description: description.into(),
            quantity,
            unit_price_cents,
            consumable_item_id: None,
        }
    }
}

/// Status of a purchase order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Draft,
    Submitted,
    Received,
    Cancelled,
}

impl OrderStatus {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            OrderStatus::Draft => "draft",
            OrderStatus::Submitted => "submitted",
            OrderStatus::Received => "received",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(OrderStatus::Draft),
            "submitted" => Some(OrderStatus::Submitted),
            "received" => Some(OrderStatus::Received),
            "cancelled" => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_db_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_from_lines() {
        let mut order = PurchaseOrder::new("PO-1", Uuid::new_v4());
        let mut line = PurchaseOrderLine::new(order.id, "Toner", 3, 4_500);
        order.lines.push(line.clone());
        line.id = Uuid::new_v4();
        line.description = "Paper".to_string();
        line.quantity = 10;
        line.unit_price_cents = 650;
        order.lines.push(line);
        assert_eq!(order.total_cents(), 3 * 4_500 + 10 * 650);
    }

    #[test]
    fn test_status_transitions() {
        let mut order = PurchaseOrder::new("PO-2", Uuid::new_v4());
        assert!(order.can_transition_to(OrderStatus::Submitted));
        assert!(order.can_transition_to(OrderStatus::Cancelled));
        assert!(!order.can_transition_to(OrderStatus::Received));

        order.status = OrderStatus::Submitted;
        assert!(order.can_transition_to(OrderStatus::Received));
        assert!(order.can_transition_to(OrderStatus::Cancelled));
        assert!(!order.can_transition_to(OrderStatus::Draft));

        order.status = OrderStatus::Received;
        assert!(!order.can_transition_to(OrderStatus::Cancelled));

        order.status = OrderStatus::Cancelled;
        assert!(!order.can_transition_to(OrderStatus::Submitted));
    }
}
