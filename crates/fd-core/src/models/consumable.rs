//! Consumable stock items and their transaction ledger.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A stocked supply item (ink, paper, cables) with an on-hand count.
///
/// The count only moves through ledger transactions; see
/// [`crate::stock::StockService`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsumableItem {
    /// Unique identifier.
    pub id: Uuid,
    /// Descriptive name.
    pub name: String,
    /// Stock-keeping unit code (unique).
    pub sku: String,
    /// Category (e.g. "toner", "cables").
    pub category: Option<String>,
    /// Unit of issue (e.g. "box", "each").
    pub unit: String,
    /// On-hand quantity. Never negative.
    pub quantity: i64,
    /// Quantity at or below which the item shows up in the low-stock view.
    pub reorder_level: i64,
    /// Storage location.
    pub location: Option<String>,
    /// Timestamp when the record was created.
    pub created_at: DateTime<Utc>,
    /// Timestamp of the last update.
    pub updated_at: DateTime<Utc>,
}

impl ConsumableItem {
    /// Creates a new item with zero stock.
    pub fn new(name: impl Into<String>, sku: impl Into<String>, unit: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            sku: sku.into(),
            category: None,
            unit: unit.into(),
            quantity: 0,
            reorder_level: 0,
            location: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns true if the item is at or below its reorder level.
    pub fn is_low_stock(&self) -> bool {
        self.quantity <= self.reorder_level
    }
}

/// One movement of stock, written alongside the quantity change.
///
/// Rows are append-only; `balance_after` records the item's on-hand count
/// immediately after the movement, so the ledger replays to the current
/// quantity in insertion order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsumableTransaction {
    pub id: Uuid,
    /// Item the stock moved on.
    pub item_id: Uuid,
    /// Direction of the movement.
    pub kind: TransactionKind,
    /// Units moved (always positive; direction comes from `kind`).
    pub quantity: i64,
    /// On-hand count right after this movement.
    pub balance_after: i64,
    /// Employee who received issued stock, if any.
    pub employee_id: Option<Uuid>,
    /// External reference, e.g. a purchase order number.
    pub reference: Option<String>,
    /// Free-form note.
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Direction of a stock movement.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Stock added (delivery, return).
    Restock,
    /// Stock handed out to an employee.
    Issue,
    /// Stocktake correction to an absolute count.
    Adjust,
}

impl TransactionKind {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            TransactionKind::Restock => "restock",
            TransactionKind::Issue => "issue",
            TransactionKind::Adjust => "adjust",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "restock" => Some(TransactionKind::Restock),
            "issue" => Some(TransactionKind::Issue),
            "adjust" => Some(TransactionKind::Adjust),
            _ => None,
        }
    }
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_db_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_item_is_empty() {
        let item = ConsumableItem::new("A4 paper", "PAP-A4", "ream");
        assert_eq!(item.quantity, 0);
        assert!(item.is_low_stock());
    }

    #[test]
    fn test_low_stock_boundary() {
        let mut item = ConsumableItem::new("Toner", "TNR-1", "each");
        item.reorder_level = 5;
        item.quantity = 6;
        assert!(!item.is_low_stock());
        item.quantity = 5;
        assert!(item.is_low_stock());
    }

    #[test]
    fn test_kind_round_trip() {
        for kind in [
            TransactionKind::Restock,
            TransactionKind::Issue,
            TransactionKind::Adjust,
        ] {
            assert_eq!(TransactionKind::from_db_str(kind.as_db_str()), Some(kind));
        }
    }
}
