//! Supplier records for purchasing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A vendor that purchase orders are placed with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Supplier {
    pub id: Uuid,
    /// Company name.
    pub name: String,
    /// Contact person.
    pub contact_name: Option<String>,
    /// Contact email.
    pub email: Option<String>,
    /// Contact phone.
    pub phone: Option<String>,
    /// Postal address.
    pub address: Option<String>,
    /// Whether new orders may be placed with this supplier.
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Supplier {
    /// Creates a new active supplier.
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            contact_name: None,
            email: None,
            phone: None,
            address: None,
            active: true,
            created_at: now,
            updated_at: now,
        }
    }
}
