//! Asset and custody data models.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A tracked physical item, optionally in the custody of an employee.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asset {
    /// Unique identifier.
    pub id: Uuid,
    /// Human-facing inventory tag (unique, e.g. "IT-00412").
    pub asset_tag: String,
    /// Descriptive name.
    pub name: String,
    /// Asset category.
    pub category: AssetCategory,
    /// Lifecycle status.
    pub status: AssetStatus,
    /// Manufacturer serial number.
    pub serial_number: Option<String>,
    /// Model designation.
    pub model: Option<String>,
    /// Physical location (building/room).
    pub location: Option<String>,
    /// Date of purchase.
    pub purchase_date: Option<NaiveDate>,
    /// Warranty expiry date.
    pub warranty_expires: Option<NaiveDate>,
    /// Current custodian, if assigned.
    pub custodian_id: Option<Uuid>,
    /// Free-form notes.
    pub notes: Option<String>,
    /// Timestamp when the record was created.
    pub created_at: DateTime<Utc>,
    /// Timestamp of the last update.
    pub updated_at: DateTime<Utc>,
}

impl Asset {
    /// Creates a new asset in storage.
    pub fn new(
        asset_tag: impl Into<String>,
        name: impl Into<String>,
        category: AssetCategory,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            asset_tag: asset_tag.into(),
            name: name.into(),
            category,
            status: AssetStatus::InStorage,
            serial_number: None,
            model: None,
            location: None,
            purchase_date: None,
            warranty_expires: None,
            custodian_id: None,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns true if the asset can be placed in an employee's custody.
    pub fn is_assignable(&self) -> bool {
        !matches!(self.status, AssetStatus::Retired)
    }
}

/// Broad category of a tracked asset.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AssetCategory {
    Computer,
    Monitor,
    Printer,
    Phone,
    Furniture,
    Network,
    Other,
}

impl AssetCategory {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            AssetCategory::Computer => "computer",
            AssetCategory::Monitor => "monitor",
            AssetCategory::Printer => "printer",
            AssetCategory::Phone => "phone",
            AssetCategory::Furniture => "furniture",
            AssetCategory::Network => "network",
            AssetCategory::Other => "other",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "computer" => Some(AssetCategory::Computer),
            "monitor" => Some(AssetCategory::Monitor),
            "printer" => Some(AssetCategory::Printer),
            "phone" => Some(AssetCategory::Phone),
            "furniture" => Some(AssetCategory::Furniture),
            "network" => Some(AssetCategory::Network),
            "other" => Some(AssetCategory::Other),
            _ => None,
        }
    }
}

impl std::fmt::Display for AssetCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_db_str())
    }
}

/// Lifecycle status of an asset.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AssetStatus {
    /// In the stockroom, available for assignment.
    InStorage,
    /// In the custody of an employee.
    Assigned,
    /// Out for repair.
    InRepair,
    /// Decommissioned; cannot be assigned again.
    Retired,
}

impl AssetStatus {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            AssetStatus::InStorage => "in_storage",
            AssetStatus::Assigned => "assigned",
            AssetStatus::InRepair => "in_repair",
            AssetStatus::Retired => "retired",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "in_storage" => Some(AssetStatus::InStorage),
            "assigned" => Some(AssetStatus::Assigned),
            "in_repair" => Some(AssetStatus::InRepair),
            "retired" => Some(AssetStatus::Retired),
            _ => None,
        }
    }
}

impl std::fmt::Display for AssetStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_db_str())
    }
}

/// One stretch of custody: which employee held which asset, and when.
///
/// An open record (`returned_at` is `None`) is the asset's current
/// assignment; closed records form the custody history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustodyRecord {
    pub id: Uuid,
    pub asset_id: Uuid,
    pub employee_id: Uuid,
    pub assigned_at: DateTime<Utc>,
    pub returned_at: Option<DateTime<Utc>>,
}

impl CustodyRecord {
    /// Opens a new custody record starting now.
    pub fn open(asset_id: Uuid, employee_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            asset_id,
            employee_id,
            assigned_at: Utc::now(),
            returned_at: None,
        }
    }

    /// Returns true while the custody is still active.
    pub fn is_open(&self) -> bool {
        self.returned_at.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_asset_starts_in_storage() {
        let asset = Asset::new("IT-0001", "ThinkPad T14", AssetCategory::Computer);
        assert_eq!(asset.status, AssetStatus::InStorage);
        assert!(asset.custodian_id.is_none());
        assert!(asset.is_assignable());
    }

    #[test]
    fn test_retired_asset_not_assignable() {
        let mut asset = Asset::new("IT-0002", "Old printer", AssetCategory::Printer);
        asset.status = AssetStatus::Retired;
        assert!(!asset.is_assignable());
    }

    #[test]
    fn test_status_round_trip() {
        for status in [
            AssetStatus::InStorage,
            AssetStatus::Assigned,
            AssetStatus::InRepair,
            AssetStatus::Retired,
        ] {
            assert_eq!(AssetStatus::from_db_str(status.as_db_str()), Some(status));
        }
    }

    #[test]
    fn test_custody_record_open() {
        let record = CustodyRecord::open(Uuid::new_v4(), Uuid::new_v4());
        assert!(record.is_open());
    }
}
