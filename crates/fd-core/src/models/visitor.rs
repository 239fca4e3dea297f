//! Visitor records and visit logging.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A person who visits the facility.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Visitor {
    pub id: Uuid,
    /// Full name.
    pub name: String,
    /// Company or organization.
    pub company: Option<String>,
    /// Contact email.
    pub email: Option<String>,
    /// Contact phone.
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Visitor {
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            company: None,
            email: None,
            phone: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// One check-in/check-out stretch of a visitor.
///
/// A visitor has at most one open visit (`checked_out_at` is `None`) at a
/// time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Visit {
    pub id: Uuid,
    pub visitor_id: Uuid,
    /// Employee hosting the visit.
    pub host_employee_id: Uuid,
    /// Reason for the visit.
    pub purpose: Option<String>,
    /// Badge handed out at the front desk.
    pub badge_number: Option<String>,
    pub checked_in_at: DateTime<Utc>,
    pub checked_out_at: Option<DateTime<Utc>>,
}

impl Visit {
    /// Opens a visit starting now.
    pub fn check_in(visitor_id: Uuid, host_employee_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            visitor_id,
            host_employee_id,
            purpose: None,
            badge_number: None,
            checked_in_at: Utc::now(),
            checked_out_at: None,
        }
    }

    /// Returns true while the visitor is still on site.
    pub fn is_open(&self) -> bool {
        self.checked_out_at.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_in_opens_visit() {
        let visit = Visit::check_in(Uuid::new_v4(), Uuid::new_v4());
        assert!(visit.is_open());
    }
}
