//! SLA policy records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::ticket::TicketPriority;

/// A named rule pairing a ticket priority with target response and
/// resolution times.
///
/// Policies are configuration, not enforcement: the only effect is stamping
/// due times on tickets at creation. At most one policy exists per priority.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlaPolicy {
    pub id: Uuid,
    /// Display name (unique).
    pub name: String,
    /// Priority this policy applies to (unique).
    pub priority: TicketPriority,
    /// Minutes until a first response is due.
    pub response_target_minutes: i64,
    /// Minutes until resolution is due.
    pub resolution_target_minutes: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SlaPolicy {
    pub fn new(
        name: impl Into<String>,
        priority: TicketPriority,
        response_target_minutes: i64,
        resolution_target_minutes: i64,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            priority,
            response_target_minutes,
            resolution_target_minutes,
            created_at: now,
            updated_at: now,
        }
    }
}
