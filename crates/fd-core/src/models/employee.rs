//! Employee records and chat routing status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An employee tracked by the facility: custodian of assets, requester of
/// tickets, recipient of issued consumables, host of visitors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Employee {
    /// Unique identifier.
    pub id: Uuid,
    /// Full name.
    pub name: String,
    /// Work email address (unique).
    pub email: String,
    /// Department the employee belongs to.
    pub department: Option<String>,
    /// Job title.
    pub job_title: Option<String>,
    /// Phone number.
    pub phone: Option<String>,
    /// Who answers this employee's support chat messages.
    pub chat_status: ChatStatus,
    /// Whether the employee is active (soft delete flag).
    pub active: bool,
    /// Timestamp when the record was created.
    pub created_at: DateTime<Utc>,
    /// Timestamp of the last update.
    pub updated_at: DateTime<Utc>,
}

impl Employee {
    /// Creates a new active employee with chat routed to the bot.
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            email: email.into(),
            department: None,
            job_title: None,
            phone: None,
            chat_status: ChatStatus::Bot,
            active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Who currently answers an employee's support chat messages.
///
/// `Bot` means the triage bot replies automatically; `Human` means a support
/// agent has taken over the conversation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatStatus {
    /// The triage bot answers messages.
    Bot,
    /// A support agent answers messages.
    Human,
}

impl ChatStatus {
    /// Returns the database representation.
    pub fn as_db_str(&self) -> &'static str {
        match self {
            ChatStatus::Bot => "bot",
            ChatStatus::Human => "human",
        }
    }

    /// Parses the database representation.
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "bot" => Some(ChatStatus::Bot),
            "human" => Some(ChatStatus::Human),
            _ => None,
        }
    }
}

impl std::fmt::Display for ChatStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_db_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_employee_defaults() {
        let employee = Employee::new("Ada Lovelace", "ada@example.com");
        assert_eq!(employee.chat_status, ChatStatus::Bot);
        assert!(employee.active);
        assert_eq!(employee.created_at, employee.updated_at);
    }

    #[test]
    fn test_chat_status_round_trip() {
        for status in [ChatStatus::Bot, ChatStatus::Human] {
            assert_eq!(ChatStatus::from_db_str(status.as_db_str()), Some(status));
        }
        assert_eq!(ChatStatus::from_db_str("robot"), None);
    }
}
