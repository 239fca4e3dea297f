//! Support tickets and chat messages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::sla::SlaPolicy;

/// A support ticket raised by an employee.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupportTicket {
    /// Unique identifier.
    pub id: Uuid,
    /// Short subject line.
    pub subject: String,
    /// Full problem description.
    pub description: Option<String>,
    /// Workflow status.
    pub status: TicketStatus,
    /// Priority, which selects the SLA policy at creation.
    pub priority: TicketPriority,
    /// Employee who raised the ticket.
    pub requester_id: Uuid,
    /// Support agent (service user) working the ticket.
    pub assignee_id: Option<Uuid>,
    /// First-response deadline stamped from the SLA policy, if one matched.
    pub response_due_at: Option<DateTime<Utc>>,
    /// Resolution deadline stamped from the SLA policy, if one matched.
    pub resolution_due_at: Option<DateTime<Utc>>,
    /// When an agent or the bot first answered.
    pub first_response_at: Option<DateTime<Utc>>,
    /// When the ticket was resolved or closed.
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SupportTicket {
    /// Creates a new open ticket.
    pub fn new(
        subject: impl Into<String>,
        priority: TicketPriority,
        requester_id: Uuid,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            subject: subject.into(),
            description: None,
            status: TicketStatus::Open,
            priority,
            requester_id,
            assignee_id: None,
            response_due_at: None,
            resolution_due_at: None,
            first_response_at: None,
            resolved_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Stamps response/resolution deadlines from an SLA policy.
    ///
    /// Deadlines are computed once, at creation; later policy edits never
    /// restamp a ticket.
    pub fn apply_sla(&mut self, policy: &SlaPolicy) {
        self.response_due_at =
            Some(self.created_at + chrono::Duration::minutes(policy.response_target_minutes));
        self.resolution_due_at =
            Some(self.created_at + chrono::Duration::minutes(policy.resolution_target_minutes));
    }

    /// Returns true once the ticket has reached a terminal status.
    pub fn is_closed(&self) -> bool {
        matches!(self.status, TicketStatus::Resolved | TicketStatus::Closed)
    }
}

/// Workflow status of a ticket.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Open,
    InProgress,
    Waiting,
    Resolved,
    Closed,
}

impl TicketStatus {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            TicketStatus::Open => "open",
            TicketStatus::InProgress => "in_progress",
            TicketStatus::Waiting => "waiting",
            TicketStatus::Resolved => "resolved",
            TicketStatus::Closed => "closed",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "open" => Some(TicketStatus::Open),
            "in_progress" => Some(TicketStatus::InProgress),
            "waiting" => Some(TicketStatus::Waiting),
            "resolved" => Some(TicketStatus::Resolved),
            "closed" => Some(TicketStatus::Closed),
            _ => None,
        }
    }
}

impl std::fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_db_str())
    }
}

/// Ticket priority; one SLA policy may exist per priority.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TicketPriority {
    Low,
    Medium,
    High,
    Critical,
}

impl TicketPriority {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            TicketPriority::Low => "low",
            TicketPriority::Medium => "medium",
            TicketPriority::High => "high",
            TicketPriority::Critical => "critical",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "low" => Some(TicketPriority::Low),
            "medium" => Some(TicketPriority::Medium),
            "high" => Some(TicketPriority::High),
            "critical" => Some(TicketPriority::Critical),
            _ => None,
        }
    }
}

impl std::fmt::Display for TicketPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_db_str())
    }
}

/// A message in a ticket's chat thread.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    /// Ticket the message belongs to.
    pub ticket_id: Uuid,
    /// Who wrote the message.
    pub sender: MessageSender,
    /// Employee id or user id of the sender, where applicable.
    pub sender_id: Option<Uuid>,
    /// Message body.
    pub body: String,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(ticket_id: Uuid, sender: MessageSender, body: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            ticket_id,
            sender,
            sender_id: None,
            body: body.into(),
            created_at: Utc::now(),
        }
    }

    /// Attaches the concrete sender id (employee or user).
    pub fn with_sender_id(mut self, sender_id: Uuid) -> Self {
        self.sender_id = Some(sender_id);
        self
    }
}

/// Kind of chat participant a message came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageSender {
    /// The employee who raised the ticket.
    Employee,
    /// A support agent (service user).
    Agent,
    /// The triage bot.
    Bot,
    /// Routing notices (handoffs) written by the service itself.
    System,
}

impl MessageSender {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            MessageSender::Employee => "employee",
            MessageSender::Agent => "agent",
            MessageSender::Bot => "bot",
            MessageSender::System => "system",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "employee" => Some(MessageSender::Employee),
            "agent" => Some(MessageSender::Agent),
            "bot" => Some(MessageSender::Bot),
            "system" => Some(MessageSender::System),
            _ => None,
        }
    }
}

impl std::fmt::Display for MessageSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_db_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_sla_stamps_deadlines() {
        let policy = SlaPolicy::new("Standard", TicketPriority::Medium, 60, 480);
        let mut ticket = SupportTicket::new("VPN down", TicketPriority::Medium, Uuid::new_v4());
        ticket.apply_sla(&policy);

        assert_eq!(
            ticket.response_due_at,
            Some(ticket.created_at + chrono::Duration::minutes(60))
        );
        assert_eq!(
            ticket.resolution_due_at,
            Some(ticket.created_at + chrono::Duration::minutes(480))
        );
    }

    #[test]
    fn test_is_closed() {
        let mut ticket = SupportTicket::new("x", TicketPriority::Low, Uuid::new_v4());
        assert!(!ticket.is_closed());
        ticket.status = TicketStatus::Resolved;
        assert!(ticket.is_closed());
        ticket.status = TicketStatus::Closed;
        assert!(ticket.is_closed());
    }

    #[test]
    fn test_priority_round_trip() {
        for priority in [
            TicketPriority::Low,
            TicketPriority::Medium,
            TicketPriority::High,
            TicketPriority::Critical,
        ] {
            assert_eq!(
                TicketPriority::from_db_str(priority.as_db_str()),
                Some(priority)
            );
        }
    }
}
