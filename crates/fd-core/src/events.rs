//! Event bus for FacilityDesk.
//!
//! An in-process fan-out of domain events over a Tokio broadcast channel.
//! Clients of the HTTP API still poll for liveness; the bus only serves
//! in-process subscribers (logging, metrics, the detailed health view).
//! There is no cross-process delivery and no ordering guarantee beyond the
//! broadcast channel's own.

use crate::models::{ChatStatus, MessageSender, TicketPriority, TicketStatus, TransactionKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

/// Errors that can occur on the event bus.
#[derive(Error, Debug)]
pub enum EventBusError {
    #[error("Failed to publish event: {0}")]
    PublishError(String),
}

/// Domain events published by services and route handlers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DeskEvent {
    /// A support ticket was created.
    TicketCreated {
        ticket_id: Uuid,
        priority: TicketPriority,
    },
    /// A ticket changed status.
    TicketStatusChanged {
        ticket_id: Uuid,
        status: TicketStatus,
    },
    /// A chat message was appended to a ticket thread.
    ChatMessagePosted {
        ticket_id: Uuid,
        sender: MessageSender,
    },
    /// An employee's chat routing flipped between bot and human.
    ChatHandoff {
        ticket_id: Uuid,
        employee_id: Uuid,
        to: ChatStatus,
    },
    /// Stock moved on a consumable item.
    StockMoved {
        item_id: Uuid,
        kind: TransactionKind,
        quantity: i64,
        balance_after: i64,
    },
    /// An asset entered or left an employee's custody.
    CustodyChanged {
        asset_id: Uuid,
        employee_id: Option<Uuid>,
    },
    /// A visitor checked in.
    VisitorCheckedIn { visit_id: Uuid, visitor_id: Uuid },
}

/// A published event with its timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Unique identifier for this event.
    pub event_id: Uuid,
    /// When the event was published.
    pub timestamp: DateTime<Utc>,
    /// The wrapped event.
    pub event: DeskEvent,
}

impl EventEnvelope {
    fn new(event: DeskEvent) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            event,
        }
    }
}

/// Broadcast-based event bus.
///
/// Cloning is cheap; all clones share the same channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<EventEnvelope>,
}

impl EventBus {
    /// Creates a new event bus with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all current subscribers.
    ///
    /// Publishing with no subscribers is not an error; the event is simply
    /// dropped.
    pub fn publish(&self, event: DeskEvent) {
        let envelope = EventEnvelope::new(event);
        debug!(event = ?envelope.event, "Publishing event");
        // A send error only means there are no receivers right now.
        let _ = self.sender.send(envelope);
    }

    /// Subscribes to all future events.
    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.sender.subscribe()
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_and_receive() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        let ticket_id = Uuid::new_v4();
        bus.publish(DeskEvent::TicketCreated {
            ticket_id,
            priority: TicketPriority::High,
        });

        let envelope = rx.recv().await.unwrap();
        match envelope.event {
            DeskEvent::TicketCreated { ticket_id: id, .. } => assert_eq!(id, ticket_id),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_ok() {
        let bus = EventBus::new(16);
        bus.publish(DeskEvent::VisitorCheckedIn {
            visit_id: Uuid::new_v4(),
            visitor_id: Uuid::new_v4(),
        });
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_subscriber_count() {
        let bus = EventBus::new(16);
        let _a = bus.subscribe();
        let _b = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);
    }
}
