//! Ticket chat routing and bot-assisted triage.
//!
//! An employee's messages route on the `chat_status` flag of their record:
//! `bot` means the triage bot answers, `human` means a support agent does.
//! The bot escalates to a human when the employee asks for one or when two
//! of its replies in a row were the fallback. An agent posting to a thread
//! always takes the conversation over; resolving the ticket hands the next
//! conversation back to the bot.
//!
//! There is no retry machinery here: a failed write surfaces to the caller
//! and the client resubmits.

use crate::db::{ChatMessageRepository, DbError, EmployeeRepository, TicketRepository};
use crate::events::{DeskEvent, EventBus};
use crate::models::{
    ChatMessage, ChatStatus, Employee, MessageSender, SupportTicket,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

/// What the bot says when no rule matches.
const BOT_FALLBACK: &str = "I couldn't find an answer for that. Could you describe the problem \
    differently? If you'd rather talk to a person, just ask for an agent.";

/// Notice written into the thread when the bot hands off.
const HANDOFF_NOTICE: &str =
    "You've been transferred to a support agent. Someone will reply here shortly.";

/// Errors from chat operations.
#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Ticket {0} not found")]
    TicketNotFound(Uuid),

    #[error("Employee {0} not found")]
    EmployeeNotFound(Uuid),

    #[error("Employee {employee_id} is not the requester of ticket {ticket_id}")]
    NotTicketRequester {
        ticket_id: Uuid,
        employee_id: Uuid,
    },

    #[error("Ticket {0} is closed")]
    TicketClosed(Uuid),

    #[error("Message body is empty")]
    EmptyMessage,

    #[error(transparent)]
    Db(#[from] DbError),
}

/// Who answered the employee last on a ticket.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatPartner {
    Bot,
    Agent,
    Nobody,
}

/// A keyword rule the triage bot answers from.
struct BotRule {
    keywords: &'static [&'static str],
    reply: &'static str,
}

/// Deterministic keyword-rule responder.
///
/// The rule table covers the requests the service desk sees most; anything
/// else gets the fallback, and two fallbacks in a row escalate.
pub struct TriageBot {
    rules: Vec<BotRule>,
}

impl TriageBot {
    pub fn new() -> Self {
        Self {
            rules: vec![
                BotRule {
                    keywords: &["password", "locked out", "login"],
                    reply: "You can reset your password yourself at the self-service portal \
                        (Intranet > Account > Reset password). The link in the reset email is \
                        valid for 30 minutes. Did that solve it?",
                },
                BotRule {
                    keywords: &["printer", "printing", "toner"],
                    reply: "For printer trouble, first check the display on the printer itself \
                        for a paper jam or toner warning. Replacement toner is stocked at the \
                        facilities desk. If the printer shows no error but won't print, remove \
                        and re-add it under Settings > Printers.",
                },
                BotRule {
                    keywords: &["vpn", "remote access"],
                    reply: "If the VPN won't connect, make sure you're on the latest client \
                        version, then try the 'Backup' gateway from the connection menu. \
                        Certificate errors usually clear after a reboot.",
                },
                BotRule {
                    keywords: &["email", "outlook", "mailbox"],
                    reply: "For mail issues, check the web mailbox first: if it works there, \
                        the problem is the local client and re-creating the profile usually \
                        fixes it. If the web mailbox fails too, tell me the exact error.",
                },
                BotRule {
                    keywords: &["wifi", "wi-fi", "network", "internet"],
                    reply: "Try forgetting the office network and joining again with your \
                        employee credentials. Meeting-room access points reset nightly, so a \
                        stale session can linger until you rejoin.",
                },
            ],
        }
    }

    /// The canned reply for a message, if a rule matches.
    pub fn respond(&self, body: &str) -> Option<&'static str> {
        let lower = body.to_lowercase();
        self.rules
            .iter()
            .find(|rule| rule.keywords.iter().any(|k| lower.contains(k)))
            .map(|rule| rule.reply)
    }

    /// True when the employee is asking for a person.
    pub fn wants_human(&self, body: &str) -> bool {
        let lower = body.to_lowercase();
        ["human", "agent", "real person", "someone from it", "talk to a person"]
            .iter()
            .any(|phrase| lower.contains(phrase))
    }

    /// The fallback reply text.
    pub fn fallback(&self) -> &'static str {
        BOT_FALLBACK
    }
}

impl Default for TriageBot {
    fn default() -> Self {
        Self::new()
    }
}

/// Service routing ticket chat messages between employees, the triage bot,
/// and support agents.
pub struct ChatService {
    tickets: Box<dyn TicketRepository>,
    messages: Box<dyn ChatMessageRepository>,
    employees: Box<dyn EmployeeRepository>,
    events: EventBus,
    bot: TriageBot,
}

impl ChatService {
    pub fn new(
        tickets: Box<dyn TicketRepository>,
        messages: Box<dyn ChatMessageRepository>,
        employees: Box<dyn EmployeeRepository>,
        events: EventBus,
    ) -> Self {
        Self {
            tickets,
            messages,
            employees,
            events,
            bot: TriageBot::new(),
        }
    }

    /// Handles a message from the employee-facing chat widget.
    ///
    /// Returns every message appended to the thread: the employee's own,
    /// plus any bot reply or handoff notice.
    pub async fn post_employee_message(
        &self,
        ticket_id: Uuid,
        employee_id: Uuid,
        body: &str,
    ) -> Result<Vec<ChatMessage>, ChatError> {
        let body = body.trim();
        if body.is_empty() {
            return Err(ChatError::EmptyMessage);
        }

        let ticket = self.ticket_open_for(ticket_id).await?;
        if ticket.requester_id != employee_id {
            return Err(ChatError::NotTicketRequester {
                ticket_id,
                employee_id,
            });
        }

        let employee = self
            .employees
            .get(employee_id)
            .await?
            .ok_or(ChatError::EmployeeNotFound(employee_id))?;

        let mut appended = Vec::new();

        let message = ChatMessage::new(ticket_id, MessageSender::Employee, body)
            .with_sender_id(employee_id);
        appended.push(self.store(message).await?);

        match employee.chat_status {
            // A human is on the thread; agents pick the message up by polling.
            ChatStatus::Human => {}
            ChatStatus::Bot => {
                let followups = self.bot_turn(&ticket, &employee, body).await?;
                appended.extend(followups);
            }
        }

        Ok(appended)
    }

    /// Handles a message from a support agent.
    ///
    /// Posting takes the conversation over: the employee's routing flips to
    /// `human` so the bot stays out of the thread.
    pub async fn post_agent_message(
        &self,
        ticket_id: Uuid,
        agent_user_id: Uuid,
        body: &str,
    ) -> Result<ChatMessage, ChatError> {
        let body = body.trim();
        if body.is_empty() {
            return Err(ChatError::EmptyMessage);
        }

        let ticket = self.ticket_open_for(ticket_id).await?;

        let message =
            ChatMessage::new(ticket_id, MessageSender::Agent, body).with_sender_id(agent_user_id);
        let message = self.store(message).await?;

        self.tickets
            .mark_first_response(ticket_id, message.created_at)
            .await?;

        let employee = self
            .employees
            .get(ticket.requester_id)
            .await?
            .ok_or(ChatError::EmployeeNotFound(ticket.requester_id))?;

        if employee.chat_status == ChatStatus::Bot {
            self.flip_chat_status(&ticket, &employee, ChatStatus::Human)
                .await?;
        }

        Ok(message)
    }

    /// Messages on a ticket, ascending, optionally after a polling cursor.
    pub async fn messages_since(
        &self,
        ticket_id: Uuid,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<ChatMessage>, ChatError> {
        self.tickets
            .get(ticket_id)
            .await?
            .ok_or(ChatError::TicketNotFound(ticket_id))?;

        Ok(self.messages.list_for_ticket(ticket_id, since).await?)
    }

    /// Who answered last on the ticket, inferred from the most recent bot
    /// or agent message.
    pub async fn chat_partner(&self, ticket_id: Uuid) -> Result<ChatPartner, ChatError> {
        self.tickets
            .get(ticket_id)
            .await?
            .ok_or(ChatError::TicketNotFound(ticket_id))?;

        let partner = match self.messages.latest_non_employee(ticket_id).await? {
            Some(message) if message.sender == MessageSender::Bot => ChatPartner::Bot,
            Some(_) => ChatPartner::Agent,
            None => ChatPartner::Nobody,
        };

        Ok(partner)
    }

    /// Hands the requester back to the bot once their ticket is resolved,
    /// so the next conversation starts in triage mode.
    pub async fn reset_after_resolution(&self, ticket: &SupportTicket) -> Result<(), ChatError> {
        let employee = self
            .employees
            .get(ticket.requester_id)
            .await?
            .ok_or(ChatError::EmployeeNotFound(ticket.requester_id))?;

        if employee.chat_status == ChatStatus::Human {
            self.flip_chat_status(ticket, &employee, ChatStatus::Bot)
                .await?;
        }

        Ok(())
    }

    /// One bot turn: answer from the rule table, or escalate.
    async fn bot_turn(
        &self,
        ticket: &SupportTicket,
        employee: &Employee,
        body: &str,
    ) -> Result<Vec<ChatMessage>, ChatError> {
        if self.bot.wants_human(body) {
            let notice = self.handoff(ticket, employee).await?;
            return Ok(vec![notice]);
        }

        if let Some(reply) = self.bot.respond(body) {
            let message = self.bot_reply(ticket, reply).await?;
            return Ok(vec![message]);
        }

        // Second unanswerable message in a row escalates instead of looping
        // the fallback forever.
        if self.last_bot_reply_was_fallback(ticket.id).await? {
            let notice = self.handoff(ticket, employee).await?;
            return Ok(vec![notice]);
        }

        let message = self.bot_reply(ticket, self.bot.fallback()).await?;
        Ok(vec![message])
    }

    async fn bot_reply(
        &self,
        ticket: &SupportTicket,
        reply: &str,
    ) -> Result<ChatMessage, ChatError> {
        let message = self
            .store(ChatMessage::new(ticket.id, MessageSender::Bot, reply))
            .await?;
        self.tickets
            .mark_first_response(ticket.id, message.created_at)
            .await?;
        Ok(message)
    }

    /// Whether the thread's most recent bot message was the fallback.
    async fn last_bot_reply_was_fallback(&self, ticket_id: Uuid) -> Result<bool, ChatError> {
        let recent = self.messages.recent_for_ticket(ticket_id, 10).await?;
        let last_bot = recent
            .iter()
            .find(|m| m.sender == MessageSender::Bot);

        Ok(matches!(last_bot, Some(m) if m.body == BOT_FALLBACK))
    }

    async fn handoff(
        &self,
        ticket: &SupportTicket,
        employee: &Employee,
    ) -> Result<ChatMessage, ChatError> {
        self.flip_chat_status(ticket, employee, ChatStatus::Human)
            .await?;

        let notice = self
            .store(ChatMessage::new(
                ticket.id,
                MessageSender::System,
                HANDOFF_NOTICE,
            ))
            .await?;

        info!(
            ticket_id = %ticket.id,
            employee_id = %employee.id,
            "Chat handed off to a support agent"
        );

        Ok(notice)
    }

    async fn flip_chat_status(
        &self,
        ticket: &SupportTicket,
        employee: &Employee,
        to: ChatStatus,
    ) -> Result<(), ChatError> {
        if let Err(err) = self.employees.set_chat_status(employee.id, to).await {
            // Surfaced to the caller; the client resubmits.
            warn!(
                employee_id = %employee.id,
                error = %err,
                "Failed to flip chat status"
            );
            return Err(err.into());
        }

        self.events.publish(DeskEvent::ChatHandoff {
            ticket_id: ticket.id,
            employee_id: employee.id,
            to,
        });

        Ok(())
    }

    async fn ticket_open_for(&self, ticket_id: Uuid) -> Result<SupportTicket, ChatError> {
        let ticket = self
            .tickets
            .get(ticket_id)
            .await?
            .ok_or(ChatError::TicketNotFound(ticket_id))?;

        if ticket.is_closed() {
            return Err(ChatError::TicketClosed(ticket_id));
        }

        Ok(ticket)
    }

    async fn store(&self, message: ChatMessage) -> Result<ChatMessage, ChatError> {
        let message = self.messages.create(&message).await?;
        self.events.publish(DeskEvent::ChatMessagePosted {
            ticket_id: message.ticket_id,
            sender: message.sender,
        });
        Ok(message)
    }
}

#[cfg(test)]
mod bot_tests {
    use super::*;

    #[test]
    fn test_rule_match() {
        let bot = TriageBot::new();
        assert!(bot.respond("I forgot my PASSWORD again").is_some());
        assert!(bot.respond("the printer is jammed").is_some());
        assert!(bot.respond("my stapler broke").is_none());
    }

    #[test]
    fn test_wants_human() {
        let bot = TriageBot::new();
        assert!(bot.wants_human("can I talk to a real person please"));
        assert!(bot.wants_human("give me an AGENT"));
        assert!(!bot.wants_human("my vpn is down"));
    }
}

#[cfg(all(test, feature = "database"))]
mod tests {
    use super::*;
    use crate::db::{
        create_chat_message_repository, create_employee_repository, create_ticket_repository,
        run_migrations, DbPool,
    };
    use crate::models::{Employee, SupportTicket, TicketPriority};

    async fn setup() -> (ChatService, DbPool, Employee, SupportTicket) {
        let db_url = format!(
            "sqlite:file:chat_test_{}?mode=memory&cache=shared",
            Uuid::new_v4()
        );
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect(&db_url)
            .await
            .unwrap();
        let pool = DbPool::Sqlite(pool);
        run_migrations(&pool).await.unwrap();

        let employees = create_employee_repository(&pool);
        let employee = employees
            .create(&Employee::new("Sam Doe", "sam@example.com"))
            .await
            .unwrap();

        let tickets = create_ticket_repository(&pool);
        let ticket = tickets
            .create(&SupportTicket::new(
                "Printer trouble",
                TicketPriority::Medium,
                employee.id,
            ))
            .await
            .unwrap();

        let service = ChatService::new(
            create_ticket_repository(&pool),
            create_chat_message_repository(&pool),
            create_employee_repository(&pool),
            EventBus::new(16),
        );

        (service, pool, employee, ticket)
    }

    #[tokio::test]
    async fn test_bot_answers_matching_message() {
        let (service, _pool, employee, ticket) = setup().await;

        let appended = service
            .post_employee_message(ticket.id, employee.id, "the printer won't print")
            .await
            .unwrap();

        assert_eq!(appended.len(), 2);
        assert_eq!(appended[0].sender, MessageSender::Employee);
        assert_eq!(appended[1].sender, MessageSender::Bot);

        assert_eq!(
            service.chat_partner(ticket.id).await.unwrap(),
            ChatPartner::Bot
        );
    }

    #[tokio::test]
    async fn test_two_fallbacks_escalate() {
        let (service, pool, employee, ticket) = setup().await;

        let first = service
            .post_employee_message(ticket.id, employee.id, "the gizmo is making noises")
            .await
            .unwrap();
        assert_eq!(first[1].sender, MessageSender::Bot);
        assert_eq!(first[1].body, BOT_FALLBACK);

        let second = service
            .post_employee_message(ticket.id, employee.id, "still making noises")
            .await
            .unwrap();
        assert_eq!(second[1].sender, MessageSender::System);

        let employees = create_employee_repository(&pool);
        let employee = employees.get(employee.id).await.unwrap().unwrap();
        assert_eq!(employee.chat_status, ChatStatus::Human);
    }

    #[tokio::test]
    async fn test_asking_for_human_escalates_immediately() {
        let (service, pool, employee, ticket) = setup().await;

        let appended = service
            .post_employee_message(ticket.id, employee.id, "I want to talk to a real person")
            .await
            .unwrap();
        assert_eq!(appended[1].sender, MessageSender::System);

        let employees = create_employee_repository(&pool);
        assert_eq!(
            employees.get(employee.id).await.unwrap().unwrap().chat_status,
            ChatStatus::Human
        );
    }

    #[tokio::test]
    async fn test_agent_message_takes_over() {
        let (service, pool, employee, ticket) = setup().await;

        let agent_id = Uuid::new_v4();
        service
            .post_agent_message(ticket.id, agent_id, "Hi, I'll take a look")
            .await
            .unwrap();

        let employees = create_employee_repository(&pool);
        assert_eq!(
            employees.get(employee.id).await.unwrap().unwrap().chat_status,
            ChatStatus::Human
        );
        assert_eq!(
            service.chat_partner(ticket.id).await.unwrap(),
            ChatPartner::Agent
        );

        // With a human on the thread the bot stays quiet.
        let appended = service
            .post_employee_message(ticket.id, employee.id, "thanks!")
            .await
            .unwrap();
        assert_eq!(appended.len(), 1);
    }

    #[tokio::test]
    async fn test_resolution_hands_back_to_bot() {
        let (service, pool, employee, ticket) = setup().await;

        service
            .post_agent_message(ticket.id, Uuid::new_v4(), "done, closing this")
            .await
            .unwrap();

        let tickets = create_ticket_repository(&pool);
        let resolved = tickets
            .set_status(ticket.id, crate::models::TicketStatus::Resolved)
            .await
            .unwrap();
        service.reset_after_resolution(&resolved).await.unwrap();

        let employees = create_employee_repository(&pool);
        assert_eq!(
            employees.get(employee.id).await.unwrap().unwrap().chat_status,
            ChatStatus::Bot
        );
    }

    #[tokio::test]
    async fn test_wrong_employee_rejected() {
        let (service, pool, _employee, ticket) = setup().await;

        let employees = create_employee_repository(&pool);
        let other = employees
            .create(&Employee::new("Other", "other@example.com"))
            .await
            .unwrap();

        assert!(matches!(
            service
                .post_employee_message(ticket.id, other.id, "hello")
                .await,
            Err(ChatError::NotTicketRequester { .. })
        ));
    }

    #[tokio::test]
    async fn test_closed_ticket_rejects_messages() {
        let (service, pool, employee, ticket) = setup().await;

        let tickets = create_ticket_repository(&pool);
        tickets
            .set_status(ticket.id, crate::models::TicketStatus::Closed)
            .await
            .unwrap();

        assert!(matches!(
            service
                .post_employee_message(ticket.id, employee.id, "hello?")
                .await,
            Err(ChatError::TicketClosed(_))
        ));
    }
}
