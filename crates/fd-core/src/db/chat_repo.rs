//! Chat message repository for database operations.
//!
//! Messages hang off a ticket and are append-only; deletion happens only
//! via the ticket's cascade.

use super::{DbError, DbPool};
use crate::models::{ChatMessage, MessageSender};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Repository trait for chat message persistence.
#[async_trait]
pub trait ChatMessageRepository: Send + Sync {
    /// Appends a message to a ticket's thread.
    async fn create(&self, message: &ChatMessage) -> Result<ChatMessage, DbError>;

    /// Messages for a ticket in ascending order, optionally only those
    /// after `since` (the polling cursor).
    async fn list_for_ticket(
        &self,
        ticket_id: Uuid,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<ChatMessage>, DbError>;

    /// The most recent bot or agent message on the ticket.
    ///
    /// This single most-recent-row query is how the employee's "last chat
    /// partner" is inferred; routing notices from the service don't count.
    async fn latest_non_employee(&self, ticket_id: Uuid)
        -> Result<Option<ChatMessage>, DbError>;

    /// The most recent `limit` messages, newest first.
    async fn recent_for_ticket(
        &self,
        ticket_id: Uuid,
        limit: u32,
    ) -> Result<Vec<ChatMessage>, DbError>;
}

#[cfg(feature = "database")]
const MESSAGE_COLUMNS: &str = "id, ticket_id, sender, sender_id, body, created_at";

// ============================================================================
// SQLite implementation
// ============================================================================

#[cfg(feature = "database")]
#[derive(sqlx::FromRow)]
struct MessageRow {
    id: String,
    ticket_id: String,
    sender: String,
    sender_id: Option<String>,
    body: String,
    created_at: String,
}

#[cfg(feature = "database")]
impl TryFrom<MessageRow> for ChatMessage {
    type Error = DbError;

    fn try_from(row: MessageRow) -> Result<Self, Self::Error> {
        Ok(ChatMessage {
            id: parse_uuid(&row.id)?,
            ticket_id: parse_uuid(&row.ticket_id)?,
            sender: MessageSender::from_db_str(&row.sender).ok_or_else(|| {
                DbError::Serialization(format!("Unknown message sender: {}", row.sender))
            })?,
            sender_id: row.sender_id.as_deref().map(parse_uuid).transpose()?,
            body: row.body,
            created_at: parse_ts(&row.created_at)?,
        })
    }
}

#[cfg(feature = "database")]
fn parse_uuid(s: &str) -> Result<Uuid, DbError> {
    Uuid::parse_str(s).map_err(|e| DbError::Serialization(e.to_string()))
}

#[cfg(feature = "database")]
fn parse_ts(s: &str) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DbError::Serialization(e.to_string()))
}

/// SQLite implementation of ChatMessageRepository.
#[cfg(feature = "database")]
pub struct SqliteChatMessageRepository {
    pool: sqlx::SqlitePool,
}

#[cfg(feature = "database")]
impl SqliteChatMessageRepository {
    pub fn new(pool: sqlx::SqlitePool) -> Self {
        Self { pool }
    }
}

#[cfg(feature = "database")]
#[async_trait]
impl ChatMessageRepository for SqliteChatMessageRepository {
    async fn create(&self, message: &ChatMessage) -> Result<ChatMessage, DbError> {
        sqlx::query(
            r#"
            INSERT INTO chat_messages (id, ticket_id, sender, sender_id, body, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(message.id.to_string())
        .bind(message.ticket_id.to_string())
        .bind(message.sender.as_db_str())
        .bind(message.sender_id.map(|id| id.to_string()))
        .bind(&message.body)
        .bind(message.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(message.clone())
    }

    async fn list_for_ticket(
        &self,
        ticket_id: Uuid,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<ChatMessage>, DbError> {
        let rows: Vec<MessageRow> = match since {
            Some(since) => {
                sqlx::query_as(&format!(
                    "SELECT {} FROM chat_messages WHERE ticket_id = ? AND created_at > ? ORDER BY created_at ASC",
                    MESSAGE_COLUMNS
                ))
                .bind(ticket_id.to_string())
                .bind(since.to_rfc3339())
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as(&format!(
                    "SELECT {} FROM chat_messages WHERE ticket_id = ? ORDER BY created_at ASC",
                    MESSAGE_COLUMNS
                ))
                .bind(ticket_id.to_string())
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn latest_non_employee(
        &self,
        ticket_id: Uuid,
    ) -> Result<Option<ChatMessage>, DbError> {
        let row: Option<MessageRow> = sqlx::query_as(&format!(
            "SELECT {} FROM chat_messages WHERE ticket_id = ? AND sender IN ('agent', 'bot') ORDER BY created_at DESC LIMIT 1",
            MESSAGE_COLUMNS
        ))
        .bind(ticket_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn recent_for_ticket(
        &self,
        ticket_id: Uuid,
        limit: u32,
    ) -> Result<Vec<ChatMessage>, DbError> {
        let rows: Vec<MessageRow> = sqlx::query_as(&format!(
            "SELECT {} FROM chat_messages WHERE ticket_id = ? ORDER BY created_at DESC LIMIT ?",
            MESSAGE_COLUMNS
        ))
        .bind(ticket_id.to_string())
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }
}

// ============================================================================
// PostgreSQL implementation
// ============================================================================

#[cfg(feature = "database")]
#[derive(sqlx::FromRow)]
struct PgMessageRow {
    id: Uuid,
    ticket_id: Uuid,
    sender: String,
    sender_id: Option<Uuid>,
    body: String,
    created_at: DateTime<Utc>,
}

#[cfg(feature = "database")]
impl TryFrom<PgMessageRow> for ChatMessage {
    type Error = DbError;

    fn try_from(row: PgMessageRow) -> Result<Self, Self::Error> {
        Ok(ChatMessage {
            id: row.id,
            ticket_id: row.ticket_id,
            sender: MessageSender::from_db_str(&row.sender).ok_or_else(|| {
                DbError::Serialization(format!("Unknown message sender: {}", row.sender))
            })?,
            sender_id: row.sender_id,
            body: row.body,
            created_at: row.created_at,
        })
    }
}

/// PostgreSQL implementation of ChatMessageRepository.
#[cfg(feature = "database")]
pub struct PgChatMessageRepository {
    pool: sqlx::PgPool,
}

#[cfg(feature = "database")]
impl PgChatMessageRepository {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[cfg(feature = "database")]
#[async_trait]
impl ChatMessageRepository for PgChatMessageRepository {
    async fn create(&self, message: &ChatMessage) -> Result<ChatMessage, DbError> {
        sqlx::query(
            r#"
            INSERT INTO chat_messages (id, ticket_id, sender, sender_id, body, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(message.id)
        .bind(message.ticket_id)
        .bind(message.sender.as_db_str())
        .bind(message.sender_id)
        .bind(&message.body)
        .bind(message.created_at)
        .execute(&self.pool)
        .await?;

        Ok(message.clone())
    }

    async fn list_for_ticket(
        &self,
        ticket_id: Uuid,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<ChatMessage>, DbError> {
        let rows: Vec<PgMessageRow> = sqlx::query_as(&format!(
            r#"
            SELECT {}
            FROM chat_messages
            WHERE ticket_id = $1 AND ($2::timestamptz IS NULL OR created_at > $2)
            ORDER BY created_at ASC
            "#,
            MESSAGE_COLUMNS
        ))
        .bind(ticket_id)
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn latest_non_employee(
        &self,
        ticket_id: Uuid,
    ) -> Result<Option<ChatMessage>, DbError> {
        let row: Option<PgMessageRow> = sqlx::query_as(&format!(
            "SELECT {} FROM chat_messages WHERE ticket_id = $1 AND sender IN ('agent', 'bot') ORDER BY created_at DESC LIMIT 1",
            MESSAGE_COLUMNS
        ))
        .bind(ticket_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn recent_for_ticket(
        &self,
        ticket_id: Uuid,
        limit: u32,
    ) -> Result<Vec<ChatMessage>, DbError> {
        let rows: Vec<PgMessageRow> = sqlx::query_as(&format!(
            "SELECT {} FROM chat_messages WHERE ticket_id = $1 ORDER BY created_at DESC LIMIT $2",
            MESSAGE_COLUMNS
        ))
        .bind(ticket_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }
}

/// Factory function to create the appropriate repository based on pool type.
#[cfg(feature = "database")]
pub fn create_chat_message_repository(pool: &DbPool) -> Box<dyn ChatMessageRepository> {
    match pool {
        DbPool::Sqlite(pool) => Box::new(SqliteChatMessageRepository::new(pool.clone())),
        DbPool::Postgres(pool) => Box::new(PgChatMessageRepository::new(pool.clone())),
    }
}
