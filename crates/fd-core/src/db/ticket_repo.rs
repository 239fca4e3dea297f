//! Support ticket repository for database operations.

use super::pagination::{PaginatedResult, Pagination};
use super::{DbError, DbPool};
use crate::models::{SupportTicket, TicketPriority, TicketStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Filter criteria for listing tickets.
#[derive(Debug, Clone, Default)]
pub struct TicketFilter {
    /// Filter by status (multiple allowed).
    pub status: Option<Vec<TicketStatus>>,
    /// Filter by priority (multiple allowed).
    pub priority: Option<Vec<TicketPriority>>,
    /// Filter by requesting employee.
    pub requester_id: Option<Uuid>,
    /// Filter by assigned user.
    pub assignee_id: Option<Uuid>,
    /// Free-text search over subject and description.
    pub search: Option<String>,
}

/// Partial update for a ticket. Status moves through `set_status`, which
/// owns the `resolved_at` stamping rules.
#[derive(Debug, Clone, Default)]
pub struct TicketUpdate {
    pub subject: Option<String>,
    pub description: Option<String>,
    pub priority: Option<TicketPriority>,
}

/// Repository trait for ticket persistence.
#[async_trait]
pub trait TicketRepository: Send + Sync {
    async fn create(&self, ticket: &SupportTicket) -> Result<SupportTicket, DbError>;

    async fn get(&self, id: Uuid) -> Result<Option<SupportTicket>, DbError>;

    async fn list(
        &self,
        filter: &TicketFilter,
        pagination: &Pagination,
    ) -> Result<PaginatedResult<SupportTicket>, DbError>;

    async fn update(&self, id: Uuid, update: &TicketUpdate) -> Result<SupportTicket, DbError>;

    /// Moves the ticket to a new status. Entering `resolved` or `closed`
    /// stamps `resolved_at`; leaving them clears it (reopen).
    async fn set_status(&self, id: Uuid, status: TicketStatus) -> Result<SupportTicket, DbError>;

    /// Sets the assignee; an `open` ticket moves to `in_progress`.
    async fn assign(&self, id: Uuid, assignee_id: Uuid) -> Result<SupportTicket, DbError>;

    /// Stamps `first_response_at` if it is not yet set.
    async fn mark_first_response(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), DbError>;

    async fn delete(&self, id: Uuid) -> Result<bool, DbError>;

    /// Open (non-terminal) ticket counts grouped by priority, for the
    /// metrics summary.
    async fn count_open_by_priority(&self) -> Result<Vec<(TicketPriority, u64)>, DbError>;
}

#[cfg(feature = "database")]
const TICKET_COLUMNS: &str = "id, subject, description, status, priority, requester_id, assignee_id, response_due_at, resolution_due_at, first_response_at, resolved_at, created_at, updated_at";

// ============================================================================
// SQLite implementation
// ============================================================================

#[cfg(feature = "database")]
#[derive(sqlx::FromRow)]
struct TicketRow {
    id: String,
    subject: String,
    description: Option<String>,
    status: String,
    priority: String,
    requester_id: String,
    assignee_id: Option<String>,
    response_due_at: Option<String>,
    resolution_due_at: Option<String>,
    first_response_at: Option<String>,
    resolved_at: Option<String>,
    created_at: String,
    updated_at: String,
}

#[cfg(feature = "database")]
impl TryFrom<TicketRow> for SupportTicket {
    type Error = DbError;

    fn try_from(row: TicketRow) -> Result<Self, Self::Error> {
        Ok(SupportTicket {
            id: parse_uuid(&row.id)?,
            subject: row.subject,
            description: row.description,
            status: TicketStatus::from_db_str(&row.status).ok_or_else(|| {
                DbError::Serialization(format!("Unknown ticket status: {}", row.status))
            })?,
            priority: TicketPriority::from_db_str(&row.priority).ok_or_else(|| {
                DbError::Serialization(format!("Unknown priority: {}", row.priority))
            })?,
            requester_id: parse_uuid(&row.requester_id)?,
            assignee_id: row.assignee_id.as_deref().map(parse_uuid).transpose()?,
            response_due_at: row.response_due_at.as_deref().map(parse_ts).transpose()?,
            resolution_due_at: row
                .resolution_due_at
                .as_deref()
                .map(parse_ts)
                .transpose()?,
            first_response_at: row
                .first_response_at
                .as_deref()
                .map(parse_ts)
                .transpose()?,
            resolved_at: row.resolved_at.as_deref().map(parse_ts).transpose()?,
            created_at: parse_ts(&row.created_at)?,
            updated_at: parse_ts(&row.updated_at)?,
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

/// SQLite implementation of TicketRepository.
#[cfg(feature = "database")]
pub struct SqliteTicketRepository {
    pool: sqlx::SqlitePool,
}

#[cfg(feature = "database")]
impl SqliteTicketRepository {
    pub fn new(pool: sqlx::SqlitePool) -> Self {
        Self { pool }
    }
}

#[cfg(feature = "database")]
#[async_trait]
impl TicketRepository for SqliteTicketRepository {
    async fn create(&self, ticket: &SupportTicket) -> Result<SupportTicket, DbError> {
        sqlx::query(
            r#"
            INSERT INTO tickets (id, subject, description, status, priority, requester_id, assignee_id, response_due_at, resolution_due_at, first_response_at, resolved_at, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(ticket.id.to_string())
        .bind(&ticket.subject)
        .bind(&ticket.description)
        .bind(ticket.status.as_db_str())
        .bind(ticket.priority.as_db_str())
        .bind(ticket.requester_id.to_string())
        .bind(ticket.assignee_id.map(|id| id.to_string()))
        .bind(ticket.response_due_at.map(|t| t.to_rfc3339()))
        .bind(ticket.resolution_due_at.map(|t| t.to_rfc3339()))
        .bind(ticket.first_response_at.map(|t| t.to_rfc3339()))
        .bind(ticket.resolved_at.map(|t| t.to_rfc3339()))
        .bind(ticket.created_at.to_rfc3339())
        .bind(ticket.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(ticket.clone())
    }

    async fn get(&self, id: Uuid) -> Result<Option<SupportTicket>, DbError> {
        let row: Option<TicketRow> = sqlx::query_as(&format!(
            "SELECT {} FROM tickets WHERE id = ?",
            TICKET_COLUMNS
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn list(
        &self,
        filter: &TicketFilter,
        pagination: &Pagination,
    ) -> Result<PaginatedResult<SupportTicket>, DbError> {
        use super::make_like_pattern;

        let mut query = format!("SELECT {} FROM tickets WHERE 1=1", TICKET_COLUMNS);
        let mut count_query = String::from("SELECT COUNT(*) FROM tickets WHERE 1=1");

        let clauses = |q: &mut String| {
            if filter.status.is_some() {
                q.push_str(" AND status IN (SELECT value FROM json_each(?))");
            }
            if filter.priority.is_some() {
                q.push_str(" AND priority IN (SELECT value FROM json_each(?))");
            }
            if filter.requester_id.is_some() {
                q.push_str(" AND requester_id = ?");
            }
            if filter.assignee_id.is_some() {
                q.push_str(" AND assignee_id = ?");
            }
            if filter.search.is_some() {
                q.push_str(" AND (subject LIKE ? ESCAPE '\\' OR description LIKE ? ESCAPE '\\')");
            }
        };
        clauses(&mut query);
        clauses(&mut count_query);
        query.push_str(" ORDER BY created_at DESC LIMIT ? OFFSET ?");

        let status_json = filter
            .status
            .as_ref()
            .map(|s| serde_json::to_string(&s.iter().map(|v| v.as_db_str()).collect::<Vec<_>>()))
            .transpose()?;
        let priority_json = filter
            .priority
            .as_ref()
            .map(|s| serde_json::to_string(&s.iter().map(|v| v.as_db_str()).collect::<Vec<_>>()))
            .transpose()?;
        let pattern = filter.search.as_deref().map(make_like_pattern);

        let mut rows_q = sqlx::query_as::<_, TicketRow>(&query);
        let mut count_q = sqlx::query_scalar::<_, i64>(&count_query);

        if let Some(status_json) = &status_json {
            rows_q = rows_q.bind(status_json.clone());
            count_q = count_q.bind(status_json.clone());
        }
        if let Some(priority_json) = &priority_json {
            rows_q = rows_q.bind(priority_json.clone());
            count_q = count_q.bind(priority_json.clone());
        }
        if let Some(requester_id) = filter.requester_id {
            rows_q = rows_q.bind(requester_id.to_string());
            count_q = count_q.bind(requester_id.to_string());
        }
        if let Some(assignee_id) = filter.assignee_id {
            rows_q = rows_q.bind(assignee_id.to_string());
            count_q = count_q.bind(assignee_id.to_string());
        }
        if let Some(pattern) = &pattern {
            rows_q = rows_q.bind(pattern.clone()).bind(pattern.clone());
            count_q = count_q.bind(pattern.clone()).bind(pattern.clone());
        }

        rows_q = rows_q
            .bind(pagination.limit() as i64)
            .bind(pagination.offset() as i64);

        let rows: Vec<TicketRow> = rows_q.fetch_all(&self.pool).await?;
        let total: i64 = count_q.fetch_one(&self.pool).await?;

        let items: Result<Vec<SupportTicket>, DbError> =
            rows.into_iter().map(TryInto::try_into).collect();

        Ok(PaginatedResult::new(items?, total as u64, pagination))
    }

    async fn update(&self, id: Uuid, update: &TicketUpdate) -> Result<SupportTicket, DbError> {
        let now = Utc::now().to_rfc3339();

        let mut set_clauses = vec!["updated_at = ?".to_string()];
        let mut values: Vec<String> = vec![now];

        if let Some(subject) = &update.subject {
            set_clauses.push("subject = ?".to_string());
            values.push(subject.clone());
        }
        if let Some(description) = &update.description {
            set_clauses.push("description = ?".to_string());
            values.push(description.clone());
        }
        if let Some(priority) = update.priority {
            set_clauses.push("priority = ?".to_string());
            values.push(priority.as_db_str().to_string());
        }

        let query = format!("UPDATE tickets SET {} WHERE id = ?", set_clauses.join(", "));

        let mut query_builder = sqlx::query(&query);
        for value in &values {
            query_builder = query_builder.bind(value);
        }
        query_builder = query_builder.bind(id.to_string());
        query_builder.execute(&self.pool).await?;

        self.get(id)
            .await?
            .ok_or_else(|| DbError::not_found("Ticket", id))
    }

    async fn set_status(&self, id: Uuid, status: TicketStatus) -> Result<SupportTicket, DbError> {
        let now = Utc::now().to_rfc3339();
        let resolved_at = matches!(status, TicketStatus::Resolved | TicketStatus::Closed)
            .then(|| now.clone());

        let result = sqlx::query(
            "UPDATE tickets SET status = ?, resolved_at = ?, updated_at = ? WHERE id = ?",
        )
        .bind(status.as_db_str())
        .bind(&resolved_at)
        .bind(&now)
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Ticket", id));
        }

        self.get(id)
            .await?
            .ok_or_else(|| DbError::not_found("Ticket", id))
    }

    async fn assign(&self, id: Uuid, assignee_id: Uuid) -> Result<SupportTicket, DbError> {
        let result = sqlx::query(
            r#"
            UPDATE tickets SET
                assignee_id = ?,
                status = CASE WHEN status = 'open' THEN 'in_progress' ELSE status END,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(assignee_id.to_string())
        .bind(Utc::now().to_rfc3339())
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Ticket", id));
        }

        self.get(id)
            .await?
            .ok_or_else(|| DbError::not_found("Ticket", id))
    }

    async fn mark_first_response(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), DbError> {
        sqlx::query(
            "UPDATE tickets SET first_response_at = ? WHERE id = ? AND first_response_at IS NULL",
        )
        .bind(at.to_rfc3339())
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM tickets WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn count_open_by_priority(&self) -> Result<Vec<(TicketPriority, u64)>, DbError> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT priority, COUNT(*) FROM tickets WHERE status NOT IN ('resolved', 'closed') GROUP BY priority",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(priority, count)| {
                TicketPriority::from_db_str(&priority)
                    .ok_or_else(|| {
                        DbError::Serialization(format!("Unknown priority: {}", priority))
                    })
                    .map(|p| (p, count as u64))
            })
            .collect()
    }
}

// ============================================================================
// PostgreSQL implementation
// ============================================================================

#[cfg(feature = "database")]
#[derive(sqlx::FromRow)]
struct PgTicketRow {
    id: Uuid,
    subject: String,
    description: Option<String>,
    status: String,
    priority: String,
    requester_id: Uuid,
    assignee_id: Option<Uuid>,
    response_due_at: Option<DateTime<Utc>>,
    resolution_due_at: Option<DateTime<Utc>>,
    first_response_at: Option<DateTime<Utc>>,
    resolved_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[cfg(feature = "database")]
impl TryFrom<PgTicketRow> for SupportTicket {
    type Error = DbError;

    fn try_from(row: PgTicketRow) -> Result<Self, Self::Error> {
        Ok(SupportTicket {
            id: row.id,
            subject: row.subject,
            description: row.description,
            status: TicketStatus::from_db_str(&row.status).ok_or_else(|| {
                DbError::Serialization(format!("Unknown ticket status: {}", row.status))
            })?,
            priority: TicketPriority::from_db_str(&row.priority).ok_or_else(|| {
                DbError::Serialization(format!("Unknown priority: {}", row.priority))
            })?,
            requester_id: row.requester_id,
            assignee_id: row.assignee_id,
            response_due_at: row.response_due_at,
            resolution_due_at: row.resolution_due_at,
            first_response_at: row.first_response_at,
            resolved_at: row.resolved_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// PostgreSQL implementation of TicketRepository.
#[cfg(feature = "database")]
pub struct PgTicketRepository {
    pool: sqlx::PgPool,
}

#[cfg(feature = "database")]
impl PgTicketRepository {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[cfg(feature = "database")]
#[async_trait]
impl TicketRepository for PgTicketRepository {
    async fn create(&self, ticket: &SupportTicket) -> Result<SupportTicket, DbError> {
        sqlx::query(
            r#"
            INSERT INTO tickets (id, subject, description, status, priority, requester_id, assignee_id, response_due_at, resolution_due_at, first_response_at, resolved_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(ticket.id)
        .bind(&ticket.subject)
        .bind(&ticket.description)
        .bind(ticket.status.as_db_str())
        .bind(ticket.priority.as_db_str())
        .bind(ticket.requester_id)
        .bind(ticket.assignee_id)
        .bind(ticket.response_due_at)
        .bind(ticket.resolution_due_at)
        .bind(ticket.first_response_at)
        .bind(ticket.resolved_at)
        .bind(ticket.created_at)
        .bind(ticket.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(ticket.clone())
    }

    async fn get(&self, id: Uuid) -> Result<Option<SupportTicket>, DbError> {
        let row: Option<PgTicketRow> = sqlx::query_as(&format!(
            "SELECT {} FROM tickets WHERE id = $1",
            TICKET_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn list(
        &self,
        filter: &TicketFilter,
        pagination: &Pagination,
    ) -> Result<PaginatedResult<SupportTicket>, DbError> {
        use super::make_like_pattern;

        let statuses = filter
            .status
            .as_ref()
            .map(|s| s.iter().map(|v| v.as_db_str().to_string()).collect::<Vec<_>>());
        let priorities = filter
            .priority
            .as_ref()
            .map(|s| s.iter().map(|v| v.as_db_str().to_string()).collect::<Vec<_>>());
        let pattern = filter.search.as_deref().map(make_like_pattern);

        let rows: Vec<PgTicketRow> = sqlx::query_as(&format!(
            r#"
            SELECT {}
            FROM tickets
            WHERE ($1::text[] IS NULL OR status = ANY($1))
              AND ($2::text[] IS NULL OR priority = ANY($2))
              AND ($3::uuid IS NULL OR requester_id = $3)
              AND ($4::uuid IS NULL OR assignee_id = $4)
              AND ($5::text IS NULL OR subject ILIKE $5 OR description ILIKE $5)
            ORDER BY created_at DESC
            LIMIT $6 OFFSET $7
            "#,
            TICKET_COLUMNS
        ))
        .bind(&statuses)
        .bind(&priorities)
        .bind(filter.requester_id)
        .bind(filter.assignee_id)
        .bind(&pattern)
        .bind(pagination.limit() as i64)
        .bind(pagination.offset() as i64)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM tickets
            WHERE ($1::text[] IS NULL OR status = ANY($1))
              AND ($2::text[] IS NULL OR priority = ANY($2))
              AND ($3::uuid IS NULL OR requester_id = $3)
              AND ($4::uuid IS NULL OR assignee_id = $4)
              AND ($5::text IS NULL OR subject ILIKE $5 OR description ILIKE $5)
            "#,
        )
        .bind(&statuses)
        .bind(&priorities)
        .bind(filter.requester_id)
        .bind(filter.assignee_id)
        .bind(&pattern)
        .fetch_one(&self.pool)
        .await?;

        let items: Result<Vec<SupportTicket>, DbError> =
            rows.into_iter().map(TryInto::try_into).collect();

        Ok(PaginatedResult::new(items?, total as u64, pagination))
    }

    async fn update(&self, id: Uuid, update: &TicketUpdate) -> Result<SupportTicket, DbError> {
        sqlx::query(
            r#"
            UPDATE tickets SET
                subject = COALESCE($2, subject),
                description = COALESCE($3, description),
                priority = COALESCE($4, priority),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&update.subject)
        .bind(&update.description)
        .bind(update.priority.map(|p| p.as_db_str()))
        .execute(&self.pool)
        .await?;

        self.get(id)
            .await?
            .ok_or_else(|| DbError::not_found("Ticket", id))
    }

    async fn set_status(&self, id: Uuid, status: TicketStatus) -> Result<SupportTicket, DbError> {
        let terminal = matches!(status, TicketStatus::Resolved | TicketStatus::Closed);

        let result = sqlx::query(
            r#"
            UPDATE tickets SET
                status = $2,
                resolved_at = CASE WHEN $3 THEN NOW() ELSE NULL END,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(status.as_db_str())
        .bind(terminal)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Ticket", id));
        }

        self.get(id)
            .await?
            .ok_or_else(|| DbError::not_found("Ticket", id))
    }

    async fn assign(&self, id: Uuid, assignee_id: Uuid) -> Result<SupportTicket, DbError> {
        let result = sqlx::query(
            r#"
            UPDATE tickets SET
                assignee_id = $2,
                status = CASE WHEN status = 'open' THEN 'in_progress' ELSE status END,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(assignee_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Ticket", id));
        }

        self.get(id)
            .await?
            .ok_or_else(|| DbError::not_found("Ticket", id))
    }

    async fn mark_first_response(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), DbError> {
        sqlx::query(
            "UPDATE tickets SET first_response_at = $2 WHERE id = $1 AND first_response_at IS NULL",
        )
        .bind(id)
        .bind(at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM tickets WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn count_open_by_priority(&self) -> Result<Vec<(TicketPriority, u64)>, DbError> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT priority, COUNT(*) FROM tickets WHERE status NOT IN ('resolved', 'closed') GROUP BY priority",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(priority, count)| {
                TicketPriority::from_db_str(&priority)
                    .ok_or_else(|| {
                        DbError::Serialization(format!("Unknown priority: {}", priority))
                    })
                    .map(|p| (p, count as u64))
            })
            .collect()
    }
}

/// Factory function to create the appropriate repository based on pool type.
#[cfg(feature = "database")]
pub fn create_ticket_repository(pool: &DbPool) -> Box<dyn TicketRepository> {
    match pool {
        DbPool::Sqlite(pool) => Box::new(SqliteTicketRepository::new(pool.clone())),
        DbPool::Postgres(pool) => Box::new(PgTicketRepository::new(pool.clone())),
    }
}
