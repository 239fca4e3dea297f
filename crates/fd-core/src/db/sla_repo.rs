//! SLA policy repository for database operations.

use super::{DbError, DbPool};
use crate::models::{SlaPolicy, TicketPriority};
use async_trait::async_trait;
use uuid::Uuid;

#[cfg(feature = "database")]
use chrono::{DateTime, Utc};

/// Partial update for an SLA policy.
#[derive(Debug, Clone, Default)]
pub struct SlaPolicyUpdate {
    pub name: Option<String>,
    pub response_target_minutes: Option<i64>,
    pub resolution_target_minutes: Option<i64>,
}

/// Repository trait for SLA policy persistence.
///
/// Policies are a small configuration table; listing is unpaginated.
#[async_trait]
pub trait SlaPolicyRepository: Send + Sync {
    async fn create(&self, policy: &SlaPolicy) -> Result<SlaPolicy, DbError>;

    async fn get(&self, id: Uuid) -> Result<Option<SlaPolicy>, DbError>;

    /// The policy for a given priority, if one is configured.
    async fn get_by_priority(&self, priority: TicketPriority)
        -> Result<Option<SlaPolicy>, DbError>;

    /// All policies, ordered by priority.
    async fn list(&self) -> Result<Vec<SlaPolicy>, DbError>;

    async fn update(&self, id: Uuid, update: &SlaPolicyUpdate) -> Result<SlaPolicy, DbError>;

    async fn delete(&self, id: Uuid) -> Result<bool, DbError>;
}

#[cfg(feature = "database")]
const POLICY_COLUMNS: &str =
    "id, name, priority, response_target_minutes, resolution_target_minutes, created_at, updated_at";

// ============================================================================
// SQLite implementation
// ============================================================================

#[cfg(feature = "database")]
#[derive(sqlx::FromRow)]
struct PolicyRow {
    id: String,
    name: String,
    priority: String,
    response_target_minutes: i64,
    resolution_target_minutes: i64,
    created_at: String,
    updated_at: String,
}

#[cfg(feature = "database")]
impl TryFrom<PolicyRow> for SlaPolicy {
    type Error = DbError;

    fn try_from(row: PolicyRow) -> Result<Self, Self::Error> {
        Ok(SlaPolicy {
            id: Uuid::parse_str(&row.id).map_err(|e| DbError::Serialization(e.to_string()))?,
            name: row.name,
            priority: TicketPriority::from_db_str(&row.priority).ok_or_else(|| {
                DbError::Serialization(format!("Unknown priority: {}", row.priority))
            })?,
            response_target_minutes: row.response_target_minutes,
            resolution_target_minutes: row.resolution_target_minutes,
            created_at: parse_ts(&row.created_at)?,
            updated_at: parse_ts(&row.updated_at)?,
        })
    }
}

#[cfg(feature = "database")]
fn parse_ts(s: &str) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DbError::Serialization(e.to_string()))
}

/// SQLite implementation of SlaPolicyRepository.
#[cfg(feature = "database")]
pub struct SqliteSlaPolicyRepository {
    pool: sqlx::SqlitePool,
}

#[cfg(feature = "database")]
impl SqliteSlaPolicyRepository {
    pub fn new(pool: sqlx::SqlitePool) -> Self {
        Self { pool }
    }
}

#[cfg(feature = "database")]
#[async_trait]
impl SlaPolicyRepository for SqliteSlaPolicyRepository {
    async fn create(&self, policy: &SlaPolicy) -> Result<SlaPolicy, DbError> {
        sqlx::query(
            r#"
            INSERT INTO sla_policies (id, name, priority, response_target_minutes, resolution_target_minutes, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(policy.id.to_string())
        .bind(&policy.name)
        .bind(policy.priority.as_db_str())
        .bind(policy.response_target_minutes)
        .bind(policy.resolution_target_minutes)
        .bind(policy.created_at.to_rfc3339())
        .bind(policy.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(policy.clone())
    }

    async fn get(&self, id: Uuid) -> Result<Option<SlaPolicy>, DbError> {
        let row: Option<PolicyRow> = sqlx::query_as(&format!(
            "SELECT {} FROM sla_policies WHERE id = ?",
            POLICY_COLUMNS
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn get_by_priority(
        &self,
        priority: TicketPriority,
    ) -> Result<Option<SlaPolicy>, DbError> {
        let row: Option<PolicyRow> = sqlx::query_as(&format!(
            "SELECT {} FROM sla_policies WHERE priority = ?",
            POLICY_COLUMNS
        ))
        .bind(priority.as_db_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn list(&self) -> Result<Vec<SlaPolicy>, DbError> {
        let rows: Vec<PolicyRow> = sqlx::query_as(&format!(
            r#"
            SELECT {} FROM sla_policies
            ORDER BY CASE priority
                WHEN 'critical' THEN 0
                WHEN 'high' THEN 1
                WHEN 'medium' THEN 2
                ELSE 3
            END
            "#,
            POLICY_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn update(&self, id: Uuid, update: &SlaPolicyUpdate) -> Result<SlaPolicy, DbError> {
        let now = Utc::now().to_rfc3339();

        let mut set_clauses = vec!["updated_at = ?".to_string()];
        let mut values: Vec<String> = vec![now];

        if let Some(name) = &update.name {
            set_clauses.push("name = ?".to_string());
            values.push(name.clone());
        }
        if let Some(response) = update.response_target_minutes {
            set_clauses.push("response_target_minutes = ?".to_string());
            values.push(response.to_string());
        }
        if let Some(resolution) = update.resolution_target_minutes {
            set_clauses.push("resolution_target_minutes = ?".to_string());
            values.push(resolution.to_string());
        }

        let query = format!(
            "UPDATE sla_policies SET {} WHERE id = ?",
            set_clauses.join(", ")
        );

        let mut query_builder = sqlx::query(&query);
        for value in &values {
            query_builder = query_builder.bind(value);
        }
        query_builder = query_builder.bind(id.to_string());
        query_builder.execute(&self.pool).await?;

        self.get(id)
            .await?
            .ok_or_else(|| DbError::not_found("SlaPolicy", id))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM sla_policies WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

// ============================================================================
// PostgreSQL implementation
// ============================================================================

#[cfg(feature = "database")]
#[derive(sqlx::FromRow)]
struct PgPolicyRow {
    id: Uuid,
    name: String,
    priority: String,
    response_target_minutes: i64,
    resolution_target_minutes: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[cfg(feature = "database")]
impl TryFrom<PgPolicyRow> for SlaPolicy {
    type Error = DbError;

    fn try_from(row: PgPolicyRow) -> Result<Self, Self::Error> {
        Ok(SlaPolicy {
            id: row.id,
            name: row.name,
            priority: TicketPriority::from_db_str(&row.priority).ok_or_else(|| {
                DbError::Serialization(format!("Unknown priority: {}", row.priority))
            })?,
            response_target_minutes: row.response_target_minutes,
            resolution_target_minutes: row.resolution_target_minutes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// PostgreSQL implementation of SlaPolicyRepository.
#[cfg(feature = "database")]
pub struct PgSlaPolicyRepository {
    pool: sqlx::PgPool,
}

#[cfg(feature = "database")]
impl PgSlaPolicyRepository {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[cfg(feature = "database")]
#[async_trait]
impl SlaPolicyRepository for PgSlaPolicyRepository {
    async fn create(&self, policy: &SlaPolicy) -> Result<SlaPolicy, DbError> {
        sqlx::query(
            r#"
            INSERT INTO sla_policies (id, name, priority, response_target_minutes, resolution_target_minutes, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(policy.id)
        .bind(&policy.name)
        .bind(policy.priority.as_db_str())
        .bind(policy.response_target_minutes)
        .bind(policy.resolution_target_minutes)
        .bind(policy.created_at)
        .bind(policy.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(policy.clone())
    }

    async fn get(&self, id: Uuid) -> Result<Option<SlaPolicy>, DbError> {
        let row: Option<PgPolicyRow> = sqlx::query_as(&format!(
            "SELECT {} FROM sla_policies WHERE id = $1",
            POLICY_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn get_by_priority(
        &self,
        priority: TicketPriority,
    ) -> Result<Option<SlaPolicy>, DbError> {
        let row: Option<PgPolicyRow> = sqlx::query_as(&format!(
            "SELECT {} FROM sla_policies WHERE priority = $1",
            POLICY_COLUMNS
        ))
        .bind(priority.as_db_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn list(&self) -> Result<Vec<SlaPolicy>, DbError> {
        let rows: Vec<PgPolicyRow> = sqlx::query_as(&format!(
            r#"
            SELECT {} FROM sla_policies
            ORDER BY CASE priority
                WHEN 'critical' THEN 0
                WHEN 'high' THEN 1
                WHEN 'medium' THEN 2
                ELSE 3
            END
            "#,
            POLICY_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn update(&self, id: Uuid, update: &SlaPolicyUpdate) -> Result<SlaPolicy, DbError> {
        sqlx::query(
            r#"
            UPDATE sla_policies SET
                name = COALESCE($2, name),
                response_target_minutes = COALESCE($3, response_target_minutes),
                resolution_target_minutes = COALESCE($4, resolution_target_minutes),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&update.name)
        .bind(update.response_target_minutes)
        .bind(update.resolution_target_minutes)
        .execute(&self.pool)
        .await?;

        self.get(id)
            .await?
            .ok_or_else(|| DbError::not_found("SlaPolicy", id))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM sla_policies WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// Factory function to create the appropriate repository based on pool type.
#[cfg(feature = "database")]
pub fn create_sla_policy_repository(pool: &DbPool) -> Box<dyn SlaPolicyRepository> {
    match pool {
        DbPool::Sqlite(pool) => Box::new(SqliteSlaPolicyRepository::new(pool.clone())),
        DbPool::Postgres(pool) => Box::new(PgSlaPolicyRepository::new(pool.clone())),
    }
}
