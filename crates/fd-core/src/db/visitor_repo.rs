//! Visitor and visit repository for database operations.

use super::pagination::{PaginatedResult, Pagination};
use super::{DbError, DbPool};
use crate::models::{Visit, Visitor};
use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

#[cfg(feature = "database")]
use chrono::{DateTime, Utc};

/// Partial update for a visitor.
#[derive(Debug, Clone, Default)]
pub struct VisitorUpdate {
    pub name: Option<String>,
    pub company: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// Filter criteria for listing visits.
#[derive(Debug, Clone, Default)]
pub struct VisitFilter {
    /// Only visits still open (checked in, not out).
    pub open_only: bool,
    /// Filter by hosting employee.
    pub host_employee_id: Option<Uuid>,
    /// Filter to visits checked in on a calendar day (UTC).
    pub on_day: Option<NaiveDate>,
}

/// Repository trait for visitor and visit persistence.
#[async_trait]
pub trait VisitorRepository: Send + Sync {
    async fn create(&self, visitor: &Visitor) -> Result<Visitor, DbError>;

    async fn get(&self, id: Uuid) -> Result<Option<Visitor>, DbError>;

    /// Lists visitors, optionally filtered by a name/company search.
    async fn list(
        &self,
        search: Option<&str>,
        pagination: &Pagination,
    ) -> Result<PaginatedResult<Visitor>, DbError>;

    async fn update(&self, id: Uuid, update: &VisitorUpdate) -> Result<Visitor, DbError>;

    async fn delete(&self, id: Uuid) -> Result<bool, DbError>;

    /// Records a check-in.
    async fn create_visit(&self, visit: &Visit) -> Result<Visit, DbError>;

    async fn get_visit(&self, id: Uuid) -> Result<Option<Visit>, DbError>;

    /// The visitor's open visit, if any.
    async fn open_visit_for(&self, visitor_id: Uuid) -> Result<Option<Visit>, DbError>;

    /// Closes a visit, stamping the check-out time.
    async fn check_out(&self, visit_id: Uuid) -> Result<Visit, DbError>;

    /// Lists visits with filtering and pagination, newest first.
    async fn list_visits(
        &self,
        filter: &VisitFilter,
        pagination: &Pagination,
    ) -> Result<PaginatedResult<Visit>, DbError>;

    /// Number of visitors currently on site.
    async fn count_open_visits(&self) -> Result<u64, DbError>;
}

#[cfg(feature = "database")]
const VISITOR_COLUMNS: &str = "id, name, company, email, phone, created_at, updated_at";

#[cfg(feature = "database")]
const VISIT_COLUMNS: &str =
    "id, visitor_id, host_employee_id, purpose, badge_number, checked_in_at, checked_out_at";

// ============================================================================
// SQLite implementation
// ============================================================================

#[cfg(feature = "database")]
#[derive(sqlx::FromRow)]
struct VisitorRow {
    id: String,
    name: String,
    company: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    created_at: String,
    updated_at: String,
}

#[cfg(feature = "database")]
impl TryFrom<VisitorRow> for Visitor {
    type Error = DbError;

    fn try_from(row: VisitorRow) -> Result<Self, Self::Error> {
        Ok(Visitor {
            id: parse_uuid(&row.id)?,
            name: row.name,
            company: row.company,
            email: row.email,
            phone: row.phone,
            created_at: parse_ts(&row.created_at)?,
            updated_at: parse_ts(&row.updated_at)?,
        })
    }
}

#[cfg(feature = "database")]
#[derive(sqlx::FromRow)]
struct VisitRow {
    id: String,
    visitor_id: String,
    host_employee_id: String,
    purpose: Option<String>,
    badge_number: Option<String>,
    checked_in_at: String,
    checked_out_at: Option<String>,
}

#[cfg(feature = "database")]
impl TryFrom<VisitRow> for Visit {
    type Error = DbError;

    fn try_from(row: VisitRow) -> Result<Self, Self::Error> {
        Ok(Visit {
            id: parse_uuid(&row.id)?,
            visitor_id: parse_uuid(&row.visitor_id)?,
            host_employee_id: parse_uuid(&row.host_employee_id)?,
            purpose: row.purpose,
            badge_number: row.badge_number,
            checked_in_at: parse_ts(&row.checked_in_at)?,
            checked_out_at: row
                .checked_out_at
                .as_deref()
                .map(parse_ts)
                .transpose()?,
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

/// SQLite implementation of VisitorRepository.
#[cfg(feature = "database")]
pub struct SqliteVisitorRepository {
    pool: sqlx::SqlitePool,
}

#[cfg(feature = "database")]
impl SqliteVisitorRepository {
    pub fn new(pool: sqlx::SqlitePool) -> Self {
        Self { pool }
    }
}

#[cfg(feature = "database")]
#[async_trait]
impl VisitorRepository for SqliteVisitorRepository {
    async fn create(&self, visitor: &Visitor) -> Result<Visitor, DbError> {
        sqlx::query(
            r#"
            INSERT INTO visitors (id, name, company, email, phone, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(visitor.id.to_string())
        .bind(&visitor.name)
        .bind(&visitor.company)
        .bind(&visitor.email)
        .bind(&visitor.phone)
        .bind(visitor.created_at.to_rfc3339())
        .bind(visitor.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(visitor.clone())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Visitor>, DbError> {
        let row: Option<VisitorRow> = sqlx::query_as(&format!(
            "SELECT {} FROM visitors WHERE id = ?",
            VISITOR_COLUMNS
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn list(
        &self,
        search: Option<&str>,
        pagination: &Pagination,
    ) -> Result<PaginatedResult<Visitor>, DbError> {
        use super::make_like_pattern;

        let mut query = format!("SELECT {} FROM visitors WHERE 1=1", VISITOR_COLUMNS);
        let mut count_query = String::from("SELECT COUNT(*) FROM visitors WHERE 1=1");

        if search.is_some() {
            for q in [&mut query, &mut count_query] {
                q.push_str(" AND (name LIKE ? ESCAPE '\\' OR company LIKE ? ESCAPE '\\')");
            }
        }
        query.push_str(" ORDER BY name ASC LIMIT ? OFFSET ?");

        let pattern = search.map(make_like_pattern);

        let mut rows_q = sqlx::query_as::<_, VisitorRow>(&query);
        let mut count_q = sqlx::query_scalar::<_, i64>(&count_query);

        if let Some(pattern) = &pattern {
            rows_q = rows_q.bind(pattern.clone()).bind(pattern.clone());
            count_q = count_q.bind(pattern.clone()).bind(pattern.clone());
        }

        rows_q = rows_q
            .bind(pagination.limit() as i64)
            .bind(pagination.offset() as i64);

        let rows: Vec<VisitorRow> = rows_q.fetch_all(&self.pool).await?;
        let total: i64 = count_q.fetch_one(&self.pool).await?;

        let items: Result<Vec<Visitor>, DbError> =
            rows.into_iter().map(TryInto::try_into).collect();

        Ok(PaginatedResult::new(items?, total as u64, pagination))
    }

    async fn update(&self, id: Uuid, update: &VisitorUpdate) -> Result<Visitor, DbError> {
        let now = Utc::now().to_rfc3339();

        let mut set_clauses = vec!["updated_at = ?".to_string()];
        let mut values: Vec<String> = vec![now];

        if let Some(name) = &update.name {
            set_clauses.push("name = ?".to_string());
            values.push(name.clone());
        }
        if let Some(company) = &update.company {
            set_clauses.push("company = ?".to_string());
            values.push(company.clone());
        }
        if let Some(email) = &update.email {
            set_clauses.push("email = ?".to_string());
            values.push(email.clone());
        }
        if let Some(phone) = &update.phone {
            set_clauses.push("phone = ?".to_string());
            values.push(phone.clone());
        }

        let query = format!("UPDATE visitors SET {} WHERE id = ?", set_clauses.join(", "));

        let mut query_builder = sqlx::query(&query);
        for value in &values {
            query_builder = query_builder.bind(value);
        }
        query_builder = query_builder.bind(id.to_string());
        query_builder.execute(&self.pool).await?;

        self.get(id)
            .await?
            .ok_or_else(|| DbError::not_found("Visitor", id))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM visitors WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn create_visit(&self, visit: &Visit) -> Result<Visit, DbError> {
        sqlx::query(
            r#"
            INSERT INTO visits (id, visitor_id, host_employee_id, purpose, badge_number, checked_in_at, checked_out_at)
            VALUES (?, ?, ?, ?, ?, ?, NULL)
            "#,
        )
        .bind(visit.id.to_string())
        .bind(visit.visitor_id.to_string())
        .bind(visit.host_employee_id.to_string())
        .bind(&visit.purpose)
        .bind(&visit.badge_number)
        .bind(visit.checked_in_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(visit.clone())
    }

    async fn get_visit(&self, id: Uuid) -> Result<Option<Visit>, DbError> {
        let row: Option<VisitRow> =
            sqlx::query_as(&format!("SELECT {} FROM visits WHERE id = ?", VISIT_COLUMNS))
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn open_visit_for(&self, visitor_id: Uuid) -> Result<Option<Visit>, DbError> {
        let row: Option<VisitRow> = sqlx::query_as(&format!(
            "SELECT {} FROM visits WHERE visitor_id = ? AND checked_out_at IS NULL ORDER BY checked_in_at DESC LIMIT 1",
            VISIT_COLUMNS
        ))
        .bind(visitor_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn check_out(&self, visit_id: Uuid) -> Result<Visit, DbError> {
        let result = sqlx::query(
            "UPDATE visits SET checked_out_at = ? WHERE id = ? AND checked_out_at IS NULL",
        )
        .bind(Utc::now().to_rfc3339())
        .bind(visit_id.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Visit", visit_id));
        }

        self.get_visit(visit_id)
            .await?
            .ok_or_else(|| DbError::not_found("Visit", visit_id))
    }

    async fn list_visits(
        &self,
        filter: &VisitFilter,
        pagination: &Pagination,
    ) -> Result<PaginatedResult<Visit>, DbError> {
        let mut query = format!("SELECT {} FROM visits WHERE 1=1", VISIT_COLUMNS);
        let mut count_query = String::from("SELECT COUNT(*) FROM visits WHERE 1=1");

        let clauses = |q: &mut String| {
            if filter.open_only {
                q.push_str(" AND checked_out_at IS NULL");
            }
            if filter.host_employee_id.is_some() {
                q.push_str(" AND host_employee_id = ?");
            }
            if filter.on_day.is_some() {
                // RFC3339 timestamps sort lexicographically within UTC.
                q.push_str(" AND checked_in_at >= ? AND checked_in_at < ?");
            }
        };
        clauses(&mut query);
        clauses(&mut count_query);
        query.push_str(" ORDER BY checked_in_at DESC LIMIT ? OFFSET ?");

        let day_bounds = filter.on_day.map(day_bounds_utc);

        let mut rows_q = sqlx::query_as::<_, VisitRow>(&query);
        let mut count_q = sqlx::query_scalar::<_, i64>(&count_query);

        if let Some(host_id) = filter.host_employee_id {
            rows_q = rows_q.bind(host_id.to_string());
            count_q = count_q.bind(host_id.to_string());
        }
        if let Some((start, end)) = &day_bounds {
            rows_q = rows_q.bind(start.clone()).bind(end.clone());
            count_q = count_q.bind(start.clone()).bind(end.clone());
        }

        rows_q = rows_q
            .bind(pagination.limit() as i64)
            .bind(pagination.offset() as i64);

        let rows: Vec<VisitRow> = rows_q.fetch_all(&self.pool).await?;
        let total: i64 = count_q.fetch_one(&self.pool).await?;

        let items: Result<Vec<Visit>, DbError> = rows.into_iter().map(TryInto::try_into).collect();

        Ok(PaginatedResult::new(items?, total as u64, pagination))
    }

    async fn count_open_visits(&self) -> Result<u64, DbError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM visits WHERE checked_out_at IS NULL")
                .fetch_one(&self.pool)
                .await?;

        Ok(count as u64)
    }
}

/// RFC3339 bounds `[start, end)` of a UTC calendar day.
#[cfg(feature = "database")]
fn day_bounds_utc(day: NaiveDate) -> (String, String) {
    let start = day.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc();
    let end = start + chrono::Duration::days(1);
    (start.to_rfc3339(), end.to_rfc3339())
}

// ============================================================================
// PostgreSQL implementation
// ============================================================================

#[cfg(feature = "database")]
#[derive(sqlx::FromRow)]
struct PgVisitorRow {
    id: Uuid,
    name: String,
    company: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[cfg(feature = "database")]
impl From<PgVisitorRow> for Visitor {
    fn from(row: PgVisitorRow) -> Self {
        Visitor {
            id: row.id,
            name: row.name,
            company: row.company,
            email: row.email,
            phone: row.phone,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[cfg(feature = "database")]
#[derive(sqlx::FromRow)]
struct PgVisitRow {
    id: Uuid,
    visitor_id: Uuid,
    host_employee_id: Uuid,
    purpose: Option<String>,
    badge_number: Option<String>,
    checked_in_at: DateTime<Utc>,
    checked_out_at: Option<DateTime<Utc>>,
}

#[cfg(feature = "database")]
impl From<PgVisitRow> for Visit {
    fn from(row: PgVisitRow) -> Self {
        Visit {
            id: row.id,
            visitor_id: row.visitor_id,
            host_employee_id: row.host_employee_id,
            purpose: row.purpose,
            badge_number: row.badge_number,
            checked_in_at: row.checked_in_at,
            checked_out_at: row.checked_out_at,
        }
    }
}

/// PostgreSQL implementation of VisitorRepository.
#[cfg(feature = "database")]
pub struct PgVisitorRepository {
    pool: sqlx::PgPool,
}

#[cfg(feature = "database")]
impl PgVisitorRepository {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[cfg(feature = "database")]
#[async_trait]
impl VisitorRepository for PgVisitorRepository {
    async fn create(&self, visitor: &Visitor) -> Result<Visitor, DbError> {
        sqlx::query(
            r#"
            INSERT INTO visitors (id, name, company, email, phone, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(visitor.id)
        .bind(&visitor.name)
        .bind(&visitor.company)
        .bind(&visitor.email)
        .bind(&visitor.phone)
        .bind(visitor.created_at)
        .bind(visitor.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(visitor.clone())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Visitor>, DbError> {
        let row: Option<PgVisitorRow> = sqlx::query_as(&format!(
            "SELECT {} FROM visitors WHERE id = $1",
            VISITOR_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn list(
        &self,
        search: Option<&str>,
        pagination: &Pagination,
    ) -> Result<PaginatedResult<Visitor>, DbError> {
        use super::make_like_pattern;

        let pattern = search.map(make_like_pattern);

        let rows: Vec<PgVisitorRow> = sqlx::query_as(&format!(
            r#"
            SELECT {}
            FROM visitors
            WHERE ($1::text IS NULL OR name ILIKE $1 OR company ILIKE $1)
            ORDER BY name ASC
            LIMIT $2 OFFSET $3
            "#,
            VISITOR_COLUMNS
        ))
        .bind(&pattern)
        .bind(pagination.limit() as i64)
        .bind(pagination.offset() as i64)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM visitors WHERE ($1::text IS NULL OR name ILIKE $1 OR company ILIKE $1)",
        )
        .bind(&pattern)
        .fetch_one(&self.pool)
        .await?;

        let items: Vec<Visitor> = rows.into_iter().map(Into::into).collect();

        Ok(PaginatedResult::new(items, total as u64, pagination))
    }

    async fn update(&self, id: Uuid, update: &VisitorUpdate) -> Result<Visitor, DbError> {
        sqlx::query(
            r#"
            UPDATE visitors SET
                name = COALESCE($2, name),
                company = COALESCE($3, company),
                email = COALESCE($4, email),
                phone = COALESCE($5, phone),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&update.name)
        .bind(&update.company)
        .bind(&update.email)
        .bind(&update.phone)
        .execute(&self.pool)
        .await?;

        self.get(id)
            .await?
            .ok_or_else(|| DbError::not_found("Visitor", id))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM visitors WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn create_visit(&self, visit: &Visit) -> Result<Visit, DbError> {
        sqlx::query(
            r#"
            INSERT INTO visits (id, visitor_id, host_employee_id, purpose, badge_number, checked_in_at, checked_out_at)
            VALUES ($1, $2, $3, $4, $5, $6, NULL)
            "#,
        )
        .bind(visit.id)
        .bind(visit.visitor_id)
        .bind(visit.host_employee_id)
        .bind(&visit.purpose)
        .bind(&visit.badge_number)
        .bind(visit.checked_in_at)
        .execute(&self.pool)
        .await?;

        Ok(visit.clone())
    }

    async fn get_visit(&self, id: Uuid) -> Result<Option<Visit>, DbError> {
        let row: Option<PgVisitRow> =
            sqlx::query_as(&format!("SELECT {} FROM visits WHERE id = $1", VISIT_COLUMNS))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(Into::into))
    }

    async fn open_visit_for(&self, visitor_id: Uuid) -> Result<Option<Visit>, DbError> {
        let row: Option<PgVisitRow> = sqlx::query_as(&format!(
            "SELECT {} FROM visits WHERE visitor_id = $1 AND checked_out_at IS NULL ORDER BY checked_in_at DESC LIMIT 1",
            VISIT_COLUMNS
        ))
        .bind(visitor_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn check_out(&self, visit_id: Uuid) -> Result<Visit, DbError> {
        let result = sqlx::query(
            "UPDATE visits SET checked_out_at = NOW() WHERE id = $1 AND checked_out_at IS NULL",
        )
        .bind(visit_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Visit", visit_id));
        }

        self.get_visit(visit_id)
            .await?
            .ok_or_else(|| DbError::not_found("Visit", visit_id))
    }

    async fn list_visits(
        &self,
        filter: &VisitFilter,
        pagination: &Pagination,
    ) -> Result<PaginatedResult<Visit>, DbError> {
        let day_start = filter
            .on_day
            .map(|d| d.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc());
        let day_end = day_start.map(|s| s + chrono::Duration::days(1));

        let rows: Vec<PgVisitRow> = sqlx::query_as(&format!(
            r#"
            SELECT {}
            FROM visits
            WHERE ($1::boolean IS FALSE OR checked_out_at IS NULL)
              AND ($2::uuid IS NULL OR host_employee_id = $2)
              AND ($3::timestamptz IS NULL OR (checked_in_at >= $3 AND checked_in_at < $4))
            ORDER BY checked_in_at DESC
            LIMIT $5 OFFSET $6
            "#,
            VISIT_COLUMNS
        ))
        .bind(filter.open_only)
        .bind(filter.host_employee_id)
        .bind(day_start)
        .bind(day_end)
        .bind(pagination.limit() as i64)
        .bind(pagination.offset() as i64)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM visits
            WHERE ($1::boolean IS FALSE OR checked_out_at IS NULL)
              AND ($2::uuid IS NULL OR host_employee_id = $2)
              AND ($3::timestamptz IS NULL OR (checked_in_at >= $3 AND checked_in_at < $4))
            "#,
        )
        .bind(filter.open_only)
        .bind(filter.host_employee_id)
        .bind(day_start)
        .bind(day_end)
        .fetch_one(&self.pool)
        .await?;

        let items: Vec<Visit> = rows.into_iter().map(Into::into).collect();

        Ok(PaginatedResult::new(items, total as u64, pagination))
    }

    async fn count_open_visits(&self) -> Result<u64, DbError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM visits WHERE checked_out_at IS NULL")
                .fetch_one(&self.pool)
                .await?;

        Ok(count as u64)
    }
}

/// Factory function to create the appropriate repository based on pool type.
#[cfg(feature = "database")]
pub fn create_visitor_repository(pool: &DbPool) -> Box<dyn VisitorRepository> {
    match pool {
        DbPool::Sqlite(pool) => Box::new(SqliteVisitorRepository::new(pool.clone())),
        DbPool::Postgres(pool) => Box::new(PgVisitorRepository::new(pool.clone())),
    }
}
