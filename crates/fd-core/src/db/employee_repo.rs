//! Employee repository for database operations.
//!
//! Supports both SQLite and PostgreSQL backends.

use super::pagination::{PaginatedResult, Pagination};
use super::{DbError, DbPool};
use crate::models::{ChatStatus, Employee};
use async_trait::async_trait;
use uuid::Uuid;

#[cfg(feature = "database")]
use chrono::{DateTime, Utc};

/// Filter criteria for listing employees.
#[derive(Debug, Clone, Default)]
pub struct EmployeeFilter {
    /// Free-text search over name and email.
    pub search: Option<String>,
    /// Filter by department.
    pub department: Option<String>,
    /// Filter by active flag.
    pub active: Option<bool>,
}

/// Partial update for an employee.
#[derive(Debug, Clone, Default)]
pub struct EmployeeUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub department: Option<String>,
    pub job_title: Option<String>,
    pub phone: Option<String>,
    pub active: Option<bool>,
}

/// Repository trait for employee persistence.
#[async_trait]
pub trait EmployeeRepository: Send + Sync {
    /// Creates a new employee.
    async fn create(&self, employee: &Employee) -> Result<Employee, DbError>;

    /// Gets an employee by ID.
    async fn get(&self, id: Uuid) -> Result<Option<Employee>, DbError>;

    /// Gets an employee by email.
    async fn get_by_email(&self, email: &str) -> Result<Option<Employee>, DbError>;

    /// Lists employees with filtering and pagination.
    async fn list(
        &self,
        filter: &EmployeeFilter,
        pagination: &Pagination,
    ) -> Result<PaginatedResult<Employee>, DbError>;

    /// Applies a partial update and returns the updated employee.
    async fn update(&self, id: Uuid, update: &EmployeeUpdate) -> Result<Employee, DbError>;

    /// Sets the chat routing status.
    async fn set_chat_status(&self, id: Uuid, status: ChatStatus) -> Result<Employee, DbError>;

    /// Deletes an employee. Fails with a constraint error while custody
    /// records or tickets still reference the employee.
    async fn delete(&self, id: Uuid) -> Result<bool, DbError>;
}

// ============================================================================
// SQLite implementation
// ============================================================================

#[cfg(feature = "database")]
#[derive(sqlx::FromRow)]
struct EmployeeRow {
    id: String,
    name: String,
    email: String,
    department: Option<String>,
    job_title: Option<String>,
    phone: Option<String>,
    chat_status: String,
    active: i32,
    created_at: String,
    updated_at: String,
}

#[cfg(feature = "database")]
impl TryFrom<EmployeeRow> for Employee {
    type Error = DbError;

    fn try_from(row: EmployeeRow) -> Result<Self, Self::Error> {
        Ok(Employee {
            id: Uuid::parse_str(&row.id).map_err(|e| DbError::Serialization(e.to_string()))?,
            name: row.name,
            email: row.email,
            department: row.department,
            job_title: row.job_title,
            phone: row.phone,
            chat_status: ChatStatus::from_db_str(&row.chat_status).ok_or_else(|| {
                DbError::Serialization(format!("Unknown chat status: {}", row.chat_status))
            })?,
            active: row.active != 0,
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

/// SQLite implementation of EmployeeRepository.
#[cfg(feature = "database")]
pub struct SqliteEmployeeRepository {
    pool: sqlx::SqlitePool,
}

#[cfg(feature = "database")]
impl SqliteEmployeeRepository {
    pub fn new(pool: sqlx::SqlitePool) -> Self {
        Self { pool }
    }
}

#[cfg(feature = "database")]
const EMPLOYEE_COLUMNS: &str =
    "id, name, email, department, job_title, phone, chat_status, active, created_at, updated_at";

#[cfg(feature = "database")]
#[async_trait]
impl EmployeeRepository for SqliteEmployeeRepository {
    async fn create(&self, employee: &Employee) -> Result<Employee, DbError> {
        sqlx::query(
            r#"
            INSERT INTO employees (id, name, email, department, job_title, phone, chat_status, active, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(employee.id.to_string())
        .bind(&employee.name)
        .bind(&employee.email)
        .bind(&employee.department)
        .bind(&employee.job_title)
        .bind(&employee.phone)
        .bind(employee.chat_status.as_db_str())
        .bind(employee.active as i32)
        .bind(employee.created_at.to_rfc3339())
        .bind(employee.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(employee.clone())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Employee>, DbError> {
        let row: Option<EmployeeRow> = sqlx::query_as(&format!(
            "SELECT {} FROM employees WHERE id = ?",
            EMPLOYEE_COLUMNS
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<Employee>, DbError> {
        let row: Option<EmployeeRow> = sqlx::query_as(&format!(
            "SELECT {} FROM employees WHERE email = ?",
            EMPLOYEE_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn list(
        &self,
        filter: &EmployeeFilter,
        pagination: &Pagination,
    ) -> Result<PaginatedResult<Employee>, DbError> {
        use super::make_like_pattern;

        let mut query = format!("SELECT {} FROM employees WHERE 1=1", EMPLOYEE_COLUMNS);
        let mut count_query = String::from("SELECT COUNT(*) FROM employees WHERE 1=1");

        let clauses = |q: &mut String| {
            if filter.search.is_some() {
                q.push_str(" AND (name LIKE ? ESCAPE '\\' OR email LIKE ? ESCAPE '\\')");
            }
            if filter.department.is_some() {
                q.push_str(" AND department = ?");
            }
            if filter.active.is_some() {
                q.push_str(" AND active = ?");
            }
        };
        clauses(&mut query);
        clauses(&mut count_query);
        query.push_str(" ORDER BY name ASC LIMIT ? OFFSET ?");

        let pattern = filter.search.as_deref().map(make_like_pattern);

        let mut rows_q = sqlx::query_as::<_, EmployeeRow>(&query);
        let mut count_q = sqlx::query_scalar::<_, i64>(&count_query);

        if let Some(pattern) = &pattern {
            rows_q = rows_q.bind(pattern.clone()).bind(pattern.clone());
            count_q = count_q.bind(pattern.clone()).bind(pattern.clone());
        }
        if let Some(department) = &filter.department {
            rows_q = rows_q.bind(department.clone());
            count_q = count_q.bind(department.clone());
        }
        if let Some(active) = filter.active {
            rows_q = rows_q.bind(active as i32);
            count_q = count_q.bind(active as i32);
        }

        rows_q = rows_q
            .bind(pagination.limit() as i64)
            .bind(pagination.offset() as i64);

        let rows: Vec<EmployeeRow> = rows_q.fetch_all(&self.pool).await?;
        let total: i64 = count_q.fetch_one(&self.pool).await?;

        let items: Result<Vec<Employee>, DbError> =
            rows.into_iter().map(TryInto::try_into).collect();

        Ok(PaginatedResult::new(items?, total as u64, pagination))
    }

    async fn update(&self, id: Uuid, update: &EmployeeUpdate) -> Result<Employee, DbError> {
        let now = Utc::now().to_rfc3339();

        let mut set_clauses = vec!["updated_at = ?".to_string()];
        let mut values: Vec<String> = vec![now];

        if let Some(name) = &update.name {
            set_clauses.push("name = ?".to_string());
            values.push(name.clone());
        }
        if let Some(email) = &update.email {
            set_clauses.push("email = ?".to_string());
            values.push(email.clone());
        }
        if let Some(department) = &update.department {
            set_clauses.push("department = ?".to_string());
            values.push(department.clone());
        }
        if let Some(job_title) = &update.job_title {
            set_clauses.push("job_title = ?".to_string());
            values.push(job_title.clone());
        }
        if let Some(phone) = &update.phone {
            set_clauses.push("phone = ?".to_string());
            values.push(phone.clone());
        }
        if let Some(active) = update.active {
            set_clauses.push("active = ?".to_string());
            values.push((active as i32).to_string());
        }

        let query = format!("UPDATE employees SET {} WHERE id = ?", set_clauses.join(", "));

        let mut query_builder = sqlx::query(&query);
        for value in &values {
            query_builder = query_builder.bind(value);
        }
        query_builder = query_builder.bind(id.to_string());
        query_builder.execute(&self.pool).await?;

        self.get(id)
            .await?
            .ok_or_else(|| DbError::not_found("Employee", id))
    }

    async fn set_chat_status(&self, id: Uuid, status: ChatStatus) -> Result<Employee, DbError> {
        let result = sqlx::query("UPDATE employees SET chat_status = ?, updated_at = ? WHERE id = ?")
            .bind(status.as_db_str())
            .bind(Utc::now().to_rfc3339())
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Employee", id));
        }

        self.get(id)
            .await?
            .ok_or_else(|| DbError::not_found("Employee", id))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM employees WHERE id = ?")
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
struct PgEmployeeRow {
    id: Uuid,
    name: String,
    email: String,
    department: Option<String>,
    job_title: Option<String>,
    phone: Option<String>,
    chat_status: String,
    active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[cfg(feature = "database")]
impl TryFrom<PgEmployeeRow> for Employee {
    type Error = DbError;

    fn try_from(row: PgEmployeeRow) -> Result<Self, Self::Error> {
        Ok(Employee {
            id: row.id,
            name: row.name,
            email: row.email,
            department: row.department,
            job_title: row.job_title,
            phone: row.phone,
            chat_status: ChatStatus::from_db_str(&row.chat_status).ok_or_else(|| {
                DbError::Serialization(format!("Unknown chat status: {}", row.chat_status))
            })?,
            active: row.active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// PostgreSQL implementation of EmployeeRepository.
#[cfg(feature = "database")]
pub struct PgEmployeeRepository {
    pool: sqlx::PgPool,
}

#[cfg(feature = "database")]
impl PgEmployeeRepository {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[cfg(feature = "database")]
#[async_trait]
impl EmployeeRepository for PgEmployeeRepository {
    async fn create(&self, employee: &Employee) -> Result<Employee, DbError> {
        sqlx::query(
            r#"
            INSERT INTO employees (id, name, email, department, job_title, phone, chat_status, active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(employee.id)
        .bind(&employee.name)
        .bind(&employee.email)
        .bind(&employee.department)
        .bind(&employee.job_title)
        .bind(&employee.phone)
        .bind(employee.chat_status.as_db_str())
        .bind(employee.active)
        .bind(employee.created_at)
        .bind(employee.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(employee.clone())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Employee>, DbError> {
        let row: Option<PgEmployeeRow> = sqlx::query_as(&format!(
            "SELECT {} FROM employees WHERE id = $1",
            EMPLOYEE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<Employee>, DbError> {
        let row: Option<PgEmployeeRow> = sqlx::query_as(&format!(
            "SELECT {} FROM employees WHERE email = $1",
            EMPLOYEE_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn list(
        &self,
        filter: &EmployeeFilter,
        pagination: &Pagination,
    ) -> Result<PaginatedResult<Employee>, DbError> {
        use super::make_like_pattern;

        let pattern = filter.search.as_deref().map(make_like_pattern);

        let rows: Vec<PgEmployeeRow> = sqlx::query_as(&format!(
            r#"
            SELECT {}
            FROM employees
            WHERE ($1::text IS NULL OR name ILIKE $1 OR email ILIKE $1)
              AND ($2::text IS NULL OR department = $2)
              AND ($3::boolean IS NULL OR active = $3)
            ORDER BY name ASC
            LIMIT $4 OFFSET $5
            "#,
            EMPLOYEE_COLUMNS
        ))
        .bind(&pattern)
        .bind(&filter.department)
        .bind(filter.active)
        .bind(pagination.limit() as i64)
        .bind(pagination.offset() as i64)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM employees
            WHERE ($1::text IS NULL OR name ILIKE $1 OR email ILIKE $1)
              AND ($2::text IS NULL OR department = $2)
              AND ($3::boolean IS NULL OR active = $3)
            "#,
        )
        .bind(&pattern)
        .bind(&filter.department)
        .bind(filter.active)
        .fetch_one(&self.pool)
        .await?;

        let items: Result<Vec<Employee>, DbError> =
            rows.into_iter().map(TryInto::try_into).collect();

        Ok(PaginatedResult::new(items?, total as u64, pagination))
    }

    async fn update(&self, id: Uuid, update: &EmployeeUpdate) -> Result<Employee, DbError> {
        sqlx::query(
            r#"
            UPDATE employees SET
                name = COALESCE($2, name),
                email = COALESCE($3, email),
                department = COALESCE($4, department),
                job_title = COALESCE($5, job_title),
                phone = COALESCE($6, phone),
                active = COALESCE($7, active),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&update.name)
        .bind(&update.email)
        .bind(&update.department)
        .bind(&update.job_title)
        .bind(&update.phone)
        .bind(update.active)
        .execute(&self.pool)
        .await?;

        self.get(id)
            .await?
            .ok_or_else(|| DbError::not_found("Employee", id))
    }

    async fn set_chat_status(&self, id: Uuid, status: ChatStatus) -> Result<Employee, DbError> {
        let result =
            sqlx::query("UPDATE employees SET chat_status = $2, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .bind(status.as_db_str())
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Employee", id));
        }

        self.get(id)
            .await?
            .ok_or_else(|| DbError::not_found("Employee", id))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM employees WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// Factory function to create the appropriate repository based on pool type.
#[cfg(feature = "database")]
pub fn create_employee_repository(pool: &DbPool) -> Box<dyn EmployeeRepository> {
    match pool {
        DbPool::Sqlite(pool) => Box::new(SqliteEmployeeRepository::new(pool.clone())),
        DbPool::Postgres(pool) => Box::new(PgEmployeeRepository::new(pool.clone())),
    }
}
