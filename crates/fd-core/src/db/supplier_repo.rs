//! Supplier repository for database operations.

use super::pagination::{PaginatedResult, Pagination};
use super::{DbError, DbPool};
use crate::models::Supplier;
use async_trait::async_trait;
use uuid::Uuid;

#[cfg(feature = "database")]
use chrono::{DateTime, Utc};

/// Partial update for a supplier.
#[derive(Debug, Clone, Default)]
pub struct SupplierUpdate {
    pub name: Option<String>,
    pub contact_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub active: Option<bool>,
}

/// Repository trait for supplier persistence.
#[async_trait]
pub trait SupplierRepository: Send + Sync {
    async fn create(&self, supplier: &Supplier) -> Result<Supplier, DbError>;

    async fn get(&self, id: Uuid) -> Result<Option<Supplier>, DbError>;

    /// Lists suppliers, optionally restricted to active ones.
    async fn list(
        &self,
        active_only: bool,
        pagination: &Pagination,
    ) -> Result<PaginatedResult<Supplier>, DbError>;

    async fn update(&self, id: Uuid, update: &SupplierUpdate) -> Result<Supplier, DbError>;

    /// Deletes a supplier. Fails with a constraint error while purchase
    /// orders reference it.
    async fn delete(&self, id: Uuid) -> Result<bool, DbError>;
}

#[cfg(feature = "database")]
const SUPPLIER_COLUMNS: &str =
    "id, name, contact_name, email, phone, address, active, created_at, updated_at";

// ============================================================================
// SQLite implementation
// ============================================================================

#[cfg(feature = "database")]
#[derive(sqlx::FromRow)]
struct SupplierRow {
    id: String,
    name: String,
    contact_name: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    address: Option<String>,
    active: i32,
    created_at: String,
    updated_at: String,
}

#[cfg(feature = "database")]
impl TryFrom<SupplierRow> for Supplier {
    type Error = DbError;

    fn try_from(row: SupplierRow) -> Result<Self, Self::Error> {
        Ok(Supplier {
            id: Uuid::parse_str(&row.id).map_err(|e| DbError::Serialization(e.to_string()))?,
            name: row.name,
            contact_name: row.contact_name,
            email: row.email,
            phone: row.phone,
            address: row.address,
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

/// SQLite implementation of SupplierRepository.
#[cfg(feature = "database")]
pub struct SqliteSupplierRepository {
    pool: sqlx::SqlitePool,
}

#[cfg(feature = "database")]
impl SqliteSupplierRepository {
    pub fn new(pool: sqlx::SqlitePool) -> Self {
        Self { pool }
    }
}

#[cfg(feature = "database")]
#[async_trait]
impl SupplierRepository for SqliteSupplierRepository {
    async fn create(&self, supplier: &Supplier) -> Result<Supplier, DbError> {
        sqlx::query(
            r#"
            INSERT INTO suppliers (id, name, contact_name, email, phone, address, active, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(supplier.id.to_string())
        .bind(&supplier.name)
        .bind(&supplier.contact_name)
        .bind(&supplier.email)
        .bind(&supplier.phone)
        .bind(&supplier.address)
        .bind(supplier.active as i32)
        .bind(supplier.created_at.to_rfc3339())
        .bind(supplier.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(supplier.clone())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Supplier>, DbError> {
        let row: Option<SupplierRow> = sqlx::query_as(&format!(
            "SELECT {} FROM suppliers WHERE id = ?",
            SUPPLIER_COLUMNS
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn list(
        &self,
        active_only: bool,
        pagination: &Pagination,
    ) -> Result<PaginatedResult<Supplier>, DbError> {
        let filter_clause = if active_only { " WHERE active = 1" } else { "" };

        let rows: Vec<SupplierRow> = sqlx::query_as(&format!(
            "SELECT {} FROM suppliers{} ORDER BY name ASC LIMIT ? OFFSET ?",
            SUPPLIER_COLUMNS, filter_clause
        ))
        .bind(pagination.limit() as i64)
        .bind(pagination.offset() as i64)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 =
            sqlx::query_scalar(&format!("SELECT COUNT(*) FROM suppliers{}", filter_clause))
                .fetch_one(&self.pool)
                .await?;

        let items: Result<Vec<Supplier>, DbError> =
            rows.into_iter().map(TryInto::try_into).collect();

        Ok(PaginatedResult::new(items?, total as u64, pagination))
    }

    async fn update(&self, id: Uuid, update: &SupplierUpdate) -> Result<Supplier, DbError> {
        let now = Utc::now().to_rfc3339();

        let mut set_clauses = vec!["updated_at = ?".to_string()];
        let mut values: Vec<String> = vec![now];

        if let Some(name) = &update.name {
            set_clauses.push("name = ?".to_string());
            values.push(name.clone());
        }
        if let Some(contact_name) = &update.contact_name {
            set_clauses.push("contact_name = ?".to_string());
            values.push(contact_name.clone());
        }
        if let Some(email) = &update.email {
            set_clauses.push("email = ?".to_string());
            values.push(email.clone());
        }
        if let Some(phone) = &update.phone {
            set_clauses.push("phone = ?".to_string());
            values.push(phone.clone());
        }
        if let Some(address) = &update.address {
            set_clauses.push("address = ?".to_string());
            values.push(address.clone());
        }
        if let Some(active) = update.active {
            set_clauses.push("active = ?".to_string());
            values.push((active as i32).to_string());
        }

        let query = format!("UPDATE suppliers SET {} WHERE id = ?", set_clauses.join(", "));

        let mut query_builder = sqlx::query(&query);
        for value in &values {
            query_builder = query_builder.bind(value);
        }
        query_builder = query_builder.bind(id.to_string());
        query_builder.execute(&self.pool).await?;

        self.get(id)
            .await?
            .ok_or_else(|| DbError::not_found("Supplier", id))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM suppliers WHERE id = ?")
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
struct PgSupplierRow {
    id: Uuid,
    name: String,
    contact_name: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    address: Option<String>,
    active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[cfg(feature = "database")]
impl From<PgSupplierRow> for Supplier {
    fn from(row: PgSupplierRow) -> Self {
        Supplier {
            id: row.id,
            name: row.name,
            contact_name: row.contact_name,
            email: row.email,
            phone: row.phone,
            address: row.address,
            active: row.active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// PostgreSQL implementation of SupplierRepository.
#[cfg(feature = "database")]
pub struct PgSupplierRepository {
    pool: sqlx::PgPool,
}

#[cfg(feature = "database")]
impl PgSupplierRepository {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[cfg(feature = "database")]
#[async_trait]
impl SupplierRepository for PgSupplierRepository {
    async fn create(&self, supplier: &Supplier) -> Result<Supplier, DbError> {
        sqlx::query(
            r#"
            INSERT INTO suppliers (id, name, contact_name, email, phone, address, active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(supplier.id)
        .bind(&supplier.name)
        .bind(&supplier.contact_name)
        .bind(&supplier.email)
        .bind(&supplier.phone)
        .bind(&supplier.address)
        .bind(supplier.active)
        .bind(supplier.created_at)
        .bind(supplier.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(supplier.clone())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Supplier>, DbError> {
        let row: Option<PgSupplierRow> = sqlx::query_as(&format!(
            "SELECT {} FROM suppliers WHERE id = $1",
            SUPPLIER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn list(
        &self,
        active_only: bool,
        pagination: &Pagination,
    ) -> Result<PaginatedResult<Supplier>, DbError> {
        let filter_clause = if active_only { " WHERE active = TRUE" } else { "" };

        let rows: Vec<PgSupplierRow> = sqlx::query_as(&format!(
            "SELECT {} FROM suppliers{} ORDER BY name ASC LIMIT $1 OFFSET $2",
            SUPPLIER_COLUMNS, filter_clause
        ))
        .bind(pagination.limit() as i64)
        .bind(pagination.offset() as i64)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 =
            sqlx::query_scalar(&format!("SELECT COUNT(*) FROM suppliers{}", filter_clause))
                .fetch_one(&self.pool)
                .await?;

        let items: Vec<Supplier> = rows.into_iter().map(Into::into).collect();

        Ok(PaginatedResult::new(items, total as u64, pagination))
    }

    async fn update(&self, id: Uuid, update: &SupplierUpdate) -> Result<Supplier, DbError> {
        sqlx::query(
            r#"
            UPDATE suppliers SET
                name = COALESCE($2, name),
                contact_name = COALESCE($3, contact_name),
                email = COALESCE($4, email),
                phone = COALESCE($5, phone),
                address = COALESCE($6, address),
                active = COALESCE($7, active),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&update.name)
        .bind(&update.contact_name)
        .bind(&update.email)
        .bind(&update.phone)
        .bind(&update.address)
        .bind(update.active)
        .execute(&self.pool)
        .await?;

        self.get(id)
            .await?
            .ok_or_else(|| DbError::not_found("Supplier", id))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM suppliers WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// Factory function to create the appropriate repository based on pool type.
#[cfg(feature = "database")]
pub fn create_supplier_repository(pool: &DbPool) -> Box<dyn SupplierRepository> {
    match pool {
        DbPool::Sqlite(pool) => Box::new(SqliteSupplierRepository::new(pool.clone())),
        DbPool::Postgres(pool) => Box::new(PgSupplierRepository::new(pool.clone())),
    }
}
