//! Asset repository for database operations.
//!
//! Covers asset CRUD plus custody bookkeeping: assigning an asset closes any
//! open custody record and opens a new one in the same transaction, so the
//! denormalized `custodian_id` column and the custody history can never
//! disagree.

use super::pagination::{PaginatedResult, Pagination};
use super::{DbError, DbPool};
use crate::models::{Asset, AssetCategory, AssetStatus, CustodyRecord};
use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

#[cfg(feature = "database")]
use chrono::{DateTime, Utc};

/// Filter criteria for listing assets.
#[derive(Debug, Clone, Default)]
pub struct AssetFilter {
    /// Free-text search over tag, name, and serial number.
    pub search: Option<String>,
    /// Filter by category.
    pub category: Option<AssetCategory>,
    /// Filter by status.
    pub status: Option<AssetStatus>,
    /// Filter by current custodian.
    pub custodian_id: Option<Uuid>,
}

/// Partial update for an asset.
#[derive(Debug, Clone, Default)]
pub struct AssetUpdate {
    pub name: Option<String>,
    pub category: Option<AssetCategory>,
    pub status: Option<AssetStatus>,
    pub serial_number: Option<String>,
    pub model: Option<String>,
    pub location: Option<String>,
    pub purchase_date: Option<NaiveDate>,
    pub warranty_expires: Option<NaiveDate>,
    pub notes: Option<String>,
}

/// Repository trait for asset persistence.
#[async_trait]
pub trait AssetRepository: Send + Sync {
    /// Creates a new asset.
    async fn create(&self, asset: &Asset) -> Result<Asset, DbError>;

    /// Gets an asset by ID.
    async fn get(&self, id: Uuid) -> Result<Option<Asset>, DbError>;

    /// Gets an asset by its inventory tag.
    async fn get_by_tag(&self, asset_tag: &str) -> Result<Option<Asset>, DbError>;

    /// Lists assets with filtering and pagination.
    async fn list(
        &self,
        filter: &AssetFilter,
        pagination: &Pagination,
    ) -> Result<PaginatedResult<Asset>, DbError>;

    /// Applies a partial update and returns the updated asset.
    async fn update(&self, id: Uuid, update: &AssetUpdate) -> Result<Asset, DbError>;

    /// Places the asset in an employee's custody.
    ///
    /// Closes any open custody record, opens a new one, points
    /// `custodian_id` at the employee, and sets the status to `assigned`,
    /// all in one transaction.
    async fn assign(&self, id: Uuid, employee_id: Uuid) -> Result<Asset, DbError>;

    /// Returns the asset to storage, closing the open custody record.
    async fn unassign(&self, id: Uuid) -> Result<Asset, DbError>;

    /// Custody history for an asset, newest first.
    async fn custody_history(&self, id: Uuid) -> Result<Vec<CustodyRecord>, DbError>;

    /// Deletes an asset and (via cascade) its custody records.
    async fn delete(&self, id: Uuid) -> Result<bool, DbError>;

    /// Counts assets grouped by status, for the metrics summary.
    async fn count_by_status(&self) -> Result<Vec<(AssetStatus, u64)>, DbError>;
}

#[cfg(feature = "database")]
const ASSET_COLUMNS: &str = "id, asset_tag, name, category, status, serial_number, model, location, purchase_date, warranty_expires, custodian_id, notes, created_at, updated_at";

// ============================================================================
// SQLite implementation
// ============================================================================

#[cfg(feature = "database")]
#[derive(sqlx::FromRow)]
struct AssetRow {
    id: String,
    asset_tag: String,
    name: String,
    category: String,
    status: String,
    serial_number: Option<String>,
    model: Option<String>,
    location: Option<String>,
    purchase_date: Option<String>,
    warranty_expires: Option<String>,
    custodian_id: Option<String>,
    notes: Option<String>,
    created_at: String,
    updated_at: String,
}

#[cfg(feature = "database")]
impl TryFrom<AssetRow> for Asset {
    type Error = DbError;

    fn try_from(row: AssetRow) -> Result<Self, Self::Error> {
        Ok(Asset {
            id: parse_uuid(&row.id)?,
            asset_tag: row.asset_tag,
            name: row.name,
            category: AssetCategory::from_db_str(&row.category).ok_or_else(|| {
                DbError::Serialization(format!("Unknown asset category: {}", row.category))
            })?,
            status: AssetStatus::from_db_str(&row.status).ok_or_else(|| {
                DbError::Serialization(format!("Unknown asset status: {}", row.status))
            })?,
            serial_number: row.serial_number,
            model: row.model,
            location: row.location,
            purchase_date: row.purchase_date.as_deref().map(parse_date).transpose()?,
            warranty_expires: row.warranty_expires.as_deref().map(parse_date).transpose()?,
            custodian_id: row.custodian_id.as_deref().map(parse_uuid).transpose()?,
            notes: row.notes,
            created_at: parse_ts(&row.created_at)?,
            updated_at: parse_ts(&row.updated_at)?,
        })
    }
}

#[cfg(feature = "database")]
#[derive(sqlx::FromRow)]
struct CustodyRow {
    id: String,
    asset_id: String,
    employee_id: String,
    assigned_at: String,
    returned_at: Option<String>,
}

#[cfg(feature = "database")]
impl TryFrom<CustodyRow> for CustodyRecord {
    type Error = DbError;

    fn try_from(row: CustodyRow) -> Result<Self, Self::Error> {
        Ok(CustodyRecord {
            id: parse_uuid(&row.id)?,
            asset_id: parse_uuid(&row.asset_id)?,
            employee_id: parse_uuid(&row.employee_id)?,
            assigned_at: parse_ts(&row.assigned_at)?,
            returned_at: row.returned_at.as_deref().map(parse_ts_ref).transpose()?,
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

#[cfg(feature = "database")]
fn parse_ts_ref(s: &str) -> Result<DateTime<Utc>, DbError> {
    parse_ts(s)
}

#[cfg(feature = "database")]
fn parse_date(s: &str) -> Result<NaiveDate, DbError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| DbError::Serialization(e.to_string()))
}

/// SQLite implementation of AssetRepository.
#[cfg(feature = "database")]
pub struct SqliteAssetRepository {
    pool: sqlx::SqlitePool,
}

#[cfg(feature = "database")]
impl SqliteAssetRepository {
    pub fn new(pool: sqlx::SqlitePool) -> Self {
        Self { pool }
    }
}

#[cfg(feature = "database")]
#[async_trait]
impl AssetRepository for SqliteAssetRepository {
    async fn create(&self, asset: &Asset) -> Result<Asset, DbError> {
        sqlx::query(
            r#"
            INSERT INTO assets (id, asset_tag, name, category, status, serial_number, model, location, purchase_date, warranty_expires, custodian_id, notes, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(asset.id.to_string())
        .bind(&asset.asset_tag)
        .bind(&asset.name)
        .bind(asset.category.as_db_str())
        .bind(asset.status.as_db_str())
        .bind(&asset.serial_number)
        .bind(&asset.model)
        .bind(&asset.location)
        .bind(asset.purchase_date.map(|d| d.to_string()))
        .bind(asset.warranty_expires.map(|d| d.to_string()))
        .bind(asset.custodian_id.map(|id| id.to_string()))
        .bind(&asset.notes)
        .bind(asset.created_at.to_rfc3339())
        .bind(asset.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(asset.clone())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Asset>, DbError> {
        let row: Option<AssetRow> =
            sqlx::query_as(&format!("SELECT {} FROM assets WHERE id = ?", ASSET_COLUMNS))
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn get_by_tag(&self, asset_tag: &str) -> Result<Option<Asset>, DbError> {
        let row: Option<AssetRow> = sqlx::query_as(&format!(
            "SELECT {} FROM assets WHERE asset_tag = ?",
            ASSET_COLUMNS
        ))
        .bind(asset_tag)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn list(
        &self,
        filter: &AssetFilter,
        pagination: &Pagination,
    ) -> Result<PaginatedResult<Asset>, DbError> {
        use super::make_like_pattern;

        let mut query = format!("SELECT {} FROM assets WHERE 1=1", ASSET_COLUMNS);
        let mut count_query = String::from("SELECT COUNT(*) FROM assets WHERE 1=1");

        let clauses = |q: &mut String| {
            if filter.search.is_some() {
                q.push_str(
                    " AND (asset_tag LIKE ? ESCAPE '\\' OR name LIKE ? ESCAPE '\\' OR serial_number LIKE ? ESCAPE '\\')",
                );
            }
            if filter.category.is_some() {
                q.push_str(" AND category = ?");
            }
            if filter.status.is_some() {
                q.push_str(" AND status = ?");
            }
            if filter.custodian_id.is_some() {
                q.push_str(" AND custodian_id = ?");
            }
        };
        clauses(&mut query);
        clauses(&mut count_query);
        query.push_str(" ORDER BY asset_tag ASC LIMIT ? OFFSET ?");

        let pattern = filter.search.as_deref().map(make_like_pattern);

        let mut rows_q = sqlx::query_as::<_, AssetRow>(&query);
        let mut count_q = sqlx::query_scalar::<_, i64>(&count_query);

        if let Some(pattern) = &pattern {
            rows_q = rows_q
                .bind(pattern.clone())
                .bind(pattern.clone())
                .bind(pattern.clone());
            count_q = count_q
                .bind(pattern.clone())
                .bind(pattern.clone())
                .bind(pattern.clone());
        }
        if let Some(category) = filter.category {
            rows_q = rows_q.bind(category.as_db_str());
            count_q = count_q.bind(category.as_db_str());
        }
        if let Some(status) = filter.status {
            rows_q = rows_q.bind(status.as_db_str());
            count_q = count_q.bind(status.as_db_str());
        }
        if let Some(custodian_id) = filter.custodian_id {
            rows_q = rows_q.bind(custodian_id.to_string());
            count_q = count_q.bind(custodian_id.to_string());
        }

        rows_q = rows_q
            .bind(pagination.limit() as i64)
            .bind(pagination.offset() as i64);

        let rows: Vec<AssetRow> = rows_q.fetch_all(&self.pool).await?;
        let total: i64 = count_q.fetch_one(&self.pool).await?;

        let items: Result<Vec<Asset>, DbError> = rows.into_iter().map(TryInto::try_into).collect();

        Ok(PaginatedResult::new(items?, total as u64, pagination))
    }

    async fn update(&self, id: Uuid, update: &AssetUpdate) -> Result<Asset, DbError> {
        let now = Utc::now().to_rfc3339();

        let mut set_clauses = vec!["updated_at = ?".to_string()];
        let mut values: Vec<String> = vec![now];

        if let Some(name) = &update.name {
            set_clauses.push("name = ?".to_string());
            values.push(name.clone());
        }
        if let Some(category) = update.category {
            set_clauses.push("category = ?".to_string());
            values.push(category.as_db_str().to_string());
        }
        if let Some(status) = update.status {
            set_clauses.push("status = ?".to_string());
            values.push(status.as_db_str().to_string());
        }
        if let Some(serial_number) = &update.serial_number {
            set_clauses.push("serial_number = ?".to_string());
            values.push(serial_number.clone());
        }
        if let Some(model) = &update.model {
            set_clauses.push("model = ?".to_string());
            values.push(model.clone());
        }
        if let Some(location) = &update.location {
            set_clauses.push("location = ?".to_string());
            values.push(location.clone());
        }
        if let Some(purchase_date) = update.purchase_date {
            set_clauses.push("purchase_date = ?".to_string());
            values.push(purchase_date.to_string());
        }
        if let Some(warranty_expires) = update.warranty_expires {
            set_clauses.push("warranty_expires = ?".to_string());
            values.push(warranty_expires.to_string());
        }
        if let Some(notes) = &update.notes {
            set_clauses.push("notes = ?".to_string());
            values.push(notes.clone());
        }

        let query = format!("UPDATE assets SET {} WHERE id = ?", set_clauses.join(", "));

        let mut query_builder = sqlx::query(&query);
        for value in &values {
            query_builder = query_builder.bind(value);
        }
        query_builder = query_builder.bind(id.to_string());
        query_builder.execute(&self.pool).await?;

        self.get(id)
            .await?
            .ok_or_else(|| DbError::not_found("Asset", id))
    }

    async fn assign(&self, id: Uuid, employee_id: Uuid) -> Result<Asset, DbError> {
        let now = Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;

        // Close whatever custody is open on this asset.
        sqlx::query("UPDATE custody_records SET returned_at = ? WHERE asset_id = ? AND returned_at IS NULL")
            .bind(&now)
            .bind(id.to_string())
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO custody_records (id, asset_id, employee_id, assigned_at, returned_at) VALUES (?, ?, ?, ?, NULL)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(id.to_string())
        .bind(employee_id.to_string())
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        let result = sqlx::query(
            "UPDATE assets SET custodian_id = ?, status = 'assigned', updated_at = ? WHERE id = ?",
        )
        .bind(employee_id.to_string())
        .bind(&now)
        .bind(id.to_string())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Asset", id));
        }

        tx.commit().await?;

        self.get(id)
            .await?
            .ok_or_else(|| DbError::not_found("Asset", id))
    }

    async fn unassign(&self, id: Uuid) -> Result<Asset, DbError> {
        let now = Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE custody_records SET returned_at = ? WHERE asset_id = ? AND returned_at IS NULL")
            .bind(&now)
            .bind(id.to_string())
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query(
            "UPDATE assets SET custodian_id = NULL, status = 'in_storage', updated_at = ? WHERE id = ?",
        )
        .bind(&now)
        .bind(id.to_string())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Asset", id));
        }

        tx.commit().await?;

        self.get(id)
            .await?
            .ok_or_else(|| DbError::not_found("Asset", id))
    }

    async fn custody_history(&self, id: Uuid) -> Result<Vec<CustodyRecord>, DbError> {
        let rows: Vec<CustodyRow> = sqlx::query_as(
            "SELECT id, asset_id, employee_id, assigned_at, returned_at FROM custody_records WHERE asset_id = ? ORDER BY assigned_at DESC",
        )
        .bind(id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn delete(&self, id: Uuid) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM assets WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn count_by_status(&self) -> Result<Vec<(AssetStatus, u64)>, DbError> {
        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM assets GROUP BY status")
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter()
            .map(|(status, count)| {
                AssetStatus::from_db_str(&status)
                    .ok_or_else(|| {
                        DbError::Serialization(format!("Unknown asset status: {}", status))
                    })
                    .map(|s| (s, count as u64))
            })
            .collect()
    }
}

// ============================================================================
// PostgreSQL implementation
// ============================================================================

#[cfg(feature = "database")]
#[derive(sqlx::FromRow)]
struct PgAssetRow {
    id: Uuid,
    asset_tag: String,
    name: String,
    category: String,
    status: String,
    serial_number: Option<String>,
    model: Option<String>,
    location: Option<String>,
    purchase_date: Option<NaiveDate>,
    warranty_expires: Option<NaiveDate>,
    custodian_id: Option<Uuid>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[cfg(feature = "database")]
impl TryFrom<PgAssetRow> for Asset {
    type Error = DbError;

    fn try_from(row: PgAssetRow) -> Result<Self, Self::Error> {
        Ok(Asset {
            id: row.id,
            asset_tag: row.asset_tag,
            name: row.name,
            category: AssetCategory::from_db_str(&row.category).ok_or_else(|| {
                DbError::Serialization(format!("Unknown asset category: {}", row.category))
            })?,
            status: AssetStatus::from_db_str(&row.status).ok_or_else(|| {
                DbError::Serialization(format!("Unknown asset status: {}", row.status))
            })?,
            serial_number: row.serial_number,
            model: row.model,
            location: row.location,
            purchase_date: row.purchase_date,
            warranty_expires: row.warranty_expires,
            custodian_id: row.custodian_id,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[cfg(feature = "database")]
#[derive(sqlx::FromRow)]
struct PgCustodyRow {
    id: Uuid,
    asset_id: Uuid,
    employee_id: Uuid,
    assigned_at: DateTime<Utc>,
    returned_at: Option<DateTime<Utc>>,
}

#[cfg(feature = "database")]
impl From<PgCustodyRow> for CustodyRecord {
    fn from(row: PgCustodyRow) -> Self {
        CustodyRecord {
            id: row.id,
            asset_id: row.asset_id,
            employee_id: row.employee_id,
            assigned_at: row.assigned_at,
            returned_at: row.returned_at,
        }
    }
}

/// PostgreSQL implementation of AssetRepository.
#[cfg(feature = "database")]
pub struct PgAssetRepository {
    pool: sqlx::PgPool,
}

#[cfg(feature = "database")]
impl PgAssetRepository {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[cfg(feature = "database")]
#[async_trait]
impl AssetRepository for PgAssetRepository {
    async fn create(&self, asset: &Asset) -> Result<Asset, DbError> {
        sqlx::query(
            r#"
            INSERT INTO assets (id, asset_tag, name, category, status, serial_number, model, location, purchase_date, warranty_expires, custodian_id, notes, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(asset.id)
        .bind(&asset.asset_tag)
        .bind(&asset.name)
        .bind(asset.category.as_db_str())
        .bind(asset.status.as_db_str())
        .bind(&asset.serial_number)
        .bind(&asset.model)
        .bind(&asset.location)
        .bind(asset.purchase_date)
        .bind(asset.warranty_expires)
        .bind(asset.custodian_id)
        .bind(&asset.notes)
        .bind(asset.created_at)
        .bind(asset.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(asset.clone())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Asset>, DbError> {
        let row: Option<PgAssetRow> =
            sqlx::query_as(&format!("SELECT {} FROM assets WHERE id = $1", ASSET_COLUMNS))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn get_by_tag(&self, asset_tag: &str) -> Result<Option<Asset>, DbError> {
        let row: Option<PgAssetRow> = sqlx::query_as(&format!(
            "SELECT {} FROM assets WHERE asset_tag = $1",
            ASSET_COLUMNS
        ))
        .bind(asset_tag)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn list(
        &self,
        filter: &AssetFilter,
        pagination: &Pagination,
    ) -> Result<PaginatedResult<Asset>, DbError> {
        use super::make_like_pattern;

        let pattern = filter.search.as_deref().map(make_like_pattern);
        let category = filter.category.map(|c| c.as_db_str());
        let status = filter.status.map(|s| s.as_db_str());

        let rows: Vec<PgAssetRow> = sqlx::query_as(&format!(
            r#"
            SELECT {}
            FROM assets
            WHERE ($1::text IS NULL OR asset_tag ILIKE $1 OR name ILIKE $1 OR serial_number ILIKE $1)
              AND ($2::text IS NULL OR category = $2)
              AND ($3::text IS NULL OR status = $3)
              AND ($4::uuid IS NULL OR custodian_id = $4)
            ORDER BY asset_tag ASC
            LIMIT $5 OFFSET $6
            "#,
            ASSET_COLUMNS
        ))
        .bind(&pattern)
        .bind(category)
        .bind(status)
        .bind(filter.custodian_id)
        .bind(pagination.limit() as i64)
        .bind(pagination.offset() as i64)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM assets
            WHERE ($1::text IS NULL OR asset_tag ILIKE $1 OR name ILIKE $1 OR serial_number ILIKE $1)
              AND ($2::text IS NULL OR category = $2)
              AND ($3::text IS NULL OR status = $3)
              AND ($4::uuid IS NULL OR custodian_id = $4)
            "#,
        )
        .bind(&pattern)
        .bind(category)
        .bind(status)
        .bind(filter.custodian_id)
        .fetch_one(&self.pool)
        .await?;

        let items: Result<Vec<Asset>, DbError> = rows.into_iter().map(TryInto::try_into).collect();

        Ok(PaginatedResult::new(items?, total as u64, pagination))
    }

    async fn update(&self, id: Uuid, update: &AssetUpdate) -> Result<Asset, DbError> {
        sqlx::query(
            r#"
            UPDATE assets SET
                name = COALESCE($2, name),
                category = COALESCE($3, category),
                status = COALESCE($4, status),
                serial_number = COALESCE($5, serial_number),
                model = COALESCE($6, model),
                location = COALESCE($7, location),
                purchase_date = COALESCE($8, purchase_date),
                warranty_expires = COALESCE($9, warranty_expires),
                notes = COALESCE($10, notes),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&update.name)
        .bind(update.category.map(|c| c.as_db_str()))
        .bind(update.status.map(|s| s.as_db_str()))
        .bind(&update.serial_number)
        .bind(&update.model)
        .bind(&update.location)
        .bind(update.purchase_date)
        .bind(update.warranty_expires)
        .bind(&update.notes)
        .execute(&self.pool)
        .await?;

        self.get(id)
            .await?
            .ok_or_else(|| DbError::not_found("Asset", id))
    }

    async fn assign(&self, id: Uuid, employee_id: Uuid) -> Result<Asset, DbError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "UPDATE custody_records SET returned_at = NOW() WHERE asset_id = $1 AND returned_at IS NULL",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO custody_records (id, asset_id, employee_id, assigned_at, returned_at) VALUES ($1, $2, $3, NOW(), NULL)",
        )
        .bind(Uuid::new_v4())
        .bind(id)
        .bind(employee_id)
        .execute(&mut *tx)
        .await?;

        let result = sqlx::query(
            "UPDATE assets SET custodian_id = $2, status = 'assigned', updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(employee_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Asset", id));
        }

        tx.commit().await?;

        self.get(id)
            .await?
            .ok_or_else(|| DbError::not_found("Asset", id))
    }

    async fn unassign(&self, id: Uuid) -> Result<Asset, DbError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "UPDATE custody_records SET returned_at = NOW() WHERE asset_id = $1 AND returned_at IS NULL",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        let result = sqlx::query(
            "UPDATE assets SET custodian_id = NULL, status = 'in_storage', updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Asset", id));
        }

        tx.commit().await?;

        self.get(id)
            .await?
            .ok_or_else(|| DbError::not_found("Asset", id))
    }

    async fn custody_history(&self, id: Uuid) -> Result<Vec<CustodyRecord>, DbError> {
        let rows: Vec<PgCustodyRow> = sqlx::query_as(
            "SELECT id, asset_id, employee_id, assigned_at, returned_at FROM custody_records WHERE asset_id = $1 ORDER BY assigned_at DESC",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM assets WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn count_by_status(&self) -> Result<Vec<(AssetStatus, u64)>, DbError> {
        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM assets GROUP BY status")
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter()
            .map(|(status, count)| {
                AssetStatus::from_db_str(&status)
                    .ok_or_else(|| {
                        DbError::Serialization(format!("Unknown asset status: {}", status))
                    })
                    .map(|s| (s, count as u64))
            })
            .collect()
    }
}

/// Factory function to create the appropriate repository based on pool type.
#[cfg(feature = "database")]
pub fn create_asset_repository(pool: &DbPool) -> Box<dyn AssetRepository> {
    match pool {
        DbPool::Sqlite(pool) => Box::new(SqliteAssetRepository::new(pool.clone())),
        DbPool::Postgres(pool) => Box::new(PgAssetRepository::new(pool.clone())),
    }
}
