//! Consumable item and transaction repository.
//!
//! The on-hand quantity and the ledger row move together: `apply_movement`
//! reads the current count, writes the new count, and appends the
//! transaction inside a single database transaction. The schema's
//! `CHECK (quantity >= 0)` backs the in-code guard.

use super::pagination::{PaginatedResult, Pagination};
use super::{DbError, DbPool};
use crate::models::{ConsumableItem, ConsumableTransaction, TransactionKind};
use async_trait::async_trait;
use uuid::Uuid;

#[cfg(feature = "database")]
use chrono::{DateTime, Utc};

/// Filter criteria for listing consumable items.
#[derive(Debug, Clone, Default)]
pub struct ConsumableFilter {
    /// Free-text search over name and SKU.
    pub search: Option<String>,
    /// Filter by category.
    pub category: Option<String>,
}

/// Partial update for a consumable item. Quantity is absent on purpose:
/// the count only moves through `apply_movement`.
#[derive(Debug, Clone, Default)]
pub struct ConsumableUpdate {
    pub name: Option<String>,
    pub category: Option<String>,
    pub unit: Option<String>,
    pub reorder_level: Option<i64>,
    pub location: Option<String>,
}

/// A requested stock movement.
#[derive(Debug, Clone)]
pub struct StockMovement {
    pub item_id: Uuid,
    pub kind: TransactionKind,
    /// For restock/issue: units moved. For adjust: the new absolute count.
    pub quantity: i64,
    pub employee_id: Option<Uuid>,
    pub reference: Option<String>,
    pub note: Option<String>,
}

/// Result of applying a stock movement.
#[derive(Debug, Clone)]
pub enum MovementOutcome {
    /// The movement was applied.
    Applied {
        item: ConsumableItem,
        transaction: ConsumableTransaction,
    },
    /// An issue asked for more than the on-hand count; nothing moved.
    Insufficient { on_hand: i64 },
}

/// Repository trait for consumable persistence.
#[async_trait]
pub trait ConsumableRepository: Send + Sync {
    /// Creates a new item.
    async fn create(&self, item: &ConsumableItem) -> Result<ConsumableItem, DbError>;

    /// Gets an item by ID.
    async fn get(&self, id: Uuid) -> Result<Option<ConsumableItem>, DbError>;

    /// Gets an item by SKU.
    async fn get_by_sku(&self, sku: &str) -> Result<Option<ConsumableItem>, DbError>;

    /// Lists items with filtering and pagination.
    async fn list(
        &self,
        filter: &ConsumableFilter,
        pagination: &Pagination,
    ) -> Result<PaginatedResult<ConsumableItem>, DbError>;

    /// Applies a partial update and returns the updated item.
    async fn update(&self, id: Uuid, update: &ConsumableUpdate) -> Result<ConsumableItem, DbError>;

    /// Deletes an item. Fails with a constraint error while ledger rows
    /// reference it.
    async fn delete(&self, id: Uuid) -> Result<bool, DbError>;

    /// Applies a stock movement atomically, writing the ledger row.
    async fn apply_movement(&self, movement: &StockMovement) -> Result<MovementOutcome, DbError>;

    /// Lists ledger rows for an item, newest first.
    async fn list_transactions(
        &self,
        item_id: Uuid,
        pagination: &Pagination,
    ) -> Result<PaginatedResult<ConsumableTransaction>, DbError>;

    /// Items at or below their reorder level.
    async fn low_stock(&self) -> Result<Vec<ConsumableItem>, DbError>;
}

/// Computes the balance after a movement, or `None` when an issue would
/// take the count negative.
fn next_balance(current: i64, kind: TransactionKind, quantity: i64) -> Option<i64> {
    match kind {
        TransactionKind::Restock => Some(current + quantity),
        TransactionKind::Issue => {
            let next = current - quantity;
            (next >= 0).then_some(next)
        }
        TransactionKind::Adjust => Some(quantity),
    }
}

/// Units recorded on the ledger row: the delta magnitude, never zero-padded
/// direction.
fn ledger_quantity(current: i64, kind: TransactionKind, quantity: i64) -> i64 {
    match kind {
        TransactionKind::Restock | TransactionKind::Issue => quantity,
        TransactionKind::Adjust => (quantity - current).abs(),
    }
}

#[cfg(feature = "database")]
const ITEM_COLUMNS: &str =
    "id, name, sku, category, unit, quantity, reorder_level, location, created_at, updated_at";

#[cfg(feature = "database")]
const TX_COLUMNS: &str =
    "id, item_id, kind, quantity, balance_after, employee_id, reference, note, created_at";

// ============================================================================
// SQLite implementation
// ============================================================================

#[cfg(feature = "database")]
#[derive(sqlx::FromRow)]
struct ItemRow {
    id: String,
    name: String,
    sku: String,
    category: Option<String>,
    unit: String,
    quantity: i64,
    reorder_level: i64,
    location: Option<String>,
    created_at: String,
    updated_at: String,
}

#[cfg(feature = "database")]
impl TryFrom<ItemRow> for ConsumableItem {
    type Error = DbError;

    fn try_from(row: ItemRow) -> Result<Self, Self::Error> {
        Ok(ConsumableItem {
            id: parse_uuid(&row.id)?,
            name: row.name,
            sku: row.sku,
            category: row.category,
            unit: row.unit,
            quantity: row.quantity,
            reorder_level: row.reorder_level,
            location: row.location,
            created_at: parse_ts(&row.created_at)?,
            updated_at: parse_ts(&row.updated_at)?,
        })
    }
}

#[cfg(feature = "database")]
#[derive(sqlx::FromRow)]
struct TxRow {
    id: String,
    item_id: String,
    kind: String,
    quantity: i64,
    balance_after: i64,
    employee_id: Option<String>,
    reference: Option<String>,
    note: Option<String>,
    created_at: String,
}

#[cfg(feature = "database")]
impl TryFrom<TxRow> for ConsumableTransaction {
    type Error = DbError;

    fn try_from(row: TxRow) -> Result<Self, Self::Error> {
        Ok(ConsumableTransaction {
            id: parse_uuid(&row.id)?,
            item_id: parse_uuid(&row.item_id)?,
            kind: TransactionKind::from_db_str(&row.kind).ok_or_else(|| {
                DbError::Serialization(format!("Unknown transaction kind: {}", row.kind))
            })?,
            quantity: row.quantity,
            balance_after: row.balance_after,
            employee_id: row.employee_id.as_deref().map(parse_uuid).transpose()?,
            reference: row.reference,
            note: row.note,
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

/// SQLite implementation of ConsumableRepository.
#[cfg(feature = "database")]
pub struct SqliteConsumableRepository {
    pool: sqlx::SqlitePool,
}

#[cfg(feature = "database")]
impl SqliteConsumableRepository {
    pub fn new(pool: sqlx::SqlitePool) -> Self {
        Self { pool }
    }
}

#[cfg(feature = "database")]
#[async_trait]
impl ConsumableRepository for SqliteConsumableRepository {
    async fn create(&self, item: &ConsumableItem) -> Result<ConsumableItem, DbError> {
        sqlx::query(
            r#"
            INSERT INTO consumable_items (id, name, sku, category, unit, quantity, reorder_level, location, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(item.id.to_string())
        .bind(&item.name)
        .bind(&item.sku)
        .bind(&item.category)
        .bind(&item.unit)
        .bind(item.quantity)
        .bind(item.reorder_level)
        .bind(&item.location)
        .bind(item.created_at.to_rfc3339())
        .bind(item.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(item.clone())
    }

    async fn get(&self, id: Uuid) -> Result<Option<ConsumableItem>, DbError> {
        let row: Option<ItemRow> = sqlx::query_as(&format!(
            "SELECT {} FROM consumable_items WHERE id = ?",
            ITEM_COLUMNS
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn get_by_sku(&self, sku: &str) -> Result<Option<ConsumableItem>, DbError> {
        let row: Option<ItemRow> = sqlx::query_as(&format!(
            "SELECT {} FROM consumable_items WHERE sku = ?",
            ITEM_COLUMNS
        ))
        .bind(sku)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn list(
        &self,
        filter: &ConsumableFilter,
        pagination: &Pagination,
    ) -> Result<PaginatedResult<ConsumableItem>, DbError> {
        use super::make_like_pattern;

        let mut query = format!("SELECT {} FROM consumable_items WHERE 1=1", ITEM_COLUMNS);
        let mut count_query = String::from("SELECT COUNT(*) FROM consumable_items WHERE 1=1");

        let clauses = |q: &mut String| {
            if filter.search.is_some() {
                q.push_str(" AND (name LIKE ? ESCAPE '\\' OR sku LIKE ? ESCAPE '\\')");
            }
            if filter.category.is_some() {
                q.push_str(" AND category = ?");
            }
        };
        clauses(&mut query);
        clauses(&mut count_query);
        query.push_str(" ORDER BY name ASC LIMIT ? OFFSET ?");

        let pattern = filter.search.as_deref().map(make_like_pattern);

        let mut rows_q = sqlx::query_as::<_, ItemRow>(&query);
        let mut count_q = sqlx::query_scalar::<_, i64>(&count_query);

        if let Some(pattern) = &pattern {
            rows_q = rows_q.bind(pattern.clone()).bind(pattern.clone());
            count_q = count_q.bind(pattern.clone()).bind(pattern.clone());
        }
        if let Some(category) = &filter.category {
            rows_q = rows_q.bind(category.clone());
            count_q = count_q.bind(category.clone());
        }

        rows_q = rows_q
            .bind(pagination.limit() as i64)
            .bind(pagination.offset() as i64);

        let rows: Vec<ItemRow> = rows_q.fetch_all(&self.pool).await?;
        let total: i64 = count_q.fetch_one(&self.pool).await?;

        let items: Result<Vec<ConsumableItem>, DbError> =
            rows.into_iter().map(TryInto::try_into).collect();

        Ok(PaginatedResult::new(items?, total as u64, pagination))
    }

    async fn update(&self, id: Uuid, update: &ConsumableUpdate) -> Result<ConsumableItem, DbError> {
        let now = Utc::now().to_rfc3339();

        let mut set_clauses = vec!["updated_at = ?".to_string()];
        let mut values: Vec<String> = vec![now];

        if let Some(name) = &update.name {
            set_clauses.push("name = ?".to_string());
            values.push(name.clone());
        }
        if let Some(category) = &update.category {
            set_clauses.push("category = ?".to_string());
            values.push(category.clone());
        }
        if let Some(unit) = &update.unit {
            set_clauses.push("unit = ?".to_string());
            values.push(unit.clone());
        }
        if let Some(reorder_level) = update.reorder_level {
            set_clauses.push("reorder_level = ?".to_string());
            values.push(reorder_level.to_string());
        }
        if let Some(location) = &update.location {
            set_clauses.push("location = ?".to_string());
            values.push(location.clone());
        }

        let query = format!(
            "UPDATE consumable_items SET {} WHERE id = ?",
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
            .ok_or_else(|| DbError::not_found("ConsumableItem", id))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM consumable_items WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn apply_movement(&self, movement: &StockMovement) -> Result<MovementOutcome, DbError> {
        let mut tx = self.pool.begin().await?;

        let current: Option<i64> =
            sqlx::query_scalar("SELECT quantity FROM consumable_items WHERE id = ?")
                .bind(movement.item_id.to_string())
                .fetch_optional(&mut *tx)
                .await?;

        let current = current.ok_or_else(|| DbError::not_found("ConsumableItem", movement.item_id))?;

        let Some(balance_after) = next_balance(current, movement.kind, movement.quantity) else {
            return Ok(MovementOutcome::Insufficient { on_hand: current });
        };

        let now = Utc::now();
        let record = ConsumableTransaction {
            id: Uuid::new_v4(),
            item_id: movement.item_id,
            kind: movement.kind,
            quantity: ledger_quantity(current, movement.kind, movement.quantity),
            balance_after,
            employee_id: movement.employee_id,
            reference: movement.reference.clone(),
            note: movement.note.clone(),
            created_at: now,
        };

        sqlx::query("UPDATE consumable_items SET quantity = ?, updated_at = ? WHERE id = ?")
            .bind(balance_after)
            .bind(now.to_rfc3339())
            .bind(movement.item_id.to_string())
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO consumable_transactions (id, item_id, kind, quantity, balance_after, employee_id, reference, note, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.id.to_string())
        .bind(record.item_id.to_string())
        .bind(record.kind.as_db_str())
        .bind(record.quantity)
        .bind(record.balance_after)
        .bind(record.employee_id.map(|id| id.to_string()))
        .bind(&record.reference)
        .bind(&record.note)
        .bind(record.created_at.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        let item = self
            .get(movement.item_id)
            .await?
            .ok_or_else(|| DbError::not_found("ConsumableItem", movement.item_id))?;

        Ok(MovementOutcome::Applied {
            item,
            transaction: record,
        })
    }

    async fn list_transactions(
        &self,
        item_id: Uuid,
        pagination: &Pagination,
    ) -> Result<PaginatedResult<ConsumableTransaction>, DbError> {
        let rows: Vec<TxRow> = sqlx::query_as(&format!(
            "SELECT {} FROM consumable_transactions WHERE item_id = ? ORDER BY created_at DESC LIMIT ? OFFSET ?",
            TX_COLUMNS
        ))
        .bind(item_id.to_string())
        .bind(pagination.limit() as i64)
        .bind(pagination.offset() as i64)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM consumable_transactions WHERE item_id = ?")
                .bind(item_id.to_string())
                .fetch_one(&self.pool)
                .await?;

        let items: Result<Vec<ConsumableTransaction>, DbError> =
            rows.into_iter().map(TryInto::try_into).collect();

        Ok(PaginatedResult::new(items?, total as u64, pagination))
    }

    async fn low_stock(&self) -> Result<Vec<ConsumableItem>, DbError> {
        let rows: Vec<ItemRow> = sqlx::query_as(&format!(
            "SELECT {} FROM consumable_items WHERE quantity <= reorder_level ORDER BY name ASC",
            ITEM_COLUMNS
        ))
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
struct PgItemRow {
    id: Uuid,
    name: String,
    sku: String,
    category: Option<String>,
    unit: String,
    quantity: i64,
    reorder_level: i64,
    location: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[cfg(feature = "database")]
impl From<PgItemRow> for ConsumableItem {
    fn from(row: PgItemRow) -> Self {
        ConsumableItem {
            id: row.id,
            name: row.name,
            sku: row.sku,
            category: row.category,
            unit: row.unit,
            quantity: row.quantity,
            reorder_level: row.reorder_level,
            location: row.location,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[cfg(feature = "database")]
#[derive(sqlx::FromRow)]
struct PgTxRow {
    id: Uuid,
    item_id: Uuid,
    kind: String,
    quantity: i64,
    balance_after: i64,
    employee_id: Option<Uuid>,
    reference: Option<String>,
    note: Option<String>,
    created_at: DateTime<Utc>,
}

#[cfg(feature = "database")]
impl TryFrom<PgTxRow> for ConsumableTransaction {
    type Error = DbError;

    fn try_from(row: PgTxRow) -> Result<Self, Self::Error> {
        Ok(ConsumableTransaction {
            id: row.id,
            item_id: row.item_id,
            kind: TransactionKind::from_db_str(&row.kind).ok_or_else(|| {
                DbError::Serialization(format!("Unknown transaction kind: {}", row.kind))
            })?,
            quantity: row.quantity,
            balance_after: row.balance_after,
            employee_id: row.employee_id,
            reference: row.reference,
            note: row.note,
            created_at: row.created_at,
        })
    }
}

/// PostgreSQL implementation of ConsumableRepository.
#[cfg(feature = "database")]
pub struct PgConsumableRepository {
    pool: sqlx::PgPool,
}

#[cfg(feature = "database")]
impl PgConsumableRepository {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[cfg(feature = "database")]
#[async_trait]
impl ConsumableRepository for PgConsumableRepository {
    async fn create(&self, item: &ConsumableItem) -> Result<ConsumableItem, DbError> {
        sqlx::query(
            r#"
            INSERT INTO consumable_items (id, name, sku, category, unit, quantity, reorder_level, location, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(item.id)
        .bind(&item.name)
        .bind(&item.sku)
        .bind(&item.category)
        .bind(&item.unit)
        .bind(item.quantity)
        .bind(item.reorder_level)
        .bind(&item.location)
        .bind(item.created_at)
        .bind(item.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(item.clone())
    }

    async fn get(&self, id: Uuid) -> Result<Option<ConsumableItem>, DbError> {
        let row: Option<PgItemRow> = sqlx::query_as(&format!(
            "SELECT {} FROM consumable_items WHERE id = $1",
            ITEM_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn get_by_sku(&self, sku: &str) -> Result<Option<ConsumableItem>, DbError> {
        let row: Option<PgItemRow> = sqlx::query_as(&format!(
            "SELECT {} FROM consumable_items WHERE sku = $1",
            ITEM_COLUMNS
        ))
        .bind(sku)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn list(
        &self,
        filter: &ConsumableFilter,
        pagination: &Pagination,
    ) -> Result<PaginatedResult<ConsumableItem>, DbError> {
        use super::make_like_pattern;

        let pattern = filter.search.as_deref().map(make_like_pattern);

        let rows: Vec<PgItemRow> = sqlx::query_as(&format!(
            r#"
            SELECT {}
            FROM consumable_items
            WHERE ($1::text IS NULL OR name ILIKE $1 OR sku ILIKE $1)
              AND ($2::text IS NULL OR category = $2)
            ORDER BY name ASC
            LIMIT $3 OFFSET $4
            "#,
            ITEM_COLUMNS
        ))
        .bind(&pattern)
        .bind(&filter.category)
        .bind(pagination.limit() as i64)
        .bind(pagination.offset() as i64)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM consumable_items
            WHERE ($1::text IS NULL OR name ILIKE $1 OR sku ILIKE $1)
              AND ($2::text IS NULL OR category = $2)
            "#,
        )
        .bind(&pattern)
        .bind(&filter.category)
        .fetch_one(&self.pool)
        .await?;

        let items: Vec<ConsumableItem> = rows.into_iter().map(Into::into).collect();

        Ok(PaginatedResult::new(items, total as u64, pagination))
    }

    async fn update(&self, id: Uuid, update: &ConsumableUpdate) -> Result<ConsumableItem, DbError> {
        sqlx::query(
            r#"
            UPDATE consumable_items SET
                name = COALESCE($2, name),
                category = COALESCE($3, category),
                unit = COALESCE($4, unit),
                reorder_level = COALESCE($5, reorder_level),
                location = COALESCE($6, location),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&update.name)
        .bind(&update.category)
        .bind(&update.unit)
        .bind(update.reorder_level)
        .bind(&update.location)
        .execute(&self.pool)
        .await?;

        self.get(id)
            .await?
            .ok_or_else(|| DbError::not_found("ConsumableItem", id))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM consumable_items WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn apply_movement(&self, movement: &StockMovement) -> Result<MovementOutcome, DbError> {
        let mut tx = self.pool.begin().await?;

        // Lock the row so concurrent movements serialize on the item.
        let current: Option<i64> =
            sqlx::query_scalar("SELECT quantity FROM consumable_items WHERE id = $1 FOR UPDATE")
                .bind(movement.item_id)
                .fetch_optional(&mut *tx)
                .await?;

        let current = current.ok_or_else(|| DbError::not_found("ConsumableItem", movement.item_id))?;

        let Some(balance_after) = next_balance(current, movement.kind, movement.quantity) else {
            return Ok(MovementOutcome::Insufficient { on_hand: current });
        };

        let now = Utc::now();
        let record = ConsumableTransaction {
            id: Uuid::new_v4(),
            item_id: movement.item_id,
            kind: movement.kind,
            quantity: ledger_quantity(current, movement.kind, movement.quantity),
            balance_after,
            employee_id: movement.employee_id,
            reference: movement.reference.clone(),
            note: movement.note.clone(),
            created_at: now,
        };

        sqlx::query("UPDATE consumable_items SET quantity = $2, updated_at = $3 WHERE id = $1")
            .bind(movement.item_id)
            .bind(balance_after)
            .bind(now)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO consumable_transactions (id, item_id, kind, quantity, balance_after, employee_id, reference, note, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(record.id)
        .bind(record.item_id)
        .bind(record.kind.as_db_str())
        .bind(record.quantity)
        .bind(record.balance_after)
        .bind(record.employee_id)
        .bind(&record.reference)
        .bind(&record.note)
        .bind(record.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        let item = self
            .get(movement.item_id)
            .await?
            .ok_or_else(|| DbError::not_found("ConsumableItem", movement.item_id))?;

        Ok(MovementOutcome::Applied {
            item,
            transaction: record,
        })
    }

    async fn list_transactions(
        &self,
        item_id: Uuid,
        pagination: &Pagination,
    ) -> Result<PaginatedResult<ConsumableTransaction>, DbError> {
        let rows: Vec<PgTxRow> = sqlx::query_as(&format!(
            "SELECT {} FROM consumable_transactions WHERE item_id = $1 ORDER BY created_at DESC LIMIT $2 OFFSET $3",
            TX_COLUMNS
        ))
        .bind(item_id)
        .bind(pagination.limit() as i64)
        .bind(pagination.offset() as i64)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM consumable_transactions WHERE item_id = $1")
                .bind(item_id)
                .fetch_one(&self.pool)
                .await?;

        let items: Result<Vec<ConsumableTransaction>, DbError> =
            rows.into_iter().map(TryInto::try_into).collect();

        Ok(PaginatedResult::new(items?, total as u64, pagination))
    }

    async fn low_stock(&self) -> Result<Vec<ConsumableItem>, DbError> {
        let rows: Vec<PgItemRow> = sqlx::query_as(&format!(
            "SELECT {} FROM consumable_items WHERE quantity <= reorder_level ORDER BY name ASC",
            ITEM_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}

/// Factory function to create the appropriate repository based on pool type.
#[cfg(feature = "database")]
pub fn create_consumable_repository(pool: &DbPool) -> Box<dyn ConsumableRepository> {
    match pool {
        DbPool::Sqlite(pool) => Box::new(SqliteConsumableRepository::new(pool.clone())),
        DbPool::Postgres(pool) => Box::new(PgConsumableRepository::new(pool.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_balance_restock() {
        assert_eq!(next_balance(5, TransactionKind::Restock, 3), Some(8));
    }

    #[test]
    fn test_next_balance_issue_guard() {
        assert_eq!(next_balance(5, TransactionKind::Issue, 5), Some(0));
        assert_eq!(next_balance(5, TransactionKind::Issue, 6), None);
    }

    #[test]
    fn test_next_balance_adjust_is_absolute() {
        assert_eq!(next_balance(5, TransactionKind::Adjust, 12), Some(12));
        assert_eq!(next_balance(5, TransactionKind::Adjust, 0), Some(0));
    }

    #[test]
    fn test_ledger_quantity_adjust_records_delta() {
        assert_eq!(ledger_quantity(5, TransactionKind::Adjust, 12), 7);
        assert_eq!(ledger_quantity(12, TransactionKind::Adjust, 5), 7);
        assert_eq!(ledger_quantity(5, TransactionKind::Issue, 2), 2);
    }
}
