//! Purchase order repository for database operations.
//!
//! Orders and their lines are written together; `replace_lines` swaps the
//! whole line set in one transaction, matching how the order form submits.

use super::pagination::{PaginatedResult, Pagination};
use super::{DbError, DbPool};
use crate::models::{OrderStatus, PurchaseOrder, PurchaseOrderLine};
use async_trait::async_trait;
use uuid::Uuid;

#[cfg(feature = "database")]
use chrono::{DateTime, Utc};

/// Filter criteria for listing purchase orders.
#[derive(Debug, Clone, Default)]
pub struct PurchaseOrderFilter {
    /// Filter by status.
    pub status: Option<OrderStatus>,
    /// Filter by supplier.
    pub supplier_id: Option<Uuid>,
    /// Free-text search over the order number.
    pub search: Option<String>,
}

/// Partial update for a purchase order header.
#[derive(Debug, Clone, Default)]
pub struct PurchaseOrderUpdate {
    pub supplier_id: Option<Uuid>,
    pub notes: Option<String>,
}

/// Repository trait for purchase order persistence.
#[async_trait]
pub trait PurchaseOrderRepository: Send + Sync {
    /// Creates an order together with its lines.
    async fn create(&self, order: &PurchaseOrder) -> Result<PurchaseOrder, DbError>;

    /// Gets an order with its lines.
    async fn get(&self, id: Uuid) -> Result<Option<PurchaseOrder>, DbError>;

    /// Gets an order by its order number.
    async fn get_by_number(&self, order_number: &str) -> Result<Option<PurchaseOrder>, DbError>;

    /// Lists orders (with lines) with filtering and pagination.
    async fn list(
        &self,
        filter: &PurchaseOrderFilter,
        pagination: &Pagination,
    ) -> Result<PaginatedResult<PurchaseOrder>, DbError>;

    /// Updates the order header.
    async fn update(&self, id: Uuid, update: &PurchaseOrderUpdate)
        -> Result<PurchaseOrder, DbError>;

    /// Replaces all lines on an order.
    async fn replace_lines(
        &self,
        id: Uuid,
        lines: &[PurchaseOrderLine],
    ) -> Result<PurchaseOrder, DbError>;

    /// Moves the order to a new status, stamping `submitted_at` /
    /// `received_at` as appropriate. Transition legality is the caller's
    /// business rule.
    async fn set_status(&self, id: Uuid, status: OrderStatus) -> Result<PurchaseOrder, DbError>;

    /// Deletes an order and (via cascade) its lines.
    async fn delete(&self, id: Uuid) -> Result<bool, DbError>;
}

#[cfg(feature = "database")]
const ORDER_COLUMNS: &str =
    "id, order_number, supplier_id, status, submitted_at, received_at, notes, created_at, updated_at";

#[cfg(feature = "database")]
const LINE_COLUMNS: &str = "id, order_id, description, quantity, unit_price_cents, consumable_item_id";

// ============================================================================
// SQLite implementation
// ============================================================================

#[cfg(feature = "database")]
#[derive(sqlx::FromRow)]
struct OrderRow {
    id: String,
    order_number: String,
    supplier_id: String,
    status: String,
    submitted_at: Option<String>,
    received_at: Option<String>,
    notes: Option<String>,
    created_at: String,
    updated_at: String,
}

#[cfg(feature = "database")]
impl OrderRow {
    fn into_order(self, lines: Vec<PurchaseOrderLine>) -> Result<PurchaseOrder, DbError> {
        Ok(PurchaseOrder {
            id: parse_uuid(&self.id)?,
            order_number: self.order_number,
            supplier_id: parse_uuid(&self.supplier_id)?,
            status: OrderStatus::from_db_str(&self.status).ok_or_else(|| {
                DbError::Serialization(format!("Unknown order status: {}", self.status))
            })?,
            lines,
            submitted_at: self.submitted_at.as_deref().map(parse_ts).transpose()?,
            received_at: self.received_at.as_deref().map(parse_ts).transpose()?,
            notes: self.notes,
            created_at: parse_ts(&self.created_at)?,
            updated_at: parse_ts(&self.updated_at)?,
        })
    }
}

#[cfg(feature = "database")]
#[derive(sqlx::FromRow)]
struct LineRow {
    id: String,
    order_id: String,
    description: String,
    quantity: i64,
    unit_price_cents: i64,
    consumable_item_id: Option<String>,
}

#[cfg(feature = "database")]
impl TryFrom<LineRow> for PurchaseOrderLine {
    type Error = DbError;

    fn try_from(row: LineRow) -> Result<Self, Self::Error> {
        Ok(PurchaseOrderLine {
            id: parse_uuid(&row.id)?,
            order_id: parse_uuid(&row.order_id)?,
            description: row.description,
            quantity: row.quantity,
            unit_price_cents: row.unit_price_cents,
            consumable_item_id: row
                .consumable_item_id
                .as_deref()
                .map(parse_uuid)
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

/// SQLite implementation of PurchaseOrderRepository.
#[cfg(feature = "database")]
pub struct SqlitePurchaseOrderRepository {
    pool: sqlx::SqlitePool,
}

#[cfg(feature = "database")]
impl SqlitePurchaseOrderRepository {
    pub fn new(pool: sqlx::SqlitePool) -> Self {
        Self { pool }
    }

    async fn lines_for(&self, order_id: &str) -> Result<Vec<PurchaseOrderLine>, DbError> {
        let rows: Vec<LineRow> = sqlx::query_as(&format!(
            "SELECT {} FROM purchase_order_lines WHERE order_id = ? ORDER BY description ASC",
            LINE_COLUMNS
        ))
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }
}

#[cfg(feature = "database")]
async fn insert_line_sqlite(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    line: &PurchaseOrderLine,
) -> Result<(), DbError> {
    sqlx::query(
        r#"
        INSERT INTO purchase_order_lines (id, order_id, description, quantity, unit_price_cents, consumable_item_id)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(line.id.to_string())
    .bind(line.order_id.to_string())
    .bind(&line.description)
    .bind(line.quantity)
    .bind(line.unit_price_cents)
    .bind(line.consumable_item_id.map(|id| id.to_string()))
    .execute(&mut **tx)
    .await?;

    Ok(())
}

#[cfg(feature = "database")]
#[async_trait]
impl PurchaseOrderRepository for SqlitePurchaseOrderRepository {
    async fn create(&self, order: &PurchaseOrder) -> Result<PurchaseOrder, DbError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO purchase_orders (id, order_number, supplier_id, status, submitted_at, received_at, notes, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(order.id.to_string())
        .bind(&order.order_number)
        .bind(order.supplier_id.to_string())
        .bind(order.status.as_db_str())
        .bind(order.submitted_at.map(|t| t.to_rfc3339()))
        .bind(order.received_at.map(|t| t.to_rfc3339()))
        .bind(&order.notes)
        .bind(order.created_at.to_rfc3339())
        .bind(order.updated_at.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        for line in &order.lines {
            insert_line_sqlite(&mut tx, line).await?;
        }

        tx.commit().await?;

        Ok(order.clone())
    }

    async fn get(&self, id: Uuid) -> Result<Option<PurchaseOrder>, DbError> {
        let row: Option<OrderRow> = sqlx::query_as(&format!(
            "SELECT {} FROM purchase_orders WHERE id = ?",
            ORDER_COLUMNS
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let lines = self.lines_for(&row.id).await?;
                Ok(Some(row.into_order(lines)?))
            }
            None => Ok(None),
        }
    }

    async fn get_by_number(&self, order_number: &str) -> Result<Option<PurchaseOrder>, DbError> {
        let row: Option<OrderRow> = sqlx::query_as(&format!(
            "SELECT {} FROM purchase_orders WHERE order_number = ?",
            ORDER_COLUMNS
        ))
        .bind(order_number)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let lines = self.lines_for(&row.id).await?;
                Ok(Some(row.into_order(lines)?))
            }
            None => Ok(None),
        }
    }

    async fn list(
        &self,
        filter: &PurchaseOrderFilter,
        pagination: &Pagination,
    ) -> Result<PaginatedResult<PurchaseOrder>, DbError> {
        use super::make_like_pattern;

        let mut query = format!("SELECT {} FROM purchase_orders WHERE 1=1", ORDER_COLUMNS);
        let mut count_query = String::from("SELECT COUNT(*) FROM purchase_orders WHERE 1=1");

        let clauses = |q: &mut String| {
            if filter.status.is_some() {
                q.push_str(" AND status = ?");
            }
            if filter.supplier_id.is_some() {
                q.push_str(" AND supplier_id = ?");
            }
            if filter.search.is_some() {
                q.push_str(" AND order_number LIKE ? ESCAPE '\\'");
            }
        };
        clauses(&mut query);
        clauses(&mut count_query);
        query.push_str(" ORDER BY created_at DESC LIMIT ? OFFSET ?");

        let pattern = filter.search.as_deref().map(make_like_pattern);

        let mut rows_q = sqlx::query_as::<_, OrderRow>(&query);
        let mut count_q = sqlx::query_scalar::<_, i64>(&count_query);

        if let Some(status) = filter.status {
            rows_q = rows_q.bind(status.as_db_str());
            count_q = count_q.bind(status.as_db_str());
        }
        if let Some(supplier_id) = filter.supplier_id {
            rows_q = rows_q.bind(supplier_id.to_string());
            count_q = count_q.bind(supplier_id.to_string());
        }
        if let Some(pattern) = &pattern {
            rows_q = rows_q.bind(pattern.clone());
            count_q = count_q.bind(pattern.clone());
        }

        rows_q = rows_q
            .bind(pagination.limit() as i64)
            .bind(pagination.offset() as i64);

        let rows: Vec<OrderRow> = rows_q.fetch_all(&self.pool).await?;
        let total: i64 = count_q.fetch_one(&self.pool).await?;

        let mut orders = Vec::with_capacity(rows.len());
        for row in rows {
            let lines = self.lines_for(&row.id).await?;
            orders.push(row.into_order(lines)?);
        }

        Ok(PaginatedResult::new(orders, total as u64, pagination))
    }

    async fn update(
        &self,
        id: Uuid,
        update: &PurchaseOrderUpdate,
    ) -> Result<PurchaseOrder, DbError> {
        let now = Utc::now().to_rfc3339();

        let mut set_clauses = vec!["updated_at = ?".to_string()];
        let mut values: Vec<String> = vec![now];

        if let Some(supplier_id) = update.supplier_id {
            set_clauses.push("supplier_id = ?".to_string());
            values.push(supplier_id.to_string());
        }
        if let Some(notes) = &update.notes {
            set_clauses.push("notes = ?".to_string());
            values.push(notes.clone());
        }

        let query = format!(
            "UPDATE purchase_orders SET {} WHERE id = ?",
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
            .ok_or_else(|| DbError::not_found("PurchaseOrder", id))
    }

    async fn replace_lines(
        &self,
        id: Uuid,
        lines: &[PurchaseOrderLine],
    ) -> Result<PurchaseOrder, DbError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM purchase_order_lines WHERE order_id = ?")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await?;

        for line in lines {
            insert_line_sqlite(&mut tx, line).await?;
        }

        sqlx::query("UPDATE purchase_orders SET updated_at = ? WHERE id = ?")
            .bind(Utc::now().to_rfc3339())
            .bind(id.to_string())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        self.get(id)
            .await?
            .ok_or_else(|| DbError::not_found("PurchaseOrder", id))
    }

    async fn set_status(&self, id: Uuid, status: OrderStatus) -> Result<PurchaseOrder, DbError> {
        let now = Utc::now().to_rfc3339();

        let stamp_column = match status {
            OrderStatus::Submitted => Some("submitted_at"),
            OrderStatus::Received => Some("received_at"),
            _ => None,
        };

        let query = match stamp_column {
            Some(column) => format!(
                "UPDATE purchase_orders SET status = ?, {} = ?, updated_at = ? WHERE id = ?",
                column
            ),
            None => "UPDATE purchase_orders SET status = ?, updated_at = ? WHERE id = ?".to_string(),
        };

        let mut query_builder = sqlx::query(&query).bind(status.as_db_str());
        if stamp_column.is_some() {
            query_builder = query_builder.bind(&now);
        }
        query_builder = query_builder.bind(&now).bind(id.to_string());

        let result = query_builder.execute(&self.pool).await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("PurchaseOrder", id));
        }

        self.get(id)
            .await?
            .ok_or_else(|| DbError::not_found("PurchaseOrder", id))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM purchase_orders WHERE id = ?")
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
struct PgOrderRow {
    id: Uuid,
    order_number: String,
    supplier_id: Uuid,
    status: String,
    submitted_at: Option<DateTime<Utc>>,
    received_at: Option<DateTime<Utc>>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[cfg(feature = "database")]
impl PgOrderRow {
    fn into_order(self, lines: Vec<PurchaseOrderLine>) -> Result<PurchaseOrder, DbError> {
        Ok(PurchaseOrder {
            id: self.id,
            order_number: self.order_number,
            supplier_id: self.supplier_id,
            status: OrderStatus::from_db_str(&self.status).ok_or_else(|| {
                DbError::Serialization(format!("Unknown order status: {}", self.status))
            })?,
            lines,
            submitted_at: self.submitted_at,
            received_at: self.received_at,
            notes: self.notes,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[cfg(feature = "database")]
#[derive(sqlx::FromRow)]
struct PgLineRow {
    id: Uuid,
    order_id: Uuid,
    description: String,
    quantity: i64,
    unit_price_cents: i64,
    consumable_item_id: Option<Uuid>,
}

#[cfg(feature = "database")]
impl From<PgLineRow> for PurchaseOrderLine {
    fn from(row: PgLineRow) -> Self {
        PurchaseOrderLine {
            id: row.id,
            order_id: row.order_id,
            description: row.description,
            quantity: row.quantity,
            unit_price_cents: row.unit_price_cents,
            consumable_item_id: row.consumable_item_id,
        }
    }
}

/// PostgreSQL implementation of PurchaseOrderRepository.
#[cfg(feature = "database")]
pub struct PgPurchaseOrderRepository {
    pool: sqlx::PgPool,
}

#[cfg(feature = "database")]
impl PgPurchaseOrderRepository {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }

    async fn lines_for(&self, order_id: Uuid) -> Result<Vec<PurchaseOrderLine>, DbError> {
        let rows: Vec<PgLineRow> = sqlx::query_as(&format!(
            "SELECT {} FROM purchase_order_lines WHERE order_id = $1 ORDER BY description ASC",
            LINE_COLUMNS
        ))
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}

#[cfg(feature = "database")]
async fn insert_line_pg(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    line: &PurchaseOrderLine,
) -> Result<(), DbError> {
    sqlx::query(
        r#"
        INSERT INTO purchase_order_lines (id, order_id, description, quantity, unit_price_cents, consumable_item_id)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(line.id)
    .bind(line.order_id)
    .bind(&line.description)
    .bind(line.quantity)
    .bind(line.unit_price_cents)
    .bind(line.consumable_item_id)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

#[cfg(feature = "database")]
#[async_trait]
impl PurchaseOrderRepository for PgPurchaseOrderRepository {
    async fn create(&self, order: &PurchaseOrder) -> Result<PurchaseOrder, DbError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO purchase_orders (id, order_number, supplier_id, status, submitted_at, received_at, notes, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(order.id)
        .bind(&order.order_number)
        .bind(order.supplier_id)
        .bind(order.status.as_db_str())
        .bind(order.submitted_at)
        .bind(order.received_at)
        .bind(&order.notes)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *tx)
        .await?;

        for line in &order.lines {
            insert_line_pg(&mut tx, line).await?;
        }

        tx.commit().await?;

        Ok(order.clone())
    }

    async fn get(&self, id: Uuid) -> Result<Option<PurchaseOrder>, DbError> {
        let row: Option<PgOrderRow> = sqlx::query_as(&format!(
            "SELECT {} FROM purchase_orders WHERE id = $1",
            ORDER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let lines = self.lines_for(row.id).await?;
                Ok(Some(row.into_order(lines)?))
            }
            None => Ok(None),
        }
    }

    async fn get_by_number(&self, order_number: &str) -> Result<Option<PurchaseOrder>, DbError> {
        let row: Option<PgOrderRow> = sqlx::query_as(&format!(
            "SELECT {} FROM purchase_orders WHERE order_number = $1",
            ORDER_COLUMNS
        ))
        .bind(order_number)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let lines = self.lines_for(row.id).await?;
                Ok(Some(row.into_order(lines)?))
            }
            None => Ok(None),
        }
    }

    async fn list(
        &self,
        filter: &PurchaseOrderFilter,
        pagination: &Pagination,
    ) -> Result<PaginatedResult<PurchaseOrder>, DbError> {
        use super::make_like_pattern;

        let status = filter.status.map(|s| s.as_db_str());
        let pattern = filter.search.as_deref().map(make_like_pattern);

        let rows: Vec<PgOrderRow> = sqlx::query_as(&format!(
            r#"
            SELECT {}
            FROM purchase_orders
            WHERE ($1::text IS NULL OR status = $1)
              AND ($2::uuid IS NULL OR supplier_id = $2)
              AND ($3::text IS NULL OR order_number ILIKE $3)
            ORDER BY created_at DESC
            LIMIT $4 OFFSET $5
            "#,
            ORDER_COLUMNS
        ))
        .bind(status)
        .bind(filter.supplier_id)
        .bind(&pattern)
        .bind(pagination.limit() as i64)
        .bind(pagination.offset() as i64)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM purchase_orders
            WHERE ($1::text IS NULL OR status = $1)
              AND ($2::uuid IS NULL OR supplier_id = $2)
              AND ($3::text IS NULL OR order_number ILIKE $3)
            "#,
        )
        .bind(status)
        .bind(filter.supplier_id)
        .bind(&pattern)
        .fetch_one(&self.pool)
        .await?;

        let mut orders = Vec::with_capacity(rows.len());
        for row in rows {
            let lines = self.lines_for(row.id).await?;
            orders.push(row.into_order(lines)?);
        }

        Ok(PaginatedResult::new(orders, total as u64, pagination))
    }

    async fn update(
        &self,
        id: Uuid,
        update: &PurchaseOrderUpdate,
    ) -> Result<PurchaseOrder, DbError> {
        sqlx::query(
            r#"
            UPDATE purchase_orders SET
                supplier_id = COALESCE($2, supplier_id),
                notes = COALESCE($3, notes),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(update.supplier_id)
        .bind(&update.notes)
        .execute(&self.pool)
        .await?;

        self.get(id)
            .await?
            .ok_or_else(|| DbError::not_found("PurchaseOrder", id))
    }

    async fn replace_lines(
        &self,
        id: Uuid,
        lines: &[PurchaseOrderLine],
    ) -> Result<PurchaseOrder, DbError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM purchase_order_lines WHERE order_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        for line in lines {
            insert_line_pg(&mut tx, line).await?;
        }

        sqlx::query("UPDATE purchase_orders SET updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        self.get(id)
            .await?
            .ok_or_else(|| DbError::not_found("PurchaseOrder", id))
    }

    async fn set_status(&self, id: Uuid, status: OrderStatus) -> Result<PurchaseOrder, DbError> {
        let result = sqlx::query(
            r#"
            UPDATE purchase_orders SET
                status = $2,
                submitted_at = CASE WHEN $2 = 'submitted' THEN NOW() ELSE submitted_at END,
                received_at = CASE WHEN $2 = 'received' THEN NOW() ELSE received_at END,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(status.as_db_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("PurchaseOrder", id));
        }

        self.get(id)
            .await?
            .ok_or_else(|| DbError::not_found("PurchaseOrder", id))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM purchase_orders WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// Factory function to create the appropriate repository based on pool type.
#[cfg(feature = "database")]
pub fn create_purchase_order_repository(pool: &DbPool) -> Box<dyn PurchaseOrderRepository> {
    match pool {
        DbPool::Sqlite(pool) => Box::new(SqlitePurchaseOrderRepository::new(pool.clone())),
        DbPool::Postgres(pool) => Box::new(PgPurchaseOrderRepository::new(pool.clone())),
    }
}
