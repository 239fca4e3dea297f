//! Stock ledger service.
//!
//! Every change to a consumable's on-hand count goes through this service:
//! a quantity check, one atomic repo movement (count update + ledger row),
//! and an event. Requests that exceed the on-hand count are rejected whole;
//! nothing moves.

use crate::db::{ConsumableRepository, DbError, MovementOutcome, StockMovement};
use crate::events::{DeskEvent, EventBus};
use crate::models::{ConsumableItem, ConsumableTransaction, TransactionKind};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

/// Errors from stock operations.
#[derive(Error, Debug)]
pub enum StockError {
    /// The requested quantity is not a positive number (or, for adjust,
    /// not a non-negative number).
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(i64),

    /// An issue asked for more than is on hand.
    #[error("Insufficient stock: requested {requested}, on hand {on_hand}")]
    InsufficientStock { requested: i64, on_hand: i64 },

    /// The item does not exist.
    #[error("Consumable item {0} not found")]
    ItemNotFound(Uuid),

    /// Underlying database error.
    #[error(transparent)]
    Db(#[from] DbError),
}

/// Service coordinating consumable stock movements.
pub struct StockService {
    repo: Box<dyn ConsumableRepository>,
    events: EventBus,
}

impl StockService {
    pub fn new(repo: Box<dyn ConsumableRepository>, events: EventBus) -> Self {
        Self { repo, events }
    }

    /// Hands stock out to an employee.
    pub async fn issue(
        &self,
        item_id: Uuid,
        quantity: i64,
        employee_id: Option<Uuid>,
        note: Option<String>,
    ) -> Result<(ConsumableItem, ConsumableTransaction), StockError> {
        if quantity <= 0 {
            return Err(StockError::InvalidQuantity(quantity));
        }

        self.apply(StockMovement {
            item_id,
            kind: TransactionKind::Issue,
            quantity,
            employee_id,
            reference: None,
            note,
        })
        .await
    }

    /// Adds stock from a delivery or return.
    pub async fn restock(
        &self,
        item_id: Uuid,
        quantity: i64,
        reference: Option<String>,
        note: Option<String>,
    ) -> Result<(ConsumableItem, ConsumableTransaction), StockError> {
        if quantity <= 0 {
            return Err(StockError::InvalidQuantity(quantity));
        }

        self.apply(StockMovement {
            item_id,
            kind: TransactionKind::Restock,
            quantity,
            employee_id: None,
            reference,
            note,
        })
        .await
    }

    /// Corrects the on-hand count to an absolute value (stocktake).
    pub async fn adjust(
        &self,
        item_id: Uuid,
        new_count: i64,
        note: Option<String>,
    ) -> Result<(ConsumableItem, ConsumableTransaction), StockError> {
        if new_count < 0 {
            return Err(StockError::InvalidQuantity(new_count));
        }

        self.apply(StockMovement {
            item_id,
            kind: TransactionKind::Adjust,
            quantity: new_count,
            employee_id: None,
            reference: None,
            note,
        })
        .await
    }

    async fn apply(
        &self,
        movement: StockMovement,
    ) -> Result<(ConsumableItem, ConsumableTransaction), StockError> {
        let requested = movement.quantity;
        let item_id = movement.item_id;

        match self.repo.apply_movement(&movement).await {
            Ok(MovementOutcome::Applied { item, transaction }) => {
                info!(
                    item_id = %item.id,
                    kind = %transaction.kind,
                    quantity = transaction.quantity,
                    balance_after = transaction.balance_after,
                    "Stock moved"
                );
                self.events.publish(DeskEvent::StockMoved {
                    item_id: item.id,
                    kind: transaction.kind,
                    quantity: transaction.quantity,
                    balance_after: transaction.balance_after,
                });
                Ok((item, transaction))
            }
            Ok(MovementOutcome::Insufficient { on_hand }) => {
                warn!(
                    item_id = %item_id,
                    requested,
                    on_hand,
                    "Issue rejected: insufficient stock"
                );
                Err(StockError::InsufficientStock { requested, on_hand })
            }
            Err(DbError::NotFound { .. }) => Err(StockError::ItemNotFound(item_id)),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(all(test, feature = "database"))]
mod tests {
    use super::*;
    use crate::db::{create_consumable_repository, run_migrations, DbPool};
    use crate::models::ConsumableItem;

    async fn setup() -> (StockService, DbPool, Uuid) {
        let db_url = format!(
            "sqlite:file:stock_test_{}?mode=memory&cache=shared",
            Uuid::new_v4()
        );
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect(&db_url)
            .await
            .unwrap();
        let pool = DbPool::Sqlite(pool);
        run_migrations(&pool).await.unwrap();

        let repo = create_consumable_repository(&pool);
        let mut item = ConsumableItem::new("Toner cartridge", "TNR-42", "each");
        item.reorder_level = 2;
        let item = repo.create(&item).await.unwrap();

        let service = StockService::new(create_consumable_repository(&pool), EventBus::new(16));
        (service, pool, item.id)
    }

    #[tokio::test]
    async fn test_restock_then_issue() {
        let (service, _pool, item_id) = setup().await;

        let (item, tx) = service.restock(item_id, 10, None, None).await.unwrap();
        assert_eq!(item.quantity, 10);
        assert_eq!(tx.balance_after, 10);
        assert_eq!(tx.kind, TransactionKind::Restock);

        let (item, tx) = service
            .issue(item_id, 4, None, Some("desk move".to_string()))
            .await
            .unwrap();
        assert_eq!(item.quantity, 6);
        assert_eq!(tx.balance_after, 6);
        assert_eq!(tx.kind, TransactionKind::Issue);
    }

    #[tokio::test]
    async fn test_issue_more_than_on_hand_is_rejected() {
        let (service, pool, item_id) = setup().await;

        service.restock(item_id, 3, None, None).await.unwrap();

        let err = service.issue(item_id, 5, None, None).await.unwrap_err();
        match err {
            StockError::InsufficientStock { requested, on_hand } => {
                assert_eq!(requested, 5);
                assert_eq!(on_hand, 3);
            }
            other => panic!("unexpected error: {other}"),
        }

        // Nothing moved: count unchanged and only the restock in the ledger.
        let repo = create_consumable_repository(&pool);
        let item = repo.get(item_id).await.unwrap().unwrap();
        assert_eq!(item.quantity, 3);
        let ledger = repo
            .list_transactions(item_id, &crate::db::Pagination::default())
            .await
            .unwrap();
        assert_eq!(ledger.total, 1);
    }

    #[tokio::test]
    async fn test_adjust_sets_absolute_count() {
        let (service, _pool, item_id) = setup().await;

        service.restock(item_id, 8, None, None).await.unwrap();
        let (item, tx) = service.adjust(item_id, 5, None).await.unwrap();
        assert_eq!(item.quantity, 5);
        assert_eq!(tx.kind, TransactionKind::Adjust);
        assert_eq!(tx.quantity, 3);
        assert_eq!(tx.balance_after, 5);
    }

    #[tokio::test]
    async fn test_invalid_quantities_rejected() {
        let (service, _pool, item_id) = setup().await;

        assert!(matches!(
            service.issue(item_id, 0, None, None).await,
            Err(StockError::InvalidQuantity(0))
        ));
        assert!(matches!(
            service.restock(item_id, -3, None, None).await,
            Err(StockError::InvalidQuantity(-3))
        ));
        assert!(matches!(
            service.adjust(item_id, -1, None).await,
            Err(StockError::InvalidQuantity(-1))
        ));
    }

    #[tokio::test]
    async fn test_unknown_item() {
        let (service, _pool, _item_id) = setup().await;

        let missing = Uuid::new_v4();
        assert!(matches!(
            service.issue(missing, 1, None, None).await,
            Err(StockError::ItemNotFound(id)) if id == missing
        ));
    }
}
