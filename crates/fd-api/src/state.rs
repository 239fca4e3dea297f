//! Application state shared across handlers.

use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

use fd_core::db::DbPool;
use fd_core::{ChatService, EventBus, StockService};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub db: Arc<DbPool>,
    /// Event bus for in-process fan-out.
    pub event_bus: Arc<EventBus>,
    /// Stock ledger service.
    pub stock: Arc<StockService>,
    /// Chat routing service.
    pub chat: Arc<ChatService>,
    /// Prometheus metrics handle for rendering metrics.
    pub prometheus_handle: Option<Arc<PrometheusHandle>>,
}

impl AppState {
    /// Creates a new application state wiring the services to the pool.
    pub fn new(db: DbPool, event_bus: EventBus) -> Self {
        use fd_core::db::{
            create_chat_message_repository, create_consumable_repository,
            create_employee_repository, create_ticket_repository,
        };

        let stock = StockService::new(create_consumable_repository(&db), event_bus.clone());
        let chat = ChatService::new(
            create_ticket_repository(&db),
            create_chat_message_repository(&db),
            create_employee_repository(&db),
            event_bus.clone(),
        );

        Self {
            db: Arc::new(db),
            event_bus: Arc::new(event_bus),
            stock: Arc::new(stock),
            chat: Arc::new(chat),
            prometheus_handle: None,
        }
    }

    /// Attaches a Prometheus handle.
    pub fn with_prometheus_handle(mut self, handle: PrometheusHandle) -> Self {
        self.prometheus_handle = Some(Arc::new(handle));
        self
    }
}
