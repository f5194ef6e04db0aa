//! Application state wiring all services together.
//!
//! AppState holds the concrete service instances used by both CLI and the
//! REST/WebSocket API. `MessagingService` is generic over storage ports;
//! AppState pins it to the SQLite implementations.

use std::path::PathBuf;
use std::sync::Arc;

use hirechat_core::event::TopicBus;
use hirechat_infra::config::{load_config, resolve_data_dir};
use hirechat_infra::messaging::{SqliteMessagingService, sqlite_messaging_service};
use hirechat_infra::sqlite::application::SqliteApplicationDirectory;
use hirechat_infra::sqlite::entitlement::SqliteEntitlementChecker;
use hirechat_infra::sqlite::pool::{DatabasePool, database_url};
use hirechat_infra::sqlite::session::SqliteSessionStore;
use hirechat_types::config::MessagingConfig;

/// Shared application state holding all services.
#[derive(Clone)]
pub struct AppState {
    pub messaging: Arc<SqliteMessagingService>,
    pub sessions: SqliteSessionStore,
    pub applications: SqliteApplicationDirectory,
    pub entitlements: SqliteEntitlementChecker,
    pub config: Arc<MessagingConfig>,
    pub data_dir: PathBuf,
    pub db_pool: DatabasePool,
}

impl AppState {
    /// Initialize the application state: load config, connect to DB, wire services.
    pub async fn init() -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();
        tokio::fs::create_dir_all(&data_dir).await?;

        let config = load_config(&data_dir).await;
        let db_pool = DatabasePool::new(&database_url(&data_dir)).await?;

        Ok(Self::wire(data_dir, db_pool, config))
    }

    /// Wire services over an already-open pool.
    pub fn wire(data_dir: PathBuf, db_pool: DatabasePool, config: MessagingConfig) -> Self {
        let bus = TopicBus::new(config.bus_capacity);
        Self {
            messaging: Arc::new(sqlite_messaging_service(&db_pool, bus)),
            sessions: SqliteSessionStore::new(db_pool.clone()),
            applications: SqliteApplicationDirectory::new(db_pool.clone()),
            entitlements: SqliteEntitlementChecker::new(db_pool.clone()),
            config: Arc::new(config),
            data_dir,
            db_pool,
        }
    }
}
