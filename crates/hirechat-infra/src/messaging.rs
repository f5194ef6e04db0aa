//! A messaging service wired to SQLite and an in-process topic bus.

use hirechat_core::event::TopicBus;
use hirechat_core::messaging::MessagingService;

use crate::sqlite::application::SqliteApplicationDirectory;
use crate::sqlite::conversation::SqliteConversationRepository;
use crate::sqlite::entitlement::SqliteEntitlementChecker;
use crate::sqlite::message::SqliteMessageRepository;
use crate::sqlite::pool::DatabasePool;

pub type SqliteMessagingService = MessagingService<
    SqliteConversationRepository,
    SqliteMessageRepository,
    SqliteApplicationDirectory,
    SqliteEntitlementChecker,
    TopicBus,
>;

/// Build the service over `pool`, publishing to and subscribing from `bus`.
pub fn sqlite_messaging_service(pool: &DatabasePool, bus: TopicBus) -> SqliteMessagingService {
    MessagingService::new(
        SqliteConversationRepository::new(pool.clone()),
        SqliteMessageRepository::new(pool.clone()),
        SqliteApplicationDirectory::new(pool.clone()),
        SqliteEntitlementChecker::new(pool.clone()),
        bus.clone(),
        bus,
    )
}
