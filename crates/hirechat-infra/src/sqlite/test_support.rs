//! Temp-database fixtures for the SQLite repository tests.

use hirechat_types::identity::{ApplicationId, JobApplication, UserId};
use tempfile::TempDir;
use uuid::Uuid;

use super::application::SqliteApplicationDirectory;
use super::pool::{DatabasePool, database_url};

/// A migrated database in a temp directory, removed on drop.
pub(crate) struct TestDb {
    pub pool: DatabasePool,
    _dir: TempDir,
}

impl TestDb {
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let pool = DatabasePool::new(&database_url(dir.path())).await.unwrap();
        Self { pool, _dir: dir }
    }
}

/// Insert an application between two fresh users.
pub(crate) async fn register_application(db: &TestDb) -> JobApplication {
    let application = JobApplication {
        id: ApplicationId::new(),
        employer_id: UserId::new(),
        candidate_id: UserId::new(),
    };
    SqliteApplicationDirectory::new(db.pool.clone())
        .register(&application, Uuid::now_v7())
        .await
        .unwrap();
    application
}
