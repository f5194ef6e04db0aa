//! Read access to employer subscription entitlements.

use chrono::{DateTime, Utc};
use hirechat_core::repository::entitlement::EntitlementChecker;
use hirechat_types::error::RepositoryError;
use hirechat_types::identity::UserId;

use super::codec::{format_datetime, query_error};
use super::pool::DatabasePool;

/// SQLite-backed implementation of `EntitlementChecker`.
///
/// An employer is entitled while `active_until` lies in the future.
#[derive(Clone)]
pub struct SqliteEntitlementChecker {
    pool: DatabasePool,
}

impl SqliteEntitlementChecker {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    /// Grant (or extend) an entitlement until `active_until`.
    ///
    /// Normally written by billing; exposed for local development and tests.
    pub async fn grant(
        &self,
        employer_id: &UserId,
        active_until: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO employer_entitlements (employer_id, active_until) VALUES (?, ?) \
             ON CONFLICT(employer_id) DO UPDATE SET active_until = excluded.active_until",
        )
        .bind(employer_id.to_string())
        .bind(format_datetime(&active_until))
        .execute(&self.pool.writer)
        .await
        .map_err(query_error)?;
        Ok(())
    }
}

impl EntitlementChecker for SqliteEntitlementChecker {
    async fn has_active_entitlement(&self, employer_id: &UserId) -> Result<bool, RepositoryError> {
        let (active,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM employer_entitlements WHERE employer_id = ? AND active_until > ?",
        )
        .bind(employer_id.to_string())
        .bind(format_datetime(&Utc::now()))
        .fetch_one(&self.pool.reader)
        .await
        .map_err(query_error)?;
        Ok(active > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::test_support::TestDb;
    use chrono::Duration;

    #[tokio::test]
    async fn entitlement_expires() {
        let db = TestDb::new().await;
        let checker = SqliteEntitlementChecker::new(db.pool.clone());
        let employer = UserId::new();

        assert!(!checker.has_active_entitlement(&employer).await.unwrap());

        checker.grant(&employer, Utc::now() + Duration::days(30)).await.unwrap();
        assert!(checker.has_active_entitlement(&employer).await.unwrap());

        checker.grant(&employer, Utc::now() - Duration::days(1)).await.unwrap();
        assert!(!checker.has_active_entitlement(&employer).await.unwrap());
    }
}
