//! Session-token lookup for the identity collaborator's `user_sessions` table.
//!
//! Tokens are never stored; only their lowercase hex SHA-256 digest is.

use chrono::{Duration, Utc};
use hirechat_types::error::RepositoryError;
use hirechat_types::identity::UserId;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::codec::{format_datetime, parse_id, query_error};
use super::pool::DatabasePool;

/// Prefix of tokens minted by [`SqliteSessionStore::issue`].
pub const TOKEN_PREFIX: &str = "hct_";

/// Compute SHA-256 hash of a session token (lowercase hex).
pub fn hash_token(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    format!("{:x}", digest)
}

/// Resolves bearer tokens to users.
#[derive(Clone)]
pub struct SqliteSessionStore {
    pool: DatabasePool,
}

impl SqliteSessionStore {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    /// The user owning an unexpired session for `token`, if any.
    pub async fn resolve(&self, token: &str) -> Result<Option<UserId>, RepositoryError> {
        let row: Option<(String,)> = sqlx::query_as(
            "SELECT user_id FROM user_sessions WHERE token_hash = ? AND expires_at > ?",
        )
        .bind(hash_token(token))
        .bind(format_datetime(&Utc::now()))
        .fetch_optional(&self.pool.reader)
        .await
        .map_err(query_error)?;

        row.map(|(user_id,)| parse_id(&user_id, "user")).transpose()
    }

    /// Mint a session for `user_id` valid for `ttl`, returning the plaintext
    /// token. Only its hash is persisted.
    pub async fn issue(&self, user_id: &UserId, ttl: Duration) -> Result<String, RepositoryError> {
        let token = format!(
            "{TOKEN_PREFIX}{}{}",
            Uuid::new_v4().simple(),
            Uuid::new_v4().simple()
        );
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO user_sessions (token_hash, user_id, created_at, expires_at) \
             VALUES (?, ?, ?, ?)",
        )
        .bind(hash_token(&token))
        .bind(user_id.to_string())
        .bind(format_datetime(&now))
        .bind(format_datetime(&(now + ttl)))
        .execute(&self.pool.writer)
        .await
        .map_err(query_error)?;

        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::test_support::TestDb;

    #[test]
    fn hash_is_hex_sha256() {
        let hash = hash_token("hct_example");
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(hash, hash_token("hct_other"));
    }

    #[tokio::test]
    async fn issued_token_resolves_to_user() {
        let db = TestDb::new().await;
        let store = SqliteSessionStore::new(db.pool.clone());
        let user = UserId::new();

        let token = store.issue(&user, Duration::hours(1)).await.unwrap();
        assert!(token.starts_with(TOKEN_PREFIX));
        assert_eq!(store.resolve(&token).await.unwrap(), Some(user));
        assert_eq!(store.resolve("hct_forged").await.unwrap(), None);
    }

    #[tokio::test]
    async fn expired_session_is_rejected() {
        let db = TestDb::new().await;
        let store = SqliteSessionStore::new(db.pool.clone());

        let token = store.issue(&UserId::new(), Duration::seconds(-1)).await.unwrap();
        assert_eq!(store.resolve(&token).await.unwrap(), None);
    }
}
