//! SQLite conversation repository implementation.
//!
//! Implements `ConversationRepository` from `hirechat-core`. The UNIQUE
//! constraint on `application_id` is what makes concurrent opens safe; a
//! violation is surfaced as `RepositoryError::Conflict` so the registry can
//! return the winning row.

use chrono::{DateTime, Utc};
use hirechat_core::repository::conversation::ConversationRepository;
use hirechat_types::conversation::{Conversation, ConversationId};
use hirechat_types::error::RepositoryError;
use hirechat_types::identity::{ApplicationId, ParticipantRole, UserId};
use sqlx::Row;

use super::codec::{format_datetime, parse_datetime, parse_id, query_error};
use super::pool::DatabasePool;

const COLUMNS: &str = "id, application_id, employer_id, candidate_id, created_at, \
                       employer_last_read_at, candidate_last_read_at";

/// SQLite-backed implementation of `ConversationRepository`.
#[derive(Clone)]
pub struct SqliteConversationRepository {
    pool: DatabasePool,
}

impl SqliteConversationRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

struct ConversationRow {
    id: String,
    application_id: String,
    employer_id: String,
    candidate_id: String,
    created_at: String,
    employer_last_read_at: String,
    candidate_last_read_at: String,
}

impl ConversationRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            application_id: row.try_get("application_id")?,
            employer_id: row.try_get("employer_id")?,
            candidate_id: row.try_get("candidate_id")?,
            created_at: row.try_get("created_at")?,
            employer_last_read_at: row.try_get("employer_last_read_at")?,
            candidate_last_read_at: row.try_get("candidate_last_read_at")?,
        })
    }

    fn into_conversation(self) -> Result<Conversation, RepositoryError> {
        Ok(Conversation {
            id: parse_id(&self.id, "conversation")?,
            application_id: parse_id(&self.application_id, "application")?,
            employer_id: parse_id(&self.employer_id, "employer")?,
            candidate_id: parse_id(&self.candidate_id, "candidate")?,
            created_at: parse_datetime(&self.created_at)?,
            employer_last_read_at: parse_datetime(&self.employer_last_read_at)?,
            candidate_last_read_at: parse_datetime(&self.candidate_last_read_at)?,
        })
    }
}

fn decode(row: &sqlx::sqlite::SqliteRow) -> Result<Conversation, RepositoryError> {
    ConversationRow::from_row(row)
        .map_err(query_error)?
        .into_conversation()
}

impl ConversationRepository for SqliteConversationRepository {
    async fn create(&self, conversation: &Conversation) -> Result<(), RepositoryError> {
        sqlx::query(&format!(
            "INSERT INTO conversations ({COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?)"
        ))
        .bind(conversation.id.to_string())
        .bind(conversation.application_id.to_string())
        .bind(conversation.employer_id.to_string())
        .bind(conversation.candidate_id.to_string())
        .bind(format_datetime(&conversation.created_at))
        .bind(format_datetime(&conversation.employer_last_read_at))
        .bind(format_datetime(&conversation.candidate_last_read_at))
        .execute(&self.pool.writer)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => RepositoryError::Conflict(
                format!(
                    "conversation for application {} already exists",
                    conversation.application_id
                ),
            ),
            other => query_error(other),
        })?;

        Ok(())
    }

    async fn get(&self, id: &ConversationId) -> Result<Option<Conversation>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {COLUMNS} FROM conversations WHERE id = ?"))
            .bind(id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_error)?;

        row.as_ref().map(decode).transpose()
    }

    async fn get_by_application(
        &self,
        application_id: &ApplicationId,
    ) -> Result<Option<Conversation>, RepositoryError> {
        // Read from the writer so a row inserted by a concurrent create is
        // always visible to the loser of the race.
        let row = sqlx::query(&format!(
            "SELECT {COLUMNS} FROM conversations WHERE application_id = ?"
        ))
        .bind(application_id.to_string())
        .fetch_optional(&self.pool.writer)
        .await
        .map_err(query_error)?;

        row.as_ref().map(decode).transpose()
    }

    async fn list_for_participant(
        &self,
        user: &UserId,
    ) -> Result<Vec<Conversation>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {COLUMNS} FROM conversations \
             WHERE employer_id = ?1 OR candidate_id = ?1 \
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(user.to_string())
        .fetch_all(&self.pool.reader)
        .await
        .map_err(query_error)?;

        rows.iter().map(decode).collect()
    }

    async fn advance_cursor(
        &self,
        id: &ConversationId,
        role: ParticipantRole,
        at: DateTime<Utc>,
    ) -> Result<DateTime<Utc>, RepositoryError> {
        // MAX() on fixed-width timestamps keeps the cursor monotonic even
        // when mark-read calls land out of order.
        let sql = match role {
            ParticipantRole::Employer => {
                "UPDATE conversations SET employer_last_read_at = MAX(employer_last_read_at, ?) \
                 WHERE id = ? RETURNING employer_last_read_at AS cursor"
            }
            ParticipantRole::Candidate => {
                "UPDATE conversations SET candidate_last_read_at = MAX(candidate_last_read_at, ?) \
                 WHERE id = ? RETURNING candidate_last_read_at AS cursor"
            }
        };

        let row = sqlx::query(sql)
            .bind(format_datetime(&at))
            .bind(id.to_string())
            .fetch_optional(&self.pool.writer)
            .await
            .map_err(query_error)?
            .ok_or(RepositoryError::NotFound)?;

        let cursor: String = row.try_get("cursor").map_err(query_error)?;
        parse_datetime(&cursor)
    }

    async fn count(&self) -> Result<u64, RepositoryError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM conversations")
            .fetch_one(&self.pool.reader)
            .await
            .map_err(query_error)?;
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::test_support::{TestDb, register_application};
    use chrono::Duration;
    use hirechat_types::time;

    async fn conversation(db: &TestDb) -> Conversation {
        let app = register_application(db).await;
        Conversation::for_application(&app, time::now())
    }

    #[tokio::test]
    async fn create_and_get_roundtrip() {
        let db = TestDb::new().await;
        let repo = SqliteConversationRepository::new(db.pool.clone());
        let conv = conversation(&db).await;

        repo.create(&conv).await.unwrap();

        assert_eq!(repo.get(&conv.id).await.unwrap(), Some(conv.clone()));
        assert_eq!(
            repo.get_by_application(&conv.application_id).await.unwrap(),
            Some(conv.clone())
        );
        assert_eq!(repo.get(&ConversationId::new()).await.unwrap(), None);
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn second_create_for_application_conflicts() {
        let db = TestDb::new().await;
        let repo = SqliteConversationRepository::new(db.pool.clone());
        let conv = conversation(&db).await;
        repo.create(&conv).await.unwrap();

        let rival = Conversation {
            id: ConversationId::new(),
            ..conv.clone()
        };
        let err = repo.create(&rival).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn list_for_participant_covers_both_roles() {
        let db = TestDb::new().await;
        let repo = SqliteConversationRepository::new(db.pool.clone());
        let a = conversation(&db).await;
        let b = conversation(&db).await;
        repo.create(&a).await.unwrap();
        repo.create(&b).await.unwrap();

        let as_employer = repo.list_for_participant(&a.employer_id).await.unwrap();
        assert_eq!(as_employer, vec![a.clone()]);
        let as_candidate = repo.list_for_participant(&b.candidate_id).await.unwrap();
        assert_eq!(as_candidate, vec![b.clone()]);
        assert!(repo.list_for_participant(&UserId::new()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn cursor_only_moves_forward() {
        let db = TestDb::new().await;
        let repo = SqliteConversationRepository::new(db.pool.clone());
        let conv = conversation(&db).await;
        repo.create(&conv).await.unwrap();

        let later = conv.created_at + Duration::seconds(30);
        let earlier = conv.created_at + Duration::seconds(10);

        let c = repo
            .advance_cursor(&conv.id, ParticipantRole::Candidate, later)
            .await
            .unwrap();
        assert_eq!(c, later);

        let c = repo
            .advance_cursor(&conv.id, ParticipantRole::Candidate, earlier)
            .await
            .unwrap();
        assert_eq!(c, later);

        let stored = repo.get(&conv.id).await.unwrap().unwrap();
        assert_eq!(stored.candidate_last_read_at, later);
        assert_eq!(stored.employer_last_read_at, conv.created_at);
    }

    #[tokio::test]
    async fn advance_cursor_on_missing_conversation() {
        let db = TestDb::new().await;
        let repo = SqliteConversationRepository::new(db.pool.clone());
        let err = repo
            .advance_cursor(&ConversationId::new(), ParticipantRole::Employer, time::now())
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound));
    }
}
