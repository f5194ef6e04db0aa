//! SQLite message repository implementation.
//!
//! Implements `MessageRepository` from `hirechat-core`. Appends run in a
//! transaction on the single writer connection, which makes the
//! "read floor, insert after it" step atomic per conversation. The inbox
//! digest is one windowed query regardless of how many conversations the
//! participant has.

use hirechat_core::repository::message::{MessageRepository, NewMessage};
use hirechat_types::conversation::{ConversationDigest, ConversationId};
use hirechat_types::error::RepositoryError;
use hirechat_types::identity::UserId;
use hirechat_types::message::{Message, MessageQuery};
use hirechat_types::time::TICK;
use sqlx::{QueryBuilder, Row, Sqlite};
use tracing::debug;

use super::codec::{format_datetime, parse_datetime, parse_id, query_error};
use super::pool::DatabasePool;

/// SQLite-backed implementation of `MessageRepository`.
#[derive(Clone)]
pub struct SqliteMessageRepository {
    pool: DatabasePool,
}

impl SqliteMessageRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

// ---------------------------------------------------------------------------
// Internal row types
// ---------------------------------------------------------------------------

struct MessageRow {
    id: String,
    conversation_id: String,
    sender_id: String,
    body: String,
    created_at: String,
}

impl MessageRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            conversation_id: row.try_get("conversation_id")?,
            sender_id: row.try_get("sender_id")?,
            body: row.try_get("body")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn into_message(self) -> Result<Message, RepositoryError> {
        Ok(Message {
            id: parse_id(&self.id, "message")?,
            conversation_id: parse_id(&self.conversation_id, "conversation")?,
            sender_id: parse_id(&self.sender_id, "sender")?,
            body: self.body,
            created_at: parse_datetime(&self.created_at)?,
        })
    }
}

fn decode(row: &sqlx::sqlite::SqliteRow) -> Result<Message, RepositoryError> {
    MessageRow::from_row(row).map_err(query_error)?.into_message()
}

struct DigestRow {
    conversation_id: String,
    unread_count: i64,
    latest_id: Option<String>,
    latest_sender_id: Option<String>,
    latest_body: Option<String>,
    latest_created_at: Option<String>,
}

impl DigestRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            conversation_id: row.try_get("conversation_id")?,
            unread_count: row.try_get("unread_count")?,
            latest_id: row.try_get("latest_id")?,
            latest_sender_id: row.try_get("latest_sender_id")?,
            latest_body: row.try_get("latest_body")?,
            latest_created_at: row.try_get("latest_created_at")?,
        })
    }

    fn into_digest(self) -> Result<ConversationDigest, RepositoryError> {
        let conversation_id: ConversationId = parse_id(&self.conversation_id, "conversation")?;
        let latest = match (
            self.latest_id,
            self.latest_sender_id,
            self.latest_body,
            self.latest_created_at,
        ) {
            (Some(id), Some(sender_id), Some(body), Some(created_at)) => Some(Message {
                id: parse_id(&id, "message")?,
                conversation_id,
                sender_id: parse_id(&sender_id, "sender")?,
                body,
                created_at: parse_datetime(&created_at)?,
            }),
            _ => None,
        };

        Ok(ConversationDigest {
            conversation_id,
            unread_count: u32::try_from(self.unread_count)
                .map_err(|e| RepositoryError::Query(format!("invalid unread count: {e}")))?,
            latest,
        })
    }
}

/// Per-conversation unread count (peer messages after the viewer's cursor)
/// and latest message, for every conversation of `?1`.
const DIGEST_SQL: &str = r#"
WITH mine AS (
    SELECT id,
           CASE WHEN employer_id = ?1 THEN employer_last_read_at
                ELSE candidate_last_read_at END AS read_cursor
    FROM conversations
    WHERE employer_id = ?1 OR candidate_id = ?1
),
ranked AS (
    SELECT m.id, m.conversation_id, m.sender_id, m.body, m.created_at,
           ROW_NUMBER() OVER (
               PARTITION BY m.conversation_id
               ORDER BY m.created_at DESC, m.id DESC
           ) AS rn
    FROM messages m
    JOIN mine ON mine.id = m.conversation_id
),
unread AS (
    SELECT m.conversation_id, COUNT(*) AS unread_count
    FROM messages m
    JOIN mine ON mine.id = m.conversation_id
    WHERE m.sender_id != ?1 AND m.created_at > mine.read_cursor
    GROUP BY m.conversation_id
)
SELECT mine.id AS conversation_id,
       COALESCE(unread.unread_count, 0) AS unread_count,
       ranked.id AS latest_id,
       ranked.sender_id AS latest_sender_id,
       ranked.body AS latest_body,
       ranked.created_at AS latest_created_at
FROM mine
LEFT JOIN ranked ON ranked.conversation_id = mine.id AND ranked.rn = 1
LEFT JOIN unread ON unread.conversation_id = mine.id
"#;

// ---------------------------------------------------------------------------
// MessageRepository impl
// ---------------------------------------------------------------------------

impl MessageRepository for SqliteMessageRepository {
    async fn append(&self, message: &NewMessage) -> Result<Message, RepositoryError> {
        let mut tx = self.pool.writer.begin().await.map_err(query_error)?;
        let conversation_id = message.conversation_id.to_string();

        let conversation = sqlx::query(
            "SELECT employer_id, candidate_id, created_at FROM conversations WHERE id = ?",
        )
        .bind(&conversation_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(query_error)?
        .ok_or(RepositoryError::NotFound)?;

        let sender = message.sender_id.to_string();
        let employer: String = conversation.try_get("employer_id").map_err(query_error)?;
        let candidate: String = conversation.try_get("candidate_id").map_err(query_error)?;
        if sender != employer && sender != candidate {
            return Err(RepositoryError::Conflict(
                "sender is not a participant of the conversation".into(),
            ));
        }

        let (latest,): (Option<String>,) =
            sqlx::query_as("SELECT MAX(created_at) FROM messages WHERE conversation_id = ?")
                .bind(&conversation_id)
                .fetch_one(&mut *tx)
                .await
                .map_err(query_error)?;
        let floor = match latest {
            Some(ts) => parse_datetime(&ts)?,
            None => {
                let created: String = conversation.try_get("created_at").map_err(query_error)?;
                parse_datetime(&created)?
            }
        };
        let created_at = message.requested_at.max(floor + TICK);

        sqlx::query(
            "INSERT INTO messages (id, conversation_id, sender_id, body, created_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(message.id.to_string())
        .bind(&conversation_id)
        .bind(&sender)
        .bind(&message.body)
        .bind(format_datetime(&created_at))
        .execute(&mut *tx)
        .await
        .map_err(query_error)?;

        tx.commit().await.map_err(query_error)?;

        if created_at != message.requested_at {
            debug!(
                message_id = %message.id,
                requested_at = %message.requested_at,
                %created_at,
                "message timestamp moved past conversation floor"
            );
        }

        Ok(Message {
            id: message.id,
            conversation_id: message.conversation_id,
            sender_id: message.sender_id,
            body: message.body.clone(),
            created_at,
        })
    }

    async fn list(
        &self,
        conversation_id: &ConversationId,
        query: &MessageQuery,
    ) -> Result<Vec<Message>, RepositoryError> {
        let mut qb = QueryBuilder::<Sqlite>::new(
            "SELECT id, conversation_id, sender_id, body, created_at FROM messages WHERE conversation_id = ",
        );
        qb.push_bind(conversation_id.to_string());

        if let Some(since) = query.since {
            qb.push(" AND created_at >= ").push_bind(format_datetime(&since));
        }
        if let Some(after) = query.after {
            let ts = format_datetime(&after.created_at);
            qb.push(" AND (created_at > ")
                .push_bind(ts.clone())
                .push(" OR (created_at = ")
                .push_bind(ts)
                .push(" AND id > ")
                .push_bind(after.id.to_string())
                .push("))");
        }
        qb.push(" ORDER BY created_at ASC, id ASC");
        if let Some(limit) = query.limit {
            qb.push(" LIMIT ").push_bind(i64::from(limit));
        }

        let rows = qb
            .build()
            .fetch_all(&self.pool.reader)
            .await
            .map_err(query_error)?;

        rows.iter().map(decode).collect()
    }

    async fn latest(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Option<Message>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, conversation_id, sender_id, body, created_at FROM messages \
             WHERE conversation_id = ? ORDER BY created_at DESC, id DESC LIMIT 1",
        )
        .bind(conversation_id.to_string())
        .fetch_optional(&self.pool.reader)
        .await
        .map_err(query_error)?;

        row.as_ref().map(decode).transpose()
    }

    async fn digests_for_participant(
        &self,
        user: &UserId,
    ) -> Result<Vec<ConversationDigest>, RepositoryError> {
        let rows = sqlx::query(DIGEST_SQL)
            .bind(user.to_string())
            .fetch_all(&self.pool.reader)
            .await
            .map_err(query_error)?;

        rows.iter()
            .map(|row| {
                DigestRow::from_row(row)
                    .map_err(query_error)?
                    .into_digest()
            })
            .collect()
    }

    async fn count(&self) -> Result<u64, RepositoryError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM messages")
            .fetch_one(&self.pool.reader)
            .await
            .map_err(query_error)?;
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::conversation::SqliteConversationRepository;
    use crate::sqlite::test_support::{TestDb, register_application};
    use chrono::Duration;
    use hirechat_core::repository::conversation::ConversationRepository;
    use hirechat_types::conversation::Conversation;
    use hirechat_types::identity::ParticipantRole;
    use hirechat_types::message::MessageId;
    use hirechat_types::time;

    struct Fixture {
        db: TestDb,
        conversations: SqliteConversationRepository,
        messages: SqliteMessageRepository,
    }

    impl Fixture {
        async fn new() -> Self {
            let db = TestDb::new().await;
            Self {
                conversations: SqliteConversationRepository::new(db.pool.clone()),
                messages: SqliteMessageRepository::new(db.pool.clone()),
                db,
            }
        }

        async fn conversation(&self) -> Conversation {
            let app = register_application(&self.db).await;
            let conv = Conversation::for_application(&app, time::now());
            self.conversations.create(&conv).await.unwrap();
            conv
        }

        async fn append(&self, conv: &Conversation, sender: UserId, body: &str) -> Message {
            self.append_at(conv, sender, body, time::now()).await
        }

        async fn append_at(
            &self,
            conv: &Conversation,
            sender: UserId,
            body: &str,
            requested_at: chrono::DateTime<chrono::Utc>,
        ) -> Message {
            self.messages
                .append(&NewMessage {
                    id: MessageId::new(),
                    conversation_id: conv.id,
                    sender_id: sender,
                    body: body.to_string(),
                    requested_at,
                })
                .await
                .unwrap()
        }
    }

    #[tokio::test]
    async fn append_then_list_in_order() {
        let fx = Fixture::new().await;
        let conv = fx.conversation().await;

        let a = fx.append(&conv, conv.employer_id, "Hi").await;
        let b = fx.append(&conv, conv.candidate_id, "Hello").await;

        let all = fx.messages.list(&conv.id, &MessageQuery::all()).await.unwrap();
        assert_eq!(all, vec![a, b.clone()]);
        assert_eq!(fx.messages.latest(&conv.id).await.unwrap(), Some(b));
        assert_eq!(fx.messages.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn stale_clock_is_moved_past_the_floor() {
        let fx = Fixture::new().await;
        let conv = fx.conversation().await;

        let first = fx.append(&conv, conv.employer_id, "first").await;
        let skewed = fx
            .append_at(&conv, conv.candidate_id, "second", first.created_at - Duration::hours(1))
            .await;
        assert_eq!(skewed.created_at, first.created_at + TICK);
    }

    #[tokio::test]
    async fn first_message_lands_after_conversation_creation() {
        let fx = Fixture::new().await;
        let conv = fx.conversation().await;

        let msg = fx
            .append_at(&conv, conv.employer_id, "early", conv.created_at - Duration::days(1))
            .await;
        assert_eq!(msg.created_at, conv.created_at + TICK);
    }

    #[tokio::test]
    async fn append_rejects_outsiders_and_missing_conversations() {
        let fx = Fixture::new().await;
        let conv = fx.conversation().await;

        let outsider = fx
            .messages
            .append(&NewMessage {
                id: MessageId::new(),
                conversation_id: conv.id,
                sender_id: UserId::new(),
                body: "spam".into(),
                requested_at: time::now(),
            })
            .await;
        assert!(matches!(outsider, Err(RepositoryError::Conflict(_))));

        let missing = fx
            .messages
            .append(&NewMessage {
                id: MessageId::new(),
                conversation_id: ConversationId::new(),
                sender_id: conv.employer_id,
                body: "hello?".into(),
                requested_at: time::now(),
            })
            .await;
        assert!(matches!(missing, Err(RepositoryError::NotFound)));
        assert_eq!(fx.messages.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn since_after_and_limit() {
        let fx = Fixture::new().await;
        let conv = fx.conversation().await;
        let mut sent = Vec::new();
        for i in 0..5 {
            sent.push(fx.append(&conv, conv.employer_id, &format!("m{i}")).await);
        }

        let since = fx
            .messages
            .list(&conv.id, &MessageQuery::since(sent[2].created_at))
            .await
            .unwrap();
        assert_eq!(since, sent[2..].to_vec());

        let page = fx
            .messages
            .list(&conv.id, &MessageQuery::after(sent[1].cursor()).with_limit(2))
            .await
            .unwrap();
        assert_eq!(page, sent[2..4].to_vec());

        let tail = fx
            .messages
            .list(&conv.id, &MessageQuery::after(sent[4].cursor()))
            .await
            .unwrap();
        assert!(tail.is_empty());
    }

    #[tokio::test]
    async fn concurrent_appends_get_distinct_increasing_timestamps() {
        let fx = Fixture::new().await;
        let conv = fx.conversation().await;
        let at = time::now();

        let (a, b, c) = tokio::join!(
            fx.append_at(&conv, conv.employer_id, "a", at),
            fx.append_at(&conv, conv.candidate_id, "b", at),
            fx.append_at(&conv, conv.employer_id, "c", at),
        );
        let mut stamps = vec![a.created_at, b.created_at, c.created_at];
        stamps.sort();
        stamps.dedup();
        assert_eq!(stamps.len(), 3);

        let listed = fx.messages.list(&conv.id, &MessageQuery::all()).await.unwrap();
        assert!(listed.windows(2).all(|w| w[0].created_at < w[1].created_at));
    }

    #[tokio::test]
    async fn digests_count_peer_messages_after_cursor() {
        let fx = Fixture::new().await;
        let busy = fx.conversation().await;
        let employer = busy.employer_id;

        fx.append(&busy, employer, "Hi").await;
        fx.append(&busy, busy.candidate_id, "Hello").await;
        let last = fx.append(&busy, busy.candidate_id, "When can we talk?").await;

        // Conversation with no messages yet, same employer.
        let app = register_application(&fx.db).await;
        let quiet = Conversation {
            employer_id: employer,
            ..Conversation::for_application(&app, time::now())
        };
        fx.conversations.create(&quiet).await.unwrap();

        let digests = fx.messages.digests_for_participant(&employer).await.unwrap();
        assert_eq!(digests.len(), 2);

        let busy_digest = digests.iter().find(|d| d.conversation_id == busy.id).unwrap();
        assert_eq!(busy_digest.unread_count, 2);
        assert_eq!(busy_digest.latest.as_ref(), Some(&last));

        let quiet_digest = digests.iter().find(|d| d.conversation_id == quiet.id).unwrap();
        assert_eq!(quiet_digest.unread_count, 0);
        assert!(quiet_digest.latest.is_none());

        fx.conversations
            .advance_cursor(&busy.id, ParticipantRole::Employer, last.created_at)
            .await
            .unwrap();
        let digests = fx.messages.digests_for_participant(&employer).await.unwrap();
        let busy_digest = digests.iter().find(|d| d.conversation_id == busy.id).unwrap();
        assert_eq!(busy_digest.unread_count, 0);

        let candidate_view = fx
            .messages
            .digests_for_participant(&busy.candidate_id)
            .await
            .unwrap();
        assert_eq!(candidate_view.len(), 1);
        assert_eq!(candidate_view[0].unread_count, 1);
    }
}
