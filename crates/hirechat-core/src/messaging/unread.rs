//! Unread aggregation for the inbox view.
//!
//! Unread counts and previews are derived from the message log and the
//! viewer's read cursor, fetched in one batch for all of a participant's
//! conversations. A mark-read racing an inbox fetch can leave one refresh
//! showing a slightly higher count; the next fetch converges.

use std::cmp::Reverse;
use std::collections::HashMap;

use hirechat_types::conversation::{ConversationDigest, ConversationId, InboxEntry};
use hirechat_types::error::MessagingError;
use hirechat_types::identity::UserId;
use tracing::debug;

use crate::repository::conversation::ConversationRepository;
use crate::repository::message::MessageRepository;

/// Sort inbox entries by latest activity, newest first.
///
/// Conversations without messages use their own creation time. Ties break
/// on conversation id so the order is stable across refreshes.
pub fn sort_inbox(entries: &mut [InboxEntry]) {
    entries.sort_by_key(|e| Reverse((e.activity_at(), e.conversation.id)));
}

/// Builds a participant's inbox from the conversation and message stores.
#[derive(Clone)]
pub struct UnreadAggregator<C: ConversationRepository, M: MessageRepository> {
    conversations: C,
    messages: M,
}

impl<C: ConversationRepository, M: MessageRepository> UnreadAggregator<C, M> {
    pub fn new(conversations: C, messages: M) -> Self {
        Self {
            conversations,
            messages,
        }
    }

    /// Every conversation of `participant` with its preview and unread
    /// count, ordered for the inbox.
    ///
    /// Issues exactly two fetches regardless of how many conversations the
    /// participant has.
    pub async fn inbox(&self, participant: &UserId) -> Result<Vec<InboxEntry>, MessagingError> {
        let conversations = self.conversations.list_for_participant(participant).await?;
        let mut digests: HashMap<ConversationId, ConversationDigest> = self
            .messages
            .digests_for_participant(participant)
            .await?
            .into_iter()
            .map(|d| (d.conversation_id, d))
            .collect();

        let mut entries: Vec<InboxEntry> = conversations
            .into_iter()
            .filter_map(|conversation| {
                let role = conversation.role_of(participant)?;
                let digest = digests.remove(&conversation.id);
                Some(InboxEntry {
                    role,
                    unread_count: digest.as_ref().map_or(0, |d| d.unread_count),
                    preview: digest.and_then(|d| d.latest),
                    conversation,
                })
            })
            .collect();

        sort_inbox(&mut entries);
        debug!(
            user_id = %participant,
            conversations = entries.len(),
            "inbox aggregated"
        );
        Ok(entries)
    }

    /// Unread count for one conversation, served from the same batched fetch.
    pub async fn unread_count(
        &self,
        participant: &UserId,
        conversation_id: &ConversationId,
    ) -> Result<u32, MessagingError> {
        let digests = self.messages.digests_for_participant(participant).await?;
        Ok(digests
            .into_iter()
            .find(|d| d.conversation_id == *conversation_id)
            .map_or(0, |d| d.unread_count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::store::MessageStore;
    use crate::repository::message::NewMessage;
    use crate::testing::{InMemoryStore, digest};
    use chrono::{DateTime, Duration, Utc};
    use hirechat_types::conversation::Conversation;
    use hirechat_types::message::{Message, MessageId};

    async fn conversation(store: &InMemoryStore, employer: UserId, candidate: UserId) -> Conversation {
        let app = store.add_application(employer, candidate);
        let conv = Conversation::for_application(&app, hirechat_types::time::now());
        store.create(&conv).await.unwrap();
        conv
    }

    async fn append_at(
        store: &InMemoryStore,
        conv: &Conversation,
        sender: UserId,
        body: &str,
        at: DateTime<Utc>,
    ) -> Message {
        store
            .append(&NewMessage {
                id: MessageId::new(),
                conversation_id: conv.id,
                sender_id: sender,
                body: body.to_string(),
                requested_at: at,
            })
            .await
            .unwrap()
    }

    #[test]
    fn test_digest_counts_only_peer_messages_after_cursor() {
        let employer = UserId::new();
        let candidate = UserId::new();
        let t0 = Utc::now();
        let mut conv = Conversation::for_application(
            &hirechat_types::identity::JobApplication {
                id: hirechat_types::identity::ApplicationId::new(),
                employer_id: employer,
                candidate_id: candidate,
            },
            t0,
        );
        conv.candidate_last_read_at = t0 + Duration::seconds(2);

        let msg = |sender, secs| Message {
            id: MessageId::new(),
            conversation_id: conv.id,
            sender_id: sender,
            body: format!("at {secs}"),
            created_at: t0 + Duration::seconds(secs),
        };
        let log = vec![
            msg(employer, 1),
            msg(employer, 2),
            msg(employer, 3),
            msg(candidate, 4),
            msg(employer, 5),
        ];

        let d = digest(&conv, &candidate, &log);
        // t=3 and t=5 are from the employer and after the cursor; t=2 is not after.
        assert_eq!(d.unread_count, 2);
        assert_eq!(d.latest.unwrap().body, "at 5");

        let d = digest(&conv, &employer, &log);
        assert_eq!(d.unread_count, 1);
    }

    #[tokio::test]
    async fn test_inbox_uses_one_batched_fetch() {
        let store = InMemoryStore::new();
        let me = UserId::new();
        for _ in 0..5 {
            conversation(&store, me, UserId::new()).await;
        }
        let aggregator = UnreadAggregator::new(store.clone(), store.clone());

        let inbox = aggregator.inbox(&me).await.unwrap();
        assert_eq!(inbox.len(), 5);
        assert_eq!(store.digest_fetches(), 1);
    }

    #[tokio::test]
    async fn test_inbox_orders_by_latest_activity() {
        let store = InMemoryStore::new();
        let employer = UserId::new();
        let base = hirechat_types::time::now();

        let quiet = conversation(&store, employer, UserId::new()).await;
        let older = conversation(&store, employer, UserId::new()).await;
        let newer = conversation(&store, employer, UserId::new()).await;
        append_at(&store, &newer, employer, "first", base + Duration::seconds(10)).await;
        append_at(&store, &older, employer, "second", base + Duration::seconds(20)).await;

        let aggregator = UnreadAggregator::new(store.clone(), store.clone());
        let inbox = aggregator.inbox(&employer).await.unwrap();
        let ids: Vec<ConversationId> = inbox.iter().map(|e| e.conversation.id).collect();
        assert_eq!(ids, vec![older.id, newer.id, quiet.id]);
        assert!(inbox[2].preview.is_none());
        assert_eq!(inbox[0].preview.as_ref().unwrap().body, "second");
    }

    #[tokio::test]
    async fn test_empty_conversations_sort_by_creation() {
        let store = InMemoryStore::new();
        let candidate = UserId::new();
        let first = conversation(&store, UserId::new(), candidate).await;
        let second = conversation(&store, UserId::new(), candidate).await;

        let aggregator = UnreadAggregator::new(store.clone(), store.clone());
        let inbox = aggregator.inbox(&candidate).await.unwrap();
        assert!(inbox[0].activity_at() >= inbox[1].activity_at());
        let ids: Vec<ConversationId> = inbox.iter().map(|e| e.conversation.id).collect();
        assert!(ids.contains(&first.id) && ids.contains(&second.id));
    }

    #[tokio::test]
    async fn test_unread_count_excludes_own_messages() {
        let store = InMemoryStore::new();
        let employer = UserId::new();
        let candidate = UserId::new();
        let conv = conversation(&store, employer, candidate).await;
        let messages = MessageStore::new(store.clone());
        messages.append(&conv.id, &employer, "Hi").await.unwrap();
        messages.append(&conv.id, &employer, "Are you there?").await.unwrap();

        let aggregator = UnreadAggregator::new(store.clone(), store.clone());
        assert_eq!(aggregator.unread_count(&candidate, &conv.id).await.unwrap(), 2);
        assert_eq!(aggregator.unread_count(&employer, &conv.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_inbox_excludes_other_peoples_conversations() {
        let store = InMemoryStore::new();
        let me = UserId::new();
        conversation(&store, me, UserId::new()).await;
        conversation(&store, UserId::new(), UserId::new()).await;

        let aggregator = UnreadAggregator::new(store.clone(), store.clone());
        assert_eq!(aggregator.inbox(&me).await.unwrap().len(), 1);
    }
}
