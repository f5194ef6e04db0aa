//! MessageRepository trait definition.

use chrono::{DateTime, Utc};
use hirechat_types::conversation::{ConversationDigest, ConversationId};
use hirechat_types::error::RepositoryError;
use hirechat_types::identity::UserId;
use hirechat_types::message::{Message, MessageId, MessageQuery};

/// A validated message awaiting its position in the log.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub sender_id: UserId,
    pub body: String,
    /// Wall-clock time at the server when the send was accepted. The stored
    /// `created_at` may be later (see [`MessageRepository::append`]).
    pub requested_at: DateTime<Utc>,
}

/// Repository trait for the append-only message log.
pub trait MessageRepository: Send + Sync {
    /// Append a message and return it as stored.
    ///
    /// This is the only serialization point of the subsystem. The stored
    /// `created_at` is `max(requested_at, floor + 1µs)` where `floor` is the
    /// latest `created_at` in the conversation (or the conversation's own
    /// `created_at` when it is empty), so timestamps are strictly increasing
    /// within a conversation.
    ///
    /// Fails with `NotFound` if the conversation does not exist and with
    /// `Conflict` if `sender_id` is not one of its participants.
    fn append(
        &self,
        message: &NewMessage,
    ) -> impl std::future::Future<Output = Result<Message, RepositoryError>> + Send;

    /// Messages of one conversation matching `query`, ascending by
    /// `(created_at, id)`.
    fn list(
        &self,
        conversation_id: &ConversationId,
        query: &MessageQuery,
    ) -> impl std::future::Future<Output = Result<Vec<Message>, RepositoryError>> + Send;

    /// The latest message of a conversation by `(created_at, id)`.
    fn latest(
        &self,
        conversation_id: &ConversationId,
    ) -> impl std::future::Future<Output = Result<Option<Message>, RepositoryError>> + Send;

    /// Unread count and latest message for every conversation `user`
    /// participates in, computed in a single batched fetch.
    ///
    /// Conversations without messages are included with `unread_count = 0`
    /// and `latest = None`.
    fn digests_for_participant(
        &self,
        user: &UserId,
    ) -> impl std::future::Future<Output = Result<Vec<ConversationDigest>, RepositoryError>> + Send;

    /// Count total messages across all conversations.
    fn count(&self) -> impl std::future::Future<Output = Result<u64, RepositoryError>> + Send;
}
