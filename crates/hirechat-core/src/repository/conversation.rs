//! ConversationRepository trait definition.

use chrono::{DateTime, Utc};
use hirechat_types::conversation::{Conversation, ConversationId};
use hirechat_types::error::RepositoryError;
use hirechat_types::identity::{ApplicationId, ParticipantRole, UserId};

/// Repository trait for conversation persistence.
///
/// Implementations live in hirechat-infra (e.g., `SqliteConversationRepository`).
/// Uses native async fn in traits (RPITIT, Rust 2024 edition).
pub trait ConversationRepository: Send + Sync {
    /// Insert a new conversation.
    ///
    /// Must fail with `RepositoryError::Conflict` when a conversation for the
    /// same `application_id` already exists, leaving the existing row intact.
    fn create(
        &self,
        conversation: &Conversation,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Get a conversation by its unique ID.
    fn get(
        &self,
        id: &ConversationId,
    ) -> impl std::future::Future<Output = Result<Option<Conversation>, RepositoryError>> + Send;

    /// Get the conversation tied to an application, if one exists.
    fn get_by_application(
        &self,
        application_id: &ApplicationId,
    ) -> impl std::future::Future<Output = Result<Option<Conversation>, RepositoryError>> + Send;

    /// All conversations in which `user` is the employer or the candidate.
    fn list_for_participant(
        &self,
        user: &UserId,
    ) -> impl std::future::Future<Output = Result<Vec<Conversation>, RepositoryError>> + Send;

    /// Move `role`'s read cursor to `max(current, at)` and return the
    /// resulting cursor. The cursor never moves backward.
    fn advance_cursor(
        &self,
        id: &ConversationId,
        role: ParticipantRole,
        at: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<DateTime<Utc>, RepositoryError>> + Send;

    /// Count total conversations.
    fn count(&self) -> impl std::future::Future<Output = Result<u64, RepositoryError>> + Send;
}
