//! Read-cursor tracker.
//!
//! Each participant owns one cursor per conversation. Cursors only move
//! forward, even when mark-read signals arrive out of order, and one
//! participant can never move the other's.

use chrono::{DateTime, Utc};
use hirechat_types::conversation::ConversationId;
use hirechat_types::error::{MessagingError, RepositoryError};
use hirechat_types::identity::{ParticipantRole, UserId};
use tracing::debug;

use super::gate::{AuthorizationGate, Caller};
use crate::repository::conversation::ConversationRepository;

#[derive(Clone)]
pub struct ReadCursorTracker<C: ConversationRepository + Clone> {
    gate: AuthorizationGate<C>,
    conversations: C,
}

impl<C: ConversationRepository + Clone> ReadCursorTracker<C> {
    pub fn new(conversations: C) -> Self {
        Self {
            gate: AuthorizationGate::new(conversations.clone()),
            conversations,
        }
    }

    /// Set `participant`'s cursor to `max(current, at)` and return it.
    ///
    /// Fails with `PermissionDenied` if `participant` is not part of the
    /// conversation and `NotFound` if it does not exist.
    pub async fn mark_read(
        &self,
        conversation_id: &ConversationId,
        participant: &UserId,
        at: DateTime<Utc>,
    ) -> Result<DateTime<Utc>, MessagingError> {
        let authorized = self
            .gate
            .authorize(&Caller::new(*participant), conversation_id)
            .await?;
        self.advance(conversation_id, authorized.role, at).await
    }

    /// Set the cursor of a role the gate has already derived.
    pub async fn advance(
        &self,
        conversation_id: &ConversationId,
        role: ParticipantRole,
        at: DateTime<Utc>,
    ) -> Result<DateTime<Utc>, MessagingError> {
        let cursor = self
            .conversations
            .advance_cursor(conversation_id, role, at)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => MessagingError::conversation_not_found(),
                other => other.into(),
            })?;

        debug!(
            conversation_id = %conversation_id,
            %role,
            %cursor,
            "read cursor advanced"
        );
        Ok(cursor)
    }
}
