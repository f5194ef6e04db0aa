//! Authorization gate.
//!
//! Every send, read and cursor update passes through here. The caller's
//! participant role is always re-derived from the stored conversation; a
//! client-supplied role is only ever compared against it to detect a stale
//! UI cache.

use hirechat_types::conversation::{Conversation, ConversationId};
use hirechat_types::error::MessagingError;
use hirechat_types::identity::{ParticipantRole, UserId};
use tracing::debug;

use crate::repository::conversation::ConversationRepository;

/// An authenticated caller as handed over by the identity collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub user_id: UserId,
    /// Role the client believes it holds. Never an authorization input.
    pub role_hint: Option<ParticipantRole>,
}

impl Caller {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            role_hint: None,
        }
    }

    pub fn with_role_hint(mut self, hint: Option<ParticipantRole>) -> Self {
        self.role_hint = hint;
        self
    }
}

/// Proof that a caller participates in a conversation, with the role
/// derived from storage.
#[derive(Debug, Clone)]
pub struct Authorized {
    pub conversation: Conversation,
    pub role: ParticipantRole,
    /// True when the caller's role hint disagreed with the stored role, so
    /// the client should refresh its cached view of the conversation.
    pub hint_stale: bool,
}

/// Checks callers against a conversation's stored participant pair.
#[derive(Clone)]
pub struct AuthorizationGate<C: ConversationRepository> {
    conversations: C,
}

impl<C: ConversationRepository> AuthorizationGate<C> {
    pub fn new(conversations: C) -> Self {
        Self { conversations }
    }

    /// Load the conversation and confirm `caller` is one of its participants.
    ///
    /// Fails with `NotFound` if the conversation does not exist and
    /// `PermissionDenied` if the caller is neither the employer nor the
    /// candidate, whatever role hint they sent.
    pub async fn authorize(
        &self,
        caller: &Caller,
        conversation_id: &ConversationId,
    ) -> Result<Authorized, MessagingError> {
        let conversation = self
            .conversations
            .get(conversation_id)
            .await?
            .ok_or_else(MessagingError::conversation_not_found)?;

        let role = conversation
            .role_of(&caller.user_id)
            .ok_or(MessagingError::PermissionDenied)?;

        let hint_stale = caller.role_hint.is_some_and(|hint| hint != role);
        if hint_stale {
            debug!(
                conversation_id = %conversation_id,
                user_id = %caller.user_id,
                %role,
                "caller role hint disagrees with stored role"
            );
        }

        Ok(Authorized {
            conversation,
            role,
            hint_stale,
        })
    }
}
