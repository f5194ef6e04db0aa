//! Message store: the validated entry point to the append-only log.

use hirechat_types::conversation::ConversationId;
use hirechat_types::error::{MessagingError, RepositoryError};
use hirechat_types::identity::UserId;
use hirechat_types::message::{MAX_BODY_CHARS, Message, MessageId, MessageQuery};
use hirechat_types::time;
use tracing::info;

use crate::repository::message::{MessageRepository, NewMessage};

/// Trim a message body and check it is 1 to [`MAX_BODY_CHARS`] characters.
pub fn validate_body(body: &str) -> Result<String, MessagingError> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Err(MessagingError::Validation(
            "message body must not be empty".to_string(),
        ));
    }
    let chars = trimmed.chars().count();
    if chars > MAX_BODY_CHARS {
        return Err(MessagingError::Validation(format!(
            "message body is {chars} characters, maximum is {MAX_BODY_CHARS}"
        )));
    }
    Ok(trimmed.to_string())
}

/// Appends to and reads from the per-conversation message log.
#[derive(Clone)]
pub struct MessageStore<M: MessageRepository> {
    messages: M,
}

impl<M: MessageRepository> MessageStore<M> {
    pub fn new(messages: M) -> Self {
        Self { messages }
    }

    /// Validate and append a message. Ordering is assigned by the repository
    /// at append time; nothing is stored when validation fails.
    pub async fn append(
        &self,
        conversation_id: &ConversationId,
        sender_id: &UserId,
        body: &str,
    ) -> Result<Message, MessagingError> {
        let body = validate_body(body)?;
        let draft = NewMessage {
            id: MessageId::new(),
            conversation_id: *conversation_id,
            sender_id: *sender_id,
            body,
            requested_at: time::now(),
        };

        let message = self.messages.append(&draft).await.map_err(|e| match e {
            RepositoryError::NotFound => MessagingError::conversation_not_found(),
            RepositoryError::Conflict(_) => MessagingError::PermissionDenied,
            other => other.into(),
        })?;

        info!(
            conversation_id = %conversation_id,
            message_id = %message.id,
            "message appended"
        );
        Ok(message)
    }

    /// Messages matching `query`, in ascending `(created_at, id)` order.
    pub async fn list_since(
        &self,
        conversation_id: &ConversationId,
        query: &MessageQuery,
    ) -> Result<Vec<Message>, MessagingError> {
        Ok(self.messages.list(conversation_id, query).await?)
    }

    /// The latest message of the conversation, if any.
    pub async fn latest(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Option<Message>, MessagingError> {
        Ok(self.messages.latest(conversation_id).await?)
    }
}
