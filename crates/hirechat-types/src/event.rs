//! Real-time events fanned out to connected sessions.
//!
//! All types are Clone + Send + Sync for use with tokio broadcast channels.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use std::fmt;

use crate::conversation::ConversationId;
use crate::identity::UserId;
use crate::message::{Message, MessageId};

/// Published on a conversation's topic after a message is durably appended.
///
/// Delivery is at-least-once; subscribers de-duplicate by `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageAppended {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub sender_id: UserId,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

impl From<&Message> for MessageAppended {
    fn from(message: &Message) -> Self {
        Self {
            id: message.id,
            conversation_id: message.conversation_id,
            sender_id: message.sender_id,
            body: message.body.clone(),
            created_at: message.created_at,
        }
    }
}

impl From<MessageAppended> for Message {
    fn from(event: MessageAppended) -> Self {
        Self {
            id: event.id,
            conversation_id: event.conversation_id,
            sender_id: event.sender_id,
            body: event.body,
            created_at: event.created_at,
        }
    }
}

/// Connection state of a session's subscription to a conversation topic.
///
/// `Disconnected -> Subscribing -> Subscribed -> (Error | Disconnected)`,
/// with automatic resubscription from `Error` and `Disconnected`. There is no
/// terminal state; the machine lives as long as the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Subscribing,
    Subscribed,
    Error,
}

impl ConnectionState {
    /// Whether moving from `self` to `next` is a legal transition.
    pub fn can_transition_to(self, next: ConnectionState) -> bool {
        use ConnectionState::*;
        matches!(
            (self, next),
            (Disconnected, Subscribing)
                | (Error, Subscribing)
                | (Error, Disconnected)
                | (Subscribing, Subscribed)
                | (Subscribing, Error)
                | (Subscribing, Disconnected)
                | (Subscribed, Error)
                | (Subscribed, Disconnected)
        )
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Subscribing => write!(f, "subscribing"),
            ConnectionState::Subscribed => write!(f, "subscribed"),
            ConnectionState::Error => write!(f, "error"),
        }
    }
}
