//! Messages of the append-only conversation log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::conversation::ConversationId;
use crate::identity::UserId;

uuid_id!(
    /// Unique identifier for a message, wrapping a UUID v7.
    MessageId
);

/// Maximum body length in characters, measured after trimming whitespace.
pub const MAX_BODY_CHARS: usize = 4000;

/// A single immutable message within a conversation.
///
/// Messages are never edited or deleted once appended. Within one
/// conversation the total order is `(created_at, id)` ascending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub sender_id: UserId,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// The position of this message in its conversation's total order.
    pub fn cursor(&self) -> MessageCursor {
        MessageCursor {
            created_at: self.created_at,
            id: self.id,
        }
    }
}

/// A position in a conversation's message order.
///
/// Field order matters: the derived `Ord` compares `created_at` first and
/// breaks ties by `id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MessageCursor {
    pub created_at: DateTime<Utc>,
    pub id: MessageId,
}

/// Which slice of a conversation's log to return.
///
/// `since` is inclusive on the timestamp; `after` is exclusive on the full
/// `(created_at, id)` cursor and is what restartable pagination uses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageQuery {
    pub since: Option<DateTime<Utc>>,
    pub after: Option<MessageCursor>,
    pub limit: Option<u32>,
}

impl MessageQuery {
    /// Every message in the conversation.
    pub fn all() -> Self {
        Self::default()
    }

    /// Messages with `created_at >= since`.
    pub fn since(since: DateTime<Utc>) -> Self {
        Self {
            since: Some(since),
            ..Self::default()
        }
    }

    /// Messages strictly after the given cursor.
    pub fn after(cursor: MessageCursor) -> Self {
        Self {
            after: Some(cursor),
            ..Self::default()
        }
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether a message falls inside this query's window (ignoring `limit`).
    pub fn matches(&self, message: &Message) -> bool {
        if let Some(since) = self.since {
            if message.created_at < since {
                return false;
            }
        }
        if let Some(after) = self.after {
            if message.cursor() <= after {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn message_at(created_at: DateTime<Utc>) -> Message {
        Message {
            id: MessageId::new(),
            conversation_id: ConversationId::new(),
            sender_id: UserId::new(),
            body: "hi".to_string(),
            created_at,
        }
    }

    #[test]
    fn test_cursor_orders_by_time_then_id() {
        let t = Utc::now();
        let a = MessageCursor {
            created_at: t,
            id: MessageId::new(),
        };
        let b = MessageCursor {
            created_at: t,
            id: MessageId::new(),
        };
        let c = MessageCursor {
            created_at: t - Duration::seconds(1),
            id: MessageId::new(),
        };
        // v7 ids generated later sort later
        assert!(a < b);
        assert!(c < a);
    }

    #[test]
    fn test_query_since_is_inclusive() {
        let t = Utc::now();
        let msg = message_at(t);
        assert!(MessageQuery::since(t).matches(&msg));
        assert!(!MessageQuery::since(t + Duration::microseconds(1)).matches(&msg));
    }

    #[test]
    fn test_query_after_is_exclusive() {
        let msg = message_at(Utc::now());
        assert!(!MessageQuery::after(msg.cursor()).matches(&msg));
        let earlier = MessageCursor {
            created_at: msg.created_at - Duration::microseconds(1),
            id: msg.id,
        };
        assert!(MessageQuery::after(earlier).matches(&msg));
    }

    #[test]
    fn test_message_serialize() {
        let msg = message_at(Utc::now());
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["body"], "hi");
        assert_eq!(json["id"], msg.id.to_string());
    }
}
