//! A session's local copy of one conversation.

use std::collections::{BTreeMap, HashSet};

use hirechat_types::message::{Message, MessageCursor, MessageId};

/// Ordered, de-duplicated messages as seen by one session.
///
/// Delivery is at-least-once (live events overlap with backfills after a
/// reconnect), so inserts are keyed by message id. Iteration is always in
/// `(created_at, id)` order no matter the arrival order.
#[derive(Debug, Default, Clone)]
pub struct LocalView {
    ordered: BTreeMap<MessageCursor, Message>,
    seen: HashSet<MessageId>,
}

impl LocalView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a message; returns `false` if it was already present.
    pub fn insert(&mut self, message: Message) -> bool {
        if !self.seen.insert(message.id) {
            return false;
        }
        self.ordered.insert(message.cursor(), message);
        true
    }

    pub fn contains(&self, id: &MessageId) -> bool {
        self.seen.contains(id)
    }

    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.ordered.values()
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }
}
