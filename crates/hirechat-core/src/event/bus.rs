//! Per-conversation publish/subscribe bus.
//!
//! Built on `tokio::sync::broadcast`, one channel per conversation topic.
//! Topics are created on first subscribe and removed when their last
//! subscription is dropped, so closed sessions leave no dangling fan-out
//! targets. Publishing to a topic with no subscribers is a no-op.

use std::sync::Arc;

use async_stream::stream;
use dashmap::DashMap;
use futures_util::Stream;
use hirechat_types::conversation::ConversationId;
use hirechat_types::error::DeliveryError;
use hirechat_types::event::MessageAppended;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Anything that can fan a freshly appended message out to live sessions.
///
/// A failure here never fails the originating send: the message is already
/// stored and subscribers recover it by backfilling on resubscribe.
pub trait EventPublisher: Send + Sync {
    /// Publish to the event's conversation topic, returning how many
    /// subscribers it was handed to.
    fn publish(&self, event: MessageAppended) -> Result<usize, DeliveryError>;
}

type Topics = DashMap<ConversationId, broadcast::Sender<MessageAppended>>;

/// In-process topic bus.
///
/// Cloning the bus shares the topic table, allowing multiple producers and
/// consumers.
#[derive(Clone)]
pub struct TopicBus {
    topics: Arc<Topics>,
    capacity: usize,
}

impl TopicBus {
    /// Create a new bus whose topics buffer `capacity` events each.
    pub fn new(capacity: usize) -> Self {
        Self {
            topics: Arc::new(DashMap::new()),
            capacity: capacity.max(1),
        }
    }

    /// Subscribe to a conversation topic, creating it if needed.
    pub fn subscribe(&self, conversation_id: ConversationId) -> Subscription {
        let receiver = self
            .topics
            .entry(conversation_id)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe();
        debug!(%conversation_id, "subscribed to conversation topic");
        Subscription {
            conversation_id,
            receiver,
            topics: Arc::clone(&self.topics),
        }
    }

    /// Number of live subscriptions on a topic.
    pub fn subscriber_count(&self, conversation_id: &ConversationId) -> usize {
        self.topics
            .get(conversation_id)
            .map_or(0, |tx| tx.receiver_count())
    }

    /// Number of topics that currently have at least one subscriber.
    pub fn topic_count(&self) -> usize {
        self.topics.len()
    }
}

impl EventPublisher for TopicBus {
    fn publish(&self, event: MessageAppended) -> Result<usize, DeliveryError> {
        let Some(sender) = self.topics.get(&event.conversation_id) else {
            return Ok(0);
        };
        // A send error only means every receiver has gone away in between.
        Ok(sender.send(event).unwrap_or(0))
    }
}

impl std::fmt::Debug for TopicBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TopicBus")
            .field("topics", &self.topics.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}

/// A live subscription to one conversation topic.
///
/// Dropping it unsubscribes and releases the topic if it was the last one.
pub struct Subscription {
    conversation_id: ConversationId,
    receiver: broadcast::Receiver<MessageAppended>,
    topics: Arc<Topics>,
}

impl Subscription {
    pub fn conversation_id(&self) -> ConversationId {
        self.conversation_id
    }

    /// Wait for the next event on the topic.
    pub async fn recv(&mut self) -> Result<MessageAppended, broadcast::error::RecvError> {
        self.receiver.recv().await
    }

    /// Turn the subscription into a stream of events.
    ///
    /// Lagged gaps are logged and skipped; the stream ends when the topic
    /// closes.
    pub fn into_stream(self) -> impl Stream<Item = MessageAppended> + Send {
        let mut subscription = self;
        stream! {
            loop {
                match subscription.receiver.recv().await {
                    Ok(event) => yield event,
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(
                            conversation_id = %subscription.conversation_id,
                            skipped = n,
                            "conversation stream lagged"
                        );
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        // Our own receiver is still alive here, hence `<= 1`.
        let removed = self
            .topics
            .remove_if(&self.conversation_id, |_, tx| tx.receiver_count() <= 1)
            .is_some();
        if removed {
            debug!(conversation_id = %self.conversation_id, "released conversation topic");
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("conversation_id", &self.conversation_id)
            .finish()
    }
}
