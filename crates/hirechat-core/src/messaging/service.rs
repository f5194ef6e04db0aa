//! Messaging service.
//!
//! The surface exposed to the HTTP API and CLI. Every operation takes the
//! authenticated [`Caller`] and runs through the authorization gate before
//! touching a conversation.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use hirechat_types::conversation::{Conversation, ConversationId, InboxEntry};
use hirechat_types::error::MessagingError;
use hirechat_types::event::MessageAppended;
use hirechat_types::identity::{ApplicationId, UserId};
use hirechat_types::message::{Message, MessageCursor, MessageQuery};
use hirechat_types::time;
use tracing::{debug, info, warn};

use super::cursor::ReadCursorTracker;
use super::gate::{AuthorizationGate, Authorized, Caller};
use super::registry::ConversationRegistry;
use super::store::MessageStore;
use super::unread::UnreadAggregator;
use crate::event::bus::{EventPublisher, Subscription, TopicBus};
use crate::event::session::SessionBackend;
use crate::repository::application::ApplicationDirectory;
use crate::repository::conversation::ConversationRepository;
use crate::repository::entitlement::EntitlementChecker;
use crate::repository::message::MessageRepository;

/// Row counts reported by `hirechat status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessagingStats {
    pub conversations: u64,
    pub messages: u64,
    pub live_topics: usize,
}

/// Service composing the registry, gate, store, cursor tracker, unread
/// aggregator and event bus.
///
/// Generic over every storage port so hirechat-core never depends on
/// hirechat-infra.
pub struct MessagingService<C, M, A, E, P>
where
    C: ConversationRepository + Clone,
    M: MessageRepository + Clone,
    A: ApplicationDirectory + Clone,
    E: EntitlementChecker,
    P: EventPublisher,
{
    applications: A,
    entitlements: E,
    registry: ConversationRegistry<C, A>,
    gate: AuthorizationGate<C>,
    store: MessageStore<M>,
    cursors: ReadCursorTracker<C>,
    unread: UnreadAggregator<C, M>,
    conversations: C,
    messages: M,
    topics: TopicBus,
    publisher: P,
}

impl<C, M, A, E, P> MessagingService<C, M, A, E, P>
where
    C: ConversationRepository + Clone,
    M: MessageRepository + Clone,
    A: ApplicationDirectory + Clone,
    E: EntitlementChecker,
    P: EventPublisher,
{
    /// Wire the service.
    ///
    /// `topics` serves subscriptions; `publisher` receives every appended
    /// message. In production both are the same [`TopicBus`].
    pub fn new(
        conversations: C,
        messages: M,
        applications: A,
        entitlements: E,
        topics: TopicBus,
        publisher: P,
    ) -> Self {
        Self {
            registry: ConversationRegistry::new(conversations.clone(), applications.clone()),
            gate: AuthorizationGate::new(conversations.clone()),
            store: MessageStore::new(messages.clone()),
            cursors: ReadCursorTracker::new(conversations.clone()),
            unread: UnreadAggregator::new(conversations.clone(), messages.clone()),
            applications,
            entitlements,
            conversations,
            messages,
            topics,
            publisher,
        }
    }

    /// Open (or reopen) the conversation for a job application.
    ///
    /// Only the application's employer may start it, and only while they
    /// hold an active entitlement.
    pub async fn open_conversation(
        &self,
        caller: &Caller,
        application_id: &ApplicationId,
    ) -> Result<Conversation, MessagingError> {
        let application = self
            .applications
            .find_application(application_id)
            .await?
            .ok_or_else(MessagingError::application_not_found)?;

        if application.employer_id != caller.user_id {
            return Err(MessagingError::PermissionDenied);
        }

        if !self
            .entitlements
            .has_active_entitlement(&application.employer_id)
            .await?
        {
            info!(
                employer_id = %application.employer_id,
                application_id = %application_id,
                "conversation refused: no active entitlement"
            );
            return Err(MessagingError::PermissionDenied);
        }

        self.registry
            .get_or_create(application_id, &application.employer_id, &application.candidate_id)
            .await
    }

    /// A single conversation together with the caller's derived role.
    pub async fn get_conversation(
        &self,
        caller: &Caller,
        conversation_id: &ConversationId,
    ) -> Result<Authorized, MessagingError> {
        self.gate.authorize(caller, conversation_id).await
    }

    /// Append a message and fan it out to live subscribers.
    ///
    /// Once the message is stored the send has succeeded; a delivery
    /// failure is only logged and subscribers recover by backfilling.
    pub async fn send_message(
        &self,
        caller: &Caller,
        conversation_id: &ConversationId,
        body: &str,
    ) -> Result<Message, MessagingError> {
        self.gate.authorize(caller, conversation_id).await?;
        let message = self.store.append(conversation_id, &caller.user_id, body).await?;

        match self.publisher.publish(MessageAppended::from(&message)) {
            Ok(delivered) => debug!(
                conversation_id = %conversation_id,
                message_id = %message.id,
                delivered,
                "message published"
            ),
            Err(e) => warn!(
                conversation_id = %conversation_id,
                message_id = %message.id,
                error = %e,
                "real-time delivery failed, message is stored"
            ),
        }
        Ok(message)
    }

    /// Messages of a conversation matching `query`, oldest first.
    pub async fn list_messages(
        &self,
        caller: &Caller,
        conversation_id: &ConversationId,
        query: &MessageQuery,
    ) -> Result<Vec<Message>, MessagingError> {
        self.gate.authorize(caller, conversation_id).await?;
        self.store.list_since(conversation_id, query).await
    }

    /// Mark everything currently in the conversation as read.
    ///
    /// The cursor is set to at least the newest message's timestamp, so the
    /// caller's unread count drops to zero even if that timestamp was
    /// nudged past the wall clock.
    pub async fn mark_read(
        &self,
        caller: &Caller,
        conversation_id: &ConversationId,
    ) -> Result<DateTime<Utc>, MessagingError> {
        let authorized = self.gate.authorize(caller, conversation_id).await?;
        let latest = self.store.latest(conversation_id).await?;
        let at = latest.map_or(time::now(), |m| m.created_at.max(time::now()));
        self.cursors.advance(conversation_id, authorized.role, at).await
    }

    /// Advance the caller's read cursor to `max(current, at)`.
    pub async fn mark_read_at(
        &self,
        caller: &Caller,
        conversation_id: &ConversationId,
        at: DateTime<Utc>,
    ) -> Result<DateTime<Utc>, MessagingError> {
        self.cursors.mark_read(conversation_id, &caller.user_id, at).await
    }

    /// The participant's inbox, newest activity first.
    pub async fn list_conversations(
        &self,
        participant: &UserId,
    ) -> Result<Vec<InboxEntry>, MessagingError> {
        self.unread.inbox(participant).await
    }

    pub async fn unread_count(
        &self,
        participant: &UserId,
        conversation_id: &ConversationId,
    ) -> Result<u32, MessagingError> {
        self.unread.unread_count(participant, conversation_id).await
    }

    /// Subscribe the caller to live events of a conversation.
    pub async fn subscribe(
        &self,
        caller: &Caller,
        conversation_id: &ConversationId,
    ) -> Result<Subscription, MessagingError> {
        self.gate.authorize(caller, conversation_id).await?;
        Ok(self.topics.subscribe(*conversation_id))
    }

    pub async fn stats(&self) -> Result<MessagingStats, MessagingError> {
        Ok(MessagingStats {
            conversations: self.conversations.count().await?,
            messages: self.messages.count().await?,
            live_topics: self.topics.topic_count(),
        })
    }

    pub fn topics(&self) -> &TopicBus {
        &self.topics
    }
}

/// A [`SessionBackend`] acting as one participant through the service.
pub struct ParticipantBackend<C, M, A, E, P>
where
    C: ConversationRepository + Clone,
    M: MessageRepository + Clone,
    A: ApplicationDirectory + Clone,
    E: EntitlementChecker,
    P: EventPublisher,
{
    service: Arc<MessagingService<C, M, A, E, P>>,
    caller: Caller,
}

impl<C, M, A, E, P> ParticipantBackend<C, M, A, E, P>
where
    C: ConversationRepository + Clone,
    M: MessageRepository + Clone,
    A: ApplicationDirectory + Clone,
    E: EntitlementChecker,
    P: EventPublisher,
{
    pub fn new(service: Arc<MessagingService<C, M, A, E, P>>, caller: Caller) -> Self {
        Self { service, caller }
    }
}

impl<C, M, A, E, P> SessionBackend for ParticipantBackend<C, M, A, E, P>
where
    C: ConversationRepository + Clone + 'static,
    M: MessageRepository + Clone + 'static,
    A: ApplicationDirectory + Clone + 'static,
    E: EntitlementChecker + 'static,
    P: EventPublisher + 'static,
{
    async fn subscribe(&self, conversation_id: ConversationId) -> Result<Subscription, MessagingError> {
        self.service.subscribe(&self.caller, &conversation_id).await
    }

    async fn list_after(
        &self,
        conversation_id: ConversationId,
        after: Option<MessageCursor>,
    ) -> Result<Vec<Message>, MessagingError> {
        let query = after.map_or_else(MessageQuery::all, MessageQuery::after);
        self.service
            .list_messages(&self.caller, &conversation_id, &query)
            .await
    }

    async fn mark_read(&self, conversation_id: ConversationId) -> Result<(), MessagingError> {
        self.service
            .mark_read(&self.caller, &conversation_id)
            .await
            .map(|_| ())
    }
}
