//! In-memory doubles of every port, shared by the core unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use hirechat_types::conversation::{Conversation, ConversationDigest, ConversationId};
use hirechat_types::error::RepositoryError;
use hirechat_types::identity::{ApplicationId, JobApplication, ParticipantRole, UserId};
use hirechat_types::message::{Message, MessageQuery};
use hirechat_types::time::TICK;

use crate::repository::application::ApplicationDirectory;
use crate::repository::conversation::ConversationRepository;
use crate::repository::entitlement::EntitlementChecker;
use crate::repository::message::{MessageRepository, NewMessage};

/// Reference computation of a digest from a conversation's full log.
///
/// `unread_count` counts messages not sent by `viewer` with `created_at`
/// strictly after the viewer's cursor. `latest` is the message with the
/// greatest `(created_at, id)`, whoever sent it. Repository implementations
/// must agree with this function.
pub fn digest(conversation: &Conversation, viewer: &UserId, log: &[Message]) -> ConversationDigest {
    let cursor = conversation
        .role_of(viewer)
        .map(|role| conversation.last_read_at(role))
        .unwrap_or(DateTime::<Utc>::MAX_UTC);

    let unread_count = log
        .iter()
        .filter(|m| m.sender_id != *viewer && m.created_at > cursor)
        .count() as u32;

    ConversationDigest {
        conversation_id: conversation.id,
        unread_count,
        latest: log.iter().max_by_key(|m| m.cursor()).cloned(),
    }
}

#[derive(Default)]
struct State {
    conversations: Vec<Conversation>,
    messages: Vec<Message>,
    applications: HashMap<ApplicationId, JobApplication>,
    entitled: HashSet<UserId>,
    digest_fetches: usize,
    conversation_reads: usize,
}

/// One shared in-memory "database" implementing all repository ports.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<State>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an application; the employer gets an active entitlement.
    pub fn add_application(&self, employer_id: UserId, candidate_id: UserId) -> JobApplication {
        let application = JobApplication {
            id: ApplicationId::new(),
            employer_id,
            candidate_id,
        };
        let mut state = self.state.lock().unwrap();
        state.applications.insert(application.id, application.clone());
        state.entitled.insert(employer_id);
        application
    }

    pub fn revoke_entitlement(&self, employer_id: &UserId) {
        self.state.lock().unwrap().entitled.remove(employer_id);
    }

    pub fn conversation_count(&self) -> usize {
        self.state.lock().unwrap().conversations.len()
    }

    pub fn message_count(&self) -> usize {
        self.state.lock().unwrap().messages.len()
    }

    /// How many batched digest fetches have been served.
    pub fn digest_fetches(&self) -> usize {
        self.state.lock().unwrap().digest_fetches
    }

    /// How many single-conversation lookups have been served.
    pub fn conversation_reads(&self) -> usize {
        self.state.lock().unwrap().conversation_reads
    }
}

impl ConversationRepository for InMemoryStore {
    async fn create(&self, conversation: &Conversation) -> Result<(), RepositoryError> {
        let mut state = self.state.lock().unwrap();
        if state
            .conversations
            .iter()
            .any(|c| c.application_id == conversation.application_id)
        {
            return Err(RepositoryError::Conflict(format!(
                "conversation for application {} exists",
                conversation.application_id
            )));
        }
        state.conversations.push(conversation.clone());
        Ok(())
    }

    async fn get(&self, id: &ConversationId) -> Result<Option<Conversation>, RepositoryError> {
        let mut state = self.state.lock().unwrap();
        state.conversation_reads += 1;
        Ok(state.conversations.iter().find(|c| c.id == *id).cloned())
    }

    async fn get_by_application(
        &self,
        application_id: &ApplicationId,
    ) -> Result<Option<Conversation>, RepositoryError> {
        // Let concurrent callers interleave between lookup and insert.
        tokio::task::yield_now().await;
        let state = self.state.lock().unwrap();
        Ok(state
            .conversations
            .iter()
            .find(|c| c.application_id == *application_id)
            .cloned())
    }

    async fn list_for_participant(
        &self,
        user: &UserId,
    ) -> Result<Vec<Conversation>, RepositoryError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .conversations
            .iter()
            .filter(|c| c.role_of(user).is_some())
            .cloned()
            .collect())
    }

    async fn advance_cursor(
        &self,
        id: &ConversationId,
        role: ParticipantRole,
        at: DateTime<Utc>,
    ) -> Result<DateTime<Utc>, RepositoryError> {
        let mut state = self.state.lock().unwrap();
        let conversation = state
            .conversations
            .iter_mut()
            .find(|c| c.id == *id)
            .ok_or(RepositoryError::NotFound)?;
        let cursor = match role {
            ParticipantRole::Employer => &mut conversation.employer_last_read_at,
            ParticipantRole::Candidate => &mut conversation.candidate_last_read_at,
        };
        *cursor = (*cursor).max(at);
        Ok(*cursor)
    }

    async fn count(&self) -> Result<u64, RepositoryError> {
        Ok(self.state.lock().unwrap().conversations.len() as u64)
    }
}

impl MessageRepository for InMemoryStore {
    async fn append(&self, message: &NewMessage) -> Result<Message, RepositoryError> {
        let mut state = self.state.lock().unwrap();
        let conversation = state
            .conversations
            .iter()
            .find(|c| c.id == message.conversation_id)
            .cloned()
            .ok_or(RepositoryError::NotFound)?;
        if conversation.role_of(&message.sender_id).is_none() {
            return Err(RepositoryError::Conflict("sender is not a participant".into()));
        }
        let floor = state
            .messages
            .iter()
            .filter(|m| m.conversation_id == message.conversation_id)
            .map(|m| m.created_at)
            .max()
            .unwrap_or(conversation.created_at);
        let stored = Message {
            id: message.id,
            conversation_id: message.conversation_id,
            sender_id: message.sender_id,
            body: message.body.clone(),
            created_at: message.requested_at.max(floor + TICK),
        };
        state.messages.push(stored.clone());
        Ok(stored)
    }

    async fn list(
        &self,
        conversation_id: &ConversationId,
        query: &MessageQuery,
    ) -> Result<Vec<Message>, RepositoryError> {
        let state = self.state.lock().unwrap();
        let mut messages: Vec<Message> = state
            .messages
            .iter()
            .filter(|m| m.conversation_id == *conversation_id && query.matches(m))
            .cloned()
            .collect();
        messages.sort_by_key(Message::cursor);
        if let Some(limit) = query.limit {
            messages.truncate(limit as usize);
        }
        Ok(messages)
    }

    async fn latest(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Option<Message>, RepositoryError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .messages
            .iter()
            .filter(|m| m.conversation_id == *conversation_id)
            .max_by_key(|m| m.cursor())
            .cloned())
    }

    async fn digests_for_participant(
        &self,
        user: &UserId,
    ) -> Result<Vec<ConversationDigest>, RepositoryError> {
        let mut state = self.state.lock().unwrap();
        state.digest_fetches += 1;
        Ok(state
            .conversations
            .iter()
            .filter(|c| c.role_of(user).is_some())
            .map(|c| {
                let log: Vec<Message> = state
                    .messages
                    .iter()
                    .filter(|m| m.conversation_id == c.id)
                    .cloned()
                    .collect();
                digest(c, user, &log)
            })
            .collect())
    }

    async fn count(&self) -> Result<u64, RepositoryError> {
        Ok(self.state.lock().unwrap().messages.len() as u64)
    }
}

impl ApplicationDirectory for InMemoryStore {
    async fn find_application(
        &self,
        id: &ApplicationId,
    ) -> Result<Option<JobApplication>, RepositoryError> {
        Ok(self.state.lock().unwrap().applications.get(id).cloned())
    }
}

impl EntitlementChecker for InMemoryStore {
    async fn has_active_entitlement(&self, employer_id: &UserId) -> Result<bool, RepositoryError> {
        Ok(self.state.lock().unwrap().entitled.contains(employer_id))
    }
}
