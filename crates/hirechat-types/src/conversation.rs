//! Conversations: the fixed two-party channel tied to a job application.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::{ApplicationId, JobApplication, ParticipantRole, UserId};
use crate::message::Message;

uuid_id!(
    /// Unique identifier for a conversation, wrapping a UUID v7.
    ConversationId
);

/// A private channel between an employer and a candidate.
///
/// Exactly one conversation exists per `application_id`. The two
/// participants are fixed at creation. Read cursors default to `created_at`
/// and only ever move forward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub application_id: ApplicationId,
    pub employer_id: UserId,
    pub candidate_id: UserId,
    pub created_at: DateTime<Utc>,
    pub employer_last_read_at: DateTime<Utc>,
    pub candidate_last_read_at: DateTime<Utc>,
}

impl Conversation {
    /// Build a fresh conversation for an application, with both cursors at
    /// the creation time.
    pub fn for_application(application: &JobApplication, created_at: DateTime<Utc>) -> Self {
        Self {
            id: ConversationId::new(),
            application_id: application.id,
            employer_id: application.employer_id,
            candidate_id: application.candidate_id,
            created_at,
            employer_last_read_at: created_at,
            candidate_last_read_at: created_at,
        }
    }

    /// The role `user` holds in this conversation, if any.
    pub fn role_of(&self, user: &UserId) -> Option<ParticipantRole> {
        if *user == self.employer_id {
            Some(ParticipantRole::Employer)
        } else if *user == self.candidate_id {
            Some(ParticipantRole::Candidate)
        } else {
            None
        }
    }

    /// The user occupying `role`.
    pub fn participant(&self, role: ParticipantRole) -> UserId {
        match role {
            ParticipantRole::Employer => self.employer_id,
            ParticipantRole::Candidate => self.candidate_id,
        }
    }

    /// The read cursor owned by `role`.
    pub fn last_read_at(&self, role: ParticipantRole) -> DateTime<Utc> {
        match role {
            ParticipantRole::Employer => self.employer_last_read_at,
            ParticipantRole::Candidate => self.candidate_last_read_at,
        }
    }
}

/// Per-conversation unread statistics for one participant.
///
/// Produced in bulk by the message repository for every conversation the
/// participant belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationDigest {
    pub conversation_id: ConversationId,
    /// Messages from the other participant newer than the viewer's cursor.
    pub unread_count: u32,
    /// The latest message by `(created_at, id)`, from either sender.
    pub latest: Option<Message>,
}

/// One row of a participant's inbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboxEntry {
    pub conversation: Conversation,
    /// The viewer's role in this conversation.
    pub role: ParticipantRole,
    pub preview: Option<Message>,
    pub unread_count: u32,
}

impl InboxEntry {
    /// Timestamp the inbox is ordered by: the latest message, or the
    /// conversation's creation time when it has no messages yet.
    pub fn activity_at(&self) -> DateTime<Utc> {
        self.preview
            .as_ref()
            .map(|m| m.created_at)
            .unwrap_or(self.conversation.created_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn application() -> JobApplication {
        JobApplication {
            id: ApplicationId::new(),
            employer_id: UserId::new(),
            candidate_id: UserId::new(),
        }
    }

    #[test]
    fn test_for_application_sets_cursors_to_creation() {
        let app = application();
        let now = Utc::now();
        let conv = Conversation::for_application(&app, now);
        assert_eq!(conv.application_id, app.id);
        assert_eq!(conv.employer_last_read_at, now);
        assert_eq!(conv.candidate_last_read_at, now);
    }

    #[test]
    fn test_role_of() {
        let app = application();
        let conv = Conversation::for_application(&app, Utc::now());
        assert_eq!(
            conv.role_of(&app.employer_id),
            Some(ParticipantRole::Employer)
        );
        assert_eq!(
            conv.role_of(&app.candidate_id),
            Some(ParticipantRole::Candidate)
        );
        assert_eq!(conv.role_of(&UserId::new()), None);
        assert_eq!(conv.participant(ParticipantRole::Candidate), app.candidate_id);
    }

    #[test]
    fn test_activity_falls_back_to_created_at() {
        let conv = Conversation::for_application(&application(), Utc::now());
        let entry = InboxEntry {
            conversation: conv.clone(),
            role: ParticipantRole::Employer,
            preview: None,
            unread_count: 0,
        };
        assert_eq!(entry.activity_at(), conv.created_at);
    }
}
