//! Conversation registry: owns conversation identity.
//!
//! One conversation exists per job application. Creation is lazy and
//! idempotent; a lost insert race against a concurrent caller is resolved
//! here by returning the winner's row, so it never reaches the caller.

use hirechat_types::conversation::Conversation;
use hirechat_types::error::{MessagingError, RepositoryError};
use hirechat_types::identity::{ApplicationId, UserId};
use hirechat_types::time;
use tracing::{debug, info};

use crate::repository::application::ApplicationDirectory;
use crate::repository::conversation::ConversationRepository;

/// Creates and resolves the conversation tied to an application.
///
/// The registry does not consult entitlements; whoever calls
/// [`ConversationRegistry::get_or_create`] is responsible for that.
#[derive(Clone)]
pub struct ConversationRegistry<C: ConversationRepository, A: ApplicationDirectory> {
    conversations: C,
    applications: A,
}

impl<C: ConversationRepository, A: ApplicationDirectory> ConversationRegistry<C, A> {
    pub fn new(conversations: C, applications: A) -> Self {
        Self {
            conversations,
            applications,
        }
    }

    /// Return the conversation for `application_id`, creating it if needed.
    ///
    /// If one already exists it is returned unchanged. Otherwise a new one is
    /// created with both read cursors at the creation time. Fails with
    /// `NotFound` if the application does not exist or does not belong to
    /// the given employer and candidate.
    pub async fn get_or_create(
        &self,
        application_id: &ApplicationId,
        employer_id: &UserId,
        candidate_id: &UserId,
    ) -> Result<Conversation, MessagingError> {
        let application = self
            .applications
            .find_application(application_id)
            .await?
            .filter(|app| app.employer_id == *employer_id && app.candidate_id == *candidate_id)
            .ok_or_else(MessagingError::application_not_found)?;

        if let Some(existing) = self.conversations.get_by_application(application_id).await? {
            return Ok(existing);
        }

        let conversation = Conversation::for_application(&application, time::now());
        match self.conversations.create(&conversation).await {
            Ok(()) => {
                info!(
                    conversation_id = %conversation.id,
                    application_id = %application_id,
                    "conversation created"
                );
                Ok(conversation)
            }
            Err(RepositoryError::Conflict(reason)) => {
                debug!(
                    application_id = %application_id,
                    %reason,
                    "lost conversation create race, returning existing row"
                );
                self.conversations
                    .get_by_application(application_id)
                    .await?
                    .ok_or_else(|| {
                        MessagingError::Repository(RepositoryError::Query(format!(
                            "conversation for application {application_id} vanished after conflict"
                        )))
                    })
            }
            Err(e) => Err(e.into()),
        }
    }
}
