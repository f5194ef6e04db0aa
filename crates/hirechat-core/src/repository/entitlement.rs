//! Port onto the subscription/entitlement collaborator.

use hirechat_types::error::RepositoryError;
use hirechat_types::identity::UserId;

/// Decides whether an employer may initiate a conversation.
///
/// Consulted by the code path that opens conversations, never by the
/// conversation registry itself.
pub trait EntitlementChecker: Send + Sync {
    fn has_active_entitlement(
        &self,
        employer_id: &UserId,
    ) -> impl std::future::Future<Output = Result<bool, RepositoryError>> + Send;
}
