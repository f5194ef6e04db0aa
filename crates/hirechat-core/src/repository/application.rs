//! Read-only port onto the job-application collaborator.

use hirechat_types::error::RepositoryError;
use hirechat_types::identity::{ApplicationId, JobApplication};

/// Looks up job applications owned by the job-post subsystem.
pub trait ApplicationDirectory: Send + Sync {
    fn find_application(
        &self,
        id: &ApplicationId,
    ) -> impl std::future::Future<Output = Result<Option<JobApplication>, RepositoryError>> + Send;
}
