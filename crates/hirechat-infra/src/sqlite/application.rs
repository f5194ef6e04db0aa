//! Read access to the job-application table owned by the job-post subsystem.

use hirechat_core::repository::application::ApplicationDirectory;
use hirechat_types::error::RepositoryError;
use hirechat_types::identity::{ApplicationId, JobApplication};
use sqlx::Row;
use uuid::Uuid;

use super::codec::{format_datetime, parse_id, query_error};
use super::pool::DatabasePool;

/// SQLite-backed implementation of `ApplicationDirectory`.
#[derive(Clone)]
pub struct SqliteApplicationDirectory {
    pool: DatabasePool,
}

impl SqliteApplicationDirectory {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    /// Record an application for `job_id`.
    ///
    /// Normally written by the job-post subsystem; exposed for local
    /// development and tests.
    pub async fn register(
        &self,
        application: &JobApplication,
        job_id: Uuid,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO job_applications (id, job_id, employer_id, candidate_id, created_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(application.id.to_string())
        .bind(job_id.to_string())
        .bind(application.employer_id.to_string())
        .bind(application.candidate_id.to_string())
        .bind(format_datetime(&chrono::Utc::now()))
        .execute(&self.pool.writer)
        .await
        .map_err(query_error)?;
        Ok(())
    }
}

impl ApplicationDirectory for SqliteApplicationDirectory {
    async fn find_application(
        &self,
        id: &ApplicationId,
    ) -> Result<Option<JobApplication>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, employer_id, candidate_id FROM job_applications WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool.reader)
        .await
        .map_err(query_error)?;

        let Some(row) = row else {
            return Ok(None);
        };
        let id: String = row.try_get("id").map_err(query_error)?;
        let employer_id: String = row.try_get("employer_id").map_err(query_error)?;
        let candidate_id: String = row.try_get("candidate_id").map_err(query_error)?;

        Ok(Some(JobApplication {
            id: parse_id(&id, "application")?,
            employer_id: parse_id(&employer_id, "employer")?,
            candidate_id: parse_id(&candidate_id, "candidate")?,
        }))
    }
}
