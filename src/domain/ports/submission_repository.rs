//! Submission repository port.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::Submission;

/// Repository interface for submission persistence.
#[async_trait]
pub trait SubmissionRepository: Send + Sync {
    /// Store a submission.
    async fn insert(&self, submission: &Submission) -> DomainResult<()>;

    /// List submissions for a project, newest first.
    async fn list_for_project(&self, project_id: Uuid) -> DomainResult<Vec<Submission>>;
}
