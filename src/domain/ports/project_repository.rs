//! Project repository port.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{NewProject, Project};

/// Repository interface for provisioning record persistence.
///
/// Implementations must enforce at most one record per
/// (`user_id`, `exercise_id`): a second insert for the same pair fails with
/// [`DomainError::DuplicateProject`](crate::domain::errors::DomainError::DuplicateProject).
#[async_trait]
pub trait ProjectRepository: Send + Sync {
    /// Insert a new record and return the stored row.
    async fn insert(&self, project: &NewProject) -> DomainResult<Project>;

    /// Get a record by ID.
    async fn get(&self, id: Uuid) -> DomainResult<Option<Project>>;

    /// Get a record by its project token.
    async fn get_by_token(&self, token: &str) -> DomainResult<Option<Project>>;

    /// Get the live record for a user and exercise.
    async fn find_for_user_exercise(
        &self,
        user_id: &str,
        exercise_id: &str,
    ) -> DomainResult<Option<Project>>;

    /// List a user's records, newest first, optionally for one exercise.
    async fn list_for_user(
        &self,
        user_id: &str,
        exercise_id: Option<&str>,
    ) -> DomainResult<Vec<Project>>;

    /// Persist the mutable fields of a record.
    async fn update(&self, project: &Project) -> DomainResult<()>;

    /// Delete a record.
    async fn delete(&self, id: Uuid) -> DomainResult<()>;
}
