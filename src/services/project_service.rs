//! Project listing and deletion.

use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{parse_repository_url, Project};
use crate::domain::ports::{ProjectRepository, VcsClient};

pub struct ProjectService {
    projects: Arc<dyn ProjectRepository>,
    vcs: Arc<dyn VcsClient>,
}

impl ProjectService {
    pub fn new(projects: Arc<dyn ProjectRepository>, vcs: Arc<dyn VcsClient>) -> Self {
        Self { projects, vcs }
    }

    /// A user's projects, newest first.
    pub async fn list_projects(&self, user_id: &str, exercise_id: Option<&str>) -> DomainResult<Vec<Project>> {
        self.projects.list_for_user(user_id, exercise_id).await
    }

    /// Get a project owned by `user_id`.
    pub async fn get_project(&self, user_id: &str, id: Uuid) -> DomainResult<Project> {
        self.projects
            .get(id)
            .await?
            .filter(|p| p.user_id == user_id)
            .ok_or(DomainError::ProjectNotFound(id))
    }

    /// Delete a project and, best effort, its repository.
    ///
    /// Other users' projects are reported as not found.
    pub async fn delete_project(&self, user_id: &str, id: Uuid) -> DomainResult<Project> {
        let project = self.get_project(user_id, id).await?;

        if let Some((owner, name)) = project.repository_url.as_deref().and_then(parse_repository_url) {
            match self.vcs.delete_repository(&owner, &name).await {
                Ok(()) => info!(project_id = %id, owner = %owner, name = %name, "repository deleted"),
                Err(e) if e.is_not_found() => {}
                Err(e) => warn!(
                    project_id = %id,
                    error = %e,
                    "failed to delete repository, removing record anyway"
                ),
            }
        }

        self.projects.delete(id).await?;
        Ok(project)
    }
}
