//! Test-run submissions from the exercise CLI.
//!
//! The CLI authenticates with the project token written into the
//! workspace config, not with a user session.

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::models::{Project, Submission, SubmissionDetails, SubmissionResult};
use crate::domain::ports::{ProjectRepository, SubmissionRepository};

#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("invalid or unknown project token")]
    InvalidToken,

    #[error("project token does not belong to project {0}")]
    ProjectMismatch(Uuid),

    #[error("storage error: {0}")]
    Storage(#[from] DomainError),
}

impl SubmissionError {
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidToken => 401,
            Self::ProjectMismatch(_) => 403,
            Self::Storage(_) => 500,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidToken => "UNAUTHORIZED",
            Self::ProjectMismatch(_) => "FORBIDDEN",
            Self::Storage(_) => "STORAGE_ERROR",
        }
    }
}

/// A CLI test run report.
#[derive(Debug, Clone)]
pub struct SubmissionRequest {
    pub project_id: Uuid,
    pub result: SubmissionResult,
    pub summary: String,
    pub details: SubmissionDetails,
    pub commit_sha: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SubmissionOutcome {
    pub submission: Submission,
    pub project: Project,
    pub project_updated: bool,
    /// The current step passed and another one follows.
    pub step_unlocked: bool,
    pub all_completed: bool,
}

pub struct SubmissionService {
    projects: Arc<dyn ProjectRepository>,
    submissions: Arc<dyn SubmissionRepository>,
}

impl SubmissionService {
    pub fn new(projects: Arc<dyn ProjectRepository>, submissions: Arc<dyn SubmissionRepository>) -> Self {
        Self { projects, submissions }
    }

    /// Store a run and advance the project's step cursor.
    ///
    /// The total number of steps is the number of test cases in the report.
    /// The cursor never moves backwards when an earlier step is re-run.
    #[instrument(skip(self, token, request), fields(project_id = %request.project_id))]
    pub async fn submit(&self, token: &str, request: SubmissionRequest) -> Result<SubmissionOutcome, SubmissionError> {
        let mut project = self
            .projects
            .get_by_token(token)
            .await?
            .ok_or(SubmissionError::InvalidToken)?;
        if project.id != request.project_id {
            return Err(SubmissionError::ProjectMismatch(request.project_id));
        }

        let submission = Submission::new(
            project.id,
            request.result,
            request.summary,
            request.details,
            request.commit_sha,
        );
        self.submissions.insert(&submission).await?;

        let details = &submission.details;
        let total_steps = u32::try_from(details.cases.len()).unwrap_or(u32::MAX);
        // The reported index is client input and cannot point past the last step.
        let step_index = details
            .current_step_index
            .map(|index| index.min(total_steps.saturating_sub(1)))
            .unwrap_or(project.current_step_index)
            .max(project.current_step_index);
        let step_passed = details
            .step_result
            .as_ref()
            .map_or(submission.result == SubmissionResult::Pass, |r| r.passed);

        let project_updated = total_steps > 0;
        let mut step_unlocked = false;
        if project_updated {
            project.record_step_result(step_index, step_passed, total_steps);
            self.projects.update(&project).await?;
            step_unlocked = step_passed && !project.all_steps_completed(total_steps);
        }
        let all_completed = total_steps > 0 && project.all_steps_completed(total_steps);

        info!(
            submission_id = %submission.id,
            result = submission.result.as_str(),
            progress = project.progress_percent,
            step = project.current_step_index,
            "submission recorded"
        );

        Ok(SubmissionOutcome {
            submission,
            project,
            project_updated,
            step_unlocked,
            all_completed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::{create_migrated_test_pool, SqliteProjectRepository, SqliteSubmissionRepository};
    use crate::domain::models::{Language, NewProject, ProjectStatus, TestCaseResult};

    async fn setup() -> (SubmissionService, Arc<SqliteProjectRepository>, Arc<SqliteSubmissionRepository>, Project) {
        let pool = create_migrated_test_pool().await.unwrap();
        let projects = Arc::new(SqliteProjectRepository::new(pool.clone()));
        let submissions = Arc::new(SqliteSubmissionRepository::new(pool));
        let project = projects
            .insert(&NewProject::new("u1", "stack", Language::TypeScript, "project-token"))
            .await
            .unwrap();
        (SubmissionService::new(projects.clone(), submissions.clone()), projects, submissions, project)
    }

    fn case(id: &str, passed: bool) -> TestCaseResult {
        TestCaseResult { id: id.into(), passed, message: None }
    }

    fn request(project_id: Uuid, step: u32, passed: bool) -> SubmissionRequest {
        SubmissionRequest {
            project_id,
            result: if passed { SubmissionResult::Pass } else { SubmissionResult::Fail },
            summary: "run".into(),
            details: SubmissionDetails {
                cases: vec![case("push", true), case("pop", passed), case("peek", false), case("size", false)],
                current_step_index: Some(step),
                step_result: Some(case("current", passed)),
            },
            commit_sha: None,
        }
    }

    #[tokio::test]
    async fn test_passing_step_advances_progress() {
        let (service, projects, submissions, project) = setup().await;

        let outcome = service.submit("project-token", request(project.id, 0, true)).await.unwrap();

        assert!(outcome.project_updated);
        assert!(outcome.step_unlocked);
        assert!(!outcome.all_completed);
        assert_eq!(outcome.project.current_step_index, 1);
        assert_eq!(outcome.project.progress_percent, 25);

        let stored = projects.get(project.id).await.unwrap().unwrap();
        assert_eq!(stored.progress_percent, 25);
        assert_eq!(submissions.list_for_project(project.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failing_step_keeps_cursor() {
        let (service, _projects, _submissions, project) = setup().await;

        let outcome = service.submit("project-token", request(project.id, 0, false)).await.unwrap();

        assert!(!outcome.step_unlocked);
        assert_eq!(outcome.project.current_step_index, 0);
        assert_eq!(outcome.project.progress_percent, 0);
    }

    #[tokio::test]
    async fn test_last_step_completes_project() {
        let (service, _projects, _submissions, project) = setup().await;

        let outcome = service.submit("project-token", request(project.id, 3, true)).await.unwrap();

        assert!(outcome.all_completed);
        assert!(!outcome.step_unlocked);
        assert_eq!(outcome.project.status, ProjectStatus::Passed);
        assert_eq!(outcome.project.progress_percent, 100);
    }

    #[tokio::test]
    async fn test_rerunning_earlier_step_does_not_regress() {
        let (service, _projects, _submissions, project) = setup().await;
        service.submit("project-token", request(project.id, 2, true)).await.unwrap();

        let outcome = service.submit("project-token", request(project.id, 0, false)).await.unwrap();

        assert_eq!(outcome.project.current_step_index, 3);
        assert_eq!(outcome.project.progress_percent, 75);
    }

    #[tokio::test]
    async fn test_out_of_range_step_index_is_clamped() {
        let (service, projects, _submissions, project) = setup().await;

        let outcome = service
            .submit("project-token", request(project.id, u32::MAX, true))
            .await
            .unwrap();

        assert_eq!(outcome.project.current_step_index, 4);
        assert_eq!(outcome.project.progress_percent, 100);
        assert_eq!(outcome.project.status, ProjectStatus::Passed);
        let stored = projects.get(project.id).await.unwrap().unwrap();
        assert_eq!(stored.current_step_index, 4);
    }

    #[tokio::test]
    async fn test_unknown_token_is_rejected() {
        let (service, _projects, submissions, project) = setup().await;

        let err = service.submit("nope", request(project.id, 0, true)).await.unwrap_err();

        assert!(matches!(err, SubmissionError::InvalidToken));
        assert!(submissions.list_for_project(project.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mismatched_project_is_forbidden() {
        let (service, _projects, _submissions, _project) = setup().await;

        let err = service.submit("project-token", request(Uuid::new_v4(), 0, true)).await.unwrap_err();

        assert_eq!(err.status_code(), 403);
    }
}
