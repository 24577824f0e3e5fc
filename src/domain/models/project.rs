//! Project domain model.
//!
//! A project is one user's attempt at one exercise in one language. It is
//! the local provisioning record that mirrors the user's private exercise
//! repository on the VCS provider.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::catalog::Language;

/// Lifecycle status of a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    /// Provisioned or being provisioned; the user is working through steps
    #[default]
    InProgress,
    /// Every step passed
    Passed,
    /// Marked failed by the submission path
    Failed,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InProgress => "in_progress",
            Self::Passed => "passed",
            Self::Failed => "failed",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "in_progress" => Some(Self::InProgress),
            "passed" => Some(Self::Passed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// Fields supplied by the caller when reserving a project.
///
/// The store assigns `id` and the timestamps on insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProject {
    pub user_id: String,
    pub exercise_id: String,
    pub language: Language,
    pub project_token: String,
}

impl NewProject {
    pub fn new(
        user_id: impl Into<String>,
        exercise_id: impl Into<String>,
        language: Language,
        project_token: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            exercise_id: exercise_id.into(),
            language,
            project_token: project_token.into(),
        }
    }
}

/// A provisioning record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    /// Unique identifier, assigned by the store
    pub id: Uuid,
    /// Owning user
    pub user_id: String,
    /// Catalog key of the exercise
    pub exercise_id: String,
    /// Language variant
    pub language: Language,
    /// Current status
    pub status: ProjectStatus,
    /// Completion percentage (0-100)
    pub progress_percent: u8,
    /// Browser URL of the provisioned repository, once provisioning succeeded
    pub repository_url: Option<String>,
    /// Credential the exercise CLI presents when submitting results
    pub project_token: String,
    /// Index of the step the user is currently working on
    pub current_step_index: u32,
    /// When created
    pub created_at: DateTime<Utc>,
    /// When last updated
    pub updated_at: DateTime<Utc>,
}

impl Project {
    /// Whether provisioning finished and the repository is usable.
    pub fn is_ready(&self) -> bool {
        self.repository_url.is_some()
    }

    /// An `in_progress` record without a repository that outlived the
    /// provisioning timeout.
    pub fn is_orphaned(&self, now: DateTime<Utc>, timeout: Duration) -> bool {
        self.status == ProjectStatus::InProgress
            && !self.is_ready()
            && now.signed_duration_since(self.created_at) > timeout
    }

    /// Record the provisioned repository address.
    pub fn attach_repository(&mut self, url: impl Into<String>) {
        self.repository_url = Some(url.into());
        self.updated_at = Utc::now();
    }

    /// Apply the outcome of a step submission.
    ///
    /// Advances the step cursor when the current step passed, recomputes the
    /// completion percentage from `total_steps`, and marks the project passed
    /// once every step is done. Progress never decreases.
    pub fn record_step_result(&mut self, step_index: u32, step_passed: bool, total_steps: u32) {
        let next_index = if step_passed { step_index.saturating_add(1) } else { step_index };

        let mut progress = if total_steps == 0 {
            0
        } else {
            let ratio = f64::from(next_index.min(total_steps)) / f64::from(total_steps);
            (ratio * 100.0).round() as u8
        };

        if total_steps > 0 && next_index >= total_steps && step_passed {
            self.status = ProjectStatus::Passed;
            progress = 100;
        }

        self.current_step_index = next_index;
        self.progress_percent = self.progress_percent.max(progress.min(100));
        self.updated_at = Utc::now();
    }

    /// Whether every step is done.
    pub fn all_steps_completed(&self, total_steps: u32) -> bool {
        self.current_step_index >= total_steps
    }
}

/// Split a GitHub browser URL into `(owner, repo)`.
pub fn parse_repository_url(url: &str) -> Option<(String, String)> {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))?;
    let mut parts = rest.splitn(2, '/');
    let _host = parts.next()?;
    let mut path = parts.next()?.trim_end_matches('/').split('/');
    let owner = path.next().filter(|s| !s.is_empty())?;
    let repo = path.next().filter(|s| !s.is_empty())?;
    let repo = repo.strip_suffix(".git").unwrap_or(repo);
    Some((owner.to_string(), repo.to_string()))
}
