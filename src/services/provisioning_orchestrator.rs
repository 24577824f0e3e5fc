//! Project provisioning saga.
//!
//! Provisioning spans two systems without a shared transaction: the local
//! project store and the VCS provider. The orchestrator reserves a record,
//! walks the provider calls in order, and on failure applies the single
//! compensation registered for the state it failed to reach.
//!
//! ```text
//! Started -> RecordInserted -> Authenticated -> TemplateVerified
//!         -> RepoCreated -> ConfigWritten -> RecordFinalized
//! ```

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::models::{
    normalize_language, parse_repository_url, Catalog, Language, NewProject, Project,
    ProvisioningConfig,
};
use crate::domain::ports::{
    FileCommit, GenerateRepositoryRequest, Installation, ProjectRepository, Repository,
    TokenGenerator, VcsClient, VcsError, WriteFileRequest,
};
use crate::services::config_writer::ConfigWriter;

/// Saga progress. Each variant is the state reached after a step succeeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SagaState {
    Started,
    RecordInserted,
    Authenticated,
    TemplateVerified,
    RepoCreated,
    ConfigWritten,
    RecordFinalized,
}

/// Undo action owed when a transition fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compensation {
    /// Nothing external exists yet.
    None,
    /// Delete the reserved record, best effort.
    DeleteRecord,
    /// The repository is live; report the inconsistency and keep everything.
    SurfaceInconsistency,
}

impl SagaState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::RecordInserted => "record_inserted",
            Self::Authenticated => "authenticated",
            Self::TemplateVerified => "template_verified",
            Self::RepoCreated => "repo_created",
            Self::ConfigWritten => "config_written",
            Self::RecordFinalized => "record_finalized",
        }
    }

    /// Compensation for a failed transition into this state.
    pub fn compensation(&self) -> Compensation {
        match self {
            Self::Started | Self::RecordInserted => Compensation::None,
            Self::Authenticated
            | Self::TemplateVerified
            | Self::RepoCreated
            | Self::ConfigWritten => Compensation::DeleteRecord,
            Self::RecordFinalized => Compensation::SurfaceInconsistency,
        }
    }
}

/// Provisioning failures as reported to callers.
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("{language} is not available for {exercise_id}. Available languages: {available}")]
    UnsupportedCombination {
        exercise_id: String,
        language: String,
        available: String,
    },

    #[error("a project for {exercise_id} is already being provisioned")]
    AlreadyProvisioning { exercise_id: String },

    #[error("storage error: {0}")]
    StorageError(String),

    #[error("GitHub App authentication failed: {0}")]
    ExternalAuthError(String),

    #[error("template {template} is unavailable: {detail}")]
    TemplateUnavailable { template: String, detail: String },

    #[error("failed to create repository {repository}: {detail}")]
    RepositoryCreationFailed { repository: String, detail: String },

    #[error("failed to configure repository: {0}")]
    WorkspaceSetupFailed(String),

    #[error("repository {repository_url} is ready but project {project_id} could not be updated: {detail}")]
    PartialSuccess {
        project_id: Uuid,
        repository_url: String,
        detail: String,
    },
}

impl ProvisionError {
    /// HTTP status for the error.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Unauthorized(_) => 401,
            Self::InvalidRequest(_) | Self::UnsupportedCombination { .. } => 400,
            Self::AlreadyProvisioning { .. } => 409,
            Self::StorageError(_)
            | Self::TemplateUnavailable { .. }
            | Self::PartialSuccess { .. } => 500,
            Self::ExternalAuthError(_)
            | Self::RepositoryCreationFailed { .. }
            | Self::WorkspaceSetupFailed(_) => 502,
        }
    }

    /// Stable machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::InvalidRequest(_) => "INVALID_REQUEST",
            Self::UnsupportedCombination { .. } => "UNSUPPORTED_COMBINATION",
            Self::AlreadyProvisioning { .. } => "ALREADY_PROVISIONING",
            Self::StorageError(_) => "STORAGE_ERROR",
            Self::ExternalAuthError(_) => "EXTERNAL_AUTH_ERROR",
            Self::TemplateUnavailable { .. } => "TEMPLATE_UNAVAILABLE",
            Self::RepositoryCreationFailed { .. } => "REPOSITORY_CREATION_FAILED",
            Self::WorkspaceSetupFailed(_) => "WORKSPACE_SETUP_FAILED",
            Self::PartialSuccess { .. } => "PARTIAL_SUCCESS",
        }
    }
}

/// Result of a successful provisioning call.
#[derive(Debug, Clone)]
pub struct ProvisionOutcome {
    pub repository_url: String,
    pub project: Project,
    /// An existing ready project was returned instead of creating a new one.
    pub reused: bool,
}

/// A step failure together with the state the saga failed to reach.
struct StepFailure {
    state: SagaState,
    error: ProvisionError,
}

impl StepFailure {
    fn new(state: SagaState, error: ProvisionError) -> Self {
        Self { state, error }
    }
}

/// Template repository for an exercise variant.
pub fn template_name(exercise_id: &str, language: Language) -> String {
    format!("template-dsa-{}-{}", exercise_id, language.suffix())
}

/// Destination repository for a user's attempt, restricted to the
/// provider's repository name alphabet.
pub fn repository_name(user_id: &str, exercise_id: &str, language: Language) -> String {
    format!("{}-{}-{}", user_id, exercise_id, language.suffix())
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') { c } else { '-' })
        .collect()
}

/// Drives the provisioning saga.
pub struct ProvisioningOrchestrator {
    projects: Arc<dyn ProjectRepository>,
    vcs: Arc<dyn VcsClient>,
    tokens: Arc<dyn TokenGenerator>,
    catalog: Catalog,
    config: ProvisioningConfig,
    config_writer: ConfigWriter,
}

impl ProvisioningOrchestrator {
    pub fn new(
        projects: Arc<dyn ProjectRepository>,
        vcs: Arc<dyn VcsClient>,
        tokens: Arc<dyn TokenGenerator>,
        catalog: Catalog,
        config: ProvisioningConfig,
    ) -> Self {
        let config_writer = ConfigWriter::from_config(&config);
        Self {
            projects,
            vcs,
            tokens,
            catalog,
            config,
            config_writer,
        }
    }

    /// Provision (or reuse) the repository for one user's attempt at an exercise.
    #[instrument(skip(self), fields(saga_state))]
    pub async fn provision(
        &self,
        user_id: &str,
        exercise_id: &str,
        language: &str,
    ) -> Result<ProvisionOutcome, ProvisionError> {
        let user_id = user_id.trim();
        let exercise_id = exercise_id.trim();
        if user_id.is_empty() {
            return Err(ProvisionError::InvalidRequest("user id is required".to_string()));
        }
        if exercise_id.is_empty() {
            return Err(ProvisionError::InvalidRequest("exerciseId is required".to_string()));
        }

        let normalized = normalize_language(language);
        let language = self.catalog.resolve(exercise_id, &normalized).ok_or_else(|| {
            ProvisionError::UnsupportedCombination {
                exercise_id: exercise_id.to_string(),
                language: normalized.clone(),
                available: self.catalog.available_languages(exercise_id),
            }
        })?;

        if let Some(outcome) = self.reuse_existing(user_id, exercise_id).await? {
            return Ok(outcome);
        }

        let project = self.reserve_record(user_id, exercise_id, language).await?;
        self.enter(SagaState::RecordInserted, &project);

        let repository = match self.provision_repository(&project, language).await {
            Ok(repository) => repository,
            Err(failure) => {
                self.compensate(failure.state, &project).await;
                return Err(failure.error);
            }
        };

        self.finalize(project, repository).await
    }

    /// Create-or-update the workspace config file on the repository's
    /// default branch. Reads the existing revision marker first so repeated
    /// writes update in place instead of conflicting.
    pub async fn write_workspace_config(
        &self,
        repository: &Repository,
        content: Vec<u8>,
    ) -> Result<FileCommit, VcsError> {
        let branch = repository.default_branch.clone().ok_or_else(|| {
            VcsError::Unknown(format!(
                "repository {}/{} reports no default branch",
                repository.owner, repository.name
            ))
        })?;

        let path = &self.config.config_path;
        let sha = match self
            .vcs
            .read_file(&repository.owner, &repository.name, path, &branch)
            .await
        {
            Ok(existing) => {
                debug!(path = %path, sha = %existing.sha, "updating existing config file");
                Some(existing.sha)
            }
            Err(e) if e.is_not_found() => None,
            Err(e) => return Err(e),
        };

        let request = WriteFileRequest {
            path: path.clone(),
            message: self.config.commit_message.clone(),
            content,
            branch,
            sha,
        };
        self.vcs
            .write_file(&repository.owner, &repository.name, &request)
            .await
    }

    fn enter(&self, state: SagaState, project: &Project) {
        tracing::Span::current().record("saga_state", state.as_str());
        debug!(project_id = %project.id, state = state.as_str(), "saga state reached");
    }

    /// Return a usable existing project, or clear the way for a new one.
    async fn reuse_existing(
        &self,
        user_id: &str,
        exercise_id: &str,
    ) -> Result<Option<ProvisionOutcome>, ProvisionError> {
        let Some(existing) = self
            .projects
            .find_for_user_exercise(user_id, exercise_id)
            .await
            .map_err(storage_error)?
        else {
            return Ok(None);
        };

        if let Some(url) = existing.repository_url.clone() {
            let Some((owner, name)) = parse_repository_url(&url) else {
                warn!(
                    project_id = %existing.id,
                    repository_url = %url,
                    "stored repository URL is malformed, reprovisioning"
                );
                self.projects.delete(existing.id).await.map_err(storage_error)?;
                return Ok(None);
            };

            let reused = ProvisionOutcome {
                repository_url: url.clone(),
                project: existing.clone(),
                reused: true,
            };
            return match self.vcs.get_repository(&owner, &name).await {
                Ok(_) => {
                    info!(
                        project_id = %existing.id,
                        repository_url = %url,
                        "reusing existing project"
                    );
                    Ok(Some(reused))
                }
                Err(e) if e.is_not_found() => {
                    warn!(
                        project_id = %existing.id,
                        repository_url = %url,
                        "repository no longer exists, reprovisioning"
                    );
                    self.projects.delete(existing.id).await.map_err(storage_error)?;
                    Ok(None)
                }
                Err(e) => {
                    warn!(
                        project_id = %existing.id,
                        error = %e,
                        "could not verify existing repository, returning it unchanged"
                    );
                    Ok(Some(reused))
                }
            };
        }

        if !existing.is_orphaned(Utc::now(), self.config.orphan_timeout()) {
            return Err(ProvisionError::AlreadyProvisioning {
                exercise_id: exercise_id.to_string(),
            });
        }

        if let Some(outcome) = self.resume_unfinished(existing.clone()).await? {
            return Ok(Some(outcome));
        }

        warn!(
            project_id = %existing.id,
            created_at = %existing.created_at,
            "removing orphaned project record"
        );
        self.projects.delete(existing.id).await.map_err(storage_error)?;
        Ok(None)
    }

    /// Finish an orphaned attempt whose repository was already generated.
    ///
    /// Covers a saga that stopped after step 6, most often a failed final
    /// record update. The config is rewritten in place and the record is
    /// finalized; nothing is generated again. Returns `None` when the
    /// destination repository does not exist.
    async fn resume_unfinished(
        &self,
        project: Project,
    ) -> Result<Option<ProvisionOutcome>, ProvisionError> {
        let installation = self
            .vcs
            .verify_installation()
            .await
            .map_err(|e| ProvisionError::ExternalAuthError(e.detail().to_string()))?;
        let owner = self.resolve_owner(&installation)?;
        let name = repository_name(&project.user_id, &project.exercise_id, project.language);

        let repository = match self.vcs.get_repository(&owner, &name).await {
            Ok(repository) => repository,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => {
                return Err(ProvisionError::WorkspaceSetupFailed(format!(
                    "could not check existing repository {owner}/{name}: {e}"
                )))
            }
        };
        info!(
            project_id = %project.id,
            repository_url = %repository.html_url,
            "resuming unfinished project on existing repository"
        );

        self.configure_workspace(&project, project.language, &repository)
            .await
            .map_err(|failure| failure.error)?;
        self.finalize(project, repository).await.map(Some)
    }

    async fn reserve_record(
        &self,
        user_id: &str,
        exercise_id: &str,
        language: Language,
    ) -> Result<Project, ProvisionError> {
        let new_project = NewProject::new(user_id, exercise_id, language, self.tokens.generate());
        self.projects.insert(&new_project).await.map_err(|e| match e {
            DomainError::DuplicateProject { exercise_id, .. } => {
                ProvisionError::AlreadyProvisioning { exercise_id }
            }
            other => storage_error(other),
        })
    }

    /// Steps 3 through 9: everything between reserving and finalizing the record.
    async fn provision_repository(
        &self,
        project: &Project,
        language: Language,
    ) -> Result<Repository, StepFailure> {
        let installation = self.vcs.verify_installation().await.map_err(|e| {
            StepFailure::new(
                SagaState::Authenticated,
                ProvisionError::ExternalAuthError(e.detail().to_string()),
            )
        })?;
        let owner = self
            .resolve_owner(&installation)
            .map_err(|e| StepFailure::new(SagaState::Authenticated, e))?;
        self.enter(SagaState::Authenticated, project);

        let template = template_name(&project.exercise_id, language);
        let template_repo = self
            .vcs
            .get_repository(&owner, &template)
            .await
            .map_err(|e| {
                StepFailure::new(
                    SagaState::TemplateVerified,
                    ProvisionError::TemplateUnavailable {
                        template: format!("{owner}/{template}"),
                        detail: e.to_string(),
                    },
                )
            })?;
        if !template_repo.is_template {
            return Err(StepFailure::new(
                SagaState::TemplateVerified,
                ProvisionError::TemplateUnavailable {
                    template: format!("{owner}/{template}"),
                    detail: "repository is not marked as a template".to_string(),
                },
            ));
        }
        self.enter(SagaState::TemplateVerified, project);

        let name = repository_name(&project.user_id, &project.exercise_id, language);
        let request = GenerateRepositoryRequest {
            template_owner: template_repo.owner.clone(),
            template_repo: template_repo.name.clone(),
            owner: owner.clone(),
            name: name.clone(),
            description: format!("DSA Lab: {} challenge in {}", project.exercise_id, language),
            private: true,
        };
        let created = self
            .vcs
            .create_repository_from_template(&request)
            .await
            .map_err(|e| {
                StepFailure::new(
                    SagaState::RepoCreated,
                    ProvisionError::RepositoryCreationFailed {
                        repository: format!("{owner}/{name}"),
                        detail: e.to_string(),
                    },
                )
            })?;
        info!(
            project_id = %project.id,
            repository_url = %created.html_url,
            "repository created from template"
        );
        self.enter(SagaState::RepoCreated, project);

        // The only deliberate wait: one fixed delay, then exactly one fetch.
        tokio::time::sleep(self.config.settle_delay()).await;
        let repository = self
            .vcs
            .get_repository(&created.owner, &created.name)
            .await
            .map_err(|e| {
                StepFailure::new(
                    SagaState::ConfigWritten,
                    ProvisionError::WorkspaceSetupFailed(format!(
                        "repository {}/{} not readable after settling: {e}",
                        created.owner, created.name
                    )),
                )
            })?;

        self.configure_workspace(project, language, &repository).await?;
        Ok(repository)
    }

    /// Steps 8 and 9: build the config and commit it to the repository.
    async fn configure_workspace(
        &self,
        project: &Project,
        language: Language,
        repository: &Repository,
    ) -> Result<(), StepFailure> {
        let payload = self
            .config_writer
            .build_config(project, &project.exercise_id, language.as_str())
            .map_err(|e| {
                StepFailure::new(
                    SagaState::ConfigWritten,
                    ProvisionError::WorkspaceSetupFailed(e.to_string()),
                )
            })?;
        let commit = self
            .write_workspace_config(repository, payload)
            .await
            .map_err(|e| {
                StepFailure::new(
                    SagaState::ConfigWritten,
                    ProvisionError::WorkspaceSetupFailed(format!(
                        "failed to write {}: {e}",
                        self.config.config_path
                    )),
                )
            })?;
        debug!(commit_sha = %commit.commit_sha, path = %commit.path, "workspace config committed");
        self.enter(SagaState::ConfigWritten, project);

        Ok(())
    }

    /// The installation's own account wins over the configured organization.
    fn resolve_owner(&self, installation: &Installation) -> Result<String, ProvisionError> {
        let expected = self.config.organization.as_deref();
        match (installation.account_login.as_deref(), expected) {
            (Some(actual), Some(expected)) if !actual.eq_ignore_ascii_case(expected) => {
                warn!(
                    configured = expected,
                    actual,
                    "installation account differs from configured organization, using it"
                );
                Ok(actual.to_string())
            }
            (Some(actual), _) => Ok(actual.to_string()),
            (None, Some(expected)) => Ok(expected.to_string()),
            (None, None) => Err(ProvisionError::ExternalAuthError(format!(
                "installation {} reports no account and no organization is configured",
                installation.id
            ))),
        }
    }

    async fn finalize(
        &self,
        mut project: Project,
        repository: Repository,
    ) -> Result<ProvisionOutcome, ProvisionError> {
        project.attach_repository(&repository.html_url);

        if let Err(e) = self.projects.update(&project).await {
            self.compensate(SagaState::RecordFinalized, &project).await;
            return Err(ProvisionError::PartialSuccess {
                project_id: project.id,
                repository_url: repository.html_url,
                detail: e.to_string(),
            });
        }

        self.enter(SagaState::RecordFinalized, &project);
        info!(
            project_id = %project.id,
            repository_url = %repository.html_url,
            "project provisioned"
        );

        Ok(ProvisionOutcome {
            repository_url: repository.html_url,
            project,
            reused: false,
        })
    }

    async fn compensate(&self, failed: SagaState, project: &Project) {
        match failed.compensation() {
            Compensation::None => {}
            Compensation::DeleteRecord => match self.projects.delete(project.id).await {
                Ok(()) => info!(
                    project_id = %project.id,
                    failed_state = failed.as_str(),
                    "compensated: project record deleted"
                ),
                Err(e) => error!(
                    project_id = %project.id,
                    failed_state = failed.as_str(),
                    error = %e,
                    "compensation failed: project record could not be deleted"
                ),
            },
            Compensation::SurfaceInconsistency => error!(
                project_id = %project.id,
                repository_url = project.repository_url.as_deref().unwrap_or_default(),
                "repository is configured but the project record was not updated"
            ),
        }
    }
}

fn storage_error(e: DomainError) -> ProvisionError {
    ProvisionError::StorageError(e.to_string())
}
