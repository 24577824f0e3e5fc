//! Wiring of adapters and services shared by the CLI commands.

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use std::sync::Arc;

use crate::adapters::github::GitHubAppClient;
use crate::adapters::sqlite::{
    initialize_database, PoolConfig, SqliteProjectRepository, SqliteSubmissionRepository,
};
use crate::domain::models::{Catalog, Config};
use crate::domain::ports::{ProjectRepository, SubmissionRepository, VcsClient};
use crate::services::{
    ProjectService, ProvisioningOrchestrator, RandomTokenGenerator, SubmissionService,
};

/// Opened store plus lazily-built provider client.
pub struct ServiceContext {
    config: Config,
    pool: SqlitePool,
    projects: Arc<dyn ProjectRepository>,
    submissions: Arc<dyn SubmissionRepository>,
}

impl ServiceContext {
    /// Open (and migrate) the configured database.
    pub async fn open(config: &Config) -> Result<Self> {
        let pool = initialize_database(
            &config.database.url(),
            Some(PoolConfig::from(&config.database)),
        )
        .await
        .with_context(|| format!("Failed to initialize database at {}", config.database.path))?;

        Ok(Self {
            config: config.clone(),
            projects: Arc::new(SqliteProjectRepository::new(pool.clone())),
            submissions: Arc::new(SqliteSubmissionRepository::new(pool.clone())),
            pool,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// GitHub App client built from the `github` section.
    pub fn vcs(&self) -> Result<Arc<dyn VcsClient>> {
        let client = GitHubAppClient::from_config(&self.config.github)
            .context("GitHub App credentials are not usable")?;
        Ok(Arc::new(client))
    }

    pub fn orchestrator(&self) -> Result<ProvisioningOrchestrator> {
        Ok(ProvisioningOrchestrator::new(
            self.projects.clone(),
            self.vcs()?,
            Arc::new(RandomTokenGenerator),
            Catalog::builtin(),
            self.config.provisioning.clone(),
        ))
    }

    pub fn project_service(&self) -> Result<ProjectService> {
        Ok(ProjectService::new(self.projects.clone(), self.vcs()?))
    }

    pub fn submission_service(&self) -> SubmissionService {
        SubmissionService::new(self.projects.clone(), self.submissions.clone())
    }

    pub fn projects(&self) -> Arc<dyn ProjectRepository> {
        self.projects.clone()
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}
