//! VCS provider port.
//!
//! The provisioning saga talks to the hosting provider only through this
//! trait. Every method is a single, retryless call; retries and
//! compensation are decided by the caller.

use async_trait::async_trait;
use thiserror::Error;

/// Classified provider failure. Every variant carries the provider's raw
/// message so operators can diagnose configuration problems.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VcsError {
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("provider error: {0}")]
    Unknown(String),
}

impl VcsError {
    /// The provider's raw diagnostic text.
    pub fn detail(&self) -> &str {
        match self {
            Self::AuthFailed(msg)
            | Self::NotFound(msg)
            | Self::Conflict(msg)
            | Self::RateLimited(msg)
            | Self::Unknown(msg) => msg,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

pub type VcsResult<T> = Result<T, VcsError>;

/// The app installation the client is authenticated as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Installation {
    pub id: u64,
    /// Login of the account (organization or user) the app is installed on
    pub account_login: Option<String>,
}

/// Repository metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repository {
    pub owner: String,
    pub name: String,
    pub html_url: String,
    /// Unset while the provider is still initializing a generated repository
    pub default_branch: Option<String>,
    pub is_template: bool,
    pub private: bool,
}

/// Parameters for generating a repository from a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateRepositoryRequest {
    pub template_owner: String,
    pub template_repo: String,
    pub owner: String,
    pub name: String,
    pub description: String,
    pub private: bool,
}

/// A file read from a repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryFile {
    pub path: String,
    /// Content-addressed revision marker, required to update the file
    pub sha: String,
    pub content: Vec<u8>,
}

/// Create-or-update request for a single file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteFileRequest {
    pub path: String,
    pub message: String,
    pub content: Vec<u8>,
    pub branch: String,
    /// Revision marker of the existing file; `None` creates the file
    pub sha: Option<String>,
}

/// Result of a file write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileCommit {
    pub path: String,
    /// New revision marker of the file
    pub sha: String,
    pub commit_sha: String,
}

/// Hosting provider operations used by provisioning.
#[async_trait]
pub trait VcsClient: Send + Sync {
    /// Authenticate as the installed application and describe the installation.
    async fn verify_installation(&self) -> VcsResult<Installation>;

    /// Fetch repository metadata.
    async fn get_repository(&self, owner: &str, name: &str) -> VcsResult<Repository>;

    /// Generate a new repository from a template.
    async fn create_repository_from_template(
        &self,
        request: &GenerateRepositoryRequest,
    ) -> VcsResult<Repository>;

    /// Read a file. Absent files are reported as [`VcsError::NotFound`].
    async fn read_file(
        &self,
        owner: &str,
        name: &str,
        path: &str,
        branch: &str,
    ) -> VcsResult<RepositoryFile>;

    /// Create or update a file.
    async fn write_file(
        &self,
        owner: &str,
        name: &str,
        request: &WriteFileRequest,
    ) -> VcsResult<FileCommit>;

    /// Delete a repository.
    async fn delete_repository(&self, owner: &str, name: &str) -> VcsResult<()>;
}
