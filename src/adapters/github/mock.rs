//! In-memory VCS provider for testing.
//!
//! Behaves like the subset of GitHub provisioning relies on: template
//! generation copies the template's files, file writes require the current
//! `sha` to update an existing file, and any operation can be forced to fail.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::domain::ports::{
    FileCommit, GenerateRepositoryRequest, Installation, Repository, RepositoryFile, VcsClient,
    VcsError, VcsResult, WriteFileRequest,
};

/// Operations recorded by [`MockVcsClient`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VcsOperation {
    VerifyInstallation,
    GetRepository,
    CreateRepository,
    ReadFile,
    WriteFile,
    DeleteRepository,
}

impl VcsOperation {
    /// Whether the operation changes provider state.
    pub fn is_write(&self) -> bool {
        matches!(self, Self::CreateRepository | Self::WriteFile | Self::DeleteRepository)
    }
}

type RepoKey = (String, String);
type FileKey = (String, String, String);

#[derive(Default)]
struct MockState {
    installation_account: Option<String>,
    repositories: HashMap<RepoKey, Repository>,
    files: HashMap<FileKey, RepositoryFile>,
    failures: HashMap<VcsOperation, VcsError>,
    calls: Vec<VcsOperation>,
    revision: u64,
}

impl MockState {
    fn next_sha(&mut self) -> String {
        self.revision += 1;
        format!("{:040x}", self.revision)
    }

    fn record(&mut self, op: VcsOperation) -> VcsResult<()> {
        self.calls.push(op);
        match self.failures.get(&op) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

/// In-memory [`VcsClient`].
#[derive(Default)]
pub struct MockVcsClient {
    state: Mutex<MockState>,
}

impl MockVcsClient {
    /// A provider whose installation belongs to `account`.
    pub fn new(account: impl Into<String>) -> Self {
        let client = Self::default();
        client.lock().installation_account = Some(account.into());
        client
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Add a repository marked as a template.
    pub fn with_template(self, owner: &str, name: &str) -> Self {
        self.insert_repository(owner, name, true);
        self
    }

    /// Add a plain (non-template) repository.
    pub fn with_repository(self, owner: &str, name: &str) -> Self {
        self.insert_repository(owner, name, false);
        self
    }

    /// Seed a file.
    pub fn with_file(self, owner: &str, repo: &str, path: &str, content: &[u8]) -> Self {
        {
            let mut state = self.lock();
            let sha = state.next_sha();
            state.files.insert(
                (owner.to_string(), repo.to_string(), path.to_string()),
                RepositoryFile {
                    path: path.to_string(),
                    sha,
                    content: content.to_vec(),
                },
            );
        }
        self
    }

    /// Make every call to `op` fail with `err`.
    pub fn fail(self, op: VcsOperation, err: VcsError) -> Self {
        self.lock().failures.insert(op, err);
        self
    }

    fn insert_repository(&self, owner: &str, name: &str, is_template: bool) {
        self.lock().repositories.insert(
            (owner.to_string(), name.to_string()),
            Repository {
                owner: owner.to_string(),
                name: name.to_string(),
                html_url: format!("https://github.com/{owner}/{name}"),
                default_branch: Some("main".to_string()),
                is_template,
                private: !is_template,
            },
        );
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<VcsOperation> {
        self.lock().calls.clone()
    }

    /// Number of calls that changed provider state.
    pub fn write_count(&self) -> usize {
        self.lock().calls.iter().filter(|op| op.is_write()).count()
    }

    pub fn repository(&self, owner: &str, name: &str) -> Option<Repository> {
        self.lock()
            .repositories
            .get(&(owner.to_string(), name.to_string()))
            .cloned()
    }

    pub fn file(&self, owner: &str, repo: &str, path: &str) -> Option<RepositoryFile> {
        self.lock()
            .files
            .get(&(owner.to_string(), repo.to_string(), path.to_string()))
            .cloned()
    }

    /// Names of all non-template repositories.
    pub fn created_repositories(&self) -> Vec<String> {
        self.lock()
            .repositories
            .values()
            .filter(|r| !r.is_template)
            .map(|r| format!("{}/{}", r.owner, r.name))
            .collect()
    }
}

#[async_trait]
impl VcsClient for MockVcsClient {
    async fn verify_installation(&self) -> VcsResult<Installation> {
        let mut state = self.lock();
        state.record(VcsOperation::VerifyInstallation)?;
        Ok(Installation {
            id: 1,
            account_login: state.installation_account.clone(),
        })
    }

    async fn get_repository(&self, owner: &str, name: &str) -> VcsResult<Repository> {
        let mut state = self.lock();
        state.record(VcsOperation::GetRepository)?;
        state
            .repositories
            .get(&(owner.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| VcsError::NotFound("Not Found".to_string()))
    }

    async fn create_repository_from_template(
        &self,
        request: &GenerateRepositoryRequest,
    ) -> VcsResult<Repository> {
        let mut state = self.lock();
        state.record(VcsOperation::CreateRepository)?;

        let template_key = (request.template_owner.clone(), request.template_repo.clone());
        match state.repositories.get(&template_key) {
            Some(template) if template.is_template => {}
            _ => return Err(VcsError::NotFound("Not Found".to_string())),
        }

        let key = (request.owner.clone(), request.name.clone());
        if state.repositories.contains_key(&key) {
            return Err(VcsError::Conflict(
                "Repository creation failed. Name already exists on this account".to_string(),
            ));
        }

        let template_files: Vec<RepositoryFile> = state
            .files
            .iter()
            .filter(|((o, r, _), _)| *o == template_key.0 && *r == template_key.1)
            .map(|(_, f)| f.clone())
            .collect();
        for file in template_files {
            state
                .files
                .insert((request.owner.clone(), request.name.clone(), file.path.clone()), file);
        }

        let repo = Repository {
            owner: request.owner.clone(),
            name: request.name.clone(),
            html_url: format!("https://github.com/{}/{}", request.owner, request.name),
            default_branch: Some("main".to_string()),
            is_template: false,
            private: request.private,
        };
        state.repositories.insert(key, repo.clone());
        Ok(repo)
    }

    async fn read_file(
        &self,
        owner: &str,
        name: &str,
        path: &str,
        _branch: &str,
    ) -> VcsResult<RepositoryFile> {
        let mut state = self.lock();
        state.record(VcsOperation::ReadFile)?;
        state
            .files
            .get(&(owner.to_string(), name.to_string(), path.to_string()))
            .cloned()
            .ok_or_else(|| VcsError::NotFound("Not Found".to_string()))
    }

    async fn write_file(
        &self,
        owner: &str,
        name: &str,
        request: &WriteFileRequest,
    ) -> VcsResult<FileCommit> {
        let mut state = self.lock();
        state.record(VcsOperation::WriteFile)?;

        if !state.repositories.contains_key(&(owner.to_string(), name.to_string())) {
            return Err(VcsError::NotFound("Not Found".to_string()));
        }

        let key = (owner.to_string(), name.to_string(), request.path.clone());
        if let Some(existing) = state.files.get(&key) {
            if request.sha.as_deref() != Some(existing.sha.as_str()) {
                return Err(VcsError::Conflict(format!(
                    "{} does not match {}",
                    request.path, existing.sha
                )));
            }
        }

        let sha = state.next_sha();
        let commit_sha = state.next_sha();
        state.files.insert(
            key,
            RepositoryFile {
                path: request.path.clone(),
                sha: sha.clone(),
                content: request.content.clone(),
            },
        );

        Ok(FileCommit {
            path: request.path.clone(),
            sha,
            commit_sha,
        })
    }

    async fn delete_repository(&self, owner: &str, name: &str) -> VcsResult<()> {
        let mut state = self.lock();
        state.record(VcsOperation::DeleteRepository)?;
        if state
            .repositories
            .remove(&(owner.to_string(), name.to_string()))
            .is_none()
        {
            return Err(VcsError::NotFound("Not Found".to_string()));
        }
        state.files.retain(|(o, r, _), _| !(o == owner && r == name));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_generation_copies_template_files() {
        let vcs = MockVcsClient::new("org")
            .with_template("org", "tpl")
            .with_file("org", "tpl", "dsa.config.json", b"{}");

        vcs.create_repository_from_template(&GenerateRepositoryRequest {
            template_owner: "org".into(),
            template_repo: "tpl".into(),
            owner: "org".into(),
            name: "copy".into(),
            description: String::new(),
            private: true,
        })
        .await
        .unwrap();

        assert!(vcs.file("org", "copy", "dsa.config.json").is_some());
        assert_eq!(vcs.created_repositories(), vec!["org/copy".to_string()]);
    }

    #[tokio::test]
    async fn test_blind_overwrite_conflicts() {
        let vcs = MockVcsClient::new("org")
            .with_repository("org", "r")
            .with_file("org", "r", "a.json", b"1");

        let err = vcs
            .write_file(
                "org",
                "r",
                &WriteFileRequest {
                    path: "a.json".into(),
                    message: "m".into(),
                    content: b"2".to_vec(),
                    branch: "main".into(),
                    sha: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, VcsError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_forced_failure_is_recorded() {
        let vcs = MockVcsClient::new("org").fail(VcsOperation::VerifyInstallation, VcsError::AuthFailed("bad key".into()));
        assert!(vcs.verify_installation().await.is_err());
        assert_eq!(vcs.calls(), vec![VcsOperation::VerifyInstallation]);
        assert_eq!(vcs.write_count(), 0);
    }
}
