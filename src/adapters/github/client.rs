//! GitHub App client implementing the [`VcsClient`] port.
//!
//! Each operation is exactly one REST call (plus an installation token
//! exchange when the cached token is stale). Non-success responses are
//! classified into [`VcsError`] with the provider's message preserved.

use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use tracing::instrument;

use crate::domain::models::GitHubConfig;
use crate::domain::ports::{
    FileCommit, GenerateRepositoryRequest, Installation, Repository, RepositoryFile, VcsClient,
    VcsError, VcsResult, WriteFileRequest,
};

use super::auth::{AppCredentials, GitHubAuthError, GitHubCredentials};
use super::models::{
    GitHubContent, GitHubErrorBody, GitHubGenerateRequest, GitHubInstallation,
    GitHubPutContentRequest, GitHubPutContentResponse, GitHubRepository,
};

const USER_AGENT: &str = "dsalab-provisioner";

/// Build an authorized GitHub REST request.
pub(super) fn github_request(http: &Client, method: Method, url: &str, token: &str) -> RequestBuilder {
    http.request(method, url)
        .header("Authorization", format!("Bearer {token}"))
        .header("Accept", "application/vnd.github+json")
        .header("X-GitHub-Api-Version", "2022-11-28")
        .header("User-Agent", USER_AGENT)
}

pub(super) fn transport_error(err: reqwest::Error) -> VcsError {
    VcsError::Unknown(format!("GitHub request failed: {err}"))
}

/// Map an HTTP status to an error class.
///
/// GitHub reports exhausted primary rate limits as 403 with
/// `x-ratelimit-remaining: 0`, and secondary limits as 403 with a message
/// mentioning the rate limit.
pub fn classify_status(status: StatusCode, rate_limit_exhausted: bool, detail: String) -> VcsError {
    match status.as_u16() {
        401 => VcsError::AuthFailed(detail),
        403 if rate_limit_exhausted || detail.to_lowercase().contains("rate limit") => {
            VcsError::RateLimited(detail)
        }
        403 => VcsError::AuthFailed(detail),
        404 => VcsError::NotFound(detail),
        409 | 422 => VcsError::Conflict(detail),
        429 => VcsError::RateLimited(detail),
        _ => VcsError::Unknown(detail),
    }
}

/// Consume a failed response into a classified error.
pub(super) async fn error_from_response(resp: Response) -> VcsError {
    let status = resp.status();
    let rate_limit_exhausted = resp
        .headers()
        .get("x-ratelimit-remaining")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.trim() == "0");
    let body = resp.text().await.unwrap_or_default();

    let detail = match serde_json::from_str::<GitHubErrorBody>(&body) {
        Ok(GitHubErrorBody { message: Some(message), errors: Some(errors) }) => {
            format!("{message} {errors}")
        }
        Ok(GitHubErrorBody { message: Some(message), errors: None }) => message,
        _ if body.trim().is_empty() => status.to_string(),
        _ => body,
    };

    classify_status(status, rate_limit_exhausted, detail)
}

fn parse_error(what: &str, err: reqwest::Error) -> VcsError {
    VcsError::Unknown(format!("failed to parse {what}: {err}"))
}

impl From<GitHubRepository> for Repository {
    fn from(repo: GitHubRepository) -> Self {
        Self {
            owner: repo.owner.login,
            name: repo.name,
            html_url: repo.html_url,
            default_branch: repo.default_branch,
            is_template: repo.is_template,
            private: repo.private,
        }
    }
}

/// GitHub REST client authenticated as an installed GitHub App.
#[derive(Clone)]
pub struct GitHubAppClient {
    http: Client,
    api_base_url: String,
    credentials: Arc<dyn GitHubCredentials>,
}

impl GitHubAppClient {
    pub fn new(api_base_url: impl Into<String>, credentials: Arc<dyn GitHubCredentials>) -> Self {
        Self::with_http(Client::new(), api_base_url, credentials)
    }

    pub fn with_http(
        http: Client,
        api_base_url: impl Into<String>,
        credentials: Arc<dyn GitHubCredentials>,
    ) -> Self {
        Self {
            http,
            api_base_url: api_base_url.into().trim_end_matches('/').to_string(),
            credentials,
        }
    }

    /// Client with real app credentials from configuration.
    pub fn from_config(config: &GitHubConfig) -> Result<Self, GitHubAuthError> {
        let http = Client::new();
        let credentials = AppCredentials::from_config(http.clone(), config)?;
        Ok(Self::with_http(http, &config.api_base_url, Arc::new(credentials)))
    }

    async fn installation_request(&self, method: Method, path: &str) -> VcsResult<RequestBuilder> {
        let token = self.credentials.installation_token().await?;
        let url = format!("{}{}", self.api_base_url, path);
        Ok(github_request(&self.http, method, &url, &token))
    }

    async fn send(request: RequestBuilder) -> VcsResult<Response> {
        let resp = request.send().await.map_err(transport_error)?;
        if resp.status().is_success() {
            Ok(resp)
        } else {
            Err(error_from_response(resp).await)
        }
    }
}

#[async_trait]
impl VcsClient for GitHubAppClient {
    #[instrument(skip(self), fields(installation_id = self.credentials.installation_id()))]
    async fn verify_installation(&self) -> VcsResult<Installation> {
        // Exchanging for an installation token proves the app can act on the installation.
        self.credentials.installation_token().await?;

        let app_token = self.credentials.app_token().await?;
        let url = format!(
            "{}/app/installations/{}",
            self.api_base_url,
            self.credentials.installation_id()
        );
        let resp = Self::send(github_request(&self.http, Method::GET, &url, &app_token)).await?;
        let installation: GitHubInstallation =
            resp.json().await.map_err(|e| parse_error("installation", e))?;

        Ok(Installation {
            id: installation.id,
            account_login: installation.account.map(|a| a.login),
        })
    }

    #[instrument(skip(self))]
    async fn get_repository(&self, owner: &str, name: &str) -> VcsResult<Repository> {
        let request = self
            .installation_request(Method::GET, &format!("/repos/{owner}/{name}"))
            .await?;
        let repo: GitHubRepository = Self::send(request)
            .await?
            .json()
            .await
            .map_err(|e| parse_error("repository", e))?;
        Ok(repo.into())
    }

    #[instrument(skip(self, request), fields(template = %request.template_repo, owner = %request.owner, name = %request.name))]
    async fn create_repository_from_template(
        &self,
        request: &GenerateRepositoryRequest,
    ) -> VcsResult<Repository> {
        let body = GitHubGenerateRequest {
            owner: request.owner.clone(),
            name: request.name.clone(),
            description: request.description.clone(),
            private: request.private,
            include_all_branches: false,
        };
        let path = format!(
            "/repos/{}/{}/generate",
            request.template_owner, request.template_repo
        );
        let http_request = self.installation_request(Method::POST, &path).await?.json(&body);
        let repo: GitHubRepository = Self::send(http_request)
            .await?
            .json()
            .await
            .map_err(|e| parse_error("generated repository", e))?;
        Ok(repo.into())
    }

    #[instrument(skip(self))]
    async fn read_file(
        &self,
        owner: &str,
        name: &str,
        path: &str,
        branch: &str,
    ) -> VcsResult<RepositoryFile> {
        let request = self
            .installation_request(Method::GET, &format!("/repos/{owner}/{name}/contents/{path}"))
            .await?
            .query(&[("ref", branch)]);
        let content: GitHubContent = Self::send(request)
            .await?
            .json()
            .await
            .map_err(|e| parse_error("file contents", e))?;

        let bytes = match (content.content.as_deref(), content.encoding.as_deref()) {
            (Some(encoded), Some("base64") | None) => {
                let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
                BASE64
                    .decode(compact)
                    .map_err(|e| VcsError::Unknown(format!("invalid base64 content for {path}: {e}")))?
            }
            (Some(_), Some(other)) => {
                return Err(VcsError::Unknown(format!("unsupported content encoding {other} for {path}")))
            }
            (None, _) => Vec::new(),
        };

        Ok(RepositoryFile {
            path: content.path,
            sha: content.sha,
            content: bytes,
        })
    }

    #[instrument(skip(self, request), fields(path = %request.path, branch = %request.branch, update = request.sha.is_some()))]
    async fn write_file(
        &self,
        owner: &str,
        name: &str,
        request: &WriteFileRequest,
    ) -> VcsResult<FileCommit> {
        let body = GitHubPutContentRequest {
            message: request.message.clone(),
            content: BASE64.encode(&request.content),
            branch: request.branch.clone(),
            sha: request.sha.clone(),
        };
        let http_request = self
            .installation_request(
                Method::PUT,
                &format!("/repos/{owner}/{name}/contents/{}", request.path),
            )
            .await?
            .json(&body);
        let written: GitHubPutContentResponse = Self::send(http_request)
            .await?
            .json()
            .await
            .map_err(|e| parse_error("file commit", e))?;

        Ok(FileCommit {
            path: written.content.path,
            sha: written.content.sha,
            commit_sha: written.commit.sha,
        })
    }

    #[instrument(skip(self))]
    async fn delete_repository(&self, owner: &str, name: &str) -> VcsResult<()> {
        let request = self
            .installation_request(Method::DELETE, &format!("/repos/{owner}/{name}"))
            .await?;
        Self::send(request).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::github::StaticCredentials;
    use mockito::Matcher;

    fn client(server: &mockito::ServerGuard) -> GitHubAppClient {
        GitHubAppClient::new(server.url(), Arc::new(StaticCredentials::new(42, "test-token")))
    }

    fn repo_json(owner: &str, name: &str, is_template: bool) -> String {
        serde_json::json!({
            "name": name,
            "owner": {"login": owner},
            "html_url": format!("https://github.com/{owner}/{name}"),
            "default_branch": "main",
            "is_template": is_template,
            "private": !is_template,
        })
        .to_string()
    }

    #[test]
    fn test_classify_status() {
        let d = || "msg".to_string();
        assert!(matches!(classify_status(StatusCode::UNAUTHORIZED, false, d()), VcsError::AuthFailed(_)));
        assert!(matches!(classify_status(StatusCode::FORBIDDEN, false, d()), VcsError::AuthFailed(_)));
        assert!(matches!(classify_status(StatusCode::FORBIDDEN, true, d()), VcsError::RateLimited(_)));
        assert!(matches!(
            classify_status(StatusCode::FORBIDDEN, false, "You have exceeded a secondary rate limit".into()),
            VcsError::RateLimited(_)
        ));
        assert!(matches!(classify_status(StatusCode::NOT_FOUND, false, d()), VcsError::NotFound(_)));
        assert!(matches!(classify_status(StatusCode::CONFLICT, false, d()), VcsError::Conflict(_)));
        assert!(matches!(classify_status(StatusCode::UNPROCESSABLE_ENTITY, false, d()), VcsError::Conflict(_)));
        assert!(matches!(classify_status(StatusCode::TOO_MANY_REQUESTS, false, d()), VcsError::RateLimited(_)));
        assert!(matches!(classify_status(StatusCode::BAD_GATEWAY, false, d()), VcsError::Unknown(_)));
    }

    #[tokio::test]
    async fn test_verify_installation_reports_account() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/app/installations/42")
            .match_header("authorization", "Bearer test-token")
            .match_header("x-github-api-version", "2022-11-28")
            .with_status(200)
            .with_body(r#"{"id":42,"account":{"login":"dsa-lab-org"}}"#)
            .create_async()
            .await;

        let installation = client(&server).verify_installation().await.unwrap();
        assert_eq!(installation.id, 42);
        assert_eq!(installation.account_login.as_deref(), Some("dsa-lab-org"));
    }

    #[tokio::test]
    async fn test_get_repository_not_found_keeps_message() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/repos/dsa-lab/missing")
            .with_status(404)
            .with_body(r#"{"message":"Not Found","documentation_url":"https://docs.github.com"}"#)
            .create_async()
            .await;

        let err = client(&server).get_repository("dsa-lab", "missing").await.unwrap_err();
        assert_eq!(err, VcsError::NotFound("Not Found".into()));
    }

    #[tokio::test]
    async fn test_get_repository_keeps_missing_default_branch() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/repos/dsa-lab/u1-stack-ts")
            .with_status(200)
            .with_body(
                serde_json::json!({
                    "name": "u1-stack-ts",
                    "owner": {"login": "dsa-lab"},
                    "html_url": "https://github.com/dsa-lab/u1-stack-ts",
                    "default_branch": null,
                    "is_template": false,
                    "private": true,
                })
                .to_string(),
            )
            .create_async()
            .await;

        let repo = client(&server).get_repository("dsa-lab", "u1-stack-ts").await.unwrap();
        assert_eq!(repo.default_branch, None);
    }

    #[tokio::test]
    async fn test_rate_limit_header_classifies_403() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/repos/dsa-lab/template-dsa-stack-ts")
            .with_status(403)
            .with_header("x-ratelimit-remaining", "0")
            .with_body(r#"{"message":"API limit exceeded"}"#)
            .create_async()
            .await;

        let err = client(&server)
            .get_repository("dsa-lab", "template-dsa-stack-ts")
            .await
            .unwrap_err();
        assert!(matches!(err, VcsError::RateLimited(_)));
    }

    #[tokio::test]
    async fn test_generate_posts_private_request() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/repos/dsa-lab/template-dsa-stack-ts/generate")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "owner": "dsa-lab",
                "name": "u1-stack-ts",
                "private": true,
            })))
            .with_status(201)
            .with_body(repo_json("dsa-lab", "u1-stack-ts", false))
            .create_async()
            .await;

        let repo = client(&server)
            .create_repository_from_template(&GenerateRepositoryRequest {
                template_owner: "dsa-lab".into(),
                template_repo: "template-dsa-stack-ts".into(),
                owner: "dsa-lab".into(),
                name: "u1-stack-ts".into(),
                description: "DSA Lab: stack challenge in TypeScript".into(),
                private: true,
            })
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(repo.html_url, "https://github.com/dsa-lab/u1-stack-ts");
        assert!(repo.private);
    }

    #[tokio::test]
    async fn test_name_collision_is_conflict_with_details() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/repos/dsa-lab/template-dsa-stack-ts/generate")
            .with_status(422)
            .with_body(r#"{"message":"Repository creation failed.","errors":["Name already exists on this account"]}"#)
            .create_async()
            .await;

        let err = client(&server)
            .create_repository_from_template(&GenerateRepositoryRequest {
                template_owner: "dsa-lab".into(),
                template_repo: "template-dsa-stack-ts".into(),
                owner: "dsa-lab".into(),
                name: "u1-stack-ts".into(),
                description: String::new(),
                private: true,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, VcsError::Conflict(_)));
        assert!(err.detail().contains("Name already exists"));
    }

    #[tokio::test]
    async fn test_read_file_decodes_wrapped_base64() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/repos/dsa-lab/u1-stack-ts/contents/dsa.config.json")
            .match_query(Matcher::UrlEncoded("ref".into(), "main".into()))
            .with_status(200)
            .with_body(r#"{"path":"dsa.config.json","sha":"abc","encoding":"base64","content":"eyJw\nbGFjZWhvbGRlciI6dHJ1ZX0=\n"}"#)
            .create_async()
            .await;

        let file = client(&server)
            .read_file("dsa-lab", "u1-stack-ts", "dsa.config.json", "main")
            .await
            .unwrap();
        assert_eq!(file.sha, "abc");
        assert_eq!(file.content, br#"{"placeholder":true}"#);
    }

    #[tokio::test]
    async fn test_write_file_sends_sha_for_update() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("PUT", "/repos/dsa-lab/u1-stack-ts/contents/dsa.config.json")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "sha": "abc",
                "branch": "main",
                "content": "e30=",
            })))
            .with_status(200)
            .with_body(r#"{"content":{"path":"dsa.config.json","sha":"def"},"commit":{"sha":"c0ffee"}}"#)
            .create_async()
            .await;

        let commit = client(&server)
            .write_file(
                "dsa-lab",
                "u1-stack-ts",
                &WriteFileRequest {
                    path: "dsa.config.json".into(),
                    message: "Configure DSA Lab project".into(),
                    content: b"{}".to_vec(),
                    branch: "main".into(),
                    sha: Some("abc".into()),
                },
            )
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(commit.sha, "def");
        assert_eq!(commit.commit_sha, "c0ffee");
    }

    #[tokio::test]
    async fn test_delete_repository() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("DELETE", "/repos/dsa-lab/u1-stack-ts")
            .with_status(204)
            .create_async()
            .await;

        client(&server).delete_repository("dsa-lab", "u1-stack-ts").await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_unreachable_server_is_unknown() {
        let client = GitHubAppClient::new("http://127.0.0.1:1", Arc::new(StaticCredentials::new(1, "t")));
        let err = client.get_repository("o", "r").await.unwrap_err();
        assert!(matches!(err, VcsError::Unknown(_)));
    }
}
