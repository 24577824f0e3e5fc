//! GitHub REST API request and response payloads.
//!
//! Only the fields provisioning reads are modelled; everything else in the
//! provider's responses is ignored during deserialization.

use serde::{Deserialize, Serialize};

/// Response from `POST /app/installations/{id}/access_tokens`.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubAccessToken {
    pub token: String,
    /// ISO 8601 expiry of the installation token.
    pub expires_at: String,
}

/// Response from `GET /app/installations/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubInstallation {
    pub id: u64,
    #[serde(default)]
    pub account: Option<GitHubAccount>,
}

/// Account (organization or user) an installation belongs to.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubAccount {
    pub login: String,
}

/// Repository as returned by `GET /repos/{owner}/{repo}` and the generate endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubRepository {
    pub name: String,
    pub owner: GitHubAccount,
    pub html_url: String,
    /// Freshly generated repositories may not report a branch yet.
    #[serde(default)]
    pub default_branch: Option<String>,
    #[serde(default)]
    pub is_template: bool,
    #[serde(default)]
    pub private: bool,
}

/// Request body for `POST /repos/{template_owner}/{template_repo}/generate`.
#[derive(Debug, Clone, Serialize)]
pub struct GitHubGenerateRequest {
    pub owner: String,
    pub name: String,
    pub description: String,
    pub private: bool,
    pub include_all_branches: bool,
}

/// File entry from `GET /repos/{owner}/{repo}/contents/{path}`.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubContent {
    pub path: String,
    pub sha: String,
    /// Base64 with embedded line breaks.
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub encoding: Option<String>,
}

/// Request body for `PUT /repos/{owner}/{repo}/contents/{path}`.
#[derive(Debug, Clone, Serialize)]
pub struct GitHubPutContentRequest {
    pub message: String,
    /// Base64-encoded file content.
    pub content: String,
    pub branch: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha: Option<String>,
}

/// Response from the contents PUT endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubPutContentResponse {
    pub content: GitHubContentRef,
    pub commit: GitHubCommitRef,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitHubContentRef {
    pub path: String,
    pub sha: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitHubCommitRef {
    pub sha: String,
}

/// Error body GitHub attaches to most failures.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GitHubErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    /// Validation failures (e.g. a taken repository name) arrive here.
    #[serde(default)]
    pub errors: Option<serde_json::Value>,
}
