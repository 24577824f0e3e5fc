//! GitHub App authentication.
//!
//! The app signs a short-lived RS256 JWT with its private key and exchanges
//! it for an installation access token. Installation tokens live for an
//! hour; they are cached and refreshed shortly before expiry.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::{Client, Method};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::domain::models::GitHubConfig;
use crate::domain::ports::{VcsError, VcsResult};

use super::client::{error_from_response, github_request, transport_error};
use super::models::GitHubAccessToken;

/// Installation tokens are treated as expired this many seconds before GitHub says so.
const TOKEN_REFRESH_MARGIN_SECS: i64 = 60;

#[derive(Debug, Error)]
pub enum GitHubAuthError {
    #[error("GitHub App is not configured: missing {0}")]
    NotConfigured(&'static str),

    #[error("invalid GitHub App private key: {0}")]
    InvalidKey(String),

    #[error("failed to read private key from {path}: {source}")]
    KeyFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Source of the bearer tokens the client sends.
#[async_trait]
pub trait GitHubCredentials: Send + Sync {
    /// The installation this client acts as.
    fn installation_id(&self) -> u64;

    /// Token authenticating as the app itself (`/app/...` endpoints).
    async fn app_token(&self) -> VcsResult<String>;

    /// Token authenticating as the installation (repository endpoints).
    async fn installation_token(&self) -> VcsResult<String>;
}

/// Fixed token for both app and installation calls.
///
/// Useful against a stub server or with a pre-issued installation token.
#[derive(Debug, Clone)]
pub struct StaticCredentials {
    installation_id: u64,
    token: String,
}

impl StaticCredentials {
    pub fn new(installation_id: u64, token: impl Into<String>) -> Self {
        Self {
            installation_id,
            token: token.into(),
        }
    }
}

#[async_trait]
impl GitHubCredentials for StaticCredentials {
    fn installation_id(&self) -> u64 {
        self.installation_id
    }

    async fn app_token(&self) -> VcsResult<String> {
        Ok(self.token.clone())
    }

    async fn installation_token(&self) -> VcsResult<String> {
        Ok(self.token.clone())
    }
}

#[derive(Debug, Serialize)]
struct AppClaims {
    iat: i64,
    exp: i64,
    iss: String,
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - Duration::seconds(TOKEN_REFRESH_MARGIN_SECS) > now
    }
}

/// Real GitHub App credentials: JWT signing plus installation token exchange.
pub struct AppCredentials {
    http: Client,
    api_base_url: String,
    app_id: u64,
    installation_id: u64,
    key: EncodingKey,
    cache: RwLock<Option<CachedToken>>,
}

impl AppCredentials {
    pub fn new(
        http: Client,
        api_base_url: impl Into<String>,
        app_id: u64,
        installation_id: u64,
        private_key_pem: &str,
    ) -> Result<Self, GitHubAuthError> {
        let pem = normalize_private_key(private_key_pem)?;
        let key = EncodingKey::from_rsa_pem(pem.as_bytes())
            .map_err(|e| GitHubAuthError::InvalidKey(e.to_string()))?;

        Ok(Self {
            http,
            api_base_url: api_base_url.into().trim_end_matches('/').to_string(),
            app_id,
            installation_id,
            key,
            cache: RwLock::new(None),
        })
    }

    /// Build credentials from configuration, reading the key file if no
    /// inline key is set.
    pub fn from_config(http: Client, config: &GitHubConfig) -> Result<Self, GitHubAuthError> {
        let app_id = config.app_id.ok_or(GitHubAuthError::NotConfigured("github.app_id"))?;
        let installation_id = config
            .installation_id
            .ok_or(GitHubAuthError::NotConfigured("github.installation_id"))?;

        let pem = match (&config.private_key, &config.private_key_path) {
            (Some(inline), _) if !inline.trim().is_empty() => inline.clone(),
            (_, Some(path)) => std::fs::read_to_string(path).map_err(|source| GitHubAuthError::KeyFile {
                path: path.clone(),
                source,
            })?,
            _ => return Err(GitHubAuthError::NotConfigured("github.private_key")),
        };

        Self::new(http, &config.api_base_url, app_id, installation_id, &pem)
    }

    fn sign_app_jwt(&self, now: DateTime<Utc>) -> VcsResult<String> {
        // Backdated to tolerate clock drift; GitHub caps the lifetime at ten minutes.
        let claims = AppClaims {
            iat: (now - Duration::seconds(60)).timestamp(),
            exp: (now + Duration::minutes(9)).timestamp(),
            iss: self.app_id.to_string(),
        };
        jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &self.key)
            .map_err(|e| VcsError::AuthFailed(format!("failed to sign app JWT: {e}")))
    }

    async fn exchange_installation_token(&self) -> VcsResult<CachedToken> {
        let jwt = self.sign_app_jwt(Utc::now())?;
        let url = format!(
            "{}/app/installations/{}/access_tokens",
            self.api_base_url, self.installation_id
        );

        let resp = github_request(&self.http, Method::POST, &url, &jwt)
            .send()
            .await
            .map_err(transport_error)?;

        if !resp.status().is_success() {
            return Err(error_from_response(resp).await);
        }

        let body: GitHubAccessToken = resp
            .json()
            .await
            .map_err(|e| VcsError::Unknown(format!("failed to parse installation token: {e}")))?;

        let expires_at = DateTime::parse_from_rfc3339(&body.expires_at)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now() + Duration::minutes(50));

        tracing::debug!(installation_id = self.installation_id, %expires_at, "obtained installation token");

        Ok(CachedToken {
            token: body.token,
            expires_at,
        })
    }
}

#[async_trait]
impl GitHubCredentials for AppCredentials {
    fn installation_id(&self) -> u64 {
        self.installation_id
    }

    async fn app_token(&self) -> VcsResult<String> {
        self.sign_app_jwt(Utc::now())
    }

    async fn installation_token(&self) -> VcsResult<String> {
        if let Some(cached) = self.cache.read().await.as_ref() {
            if cached.is_fresh(Utc::now()) {
                return Ok(cached.token.clone());
            }
        }

        let mut guard = self.cache.write().await;
        // Another caller may have refreshed while we waited for the lock.
        if let Some(cached) = guard.as_ref() {
            if cached.is_fresh(Utc::now()) {
                return Ok(cached.token.clone());
            }
        }

        let fresh = self.exchange_installation_token().await?;
        let token = fresh.token.clone();
        *guard = Some(fresh);
        Ok(token)
    }
}

/// Undo `\n` escaping from environment variables and require PEM armour.
pub fn normalize_private_key(raw: &str) -> Result<String, GitHubAuthError> {
    let key = raw.trim().trim_matches('"').replace("\\n", "\n");

    if !key.starts_with("-----BEGIN") || !key.contains("PRIVATE KEY-----") {
        return Err(GitHubAuthError::InvalidKey(
            "expected a PEM private key (-----BEGIN ... PRIVATE KEY-----)".to_string(),
        ));
    }

    Ok(if key.ends_with('\n') { key } else { format!("{key}\n") })
}
