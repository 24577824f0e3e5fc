//! Session verification against a GoTrue-compatible auth service.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use crate::domain::models::IdentityConfig;
use crate::domain::ports::{IdentityError, IdentityVerifier};

#[derive(Debug, Deserialize)]
struct AuthUser {
    id: String,
}

/// Resolves a user session JWT to its user id via `GET /auth/v1/user`.
#[derive(Debug, Clone)]
pub struct SupabaseIdentityVerifier {
    http: Client,
    auth_url: String,
    anon_key: String,
}

impl SupabaseIdentityVerifier {
    pub fn new(auth_url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            auth_url: auth_url.into().trim_end_matches('/').to_string(),
            anon_key: anon_key.into(),
        }
    }

    /// `None` when the identity section is incomplete.
    pub fn from_config(config: &IdentityConfig) -> Option<Self> {
        match (&config.auth_url, &config.anon_key) {
            (Some(url), Some(key)) if !url.is_empty() => Some(Self::new(url, key)),
            _ => None,
        }
    }
}

#[async_trait]
impl IdentityVerifier for SupabaseIdentityVerifier {
    async fn verify_caller(&self, bearer_token: &str) -> Result<String, IdentityError> {
        if bearer_token.trim().is_empty() {
            return Err(IdentityError::MissingCredentials);
        }

        let resp = self
            .http
            .get(format!("{}/auth/v1/user", self.auth_url))
            .header("apikey", &self.anon_key)
            .bearer_auth(bearer_token)
            .send()
            .await
            .map_err(|e| IdentityError::Unavailable(e.to_string()))?;

        match resp.status() {
            status if status.is_success() => {
                let user: AuthUser = resp
                    .json()
                    .await
                    .map_err(|e| IdentityError::Unavailable(format!("invalid user payload: {e}")))?;
                if user.id.is_empty() {
                    return Err(IdentityError::Unauthorized("session has no user".to_string()));
                }
                Ok(user.id)
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                let body = resp.text().await.unwrap_or_default();
                Err(IdentityError::Unauthorized(body))
            }
            status => {
                let body = resp.text().await.unwrap_or_default();
                Err(IdentityError::Unavailable(format!("{status}: {body}")))
            }
        }
    }
}
