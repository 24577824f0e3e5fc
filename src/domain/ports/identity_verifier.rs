//! Identity verification port.

use async_trait::async_trait;
use thiserror::Error;

/// Why a caller could not be identified.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    #[error("missing credentials")]
    MissingCredentials,

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("identity provider unavailable: {0}")]
    Unavailable(String),
}

/// Confirms a caller is an authenticated end user.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// Verify a bearer session and return the stable user id.
    async fn verify_caller(&self, bearer_token: &str) -> Result<String, IdentityError>;
}
