//! GitHub App adapter for the [`VcsClient`](crate::domain::ports::VcsClient) port.

pub mod auth;
pub mod client;
pub mod mock;
pub mod models;

pub use auth::{normalize_private_key, AppCredentials, GitHubAuthError, GitHubCredentials, StaticCredentials};
pub use client::{classify_status, GitHubAppClient};
pub use mock::{MockVcsClient, VcsOperation};
