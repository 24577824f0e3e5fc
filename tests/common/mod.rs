//! Common test utilities for integration tests
//!
//! A stubbed GitHub REST API on a mockito server plus helpers that wire the
//! real GitHub App client and an in-memory store into an orchestrator.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use mockito::{Matcher, Mock, ServerGuard};
use serde_json::json;

use dsalab::adapters::github::{AppCredentials, GitHubAppClient};
use dsalab::adapters::sqlite::{create_migrated_test_pool, SqliteProjectRepository};
use dsalab::domain::models::{Catalog, ProvisioningConfig};
use dsalab::services::{ProvisioningOrchestrator, RandomTokenGenerator};

pub const APP_ID: u64 = 1001;
pub const INSTALLATION_ID: u64 = 42;
pub const INSTALLATION_TOKEN: &str = "ghs_installation_token";
pub const ORG: &str = "dsa-lab";

/// Path of the RSA key used to sign app JWTs in tests.
pub fn test_key_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/test_app_key.pem")
}

pub fn test_key_pem() -> String {
    std::fs::read_to_string(test_key_path()).expect("test key fixture should exist")
}

/// Provisioning settings with no settling delay.
pub fn fast_provisioning_config() -> ProvisioningConfig {
    ProvisioningConfig {
        settle_delay_ms: 0,
        organization: Some(ORG.to_string()),
        ..ProvisioningConfig::default()
    }
}

/// Repository payload in the shape GitHub returns it.
pub fn repo_json(owner: &str, name: &str, is_template: bool, default_branch: Option<&str>) -> String {
    json!({
        "id": 1,
        "name": name,
        "full_name": format!("{owner}/{name}"),
        "owner": { "login": owner, "type": "Organization" },
        "html_url": format!("https://github.com/{owner}/{name}"),
        "default_branch": default_branch,
        "is_template": is_template,
        "private": true
    })
    .to_string()
}

/// Orchestrator backed by the real GitHub App client (JWT signing and token
/// exchange included) pointed at `server`, and an in-memory store.
pub async fn orchestrator_for(
    server: &ServerGuard,
) -> (ProvisioningOrchestrator, Arc<SqliteProjectRepository>) {
    let pool = create_migrated_test_pool().await.expect("test pool");
    let projects = Arc::new(SqliteProjectRepository::new(pool));

    let credentials = AppCredentials::new(
        reqwest::Client::new(),
        server.url(),
        APP_ID,
        INSTALLATION_ID,
        &test_key_pem(),
    )
    .expect("test key should load");
    let vcs = Arc::new(GitHubAppClient::new(server.url(), Arc::new(credentials)));

    let orchestrator = ProvisioningOrchestrator::new(
        projects.clone(),
        vcs,
        Arc::new(RandomTokenGenerator),
        Catalog::builtin(),
        fast_provisioning_config(),
    );
    (orchestrator, projects)
}

fn installation_auth() -> Matcher {
    Matcher::Exact(format!("Bearer {INSTALLATION_TOKEN}"))
}

fn app_jwt_auth() -> Matcher {
    Matcher::Regex(r"^Bearer [A-Za-z0-9_-]+\.[A-Za-z0-9_-]+\.[A-Za-z0-9_-]+$".to_string())
}

/// Mocks for the authentication step: the token exchange and the
/// installation lookup, both signed with the app JWT.
pub async fn mock_auth(server: &mut ServerGuard) -> (Mock, Mock) {
    let exchange = server
        .mock(
            "POST",
            format!("/app/installations/{INSTALLATION_ID}/access_tokens").as_str(),
        )
        .match_header("authorization", app_jwt_auth())
        .with_status(201)
        .with_header("content-type", "application/json")
        .with_body(
            json!({ "token": INSTALLATION_TOKEN, "expires_at": "2099-01-01T00:00:00Z" }).to_string(),
        )
        .create_async()
        .await;

    let installation = server
        .mock("GET", format!("/app/installations/{INSTALLATION_ID}").as_str())
        .match_header("authorization", app_jwt_auth())
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "id": INSTALLATION_ID, "account": { "login": ORG } }).to_string())
        .create_async()
        .await;

    (exchange, installation)
}

/// GET for a template repository.
pub async fn mock_template(server: &mut ServerGuard, template: &str, is_template: bool) -> Mock {
    server
        .mock("GET", format!("/repos/{ORG}/{template}").as_str())
        .match_header("authorization", installation_auth())
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(repo_json(ORG, template, is_template, Some("main")))
        .create_async()
        .await
}

/// POST generate answering with a freshly created repository.
pub async fn mock_generate(server: &mut ServerGuard, template: &str, name: &str) -> Mock {
    server
        .mock("POST", format!("/repos/{ORG}/{template}/generate").as_str())
        .match_header("authorization", installation_auth())
        .match_body(Matcher::PartialJson(json!({ "owner": ORG, "name": name, "private": true })))
        .with_status(201)
        .with_header("content-type", "application/json")
        .with_body(repo_json(ORG, name, false, None))
        .create_async()
        .await
}

/// GET for the generated repository once it has settled.
pub async fn mock_repository(server: &mut ServerGuard, name: &str) -> Mock {
    server
        .mock("GET", format!("/repos/{ORG}/{name}").as_str())
        .match_header("authorization", installation_auth())
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(repo_json(ORG, name, false, Some("main")))
        .create_async()
        .await
}

/// GET contents for the config file; `existing_sha` of `None` answers 404.
pub async fn mock_config_read(server: &mut ServerGuard, name: &str, existing_sha: Option<&str>) -> Mock {
    let mock = server
        .mock("GET", format!("/repos/{ORG}/{name}/contents/dsa.config.json").as_str())
        .match_query(Matcher::UrlEncoded("ref".into(), "main".into()))
        .with_header("content-type", "application/json");

    match existing_sha {
        Some(sha) => {
            mock.with_status(200)
                .with_body(
                    json!({
                        "type": "file",
                        "path": "dsa.config.json",
                        "sha": sha,
                        "encoding": "base64",
                        "content": "e30K\n"
                    })
                    .to_string(),
                )
                .create_async()
                .await
        }
        None => {
            mock.with_status(404)
                .with_body(r#"{"message":"Not Found"}"#)
                .create_async()
                .await
        }
    }
}

/// PUT contents for the config file, optionally requiring a revision marker.
pub async fn mock_config_write(server: &mut ServerGuard, name: &str, expected_sha: Option<&str>) -> Mock {
    let mut expected = json!({ "message": "Configure DSA Lab project", "branch": "main" });
    if let Some(sha) = expected_sha {
        expected["sha"] = json!(sha);
    }

    server
        .mock("PUT", format!("/repos/{ORG}/{name}/contents/dsa.config.json").as_str())
        .match_header("authorization", installation_auth())
        .match_body(Matcher::PartialJson(expected))
        .with_status(if expected_sha.is_some() { 200 } else { 201 })
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "content": { "path": "dsa.config.json", "sha": "new-blob-sha" },
                "commit": { "sha": "commit-sha" }
            })
            .to_string(),
        )
        .create_async()
        .await
}
