//! Configuration file to working GitHub client.

mod common;

use std::io::Write;

use common::*;
use dsalab::adapters::github::GitHubAppClient;
use dsalab::domain::ports::VcsClient;
use dsalab::infrastructure::config::ConfigLoader;
use mockito::Server;
use tempfile::NamedTempFile;

#[tokio::test]
async fn test_yaml_config_builds_authenticating_client() {
    let mut server = Server::new_async().await;
    let (exchange, installation) = mock_auth(&mut server).await;

    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        "github:\n  api_base_url: {}\n  app_id: {APP_ID}\n  installation_id: {INSTALLATION_ID}\n  private_key_path: {}\nprovisioning:\n  settle_delay_ms: 0\n",
        server.url(),
        test_key_path().display()
    )
    .unwrap();
    file.flush().unwrap();

    let config = ConfigLoader::load_from_file(file.path()).unwrap();
    assert_eq!(config.github.app_id, Some(APP_ID));
    assert_eq!(config.provisioning.settle_delay_ms, 0);

    let client = GitHubAppClient::from_config(&config.github).unwrap();
    let found = client.verify_installation().await.unwrap();

    assert_eq!(found.id, INSTALLATION_ID);
    assert_eq!(found.account_login.as_deref(), Some(ORG));
    exchange.assert_async().await;
    installation.assert_async().await;
}

#[test]
fn test_escaped_inline_key_is_accepted() {
    let escaped = test_key_pem().trim_end().replace('\n', "\\n");
    let config = dsalab::domain::models::GitHubConfig {
        app_id: Some(APP_ID),
        installation_id: Some(INSTALLATION_ID),
        private_key: Some(format!("\"{escaped}\"")),
        ..Default::default()
    };

    assert!(GitHubAppClient::from_config(&config).is_ok());
}

#[test]
fn test_missing_app_id_is_reported() {
    let config = dsalab::domain::models::GitHubConfig {
        installation_id: Some(INSTALLATION_ID),
        private_key_path: Some(test_key_path().display().to_string()),
        ..Default::default()
    };

    let err = GitHubAppClient::from_config(&config).err().expect("should fail");
    assert!(err.to_string().contains("github.app_id"), "got: {err}");
}
