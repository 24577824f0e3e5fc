use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Settling delay before reading a freshly generated repository.
///
/// The provider does not always serve metadata for a repository created
/// from a template immediately. This is the single fixed wait in the saga.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(3_000);

/// Main configuration structure for DSA Lab
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// HTTP API server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// GitHub App credentials and endpoint
    #[serde(default)]
    pub github: GitHubConfig,

    /// Identity provider used to verify end-user sessions
    #[serde(default)]
    pub identity: IdentityConfig,

    /// Provisioning saga settings
    #[serde(default)]
    pub provisioning: ProvisioningConfig,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DatabaseConfig {
    /// Path to `SQLite` database file
    #[serde(default = "default_database_path")]
    pub path: String,

    /// Maximum number of database connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_path() -> String {
    ".dsalab/dsalab.db".to_string()
}

const fn default_max_connections() -> u32 {
    10
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            max_connections: default_max_connections(),
        }
    }
}

impl DatabaseConfig {
    /// sqlx connection URL for the configured path.
    pub fn url(&self) -> String {
        if self.path.starts_with("sqlite:") {
            self.path.clone()
        } else {
            format!("sqlite:{}", self.path)
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling log files; stdout only when unset
    #[serde(default)]
    pub log_dir: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
        }
    }
}

/// HTTP API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Whether to enable permissive CORS for the web application
    #[serde(default = "default_true")]
    pub enable_cors: bool,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

const fn default_port() -> u16 {
    9200
}

const fn default_true() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            enable_cors: default_true(),
        }
    }
}

/// GitHub App configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct GitHubConfig {
    /// REST API base URL
    #[serde(default = "default_github_api_base_url")]
    pub api_base_url: String,

    /// Numeric GitHub App id
    #[serde(default)]
    pub app_id: Option<u64>,

    /// Installation id of the app on the exercise organization
    #[serde(default)]
    pub installation_id: Option<u64>,

    /// PEM private key, inline
    #[serde(default)]
    pub private_key: Option<String>,

    /// PEM private key, read from disk when `private_key` is unset
    #[serde(default)]
    pub private_key_path: Option<String>,
}

fn default_github_api_base_url() -> String {
    "https://api.github.com".to_string()
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_github_api_base_url(),
            app_id: None,
            installation_id: None,
            private_key: None,
            private_key_path: None,
        }
    }
}

/// Identity provider configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct IdentityConfig {
    /// Base URL of the GoTrue-compatible auth service
    #[serde(default)]
    pub auth_url: Option<String>,

    /// Public API key sent alongside user sessions
    #[serde(default)]
    pub anon_key: Option<String>,
}

/// Provisioning saga settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ProvisioningConfig {
    /// Settling delay after repository generation, in milliseconds
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    /// Age after which an unfinished record counts as orphaned, in seconds
    #[serde(default = "default_orphan_timeout_secs")]
    pub orphan_timeout_secs: u64,

    /// API base written into workspace configs for the exercise CLI
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Path of the workspace config file inside the repository
    #[serde(default = "default_config_path")]
    pub config_path: String,

    /// Relative path where the CLI writes its machine-readable test report
    #[serde(default = "default_report_file")]
    pub report_file: String,

    /// Commit message for the config write
    #[serde(default = "default_commit_message")]
    pub commit_message: String,

    /// Expected organization. Only a fallback: the installation's actual
    /// account wins when they differ.
    #[serde(default)]
    pub organization: Option<String>,
}

fn default_settle_delay_ms() -> u64 {
    u64::try_from(DEFAULT_SETTLE_DELAY.as_millis()).unwrap_or(3_000)
}

const fn default_orphan_timeout_secs() -> u64 {
    300
}

fn default_api_url() -> String {
    "https://api.dsalab.dev/functions/v1".to_string()
}

fn default_config_path() -> String {
    "dsa.config.json".to_string()
}

fn default_report_file() -> String {
    ".dsa-report.json".to_string()
}

fn default_commit_message() -> String {
    "Configure DSA Lab project".to_string()
}

impl Default for ProvisioningConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: default_settle_delay_ms(),
            orphan_timeout_secs: default_orphan_timeout_secs(),
            api_url: default_api_url(),
            config_path: default_config_path(),
            report_file: default_report_file(),
            commit_message: default_commit_message(),
            organization: None,
        }
    }
}

impl ProvisioningConfig {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn orphan_timeout(&self) -> chrono::Duration {
        let secs = i64::try_from(self.orphan_timeout_secs).unwrap_or(i64::MAX);
        chrono::Duration::seconds(secs.min(i64::MAX / 1_000))
    }
}
