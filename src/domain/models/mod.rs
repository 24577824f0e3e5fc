pub mod catalog;
pub mod config;
pub mod project;
pub mod submission;
pub mod workspace_config;

pub use catalog::{normalize_language, test_command_for, Catalog, Language, DEFAULT_TEST_COMMAND};
pub use config::{
    Config, DatabaseConfig, GitHubConfig, IdentityConfig, LoggingConfig, ProvisioningConfig,
    ServerConfig, DEFAULT_SETTLE_DELAY,
};
pub use project::{parse_repository_url, NewProject, Project, ProjectStatus};
pub use submission::{Submission, SubmissionDetails, SubmissionResult, TestCaseResult};
pub use workspace_config::WorkspaceConfig;
