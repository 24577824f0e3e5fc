//! Workspace configuration payload.

use crate::domain::errors::DomainResult;
use crate::domain::models::{test_command_for, Project, ProvisioningConfig, WorkspaceConfig};

/// Builds the `dsa.config.json` document committed into new repositories.
#[derive(Debug, Clone)]
pub struct ConfigWriter {
    api_url: String,
    report_file: String,
}

impl ConfigWriter {
    pub fn new(api_url: impl Into<String>, report_file: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            report_file: report_file.into(),
        }
    }

    pub fn from_config(config: &ProvisioningConfig) -> Self {
        Self::new(&config.api_url, &config.report_file)
    }

    /// The document for a freshly provisioned project. The step cursor
    /// always starts at zero.
    pub fn workspace_config(&self, project: &Project, exercise_id: &str, language: &str) -> WorkspaceConfig {
        WorkspaceConfig {
            project_id: project.id,
            project_token: project.project_token.clone(),
            exercise_id: exercise_id.to_string(),
            language: language.to_string(),
            api_url: self.api_url.clone(),
            test_command: test_command_for(language).to_string(),
            report_file: self.report_file.clone(),
            current_step_index: 0,
        }
    }

    /// Serialize the document as pretty JSON with a trailing newline.
    pub fn build_config(&self, project: &Project, exercise_id: &str, language: &str) -> DomainResult<Vec<u8>> {
        let mut bytes = serde_json::to_vec_pretty(&self.workspace_config(project, exercise_id, language))?;
        bytes.push(b'\n');
        Ok(bytes)
    }
}
