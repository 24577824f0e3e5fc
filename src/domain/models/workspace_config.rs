//! Workspace configuration document.
//!
//! The JSON file committed into every provisioned repository. The exercise
//! CLI searches upward for it and reads these exact keys.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Contents of `dsa.config.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceConfig {
    pub project_id: Uuid,
    pub project_token: String,
    #[serde(rename = "moduleId")]
    pub exercise_id: String,
    pub language: String,
    pub api_url: String,
    pub test_command: String,
    pub report_file: String,
    #[serde(rename = "currentChallengeIndex")]
    pub current_step_index: u32,
}
