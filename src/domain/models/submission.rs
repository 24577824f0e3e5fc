//! Submission domain model.
//!
//! A submission is one test run reported by the exercise CLI against a
//! provisioned project.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Overall result the CLI reports for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionResult {
    Pass,
    Fail,
}

impl SubmissionResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::Fail => "fail",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pass" => Some(Self::Pass),
            "fail" => Some(Self::Fail),
            _ => None,
        }
    }
}

/// A single test case outcome from the CLI's report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCaseResult {
    pub id: String,
    pub passed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Structured report details attached to a submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionDetails {
    /// One entry per exercise step
    #[serde(default)]
    pub cases: Vec<TestCaseResult>,
    /// Step the CLI was working on when it ran the tests
    #[serde(default, alias = "currentChallengeIndex")]
    pub current_step_index: Option<u32>,
    /// Outcome of that step
    #[serde(default, alias = "challengeResult")]
    pub step_result: Option<TestCaseResult>,
}

/// A stored submission row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub id: Uuid,
    pub project_id: Uuid,
    pub result: SubmissionResult,
    pub summary: String,
    pub details: SubmissionDetails,
    pub commit_sha: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Submission {
    pub fn new(
        project_id: Uuid,
        result: SubmissionResult,
        summary: impl Into<String>,
        details: SubmissionDetails,
        commit_sha: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            project_id,
            result,
            summary: summary.into(),
            details,
            commit_sha,
            created_at: Utc::now(),
        }
    }
}
