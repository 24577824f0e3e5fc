//! SQLite implementation of the SubmissionRepository.

use async_trait::async_trait;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Submission, SubmissionResult};
use crate::domain::ports::SubmissionRepository;

use super::{parse_datetime, parse_json_or_default, parse_uuid};

#[derive(Clone)]
pub struct SqliteSubmissionRepository {
    pool: SqlitePool,
}

impl SqliteSubmissionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SubmissionRepository for SqliteSubmissionRepository {
    async fn insert(&self, submission: &Submission) -> DomainResult<()> {
        let details = serde_json::to_string(&submission.details)?;

        sqlx::query(
            r#"INSERT INTO submissions (id, project_id, result, summary, details, commit_sha, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?)"#
        )
        .bind(submission.id.to_string())
        .bind(submission.project_id.to_string())
        .bind(submission.result.as_str())
        .bind(&submission.summary)
        .bind(details)
        .bind(&submission.commit_sha)
        .bind(submission.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_for_project(&self, project_id: Uuid) -> DomainResult<Vec<Submission>> {
        let rows: Vec<SubmissionRow> = sqlx::query_as(
            "SELECT * FROM submissions WHERE project_id = ? ORDER BY created_at DESC"
        )
        .bind(project_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(|r| r.try_into()).collect()
    }
}

#[derive(sqlx::FromRow)]
struct SubmissionRow {
    id: String,
    project_id: String,
    result: String,
    summary: String,
    details: Option<String>,
    commit_sha: Option<String>,
    created_at: String,
}

impl TryFrom<SubmissionRow> for Submission {
    type Error = DomainError;

    fn try_from(row: SubmissionRow) -> Result<Self, Self::Error> {
        let result = SubmissionResult::from_str(&row.result)
            .ok_or_else(|| DomainError::SerializationError(format!("Invalid result: {}", row.result)))?;

        Ok(Submission {
            id: parse_uuid(&row.id)?,
            project_id: parse_uuid(&row.project_id)?,
            result,
            summary: row.summary,
            details: parse_json_or_default(row.details)?,
            commit_sha: row.commit_sha,
            created_at: parse_datetime(&row.created_at)?,
        })
    }
}
