//! SQLite implementation of the ProjectRepository.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Language, NewProject, Project, ProjectStatus};
use crate::domain::ports::ProjectRepository;

use super::{parse_datetime, parse_uuid};

#[derive(Clone)]
pub struct SqliteProjectRepository {
    pool: SqlitePool,
}

impl SqliteProjectRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProjectRepository for SqliteProjectRepository {
    async fn insert(&self, project: &NewProject) -> DomainResult<Project> {
        let now = Utc::now().to_rfc3339();
        let row: ProjectRow = sqlx::query_as(
            r#"INSERT INTO projects (id, user_id, exercise_id, language, status, progress_percent, repository_url,
                                     project_token, current_step_index, created_at, updated_at)
               VALUES (?, ?, ?, ?, 'in_progress', 0, NULL, ?, 0, ?, ?)
               RETURNING *"#
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&project.user_id)
        .bind(&project.exercise_id)
        .bind(project.language.as_str())
        .bind(&project.project_token)
        .bind(&now)
        .bind(&now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_insert_error(e, project))?;

        row.try_into()
    }

    async fn get(&self, id: Uuid) -> DomainResult<Option<Project>> {
        let row: Option<ProjectRow> = sqlx::query_as("SELECT * FROM projects WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| r.try_into()).transpose()
    }

    async fn get_by_token(&self, token: &str) -> DomainResult<Option<Project>> {
        let row: Option<ProjectRow> = sqlx::query_as("SELECT * FROM projects WHERE project_token = ?")
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| r.try_into()).transpose()
    }

    async fn find_for_user_exercise(&self, user_id: &str, exercise_id: &str) -> DomainResult<Option<Project>> {
        let row: Option<ProjectRow> = sqlx::query_as(
            "SELECT * FROM projects WHERE user_id = ? AND exercise_id = ?"
        )
        .bind(user_id)
        .bind(exercise_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| r.try_into()).transpose()
    }

    async fn list_for_user(&self, user_id: &str, exercise_id: Option<&str>) -> DomainResult<Vec<Project>> {
        let rows: Vec<ProjectRow> = match exercise_id {
            Some(exercise_id) => {
                sqlx::query_as(
                    "SELECT * FROM projects WHERE user_id = ? AND exercise_id = ? ORDER BY created_at DESC"
                )
                .bind(user_id)
                .bind(exercise_id)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as("SELECT * FROM projects WHERE user_id = ? ORDER BY created_at DESC")
                    .bind(user_id)
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        rows.into_iter().map(|r| r.try_into()).collect()
    }

    async fn update(&self, project: &Project) -> DomainResult<()> {
        // project_token and ownership columns are immutable after insert.
        let result = sqlx::query(
            r#"UPDATE projects SET status = ?, progress_percent = ?, repository_url = ?, current_step_index = ?, updated_at = ?
               WHERE id = ?"#
        )
        .bind(project.status.as_str())
        .bind(i64::from(project.progress_percent))
        .bind(&project.repository_url)
        .bind(i64::from(project.current_step_index))
        .bind(project.updated_at.to_rfc3339())
        .bind(project.id.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::ProjectNotFound(project.id));
        }

        Ok(())
    }

    async fn delete(&self, id: Uuid) -> DomainResult<()> {
        let result = sqlx::query("DELETE FROM projects WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::ProjectNotFound(id));
        }

        Ok(())
    }
}

fn map_insert_error(err: sqlx::Error, project: &NewProject) -> DomainError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() && !db_err.message().contains("project_token") {
            return DomainError::DuplicateProject {
                user_id: project.user_id.clone(),
                exercise_id: project.exercise_id.clone(),
            };
        }
    }
    DomainError::from(err)
}

#[derive(sqlx::FromRow)]
struct ProjectRow {
    id: String,
    user_id: String,
    exercise_id: String,
    language: String,
    status: String,
    progress_percent: i64,
    repository_url: Option<String>,
    project_token: String,
    current_step_index: i64,
    created_at: String,
    updated_at: String,
}

impl TryFrom<ProjectRow> for Project {
    type Error = DomainError;

    fn try_from(row: ProjectRow) -> Result<Self, Self::Error> {
        let language = Language::from_str(&row.language)
            .ok_or_else(|| DomainError::SerializationError(format!("Invalid language: {}", row.language)))?;

        let status = ProjectStatus::from_str(&row.status)
            .ok_or_else(|| DomainError::SerializationError(format!("Invalid status: {}", row.status)))?;

        let progress_percent = u8::try_from(row.progress_percent)
            .map_err(|e| DomainError::SerializationError(e.to_string()))?;

        let current_step_index = u32::try_from(row.current_step_index)
            .map_err(|e| DomainError::SerializationError(e.to_string()))?;

        Ok(Project {
            id: parse_uuid(&row.id)?,
            user_id: row.user_id,
            exercise_id: row.exercise_id,
            language,
            status,
            progress_percent,
            repository_url: row.repository_url,
            project_token: row.project_token,
            current_step_index,
            created_at: parse_datetime(&row.created_at)?,
            updated_at: parse_datetime(&row.updated_at)?,
        })
    }
}
