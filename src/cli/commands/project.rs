//! Project CLI commands.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use uuid::Uuid;

use crate::cli::context::ServiceContext;
use crate::cli::output::{list_table, output, render_list, truncate, CommandOutput};
use crate::domain::models::{Config, Project};

#[derive(Args, Debug)]
pub struct ProjectArgs {
    #[command(subcommand)]
    pub command: ProjectCommands,
}

#[derive(Subcommand, Debug)]
pub enum ProjectCommands {
    /// List a user's projects, newest first
    List {
        /// Owning user ID
        #[arg(long)]
        user_id: String,
        /// Only projects for this exercise
        #[arg(short, long)]
        exercise: Option<String>,
    },
    /// Delete a project record and its repository
    Delete {
        /// Owning user ID
        #[arg(long)]
        user_id: String,
        /// Project ID
        id: Uuid,
    },
}

#[derive(Debug, serde::Serialize)]
pub struct ProjectOutput {
    pub id: String,
    pub exercise_id: String,
    pub language: String,
    pub status: String,
    pub progress_percent: u8,
    pub current_step_index: u32,
    pub repository_url: Option<String>,
    pub created_at: String,
}

impl From<&Project> for ProjectOutput {
    fn from(project: &Project) -> Self {
        Self {
            id: project.id.to_string(),
            exercise_id: project.exercise_id.clone(),
            language: project.language.as_str().to_string(),
            status: project.status.as_str().to_string(),
            progress_percent: project.progress_percent,
            current_step_index: project.current_step_index,
            repository_url: project.repository_url.clone(),
            created_at: project.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, serde::Serialize)]
pub struct ProjectListOutput {
    pub projects: Vec<ProjectOutput>,
    pub total: usize,
}

impl CommandOutput for ProjectListOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["id", "exercise", "language", "status", "progress", "repository"]);
        for p in &self.projects {
            table.add_row(vec![
                p.id.chars().take(8).collect::<String>(),
                p.exercise_id.clone(),
                p.language.clone(),
                p.status.clone(),
                format!("{}%", p.progress_percent),
                p.repository_url
                    .as_deref()
                    .map_or_else(|| "-".to_string(), |url| truncate(url, 60)),
            ]);
        }
        render_list("project", &table, self.total)
    }
}

#[derive(Debug, serde::Serialize)]
pub struct ProjectActionOutput {
    pub success: bool,
    pub message: String,
    pub project: Option<ProjectOutput>,
}

impl CommandOutput for ProjectActionOutput {
    fn to_human(&self) -> String {
        self.message.clone()
    }
}

pub async fn execute(args: ProjectArgs, config: &Config, json_mode: bool) -> Result<()> {
    let ctx = ServiceContext::open(config).await?;

    match args.command {
        ProjectCommands::List { user_id, exercise } => {
            let projects = ctx
                .projects()
                .list_for_user(&user_id, exercise.as_deref())
                .await
                .context("Failed to list projects")?;

            let out = ProjectListOutput {
                total: projects.len(),
                projects: projects.iter().map(ProjectOutput::from).collect(),
            };
            output(&out, json_mode);
        }

        ProjectCommands::Delete { user_id, id } => {
            let project = ctx
                .project_service()?
                .delete_project(&user_id, id)
                .await
                .with_context(|| format!("Failed to delete project {id}"))?;

            let out = ProjectActionOutput {
                success: true,
                message: format!("Project deleted: {}", project.id),
                project: Some(ProjectOutput::from(&project)),
            };
            output(&out, json_mode);
        }
    }

    ctx.close().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::Language;
    use chrono::Utc;

    fn project(url: Option<&str>) -> Project {
        let now = Utc::now();
        Project {
            id: Uuid::new_v4(),
            user_id: "u1".to_string(),
            exercise_id: "stack".to_string(),
            language: Language::Go,
            status: crate::domain::models::ProjectStatus::InProgress,
            progress_percent: 25,
            repository_url: url.map(str::to_string),
            project_token: "secret".to_string(),
            current_step_index: 1,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_project_output_omits_token() {
        let out = ProjectOutput::from(&project(Some("https://github.com/dsa-lab/u1-stack-go")));
        let json = serde_json::to_value(&out).unwrap();
        assert_eq!(json["language"], "Go");
        assert_eq!(json["progress_percent"], 25);
        assert!(json.get("project_token").is_none());
    }

    #[test]
    fn test_list_human_output() {
        let projects = [project(None), project(Some("https://github.com/dsa-lab/u1-stack-go"))];
        let out = ProjectListOutput {
            total: projects.len(),
            projects: projects.iter().map(ProjectOutput::from).collect(),
        };
        let human = out.to_human();
        assert!(human.starts_with("2 projects:"));
        assert!(human.contains("25%"));
        assert!(human.contains("u1-stack-go"));
    }
}
