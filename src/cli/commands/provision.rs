//! Provision command: run the saga once from the command line.

use anyhow::Result;
use clap::Args;

use crate::cli::context::ServiceContext;
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::Config;
use crate::services::ProvisionOutcome;

#[derive(Args, Debug)]
pub struct ProvisionArgs {
    /// User the repository is provisioned for
    #[arg(long)]
    pub user_id: String,
    /// Exercise ID from the catalog
    #[arg(short, long)]
    pub exercise: String,
    /// Language variant (case-insensitive, e.g. "python", "cpp")
    #[arg(short, long)]
    pub language: String,
}

#[derive(Debug, serde::Serialize)]
pub struct ProvisionOutput {
    pub project_id: String,
    pub repository_url: String,
    pub language: String,
    pub status: String,
    pub reused: bool,
}

impl From<&ProvisionOutcome> for ProvisionOutput {
    fn from(outcome: &ProvisionOutcome) -> Self {
        Self {
            project_id: outcome.project.id.to_string(),
            repository_url: outcome.repository_url.clone(),
            language: outcome.project.language.as_str().to_string(),
            status: outcome.project.status.as_str().to_string(),
            reused: outcome.reused,
        }
    }
}

impl CommandOutput for ProvisionOutput {
    fn to_human(&self) -> String {
        let verb = if self.reused { "Reusing" } else { "Provisioned" };
        format!(
            "{verb} {} ({})\nProject: {}",
            self.repository_url, self.language, self.project_id
        )
    }
}

pub async fn execute(args: ProvisionArgs, config: &Config, json_mode: bool) -> Result<()> {
    let ctx = ServiceContext::open(config).await?;
    let orchestrator = ctx.orchestrator()?;

    let result = orchestrator
        .provision(&args.user_id, &args.exercise, &args.language)
        .await;
    ctx.close().await;

    let outcome = result?;
    output(&ProvisionOutput::from(&outcome), json_mode);
    Ok(())
}
