//! Serve command: run the HTTP API until interrupted.

use anyhow::{Context, Result};
use clap::Args;
use std::sync::Arc;

use crate::adapters::http::{ProjectsHttpConfig, ProjectsHttpServer};
use crate::adapters::identity::SupabaseIdentityVerifier;
use crate::cli::context::ServiceContext;
use crate::domain::models::Config;

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Override the configured bind host
    #[arg(long)]
    pub host: Option<String>,
    /// Override the configured port
    #[arg(short, long)]
    pub port: Option<u16>,
}

pub async fn execute(args: ServeArgs, config: &Config) -> Result<()> {
    let identity = SupabaseIdentityVerifier::from_config(&config.identity)
        .context("identity.auth_url and identity.anon_key must be configured to serve")?;

    let ctx = ServiceContext::open(config).await?;

    let mut http_config = ProjectsHttpConfig::from(&config.server);
    if let Some(host) = args.host {
        http_config.host = host;
    }
    if let Some(port) = args.port {
        http_config.port = port;
    }

    let server = ProjectsHttpServer::new(
        ctx.orchestrator()?,
        ctx.project_service()?,
        ctx.submission_service(),
        Arc::new(identity),
        http_config,
    );

    tracing::info!(
        organization = ctx.config().provisioning.organization.as_deref().unwrap_or("<installation>"),
        "starting DSA Lab API"
    );

    server
        .serve_with_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for shutdown signal");
            }
            tracing::info!("shutdown signal received");
        })
        .await
        .map_err(|e| anyhow::anyhow!(e))
        .context("HTTP server failed")?;

    ctx.close().await;
    Ok(())
}
