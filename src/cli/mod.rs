//! Operator command-line interface.

pub mod commands;
pub mod context;
pub mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::services::ProvisionError;

#[derive(Parser, Debug)]
#[command(name = "dsalab")]
#[command(about = "DSA Lab - exercise repository provisioning", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Configuration file (defaults to .dsalab/config.yaml + .dsalab/local.yaml)
    #[arg(short, long, global = true, env = "DSALAB_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP API
    Serve(commands::serve::ServeArgs),
    /// Provision a repository for a user's exercise attempt
    Provision(commands::provision::ProvisionArgs),
    /// Inspect or delete provisioned projects
    Project(commands::project::ProjectArgs),
    /// List exercises and their language variants
    Catalog,
}

/// Print a failed command's error and exit non-zero.
pub fn handle_error(err: anyhow::Error, json_mode: bool) -> ! {
    if json_mode {
        let code = err
            .downcast_ref::<ProvisionError>()
            .map_or("ERROR", ProvisionError::code);
        let body = serde_json::json!({
            "error": code,
            "details": format!("{err:#}"),
        });
        println!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
    } else {
        eprintln!("Error: {err:#}");
    }
    std::process::exit(1);
}
