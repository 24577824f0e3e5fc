//! DSA Lab CLI entry point.

use anyhow::Result;
use clap::Parser;

use dsalab::cli::{commands, handle_error, Cli, Commands};
use dsalab::domain::models::Config;
use dsalab::infrastructure::config::ConfigLoader;
use dsalab::infrastructure::logging::{LogConfig, LoggerImpl};

fn load_config(cli: &Cli) -> Result<Config> {
    match &cli.config {
        Some(path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json_mode = cli.json;

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(err) => handle_error(err, json_mode),
    };

    let _logger = match LoggerImpl::init(&LogConfig::from(&config.logging)) {
        Ok(logger) => logger,
        Err(err) => handle_error(err, json_mode),
    };

    let result = match cli.command {
        Commands::Serve(args) => commands::serve::execute(args, &config).await,
        Commands::Provision(args) => commands::provision::execute(args, &config, json_mode).await,
        Commands::Project(args) => commands::project::execute(args, &config, json_mode).await,
        Commands::Catalog => commands::catalog::execute(json_mode),
    };

    if let Err(err) = result {
        handle_error(err, json_mode);
    }
}
