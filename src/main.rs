//! Ideaboard CLI entry point.

use anyhow::Context;
use clap::Parser;

use ideaboard::cli::context::AppContext;
use ideaboard::cli::{handle_error, Cli, Commands};
use ideaboard::infrastructure::config::ConfigLoader;
use ideaboard::infrastructure::logging::{LogConfig, LoggerImpl};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json = cli.json;

    if let Err(err) = run(cli).await {
        handle_error(err, json);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => ConfigLoader::load_from_file(path)?,
        None => ConfigLoader::load()?,
    };
    let _logger = LoggerImpl::init(&LogConfig::from(&config.logging)).context("Failed to initialize logging")?;

    let ctx = AppContext::new(config).await?;

    match cli.command {
        Commands::Profile(args) => ideaboard::cli::commands::profile::execute(args, &ctx, cli.json).await,
        Commands::Idea(args) => ideaboard::cli::commands::idea::execute(args, &ctx, cli.json).await,
    }
}
