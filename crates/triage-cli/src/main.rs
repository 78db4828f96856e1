mod cli;
mod commands;

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use triage_config::Config;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = cli::Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        cli::Commands::Scan { file } => commands::scan::handle(file, &config).await,
        cli::Commands::Redact { file } => commands::redact::handle(file).await,
        cli::Commands::Run {
            issues,
            last_run,
            rerun,
            save,
        } => commands::run::handle(issues, last_run, rerun, save, &config).await,
    }
}
