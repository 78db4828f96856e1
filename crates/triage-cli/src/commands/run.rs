use std::collections::BTreeSet;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use time::OffsetDateTime;
use tracing::info;
use triage_config::Config;
use triage_core::{InMemoryTracker, Tracker};
use triage_engine::Executor;

pub async fn handle(
    issues: PathBuf,
    last_run: i64,
    rerun: Vec<String>,
    save: bool,
    config: &Config,
) -> Result<ExitCode> {
    let last_run = OffsetDateTime::from_unix_timestamp(last_run)
        .with_context(|| format!("Invalid --last-run timestamp: {}", last_run))?;
    let rerun: BTreeSet<String> = rerun.into_iter().collect();

    let tracker = Arc::new(
        InMemoryTracker::load(&issues)
            .await
            .with_context(|| format!("Failed to load issues from {}", issues.display()))?,
    );
    let shared: Arc<dyn Tracker> = tracker.clone();
    let mut executor = Executor::from_config(shared, config)?;

    info!("Running modules on issues updated after {}", last_run);
    let results = executor.execute(last_run, &rerun).await;

    let commands = tracker.commands().await;
    println!("{}", serde_json::to_string_pretty(&commands)?);

    if results.successful {
        println!("✓ Run finished ({} commands)", commands.len());
    } else {
        println!("✗ Run aborted ({} commands)", commands.len());
    }
    if !results.failed_tickets.is_empty() {
        let failed: Vec<&str> = results.failed_tickets.iter().map(String::as_str).collect();
        println!("  Failed tickets: {}", failed.join(", "));
    }

    if save {
        tracker
            .save(&issues)
            .await
            .with_context(|| format!("Failed to save issues to {}", issues.display()))?;
        println!("  Saved: {}", issues.display());
    }

    Ok(if results.successful && results.failed_tickets.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
