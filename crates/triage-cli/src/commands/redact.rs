use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use tracing::info;
use triage_security::AccessTokenRedactor;

use super::read_input;

pub async fn handle(file: PathBuf) -> Result<ExitCode> {
    let content = read_input(Some(file.as_path())).await?;

    match AccessTokenRedactor::redact_text(&content) {
        Some(redacted) => print!("{}", redacted),
        None => {
            info!("No access token found");
            print!("{}", content);
        }
    }

    Ok(ExitCode::SUCCESS)
}
