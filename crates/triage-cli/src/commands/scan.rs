use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use triage_config::Config;
use triage_security::SensitiveDataScanner;

use super::read_input;

pub async fn handle(file: Option<PathBuf>, config: &Config) -> Result<ExitCode> {
    let scanner = SensitiveDataScanner::new(&config.modules.privacy.allowed_emails)?;
    let content = read_input(file.as_deref()).await?;

    match scanner.find_signal(&content) {
        Some(signal) => {
            println!("✗ Sensitive data found ({})", signal);
            Ok(ExitCode::FAILURE)
        }
        None => {
            println!("✓ No sensitive data found");
            Ok(ExitCode::SUCCESS)
        }
    }
}
