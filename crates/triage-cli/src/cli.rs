use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "triage")]
#[command(about = "Issue tracker triage bot", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Config file (default: platform config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check text for sensitive data; exits with status 1 when some is found
    Scan {
        /// File to scan (default: stdin)
        file: Option<PathBuf>,
    },

    /// Redact access tokens from a file and print the result
    Redact {
        /// File to redact
        file: PathBuf,
    },

    /// Run the module pipeline once against an issue dump
    Run {
        /// JSON issue dump
        #[arg(long)]
        issues: PathBuf,

        /// Start of the previous run, in unix seconds
        #[arg(long, allow_hyphen_values = true)]
        last_run: i64,

        /// Ticket to process even if it was not updated
        #[arg(long)]
        rerun: Vec<String>,

        /// Write the updated dump back to the issues file
        #[arg(long)]
        save: bool,
    },
}
