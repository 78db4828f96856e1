//! Removal of attachments with blacklisted file extensions

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::info;
use triage_core::{Issue, Module, ModuleOutcome, RunContext};

pub struct AttachmentModule {
    extension_blacklist: Vec<String>,
    comment: String,
}

impl AttachmentModule {
    pub fn new(extension_blacklist: Vec<String>, comment: impl Into<String>) -> Self {
        Self {
            extension_blacklist: extension_blacklist
                .into_iter()
                .map(|ext| ext.trim_start_matches('.').to_lowercase())
                .collect(),
            comment: comment.into(),
        }
    }

    async fn run(&self, issue: &Issue, ctx: &mut RunContext<'_>) -> Result<ModuleOutcome> {
        let blacklisted: Vec<_> = issue
            .attachments
            .iter()
            .filter(|attachment| {
                attachment
                    .extension()
                    .is_some_and(|ext| self.extension_blacklist.contains(&ext))
            })
            .collect();

        if blacklisted.is_empty() {
            return Ok(ModuleOutcome::NoOperationNeeded);
        }

        for attachment in blacklisted {
            ctx.tracker
                .remove_attachment(&issue.key, &attachment.id)
                .await
                .with_context(|| format!("Failed to remove attachment {}", attachment.id))?;
            info!("Removed attachment {} from {}", attachment.id, issue.key);
        }

        if !ctx.has_posted_comment(&issue.key) {
            ctx.tracker
                .add_comment(&issue.key, &self.comment)
                .await
                .with_context(|| format!("Failed to comment on {}", issue.key))?;
            ctx.record_posted_comment(&issue.key);
        }

        Ok(ModuleOutcome::Success)
    }
}

#[async_trait]
impl Module for AttachmentModule {
    fn name(&self) -> &str {
        "Attachment"
    }

    async fn invoke(&self, issue: &Issue, ctx: &mut RunContext<'_>) -> ModuleOutcome {
        ModuleOutcome::from_result(self.run(issue, ctx).await)
    }
}
