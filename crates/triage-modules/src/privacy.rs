//! Privacy module
//!
//! Looks for personal data and secrets in everything added to an issue since
//! the last run. Attachments that can be cleaned are re-uploaded in redacted
//! form, public comments with sensitive content are restricted, and anything
//! else sensitive makes the whole issue private.

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{info, warn};
use triage_core::{Attachment, Comment, Issue, Module, ModuleOutcome, RunContext, Tracker, Visibility};
use triage_security::{AttachmentRedactor, RedactedAttachment, SensitiveDataScanner};

use crate::staging::StagingDir;

const ATTACHMENT_FIELD: &str = "Attachment";
const REDACTED_PREFIX: &str = "redacted_";

#[derive(Debug, Clone)]
pub struct PrivacyOptions {
    /// Public comment posted when the issue is made private.
    pub message: String,
    /// Appended to the body of restricted comments.
    pub comment_note: String,
    /// Attachment names that make an issue private regardless of content.
    pub sensitive_file_names: Vec<String>,
    /// Authors in these groups may post sensitive data publicly.
    pub exempt_groups: Vec<String>,
    /// Group that can see the re-upload notice.
    pub notice_group: String,
    /// Group restricted comments are limited to.
    pub restrict_group: String,
}

impl Default for PrivacyOptions {
    fn default() -> Self {
        Self {
            message: "This ticket has been made private because it contains sensitive data."
                .to_string(),
            comment_note: "\n----\nRestricted by the privacy module".to_string(),
            sensitive_file_names: Vec::new(),
            exempt_groups: vec![
                "helper".to_string(),
                "global-moderators".to_string(),
                "staff".to_string(),
            ],
            notice_group: "helper".to_string(),
            restrict_group: "staff".to_string(),
        }
    }
}

pub struct PrivacyModule {
    options: PrivacyOptions,
    scanner: SensitiveDataScanner,
    redactor: Box<dyn AttachmentRedactor>,
}

/// What the attachment pass found.
#[derive(Default)]
struct AttachmentScan {
    /// Redacted and clean, waiting for upload.
    to_redact: Vec<RedactedAttachment>,
    /// Some attachment holds sensitive data that redaction can't remove.
    sensitive: bool,
}

impl PrivacyModule {
    pub fn new(
        options: PrivacyOptions,
        scanner: SensitiveDataScanner,
        redactor: Box<dyn AttachmentRedactor>,
    ) -> Self {
        Self {
            options,
            scanner,
            redactor,
        }
    }

    async fn run(&self, issue: &Issue, ctx: &mut RunContext<'_>) -> Result<ModuleOutcome> {
        if issue.is_private() {
            return Ok(ModuleOutcome::NoOperationNeeded);
        }
        let tracker = ctx.tracker;

        // Old issue text was checked when the issue was new
        let mut text = String::new();
        if ctx.is_new(issue.created) {
            for field in [&issue.summary, &issue.environment, &issue.description] {
                text.push_str(field.as_deref().unwrap_or_default());
                text.push(' ');
            }
        }

        let AttachmentScan {
            to_redact,
            sensitive: attachment_sensitive,
        } = self.scan_attachments(issue, ctx).await?;

        let mut issue_sensitive = attachment_sensitive;
        if !issue_sensitive {
            for item in issue.change_log.iter().filter(|item| {
                ctx.is_new(item.created) && item.field != ATTACHMENT_FIELD && item.is_newly_set()
            }) {
                text.push_str(item.changed_to.as_deref().unwrap_or_default());
                text.push(' ');
            }
            issue_sensitive = self.scanner.contains_sensitive_data(&text);
        }

        let file_name_matches = issue
            .attachments
            .iter()
            .any(|attachment| self.options.sensitive_file_names.contains(&attachment.name));

        let comments_to_restrict = self.sensitive_comments(issue, ctx).await?;

        if to_redact.is_empty()
            && !issue_sensitive
            && !file_name_matches
            && comments_to_restrict.is_empty()
        {
            return Ok(ModuleOutcome::NoOperationNeeded);
        }

        // Redact before making the issue private
        let redacted_all = self.redact_attachments(issue, to_redact, ctx).await?;

        if !redacted_all || issue_sensitive || file_name_matches {
            tracker
                .set_private(&issue.key)
                .await
                .with_context(|| format!("Failed to make {} private", issue.key))?;
            tracker
                .add_comment(&issue.key, &self.options.message)
                .await
                .with_context(|| format!("Failed to comment on {}", issue.key))?;
            ctx.record_posted_comment(&issue.key);
            info!("Made {} private", issue.key);
        }

        for comment in comments_to_restrict {
            let body = format!(
                "{}{}",
                comment.body.as_deref().unwrap_or_default(),
                self.options.comment_note
            );
            tracker
                .restrict_comment(
                    &issue.key,
                    &comment.id,
                    &body,
                    Visibility::group(&self.options.restrict_group),
                )
                .await
                .with_context(|| format!("Failed to restrict comment {} on {}", comment.id, issue.key))?;
        }

        Ok(ModuleOutcome::Success)
    }

    async fn scan_attachments(&self, issue: &Issue, ctx: &RunContext<'_>) -> Result<AttachmentScan> {
        let tracker = ctx.tracker;
        let mut scan = AttachmentScan::default();

        for attachment in issue
            .attachments
            .iter()
            .filter(|attachment| ctx.is_new(attachment.created) && attachment.has_text_content())
        {
            // Bot uploads are scanned but never redacted
            let from_bot = tracker.is_bot_user(&attachment.uploader).await?;
            if from_bot && scan.sensitive {
                continue;
            }

            let content = text_content(tracker, attachment).await?;
            let redacted = if from_bot {
                None
            } else {
                self.redactor.redact(attachment, &content)
            };

            match redacted {
                Some(redacted) if self.scanner.contains_sensitive_data(redacted.redacted_content()) => {
                    scan.sensitive = true;
                }
                Some(redacted) => scan.to_redact.push(redacted),
                None => {
                    if !scan.sensitive {
                        scan.sensitive = self.scanner.contains_sensitive_data(&content);
                    }
                }
            }
        }

        Ok(scan)
    }

    /// New public comments with sensitive content from authors outside the exempt groups.
    async fn sensitive_comments<'i>(
        &self,
        issue: &'i Issue,
        ctx: &RunContext<'_>,
    ) -> Result<Vec<&'i Comment>> {
        let mut sensitive = Vec::new();

        for comment in issue
            .comments
            .iter()
            .filter(|comment| ctx.is_new(comment.created) && comment.is_public())
        {
            let Some(body) = comment.body.as_deref() else {
                continue;
            };
            if !self.scanner.contains_sensitive_data(body) {
                continue;
            }

            let exempt = ctx
                .tracker
                .user_groups(&comment.author)
                .await?
                .is_some_and(|groups| {
                    groups
                        .iter()
                        .any(|group| self.options.exempt_groups.contains(group))
                });
            if !exempt {
                sensitive.push(comment);
            }
        }

        Ok(sensitive)
    }

    /// Upload every redacted attachment in place of its original, one batch per
    /// uploader. Returns `false` if any of them could not be replaced.
    async fn redact_attachments(
        &self,
        issue: &Issue,
        to_redact: Vec<RedactedAttachment>,
        ctx: &mut RunContext<'_>,
    ) -> Result<bool> {
        let tracker = ctx.tracker;
        let mut redacted_all = true;

        for (uploader, batch) in group_by_uploader(to_redact) {
            let staging = StagingDir::new().context("Failed to create staging directory")?;
            let mut file_names: Vec<String> = Vec::new();

            for redacted in batch {
                let attachment = redacted.attachment();
                let file_name = format!("{}{}", REDACTED_PREFIX, attachment.name);

                let path = match staging.child_path(&file_name) {
                    Some(path) if !file_names.contains(&file_name) => path,
                    _ => {
                        redacted_all = false;
                        // Never log the file name
                        warn!(
                            "Attachment with ID {} of issue {} has malformed or duplicate file name",
                            attachment.id, issue.key
                        );
                        continue;
                    }
                };
                file_names.push(file_name);

                tokio::fs::write(&path, redacted.redacted_content())
                    .await
                    .with_context(|| format!("Failed to stage attachment {}", attachment.id))?;
                tracker
                    .add_attachment(&issue.key, &path)
                    .await
                    .with_context(|| format!("Failed to upload redacted attachment {}", attachment.id))?;
                tracker
                    .remove_attachment(&issue.key, &attachment.id)
                    .await
                    .with_context(|| format!("Failed to remove attachment {}", attachment.id))?;
            }

            if let Err(e) = staging.close() {
                warn!("Failed to remove staging directory for {}: {}", issue.key, e);
            }

            if !file_names.is_empty() {
                tracker
                    .add_raw_comment(
                        &issue.key,
                        &reupload_notice(&uploader, &file_names),
                        Some(Visibility::group(&self.options.notice_group)),
                    )
                    .await
                    .with_context(|| format!("Failed to post re-upload notice on {}", issue.key))?;
                ctx.record_posted_comment(&issue.key);
            }
        }

        Ok(redacted_all)
    }
}

#[async_trait]
impl Module for PrivacyModule {
    fn name(&self) -> &str {
        "Privacy"
    }

    async fn invoke(&self, issue: &Issue, ctx: &mut RunContext<'_>) -> ModuleOutcome {
        ModuleOutcome::from_result(self.run(issue, ctx).await)
    }
}

async fn text_content(tracker: &dyn Tracker, attachment: &Attachment) -> Result<String> {
    let bytes = tracker
        .attachment_content(attachment)
        .await
        .with_context(|| format!("Failed to download attachment {}", attachment.id))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Group by uploader name, keeping first-seen order.
fn group_by_uploader(items: Vec<RedactedAttachment>) -> Vec<(String, Vec<RedactedAttachment>)> {
    let mut groups: Vec<(String, Vec<RedactedAttachment>)> = Vec::new();
    for item in items {
        let uploader = &item.attachment().uploader.name;
        match groups.iter_mut().find(|(name, _)| name == uploader) {
            Some((_, batch)) => batch.push(item),
            None => groups.push((uploader.clone(), vec![item])),
        }
    }
    groups
}

fn reupload_notice(uploader: &str, file_names: &[String]) -> String {
    let links: String = file_names
        .iter()
        .map(|name| format!("\n- [^{}]", name))
        .collect();
    format!(
        "@[~{}], sensitive data has been removed from your attachment(s) and they have been re-uploaded as:{}",
        uploader, links
    )
}
