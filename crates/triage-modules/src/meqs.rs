//! Cleanup of MEQS tags on triaged issues
//!
//! Once an issue has a priority or a triage time, `MEQS_*` tags in its
//! comments are neutralized so the issue no longer shows up in MEQS queries.

use anyhow::{Context, Result};
use async_trait::async_trait;
use regex::Regex;
use triage_core::{Issue, Module, ModuleOutcome, RunContext};

const MEQS_PREFIX: &str = "MEQS";
const REMOVED_PREFIX: &str = "MEQS_REMOVED";

pub struct RemoveTriagedMeqsModule {
    pattern: Regex,
    removal_reason: String,
}

impl RemoveTriagedMeqsModule {
    pub fn new(meqs_tags: Vec<String>, removal_reason: impl Into<String>) -> Result<Self> {
        anyhow::ensure!(!meqs_tags.is_empty(), "At least one MEQS tag is required");
        let suffixes: Vec<String> = meqs_tags
            .iter()
            .map(|tag| regex::escape(tag.strip_prefix(MEQS_PREFIX).unwrap_or(tag)))
            .collect();
        let pattern = Regex::new(&format!("{}({})", MEQS_PREFIX, suffixes.join("|")))
            .context("Invalid MEQS tag pattern")?;

        Ok(Self {
            pattern,
            removal_reason: removal_reason.into(),
        })
    }

    fn has_meqs_tag(&self, body: &str) -> bool {
        self.pattern.is_match(body)
    }

    fn remove_meqs_tags(&self, body: &str) -> String {
        self.pattern
            .replace_all(body, |caps: &regex::Captures<'_>| {
                format!("{}{} Removal Reason: {}", REMOVED_PREFIX, &caps[1], self.removal_reason)
            })
            .into_owned()
    }

    async fn run(&self, issue: &Issue, ctx: &mut RunContext<'_>) -> Result<ModuleOutcome> {
        if issue.priority.is_none() && issue.triaged_time.is_none() {
            return Ok(ModuleOutcome::NoOperationNeeded);
        }

        let updates: Vec<(&str, String)> = issue
            .comments
            .iter()
            .filter_map(|comment| {
                let body = comment.body.as_deref()?;
                self.has_meqs_tag(body)
                    .then(|| (comment.id.as_str(), self.remove_meqs_tags(body)))
            })
            .collect();

        if updates.is_empty() {
            return Ok(ModuleOutcome::NoOperationNeeded);
        }

        for (comment_id, body) in updates {
            ctx.tracker
                .update_comment(&issue.key, comment_id, &body)
                .await
                .with_context(|| format!("Failed to update comment {} on {}", comment_id, issue.key))?;
        }

        Ok(ModuleOutcome::Success)
    }
}

#[async_trait]
impl Module for RemoveTriagedMeqsModule {
    fn name(&self) -> &str {
        "RemoveTriagedMeqs"
    }

    async fn invoke(&self, issue: &Issue, ctx: &mut RunContext<'_>) -> ModuleOutcome {
        ModuleOutcome::from_result(self.run(issue, ctx).await)
    }
}
