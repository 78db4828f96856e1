//! Module contract

use std::collections::HashSet;

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::{Issue, ModuleOutcome, Tracker};

/// A rule evaluated against one issue.
///
/// Configuration is bound at construction. Running a module again on an issue
/// it already fixed should yield [`ModuleOutcome::NoOperationNeeded`], and all
/// side effects go through `ctx.tracker`.
#[async_trait]
pub trait Module: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    async fn invoke(&self, issue: &Issue, ctx: &mut RunContext<'_>) -> ModuleOutcome;
}

/// Per-invocation view of the current run.
pub struct RunContext<'a> {
    pub tracker: &'a dyn Tracker,
    /// Start of the previous run. Content older than this was already checked.
    pub last_run: OffsetDateTime,
    posted_comments: &'a mut PostedComments,
}

impl<'a> RunContext<'a> {
    pub fn new(
        tracker: &'a dyn Tracker,
        last_run: OffsetDateTime,
        posted_comments: &'a mut PostedComments,
    ) -> Self {
        Self {
            tracker,
            last_run,
            posted_comments,
        }
    }

    pub fn is_new(&self, created: OffsetDateTime) -> bool {
        created > self.last_run
    }

    pub fn has_posted_comment(&self, key: &str) -> bool {
        self.posted_comments.contains(key)
    }

    pub fn record_posted_comment(&mut self, key: &str) {
        self.posted_comments.insert(key);
    }
}

/// Tickets the bot already commented on during the current run.
///
/// [`PostedComments::rotate`] swaps in an empty set at the end of every run,
/// so one run's entries never influence the next.
#[derive(Debug, Default)]
pub struct PostedComments {
    keys: HashSet<String>,
}

impl PostedComments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    pub fn insert(&mut self, key: &str) {
        self.keys.insert(key.to_string());
    }

    /// Replace the set with a fresh one, returning the finished run's keys.
    pub fn rotate(&mut self) -> HashSet<String> {
        std::mem::take(&mut self.keys)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
