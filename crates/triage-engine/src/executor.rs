use std::any::Any;
use std::collections::{BTreeSet, HashSet};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use anyhow::{Context, Result};
use futures_util::FutureExt;
use time::OffsetDateTime;
use tracing::{debug, error, info};
use triage_config::Config;
use triage_core::{Issue, ModuleOutcome, PostedComments, RunContext, Tracker};

use crate::query::build_query;
use crate::registry::ModuleRegistry;
use crate::scope::GlobalScope;

const DEFAULT_PAGE_SIZE: usize = 50;

/// What a run reports back to its scheduler.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionResults {
    pub successful: bool,
    pub failed_tickets: BTreeSet<String>,
}

pub struct Executor {
    tracker: Arc<dyn Tracker>,
    registry: ModuleRegistry,
    global: GlobalScope,
    page_size: usize,
    log_operation_not_needed: bool,
    posted_comments: PostedComments,
}

impl Executor {
    pub fn new(tracker: Arc<dyn Tracker>, registry: ModuleRegistry, global: GlobalScope) -> Self {
        Self {
            tracker,
            registry,
            global,
            page_size: DEFAULT_PAGE_SIZE,
            log_operation_not_needed: false,
            posted_comments: PostedComments::new(),
        }
    }

    pub fn from_config(tracker: Arc<dyn Tracker>, config: &Config) -> Result<Self> {
        let registry = ModuleRegistry::from_config(config)?;
        Ok(Self::new(tracker, registry, GlobalScope::from(&config.issues))
            .with_page_size(config.issues.page_size)
            .with_log_operation_not_needed(config.debug.log_operation_not_needed))
    }

    /// Zero is treated as one.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_log_operation_not_needed(mut self, enabled: bool) -> Self {
        self.log_operation_not_needed = enabled;
        self
    }

    /// Run every enabled module over the issues updated after `last_run`,
    /// plus the issues named in `rerun`.
    ///
    /// A search or refresh error, or a panic inside a module, aborts the run.
    /// The failed tickets gathered so far are still reported. The posted
    /// comment cache is reset at the end either way.
    pub async fn execute(
        &mut self,
        last_run: OffsetDateTime,
        rerun: &BTreeSet<String>,
    ) -> ExecutionResults {
        let mut failed_tickets = BTreeSet::new();

        let run = AssertUnwindSafe(self.run_pages(last_run, rerun, &mut failed_tickets))
            .catch_unwind()
            .await;

        let successful = match run {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                error!("Failed to execute modules: {:#}", e);
                false
            }
            Err(panic) => {
                error!("Module execution panicked: {}", panic_message(panic.as_ref()));
                false
            }
        };

        let commented = self.posted_comments.rotate();
        debug!("Run finished, commented on {} tickets", commented.len());

        ExecutionResults {
            successful,
            failed_tickets,
        }
    }

    async fn run_pages(
        &mut self,
        last_run: OffsetDateTime,
        rerun: &BTreeSet<String>,
        failed_tickets: &mut BTreeSet<String>,
    ) -> Result<()> {
        let query = build_query(last_run, rerun);
        let mut start_at = 0;

        loop {
            let page = self
                .tracker
                .search_issues(&query, start_at, self.page_size)
                .await
                .with_context(|| format!("Failed to search issues starting at {}", start_at))?;
            let fetched = page.len();
            debug!("Fetched {} issues starting at {}", fetched, start_at);

            let mut issues = dedupe(page);
            self.run_modules(&mut issues, last_run, failed_tickets).await?;

            if fetched < self.page_size {
                return Ok(());
            }
            start_at += self.page_size;
        }
    }

    async fn run_modules(
        &mut self,
        issues: &mut [Issue],
        last_run: OffsetDateTime,
        failed_tickets: &mut BTreeSet<String>,
    ) -> Result<()> {
        let tracker = self.tracker.as_ref();

        for registered in self.registry.enabled_modules() {
            let name = registered.name();

            for index in 0..issues.len() {
                if !registered.scope.matches(&issues[index], &self.global) {
                    continue;
                }

                let key = issues[index].key.clone();
                let mut ctx = RunContext::new(tracker, last_run, &mut self.posted_comments);
                let outcome = registered.module.invoke(&issues[index], &mut ctx).await;

                match &outcome {
                    ModuleOutcome::Success => {
                        info!("[RESPONSE] [{}] [{}] {}", name, key, outcome);
                        issues[index] = tracker
                            .get_issue(&key)
                            .await
                            .with_context(|| format!("Failed to refresh {}", key))?;
                    }
                    ModuleOutcome::NoOperationNeeded => {
                        if self.log_operation_not_needed {
                            debug!("[RESPONSE] [{}] [{}] {}", name, key, outcome);
                        }
                    }
                    ModuleOutcome::Failed(causes) => {
                        for cause in causes {
                            error!("[RESPONSE] [{}] [{}] {:#}", name, key, cause);
                        }
                        failed_tickets.insert(key);
                    }
                }
            }
        }

        Ok(())
    }
}

/// First occurrence of each key wins.
fn dedupe(page: Vec<Issue>) -> Vec<Issue> {
    let mut seen = HashSet::new();
    page.into_iter()
        .filter(|issue| seen.insert(issue.key.clone()))
        .collect()
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}
