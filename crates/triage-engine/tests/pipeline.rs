use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use time::{Duration, OffsetDateTime};
use triage_config::Config;
use triage_core::{
    Attachment, Comment, InMemoryTracker, Issue, Module, ModuleOutcome, RunContext, Tracker,
    TrackerCommand, User,
};
use triage_engine::{Executor, GlobalScope, ModuleRegistry, ModuleScope};

type Calls = Arc<Mutex<Vec<String>>>;

/// Records every key it is invoked on.
struct RecordingModule {
    calls: Calls,
}

#[async_trait]
impl Module for RecordingModule {
    fn name(&self) -> &str {
        "Recording"
    }

    async fn invoke(&self, issue: &Issue, _ctx: &mut RunContext<'_>) -> ModuleOutcome {
        self.calls.lock().unwrap().push(issue.key.clone());
        ModuleOutcome::NoOperationNeeded
    }
}

/// Comments once per issue and remembers it in the run cache.
struct CommentingModule;

#[async_trait]
impl Module for CommentingModule {
    fn name(&self) -> &str {
        "Commenting"
    }

    async fn invoke(&self, issue: &Issue, ctx: &mut RunContext<'_>) -> ModuleOutcome {
        if ctx.has_posted_comment(&issue.key) {
            return ModuleOutcome::NoOperationNeeded;
        }
        match ctx.tracker.add_comment(&issue.key, "hello").await {
            Ok(()) => {
                ctx.record_posted_comment(&issue.key);
                ModuleOutcome::Success
            }
            Err(e) => ModuleOutcome::failed(e),
        }
    }
}

/// Records `key:comments:posted` as seen by a later module.
struct ObservingModule {
    calls: Calls,
}

#[async_trait]
impl Module for ObservingModule {
    fn name(&self) -> &str {
        "Observing"
    }

    async fn invoke(&self, issue: &Issue, ctx: &mut RunContext<'_>) -> ModuleOutcome {
        self.calls.lock().unwrap().push(format!(
            "{}:{}:{}",
            issue.key,
            issue.comments.len(),
            ctx.has_posted_comment(&issue.key)
        ));
        ModuleOutcome::NoOperationNeeded
    }
}

struct FailingModule {
    key: &'static str,
}

#[async_trait]
impl Module for FailingModule {
    fn name(&self) -> &str {
        "Failing"
    }

    async fn invoke(&self, issue: &Issue, _ctx: &mut RunContext<'_>) -> ModuleOutcome {
        if issue.key == self.key {
            let mut outcome = ModuleOutcome::failed(anyhow::anyhow!("first cause"));
            if let ModuleOutcome::Failed(causes) = &mut outcome {
                causes.push(anyhow::anyhow!("second cause"));
            }
            outcome
        } else {
            ModuleOutcome::NoOperationNeeded
        }
    }
}

struct PanickingModule {
    key: &'static str,
}

#[async_trait]
impl Module for PanickingModule {
    fn name(&self) -> &str {
        "Panicking"
    }

    async fn invoke(&self, issue: &Issue, _ctx: &mut RunContext<'_>) -> ModuleOutcome {
        if issue.key == self.key {
            panic!("unexpected state on {}", issue.key);
        }
        ModuleOutcome::NoOperationNeeded
    }
}

fn global() -> GlobalScope {
    GlobalScope {
        projects: vec!["MC".to_string(), "MCPE".to_string()],
        resolutions: vec!["unresolved".to_string()],
    }
}

fn last_run() -> OffsetDateTime {
    OffsetDateTime::now_utc() - Duration::hours(1)
}

fn tracker_with(count: usize) -> Arc<InMemoryTracker> {
    let mut tracker = InMemoryTracker::new();
    for i in 1..=count {
        tracker = tracker.with_issue(Issue::new(format!("MC-{}", i), "MC"));
    }
    Arc::new(tracker)
}

fn executor(tracker: &Arc<InMemoryTracker>, registry: ModuleRegistry, page_size: usize) -> Executor {
    let tracker: Arc<dyn Tracker> = tracker.clone();
    Executor::new(tracker, registry, global()).with_page_size(page_size)
}

fn recording_registry(calls: &Calls) -> ModuleRegistry {
    let mut registry = ModuleRegistry::new();
    registry.register(
        Box::new(RecordingModule {
            calls: calls.clone(),
        }),
        ModuleScope::default(),
    );
    registry
}

#[tokio::test]
async fn test_pagination_visits_every_issue_once() {
    for (count, page_size, expected_fetches) in [(0, 3, 1), (5, 3, 2), (6, 3, 3), (7, 50, 1)] {
        let tracker = tracker_with(count);
        let calls = Calls::default();
        let mut executor = executor(&tracker, recording_registry(&calls), page_size);

        let results = executor.execute(last_run(), &BTreeSet::new()).await;

        assert!(results.successful);
        assert_eq!(tracker.searches().await.len(), expected_fetches);

        let mut seen = calls.lock().unwrap().clone();
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), count);
        assert_eq!(calls.lock().unwrap().len(), count);
    }
}

#[tokio::test]
async fn test_search_pages_advance_by_page_size() {
    let tracker = tracker_with(4);
    let mut executor = executor(&tracker, ModuleRegistry::new(), 2);

    executor.execute(last_run(), &BTreeSet::new()).await;

    let starts: Vec<usize> = tracker.searches().await.into_iter().map(|(_, start)| start).collect();
    assert_eq!(starts, vec![0, 2, 4]);
}

#[tokio::test]
async fn test_later_module_sees_earlier_changes() {
    let tracker = tracker_with(1);
    let calls = Calls::default();
    let mut registry = ModuleRegistry::new();
    registry.register(Box::new(CommentingModule), ModuleScope::default());
    registry.register(
        Box::new(ObservingModule {
            calls: calls.clone(),
        }),
        ModuleScope::default(),
    );
    let mut executor = executor(&tracker, registry, 50);

    let results = executor.execute(last_run(), &BTreeSet::new()).await;

    assert!(results.successful);
    assert_eq!(*calls.lock().unwrap(), vec!["MC-1:1:true"]);
}

#[tokio::test]
async fn test_posted_comments_reset_between_runs() {
    let tracker = tracker_with(1);
    let mut registry = ModuleRegistry::new();
    registry.register(Box::new(CommentingModule), ModuleScope::default());
    let mut executor = executor(&tracker, registry, 50);

    executor.execute(last_run(), &BTreeSet::new()).await;
    executor.execute(last_run(), &BTreeSet::new()).await;

    assert_eq!(tracker.commands_for("MC-1").await.len(), 2);
}

#[tokio::test]
async fn test_failed_tickets_are_collected() {
    let tracker = tracker_with(3);
    let calls = Calls::default();
    let mut registry = ModuleRegistry::new();
    registry.register(Box::new(FailingModule { key: "MC-2" }), ModuleScope::default());
    registry.register(
        Box::new(RecordingModule {
            calls: calls.clone(),
        }),
        ModuleScope::default(),
    );
    let mut executor = executor(&tracker, registry, 50);

    let results = executor.execute(last_run(), &BTreeSet::new()).await;

    assert!(results.successful);
    assert_eq!(results.failed_tickets, BTreeSet::from(["MC-2".to_string()]));
    // A failure never stops the other modules
    assert_eq!(calls.lock().unwrap().len(), 3);
}

#[tokio::test]
async fn test_search_outage_reports_partial_run() {
    let tracker = {
        let mut tracker = InMemoryTracker::new().fail_search_from(2);
        for i in 1..=3 {
            tracker = tracker.with_issue(Issue::new(format!("MC-{}", i), "MC"));
        }
        Arc::new(tracker)
    };
    let mut registry = ModuleRegistry::new();
    registry.register(Box::new(FailingModule { key: "MC-1" }), ModuleScope::default());
    let mut executor = executor(&tracker, registry, 2);

    let results = executor.execute(last_run(), &BTreeSet::new()).await;

    assert!(!results.successful);
    assert_eq!(results.failed_tickets, BTreeSet::from(["MC-1".to_string()]));
}

#[tokio::test]
async fn test_panic_aborts_run() {
    let tracker = tracker_with(3);
    let calls = Calls::default();
    let mut registry = ModuleRegistry::new();
    registry.register(Box::new(CommentingModule), ModuleScope::default());
    registry.register(Box::new(FailingModule { key: "MC-1" }), ModuleScope::default());
    registry.register(Box::new(PanickingModule { key: "MC-2" }), ModuleScope::default());
    registry.register(
        Box::new(RecordingModule {
            calls: calls.clone(),
        }),
        ModuleScope::default(),
    );
    let mut executor = executor(&tracker, registry, 50);

    let results = executor.execute(last_run(), &BTreeSet::new()).await;

    assert!(!results.successful);
    assert_eq!(results.failed_tickets, BTreeSet::from(["MC-1".to_string()]));
    assert!(calls.lock().unwrap().is_empty());

    // The cache was still reset, so the next run comments again
    executor.execute(last_run(), &BTreeSet::new()).await;
    assert_eq!(tracker.commands_for("MC-1").await.len(), 2);
}

#[tokio::test]
async fn test_rerun_tickets_are_included() {
    let mut stale = Issue::new("MC-9", "MC");
    stale.updated = OffsetDateTime::now_utc() - Duration::days(3);
    let tracker = Arc::new(
        InMemoryTracker::new()
            .with_issue(Issue::new("MC-1", "MC"))
            .with_issue(stale),
    );
    let calls = Calls::default();
    let mut executor = executor(&tracker, recording_registry(&calls), 50);

    let results = executor.execute(last_run(), &BTreeSet::from(["MC-9".to_string()])).await;

    assert!(results.successful);
    assert_eq!(*calls.lock().unwrap(), vec!["MC-1", "MC-9"]);
    let (query, _) = &tracker.searches().await[0];
    assert!(query.ends_with(" OR key in (MC-9)"));
}

#[tokio::test]
async fn test_scope_filtering() {
    let mut resolved = Issue::new("MC-2", "MC");
    resolved.resolution = Some("Fixed".to_string());
    let mut postponed = Issue::new("MCPE-2", "MCPE");
    postponed.status = "Postponed".to_string();
    let tracker = Arc::new(
        InMemoryTracker::new()
            .with_issue(Issue::new("MC-1", "MC"))
            .with_issue(resolved)
            .with_issue(Issue::new("MCPE-1", "MCPE"))
            .with_issue(postponed)
            .with_issue(Issue::new("WEB-1", "WEB")),
    );
    let everywhere = Calls::default();
    let pocket = Calls::default();
    let mut registry = recording_registry(&everywhere);
    registry.register(
        Box::new(RecordingModule {
            calls: pocket.clone(),
        }),
        ModuleScope {
            projects: Some(vec!["MCPE".to_string()]),
            excluded_statuses: vec!["postponed".to_string()],
            resolutions: None,
        },
    );
    let mut executor = executor(&tracker, registry, 50);

    executor.execute(last_run(), &BTreeSet::new()).await;

    assert_eq!(*everywhere.lock().unwrap(), vec!["MC-1", "MCPE-1", "MCPE-2"]);
    assert_eq!(*pocket.lock().unwrap(), vec!["MCPE-1"]);
}

#[tokio::test]
async fn test_disabled_module_never_runs() {
    let tracker = tracker_with(2);
    let calls = Calls::default();
    let mut registry = ModuleRegistry::new();
    registry.register_with(
        Box::new(RecordingModule {
            calls: calls.clone(),
        }),
        ModuleScope::default(),
        false,
    );
    let mut executor = executor(&tracker, registry, 50);

    executor.execute(last_run(), &BTreeSet::new()).await;

    assert!(calls.lock().unwrap().is_empty());
}

fn privacy_config() -> Config {
    let mut config = Config::default();
    config.modules.attachment.scope.enabled = false;
    config.modules.remove_triaged_meqs.scope.enabled = false;
    config.modules.privacy.allowed_emails = vec!["allowed@.*".to_string()];
    config.modules.privacy.sensitive_file_names = vec!["sensitive.txt".to_string()];
    config
}

async fn run_privacy(tracker: &Arc<InMemoryTracker>) -> triage_engine::ExecutionResults {
    let shared: Arc<dyn Tracker> = tracker.clone();
    let mut executor = Executor::from_config(shared, &privacy_config()).unwrap();
    executor.execute(last_run(), &BTreeSet::new()).await
}

#[tokio::test]
async fn test_email_in_description_makes_issue_private() {
    let tracker = Arc::new(
        InMemoryTracker::new().with_issue(Issue::new("MC-1", "MC").with_description("foo@example.com")),
    );

    let results = run_privacy(&tracker).await;

    assert!(results.successful);
    assert!(results.failed_tickets.is_empty());
    assert!(tracker.issue("MC-1").await.unwrap().is_private());
    let commands = tracker.commands_for("MC-1").await;
    assert!(commands.contains(&TrackerCommand::SetPrivate {
        key: "MC-1".to_string()
    }));
    assert!(commands.contains(&TrackerCommand::AddComment {
        key: "MC-1".to_string(),
        body: privacy_config().modules.privacy.message,
    }));
}

#[tokio::test]
async fn test_allowed_email_is_ignored() {
    let tracker = Arc::new(
        InMemoryTracker::new()
            .with_issue(Issue::new("MC-1", "MC").with_description("allowed@example.com")),
    );

    let results = run_privacy(&tracker).await;

    assert!(results.successful);
    assert!(tracker.commands().await.is_empty());
}

#[tokio::test]
async fn test_helper_comment_is_not_restricted() {
    let comment = Comment::new("c1", "foo@example.com", User::new("mod"));
    let tracker = Arc::new(
        InMemoryTracker::new()
            .with_issue(Issue::new("MC-1", "MC").with_comment(comment))
            .with_user_groups("mod", &["helper"]),
    );

    let results = run_privacy(&tracker).await;

    assert!(results.successful);
    assert!(tracker.commands().await.is_empty());
}

#[tokio::test]
async fn test_sensitive_file_name_makes_issue_private() {
    let attachment = Attachment::new("a1", "sensitive.txt", "text/plain", User::new("alice"));
    let tracker = Arc::new(
        InMemoryTracker::new()
            .with_issue(Issue::new("MC-1", "MC").with_attachment(attachment))
            .with_attachment_content("a1", "nothing to see here"),
    );

    let results = run_privacy(&tracker).await;

    assert!(results.successful);
    assert!(tracker.issue("MC-1").await.unwrap().is_private());
}

#[tokio::test]
async fn test_access_token_is_redacted_without_going_private() {
    let attachment = Attachment::new("a1", "launcher_log.txt", "text/plain", User::new("alice"));
    let tracker = Arc::new(
        InMemoryTracker::new()
            .with_issue(Issue::new("MC-1", "MC").with_attachment(attachment))
            .with_attachment_content("a1", "--username alice --accessToken abc.def more"),
    );

    let results = run_privacy(&tracker).await;

    assert!(results.successful);
    let issue = tracker.issue("MC-1").await.unwrap();
    assert!(!issue.is_private());
    assert_eq!(issue.attachments.len(), 1);
    assert_eq!(issue.attachments[0].name, "redacted_launcher_log.txt");

    let commands = tracker.commands_for("MC-1").await;
    assert!(commands.contains(&TrackerCommand::AddAttachment {
        key: "MC-1".to_string(),
        name: "redacted_launcher_log.txt".to_string(),
        content: "--username alice --accessToken ###REDACTED### more".to_string(),
    }));
    assert!(commands.contains(&TrackerCommand::RemoveAttachment {
        key: "MC-1".to_string(),
        attachment_id: "a1".to_string(),
    }));

    // The re-upload is from the bot and already clean
    let before = commands.len();
    let results = run_privacy(&tracker).await;
    assert!(results.successful);
    assert_eq!(tracker.commands_for("MC-1").await.len(), before);
}
