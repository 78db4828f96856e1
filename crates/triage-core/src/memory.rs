//! In-memory tracker
//!
//! Holds issues in memory, applies commands to them and keeps an ordered log
//! of every command it received. Used for offline runs against a JSON dump and
//! in tests.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tokio::sync::Mutex;

use crate::{Attachment, Comment, Error, Issue, Result, Tracker, User, Visibility};

const DEFAULT_BOT_NAME: &str = "triage-bot";

/// Serialized tracker state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrackerDump {
    #[serde(default)]
    pub issues: Vec<Issue>,
    /// Attachment id -> text content.
    #[serde(default)]
    pub attachment_contents: BTreeMap<String, String>,
    /// User name -> groups.
    #[serde(default)]
    pub user_groups: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub bot_users: Vec<String>,
    /// Users the tracker considers new accounts.
    #[serde(default)]
    pub new_users: Vec<String>,
}

/// A command received by the tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum TrackerCommand {
    AddComment {
        key: String,
        body: String,
    },
    AddRawComment {
        key: String,
        body: String,
        visibility: Option<Visibility>,
    },
    RestrictComment {
        key: String,
        comment_id: String,
        body: String,
        visibility: Visibility,
    },
    UpdateComment {
        key: String,
        comment_id: String,
        body: String,
    },
    SetPrivate {
        key: String,
    },
    AddAttachment {
        key: String,
        name: String,
        content: String,
    },
    RemoveAttachment {
        key: String,
        attachment_id: String,
    },
}

impl TrackerCommand {
    pub fn key(&self) -> &str {
        match self {
            Self::AddComment { key, .. }
            | Self::AddRawComment { key, .. }
            | Self::RestrictComment { key, .. }
            | Self::UpdateComment { key, .. }
            | Self::SetPrivate { key }
            | Self::AddAttachment { key, .. }
            | Self::RemoveAttachment { key, .. } => key,
        }
    }
}

#[derive(Default)]
struct State {
    issues: Vec<Issue>,
    contents: HashMap<String, Vec<u8>>,
    groups: HashMap<String, Vec<String>>,
    bots: HashSet<String>,
    new_users: HashSet<String>,
    commands: Vec<TrackerCommand>,
    searches: Vec<(String, usize)>,
    fail_search_from: Option<usize>,
}

impl State {
    fn issue_mut(&mut self, key: &str) -> Result<&mut Issue> {
        let issue = self
            .issues
            .iter_mut()
            .find(|issue| issue.key == key)
            .ok_or_else(|| Error::IssueNotFound(key.to_string()))?;
        issue.updated = OffsetDateTime::now_utc();
        Ok(issue)
    }

    fn comment_mut(&mut self, key: &str, comment_id: &str) -> Result<&mut Comment> {
        self.issue_mut(key)?
            .comments
            .iter_mut()
            .find(|comment| comment.id == comment_id)
            .ok_or_else(|| Error::CommentNotFound(comment_id.to_string()))
    }

    fn push_comment(&mut self, key: &str, body: &str, visibility: Option<Visibility>, bot: &User) -> Result<()> {
        let issue = self.issue_mut(key)?;
        let comment = Comment {
            id: uuid::Uuid::new_v4().to_string(),
            body: Some(body.to_string()),
            created: OffsetDateTime::now_utc(),
            author: bot.clone(),
            visibility,
        };
        issue.comments.push(comment);
        Ok(())
    }
}

pub struct InMemoryTracker {
    bot: User,
    state: Mutex<State>,
}

impl InMemoryTracker {
    pub fn new() -> Self {
        Self::from_dump(TrackerDump::default())
    }

    pub fn from_dump(dump: TrackerDump) -> Self {
        let state = State {
            issues: dump.issues,
            contents: dump
                .attachment_contents
                .into_iter()
                .map(|(id, content)| (id, content.into_bytes()))
                .collect(),
            groups: dump.user_groups.into_iter().collect(),
            bots: dump.bot_users.into_iter().collect(),
            new_users: dump.new_users.into_iter().collect(),
            ..State::default()
        };

        Self {
            bot: User::new(DEFAULT_BOT_NAME),
            state: Mutex::new(state),
        }
    }

    /// Load a dump from a JSON file
    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        let dump: TrackerDump = serde_json::from_str(&content)?;
        Ok(Self::from_dump(dump))
    }

    /// Write the current state back as a JSON dump
    pub async fn save(&self, path: &Path) -> Result<()> {
        let dump = self.to_dump().await;
        let content = serde_json::to_string_pretty(&dump)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }

    pub async fn to_dump(&self) -> TrackerDump {
        let state = self.state.lock().await;
        TrackerDump {
            issues: state.issues.clone(),
            attachment_contents: state
                .contents
                .iter()
                .map(|(id, bytes)| (id.clone(), String::from_utf8_lossy(bytes).into_owned()))
                .collect(),
            user_groups: state
                .groups
                .iter()
                .map(|(name, groups)| (name.clone(), groups.clone()))
                .collect(),
            bot_users: {
                let mut bots: Vec<String> = state.bots.iter().cloned().collect();
                bots.sort();
                bots
            },
            new_users: {
                let mut users: Vec<String> = state.new_users.iter().cloned().collect();
                users.sort();
                users
            },
        }
    }

    pub fn with_bot_name(mut self, name: impl Into<String>) -> Self {
        self.bot = User::new(name);
        self
    }

    pub fn with_issue(mut self, issue: Issue) -> Self {
        self.state.get_mut().issues.push(issue);
        self
    }

    pub fn with_attachment_content(
        mut self,
        attachment_id: impl Into<String>,
        content: impl Into<Vec<u8>>,
    ) -> Self {
        self.state
            .get_mut()
            .contents
            .insert(attachment_id.into(), content.into());
        self
    }

    pub fn with_user_groups(mut self, user: impl Into<String>, groups: &[&str]) -> Self {
        self.state.get_mut().groups.insert(
            user.into(),
            groups.iter().map(|group| group.to_string()).collect(),
        );
        self
    }

    pub fn with_bot_user(mut self, user: impl Into<String>) -> Self {
        self.state.get_mut().bots.insert(user.into());
        self
    }

    pub fn with_new_user(mut self, user: impl Into<String>) -> Self {
        self.state.get_mut().new_users.insert(user.into());
        self
    }

    /// Simulate an outage: every search starting at or after `start_at` fails.
    pub fn fail_search_from(mut self, start_at: usize) -> Self {
        self.state.get_mut().fail_search_from = Some(start_at);
        self
    }

    pub fn bot(&self) -> &User {
        &self.bot
    }

    /// Every command received so far, in order.
    pub async fn commands(&self) -> Vec<TrackerCommand> {
        self.state.lock().await.commands.clone()
    }

    pub async fn commands_for(&self, key: &str) -> Vec<TrackerCommand> {
        self.state
            .lock()
            .await
            .commands
            .iter()
            .filter(|command| command.key() == key)
            .cloned()
            .collect()
    }

    /// `(query, start_at)` of every search so far.
    pub async fn searches(&self) -> Vec<(String, usize)> {
        self.state.lock().await.searches.clone()
    }

    pub async fn issue(&self, key: &str) -> Option<Issue> {
        self.state
            .lock()
            .await
            .issues
            .iter()
            .find(|issue| issue.key == key)
            .cloned()
    }
}

impl Default for InMemoryTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// The subset of JQL the executor emits:
/// `updated > <millis>` optionally followed by `OR key in (A,B)`.
#[derive(Debug, Default, PartialEq)]
struct Query {
    updated_after_millis: Option<i128>,
    keys: HashSet<String>,
}

impl Query {
    fn parse(query: &str) -> Result<Self> {
        let mut parsed = Query::default();

        for clause in query.split(" OR ") {
            let clause = clause.trim();
            if let Some(millis) = clause.strip_prefix("updated >") {
                let millis = millis
                    .trim()
                    .parse::<i128>()
                    .map_err(|e| Error::Tracker(format!("invalid timestamp in query: {}", e)))?;
                parsed.updated_after_millis = Some(millis);
            } else if let Some(keys) = clause
                .strip_prefix("key in (")
                .and_then(|rest| rest.strip_suffix(')'))
            {
                parsed.keys.extend(
                    keys.split(',')
                        .map(str::trim)
                        .filter(|key| !key.is_empty())
                        .map(str::to_string),
                );
            } else {
                return Err(Error::Tracker(format!("unsupported query clause: {}", clause)));
            }
        }

        Ok(parsed)
    }

    fn matches(&self, issue: &Issue) -> bool {
        let updated = self
            .updated_after_millis
            .is_some_and(|millis| issue.updated.unix_timestamp_nanos() / 1_000_000 > millis);
        updated || self.keys.contains(&issue.key)
    }
}

#[async_trait]
impl Tracker for InMemoryTracker {
    async fn search_issues(
        &self,
        query: &str,
        start_at: usize,
        max_results: usize,
    ) -> Result<Vec<Issue>> {
        let mut state = self.state.lock().await;
        state.searches.push((query.to_string(), start_at));

        if state.fail_search_from.is_some_and(|from| start_at >= from) {
            return Err(Error::Tracker("search unavailable".to_string()));
        }

        let query = Query::parse(query)?;
        Ok(state
            .issues
            .iter()
            .filter(|issue| query.matches(issue))
            .skip(start_at)
            .take(max_results)
            .cloned()
            .collect())
    }

    async fn get_issue(&self, key: &str) -> Result<Issue> {
        self.issue(key)
            .await
            .ok_or_else(|| Error::IssueNotFound(key.to_string()))
    }

    async fn add_comment(&self, key: &str, body: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        state.push_comment(key, body, None, &self.bot)?;
        state.commands.push(TrackerCommand::AddComment {
            key: key.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }

    async fn add_raw_comment(
        &self,
        key: &str,
        body: &str,
        visibility: Option<Visibility>,
    ) -> Result<()> {
        let mut state = self.state.lock().await;
        state.push_comment(key, body, visibility.clone(), &self.bot)?;
        state.commands.push(TrackerCommand::AddRawComment {
            key: key.to_string(),
            body: body.to_string(),
            visibility,
        });
        Ok(())
    }

    async fn restrict_comment(
        &self,
        key: &str,
        comment_id: &str,
        body: &str,
        visibility: Visibility,
    ) -> Result<()> {
        let mut state = self.state.lock().await;
        let comment = state.comment_mut(key, comment_id)?;
        comment.body = Some(body.to_string());
        comment.visibility = Some(visibility.clone());
        state.commands.push(TrackerCommand::RestrictComment {
            key: key.to_string(),
            comment_id: comment_id.to_string(),
            body: body.to_string(),
            visibility,
        });
        Ok(())
    }

    async fn update_comment(&self, key: &str, comment_id: &str, body: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        state.comment_mut(key, comment_id)?.body = Some(body.to_string());
        state.commands.push(TrackerCommand::UpdateComment {
            key: key.to_string(),
            comment_id: comment_id.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }

    async fn set_private(&self, key: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        state.issue_mut(key)?.security_level = Some("private".to_string());
        state.commands.push(TrackerCommand::SetPrivate {
            key: key.to_string(),
        });
        Ok(())
    }

    async fn add_attachment(&self, key: &str, file: &Path) -> Result<()> {
        let name = file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| Error::Tracker(format!("not a file: {}", file.display())))?;
        let content = tokio::fs::read(file).await?;

        let mut state = self.state.lock().await;
        let attachment = Attachment::new(
            uuid::Uuid::new_v4().to_string(),
            name.clone(),
            "text/plain",
            self.bot.clone(),
        );
        let id = attachment.id.clone();
        state.issue_mut(key)?.attachments.push(attachment);
        state.commands.push(TrackerCommand::AddAttachment {
            key: key.to_string(),
            name,
            content: String::from_utf8_lossy(&content).into_owned(),
        });
        state.contents.insert(id, content);
        Ok(())
    }

    async fn remove_attachment(&self, key: &str, attachment_id: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        let issue = state.issue_mut(key)?;
        let before = issue.attachments.len();
        issue.attachments.retain(|attachment| attachment.id != attachment_id);
        if issue.attachments.len() == before {
            return Err(Error::AttachmentNotFound(attachment_id.to_string()));
        }
        state.contents.remove(attachment_id);
        state.commands.push(TrackerCommand::RemoveAttachment {
            key: key.to_string(),
            attachment_id: attachment_id.to_string(),
        });
        Ok(())
    }

    async fn attachment_content(&self, attachment: &Attachment) -> Result<Vec<u8>> {
        self.state
            .lock()
            .await
            .contents
            .get(&attachment.id)
            .cloned()
            .ok_or_else(|| Error::AttachmentNotFound(attachment.id.clone()))
    }

    async fn user_groups(&self, user: &User) -> Result<Option<Vec<String>>> {
        Ok(self.state.lock().await.groups.get(&user.name).cloned())
    }

    async fn is_bot_user(&self, user: &User) -> Result<bool> {
        Ok(user.name == self.bot.name || self.state.lock().await.bots.contains(&user.name))
    }

    async fn is_new_user(&self, user: &User) -> Result<bool> {
        Ok(self.state.lock().await.new_users.contains(&user.name))
    }
}
