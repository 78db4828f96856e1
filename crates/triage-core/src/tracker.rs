//! Tracker collaborator trait

use std::path::Path;

use async_trait::async_trait;

use crate::{Attachment, Issue, Result, User, Visibility};

/// The work-item tracker the pipeline reads from and acts on.
///
/// Modules never mutate an [`Issue`] snapshot; every effect is one of these
/// commands. The lazy accessors (`attachment_content`, `user_groups`,
/// `is_bot_user`) may hit the network and are only called at point of use.
#[async_trait]
pub trait Tracker: Send + Sync {
    /// Run a query, returning at most `max_results` issues starting at `start_at`.
    async fn search_issues(
        &self,
        query: &str,
        start_at: usize,
        max_results: usize,
    ) -> Result<Vec<Issue>>;

    /// Fetch the current state of one issue.
    async fn get_issue(&self, key: &str) -> Result<Issue>;

    /// Post a public comment.
    async fn add_comment(&self, key: &str, body: &str) -> Result<()>;

    /// Post a comment verbatim, optionally restricted to a group or role.
    async fn add_raw_comment(
        &self,
        key: &str,
        body: &str,
        visibility: Option<Visibility>,
    ) -> Result<()>;

    /// Rewrite a comment's body and restrict its visibility.
    async fn restrict_comment(
        &self,
        key: &str,
        comment_id: &str,
        body: &str,
        visibility: Visibility,
    ) -> Result<()>;

    /// Rewrite a comment's body, keeping its visibility.
    async fn update_comment(&self, key: &str, comment_id: &str, body: &str) -> Result<()>;

    /// Move the issue to the private security level.
    async fn set_private(&self, key: &str) -> Result<()>;

    /// Upload a file as a new attachment. The file may be removed once this returns.
    async fn add_attachment(&self, key: &str, file: &Path) -> Result<()>;

    async fn remove_attachment(&self, key: &str, attachment_id: &str) -> Result<()>;

    async fn attachment_content(&self, attachment: &Attachment) -> Result<Vec<u8>>;

    /// Groups of a user, `None` when the tracker can't tell.
    async fn user_groups(&self, user: &User) -> Result<Option<Vec<String>>>;

    async fn is_bot_user(&self, user: &User) -> Result<bool>;

    /// Whether the account was created recently.
    async fn is_new_user(&self, user: &User) -> Result<bool>;
}
