use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// A ticket as returned by a tracker search.
///
/// The snapshot is read-only for modules; every change goes through a
/// [`Tracker`](crate::Tracker) command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub key: String,
    pub project: String,
    pub status: String,
    #[serde(default)]
    pub resolution: Option<String>,
    #[serde(with = "time::serde::timestamp")]
    pub created: OffsetDateTime,
    #[serde(with = "time::serde::timestamp")]
    pub updated: OffsetDateTime,
    #[serde(default)]
    pub security_level: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub environment: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub triaged_time: Option<String>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub change_log: Vec<ChangeLogItem>,
}

impl Issue {
    pub fn new(key: impl Into<String>, project: impl Into<String>) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            key: key.into(),
            project: project.into(),
            status: "Open".to_string(),
            resolution: None,
            created: now,
            updated: now,
            security_level: None,
            summary: None,
            description: None,
            environment: None,
            priority: None,
            triaged_time: None,
            attachments: Vec::new(),
            comments: Vec::new(),
            change_log: Vec::new(),
        }
    }

    /// Any security level hides the issue from the public.
    pub fn is_private(&self) -> bool {
        self.security_level.is_some()
    }

    pub fn with_created(mut self, created: OffsetDateTime) -> Self {
        self.created = created;
        self
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = Some(environment.into());
        self
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    pub fn with_comment(mut self, comment: Comment) -> Self {
        self.comments.push(comment);
        self
    }

    pub fn with_change(mut self, item: ChangeLogItem) -> Self {
        self.change_log.push(item);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl User {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            display_name: None,
        }
    }
}

/// Visibility restriction of a comment, e.g. `group` / `staff`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Visibility {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
}

impl Visibility {
    pub fn group(value: impl Into<String>) -> Self {
        Self {
            kind: "group".to_string(),
            value: value.into(),
        }
    }
}

/// Attachment metadata. Content is fetched lazily through
/// [`Tracker::attachment_content`](crate::Tracker::attachment_content).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    #[serde(with = "time::serde::timestamp")]
    pub created: OffsetDateTime,
    pub uploader: User,
}

impl Attachment {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        mime_type: impl Into<String>,
        uploader: User,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            mime_type: mime_type.into(),
            created: OffsetDateTime::now_utc(),
            uploader,
        }
    }

    pub fn with_created(mut self, created: OffsetDateTime) -> Self {
        self.created = created;
        self
    }

    pub fn has_text_content(&self) -> bool {
        self.mime_type.starts_with("text/")
    }

    /// Lowercased extension of the file name, if any.
    pub fn extension(&self) -> Option<String> {
        self.name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_lowercase())
            .filter(|ext| !ext.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(with = "time::serde::timestamp")]
    pub created: OffsetDateTime,
    pub author: User,
    #[serde(default)]
    pub visibility: Option<Visibility>,
}

impl Comment {
    pub fn new(id: impl Into<String>, body: impl Into<String>, author: User) -> Self {
        Self {
            id: id.into(),
            body: Some(body.into()),
            created: OffsetDateTime::now_utc(),
            author,
            visibility: None,
        }
    }

    pub fn with_created(mut self, created: OffsetDateTime) -> Self {
        self.created = created;
        self
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = Some(visibility);
        self
    }

    pub fn is_public(&self) -> bool {
        self.visibility.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeLogItem {
    pub field: String,
    #[serde(default)]
    pub changed_from: Option<String>,
    #[serde(default)]
    pub changed_to: Option<String>,
    #[serde(with = "time::serde::timestamp")]
    pub created: OffsetDateTime,
}

impl ChangeLogItem {
    pub fn new(
        field: impl Into<String>,
        changed_from: Option<String>,
        changed_to: Option<String>,
    ) -> Self {
        Self {
            field: field.into(),
            changed_from,
            changed_to,
            created: OffsetDateTime::now_utc(),
        }
    }

    pub fn with_created(mut self, created: OffsetDateTime) -> Self {
        self.created = created;
        self
    }

    /// A field that went from unset to set, as opposed to an edit.
    pub fn is_newly_set(&self) -> bool {
        self.changed_from.is_none()
    }
}
