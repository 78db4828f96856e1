//! Attachment redaction strategies

use std::sync::LazyLock;

use regex::{Captures, Regex};
use triage_core::Attachment;

pub const REDACTED_REPLACEMENT: &str = "###REDACTED###";

/// `--accessToken <token>` where the flag starts the text or follows whitespace.
/// Group 1 keeps the leading whitespace, group 2 is the token.
static ACCESS_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(^|\s)--accessToken ([a-zA-Z0-9.+/=_\-]+)").expect("access token pattern is valid")
});

/// An attachment paired with its rewritten text content.
///
/// Only redactors construct these.
#[derive(Debug, Clone)]
pub struct RedactedAttachment {
    attachment: Attachment,
    redacted_content: String,
}

impl RedactedAttachment {
    fn new(attachment: &Attachment, redacted_content: String) -> Self {
        Self {
            attachment: attachment.clone(),
            redacted_content,
        }
    }

    pub fn attachment(&self) -> &Attachment {
        &self.attachment
    }

    pub fn redacted_content(&self) -> &str {
        &self.redacted_content
    }
}

/// Rewrites an attachment's text to remove one kind of secret.
///
/// Implementations never touch the attachment itself; they return new content,
/// or `None` when there is nothing they can redact.
pub trait AttachmentRedactor: Send + Sync {
    fn redact(&self, attachment: &Attachment, content: &str) -> Option<RedactedAttachment>;
}

/// Used where redaction is disabled.
pub struct NoopRedactor;

impl AttachmentRedactor for NoopRedactor {
    fn redact(&self, _attachment: &Attachment, _content: &str) -> Option<RedactedAttachment> {
        None
    }
}

/// Replaces the value after `--accessToken` with [`REDACTED_REPLACEMENT`],
/// leaving the flag and the rest of the text as they were.
pub struct AccessTokenRedactor;

impl AccessTokenRedactor {
    pub fn redact_text(content: &str) -> Option<String> {
        let mut replaced = false;
        let redacted = ACCESS_TOKEN.replace_all(content, |caps: &Captures<'_>| {
            let end = caps.get(0).map_or(content.len(), |m| m.end());
            // Only a token that ends at whitespace or the end of the text
            let bounded = content[end..]
                .chars()
                .next()
                .is_none_or(char::is_whitespace);
            if bounded {
                replaced = true;
                format!("{}--accessToken {}", &caps[1], REDACTED_REPLACEMENT)
            } else {
                caps[0].to_string()
            }
        });

        replaced.then(|| redacted.into_owned())
    }
}

impl AttachmentRedactor for AccessTokenRedactor {
    fn redact(&self, attachment: &Attachment, content: &str) -> Option<RedactedAttachment> {
        if !attachment.has_text_content() {
            return None;
        }
        Self::redact_text(content).map(|redacted| RedactedAttachment::new(attachment, redacted))
    }
}
