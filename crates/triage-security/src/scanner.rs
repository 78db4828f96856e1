//! Sensitive data detection for free text

use anyhow::{Context, Result};
use regex::Regex;

/// Length of account ids that show up in launcher logs.
const ACCOUNT_ID_LENGTH: usize = 17;

/// Detects secret-shaped tokens and personal data in free text.
///
/// Heuristic only: a `false` result does not prove the text is clean.
pub struct SensitiveDataScanner {
    email: Regex,
    allowed_emails: Vec<Regex>,
    patterns: Vec<(&'static str, Regex)>,
}

impl SensitiveDataScanner {
    /// Build a scanner. Each allow-list entry must match a whole address to exempt it.
    pub fn new<S: AsRef<str>>(allowed_emails: &[S]) -> Result<Self> {
        let allowed_emails = allowed_emails
            .iter()
            .map(|pattern| {
                let pattern = pattern.as_ref();
                Regex::new(&format!("^(?:{})$", pattern))
                    .with_context(|| format!("Invalid allowed email pattern: {}", pattern))
            })
            .collect::<Result<Vec<_>>>()?;

        let patterns = vec![
            ("SESSION_ID", Regex::new(r"\(Session ID is token:")?),
            ("ACCESS_TOKEN", Regex::new(r"--accessToken ey")?),
            (
                "BRAINTREE_TRANSACTION",
                Regex::new(r"\bbraintree:[a-f0-9]{6,12}\b")?,
            ),
            (
                "DASHED_ID",
                Regex::new(r"\b([A-Za-z0-9]{4}-){3}[A-Za-z0-9]{4}\b")?,
            ),
        ];

        Ok(Self {
            email: Regex::new(r"\b[a-zA-Z0-9.\-_]+@[a-zA-Z.\-_]+\.[a-zA-Z.\-]{2,15}\b")?,
            allowed_emails,
            patterns,
        })
    }

    pub fn contains_sensitive_data(&self, text: &str) -> bool {
        self.find_signal(text).is_some()
    }

    /// Name of the first signal that fires, if any.
    pub fn find_signal(&self, text: &str) -> Option<&'static str> {
        if self.contains_disallowed_email(text) {
            return Some("EMAIL");
        }
        if contains_account_id(text) {
            return Some("ACCOUNT_ID");
        }
        self.patterns
            .iter()
            .find(|(_, pattern)| pattern.is_match(text))
            .map(|(name, _)| *name)
    }

    fn is_allowed_email(&self, email: &str) -> bool {
        self.allowed_emails.iter().any(|allowed| allowed.is_match(email))
    }

    /// An address counts unless it starts inside a `[~...]` user mention or
    /// the allow-list covers it.
    fn contains_disallowed_email(&self, text: &str) -> bool {
        let mut start = 0;
        while let Some(found) = self.email.find_at(text, start) {
            if inside_mention(&text[..found.start()]) {
                // Retry from the next character
                start = found.start()
                    + text[found.start()..]
                        .chars()
                        .next()
                        .map_or(1, char::len_utf8);
                continue;
            }
            if !self.is_allowed_email(found.as_str()) {
                return true;
            }
            start = found.end();
        }
        false
    }
}

/// Whether `before` ends inside an unclosed `[~` mention.
fn inside_mention(before: &str) -> bool {
    before
        .rfind("[~")
        .is_some_and(|open| !before[open..].contains(']'))
}

/// A whitespace-delimited token of exactly 17 uppercase letters and digits,
/// containing at least one of each.
fn contains_account_id(text: &str) -> bool {
    text.split(char::is_whitespace).any(|token| {
        token.len() == ACCOUNT_ID_LENGTH
            && token
                .bytes()
                .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
            && token.bytes().any(|b| b.is_ascii_uppercase())
            && token.bytes().any(|b| b.is_ascii_digit())
    })
}
