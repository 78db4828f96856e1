//! Sensitive data detection and attachment redaction

pub mod redactor;
pub mod scanner;

pub use redactor::{
    AccessTokenRedactor, AttachmentRedactor, NoopRedactor, REDACTED_REPLACEMENT,
    RedactedAttachment,
};
pub use scanner::SensitiveDataScanner;
