//! Rule modules run by the pipeline
//!
//! - `privacy`: sensitive data detection, attachment redaction and visibility changes
//! - `attachment`: removal of attachments with blacklisted extensions
//! - `meqs`: cleanup of MEQS tags once an issue is triaged

pub mod attachment;
pub mod meqs;
pub mod privacy;
pub mod staging;

pub use attachment::AttachmentModule;
pub use meqs::RemoveTriagedMeqsModule;
pub use privacy::{PrivacyModule, PrivacyOptions};
pub use staging::StagingDir;
