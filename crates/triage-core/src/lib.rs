//! Core domain models and contracts for triage
//!
//! This crate contains:
//! - Domain models (Issue, Attachment, Comment, ChangeLogItem, User)
//! - The module contract (Module, ModuleOutcome, RunContext)
//! - The tracker collaborator trait and an in-memory tracker

pub mod error;
pub mod issue;
pub mod memory;
pub mod module;
pub mod outcome;
pub mod tracker;

pub use error::{Error, Result};
pub use issue::{Attachment, ChangeLogItem, Comment, Issue, User, Visibility};
pub use memory::{InMemoryTracker, TrackerCommand, TrackerDump};
pub use module::{Module, PostedComments, RunContext};
pub use outcome::{FailureCauses, ModuleOutcome};
pub use tracker::Tracker;
