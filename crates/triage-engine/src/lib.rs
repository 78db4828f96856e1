//! Issue-processing pipeline
//!
//! Fetches changed issues page by page, runs every enabled module on the
//! issues in its scope and reports which tickets failed.

pub mod executor;
pub mod query;
pub mod registry;
pub mod scope;

pub use executor::{ExecutionResults, Executor};
pub use query::build_query;
pub use registry::{ModuleRegistry, RegisteredModule};
pub use scope::{GlobalScope, ModuleScope};
