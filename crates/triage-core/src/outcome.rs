//! The result of running one module against one issue

use std::fmt;

/// Every module invocation produces exactly one of these.
#[derive(Debug)]
pub enum ModuleOutcome {
    /// The module acted on the issue.
    Success,
    /// The module's precondition did not hold. Not an error.
    NoOperationNeeded,
    /// The module ran but could not complete.
    Failed(FailureCauses),
}

impl ModuleOutcome {
    pub fn failed(cause: impl Into<anyhow::Error>) -> Self {
        Self::Failed(FailureCauses::new(cause))
    }

    /// Collapse a fallible module body into an outcome.
    pub fn from_result(result: anyhow::Result<ModuleOutcome>) -> Self {
        result.unwrap_or_else(Self::failed)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    pub fn is_no_operation_needed(&self) -> bool {
        matches!(self, Self::NoOperationNeeded)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

impl fmt::Display for ModuleOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "Successful"),
            Self::NoOperationNeeded => write!(f, "Operation not needed"),
            Self::Failed(causes) => write!(f, "Failed ({} causes)", causes.len()),
        }
    }
}

/// Causes of a failed module run. Never empty.
#[derive(Debug)]
pub struct FailureCauses {
    causes: Vec<anyhow::Error>,
}

impl FailureCauses {
    pub fn new(first: impl Into<anyhow::Error>) -> Self {
        Self {
            causes: vec![first.into()],
        }
    }

    pub fn push(&mut self, cause: impl Into<anyhow::Error>) {
        self.causes.push(cause.into());
    }

    pub fn len(&self) -> usize {
        self.causes.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn iter(&self) -> impl Iterator<Item = &anyhow::Error> {
        self.causes.iter()
    }
}

impl<'a> IntoIterator for &'a FailureCauses {
    type Item = &'a anyhow::Error;
    type IntoIter = std::slice::Iter<'a, anyhow::Error>;

    fn into_iter(self) -> Self::IntoIter {
        self.causes.iter()
    }
}
