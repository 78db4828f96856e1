//! Which issues a module runs on

use triage_config::{IssuesConfig, ScopeConfig};
use triage_core::Issue;

const UNRESOLVED: &str = "unresolved";

/// Defaults shared by every module.
#[derive(Debug, Clone)]
pub struct GlobalScope {
    pub projects: Vec<String>,
    pub resolutions: Vec<String>,
}

impl From<&IssuesConfig> for GlobalScope {
    fn from(config: &IssuesConfig) -> Self {
        Self {
            projects: config.projects.clone(),
            resolutions: config.resolutions.clone(),
        }
    }
}

/// Per-module scope. Unset lists fall back to the [`GlobalScope`].
#[derive(Debug, Clone, Default)]
pub struct ModuleScope {
    pub projects: Option<Vec<String>>,
    pub excluded_statuses: Vec<String>,
    pub resolutions: Option<Vec<String>>,
}

impl From<&ScopeConfig> for ModuleScope {
    fn from(config: &ScopeConfig) -> Self {
        Self {
            projects: config.projects.clone(),
            excluded_statuses: config.excluded_statuses.clone(),
            resolutions: config.resolutions.clone(),
        }
    }
}

impl ModuleScope {
    /// Project must match exactly; status and resolution compare case-insensitively.
    /// An issue without a resolution counts as `unresolved`.
    pub fn matches(&self, issue: &Issue, global: &GlobalScope) -> bool {
        let projects = self.projects.as_ref().unwrap_or(&global.projects);
        if !projects.contains(&issue.project) {
            return false;
        }

        let status = issue.status.to_lowercase();
        if self
            .excluded_statuses
            .iter()
            .any(|excluded| excluded.to_lowercase() == status)
        {
            return false;
        }

        let resolution = issue
            .resolution
            .as_deref()
            .unwrap_or(UNRESOLVED)
            .to_lowercase();
        self.resolutions
            .as_ref()
            .unwrap_or(&global.resolutions)
            .iter()
            .any(|allowed| allowed.to_lowercase() == resolution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn global() -> GlobalScope {
        GlobalScope {
            projects: vec!["MC".to_string(), "MCPE".to_string()],
            resolutions: vec!["Unresolved".to_string()],
        }
    }

    #[test]
    fn test_global_defaults() {
        let scope = ModuleScope::default();
        assert!(scope.matches(&Issue::new("MC-1", "MC"), &global()));
        assert!(!scope.matches(&Issue::new("WEB-1", "WEB"), &global()));

        let mut resolved = Issue::new("MC-2", "MC");
        resolved.resolution = Some("Fixed".to_string());
        assert!(!scope.matches(&resolved, &global()));
    }

    #[test]
    fn test_module_overrides() {
        let scope = ModuleScope {
            projects: Some(vec!["WEB".to_string()]),
            excluded_statuses: Vec::new(),
            resolutions: Some(vec!["fixed".to_string()]),
        };

        let mut issue = Issue::new("WEB-1", "WEB");
        issue.resolution = Some("FIXED".to_string());
        assert!(scope.matches(&issue, &global()));
        assert!(!scope.matches(&Issue::new("MC-1", "MC"), &global()));
    }

    #[test]
    fn test_excluded_status() {
        let scope = ModuleScope {
            excluded_statuses: vec!["postponed".to_string()],
            ..ModuleScope::default()
        };

        let mut issue = Issue::new("MC-1", "MC");
        issue.status = "Postponed".to_string();
        assert!(!scope.matches(&issue, &global()));
    }
}
