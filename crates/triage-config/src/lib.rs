use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for triage
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub issues: IssuesConfig,

    #[serde(default)]
    pub debug: DebugConfig,

    #[serde(default)]
    pub modules: ModulesConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuesConfig {
    /// Projects every module runs on unless it overrides them.
    #[serde(default = "default_projects")]
    pub projects: Vec<String>,

    /// Resolutions every module runs on unless it overrides them.
    #[serde(default = "default_resolutions")]
    pub resolutions: Vec<String>,

    #[serde(default = "default_url")]
    pub url: String,

    #[serde(default = "default_check_interval")]
    pub check_interval_secs: u64,

    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DebugConfig {
    #[serde(default)]
    pub log_operation_not_needed: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModulesConfig {
    #[serde(default)]
    pub privacy: PrivacyConfig,

    #[serde(default)]
    pub attachment: AttachmentConfig,

    #[serde(default)]
    pub remove_triaged_meqs: RemoveTriagedMeqsConfig,
}

/// Where a module runs. Unset lists fall back to `[issues]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScopeConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub projects: Option<Vec<String>>,

    #[serde(default)]
    pub excluded_statuses: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolutions: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrivacyConfig {
    #[serde(flatten)]
    pub scope: ScopeConfig,

    #[serde(default = "default_privacy_message")]
    pub message: String,

    #[serde(default = "default_comment_note")]
    pub comment_note: String,

    /// Regexes; an address matching one of them entirely is not sensitive.
    #[serde(default)]
    pub allowed_emails: Vec<String>,

    #[serde(default)]
    pub sensitive_file_names: Vec<String>,

    #[serde(default = "default_true")]
    pub redact_access_tokens: bool,

    #[serde(default = "default_exempt_groups")]
    pub exempt_groups: Vec<String>,

    #[serde(default = "default_notice_group")]
    pub notice_group: String,

    #[serde(default = "default_restrict_group")]
    pub restrict_group: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachmentConfig {
    #[serde(flatten)]
    pub scope: ScopeConfig,

    #[serde(default = "default_extension_blacklist")]
    pub extension_blacklist: Vec<String>,

    #[serde(default = "default_attachment_comment")]
    pub comment: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoveTriagedMeqsConfig {
    #[serde(flatten)]
    pub scope: ScopeConfig,

    #[serde(default = "default_meqs_tags")]
    pub meqs_tags: Vec<String>,

    #[serde(default = "default_removal_reason")]
    pub removal_reason: String,
}

impl Default for IssuesConfig {
    fn default() -> Self {
        Self {
            projects: default_projects(),
            resolutions: default_resolutions(),
            url: default_url(),
            check_interval_secs: default_check_interval(),
            page_size: default_page_size(),
        }
    }
}

impl Default for ScopeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            projects: None,
            excluded_statuses: Vec::new(),
            resolutions: None,
        }
    }
}

impl Default for PrivacyConfig {
    fn default() -> Self {
        Self {
            scope: ScopeConfig::default(),
            message: default_privacy_message(),
            comment_note: default_comment_note(),
            allowed_emails: Vec::new(),
            sensitive_file_names: Vec::new(),
            redact_access_tokens: true,
            exempt_groups: default_exempt_groups(),
            notice_group: default_notice_group(),
            restrict_group: default_restrict_group(),
        }
    }
}

impl Default for AttachmentConfig {
    fn default() -> Self {
        Self {
            scope: ScopeConfig::default(),
            extension_blacklist: default_extension_blacklist(),
            comment: default_attachment_comment(),
        }
    }
}

impl Default for RemoveTriagedMeqsConfig {
    fn default() -> Self {
        Self {
            scope: ScopeConfig::default(),
            meqs_tags: default_meqs_tags(),
            removal_reason: default_removal_reason(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

fn default_projects() -> Vec<String> {
    strings(&["MC", "MCTEST", "MCPE", "MCAPI", "MCL"])
}

fn default_resolutions() -> Vec<String> {
    strings(&["unresolved"])
}

fn default_url() -> String {
    "https://bugs.mojang.com/".to_string()
}

fn default_check_interval() -> u64 {
    10
}

fn default_page_size() -> usize {
    50
}

fn default_privacy_message() -> String {
    "This ticket has been made private because it contains sensitive data.".to_string()
}

fn default_comment_note() -> String {
    "\n----\nRestricted by the privacy module".to_string()
}

fn default_exempt_groups() -> Vec<String> {
    strings(&["helper", "global-moderators", "staff"])
}

fn default_notice_group() -> String {
    "helper".to_string()
}

fn default_restrict_group() -> String {
    "staff".to_string()
}

fn default_extension_blacklist() -> Vec<String> {
    strings(&["jar", "exe", "com", "bat", "msi", "run", "lnk", "dmg"])
}

fn default_attachment_comment() -> String {
    "Attachments with executable file types are not allowed and have been removed.".to_string()
}

fn default_meqs_tags() -> Vec<String> {
    strings(&["MEQS_WAI", "MEQS_WONTFIX"])
}

fn default_removal_reason() -> String {
    "Ticket has been triaged.".to_string()
}

impl Config {
    /// Load config from `path`, or the default location when `None`.
    /// A missing file is created with defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let path = path.map(Path::to_path_buf).unwrap_or_else(Self::config_path);

        if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            // Create default config file
            let config = Config::default();
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let content = toml::to_string_pretty(&config)?;
            std::fs::write(&path, content)?;
            Ok(config)
        }
    }

    /// Get config file path
    pub fn config_path() -> PathBuf {
        if let Some(dirs) = directories::ProjectDirs::from("com", "triage", "triage") {
            dirs.config_dir().join("config.toml")
        } else {
            PathBuf::from("~/.triage/config.toml")
        }
    }
}
